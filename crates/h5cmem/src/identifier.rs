//! Ownership of native identifiers.

use crate::error::Result;
use crate::native::{self, Hid, IType, INVALID_HID};

/// An owned native identifier.
///
/// Closing is idempotent: the first [`close`](Identifier::close) releases the
/// identifier and later calls do nothing. Dropping an open identifier closes
/// it.
#[derive(Debug)]
pub struct Identifier {
    id: Hid,
}

impl Identifier {
    pub(crate) fn new(id: Hid) -> Self {
        Self { id }
    }

    /// The raw identifier, or [`INVALID_HID`] once closed.
    pub fn id(&self) -> Hid {
        self.id
    }

    pub fn is_valid(&self) -> bool {
        self.id != INVALID_HID && native::is_valid(self.id)
    }

    pub fn id_type(&self) -> IType {
        native::id_type(self.id)
    }

    /// Absolute path of the object inside its file.
    pub fn name(&self) -> Result<String> {
        Ok(native::object_name(self.id)?)
    }

    /// Path of the file containing the object.
    pub fn file_name(&self) -> Result<String> {
        Ok(native::file_name(self.id)?)
    }

    pub fn close(&mut self) -> Result<()> {
        if self.id == INVALID_HID {
            return Ok(());
        }
        let id = std::mem::replace(&mut self.id, INVALID_HID);
        native::close(id)?;
        Ok(())
    }
}

impl Drop for Identifier {
    fn drop(&mut self) {
        let id = self.id;
        if let Err(e) = self.close() {
            tracing::warn!(id, error = %e, "failed to close identifier on drop");
        }
    }
}

/// Implements `Deref<Target = Identifier>` and `close` for a handle type.
macro_rules! impl_handle {
    ($ty:ident) => {
        impl std::ops::Deref for $ty {
            type Target = $crate::identifier::Identifier;

            fn deref(&self) -> &Self::Target {
                &self.ident
            }
        }

        impl $ty {
            /// Releases the handle. Later calls are no-ops.
            pub fn close(&mut self) -> $crate::error::Result<()> {
                self.ident.close()
            }

            pub(crate) fn from_id(id: $crate::native::Hid) -> Self {
                Self {
                    ident: $crate::identifier::Identifier::new(id),
                }
            }
        }
    };
}

pub(crate) use impl_handle;
