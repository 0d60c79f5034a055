//! File handles.

use std::path::Path;

use hdf5_metno_sys::h5f::{
    H5F_scope_t, H5Fcreate, H5Fflush, H5Fis_hdf5, H5Fopen, H5Freopen, H5F_ACC_EXCL,
    H5F_ACC_RDONLY, H5F_ACC_RDWR, H5F_ACC_TRUNC,
};
use hdf5_metno_sys::h5p::H5P_DEFAULT;

use crate::error::Result;
use crate::group::Location;
use crate::identifier::{impl_handle, Identifier};
use crate::native::{fail, h5call, sync, to_cstring, ErrorClass, Hid};

pub use crate::native::FileFlags;

const CLASS: ErrorClass = ErrorClass::File;

/// An open file. Its root group is reachable through [`Location`].
#[derive(Debug)]
pub struct File {
    ident: Identifier,
}

impl_handle!(File);

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl File {
    /// Creates a file. `flags` must be [`FileFlags::Truncate`] or
    /// [`FileFlags::Exclusive`].
    pub fn create<P: AsRef<Path>>(path: P, flags: FileFlags) -> Result<Self> {
        let mode = match flags {
            FileFlags::Truncate => H5F_ACC_TRUNC,
            FileFlags::Exclusive => H5F_ACC_EXCL,
            other => return Err(fail(ErrorClass::Args, format!("cannot create with {other:?}")).into()),
        };
        let name = to_cstring(CLASS, &path_key(path.as_ref()))?;
        // SAFETY: `name` is NUL-terminated and outlives the call.
        let id = h5call(CLASS, "H5Fcreate", || unsafe {
            H5Fcreate(name.as_ptr(), mode, H5P_DEFAULT, H5P_DEFAULT)
        })?;
        tracing::debug!(path = %path.as_ref().display(), ?flags, "created file");
        Ok(Self::from_id(id))
    }

    /// Opens an existing file. `flags` must be [`FileFlags::ReadOnly`] or
    /// [`FileFlags::ReadWrite`].
    pub fn open<P: AsRef<Path>>(path: P, flags: FileFlags) -> Result<Self> {
        let mode = match flags {
            FileFlags::ReadOnly => H5F_ACC_RDONLY,
            FileFlags::ReadWrite => H5F_ACC_RDWR,
            other => return Err(fail(ErrorClass::Args, format!("cannot open with {other:?}")).into()),
        };
        let name = to_cstring(CLASS, &path_key(path.as_ref()))?;
        // SAFETY: `name` is NUL-terminated and outlives the call.
        let id = h5call(CLASS, "H5Fopen", || unsafe { H5Fopen(name.as_ptr(), mode, H5P_DEFAULT) })?;
        Ok(Self::from_id(id))
    }

    /// A second, independent handle to the same file.
    pub fn reopen(&self) -> Result<Self> {
        // SAFETY: plain file call.
        let id = h5call(CLASS, "H5Freopen", || unsafe { H5Freopen(self.id()) })?;
        Ok(Self::from_id(id))
    }

    /// Whether `path` names a readable HDF5 file.
    #[allow(deprecated)]
    pub fn is_hdf5<P: AsRef<Path>>(path: P) -> bool {
        let Ok(name) = to_cstring(CLASS, &path_key(path.as_ref())) else {
            return false;
        };
        // SAFETY: `name` is NUL-terminated and outlives the call.
        sync(|| unsafe { H5Fis_hdf5(name.as_ptr()) }) > 0
    }

    pub fn flush(&self) -> Result<()> {
        // SAFETY: plain file call.
        h5call(CLASS, "H5Fflush", || unsafe {
            H5Fflush(self.id(), H5F_scope_t::H5F_SCOPE_LOCAL)
        })?;
        Ok(())
    }
}

impl Location for File {
    fn loc_id(&self) -> Hid {
        self.id()
    }
}
