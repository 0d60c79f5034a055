//! Datatype handles.

use hdf5_metno_sys::h5t::{H5Tcommitted, H5Tcopy, H5Tequal};

use h5cmem_types::{descriptor_of, registry, H5Type, PrimitiveKind, TypeClass, TypeDescriptor};

use crate::error::Result;
use crate::identifier::{impl_handle, Identifier};
use crate::native::{h5call, types, ErrorClass};

/// A native datatype built from a [`TypeDescriptor`].
#[derive(Debug)]
pub struct Datatype {
    ident: Identifier,
}

impl_handle!(Datatype);

impl Datatype {
    /// Datatype describing `T`.
    pub fn of<T: H5Type + ?Sized + 'static>() -> Result<Self> {
        let dt = descriptor_of::<T>()?;
        Self::from_descriptor(&dt)
    }

    /// Datatype describing the type of `value`.
    pub fn from_value<T: H5Type + ?Sized + 'static>(_value: &T) -> Result<Self> {
        Self::of::<T>()
    }

    pub fn from_descriptor(descriptor: &TypeDescriptor) -> Result<Self> {
        let id = types::create(descriptor)?;
        Ok(Self::from_id(id.into_id()))
    }

    /// Copy of a canonical native type.
    pub fn native(kind: PrimitiveKind) -> Result<Self> {
        Self::from_descriptor(&registry::native(kind))
    }

    /// A new, uncommitted copy.
    pub fn copy(&self) -> Result<Self> {
        // SAFETY: plain datatype call.
        let id = h5call(ErrorClass::Datatype, "H5Tcopy", || unsafe { H5Tcopy(self.id()) })?;
        Ok(Self::from_id(id))
    }

    /// The structure of the type. Booleans read back as `uint8`.
    pub fn descriptor(&self) -> Result<TypeDescriptor> {
        Ok(types::describe(self.id())?)
    }

    pub fn equal(&self, other: &Datatype) -> Result<bool> {
        // SAFETY: plain datatype call.
        let eq = h5call(ErrorClass::Datatype, "H5Tequal", || unsafe {
            H5Tequal(self.id(), other.id())
        })?;
        Ok(eq > 0)
    }

    pub fn class(&self) -> Result<TypeClass> {
        Ok(types::class_of(self.id())?)
    }

    pub fn size(&self) -> Result<usize> {
        Ok(types::size_of(self.id())?)
    }

    /// Whether the type has been committed to a file as a named datatype.
    pub fn committed(&self) -> Result<bool> {
        // SAFETY: plain datatype call.
        let committed = h5call(ErrorClass::Datatype, "H5Tcommitted", || unsafe {
            H5Tcommitted(self.id())
        })?;
        Ok(committed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h5cmem_types::FixedString;

    #[test]
    fn of_matches_descriptor() {
        let dt = Datatype::of::<[[u16; 3]; 2]>().unwrap();
        assert_eq!(dt.class().unwrap(), TypeClass::Array);
        assert_eq!(dt.size().unwrap(), 12);
        assert!(!dt.committed().unwrap());
        assert_eq!(dt.descriptor().unwrap(), *descriptor_of::<[[u16; 3]; 2]>().unwrap());
    }

    #[test]
    fn copies_compare_equal() {
        let a = Datatype::from_value(&FixedString::<4>::default()).unwrap();
        let b = a.copy().unwrap();
        assert_ne!(a.id(), b.id());
        assert!(a.equal(&b).unwrap());
        assert!(!a.equal(&Datatype::native(PrimitiveKind::Int32).unwrap()).unwrap());
    }

    #[test]
    fn unsupported_kind_fails() {
        assert!(Datatype::of::<char>().is_err());
    }

    #[test]
    fn closed_type_is_invalid() {
        let mut dt = Datatype::native(PrimitiveKind::Float64).unwrap();
        dt.close().unwrap();
        assert!(!dt.is_valid());
        assert!(dt.size().is_err());
    }
}
