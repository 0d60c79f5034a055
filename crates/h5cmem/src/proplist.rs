//! Property lists.

use std::ffi::c_int;

use hdf5_metno_sys::h5::hsize_t;
use hdf5_metno_sys::h5d::H5D_layout_t;
use hdf5_metno_sys::h5p::{
    H5Pclose_class, H5Pcopy, H5Pcreate, H5Pequal, H5Pget_chunk, H5Pget_class, H5Pget_layout,
    H5Pset_chunk, H5Pset_deflate, H5Pset_szip,
};

use crate::error::Result;
use crate::identifier::{impl_handle, Identifier};
use crate::native::{fail, h5call, sync, ErrorClass, PropListClass};

const CLASS: ErrorClass = ErrorClass::PropList;

/// Largest chunk rank the library accepts.
const MAX_RANK: usize = 32;

/// Creation, access and transfer settings for files, datasets and
/// attributes.
#[derive(Debug)]
pub struct PropList {
    ident: Identifier,
}

impl_handle!(PropList);

impl PropList {
    pub fn new(class: PropListClass) -> Result<Self> {
        // SAFETY: the class identifier is read under the library lock.
        let id = h5call(CLASS, "H5Pcreate", || unsafe { H5Pcreate(class.class_id()) })?;
        Ok(Self::from_id(id))
    }

    pub fn copy(&self) -> Result<Self> {
        // SAFETY: plain property-list call.
        let id = h5call(CLASS, "H5Pcopy", || unsafe { H5Pcopy(self.id()) })?;
        Ok(Self::from_id(id))
    }

    pub fn class(&self) -> Result<PropListClass> {
        sync(|| {
            // SAFETY: plain property-list call.
            let cls = h5call(CLASS, "H5Pget_class", || unsafe { H5Pget_class(self.id()) })?;
            let found = PropListClass::ALL
                .into_iter()
                // SAFETY: both identifiers are live classes.
                .find(|c| unsafe { H5Pequal(cls, c.class_id()) } > 0);
            // SAFETY: `cls` was returned by H5Pget_class above.
            unsafe { H5Pclose_class(cls) };
            found.ok_or_else(|| fail(CLASS, "unknown property list class").into())
        })
    }

    /// Sets a chunked layout with the given chunk dimensions.
    pub fn set_chunk(&self, dims: &[u64]) -> Result<()> {
        if dims.is_empty() || dims.len() > MAX_RANK {
            return Err(fail(CLASS, format!("chunk rank {} out of range", dims.len())).into());
        }
        // SAFETY: `dims` holds `dims.len()` extents.
        h5call(CLASS, "H5Pset_chunk", || unsafe {
            H5Pset_chunk(self.id(), dims.len() as c_int, dims.as_ptr())
        })?;
        Ok(())
    }

    pub fn chunk(&self) -> Result<Vec<u64>> {
        sync(|| {
            // SAFETY: plain property-list call.
            let layout = unsafe { H5Pget_layout(self.id()) };
            if layout != H5D_layout_t::H5D_CHUNKED {
                return Err(fail(CLASS, "layout is not chunked").into());
            }
            let mut dims = vec![0 as hsize_t; MAX_RANK];
            // SAFETY: `dims` holds MAX_RANK extents.
            let rank = h5call(CLASS, "H5Pget_chunk", || unsafe {
                H5Pget_chunk(self.id(), MAX_RANK as c_int, dims.as_mut_ptr())
            })?;
            dims.truncate(rank as usize);
            Ok(dims)
        })
    }

    /// Adds the deflate filter at `level` (0..=9).
    pub fn set_deflate(&self, level: u32) -> Result<()> {
        // SAFETY: plain property-list call.
        h5call(CLASS, "H5Pset_deflate", || unsafe { H5Pset_deflate(self.id(), level) })?;
        Ok(())
    }

    pub fn set_szip(&self, options_mask: u32, pixels_per_block: u32) -> Result<()> {
        // SAFETY: plain property-list call.
        h5call(CLASS, "H5Pset_szip", || unsafe {
            H5Pset_szip(self.id(), options_mask, pixels_per_block)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_create_settings() {
        let dcpl = PropList::new(PropListClass::DatasetCreate).unwrap();
        assert!(dcpl.chunk().is_err());
        dcpl.set_chunk(&[16]).unwrap();
        dcpl.set_deflate(4).unwrap();
        let copy = dcpl.copy().unwrap();
        assert_eq!(copy.class().unwrap(), PropListClass::DatasetCreate);
        assert_eq!(copy.chunk().unwrap(), vec![16]);
    }

    #[test]
    fn classes_are_told_apart() {
        for class in [PropListClass::FileAccess, PropListClass::AttributeCreate] {
            assert_eq!(PropList::new(class).unwrap().class().unwrap(), class);
        }
    }

    #[test]
    fn wrong_class_is_native_error() {
        let fapl = PropList::new(PropListClass::FileAccess).unwrap();
        let err = fapl.set_chunk(&[4]).unwrap_err();
        assert!(err.status().unwrap() < 0);
        match err {
            crate::Error::Native(e) => assert_eq!(e.class, ErrorClass::PropList),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn deflate_level_is_checked() {
        let dcpl = PropList::new(PropListClass::DatasetCreate).unwrap();
        assert!(dcpl.set_deflate(10).is_err());
        assert!(dcpl.set_chunk(&[]).is_err());
    }
}
