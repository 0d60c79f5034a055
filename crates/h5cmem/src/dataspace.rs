//! Dataspace handles: extents and selections.

use std::ptr;

use hdf5_metno_sys::h5::hsize_t;
use hdf5_metno_sys::h5s::{
    H5S_seloper_t, H5Scopy, H5Screate, H5Screate_simple, H5Sget_select_npoints,
    H5Sget_simple_extent_dims, H5Sget_simple_extent_ndims, H5Sget_simple_extent_npoints,
    H5Sget_simple_extent_type, H5Sselect_all, H5Sselect_hyperslab,
};

use crate::error::Result;
use crate::identifier::{impl_handle, Identifier};
use crate::native::{fail, h5call, sync, ErrorClass, SpaceClass};

const CLASS: ErrorClass = ErrorClass::Dataspace;

/// The shape of a dataset or attribute, plus an optional selection.
#[derive(Debug)]
pub struct Dataspace {
    ident: Identifier,
}

impl_handle!(Dataspace);

impl Dataspace {
    /// Empty dataspace of the given class.
    pub fn create(class: SpaceClass) -> Result<Self> {
        let native = class
            .to_native()
            .ok_or_else(|| fail(CLASS, "invalid dataspace class"))?;
        // SAFETY: plain dataspace call.
        let id = h5call(CLASS, "H5Screate", || unsafe { H5Screate(native) })?;
        Ok(Self::from_id(id))
    }

    /// Simple dataspace. `maxdims` defaults to `dims`; use
    /// [`UNLIMITED`](crate::UNLIMITED) for growable dimensions.
    pub fn create_simple(dims: &[u64], maxdims: Option<&[u64]>) -> Result<Self> {
        if let Some(maxdims) = maxdims {
            if maxdims.len() != dims.len() {
                return Err(fail(
                    CLASS,
                    format!("rank {} does not match maxdims rank {}", dims.len(), maxdims.len()),
                )
                .into());
            }
        }
        let maxdims_ptr = maxdims.map_or(ptr::null(), <[u64]>::as_ptr);
        // SAFETY: both arrays hold `dims.len()` extents, or maxdims is null.
        let id = h5call(CLASS, "H5Screate_simple", || unsafe {
            H5Screate_simple(dims.len() as _, dims.as_ptr(), maxdims_ptr)
        })?;
        Ok(Self::from_id(id))
    }

    /// An independent copy, selection included.
    pub fn copy(&self) -> Result<Self> {
        // SAFETY: plain dataspace call.
        let id = h5call(CLASS, "H5Scopy", || unsafe { H5Scopy(self.id()) })?;
        Ok(Self::from_id(id))
    }

    pub fn is_simple(&self) -> Result<bool> {
        Ok(self.simple_extent_type()? == SpaceClass::Simple)
    }

    /// Current and maximum dimensions.
    pub fn simple_extent_dims(&self) -> Result<(Vec<u64>, Vec<u64>)> {
        sync(|| {
            let rank = self.simple_extent_ndims()?;
            let mut dims = vec![0 as hsize_t; rank];
            let mut maxdims = vec![0 as hsize_t; rank];
            // SAFETY: both buffers hold `rank` extents.
            h5call(CLASS, "H5Sget_simple_extent_dims", || unsafe {
                H5Sget_simple_extent_dims(self.id(), dims.as_mut_ptr(), maxdims.as_mut_ptr())
            })?;
            Ok((dims, maxdims))
        })
    }

    pub fn simple_extent_ndims(&self) -> Result<usize> {
        // SAFETY: plain dataspace call.
        let rank = h5call(CLASS, "H5Sget_simple_extent_ndims", || unsafe {
            H5Sget_simple_extent_ndims(self.id())
        })?;
        Ok(rank as usize)
    }

    pub fn simple_extent_npoints(&self) -> Result<u64> {
        // SAFETY: plain dataspace call.
        let n = h5call(CLASS, "H5Sget_simple_extent_npoints", || unsafe {
            H5Sget_simple_extent_npoints(self.id())
        })?;
        Ok(n as u64)
    }

    pub fn simple_extent_type(&self) -> Result<SpaceClass> {
        // SAFETY: plain dataspace call.
        let class = sync(|| unsafe { H5Sget_simple_extent_type(self.id()) });
        match SpaceClass::from_native(class) {
            SpaceClass::NoClass => Err(fail(CLASS, "invalid dataspace identifier").into()),
            class => Ok(class),
        }
    }

    /// Replaces the selection with one hyperslab. `stride` and `block`
    /// default to ones.
    pub fn select_hyperslab(
        &self,
        offset: &[u64],
        stride: Option<&[u64]>,
        count: &[u64],
        block: Option<&[u64]>,
    ) -> Result<()> {
        let (dims, _) = self.simple_extent_dims()?;
        let rank = dims.len();
        let ones = vec![1; rank];
        let stride = stride.unwrap_or(&ones);
        let block = block.unwrap_or(&ones);
        if self.simple_extent_type()? != SpaceClass::Simple
            || [offset, stride, count, block].iter().any(|v| v.len() != rank)
        {
            return Err(fail(CLASS, "hyperslab rank mismatch").into());
        }
        for d in 0..rank {
            if count[d] > 0 && stride[d] > 0 && block[d] > 0 {
                let last = offset[d] + (count[d] - 1) * stride[d] + block[d];
                if last > dims[d] {
                    return Err(fail(CLASS, format!("hyperslab exceeds extent in dimension {d}")).into());
                }
            }
        }
        // SAFETY: every array holds `rank` entries.
        h5call(CLASS, "H5Sselect_hyperslab", || unsafe {
            H5Sselect_hyperslab(
                self.id(),
                H5S_seloper_t::H5S_SELECT_SET,
                offset.as_ptr(),
                stride.as_ptr(),
                count.as_ptr(),
                block.as_ptr(),
            )
        })?;
        Ok(())
    }

    pub fn select_all(&self) -> Result<()> {
        // SAFETY: plain dataspace call.
        h5call(CLASS, "H5Sselect_all", || unsafe { H5Sselect_all(self.id()) })?;
        Ok(())
    }

    /// Number of selected elements.
    pub fn select_npoints(&self) -> Result<u64> {
        // SAFETY: plain dataspace call.
        let n = h5call(CLASS, "H5Sget_select_npoints", || unsafe {
            H5Sget_select_npoints(self.id())
        })?;
        Ok(n as u64)
    }
}
