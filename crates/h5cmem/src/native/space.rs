//! Dataspace classes and selection enumeration.

use hdf5_metno_sys::h5::hsize_t;
use hdf5_metno_sys::h5s::{
    H5S_class_t, H5S_sel_type, H5Screate_simple, H5Sget_select_hyper_blocklist,
    H5Sget_select_hyper_nblocks, H5Sget_select_type, H5Sget_simple_extent_dims,
    H5Sget_simple_extent_ndims, H5Sget_simple_extent_npoints, H5S_UNLIMITED,
};

use super::{fail, h5call, sync, ErrorClass, Hid, NResult, TempId};

/// Unlimited maximum dimension (`H5S_UNLIMITED`).
pub const UNLIMITED: u64 = H5S_UNLIMITED;

/// Dataspace classes (`H5S_class_t`).
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceClass {
    NoClass = -1,
    Scalar = 0,
    Simple = 1,
    Null = 2,
}

impl SpaceClass {
    pub(crate) fn to_native(self) -> Option<H5S_class_t> {
        match self {
            SpaceClass::NoClass => None,
            SpaceClass::Scalar => Some(H5S_class_t::H5S_SCALAR),
            SpaceClass::Simple => Some(H5S_class_t::H5S_SIMPLE),
            SpaceClass::Null => Some(H5S_class_t::H5S_NULL),
        }
    }

    pub(crate) fn from_native(class: H5S_class_t) -> Self {
        match class {
            H5S_class_t::H5S_SCALAR => SpaceClass::Scalar,
            H5S_class_t::H5S_SIMPLE => SpaceClass::Simple,
            H5S_class_t::H5S_NULL => SpaceClass::Null,
            _ => SpaceClass::NoClass,
        }
    }
}

/// One-dimensional dataspace of `n` elements, everything selected.
pub(crate) fn simple_space(n: usize) -> NResult<TempId> {
    let dims = [n as hsize_t];
    // SAFETY: `dims` outlives the call; a null maxdims means "same as dims".
    let id = h5call(ErrorClass::Dataspace, "H5Screate_simple", || unsafe {
        H5Screate_simple(1, dims.as_ptr(), std::ptr::null())
    })?;
    Ok(TempId::new(id))
}

pub(crate) fn extent_dims(space: Hid) -> NResult<Vec<u64>> {
    sync(|| {
        // SAFETY: plain dataspace call.
        let rank = h5call(ErrorClass::Dataspace, "H5Sget_simple_extent_ndims", || unsafe {
            H5Sget_simple_extent_ndims(space)
        })? as usize;
        let mut dims = vec![0 as hsize_t; rank];
        // SAFETY: `dims` holds `rank` elements.
        h5call(ErrorClass::Dataspace, "H5Sget_simple_extent_dims", || unsafe {
            H5Sget_simple_extent_dims(space, dims.as_mut_ptr(), std::ptr::null_mut())
        })?;
        Ok(dims)
    })
}

/// Row-major linear indices of the selected elements, ascending.
pub(crate) fn selected_indices(space: Hid) -> NResult<Vec<usize>> {
    sync(|| {
        let dims = extent_dims(space)?;
        // SAFETY: plain dataspace call.
        let npoints = h5call(ErrorClass::Dataspace, "H5Sget_simple_extent_npoints", || unsafe {
            H5Sget_simple_extent_npoints(space)
        })?;
        // SAFETY: plain dataspace call.
        match unsafe { H5Sget_select_type(space) } {
            H5S_sel_type::H5S_SEL_ALL => Ok((0..npoints as usize).collect()),
            H5S_sel_type::H5S_SEL_NONE => Ok(Vec::new()),
            H5S_sel_type::H5S_SEL_HYPERSLABS => hyperslab_indices(space, &dims),
            _ => Err(fail(ErrorClass::Dataspace, "unsupported selection type")),
        }
    })
}

fn hyperslab_indices(space: Hid, dims: &[u64]) -> NResult<Vec<usize>> {
    // SAFETY: plain dataspace call.
    let nblocks = h5call(ErrorClass::Dataspace, "H5Sget_select_hyper_nblocks", || unsafe {
        H5Sget_select_hyper_nblocks(space)
    })? as usize;
    let rank = dims.len();
    let mut corners = vec![0 as hsize_t; nblocks * rank * 2];
    // SAFETY: `corners` holds a start and an end coordinate per block.
    h5call(ErrorClass::Dataspace, "H5Sget_select_hyper_blocklist", || unsafe {
        H5Sget_select_hyper_blocklist(space, 0, nblocks as hsize_t, corners.as_mut_ptr())
    })?;

    let mut out = Vec::new();
    for block in corners.chunks_exact(rank * 2) {
        let (start, end) = block.split_at(rank);
        push_block(start, end, dims, &mut out);
    }
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

/// Appends every coordinate of the inclusive box `start..=end`.
fn push_block(start: &[u64], end: &[u64], dims: &[u64], out: &mut Vec<usize>) {
    let mut coord = start.to_vec();
    loop {
        out.push(ravel(&coord, dims) as usize);
        let mut d = coord.len();
        loop {
            if d == 0 {
                return;
            }
            d -= 1;
            if coord[d] < end[d] {
                coord[d] += 1;
                break;
            }
            coord[d] = start[d];
        }
    }
}

fn ravel(coords: &[u64], dims: &[u64]) -> u64 {
    coords.iter().zip(dims).fold(0, |acc, (c, n)| acc * n + c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_walk_is_row_major() {
        let mut out = Vec::new();
        push_block(&[1, 2], &[2, 3], &[4, 6], &mut out);
        assert_eq!(out, vec![8, 9, 14, 15]);
    }

    #[test]
    fn single_element_block() {
        let mut out = Vec::new();
        push_block(&[3], &[3], &[10], &mut out);
        assert_eq!(out, vec![3]);
    }

    #[test]
    fn simple_space_selects_everything() {
        let space = simple_space(5).unwrap();
        assert_eq!(extent_dims(space.id()).unwrap(), vec![5]);
        assert_eq!(selected_indices(space.id()).unwrap(), vec![0, 1, 2, 3, 4]);
    }
}
