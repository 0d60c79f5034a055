//! Dataset handles and typed transfers.

use std::ffi::c_void;

use hdf5_metno_sys::h5d::{
    H5Dget_create_plist, H5Dget_space, H5Dget_type, H5Dread, H5Dset_extent, H5Dwrite,
};
use hdf5_metno_sys::h5p::H5P_DEFAULT;
use hdf5_metno_sys::h5s::H5S_ALL;

use h5cmem_types::{Encoder, H5Decode, H5Type};

use crate::attribute::{self, Attribute};
use crate::datatype::Datatype;
use crate::dataspace::Dataspace;
use crate::error::Result;
use crate::identifier::{impl_handle, Identifier};
use crate::native::{fail, h5call, selected_indices, simple_space, types, ErrorClass, Hid, TempId};
use crate::proplist::PropList;
use crate::transfer;

const CLASS: ErrorClass = ErrorClass::Dataset;

/// A multidimensional array of elements of one datatype.
#[derive(Debug)]
pub struct Dataset {
    ident: Identifier,
}

impl_handle!(Dataset);

/// Memory and file spaces for one transfer, plus where the selected
/// records sit in the caller's slice.
struct Plan {
    /// Owns the memory space when one had to be created.
    _mem: Option<TempId>,
    mem_id: Hid,
    file_id: Hid,
    /// Records the memory buffer spans.
    extent: usize,
    /// Slots of the buffer that take part, ascending.
    positions: Vec<usize>,
}

impl Dataset {
    /// A copy of the dataset's extent, with everything selected.
    pub fn space(&self) -> Result<Dataspace> {
        // SAFETY: plain dataset call.
        let id = h5call(CLASS, "H5Dget_space", || unsafe { H5Dget_space(self.id()) })?;
        Ok(Dataspace::from_id(id))
    }

    pub fn datatype(&self) -> Result<Datatype> {
        Ok(Datatype::from_id(self.stored_type()?.into_id()))
    }

    /// A copy of the creation property list.
    pub fn create_plist(&self) -> Result<PropList> {
        // SAFETY: plain dataset call.
        let id = h5call(CLASS, "H5Dget_create_plist", || unsafe {
            H5Dget_create_plist(self.id())
        })?;
        Ok(PropList::from_id(id))
    }

    /// Whether `T` chains owned pointers through a pointer, which the
    /// memory layout cannot represent on read.
    pub fn has_illegal_pointer<T: H5Type + ?Sized>() -> bool {
        T::has_illegal_pointer_path()
    }

    /// Writes the whole dataset from `data` in row-major order.
    pub fn write<T: H5Type + 'static>(&self, data: &[T]) -> Result<()> {
        self.write_subset(data, None, None)
    }

    /// Writes the elements selected in `mem_space` of `data` into the
    /// elements selected in `file_space`. `None` selects everything.
    pub fn write_subset<T: H5Type + 'static>(
        &self,
        data: &[T],
        mem_space: Option<&Dataspace>,
        file_space: Option<&Dataspace>,
    ) -> Result<()> {
        let stored = self.stored_type()?;
        let dt = transfer::check_write::<T>(&stored)?;
        let plan = self.plan(mem_space, file_space)?;
        if data.len() < plan.extent {
            return Err(fail(
                CLASS,
                format!("{} records supplied for a transfer of {}", data.len(), plan.extent),
            )
            .into());
        }
        let enc = Encoder::from_records(&data[..plan.extent])?;
        let mem_type = types::create(&dt)?;
        tracing::trace!(
            id = self.id(),
            records = plan.positions.len(),
            bytes = enc.len(),
            allocations = enc.allocations(),
            "writing dataset"
        );
        let buf = enc.buf().as_ptr().cast::<c_void>();
        // SAFETY: `buf` spans `plan.extent` records of `mem_type`, and every
        // pointer inside it references a block owned by `enc`.
        h5call(CLASS, "H5Dwrite", || unsafe {
            H5Dwrite(self.id(), mem_type.id(), plan.mem_id, plan.file_id, H5P_DEFAULT, buf)
        })?;
        Ok(())
    }

    /// Reads every element.
    pub fn read<T: H5Decode + 'static>(&self) -> Result<Vec<T>> {
        let stored = self.stored_type()?;
        let dt = transfer::check_read::<T>(&stored)?;
        let count = self.npoints()?;
        let mut rb = transfer::read_buffer(&dt, count)?;
        let ptr = rb.as_mut_ptr();
        // SAFETY: `rb` holds `count` records of its memory type.
        h5call(CLASS, "H5Dread", || unsafe {
            H5Dread(self.id(), rb.mem_type(), H5S_ALL, H5S_ALL, H5P_DEFAULT, ptr)
        })?;
        transfer::decode_all(&rb, count)
    }

    /// Reads every element into `buf`, which must be large enough.
    pub fn read_into<T: H5Decode + 'static>(&self, buf: &mut [T]) -> Result<()> {
        let stored = self.stored_type()?;
        let dt = transfer::check_read::<T>(&stored)?;
        let count = self.npoints()?;
        transfer::check_capacity(count, buf.len())?;
        let mut rb = transfer::read_buffer(&dt, count)?;
        let ptr = rb.as_mut_ptr();
        // SAFETY: `rb` holds `count` records of its memory type.
        h5call(CLASS, "H5Dread", || unsafe {
            H5Dread(self.id(), rb.mem_type(), H5S_ALL, H5S_ALL, H5P_DEFAULT, ptr)
        })?;
        transfer::decode_front(&rb, buf, count)
    }

    /// Reads the elements selected in `file_space` into the positions of
    /// `buf` selected in `mem_space`. Unselected positions are untouched.
    ///
    /// Without a `mem_space` the records land packed at the front of `buf`.
    pub fn read_subset<T: H5Decode + 'static>(
        &self,
        buf: &mut [T],
        mem_space: Option<&Dataspace>,
        file_space: Option<&Dataspace>,
    ) -> Result<()> {
        let stored = self.stored_type()?;
        let dt = transfer::check_read::<T>(&stored)?;
        let plan = self.plan(mem_space, file_space)?;
        transfer::check_capacity(plan.extent, buf.len())?;
        let mut rb = transfer::read_buffer(&dt, plan.extent)?;
        let ptr = rb.as_mut_ptr();
        // SAFETY: `rb` spans the whole memory extent.
        h5call(CLASS, "H5Dread", || unsafe {
            H5Dread(self.id(), rb.mem_type(), plan.mem_id, plan.file_id, H5P_DEFAULT, ptr)
        })?;
        transfer::decode_at(&rb, buf, &plan.positions)
    }

    /// Changes the extent of a chunked dataset within its maximum
    /// dimensions.
    pub fn set_extent(&self, dims: &[u64]) -> Result<()> {
        let rank = self.space()?.simple_extent_ndims()?;
        if dims.len() != rank {
            return Err(fail(CLASS, format!("extent rank {} does not match {rank}", dims.len())).into());
        }
        // SAFETY: `dims` holds one extent per dimension.
        h5call(CLASS, "H5Dset_extent", || unsafe { H5Dset_extent(self.id(), dims.as_ptr()) })?;
        Ok(())
    }

    pub fn create_attribute(&self, name: &str, dtype: &Datatype, space: &Dataspace) -> Result<Attribute> {
        attribute::create(self.id(), name, dtype, space, None)
    }

    pub fn create_attribute_with(
        &self,
        name: &str,
        dtype: &Datatype,
        space: &Dataspace,
        acpl: &PropList,
    ) -> Result<Attribute> {
        attribute::create(self.id(), name, dtype, space, Some(acpl))
    }

    pub fn open_attribute(&self, name: &str) -> Result<Attribute> {
        attribute::open(self.id(), name)
    }

    fn stored_type(&self) -> Result<TempId> {
        // SAFETY: plain dataset call.
        transfer::stored_type(CLASS, "H5Dget_type", || unsafe { H5Dget_type(self.id()) })
    }

    fn npoints(&self) -> Result<usize> {
        Ok(self.space()?.simple_extent_npoints()? as usize)
    }

    fn plan(&self, mem_space: Option<&Dataspace>, file_space: Option<&Dataspace>) -> Result<Plan> {
        let file_count = match file_space {
            Some(fs) => fs.select_npoints()? as usize,
            None => self.npoints()?,
        };
        let file_id = file_space.map_or(H5S_ALL, |fs| fs.id());
        match mem_space {
            None => {
                let mem = simple_space(file_count)?;
                Ok(Plan {
                    mem_id: mem.id(),
                    _mem: Some(mem),
                    file_id,
                    extent: file_count,
                    positions: (0..file_count).collect(),
                })
            }
            Some(ms) => {
                let positions = selected_indices(ms.id())?;
                if positions.len() != file_count {
                    return Err(fail(
                        ErrorClass::Dataspace,
                        format!(
                            "memory selection of {} elements does not match file selection of {file_count}",
                            positions.len()
                        ),
                    )
                    .into());
                }
                Ok(Plan {
                    _mem: None,
                    mem_id: ms.id(),
                    file_id,
                    extent: ms.simple_extent_npoints()? as usize,
                    positions,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{File, FileFlags};
    use crate::group::Location;
    use crate::{Error, PropListClass, UNLIMITED};
    use h5cmem_types::DecodingError;

    fn scratch(name: &str) -> (tempfile::TempDir, File) {
        let dir = tempfile::tempdir().unwrap();
        let file = File::create(dir.path().join(name), FileFlags::Truncate).unwrap();
        (dir, file)
    }

    #[test]
    fn strided_subset_lands_in_place() {
        let (_dir, file) = scratch("d-subset.h5");
        let dt = Datatype::of::<i32>().unwrap();
        let sp = Dataspace::create_simple(&[6], None).unwrap();
        let ds = file.create_dataset("v", &dt, &sp).unwrap();
        ds.write(&[0, 1, 2, 3, 4, 5]).unwrap();

        let fs = ds.space().unwrap();
        fs.select_hyperslab(&[1], Some(&[2]), &[3], None).unwrap();
        let ms = Dataspace::create_simple(&[4], None).unwrap();
        ms.select_hyperslab(&[1], None, &[3], None).unwrap();
        let mut out = [-1i32; 4];
        ds.read_subset(&mut out, Some(&ms), Some(&fs)).unwrap();
        assert_eq!(out, [-1, 1, 3, 5]);

        let mut packed = [0i32; 3];
        ds.read_subset(&mut packed, None, Some(&fs)).unwrap();
        assert_eq!(packed, [1, 3, 5]);
    }

    #[test]
    fn mismatched_selections_are_refused() {
        let (_dir, file) = scratch("d-mismatch.h5");
        let dt = Datatype::of::<u8>().unwrap();
        let sp = Dataspace::create_simple(&[4], None).unwrap();
        let ds = file.create_dataset("v", &dt, &sp).unwrap();
        let ms = Dataspace::create_simple(&[4], None).unwrap();
        ms.select_hyperslab(&[0], None, &[2], None).unwrap();
        let err = ds.write_subset(&[1u8, 2, 3, 4], Some(&ms), None).unwrap_err();
        assert!(matches!(err, Error::Native(ref e) if e.class == ErrorClass::Dataspace));
        assert!(ds.write(&[1u8, 2]).is_err());
    }

    #[test]
    fn write_of_another_type_is_a_datatype_error() {
        let (_dir, file) = scratch("d-type.h5");
        let dt = Datatype::of::<f64>().unwrap();
        let sp = Dataspace::create_simple(&[2], None).unwrap();
        let ds = file.create_dataset("v", &dt, &sp).unwrap();
        let err = ds.write(&[1i64, 2]).unwrap_err();
        assert!(matches!(err, Error::Native(ref e) if e.class == ErrorClass::Datatype));
        let err = ds.read::<f32>().unwrap_err();
        assert!(matches!(
            err,
            Error::Layout(h5cmem_types::Error::Decoding(DecodingError::TypeMismatch { .. }))
        ));
    }

    #[test]
    fn chunked_dataset_grows() {
        let (_dir, file) = scratch("d-grow.h5");
        let dcpl = PropList::new(PropListClass::DatasetCreate).unwrap();
        dcpl.set_chunk(&[4]).unwrap();
        let dt = Datatype::of::<u16>().unwrap();
        let sp = Dataspace::create_simple(&[2], Some(&[UNLIMITED])).unwrap();
        let ds = file.create_dataset_with("v", &dt, &sp, &dcpl).unwrap();
        ds.write(&[7u16, 8]).unwrap();
        ds.set_extent(&[5]).unwrap();
        assert_eq!(ds.read::<u16>().unwrap(), [7, 8, 0, 0, 0]);
        assert!(ds.set_extent(&[5, 1]).is_err());
        assert_eq!(ds.create_plist().unwrap().chunk().unwrap(), [4]);
    }

    #[test]
    fn strings_and_sequences_survive_overwrite() {
        let (_dir, file) = scratch("d-vlen.h5");
        let dt = Datatype::of::<Vec<String>>().unwrap();
        let sp = Dataspace::create_simple(&[2], None).unwrap();
        let ds = file.create_dataset("v", &dt, &sp).unwrap();
        for round in 0..3 {
            let data = vec![
                vec![format!("a{round}"), "b".to_string()],
                Vec::new(),
            ];
            ds.write(&data).unwrap();
            assert_eq!(ds.read::<Vec<String>>().unwrap(), data);
        }
    }
}
