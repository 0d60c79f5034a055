//! Groups and the operations shared by every container.

use std::mem::MaybeUninit;

use hdf5_metno_sys::h5::{H5_index_t, H5_iter_order_t};
use hdf5_metno_sys::h5d::{H5Dcreate2, H5Dopen2};
use hdf5_metno_sys::h5g::{H5G_info_t, H5Gcreate2, H5Gget_info, H5Gopen2};
use hdf5_metno_sys::h5l::{H5Lexists, H5Lget_name_by_idx};
use hdf5_metno_sys::h5p::H5P_DEFAULT;
use hdf5_metno_sys::h5t::{H5Tcommit2, H5Topen2};

use h5cmem_types::{descriptor_of, H5Type};

use crate::attribute::{self, Attribute};
use crate::dataset::Dataset;
use crate::datatype::Datatype;
use crate::dataspace::Dataspace;
use crate::error::Result;
use crate::identifier::{impl_handle, Identifier};
use crate::native::{get_string, h5call, sync, to_cstring, ErrorClass, Hid};
use crate::proplist::PropList;
use crate::table::{self, Table};

const CLASS: ErrorClass = ErrorClass::Symbol;

/// A group inside a file.
#[derive(Debug)]
pub struct Group {
    ident: Identifier,
}

impl_handle!(Group);

impl Location for Group {
    fn loc_id(&self) -> Hid {
        self.id()
    }
}

pub(crate) fn create_dataset(
    loc: Hid,
    name: &str,
    dtype: &Datatype,
    space: &Dataspace,
    dcpl: Option<&PropList>,
) -> Result<Dataset> {
    let name = to_cstring(ErrorClass::Dataset, name)?;
    let dcpl = dcpl.map_or(H5P_DEFAULT, |p| p.id());
    // SAFETY: `name` is NUL-terminated and outlives the call.
    let id = h5call(ErrorClass::Dataset, "H5Dcreate2", || unsafe {
        H5Dcreate2(loc, name.as_ptr(), dtype.id(), space.id(), H5P_DEFAULT, dcpl, H5P_DEFAULT)
    })?;
    Ok(Dataset::from_id(id))
}

pub(crate) fn open_dataset(loc: Hid, name: &str) -> Result<Dataset> {
    let name = to_cstring(ErrorClass::Dataset, name)?;
    // SAFETY: `name` is NUL-terminated and outlives the call.
    let id = h5call(ErrorClass::Dataset, "H5Dopen2", || unsafe {
        H5Dopen2(loc, name.as_ptr(), H5P_DEFAULT)
    })?;
    Ok(Dataset::from_id(id))
}

/// Containers that hold links to groups, datasets, named datatypes and
/// packet tables: [`File`](crate::File) (its root group) and [`Group`].
pub trait Location {
    #[doc(hidden)]
    fn loc_id(&self) -> Hid;

    fn create_group(&self, name: &str) -> Result<Group> {
        let name = to_cstring(CLASS, name)?;
        // SAFETY: `name` is NUL-terminated and outlives the call.
        let id = h5call(CLASS, "H5Gcreate2", || unsafe {
            H5Gcreate2(self.loc_id(), name.as_ptr(), H5P_DEFAULT, H5P_DEFAULT, H5P_DEFAULT)
        })?;
        Ok(Group::from_id(id))
    }

    fn open_group(&self, name: &str) -> Result<Group> {
        let name = to_cstring(CLASS, name)?;
        // SAFETY: `name` is NUL-terminated and outlives the call.
        let id = h5call(CLASS, "H5Gopen2", || unsafe {
            H5Gopen2(self.loc_id(), name.as_ptr(), H5P_DEFAULT)
        })?;
        Ok(Group::from_id(id))
    }

    fn create_dataset(&self, name: &str, dtype: &Datatype, space: &Dataspace) -> Result<Dataset> {
        create_dataset(self.loc_id(), name, dtype, space, None)
    }

    /// Creates a dataset using a dataset-creation property list.
    fn create_dataset_with(
        &self,
        name: &str,
        dtype: &Datatype,
        space: &Dataspace,
        dcpl: &PropList,
    ) -> Result<Dataset> {
        create_dataset(self.loc_id(), name, dtype, space, Some(dcpl))
    }

    fn open_dataset(&self, name: &str) -> Result<Dataset> {
        open_dataset(self.loc_id(), name)
    }

    /// Number of direct children.
    fn num_objects(&self) -> Result<usize> {
        let mut info = MaybeUninit::<H5G_info_t>::uninit();
        // SAFETY: the library fills `info` on success.
        h5call(CLASS, "H5Gget_info", || unsafe {
            H5Gget_info(self.loc_id(), info.as_mut_ptr())
        })?;
        // SAFETY: initialised by the successful call above.
        Ok(unsafe { info.assume_init() }.nlinks as usize)
    }

    /// Name of the `index`-th child, in name order.
    fn object_name_by_index(&self, index: usize) -> Result<String> {
        let loc = self.loc_id();
        // SAFETY: the buffer pointer and size come from `get_string`.
        Ok(get_string(CLASS, "H5Lget_name_by_idx", |buf, size| unsafe {
            H5Lget_name_by_idx(
                loc,
                c".".as_ptr(),
                H5_index_t::H5_INDEX_NAME,
                H5_iter_order_t::H5_ITER_INC,
                index as _,
                buf,
                size,
                H5P_DEFAULT,
            )
        })?)
    }

    /// Whether every component of the relative path `name` exists.
    fn link_exists(&self, name: &str) -> Result<bool> {
        let loc = self.loc_id();
        sync(|| {
            let mut prefix = String::new();
            for part in name.split('/').filter(|p| !p.is_empty()) {
                if !prefix.is_empty() {
                    prefix.push('/');
                }
                prefix.push_str(part);
                let path = to_cstring(CLASS, &prefix)?;
                // SAFETY: `path` is NUL-terminated and outlives the call.
                let found = h5call(CLASS, "H5Lexists", || unsafe {
                    H5Lexists(loc, path.as_ptr(), H5P_DEFAULT)
                })?;
                if found == 0 {
                    return Ok(false);
                }
            }
            Ok(!prefix.is_empty())
        })
    }

    /// Links `dtype` into the file as a named datatype.
    fn commit_datatype(&self, name: &str, dtype: &Datatype) -> Result<()> {
        let name = to_cstring(ErrorClass::Datatype, name)?;
        // SAFETY: `name` is NUL-terminated and outlives the call.
        h5call(ErrorClass::Datatype, "H5Tcommit2", || unsafe {
            H5Tcommit2(
                self.loc_id(),
                name.as_ptr(),
                dtype.id(),
                H5P_DEFAULT,
                H5P_DEFAULT,
                H5P_DEFAULT,
            )
        })?;
        Ok(())
    }

    fn open_datatype(&self, name: &str) -> Result<Datatype> {
        let name = to_cstring(ErrorClass::Datatype, name)?;
        // SAFETY: `name` is NUL-terminated and outlives the call.
        let id = h5call(ErrorClass::Datatype, "H5Topen2", || unsafe {
            H5Topen2(self.loc_id(), name.as_ptr(), H5P_DEFAULT)
        })?;
        Ok(Datatype::from_id(id))
    }

    /// Creates a packet table: a growable 1-D dataset of `dtype` records,
    /// stored in chunks of `chunk_size` records and optionally deflated.
    fn create_table(
        &self,
        name: &str,
        dtype: &Datatype,
        chunk_size: u64,
        compression: Option<u32>,
    ) -> Result<Table> {
        table::create(self.loc_id(), name, dtype, chunk_size, compression)
    }

    /// Creates a packet table whose records are `T`.
    fn create_table_for<T: H5Type + 'static>(
        &self,
        name: &str,
        chunk_size: u64,
        compression: Option<u32>,
    ) -> Result<Table>
    where
        Self: Sized,
    {
        let dt = descriptor_of::<T>()?;
        let dtype = Datatype::from_descriptor(&dt)?;
        self.create_table(name, &dtype, chunk_size, compression)
    }

    fn open_table(&self, name: &str) -> Result<Table> {
        table::open(self.loc_id(), name)
    }

    fn create_attribute(&self, name: &str, dtype: &Datatype, space: &Dataspace) -> Result<Attribute> {
        attribute::create(self.loc_id(), name, dtype, space, None)
    }

    /// Creates an attribute using an attribute-creation property list.
    fn create_attribute_with(
        &self,
        name: &str,
        dtype: &Datatype,
        space: &Dataspace,
        acpl: &PropList,
    ) -> Result<Attribute> {
        attribute::create(self.loc_id(), name, dtype, space, Some(acpl))
    }

    fn open_attribute(&self, name: &str) -> Result<Attribute> {
        attribute::open(self.loc_id(), name)
    }
}
