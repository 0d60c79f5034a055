//! Attributes on groups and datasets.

use std::ffi::c_void;

use hdf5_metno_sys::h5a::{H5Acreate2, H5Aget_space, H5Aget_type, H5Aopen, H5Aread, H5Awrite};
use hdf5_metno_sys::h5p::H5P_DEFAULT;

use h5cmem_types::{Encoder, H5Decode, H5Type};

use crate::datatype::Datatype;
use crate::dataspace::Dataspace;
use crate::error::Result;
use crate::identifier::{impl_handle, Identifier};
use crate::native::{fail, h5call, to_cstring, types, ErrorClass, Hid, PropListClass, TempId};
use crate::proplist::PropList;
use crate::transfer;

const CLASS: ErrorClass = ErrorClass::Attribute;

/// A small named value attached to a group or dataset.
#[derive(Debug)]
pub struct Attribute {
    ident: Identifier,
}

impl_handle!(Attribute);

pub(crate) fn create(
    loc: Hid,
    name: &str,
    dtype: &Datatype,
    space: &Dataspace,
    acpl: Option<&PropList>,
) -> Result<Attribute> {
    if let Some(acpl) = acpl {
        if acpl.class()? != PropListClass::AttributeCreate {
            return Err(fail(ErrorClass::PropList, "not an attribute creation property list").into());
        }
    }
    let acpl = acpl.map_or(H5P_DEFAULT, |p| p.id());
    let name = to_cstring(CLASS, name)?;
    // SAFETY: `name` is NUL-terminated and outlives the call.
    let id = h5call(CLASS, "H5Acreate2", || unsafe {
        H5Acreate2(loc, name.as_ptr(), dtype.id(), space.id(), acpl, H5P_DEFAULT)
    })?;
    Ok(Attribute::from_id(id))
}

pub(crate) fn open(loc: Hid, name: &str) -> Result<Attribute> {
    let name = to_cstring(CLASS, name)?;
    // SAFETY: `name` is NUL-terminated and outlives the call.
    let id = h5call(CLASS, "H5Aopen", || unsafe { H5Aopen(loc, name.as_ptr(), H5P_DEFAULT) })?;
    Ok(Attribute::from_id(id))
}

impl Attribute {
    pub fn space(&self) -> Result<Dataspace> {
        // SAFETY: plain attribute call.
        let id = h5call(CLASS, "H5Aget_space", || unsafe { H5Aget_space(self.id()) })?;
        Ok(Dataspace::from_id(id))
    }

    pub fn datatype(&self) -> Result<Datatype> {
        Ok(Datatype::from_id(self.stored_type()?.into_id()))
    }

    /// Replaces the whole value. `data` must hold at least one record per
    /// element; extra records are ignored.
    pub fn write<T: H5Type + 'static>(&self, data: &[T]) -> Result<()> {
        let stored = self.stored_type()?;
        let dt = transfer::check_write::<T>(&stored)?;
        let count = self.npoints()?;
        if data.len() < count {
            return Err(fail(
                CLASS,
                format!("{} records supplied for an attribute of {count}", data.len()),
            )
            .into());
        }
        let enc = Encoder::from_records(&data[..count])?;
        let mem_type = types::create(&dt)?;
        let buf = enc.buf().as_ptr().cast::<c_void>();
        // SAFETY: `buf` holds `count` records of `mem_type`, and every pointer
        // inside it references a block owned by `enc`.
        h5call(CLASS, "H5Awrite", || unsafe { H5Awrite(self.id(), mem_type.id(), buf) })?;
        Ok(())
    }

    pub fn read<T: H5Decode + 'static>(&self) -> Result<Vec<T>> {
        let stored = self.stored_type()?;
        let dt = transfer::check_read::<T>(&stored)?;
        let count = self.npoints()?;
        let mut rb = transfer::read_buffer(&dt, count)?;
        let ptr = rb.as_mut_ptr();
        // SAFETY: `rb` holds `count` records of its memory type.
        h5call(CLASS, "H5Aread", || unsafe { H5Aread(self.id(), rb.mem_type(), ptr) })?;
        transfer::decode_all(&rb, count)
    }

    /// Reads into `buf`, which must hold at least as many elements as the
    /// attribute.
    pub fn read_into<T: H5Decode + 'static>(&self, buf: &mut [T]) -> Result<()> {
        let stored = self.stored_type()?;
        let dt = transfer::check_read::<T>(&stored)?;
        let count = self.npoints()?;
        transfer::check_capacity(count, buf.len())?;
        let mut rb = transfer::read_buffer(&dt, count)?;
        let ptr = rb.as_mut_ptr();
        // SAFETY: `rb` holds `count` records of its memory type.
        h5call(CLASS, "H5Aread", || unsafe { H5Aread(self.id(), rb.mem_type(), ptr) })?;
        transfer::decode_front(&rb, buf, count)
    }

    fn stored_type(&self) -> Result<TempId> {
        // SAFETY: plain attribute call.
        transfer::stored_type(CLASS, "H5Aget_type", || unsafe { H5Aget_type(self.id()) })
    }

    fn npoints(&self) -> Result<usize> {
        Ok(self.space()?.simple_extent_npoints()? as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{File, FileFlags};
    use crate::group::Location;
    use crate::{Error, SpaceClass};
    use h5cmem_types::DecodingError;

    #[test]
    fn scalar_string_attribute() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::create(dir.path().join("a.h5"), FileFlags::Truncate).unwrap();
        let dt = Datatype::of::<String>().unwrap();
        let sp = Dataspace::create(SpaceClass::Scalar).unwrap();
        let attr = file.create_attribute("title", &dt, &sp).unwrap();
        attr.write(&["hello".to_string()]).unwrap();
        let back: Vec<String> = file.open_attribute("title").unwrap().read().unwrap();
        assert_eq!(back, ["hello"]);
        assert!(file.create_attribute("title", &dt, &sp).is_err());
        assert!(attr.write::<String>(&[]).is_err());
    }

    #[test]
    fn wrong_acpl_class() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::create(dir.path().join("b.h5"), FileFlags::Truncate).unwrap();
        let dt = Datatype::of::<i32>().unwrap();
        let sp = Dataspace::create_simple(&[2], None).unwrap();
        let dcpl = PropList::new(PropListClass::DatasetCreate).unwrap();
        assert!(file.create_attribute_with("x", &dt, &sp, &dcpl).is_err());
        let acpl = PropList::new(PropListClass::AttributeCreate).unwrap();
        let attr = file.create_attribute_with("x", &dt, &sp, &acpl).unwrap();
        let mut small = [0i32; 1];
        assert!(attr.read_into(&mut small).is_err());
    }

    #[test]
    fn boxed_string_target_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::create(dir.path().join("c.h5"), FileFlags::Truncate).unwrap();
        let dt = Datatype::of::<String>().unwrap();
        let sp = Dataspace::create(SpaceClass::Scalar).unwrap();
        let attr = file.create_attribute("s", &dt, &sp).unwrap();
        attr.write(&["x".to_string()]).unwrap();
        let err = attr.read::<Box<String>>().unwrap_err();
        assert!(matches!(
            err,
            Error::Layout(h5cmem_types::Error::Decoding(DecodingError::IllegalPointerPath(_)))
        ));
    }
}
