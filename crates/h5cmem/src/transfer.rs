//! Moving typed records between Rust values and native buffers.
//!
//! Writes hand the library an [`Encoder`] buffer laid out in the memory
//! type built from `T`'s descriptor. Reads allocate a [`ReadBuffer`] in the
//! same layout, let the library fill it and decode from it.

use std::sync::Arc;

use h5cmem_types::{descriptor_of, DecodingError, Decoder, H5Decode, H5Type, TypeDescriptor};

use crate::error::{Error, Result};
use crate::native::{fail, h5call, types, ErrorClass, Hid, ReadBuffer, TempId};

/// Descriptor of `T`, checked against the stored type `stored`.
///
/// Types that chain owned pointers through a pointer are refused before the
/// stored type is looked at.
pub(crate) fn check_read<T: H5Type + 'static>(stored: &TempId) -> Result<Arc<TypeDescriptor>> {
    if T::has_illegal_pointer_path() {
        return Err(DecodingError::IllegalPointerPath(std::any::type_name::<T>()).into());
    }
    let dt = descriptor_of::<T>()?;
    let on_file = types::describe(stored.id())?;
    if types::canonical(&dt) != on_file {
        return Err(Error::from(DecodingError::TypeMismatch {
            expected: on_file.to_string(),
            found: dt.to_string(),
        }));
    }
    Ok(dt)
}

/// Descriptor of `T`, which must match the stored type for a write.
pub(crate) fn check_write<T: H5Type + 'static>(stored: &TempId) -> Result<Arc<TypeDescriptor>> {
    let dt = descriptor_of::<T>()?;
    let on_file = types::describe(stored.id())?;
    if types::canonical(&dt) != on_file {
        return Err(fail(
            ErrorClass::Datatype,
            format!("cannot write {dt} into storage of type {on_file}"),
        )
        .into());
    }
    Ok(dt)
}

/// Room for `count` records of `dt`, with a memory type to read them as.
pub(crate) fn read_buffer(dt: &TypeDescriptor, count: usize) -> Result<ReadBuffer> {
    let mem_type = types::create(dt)?;
    Ok(ReadBuffer::zeroed(mem_type, count, dt.size(), dt.has_pointers()))
}

/// Decodes the first `count` records of `rb`.
pub(crate) fn decode_all<T: H5Decode>(rb: &ReadBuffer, count: usize) -> Result<Vec<T>> {
    // SAFETY: every pointer in the buffer references storage the library
    // allocated for this read, which `rb` holds until it is dropped.
    let mut dec = unsafe { Decoder::new(rb.bytes()) };
    let values = (0..count)
        .map(|_| dec.decode())
        .collect::<std::result::Result<Vec<T>, _>>()?;
    Ok(values)
}

/// Decodes the first `count` records of `rb` into the front of `buf`.
pub(crate) fn decode_front<T: H5Decode>(rb: &ReadBuffer, buf: &mut [T], count: usize) -> Result<()> {
    // SAFETY: as in `decode_all`.
    let mut dec = unsafe { Decoder::new(rb.bytes()) };
    dec.decode_slice(buf, count)?;
    Ok(())
}

/// Decodes the records at `positions` of `rb` into the same positions of
/// `buf`.
pub(crate) fn decode_at<T: H5Decode>(rb: &ReadBuffer, buf: &mut [T], positions: &[usize]) -> Result<()> {
    // SAFETY: as in `decode_all`.
    let mut dec = unsafe { Decoder::new(rb.bytes()) };
    for &pos in positions {
        dec.set_offset(pos * T::SIZE);
        dec.decode_into(&mut buf[pos])?;
    }
    Ok(())
}

/// Fails unless `available` slots can hold `needed` records.
pub(crate) fn check_capacity(needed: usize, available: usize) -> Result<()> {
    if available < needed {
        return Err(DecodingError::InsufficientCapacity { needed, available }.into());
    }
    Ok(())
}

/// The stored type of a dataset or attribute, released when dropped.
pub(crate) fn stored_type(class: ErrorClass, call: &'static str, f: impl FnOnce() -> Hid) -> Result<TempId> {
    let id = h5call(class, call, f)?;
    Ok(TempId::new(id))
}
