//! Reconstruction of Rust values from native memory layout.

use std::ffi::{c_char, CStr};

use crate::datatype::StringSize;
use crate::endian::Endianness;
use crate::error::DecodingError;
use crate::h5type::H5Decode;

type Result<T> = std::result::Result<T, DecodingError>;

/// Cursor over a buffer filled by a native read.
#[derive(Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    offset: usize,
    byte_order: Endianness,
}

impl<'a> Decoder<'a> {
    /// # Safety
    ///
    /// Every `{len, ptr}` pair and string pointer embedded in `buf` must be
    /// null or point to live memory of the described size for `'a`.
    pub unsafe fn new(buf: &'a [u8]) -> Self {
        Self::with_byte_order(buf, Endianness::native())
    }

    /// # Safety
    ///
    /// Same contract as [`Decoder::new`].
    pub unsafe fn with_byte_order(buf: &'a [u8], byte_order: Endianness) -> Self {
        Self {
            buf,
            offset: 0,
            byte_order,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.offset)
    }

    /// Decodes one value at the current offset, rejecting types whose
    /// pointer chains cannot be filled from native memory.
    pub fn decode<T: H5Decode>(&mut self) -> Result<T> {
        reject_illegal_pointer_path::<T>()?;
        T::decode(self)
    }

    /// Decodes one value into `target`, rejecting types whose pointer chains
    /// cannot be filled from native memory.
    pub fn decode_into<T: H5Decode>(&mut self, target: &mut T) -> Result<()> {
        reject_illegal_pointer_path::<T>()?;
        *target = T::decode(self)?;
        Ok(())
    }

    /// Decodes `count` consecutive records into the front of `target`.
    pub fn decode_slice<T: H5Decode>(&mut self, target: &mut [T], count: usize) -> Result<()> {
        if target.len() < count {
            return Err(DecodingError::InsufficientCapacity {
                needed: count,
                available: target.len(),
            });
        }
        reject_illegal_pointer_path::<T>()?;
        let base = self.offset;
        for (i, slot) in target.iter_mut().take(count).enumerate() {
            self.offset = base + i * T::SIZE;
            *slot = T::decode(self)?;
        }
        self.offset = base + count * T::SIZE;
        tracing::trace!(count, bytes = count * T::SIZE, "decoded records");
        Ok(())
    }

    /// Reads a `{len, ptr}` pair and decodes the referenced elements.
    pub fn decode_vlen<T: H5Decode>(&mut self) -> Result<Vec<T>> {
        let len = self.get_word()?;
        let ptr = self.get_word()?;
        if len == 0 {
            return Ok(Vec::new());
        }
        if ptr == 0 {
            return Err(DecodingError::NullPointer);
        }
        // SAFETY: guaranteed by the constructor contract.
        let payload: &'a [u8] =
            unsafe { std::slice::from_raw_parts(ptr as *const u8, len * T::SIZE) };
        let mut child = Decoder {
            buf: payload,
            offset: 0,
            byte_order: self.byte_order,
        };
        (0..len)
            .map(|i| {
                child.offset = i * T::SIZE;
                T::decode(&mut child)
            })
            .collect()
    }

    /// Reads a string stored either behind a pointer or inline.
    ///
    /// A null variable-length string reads back as empty.
    pub fn read_c_string(&mut self, storage: StringSize) -> Result<String> {
        let bytes = match storage {
            StringSize::Variable => {
                let ptr = self.get_word()?;
                if ptr == 0 {
                    return Ok(String::new());
                }
                // SAFETY: guaranteed by the constructor contract.
                unsafe { CStr::from_ptr(ptr as *const c_char) }.to_bytes()
            }
            StringSize::Fixed(n) => {
                let raw = self.take(n)?;
                let end = raw.iter().position(|&b| b == 0).unwrap_or(n);
                &raw[..end]
            }
        };
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodingError::InvalidUtf8)
    }

    // ---- Scalars ----

    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn get_i8(&mut self) -> Result<i8> {
        self.get_u8().map(|v| v as i8)
    }

    /// Any non-zero byte reads as `true`.
    pub fn get_bool(&mut self) -> Result<bool> {
        self.get_u8().map(|v| v != 0)
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        let order = self.byte_order;
        Ok(order.read_u16(self.take(2)?))
    }

    pub fn get_i16(&mut self) -> Result<i16> {
        self.get_u16().map(|v| v as i16)
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        let order = self.byte_order;
        Ok(order.read_u32(self.take(4)?))
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        self.get_u32().map(|v| v as i32)
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        let order = self.byte_order;
        Ok(order.read_u64(self.take(8)?))
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        self.get_u64().map(|v| v as i64)
    }

    pub fn get_f32(&mut self) -> Result<f32> {
        self.get_u32().map(f32::from_bits)
    }

    pub fn get_f64(&mut self) -> Result<f64> {
        self.get_u64().map(f64::from_bits)
    }

    pub fn get_usize(&mut self) -> Result<usize> {
        let order = self.byte_order;
        Ok(order.read_usize(self.take(std::mem::size_of::<usize>())?))
    }

    pub fn get_isize(&mut self) -> Result<isize> {
        self.get_usize().map(|v| v as isize)
    }

    /// Sequence lengths and addresses are always in machine order.
    fn get_word(&mut self) -> Result<usize> {
        Ok(Endianness::native().read_usize(self.take(std::mem::size_of::<usize>())?))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or(DecodingError::OutOfBounds {
                offset: self.offset,
                needed: n,
                available: self.buf.len(),
            })?;
        let bytes = &self.buf[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }
}

fn reject_illegal_pointer_path<T: H5Decode>() -> Result<()> {
    if T::has_illegal_pointer_path() {
        return Err(DecodingError::IllegalPointerPath(std::any::type_name::<T>()));
    }
    Ok(())
}
