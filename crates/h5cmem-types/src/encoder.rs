//! Serialisation of Rust values into native memory layout.
//!
//! An [`Encoder`] is the encode buffer: a byte vector written at an explicit
//! offset, plus the out-of-band [`RawBlock`]s that `{len, ptr}` pairs and
//! string pointers inside the buffer refer to. The blocks must stay alive
//! until the native call that reads the buffer has returned; they are released
//! by [`Encoder::free_memory`] or when the encoder is dropped.

use crate::alloc::RawBlock;
use crate::endian::Endianness;
use crate::error::EncodingError;
use crate::h5type::{CMarshaler, H5Type};

type Result<T> = std::result::Result<T, EncodingError>;

#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
    offset: usize,
    allocations: Vec<RawBlock>,
    byte_order: Endianness,
}

impl Encoder {
    /// Encoder writing in native byte order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoder writing scalars in `byte_order`. The `{len, ptr}` words of
    /// sequences and string addresses stay in machine order, since the
    /// blocks they reference only exist in this process.
    pub fn with_byte_order(byte_order: Endianness) -> Self {
        Self {
            buf: Vec::new(),
            offset: 0,
            allocations: Vec::new(),
            byte_order,
        }
    }

    /// Encodes `records` back to back, one every `T::SIZE` bytes.
    pub fn from_records<T: H5Type>(records: &[T]) -> Result<Self> {
        let mut enc = Self::new();
        enc.buf.reserve(records.len() * T::SIZE);
        for (i, record) in records.iter().enumerate() {
            enc.set_offset(i * T::SIZE);
            enc.encode(record)?;
        }
        enc.set_offset(records.len() * T::SIZE);
        enc.finish()?;
        Ok(enc)
    }

    pub fn byte_order(&self) -> Endianness {
        self.byte_order
    }

    /// Encodes one value at the current offset.
    pub fn encode<T: H5Type + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.pad_to_offset()?;
        value.encode(self)
    }

    /// Appends the bytes of a caller-defined layout verbatim.
    pub fn encode_marshaled<M: CMarshaler + ?Sized>(&mut self, value: &M) -> Result<()> {
        let bytes = value.marshal_c()?;
        self.put_bytes(&bytes)
    }

    /// Writes `{len, ptr}` with the elements laid out in a separate block.
    /// An empty sequence is written as `{0, null}` without allocating.
    pub fn encode_vlen<T: H5Type>(&mut self, items: &[T]) -> Result<()> {
        if items.is_empty() {
            self.put_word(0)?;
            return self.put_word(0);
        }

        let mut payload = Encoder::with_byte_order(self.byte_order);
        for (i, item) in items.iter().enumerate() {
            payload.set_offset(i * T::SIZE);
            payload.encode(item)?;
        }
        payload.set_offset(items.len() * T::SIZE);
        payload.finish()?;

        let block = RawBlock::from_bytes(&payload.buf).ok_or(EncodingError::AllocationFailed {
            size: payload.buf.len(),
        })?;
        self.allocations.append(&mut payload.allocations);
        let addr = block.addr();
        self.allocations.push(block);

        self.put_word(items.len())?;
        self.put_word(addr)
    }

    /// Writes the address of a fresh NUL-terminated copy of `s`.
    pub fn encode_c_string(&mut self, s: &str) -> Result<()> {
        if let Some(position) = s.bytes().position(|b| b == 0) {
            return Err(EncodingError::InteriorNul { position });
        }
        let mut block = RawBlock::zeroed(s.len() + 1)
            .ok_or(EncodingError::AllocationFailed { size: s.len() + 1 })?;
        block.as_mut_slice()[..s.len()].copy_from_slice(s.as_bytes());
        let addr = block.addr();
        self.allocations.push(block);
        self.put_word(addr)
    }

    // ---- Scalars ----

    pub fn put_u8(&mut self, v: u8) -> Result<()> {
        self.claim(1)?[0] = v;
        Ok(())
    }

    pub fn put_i8(&mut self, v: i8) -> Result<()> {
        self.put_u8(v as u8)
    }

    pub fn put_bool(&mut self, v: bool) -> Result<()> {
        self.put_u8(u8::from(v))
    }

    pub fn put_u16(&mut self, v: u16) -> Result<()> {
        let order = self.byte_order;
        order.write_u16(self.claim(2)?, v);
        Ok(())
    }

    pub fn put_i16(&mut self, v: i16) -> Result<()> {
        self.put_u16(v as u16)
    }

    pub fn put_u32(&mut self, v: u32) -> Result<()> {
        let order = self.byte_order;
        order.write_u32(self.claim(4)?, v);
        Ok(())
    }

    pub fn put_i32(&mut self, v: i32) -> Result<()> {
        self.put_u32(v as u32)
    }

    pub fn put_u64(&mut self, v: u64) -> Result<()> {
        let order = self.byte_order;
        order.write_u64(self.claim(8)?, v);
        Ok(())
    }

    pub fn put_i64(&mut self, v: i64) -> Result<()> {
        self.put_u64(v as u64)
    }

    pub fn put_f32(&mut self, v: f32) -> Result<()> {
        self.put_u32(v.to_bits())
    }

    pub fn put_f64(&mut self, v: f64) -> Result<()> {
        self.put_u64(v.to_bits())
    }

    pub fn put_usize(&mut self, v: usize) -> Result<()> {
        let order = self.byte_order;
        order.write_usize(self.claim(std::mem::size_of::<usize>())?, v);
        Ok(())
    }

    pub fn put_isize(&mut self, v: isize) -> Result<()> {
        self.put_usize(v as usize)
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.claim(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    // ---- Cursor and buffer ----

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Moves the cursor. Moving it behind written bytes makes the next
    /// write fail with [`EncodingError::Overlap`].
    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Bytes written so far. Trailing padding appears after [`finish`](Self::finish).
    pub fn buf(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of live out-of-band blocks.
    pub fn allocations(&self) -> usize {
        self.allocations.len()
    }

    /// Zero-fills the buffer up to the cursor.
    pub fn finish(&mut self) -> Result<()> {
        self.pad_to_offset()?;
        tracing::trace!(
            len = self.buf.len(),
            allocations = self.allocations.len(),
            "encoded buffer"
        );
        Ok(())
    }

    /// Releases the out-of-band blocks. Call only after the native call that
    /// consumed the buffer has returned. Calling it again is a no-op.
    pub fn free_memory(&mut self) {
        if !self.allocations.is_empty() {
            tracing::debug!(count = self.allocations.len(), "freeing encoder allocations");
            self.allocations.clear();
        }
    }

    fn pad_to_offset(&mut self) -> Result<()> {
        let len = self.buf.len();
        if self.offset > len {
            self.buf.resize(self.offset, 0);
        } else if self.offset < len {
            return Err(EncodingError::Overlap {
                offset: self.offset,
                len,
            });
        }
        Ok(())
    }

    fn put_word(&mut self, v: usize) -> Result<()> {
        Endianness::native().write_usize(self.claim(std::mem::size_of::<usize>())?, v);
        Ok(())
    }

    fn claim(&mut self, n: usize) -> Result<&mut [u8]> {
        self.pad_to_offset()?;
        let start = self.buf.len();
        self.buf.resize(start + n, 0);
        self.offset = start + n;
        Ok(&mut self.buf[start..])
    }
}

impl Drop for Encoder {
    fn drop(&mut self) {
        self.free_memory();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_advance_offset() {
        let mut enc = Encoder::with_byte_order(Endianness::Little);
        enc.encode(&1u8).unwrap();
        enc.encode(&0x0203u16).unwrap();
        enc.encode(&-1i32).unwrap();
        assert_eq!(enc.offset(), 7);
        assert_eq!(enc.buf(), &[1, 3, 2, 0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn big_endian_override() {
        let mut enc = Encoder::with_byte_order(Endianness::Big);
        enc.encode(&0x0102_0304u32).unwrap();
        assert_eq!(enc.buf(), &[1, 2, 3, 4]);
    }

    #[test]
    fn forced_order_keeps_sequence_words_native() {
        let foreign = match Endianness::native() {
            Endianness::Little => Endianness::Big,
            Endianness::Big => Endianness::Little,
        };
        let mut enc = Encoder::with_byte_order(foreign);
        enc.encode(&vec![0x0102u16, 0x0304]).unwrap();
        let word = std::mem::size_of::<usize>();
        let native = Endianness::native();
        assert_eq!(native.read_usize(&enc.buf()[..word]), 2);
        let addr = native.read_usize(&enc.buf()[word..2 * word]);
        // SAFETY: addr points at the 4-byte block owned by enc.
        let payload = unsafe { std::slice::from_raw_parts(addr as *const u8, 4) };
        assert_eq!(foreign.read_u16(payload), 0x0102);

        let mut dec = unsafe { crate::Decoder::with_byte_order(enc.buf(), foreign) };
        assert_eq!(dec.decode::<Vec<u16>>().unwrap(), [0x0102, 0x0304]);
    }

    #[test]
    fn gap_is_zero_filled() {
        let mut enc = Encoder::new();
        enc.put_u8(0xaa).unwrap();
        enc.set_offset(4);
        enc.put_u8(0xbb).unwrap();
        assert_eq!(enc.buf(), &[0xaa, 0, 0, 0, 0xbb]);
    }

    #[test]
    fn finish_pads_trailing_bytes() {
        let mut enc = Encoder::new();
        enc.put_u8(7).unwrap();
        enc.set_offset(8);
        assert_eq!(enc.len(), 1);
        enc.finish().unwrap();
        assert_eq!(enc.len(), 8);
    }

    #[test]
    fn overlap_is_rejected() {
        let mut enc = Encoder::new();
        enc.put_u32(1).unwrap();
        enc.set_offset(2);
        assert_eq!(
            enc.put_u8(1),
            Err(EncodingError::Overlap { offset: 2, len: 4 })
        );
    }

    #[test]
    fn empty_vlen_is_null() {
        let mut enc = Encoder::new();
        enc.encode_vlen::<i32>(&[]).unwrap();
        assert_eq!(enc.len(), 2 * std::mem::size_of::<usize>());
        assert!(enc.buf().iter().all(|&b| b == 0));
        assert_eq!(enc.allocations(), 0);
    }

    #[test]
    fn vlen_payload_is_contiguous() {
        let mut enc = Encoder::new();
        enc.encode(&vec![1u16, 2, 3]).unwrap();
        let word = std::mem::size_of::<usize>();
        let order = Endianness::native();
        assert_eq!(order.read_usize(&enc.buf()[..word]), 3);
        let addr = order.read_usize(&enc.buf()[word..2 * word]);
        assert_ne!(addr, 0);
        assert_eq!(enc.allocations(), 1);
        // SAFETY: addr points at the 6-byte block owned by enc.
        let payload = unsafe { std::slice::from_raw_parts(addr as *const u8, 6) };
        assert_eq!(order.read_u16(&payload[4..]), 3);
    }

    #[test]
    fn nested_allocations_are_hoisted() {
        let mut enc = Encoder::new();
        enc.encode(&vec![vec![1u8], vec![2u8, 3]]).unwrap();
        assert_eq!(enc.allocations(), 3);
        enc.free_memory();
        assert_eq!(enc.allocations(), 0);
        enc.free_memory();
    }

    #[test]
    fn c_string_is_nul_terminated() {
        let mut enc = Encoder::new();
        enc.encode("hi").unwrap();
        let addr = Endianness::native().read_usize(enc.buf());
        // SAFETY: addr points at the 3-byte block owned by enc.
        let bytes = unsafe { std::slice::from_raw_parts(addr as *const u8, 3) };
        assert_eq!(bytes, b"hi\0");
    }

    #[test]
    fn c_string_rejects_interior_nul() {
        let mut enc = Encoder::new();
        assert_eq!(
            enc.encode("a\0"),
            Err(EncodingError::InteriorNul { position: 1 })
        );
    }

    struct Tagged(u8);

    impl CMarshaler for Tagged {
        fn marshal_c(&self) -> Result<Vec<u8>> {
            if self.0 == 0 {
                return Err(EncodingError::Marshal("zero tag".into()));
            }
            Ok(vec![b'T', self.0])
        }
    }

    #[test]
    fn marshaler_bytes_are_verbatim() {
        let mut enc = Encoder::new();
        enc.encode_marshaled(&Tagged(9)).unwrap();
        assert_eq!(enc.buf(), b"T\x09");
        assert!(enc.encode_marshaled(&Tagged(0)).is_err());
    }

    #[test]
    fn from_records_spaces_by_size() {
        let enc = Encoder::from_records(&[1i64, 2, 3]).unwrap();
        assert_eq!(enc.len(), 24);
    }
}
