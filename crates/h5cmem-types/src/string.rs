//! Inline, fixed-capacity strings (`H5T_C_S1` resized to `N`).

use std::fmt;

use crate::datatype::{StringSize, TypeDescriptor};
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{DecodingError, EncodingError, Result};
use crate::h5type::{H5Decode, H5Type};
use crate::registry;

/// A UTF-8 string stored inline in exactly `N` NUL-padded bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedString<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> FixedString<N> {
    pub fn new(s: &str) -> std::result::Result<Self, EncodingError> {
        if let Some(position) = s.bytes().position(|b| b == 0) {
            return Err(EncodingError::InteriorNul { position });
        }
        if s.len() > N {
            return Err(EncodingError::StringTooLong {
                len: s.len(),
                capacity: N,
            });
        }
        let mut bytes = [0u8; N];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Ok(Self { bytes })
    }

    /// Contents up to the first NUL.
    pub fn as_str(&self) -> &str {
        let end = self.bytes.iter().position(|&b| b == 0).unwrap_or(N);
        // Construction and decoding both validate UTF-8.
        std::str::from_utf8(&self.bytes[..end]).unwrap_or_default()
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.first().map_or(true, |&b| b == 0)
    }

    pub const fn capacity() -> usize {
        N
    }
}

impl<const N: usize> Default for FixedString<N> {
    fn default() -> Self {
        Self { bytes: [0u8; N] }
    }
}

impl<const N: usize> TryFrom<&str> for FixedString<N> {
    type Error = EncodingError;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl<const N: usize> fmt::Debug for FixedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedString<{N}>({:?})", self.as_str())
    }
}

impl<const N: usize> fmt::Display for FixedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> H5Type for FixedString<N> {
    const SIZE: usize = N;

    fn type_descriptor() -> Result<TypeDescriptor> {
        let mut dt = registry::c_s1();
        dt.set_size(N)?;
        Ok(dt)
    }

    fn encode(&self, enc: &mut Encoder) -> std::result::Result<(), EncodingError> {
        enc.put_bytes(&self.bytes)
    }
}

impl<const N: usize> H5Decode for FixedString<N> {
    fn decode(dec: &mut Decoder<'_>) -> std::result::Result<Self, DecodingError> {
        let s = dec.read_c_string(StringSize::Fixed(N))?;
        let mut bytes = [0u8; N];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Ok(Self { bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn new_pads_with_nul() {
        let s = FixedString::<8>::new("abc").unwrap();
        assert_eq!(s.as_bytes(), b"abc\0\0\0\0\0");
        assert_eq!(s.as_str(), "abc");
        assert_eq!(s.len(), 3);
        assert!(!s.is_empty());
        assert!(FixedString::<4>::default().is_empty());
    }

    #[test]
    fn full_capacity_has_no_terminator() {
        let s = FixedString::<4>::new("abcd").unwrap();
        assert_eq!(s.as_str(), "abcd");
    }

    #[test]
    fn rejects_overflow_and_nul() {
        assert_eq!(
            FixedString::<2>::new("abc"),
            Err(EncodingError::StringTooLong { len: 3, capacity: 2 })
        );
        assert_eq!(
            FixedString::<8>::try_from("a\0b"),
            Err(EncodingError::InteriorNul { position: 1 })
        );
    }

    #[test]
    fn descriptor_is_fixed_string() {
        let dt = FixedString::<16>::type_descriptor().unwrap();
        assert_eq!(dt, TypeDescriptor::String(StringSize::Fixed(16)));
        assert!(!dt.is_variable_str());
        assert!(matches!(
            FixedString::<0>::type_descriptor(),
            Err(Error::InvalidSize { size: 0, .. })
        ));
    }
}
