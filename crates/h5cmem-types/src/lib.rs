//! Native memory layout for HDF5 datatypes.
//!
//! This crate maps Rust types to HDF5 datatype descriptors and encodes and
//! decodes values in the exact in-memory layout the native library reads and
//! writes: native byte order, natural C struct alignment, `{len, ptr}` pairs
//! for variable-length sequences and pointers to NUL-terminated blocks for
//! variable-length strings.
//!
//! ```
//! use h5cmem_types::{Decoder, Encoder, H5Type};
//!
//! let dt = <[[f32; 3]; 2]>::type_descriptor().unwrap();
//! assert_eq!(dt.array_dims(), Some(&[2, 3][..]));
//!
//! let enc = Encoder::from_records(&[vec![1i32, 2, 3], vec![]]).unwrap();
//! // SAFETY: the buffer's pointers reference blocks owned by `enc`.
//! let mut dec = unsafe { Decoder::new(enc.buf()) };
//! let first: Vec<i32> = dec.decode().unwrap();
//! assert_eq!(first, [1, 2, 3]);
//! ```

pub mod alloc;
pub mod cache;
pub mod datatype;
pub mod decoder;
pub mod encoder;
pub mod endian;
pub mod error;
pub mod h5type;
pub mod registry;
pub mod string;

pub use alloc::RawBlock;
pub use cache::descriptor_of;
pub use datatype::{
    CompoundBuilder, CompoundMember, PrimitiveKind, StringSize, TypeClass, TypeDescriptor,
};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use endian::Endianness;
pub use error::{DecodingError, EncodingError, Error, Result};
pub use h5type::{CMarshaler, H5Decode, H5Type};
pub use registry::VARIABLE;
pub use string::FixedString;
