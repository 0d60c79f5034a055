//! Mapping from Rust types to native datatypes and their memory encoding.
//!
//! [`H5Type`] is implemented for the scalar primitives, fixed arrays,
//! vectors and slices (variable-length), strings, and pointer-like wrappers.
//! Structs get it through `#[derive(H5Type)]`.

use std::sync::mpsc::Sender;

use crate::datatype::{PrimitiveKind, StringSize, TypeDescriptor};
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{DecodingError, EncodingError, Error, Result};
use crate::registry;

/// A Rust type with a native datatype counterpart.
pub trait H5Type {
    /// Size in bytes of one element in native memory layout.
    const SIZE: usize;

    /// Number of owned-pointer indirections between the value and its
    /// deepest payload. Strings and vectors count one, `Box`/`&` add one.
    const POINTER_DEPTH: usize = 0;

    /// Builds the datatype descriptor for this type.
    fn type_descriptor() -> Result<TypeDescriptor>;

    /// Writes one element at the encoder's current offset.
    fn encode(&self, enc: &mut Encoder) -> std::result::Result<(), EncodingError>;

    /// True if the type chains a pointer to another pointer and cannot be
    /// safely filled from native memory.
    fn has_illegal_pointer_path() -> bool {
        Self::POINTER_DEPTH > 1
    }
}

/// A type that can be rebuilt from native memory layout.
pub trait H5Decode: H5Type + Sized {
    /// Reads one element at the decoder's current offset.
    fn decode(dec: &mut Decoder<'_>) -> std::result::Result<Self, DecodingError>;
}

/// Escape hatch for caller-defined layouts.
///
/// An `H5Type::encode` implementation can call
/// [`Encoder::encode_marshaled`] to append these bytes verbatim.
pub trait CMarshaler {
    fn marshal_c(&self) -> std::result::Result<Vec<u8>, EncodingError>;
}

// ---- Primitives ----

macro_rules! impl_primitive {
    ($($ty:ty => $kind:expr, $put:ident, $get:ident;)*) => {$(
        impl H5Type for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn type_descriptor() -> Result<TypeDescriptor> {
                Ok(registry::native($kind))
            }

            fn encode(&self, enc: &mut Encoder) -> std::result::Result<(), EncodingError> {
                enc.$put(*self)
            }
        }

        impl H5Decode for $ty {
            fn decode(dec: &mut Decoder<'_>) -> std::result::Result<Self, DecodingError> {
                dec.$get()
            }
        }
    )*};
}

impl_primitive! {
    i8 => PrimitiveKind::Int8, put_i8, get_i8;
    i16 => PrimitiveKind::Int16, put_i16, get_i16;
    i32 => PrimitiveKind::Int32, put_i32, get_i32;
    i64 => PrimitiveKind::Int64, put_i64, get_i64;
    u8 => PrimitiveKind::UInt8, put_u8, get_u8;
    u16 => PrimitiveKind::UInt16, put_u16, get_u16;
    u32 => PrimitiveKind::UInt32, put_u32, get_u32;
    u64 => PrimitiveKind::UInt64, put_u64, get_u64;
    f32 => PrimitiveKind::Float32, put_f32, get_f32;
    f64 => PrimitiveKind::Float64, put_f64, get_f64;
    bool => PrimitiveKind::Bool, put_bool, get_bool;
    usize => UNSIGNED_WORD, put_usize, get_usize;
    isize => SIGNED_WORD, put_isize, get_isize;
}

#[cfg(target_pointer_width = "64")]
const UNSIGNED_WORD: PrimitiveKind = PrimitiveKind::UInt64;
#[cfg(target_pointer_width = "64")]
const SIGNED_WORD: PrimitiveKind = PrimitiveKind::Int64;
#[cfg(target_pointer_width = "32")]
const UNSIGNED_WORD: PrimitiveKind = PrimitiveKind::UInt32;
#[cfg(target_pointer_width = "32")]
const SIGNED_WORD: PrimitiveKind = PrimitiveKind::Int32;

// ---- Fixed arrays ----

impl<T: H5Type, const N: usize> H5Type for [T; N] {
    const SIZE: usize = N * T::SIZE;
    const POINTER_DEPTH: usize = T::POINTER_DEPTH;

    /// Nested arrays flatten into one multi-dimensional descriptor.
    fn type_descriptor() -> Result<TypeDescriptor> {
        match T::type_descriptor()? {
            TypeDescriptor::FixedArray {
                base_type,
                dimensions,
            } => {
                let mut dims = Vec::with_capacity(dimensions.len() + 1);
                dims.push(N);
                dims.extend(dimensions);
                TypeDescriptor::fixed_array(*base_type, dims)
            }
            element => TypeDescriptor::fixed_array(element, vec![N]),
        }
    }

    fn encode(&self, enc: &mut Encoder) -> std::result::Result<(), EncodingError> {
        let base = enc.offset();
        for (i, item) in self.iter().enumerate() {
            enc.set_offset(base + i * T::SIZE);
            enc.encode(item)?;
        }
        enc.set_offset(base + Self::SIZE);
        Ok(())
    }
}

impl<T: H5Decode, const N: usize> H5Decode for [T; N] {
    fn decode(dec: &mut Decoder<'_>) -> std::result::Result<Self, DecodingError> {
        let base = dec.offset();
        let mut items = Vec::with_capacity(N);
        for i in 0..N {
            dec.set_offset(base + i * T::SIZE);
            items.push(T::decode(dec)?);
        }
        dec.set_offset(base + Self::SIZE);
        items
            .try_into()
            .map_err(|v: Vec<T>| DecodingError::InsufficientCapacity {
                needed: N,
                available: v.len(),
            })
    }
}

// ---- Variable-length sequences ----

const HVL_SIZE: usize = 2 * std::mem::size_of::<usize>();

impl<T: H5Type> H5Type for [T] {
    const SIZE: usize = HVL_SIZE;
    const POINTER_DEPTH: usize = 1;

    fn type_descriptor() -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::variable_length(T::type_descriptor()?))
    }

    fn encode(&self, enc: &mut Encoder) -> std::result::Result<(), EncodingError> {
        enc.encode_vlen(self)
    }
}

impl<T: H5Type> H5Type for Vec<T> {
    const SIZE: usize = HVL_SIZE;
    const POINTER_DEPTH: usize = 1;

    fn type_descriptor() -> Result<TypeDescriptor> {
        <[T]>::type_descriptor()
    }

    fn encode(&self, enc: &mut Encoder) -> std::result::Result<(), EncodingError> {
        enc.encode_vlen(self)
    }
}

impl<T: H5Decode> H5Decode for Vec<T> {
    fn decode(dec: &mut Decoder<'_>) -> std::result::Result<Self, DecodingError> {
        dec.decode_vlen()
    }
}

// ---- Strings ----

impl H5Type for str {
    const SIZE: usize = std::mem::size_of::<usize>();
    const POINTER_DEPTH: usize = 1;

    fn type_descriptor() -> Result<TypeDescriptor> {
        registry::variable_string()
    }

    fn encode(&self, enc: &mut Encoder) -> std::result::Result<(), EncodingError> {
        enc.encode_c_string(self)
    }
}

impl H5Type for String {
    const SIZE: usize = std::mem::size_of::<usize>();
    const POINTER_DEPTH: usize = 1;

    fn type_descriptor() -> Result<TypeDescriptor> {
        registry::variable_string()
    }

    fn encode(&self, enc: &mut Encoder) -> std::result::Result<(), EncodingError> {
        enc.encode_c_string(self)
    }
}

impl H5Decode for String {
    fn decode(dec: &mut Decoder<'_>) -> std::result::Result<Self, DecodingError> {
        dec.read_c_string(StringSize::Variable)
    }
}

// ---- Pointers ----

impl<T: H5Type + ?Sized> H5Type for Box<T> {
    const SIZE: usize = T::SIZE;
    const POINTER_DEPTH: usize = T::POINTER_DEPTH + 1;

    fn type_descriptor() -> Result<TypeDescriptor> {
        T::type_descriptor()
    }

    fn encode(&self, enc: &mut Encoder) -> std::result::Result<(), EncodingError> {
        (**self).encode(enc)
    }
}

impl<T: H5Decode> H5Decode for Box<T> {
    fn decode(dec: &mut Decoder<'_>) -> std::result::Result<Self, DecodingError> {
        T::decode(dec).map(Box::new)
    }
}

impl<T: H5Type + ?Sized> H5Type for &T {
    const SIZE: usize = T::SIZE;
    const POINTER_DEPTH: usize = T::POINTER_DEPTH + 1;

    fn type_descriptor() -> Result<TypeDescriptor> {
        T::type_descriptor()
    }

    fn encode(&self, enc: &mut Encoder) -> std::result::Result<(), EncodingError> {
        (**self).encode(enc)
    }
}

// ---- Kinds without a native counterpart ----

macro_rules! impl_unsupported {
    ($name:literal, [$($generics:tt)*] $ty:ty) => {
        impl<$($generics)*> H5Type for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn type_descriptor() -> Result<TypeDescriptor> {
                Err(Error::UnsupportedKind($name))
            }

            fn encode(&self, _enc: &mut Encoder) -> std::result::Result<(), EncodingError> {
                Err(EncodingError::UnsupportedKind($name))
            }
        }

        impl<$($generics)*> H5Decode for $ty {
            fn decode(_dec: &mut Decoder<'_>) -> std::result::Result<Self, DecodingError> {
                Err(DecodingError::UnsupportedKind($name))
            }
        }
    };
}

impl_unsupported!("char", [] char);
impl_unsupported!("unit", [] ());
impl_unsupported!("channel", [T] Sender<T>);
