//! Error types for descriptor construction and the buffer codec.

use thiserror::Error;

use crate::datatype::TypeClass;

/// Errors raised while building a [`TypeDescriptor`](crate::TypeDescriptor).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The host type has no native datatype equivalent.
    #[error("unsupported kind: {0}")]
    UnsupportedKind(&'static str),

    /// A compound member could not be inserted.
    #[error("invalid compound member `{name}`: {reason}")]
    InvalidMember { name: String, reason: String },

    /// Array dimensions must be non-empty and strictly positive.
    #[error("invalid array dimensions {0:?}")]
    InvalidDimensions(Vec<usize>),

    /// `set_size` was applied to a class that cannot be resized.
    #[error("cannot set size {size} on a {class} datatype")]
    InvalidSize { class: TypeClass, size: usize },

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("decoding error: {0}")]
    Decoding(#[from] DecodingError),
}

/// Errors raised by [`Encoder`](crate::Encoder).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("cannot encode value of kind {0}")]
    UnsupportedKind(&'static str),

    /// A non-empty sequence was required.
    #[error("empty sequence: {0}")]
    EmptySequence(&'static str),

    #[error("string contains an interior NUL byte at position {position}")]
    InteriorNul { position: usize },

    #[error("string of {len} bytes does not fit in {capacity} bytes")]
    StringTooLong { len: usize, capacity: usize },

    /// The cursor points behind bytes that were already written.
    #[error("offset {offset} overlaps {len} bytes already encoded")]
    Overlap { offset: usize, len: usize },

    #[error("could not allocate {size} bytes of variable-length storage")]
    AllocationFailed { size: usize },

    /// A [`CMarshaler`](crate::CMarshaler) implementation failed.
    #[error("custom marshaler failed: {0}")]
    Marshal(String),

    /// A struct field's pointer target is wider than the field itself.
    #[error("member `{member}` points at a value wider than its own slot")]
    InlinePointer { member: &'static str },
}

/// Errors raised by [`Decoder`](crate::Decoder).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodingError {
    #[error("cannot decode value of kind {0}")]
    UnsupportedKind(&'static str),

    #[error("type mismatch: stored as {expected}, requested as {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("insufficient capacity: need {needed} records, target holds {available}")]
    InsufficientCapacity { needed: usize, available: usize },

    /// The target type chains owned pointers through a pointer.
    #[error("illegal pointer path in target type {0}")]
    IllegalPointerPath(&'static str),

    /// A struct field's pointer target is wider than the field itself.
    #[error("member `{member}` points at a value wider than its own slot")]
    InlinePointer { member: &'static str },

    #[error("read of {needed} bytes at offset {offset} exceeds buffer of {available} bytes")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("null pointer for non-empty variable-length data")]
    NullPointer,

    #[error("string is not valid UTF-8")]
    InvalidUtf8,
}

pub type Result<T> = std::result::Result<T, Error>;
