//! Error types for the handle layer.

use thiserror::Error;

use h5cmem_types::{DecodingError, EncodingError};

pub use crate::native::{ErrorClass, NativeError};

/// Errors returned by file, group, dataset, attribute and table operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Descriptor construction or buffer codec failure.
    #[error(transparent)]
    Layout(#[from] h5cmem_types::Error),

    /// The native library reported a negative status.
    #[error(transparent)]
    Native(#[from] NativeError),
}

impl From<EncodingError> for Error {
    fn from(e: EncodingError) -> Self {
        Error::Layout(e.into())
    }
}

impl From<DecodingError> for Error {
    fn from(e: DecodingError) -> Self {
        Error::Layout(e.into())
    }
}

impl Error {
    /// Native status code, if this is a native failure.
    pub fn status(&self) -> Option<i32> {
        match self {
            Error::Native(e) => Some(e.status),
            Error::Layout(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
