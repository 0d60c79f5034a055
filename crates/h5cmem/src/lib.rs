//! Typed access to HDF5 files, datasets, attributes and packet tables.
//!
//! Values cross the native boundary in the C memory layout produced by
//! [`h5cmem_types`]: derive [`H5Type`] on a `#[repr(C)]` struct and its
//! records can be written and read directly.
//!
//! ```
//! use h5cmem::{Dataspace, Datatype, File, FileFlags, H5Type, Location};
//!
//! #[derive(H5Type, Debug, Clone, PartialEq)]
//! #[repr(C)]
//! struct Sample {
//!     id: i32,
//!     value: f64,
//! }
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("doc.h5");
//! let file = File::create(&path, FileFlags::Truncate).unwrap();
//! let dtype = Datatype::of::<Sample>().unwrap();
//! let space = Dataspace::create_simple(&[2], None).unwrap();
//! let ds = file.create_dataset("samples", &dtype, &space).unwrap();
//! let data = [Sample { id: 1, value: 0.5 }, Sample { id: 2, value: 1.5 }];
//! ds.write(&data).unwrap();
//! assert_eq!(ds.read::<Sample>().unwrap(), data);
//! ```

pub mod attribute;
pub mod dataset;
pub mod dataspace;
pub mod datatype;
pub mod error;
pub mod file;
pub mod group;
pub mod identifier;
mod native;
pub mod proplist;
pub mod table;
mod transfer;

pub use attribute::Attribute;
pub use dataset::Dataset;
pub use dataspace::Dataspace;
pub use datatype::Datatype;
pub use error::{Error, ErrorClass, NativeError, Result};
pub use file::{File, FileFlags};
pub use group::{Group, Location};
pub use identifier::Identifier;
pub use native::{Hid, IType, PropListClass, SpaceClass, INVALID_HID, UNLIMITED};
pub use proplist::PropList;
pub use table::Table;

pub use h5cmem_derive::H5Type;
pub use h5cmem_types::{
    CMarshaler, FixedString, H5Decode, H5Type, PrimitiveKind, StringSize, TypeClass,
    TypeDescriptor, VARIABLE,
};

/// Turns logging of every native failure (as `tracing::error!`) on or off.
/// Off by default.
pub fn set_error_printing(on: bool) {
    native::set_error_printing(on);
}
