//! Process-wide canonical native datatypes.
//!
//! The table is built on first use and never mutated afterwards. Callers
//! always receive copies, so releasing a descriptor can never invalidate the
//! canonical instance.

use std::sync::OnceLock;

use crate::datatype::{PrimitiveKind, StringSize, TypeDescriptor};
use crate::error::Result;

/// Size sentinel that turns a string type variable-length (`H5T_VARIABLE`).
pub const VARIABLE: usize = usize::MAX;

struct Registry {
    natives: Vec<TypeDescriptor>,
    c_s1: TypeDescriptor,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let natives: Vec<TypeDescriptor> = PrimitiveKind::ALL
            .iter()
            .map(|&kind| TypeDescriptor::Primitive(kind))
            .collect();
        tracing::debug!(count = natives.len(), "initialised canonical native datatypes");
        Registry {
            natives,
            c_s1: TypeDescriptor::String(StringSize::Fixed(1)),
        }
    })
}

/// Copy of the canonical `H5T_NATIVE_*` type for `kind`.
pub fn native(kind: PrimitiveKind) -> TypeDescriptor {
    registry().natives[kind.index()].clone()
}

/// Copy of the canonical one-byte C string type (`H5T_C_S1`).
pub fn c_s1() -> TypeDescriptor {
    registry().c_s1.clone()
}

/// `H5T_C_S1` resized to [`VARIABLE`].
pub fn variable_string() -> Result<TypeDescriptor> {
    let mut dt = c_s1();
    dt.set_size(VARIABLE)?;
    Ok(dt)
}
