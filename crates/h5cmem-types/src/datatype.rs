//! Semantic datatype descriptors mirroring native HDF5 datatype handles.
//!
//! A [`TypeDescriptor`] describes the in-memory layout the native library
//! expects for one element: its class, its byte size and, for compound,
//! array and variable-length types, the nested member layout.

use std::fmt;

use crate::error::{Error, Result};
use crate::registry::VARIABLE;

/// Native scalar kinds with a canonical `H5T_NATIVE_*` counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// `hbool_t`, one byte.
    Bool,
    /// C `char`, one byte.
    Char,
}

impl PrimitiveKind {
    /// Every kind, in registry order.
    pub const ALL: [PrimitiveKind; 12] = [
        PrimitiveKind::Int8,
        PrimitiveKind::Int16,
        PrimitiveKind::Int32,
        PrimitiveKind::Int64,
        PrimitiveKind::UInt8,
        PrimitiveKind::UInt16,
        PrimitiveKind::UInt32,
        PrimitiveKind::UInt64,
        PrimitiveKind::Float32,
        PrimitiveKind::Float64,
        PrimitiveKind::Bool,
        PrimitiveKind::Char,
    ];

    /// Width in bytes.
    pub const fn size(self) -> usize {
        match self {
            PrimitiveKind::Int8
            | PrimitiveKind::UInt8
            | PrimitiveKind::Bool
            | PrimitiveKind::Char => 1,
            PrimitiveKind::Int16 | PrimitiveKind::UInt16 => 2,
            PrimitiveKind::Int32 | PrimitiveKind::UInt32 | PrimitiveKind::Float32 => 4,
            PrimitiveKind::Int64 | PrimitiveKind::UInt64 | PrimitiveKind::Float64 => 8,
        }
    }

    pub const fn class(self) -> TypeClass {
        match self {
            PrimitiveKind::Float32 | PrimitiveKind::Float64 => TypeClass::Float,
            _ => TypeClass::Integer,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Int8
                | PrimitiveKind::Int16
                | PrimitiveKind::Int32
                | PrimitiveKind::Int64
                | PrimitiveKind::Char
        )
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Lower-case name used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Int8 => "int8",
            PrimitiveKind::Int16 => "int16",
            PrimitiveKind::Int32 => "int32",
            PrimitiveKind::Int64 => "int64",
            PrimitiveKind::UInt8 => "uint8",
            PrimitiveKind::UInt16 => "uint16",
            PrimitiveKind::UInt32 => "uint32",
            PrimitiveKind::UInt64 => "uint64",
            PrimitiveKind::Float32 => "float32",
            PrimitiveKind::Float64 => "float64",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Char => "char",
        }
    }
}

/// Native datatype classes (`H5T_class_t`).
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    NoClass = -1,
    Integer = 0,
    Float = 1,
    Time = 2,
    String = 3,
    Bitfield = 4,
    Opaque = 5,
    Compound = 6,
    Reference = 7,
    Enum = 8,
    VarLen = 9,
    Array = 10,
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeClass::NoClass => "no-class",
            TypeClass::Integer => "integer",
            TypeClass::Float => "float",
            TypeClass::Time => "time",
            TypeClass::String => "string",
            TypeClass::Bitfield => "bitfield",
            TypeClass::Opaque => "opaque",
            TypeClass::Compound => "compound",
            TypeClass::Reference => "reference",
            TypeClass::Enum => "enum",
            TypeClass::VarLen => "vlen",
            TypeClass::Array => "array",
        };
        f.write_str(name)
    }
}

/// Storage of a string datatype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringSize {
    /// Pointer to a NUL-terminated heap block.
    Variable,
    /// Inline, NUL-padded, exactly this many bytes.
    Fixed(usize),
}

/// A named member of a compound datatype.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompoundMember {
    /// Member name.
    pub name: String,
    /// Byte offset within the compound.
    pub byte_offset: usize,
    /// Member datatype.
    pub datatype: TypeDescriptor,
}

/// One native-compatible datatype.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    /// Multi-dimensional fixed array; nested Rust arrays are flattened.
    FixedArray {
        base_type: Box<TypeDescriptor>,
        dimensions: Vec<usize>,
    },
    /// `hvl_t` sequence.
    VariableLength { base_type: Box<TypeDescriptor> },
    String(StringSize),
    Compound {
        size: usize,
        members: Vec<CompoundMember>,
    },
}

impl TypeDescriptor {
    /// Wraps `base_type` in a fixed array, validating the dimensions.
    pub fn fixed_array(base_type: TypeDescriptor, dimensions: Vec<usize>) -> Result<Self> {
        if dimensions.is_empty() || dimensions.contains(&0) {
            return Err(Error::InvalidDimensions(dimensions));
        }
        Ok(TypeDescriptor::FixedArray {
            base_type: Box::new(base_type),
            dimensions,
        })
    }

    pub fn variable_length(base_type: TypeDescriptor) -> Self {
        TypeDescriptor::VariableLength {
            base_type: Box::new(base_type),
        }
    }

    pub fn class(&self) -> TypeClass {
        match self {
            TypeDescriptor::Primitive(kind) => kind.class(),
            TypeDescriptor::FixedArray { .. } => TypeClass::Array,
            TypeDescriptor::VariableLength { .. } => TypeClass::VarLen,
            TypeDescriptor::String(_) => TypeClass::String,
            TypeDescriptor::Compound { .. } => TypeClass::Compound,
        }
    }

    /// Size in bytes of one element in memory.
    pub fn size(&self) -> usize {
        match self {
            TypeDescriptor::Primitive(kind) => kind.size(),
            TypeDescriptor::FixedArray {
                base_type,
                dimensions,
            } => base_type.size() * dimensions.iter().product::<usize>(),
            TypeDescriptor::VariableLength { .. } => 2 * std::mem::size_of::<usize>(),
            TypeDescriptor::String(StringSize::Variable) => std::mem::size_of::<usize>(),
            TypeDescriptor::String(StringSize::Fixed(n)) => *n,
            TypeDescriptor::Compound { size, .. } => *size,
        }
    }

    /// Compound members; empty for every other class.
    pub fn members(&self) -> &[CompoundMember] {
        match self {
            TypeDescriptor::Compound { members, .. } => members,
            _ => &[],
        }
    }

    pub fn n_members(&self) -> usize {
        self.members().len()
    }

    pub fn member_name(&self, index: usize) -> Option<&str> {
        self.members().get(index).map(|m| m.name.as_str())
    }

    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members().iter().position(|m| m.name == name)
    }

    pub fn member_offset(&self, index: usize) -> Option<usize> {
        self.members().get(index).map(|m| m.byte_offset)
    }

    pub fn member_class(&self, index: usize) -> Option<TypeClass> {
        self.members().get(index).map(|m| m.datatype.class())
    }

    pub fn member_type(&self, index: usize) -> Option<&TypeDescriptor> {
        self.members().get(index).map(|m| &m.datatype)
    }

    /// Rank of an array type, 0 otherwise.
    pub fn ndims(&self) -> usize {
        self.array_dims().map_or(0, <[usize]>::len)
    }

    pub fn array_dims(&self) -> Option<&[usize]> {
        match self {
            TypeDescriptor::FixedArray { dimensions, .. } => Some(dimensions),
            _ => None,
        }
    }

    /// Element type of an array or variable-length type.
    pub fn base_type(&self) -> Option<&TypeDescriptor> {
        match self {
            TypeDescriptor::FixedArray { base_type, .. }
            | TypeDescriptor::VariableLength { base_type } => Some(base_type),
            _ => None,
        }
    }

    pub fn is_variable_str(&self) -> bool {
        matches!(self, TypeDescriptor::String(StringSize::Variable))
    }

    /// Resizes a string type. [`VARIABLE`] makes it variable-length.
    pub fn set_size(&mut self, size: usize) -> Result<()> {
        match self {
            TypeDescriptor::String(storage) if size == VARIABLE => {
                *storage = StringSize::Variable;
                Ok(())
            }
            TypeDescriptor::String(storage) if size > 0 => {
                *storage = StringSize::Fixed(size);
                Ok(())
            }
            other => Err(Error::InvalidSize {
                class: other.class(),
                size,
            }),
        }
    }

    /// Returns a copy with all compound padding removed, recursively.
    pub fn pack(&self) -> TypeDescriptor {
        match self {
            TypeDescriptor::Compound { members, .. } => {
                let mut offset = 0;
                let packed = members
                    .iter()
                    .map(|m| {
                        let datatype = m.datatype.pack();
                        let member = CompoundMember {
                            name: m.name.clone(),
                            byte_offset: offset,
                            datatype,
                        };
                        offset += member.datatype.size();
                        member
                    })
                    .collect();
                TypeDescriptor::Compound {
                    size: offset,
                    members: packed,
                }
            }
            TypeDescriptor::FixedArray {
                base_type,
                dimensions,
            } => TypeDescriptor::FixedArray {
                base_type: Box::new(base_type.pack()),
                dimensions: dimensions.clone(),
            },
            TypeDescriptor::VariableLength { base_type } => {
                TypeDescriptor::variable_length(base_type.pack())
            }
            other => other.clone(),
        }
    }

    /// True if any element of this type embeds a `{len, ptr}` pair or a
    /// string pointer.
    pub fn has_pointers(&self) -> bool {
        match self {
            TypeDescriptor::Primitive(_) | TypeDescriptor::String(StringSize::Fixed(_)) => false,
            TypeDescriptor::String(StringSize::Variable)
            | TypeDescriptor::VariableLength { .. } => true,
            TypeDescriptor::FixedArray { base_type, .. } => base_type.has_pointers(),
            TypeDescriptor::Compound { members, .. } => {
                members.iter().any(|m| m.datatype.has_pointers())
            }
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(kind) => f.write_str(kind.name()),
            TypeDescriptor::FixedArray {
                base_type,
                dimensions,
            } => {
                let dims: Vec<String> = dimensions.iter().map(ToString::to_string).collect();
                write!(f, "array[{}] of {base_type}", dims.join(","))
            }
            TypeDescriptor::VariableLength { base_type } => write!(f, "vlen of {base_type}"),
            TypeDescriptor::String(StringSize::Variable) => f.write_str("string(variable)"),
            TypeDescriptor::String(StringSize::Fixed(n)) => write!(f, "string({n})"),
            TypeDescriptor::Compound { size, members } => {
                write!(f, "compound({size}) {{")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {} @{}", m.name, m.datatype, m.byte_offset)?;
                }
                f.write_str("}")
            }
        }
    }
}

// ---- Compound builder ----

/// Incrementally inserts members into a compound of fixed total size,
/// rejecting what `H5Tinsert` would reject.
#[derive(Debug, Clone)]
pub struct CompoundBuilder {
    size: usize,
    members: Vec<CompoundMember>,
}

impl CompoundBuilder {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            members: Vec::new(),
        }
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        offset: usize,
        datatype: TypeDescriptor,
    ) -> Result<&mut Self> {
        let name = name.into();
        let end = offset + datatype.size();
        if name.is_empty() {
            return Err(invalid_member(name, "empty member name".into()));
        }
        if end > self.size {
            return Err(invalid_member(
                name,
                format!("bytes {offset}..{end} exceed compound size {}", self.size),
            ));
        }
        if self.members.iter().any(|m| m.name == name) {
            return Err(invalid_member(name, "duplicate member name".into()));
        }
        if let Some(other) = self.members.iter().find(|m| {
            let other_end = m.byte_offset + m.datatype.size();
            offset < other_end && m.byte_offset < end
        }) {
            let reason = format!("overlaps member `{}`", other.name);
            return Err(invalid_member(name, reason));
        }
        self.members.push(CompoundMember {
            name,
            byte_offset: offset,
            datatype,
        });
        Ok(self)
    }

    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor::Compound {
            size: self.size,
            members: self.members,
        }
    }
}

fn invalid_member(name: String, reason: String) -> Error {
    Error::InvalidMember { name, reason }
}
