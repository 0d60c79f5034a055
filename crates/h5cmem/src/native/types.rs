//! Conversion between [`TypeDescriptor`]s and native datatypes.
//!
//! Booleans are stored as native unsigned bytes and C `char` as a signed
//! byte, so a descriptor read back from a file reports them as `uint8` and
//! `int8`. [`canonical`] applies the same folding to a descriptor built from
//! Rust types, which makes the two comparable.

use std::ffi::{c_uint, CStr};

use hdf5_metno_sys::h5::{hsize_t, H5free_memory};
use hdf5_metno_sys::h5t::{
    H5T_class_t, H5T_sign_t, H5T_str_t, H5Tarray_create2, H5Tcopy, H5Tcreate,
    H5Tget_array_dims2, H5Tget_array_ndims, H5Tget_class, H5Tget_member_name,
    H5Tget_member_offset, H5Tget_member_type, H5Tget_nmembers, H5Tget_sign, H5Tget_size,
    H5Tget_super, H5Tinsert, H5Tis_variable_str, H5Tset_size, H5Tset_strpad, H5Tvlen_create,
    H5T_C_S1, H5T_NATIVE_DOUBLE, H5T_NATIVE_FLOAT, H5T_NATIVE_INT16, H5T_NATIVE_INT32,
    H5T_NATIVE_INT64, H5T_NATIVE_INT8, H5T_NATIVE_SCHAR, H5T_NATIVE_UINT16, H5T_NATIVE_UINT32,
    H5T_NATIVE_UINT64, H5T_NATIVE_UINT8, H5T_VARIABLE,
};

use h5cmem_types::{CompoundBuilder, PrimitiveKind, StringSize, TypeClass, TypeDescriptor};

use super::{fail, h5call, sync, to_cstring, ErrorClass, Hid, NResult, TempId};

const CLASS: ErrorClass = ErrorClass::Datatype;

fn native_id(kind: PrimitiveKind) -> Hid {
    match kind {
        PrimitiveKind::Int8 => *H5T_NATIVE_INT8,
        PrimitiveKind::Int16 => *H5T_NATIVE_INT16,
        PrimitiveKind::Int32 => *H5T_NATIVE_INT32,
        PrimitiveKind::Int64 => *H5T_NATIVE_INT64,
        PrimitiveKind::UInt8 | PrimitiveKind::Bool => *H5T_NATIVE_UINT8,
        PrimitiveKind::UInt16 => *H5T_NATIVE_UINT16,
        PrimitiveKind::UInt32 => *H5T_NATIVE_UINT32,
        PrimitiveKind::UInt64 => *H5T_NATIVE_UINT64,
        PrimitiveKind::Float32 => *H5T_NATIVE_FLOAT,
        PrimitiveKind::Float64 => *H5T_NATIVE_DOUBLE,
        PrimitiveKind::Char => *H5T_NATIVE_SCHAR,
    }
}

fn copy(id: Hid) -> NResult<TempId> {
    // SAFETY: plain datatype call.
    let id = h5call(CLASS, "H5Tcopy", || unsafe { H5Tcopy(id) })?;
    Ok(TempId::new(id))
}

/// Builds a new transient native datatype. The caller owns the result.
pub(crate) fn create(dt: &TypeDescriptor) -> NResult<TempId> {
    sync(|| match dt {
        TypeDescriptor::Primitive(kind) => copy(native_id(*kind)),
        TypeDescriptor::String(storage) => {
            let id = copy(*H5T_C_S1)?;
            let size = match storage {
                StringSize::Variable => H5T_VARIABLE,
                StringSize::Fixed(n) => *n,
            };
            // SAFETY: plain datatype calls on an owned copy.
            h5call(CLASS, "H5Tset_size", || unsafe { H5Tset_size(id.id(), size) })?;
            if let StringSize::Fixed(_) = storage {
                h5call(CLASS, "H5Tset_strpad", || unsafe {
                    H5Tset_strpad(id.id(), H5T_str_t::H5T_STR_NULLPAD)
                })?;
            }
            Ok(id)
        }
        TypeDescriptor::FixedArray {
            base_type,
            dimensions,
        } => {
            let base = create(base_type)?;
            let dims: Vec<hsize_t> = dimensions.iter().map(|&d| d as hsize_t).collect();
            // SAFETY: `dims` holds `dims.len()` extents.
            let id = h5call(CLASS, "H5Tarray_create2", || unsafe {
                H5Tarray_create2(base.id(), dims.len() as c_uint, dims.as_ptr())
            })?;
            Ok(TempId::new(id))
        }
        TypeDescriptor::VariableLength { base_type } => {
            let base = create(base_type)?;
            // SAFETY: plain datatype call.
            let id = h5call(CLASS, "H5Tvlen_create", || unsafe { H5Tvlen_create(base.id()) })?;
            Ok(TempId::new(id))
        }
        TypeDescriptor::Compound { size, members } => {
            // SAFETY: plain datatype call.
            let id = TempId::new(h5call(CLASS, "H5Tcreate", || unsafe {
                H5Tcreate(H5T_class_t::H5T_COMPOUND, *size)
            })?);
            for member in members {
                let member_type = create(&member.datatype)?;
                let name = to_cstring(CLASS, &member.name)?;
                // SAFETY: `name` is NUL-terminated and outlives the call.
                h5call(CLASS, "H5Tinsert", || unsafe {
                    H5Tinsert(id.id(), name.as_ptr(), member.byte_offset, member_type.id())
                })?;
            }
            Ok(id)
        }
    })
}

/// Reads the structure of a native datatype back into a descriptor.
pub(crate) fn describe(id: Hid) -> NResult<TypeDescriptor> {
    sync(|| {
        // SAFETY: plain datatype calls; failures are reported as sentinels
        // and checked below.
        let class = unsafe { H5Tget_class(id) };
        let size = unsafe { H5Tget_size(id) };
        if class == H5T_class_t::H5T_NO_CLASS || size == 0 {
            return Err(fail(CLASS, format!("invalid datatype identifier {id}")));
        }
        match class {
            H5T_class_t::H5T_INTEGER => {
                // SAFETY: plain datatype call.
                let signed = match unsafe { H5Tget_sign(id) } {
                    H5T_sign_t::H5T_SGN_2 => true,
                    H5T_sign_t::H5T_SGN_NONE => false,
                    _ => return Err(fail(CLASS, "integer type without a sign convention")),
                };
                let kind = match (size, signed) {
                    (1, true) => PrimitiveKind::Int8,
                    (2, true) => PrimitiveKind::Int16,
                    (4, true) => PrimitiveKind::Int32,
                    (8, true) => PrimitiveKind::Int64,
                    (1, false) => PrimitiveKind::UInt8,
                    (2, false) => PrimitiveKind::UInt16,
                    (4, false) => PrimitiveKind::UInt32,
                    (8, false) => PrimitiveKind::UInt64,
                    _ => return Err(fail(CLASS, format!("no {size}-byte integer kind"))),
                };
                Ok(TypeDescriptor::Primitive(kind))
            }
            H5T_class_t::H5T_FLOAT => match size {
                4 => Ok(TypeDescriptor::Primitive(PrimitiveKind::Float32)),
                8 => Ok(TypeDescriptor::Primitive(PrimitiveKind::Float64)),
                _ => Err(fail(CLASS, format!("no {size}-byte float kind"))),
            },
            H5T_class_t::H5T_STRING => {
                // SAFETY: plain datatype call.
                let variable = h5call(CLASS, "H5Tis_variable_str", || unsafe {
                    H5Tis_variable_str(id)
                })? > 0;
                Ok(TypeDescriptor::String(if variable {
                    StringSize::Variable
                } else {
                    StringSize::Fixed(size)
                }))
            }
            H5T_class_t::H5T_VLEN => {
                let base = super_type(id)?;
                Ok(TypeDescriptor::variable_length(describe(base.id())?))
            }
            H5T_class_t::H5T_ARRAY => {
                // SAFETY: plain datatype call.
                let rank = h5call(CLASS, "H5Tget_array_ndims", || unsafe {
                    H5Tget_array_ndims(id)
                })? as usize;
                let mut dims = vec![0 as hsize_t; rank];
                // SAFETY: `dims` holds `rank` extents.
                h5call(CLASS, "H5Tget_array_dims2", || unsafe {
                    H5Tget_array_dims2(id, dims.as_mut_ptr())
                })?;
                let base = super_type(id)?;
                let dims = dims.into_iter().map(|d| d as usize).collect();
                TypeDescriptor::fixed_array(describe(base.id())?, dims)
                    .map_err(|e| fail(CLASS, e.to_string()))
            }
            H5T_class_t::H5T_COMPOUND => describe_compound(id, size),
            other => Err(fail(CLASS, format!("unsupported datatype class {other:?}"))),
        }
    })
}

fn super_type(id: Hid) -> NResult<TempId> {
    // SAFETY: plain datatype call.
    let base = h5call(CLASS, "H5Tget_super", || unsafe { H5Tget_super(id) })?;
    Ok(TempId::new(base))
}

fn describe_compound(id: Hid, size: usize) -> NResult<TypeDescriptor> {
    // SAFETY: plain datatype call.
    let n = h5call(CLASS, "H5Tget_nmembers", || unsafe { H5Tget_nmembers(id) })? as c_uint;
    let mut builder = CompoundBuilder::new(size);
    for i in 0..n {
        // SAFETY: the name is allocated by the library and released with
        // H5free_memory once copied.
        let name = unsafe {
            let raw = H5Tget_member_name(id, i);
            if raw.is_null() {
                return Err(fail(CLASS, format!("member {i} has no name")));
            }
            let name = CStr::from_ptr(raw).to_string_lossy().into_owned();
            H5free_memory(raw.cast());
            name
        };
        // SAFETY: plain datatype calls.
        let offset = unsafe { H5Tget_member_offset(id, i) };
        let member = TempId::new(h5call(CLASS, "H5Tget_member_type", || unsafe {
            H5Tget_member_type(id, i)
        })?);
        builder
            .insert(name, offset, describe(member.id())?)
            .map_err(|e| fail(CLASS, e.to_string()))?;
    }
    Ok(builder.build())
}

pub(crate) fn class_of(id: Hid) -> NResult<TypeClass> {
    // SAFETY: plain datatype call.
    let class = match sync(|| unsafe { H5Tget_class(id) }) {
        H5T_class_t::H5T_INTEGER => TypeClass::Integer,
        H5T_class_t::H5T_FLOAT => TypeClass::Float,
        H5T_class_t::H5T_TIME => TypeClass::Time,
        H5T_class_t::H5T_STRING => TypeClass::String,
        H5T_class_t::H5T_BITFIELD => TypeClass::Bitfield,
        H5T_class_t::H5T_OPAQUE => TypeClass::Opaque,
        H5T_class_t::H5T_COMPOUND => TypeClass::Compound,
        H5T_class_t::H5T_REFERENCE => TypeClass::Reference,
        H5T_class_t::H5T_ENUM => TypeClass::Enum,
        H5T_class_t::H5T_VLEN => TypeClass::VarLen,
        H5T_class_t::H5T_ARRAY => TypeClass::Array,
        _ => return Err(fail(CLASS, format!("invalid datatype identifier {id}"))),
    };
    Ok(class)
}

pub(crate) fn size_of(id: Hid) -> NResult<usize> {
    // SAFETY: plain datatype call.
    match sync(|| unsafe { H5Tget_size(id) }) {
        0 => Err(fail(CLASS, format!("invalid datatype identifier {id}"))),
        size => Ok(size),
    }
}

/// `dt` with booleans and characters folded onto the byte kinds they are
/// stored as.
pub(crate) fn canonical(dt: &TypeDescriptor) -> TypeDescriptor {
    match dt {
        TypeDescriptor::Primitive(PrimitiveKind::Bool) => {
            TypeDescriptor::Primitive(PrimitiveKind::UInt8)
        }
        TypeDescriptor::Primitive(PrimitiveKind::Char) => {
            TypeDescriptor::Primitive(PrimitiveKind::Int8)
        }
        TypeDescriptor::Primitive(_) | TypeDescriptor::String(_) => dt.clone(),
        TypeDescriptor::FixedArray {
            base_type,
            dimensions,
        } => TypeDescriptor::FixedArray {
            base_type: Box::new(canonical(base_type)),
            dimensions: dimensions.clone(),
        },
        TypeDescriptor::VariableLength { base_type } => {
            TypeDescriptor::variable_length(canonical(base_type))
        }
        TypeDescriptor::Compound { size, members } => TypeDescriptor::Compound {
            size: *size,
            members: members
                .iter()
                .map(|m| h5cmem_types::CompoundMember {
                    name: m.name.clone(),
                    byte_offset: m.byte_offset,
                    datatype: canonical(&m.datatype),
                })
                .collect(),
        },
    }
}
