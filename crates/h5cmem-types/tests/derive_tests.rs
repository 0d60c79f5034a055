//! Compound descriptors and struct encoding generated by `#[derive(H5Type)]`.

use std::mem::offset_of;

use h5cmem_derive::H5Type;
use h5cmem_types::{
    CompoundBuilder, Decoder, DecodingError, EncodingError, Encoder, Endianness, FixedString, H5Type,
    PrimitiveKind, TypeClass, TypeDescriptor,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(H5Type, Debug, Clone, PartialEq)]
#[repr(C)]
struct Padded {
    v1: u8,
    v2: u64,
    v3: u8,
    v4: u16,
}

#[derive(H5Type, Debug, Clone, PartialEq)]
#[repr(C)]
struct Inner {
    a: i32,
    b: String,
}

#[derive(H5Type, Debug, Clone, PartialEq)]
#[repr(C)]
struct Outer {
    a: i32,
    b: String,
    c: Inner,
}

#[derive(H5Type, Debug, Clone, PartialEq)]
#[repr(C)]
struct Renamed {
    #[hdf5(rename = "Index")]
    index: u32,
    #[hdf5(rename = "Label Text")]
    label: FixedString<8>,
    weights: [[f32; 2]; 2],
}

#[derive(H5Type, Debug, Clone, PartialEq)]
#[repr(C)]
struct WithVlen {
    id: u16,
    samples: Vec<f64>,
    tags: Vec<String>,
}

#[derive(H5Type, Debug, Clone, PartialEq)]
#[repr(C)]
struct Generic<T> {
    header: u8,
    value: T,
}

#[derive(H5Type)]
#[repr(C)]
struct Borrowed<'a> {
    name: &'a str,
    value: f32,
}

#[derive(H5Type, Debug, Default, PartialEq)]
#[repr(C)]
struct Boxed {
    inner: Box<String>,
}

#[derive(H5Type, Debug, Default)]
#[repr(C)]
struct WideBox {
    wide: Box<[u8; 16]>,
    tail: u8,
}

#[derive(H5Type, Debug, Default, PartialEq)]
#[repr(C)]
struct NarrowBox {
    narrow: Box<u32>,
    tail: u8,
}

fn roundtrip<T: h5cmem_types::H5Decode>(records: &[T]) -> Vec<T> {
    let enc = Encoder::from_records(records).unwrap();
    assert_eq!(enc.len(), records.len() * T::SIZE);
    // SAFETY: enc owns every block the buffer points at.
    let mut dec = unsafe { Decoder::new(enc.buf()) };
    (0..records.len()).map(|_| dec.decode().unwrap()).collect()
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[test]
fn padded_struct_matches_c_layout() {
    let mut enc = Encoder::with_byte_order(Endianness::Little);
    enc.encode(&Padded {
        v1: 1,
        v2: 2,
        v3: 3,
        v4: 4,
    })
    .unwrap();
    let want: [u8; 20] = [
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
        0x03, 0x00, 0x04, 0x00,
    ];
    assert_eq!(enc.buf(), &want);
    enc.finish().unwrap();
    assert_eq!(enc.len(), Padded::SIZE);
    assert_eq!(Padded::SIZE, 24);
}

#[test]
fn member_offsets_follow_offset_of() {
    let dt = Padded::type_descriptor().unwrap();
    assert_eq!(dt.size(), std::mem::size_of::<Padded>());
    assert_eq!(dt.member_offset(0), Some(offset_of!(Padded, v1)));
    assert_eq!(dt.member_offset(1), Some(offset_of!(Padded, v2)));
    assert_eq!(dt.member_offset(2), Some(offset_of!(Padded, v3)));
    assert_eq!(dt.member_offset(3), Some(offset_of!(Padded, v4)));
    let offsets: Vec<_> = dt.members().iter().map(|m| m.byte_offset).collect();
    assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn descriptor_equals_hand_built_compound() {
    let mut b = CompoundBuilder::new(24);
    b.insert("v1", 0, TypeDescriptor::Primitive(PrimitiveKind::UInt8))
        .unwrap()
        .insert("v2", 8, TypeDescriptor::Primitive(PrimitiveKind::UInt64))
        .unwrap()
        .insert("v3", 16, TypeDescriptor::Primitive(PrimitiveKind::UInt8))
        .unwrap()
        .insert("v4", 18, TypeDescriptor::Primitive(PrimitiveKind::UInt16))
        .unwrap();
    assert_eq!(Padded::type_descriptor().unwrap(), b.build());
}

#[test]
fn pack_removes_struct_padding() {
    let packed = Padded::type_descriptor().unwrap().pack();
    assert_eq!(packed.size(), 12);
    let offsets: Vec<_> = packed.members().iter().map(|m| m.byte_offset).collect();
    assert_eq!(offsets, [0, 1, 9, 10]);
}

// ---------------------------------------------------------------------------
// Introspection
// ---------------------------------------------------------------------------

#[test]
fn nested_compound_members() {
    let dt = Outer::type_descriptor().unwrap();
    assert_eq!(dt.n_members(), 3);
    assert_eq!(dt.member_name(0), Some("a"));
    assert_eq!(dt.member_name(1), Some("b"));
    assert_eq!(dt.member_name(2), Some("c"));
    assert_eq!(dt.member_class(0), Some(TypeClass::Integer));
    assert_eq!(dt.member_class(1), Some(TypeClass::String));
    assert_eq!(dt.member_class(2), Some(TypeClass::Compound));
    assert!(dt.member_type(1).unwrap().is_variable_str());
    assert_eq!(dt.member_type(2).unwrap().n_members(), 2);
}

#[test]
fn rename_is_used_verbatim() {
    let dt = Renamed::type_descriptor().unwrap();
    assert_eq!(dt.member_name(0), Some("Index"));
    assert_eq!(dt.member_name(1), Some("Label Text"));
    assert_eq!(dt.member_name(2), Some("weights"));
    assert_eq!(dt.member_index("Label Text"), Some(1));
    assert_eq!(dt.member_class(1), Some(TypeClass::String));
    let weights = dt.member_type(2).unwrap();
    assert_eq!(weights.array_dims(), Some(&[2, 2][..]));
}

#[test]
fn generic_struct_uses_parameter_type() {
    let dt = Generic::<f64>::type_descriptor().unwrap();
    assert_eq!(dt.member_offset(1), Some(8));
    assert_eq!(dt.member_class(1), Some(TypeClass::Float));
    let dt = Generic::<[u8; 3]>::type_descriptor().unwrap();
    assert_eq!(dt.size(), 4);
}

#[test]
fn unsupported_member_fails_build() {
    let err = Generic::<char>::type_descriptor().unwrap_err();
    assert_eq!(err, h5cmem_types::Error::UnsupportedKind("char"));
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn padded_records_roundtrip() {
    let records = vec![
        Padded {
            v1: 0,
            v2: u64::MAX,
            v3: 255,
            v4: 0xbeef,
        },
        Padded {
            v1: 7,
            v2: 0,
            v3: 1,
            v4: 0,
        },
    ];
    assert_eq!(roundtrip(&records), records);
}

#[test]
fn strings_and_nested_structs_roundtrip() {
    let records = vec![Outer {
        a: -5,
        b: "outer".into(),
        c: Inner {
            a: 42,
            b: String::new(),
        },
    }];
    assert_eq!(roundtrip(&records), records);
}

#[test]
fn fixed_strings_and_arrays_roundtrip() {
    let records = vec![Renamed {
        index: 9,
        label: FixedString::new("sensor").unwrap(),
        weights: [[0.5, -1.5], [f32::MAX, f32::MIN_POSITIVE]],
    }];
    assert_eq!(roundtrip(&records), records);
}

#[test]
fn vlen_members_roundtrip() {
    let records = vec![
        WithVlen {
            id: 1,
            samples: vec![1.0, 2.5, -0.0],
            tags: vec!["x".into(), "yz".into()],
        },
        WithVlen {
            id: 2,
            samples: vec![],
            tags: vec![],
        },
    ];
    assert_eq!(roundtrip(&records), records);
}

#[test]
fn borrowed_struct_encodes() {
    let mut enc = Encoder::new();
    enc.encode(&Borrowed {
        name: "n",
        value: 1.0,
    })
    .unwrap();
    enc.finish().unwrap();
    assert_eq!(enc.len(), Borrowed::SIZE);
    assert_eq!(enc.allocations(), 1);
}

// ---------------------------------------------------------------------------
// Pointer paths
// ---------------------------------------------------------------------------

#[test]
fn struct_with_string_is_legal() {
    assert!(!Outer::has_illegal_pointer_path());
    assert!(!WithVlen::has_illegal_pointer_path());
    assert!(!Box::<Padded>::has_illegal_pointer_path());
}

#[test]
fn boxed_struct_with_string_is_illegal() {
    assert!(Box::<Outer>::has_illegal_pointer_path());
    assert!(<&Outer>::has_illegal_pointer_path());
    assert!(Boxed::has_illegal_pointer_path());
}

#[test]
fn decode_rejects_illegal_target() {
    let enc = Encoder::from_records(&[Boxed::default()]).unwrap();
    let mut dec = unsafe { Decoder::new(enc.buf()) };
    assert!(matches!(
        dec.decode::<Boxed>(),
        Err(DecodingError::IllegalPointerPath(_))
    ));
}

#[test]
fn boxed_field_wider_than_pointer_is_rejected() {
    let err = WideBox::type_descriptor().unwrap_err();
    assert!(matches!(err, h5cmem_types::Error::InvalidMember { ref name, .. } if name == "wide"));

    let mut enc = Encoder::new();
    assert_eq!(
        enc.encode(&WideBox::default()),
        Err(EncodingError::InlinePointer { member: "wide" })
    );

    let buf = [0u8; 32];
    let mut dec = unsafe { Decoder::new(&buf) };
    assert_eq!(
        dec.decode::<WideBox>().unwrap_err(),
        DecodingError::InlinePointer { member: "wide" }
    );
}

#[test]
fn boxed_field_within_pointer_width_is_inline() {
    let dt = NarrowBox::type_descriptor().unwrap();
    assert_eq!(dt.size(), std::mem::size_of::<NarrowBox>());
    assert_eq!(dt.member_offset(0), Some(offset_of!(NarrowBox, narrow)));
    assert_eq!(dt.member_type(0), Some(&TypeDescriptor::Primitive(PrimitiveKind::UInt32)));
    assert_eq!(dt.member_offset(1), Some(offset_of!(NarrowBox, tail)));

    let value = NarrowBox {
        narrow: Box::new(0xdead_beef),
        tail: 7,
    };
    let back = roundtrip(std::slice::from_ref(&value));
    assert_eq!(back, [value]);
}

#[test]
fn decode_into_rejects_illegal_target() {
    let enc = Encoder::from_records(&[Boxed::default()]).unwrap();
    let mut dec = unsafe { Decoder::new(enc.buf()) };
    let mut target = Boxed::default();
    assert!(matches!(
        dec.decode_into(&mut target),
        Err(DecodingError::IllegalPointerPath(_))
    ));
}
