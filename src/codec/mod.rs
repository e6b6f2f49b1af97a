// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The XCDR codec: encode/decode/size/key for any `Value` against its
//! `TypeDescriptor` (spec §4.3).
//!
//! ```ignore
//! use xtypes_dynamic::codec::{encode, decode, Representation};
//!
//! let bytes = encode(&value, &point_type, Representation::XCdrV2).unwrap();
//! let decoded = decode(&bytes, &point_type, Representation::XCdrV2).unwrap();
//! assert_eq!(decoded, value);
//! ```

mod decode;
mod encode;
mod io;
mod key;
mod size;

pub use io::{Endianness, Framing, Representation, XcdrVersion};
pub use key::{get_key, serialize_key};
pub use size::{empty_serialized_size, key_max_serialized_size, max_serialized_size, serialized_size, UNBOUNDED_CAP};

use crate::data_model::Value;
use crate::error::Result;
use crate::type_model::TypeDescriptor;
use io::{decode_header, encode_header, framing_for, CdrReader, CdrWriter};
use std::sync::Arc;

/// Encode `value` of `type_` to the wire, including the 4-byte
/// encapsulation header (spec §4.3's "endianness and encapsulation").
/// Always writes little-endian data (this crate's host byte order); the
/// header's scheme byte records that choice for the reader.
pub fn encode(value: &Value, type_: &Arc<TypeDescriptor>, representation: Representation) -> Result<Vec<u8>> {
    let version = representation.version();
    let framing = framing_for(type_.extensibility, version);
    let mut out = Vec::new();
    encode_header(&mut out, version, framing, Endianness::Little);
    let mut w = CdrWriter::new(Endianness::Little);
    encode::encode_value(&mut w, value, type_, version)?;
    out.extend_from_slice(&w.buf);
    Ok(out)
}

/// Decode a value of `type_` from a byte stream that begins with the
/// 4-byte encapsulation header written by `encode`.
pub fn decode(bytes: &[u8], type_: &Arc<TypeDescriptor>, representation: Representation) -> Result<Value> {
    let (version, _framing, endianness) = decode_header(bytes)?;
    if version != representation.version() {
        return Err(crate::error::Error::BadParameter(format!(
            "encapsulation declares {:?} but caller requested {:?}",
            version,
            representation.version()
        )));
    }
    let mut r = CdrReader::new(&bytes[io::HEADER_LEN..], endianness);
    decode::decode_value(&mut r, type_, version)
}

/// `serialized_size` including the 4-byte encapsulation header, matching
/// what `encode` actually produces (spec §4.3: "adds 4 bytes for this
/// header").
pub fn serialized_size_with_header(value: &Value, type_: &Arc<TypeDescriptor>, representation: Representation) -> Result<usize> {
    Ok(io::HEADER_LEN + serialized_size(value, type_, representation.version())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::{ArrayValue, DynamicData, MapValue, SequenceValue, StructValue, UnionValue};
    use crate::type_model::{Kind, TypeBuilder, TypeDescriptor as TD, MEMBER_ID_INVALID};

    fn strip_header(bytes: &[u8]) -> &[u8] {
        &bytes[io::HEADER_LEN..]
    }

    /// S1 — nested structure round-trip (spec §8).
    #[test]
    fn test_s1_nested_structure_round_trip() {
        let int32 = TD::primitive(Kind::Int32);
        let point = TypeBuilder::new_struct("Point").field("x", int32.clone()).field("y", int32).build().unwrap();
        let poly = TypeBuilder::new_struct("Poly")
            .field("pts", TypeBuilder::new_sequence("Pts", point.clone(), 4).build().unwrap())
            .field("tag", TD::string(false, 16))
            .build()
            .unwrap();

        let mk_point = |x: i32, y: i32| {
            let mut s = StructValue::default();
            s.fields.insert(0, Box::new(Value::Int32(x)));
            s.fields.insert(1, Box::new(Value::Int32(y)));
            Value::Struct(s)
        };
        let mut seq = SequenceValue::default();
        seq.elements.push(Box::new(mk_point(1, 2)));
        seq.elements.push(Box::new(mk_point(3, 4)));

        let mut poly_value = StructValue::default();
        poly_value.fields.insert(0, Box::new(Value::Sequence(seq)));
        poly_value.fields.insert(1, Box::new(Value::String8("hello".into())));
        let value = Value::Struct(poly_value);

        let bytes = encode(&value, &poly, Representation::XCdrV2).unwrap();
        let expected: Vec<u8> = vec![
            0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00,
            0x00, 0x06, 0x00, 0x00, 0x00, 0x68, 0x65, 0x6C, 0x6C, 0x6F, 0x00,
        ];
        assert_eq!(strip_header(&bytes), expected.as_slice());

        let decoded = decode(&bytes, &poly, Representation::XCdrV2).unwrap();
        assert_eq!(decoded, value);
    }

    /// S2 — union with default (spec §8).
    #[test]
    fn test_s2_union_with_default() {
        let int32 = TD::primitive(Kind::Int32);
        let bool_t = TD::primitive(Kind::Bool);
        let u = TypeBuilder::new_union("U", int32.clone())
            .case("a", vec![1], int32.clone())
            .case("b", vec![2], TD::string(false, 8))
            .default_case("c", bool_t)
            .build()
            .unwrap();
        let mut dd = DynamicData::new(u.clone());
        dd.set_discriminator(99).unwrap(); // no case matches -> selects default 'c'
        dd.set_field(2, Value::Bool(true)).unwrap();

        let bytes = encode(dd.value(), &u, Representation::XCdrV2).unwrap();
        assert_eq!(strip_header(&bytes), &[0x00, 0x00, 0x00, 0x00, 0x01]);

        let decoded = decode(&bytes, &u, Representation::XCdrV2).unwrap();
        assert_eq!(&decoded, dd.value());
    }

    /// S3 — array with trailing defaults (spec §8).
    #[test]
    fn test_s3_array_trailing_defaults() {
        let int32 = TD::primitive(Kind::Int32);
        let array_t = TypeBuilder::new_array("A", int32, vec![4]).build().unwrap();
        let mut arr = ArrayValue::default();
        arr.elements.insert(0, Box::new(Value::Int32(7)));
        let value = Value::Array(arr);

        assert_eq!(serialized_size(&value, &array_t, XcdrVersion::V2).unwrap(), 16);
        let bytes = encode(&value, &array_t, Representation::XCdrV2).unwrap();
        let decoded = decode(&bytes, &array_t, Representation::XCdrV2).unwrap();
        let Value::Array(decoded_arr) = decoded else { panic!("expected array") };
        assert_eq!(decoded_arr.elements.get(&0).map(|v| v.as_ref()), Some(&Value::Int32(7)));
        assert!(decoded_arr.elements.get(&1).is_none());
    }

    /// S4 — bitmask selection width (spec §8).
    #[test]
    fn test_s4_bitmask_width_and_wire() {
        let m = TypeBuilder::new_bitmask("M", 12).flag("FLAG_A", 0).flag("FLAG_B", 1).build().unwrap();
        assert_eq!(m.bitmask_storage_bytes(), 2);
        let value = Value::Bitmask(0b11);
        let bytes = encode(&value, &m, Representation::XCdrV2).unwrap();
        assert_eq!(strip_header(&bytes), &[0x03, 0x00]);
    }

    /// S5 — map round-trip (spec §8).
    #[test]
    fn test_s5_map_round_trip() {
        let int32 = TD::primitive(Kind::Int32);
        let string8 = TD::string(false, 8);
        let map_t = TypeBuilder::new_map("M", string8, int32, 2).build().unwrap();
        let mut m = MapValue::default();
        m.insert(Value::String8("hi".into()), Value::Int32(1));
        m.insert(Value::String8("bye".into()), Value::Int32(2));
        let value = Value::Map(m);

        let bytes = encode(&value, &map_t, Representation::XCdrV2).unwrap();
        assert_eq!(&strip_header(&bytes)[..4], &[0x02, 0x00, 0x00, 0x00]);
        let decoded = decode(&bytes, &map_t, Representation::XCdrV2).unwrap();
        assert_eq!(decoded, value);
    }

    /// S6 — key hashing (spec §8).
    #[test]
    fn test_s6_key_hashing() {
        let int32 = TD::primitive(Kind::Int32);
        let string64 = TD::string(false, 64);
        let k = TypeBuilder::new_struct("K").key_field("id", int32).field("name", string64).build().unwrap();
        let mut s = StructValue::default();
        s.fields.insert(0, Box::new(Value::Int32(42)));
        s.fields.insert(1, Box::new(Value::String8("whatever".into())));
        let value = Value::Struct(s);

        let key_bytes = serialize_key(&value, &k).unwrap();
        assert_eq!(key_bytes.len(), 4);
        let handle = get_key(&value, &k, false).unwrap();
        assert_eq!(handle, [0, 0, 0, 42, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_s6_oversized_key_uses_md5() {
        let string_t = TD::string(false, 0);
        let k = TypeBuilder::new_struct("Big").key_field("blob", string_t).build().unwrap();
        let mut s = StructValue::default();
        s.fields.insert(0, Box::new(Value::String8("x".repeat(40))));
        let value = Value::Struct(s);
        let handle = get_key(&value, &k, false).unwrap();
        let by_force = get_key(&value, &k, true).unwrap();
        assert_eq!(handle, by_force);
    }

    #[test]
    fn test_round_trip_both_xcdr_versions() {
        let int32 = TD::primitive(Kind::Int32);
        let t = TypeBuilder::new_struct("T").extensibility(crate::type_model::Extensibility::Appendable).field("x", int32).build().unwrap();
        let mut s = StructValue::default();
        s.fields.insert(0, Box::new(Value::Int32(5)));
        let value = Value::Struct(s);
        for repr in [Representation::XCdrV1, Representation::XCdrV2] {
            let bytes = encode(&value, &t, repr).unwrap();
            let decoded = decode(&bytes, &t, repr).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn test_mutable_struct_unknown_member_is_skipped_by_older_reader() {
        let int32 = TD::primitive(Kind::Int32);
        let wide = TypeBuilder::new_struct("Wide")
            .extensibility(crate::type_model::Extensibility::Mutable)
            .field("a", int32.clone())
            .field("b", int32.clone())
            .build()
            .unwrap();
        let narrow = TypeBuilder::new_struct("Wide")
            .extensibility(crate::type_model::Extensibility::Mutable)
            .field("a", int32)
            .build()
            .unwrap();
        let mut s = StructValue::default();
        s.fields.insert(0, Box::new(Value::Int32(1)));
        s.fields.insert(1, Box::new(Value::Int32(2)));
        let bytes = encode(&Value::Struct(s), &wide, Representation::XCdrV2).unwrap();
        let decoded = decode(&bytes, &narrow, Representation::XCdrV2).unwrap();
        let Value::Struct(s) = decoded else { panic!() };
        assert_eq!(*s.fields[&0], Value::Int32(1));
        assert!(!s.fields.contains_key(&1));
    }

    #[test]
    fn test_sequence_over_bound_rejected_on_encode() {
        let int32 = TD::primitive(Kind::Int32);
        let seq = TypeBuilder::new_sequence("S", int32, 1).build().unwrap();
        let mut sv = SequenceValue::default();
        sv.elements.push(Box::new(Value::Int32(1)));
        sv.elements.push(Box::new(Value::Int32(2)));
        let err = encode(&Value::Sequence(sv), &seq, Representation::XCdrV2).unwrap_err();
        assert!(matches!(err, crate::error::Error::BadParameter(_)));
    }

    #[test]
    fn test_union_unselected_with_no_default_encodes_a_label_matching_no_case() {
        let int32 = TD::primitive(Kind::Int32);
        let u = TypeBuilder::new_union("U", int32.clone()).case("a", vec![1], int32).build().unwrap();
        let value = Value::Union(UnionValue { selected_member: MEMBER_ID_INVALID, value: None });
        let bytes = encode(&value, &u, Representation::XCdrV2).unwrap();
        // The implicit discriminator (0) matches no declared case, so a
        // decoder with no default member to fall back on must reject it
        // rather than silently decoding as unselected (spec §4.3/§7).
        let err = decode(&bytes, &u, Representation::XCdrV2).unwrap_err();
        assert!(matches!(err, crate::error::Error::BadParameter(_)));
    }

    #[test]
    fn test_union_default_selected_discriminator_matches_no_explicit_case() {
        // Regression for a default case sharing a discriminator value with
        // an explicit case: the wire discriminator for the selected default
        // member must never collide with case 0's label.
        let int32 = TD::primitive(Kind::Int32);
        let bool_t = TD::primitive(Kind::Bool);
        let u = TypeBuilder::new_union("U", int32.clone())
            .case("zero", vec![0], int32)
            .default_case("other", bool_t)
            .build()
            .unwrap();
        let mut dd = DynamicData::new(u.clone());
        dd.set_discriminator(99).unwrap(); // no case matches 99 -> selects default 'other'
        dd.set_field(1, Value::Bool(true)).unwrap();

        let bytes = encode(dd.value(), &u, Representation::XCdrV2).unwrap();
        let decoded = decode(&bytes, &u, Representation::XCdrV2).unwrap();
        let Value::Union(decoded_union) = &decoded else { panic!("expected union") };
        assert_eq!(decoded_union.selected_member, 1, "must decode into the default member, not case 'zero'");
        assert_eq!(&decoded, dd.value());
    }
}
