// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Recursive XCDR decoder (spec §4.3), mirroring `encode.rs` branch for
//! branch so the two stay trivially in sync.

use super::io::{framing_for, CdrReader, Framing, XcdrVersion};
use crate::data_model::{default_value, ArrayValue, MapValue, SequenceValue, StructValue, UnionValue, Value};
use crate::error::{Error, Result};
use crate::type_model::{Kind, Member, TypeDescriptor, MEMBER_ID_INVALID};
use std::sync::Arc;

pub fn decode_value(r: &mut CdrReader, type_: &Arc<TypeDescriptor>, version: XcdrVersion) -> Result<Value> {
    let enclosed = type_.resolve_alias_enclosed();
    Ok(match enclosed.kind {
        Kind::None | Kind::Annotation | Kind::Alias => Value::None,
        Kind::Bool => Value::Bool(r.read_bool()?),
        Kind::Byte => Value::Byte(r.read_u8()?),
        Kind::Int8 => Value::Int8(r.read_i8()?),
        Kind::Uint8 => Value::Uint8(r.read_u8()?),
        Kind::Int16 => Value::Int16(r.read_i16()?),
        Kind::Uint16 => Value::Uint16(r.read_u16()?),
        Kind::Int32 => Value::Int32(r.read_i32()?),
        Kind::Uint32 => Value::Uint32(r.read_u32()?),
        Kind::Int64 => Value::Int64(r.read_i64()?),
        Kind::Uint64 => Value::Uint64(r.read_u64()?),
        Kind::Float32 => Value::Float32(r.read_f32()?),
        Kind::Float64 => Value::Float64(r.read_f64()?),
        Kind::Float128 => Value::Float128(r.read_f128()?),
        Kind::Char8 => Value::Char8(r.read_u8()?),
        Kind::Char16 => {
            let cp = r.read_u32()?;
            Value::Char16(char::from_u32(cp).ok_or_else(|| Error::BadParameter(format!("invalid char16 code point {}", cp)))?)
        }
        Kind::String8 => decode_string8(r, &enclosed)?,
        Kind::String16 => Value::String16(r.read_string16()?),
        Kind::Enum => {
            let v = r.read_i32()? as i64;
            if enclosed.enum_literal_by_value(v).is_none() && !enclosed.members.is_empty() {
                crate::warn!("decoded enum value {} does not match a declared literal of '{}'", v, enclosed.name);
            }
            Value::Enum(v)
        }
        Kind::Bitmask => Value::Bitmask(decode_bit_packed(r, enclosed.bitmask_storage_bytes() as u32 * 8)?),
        Kind::Bitset => Value::Bitset(decode_bit_packed(r, enclosed.bitset_storage_bits())?),
        Kind::Structure => Value::Struct(decode_struct(r, &enclosed, version)?),
        Kind::Union => Value::Union(decode_union(r, &enclosed, version)?),
        Kind::Array => Value::Array(decode_array(r, &enclosed, version)?),
        Kind::Sequence => Value::Sequence(decode_sequence(r, &enclosed, version)?),
        Kind::Map => Value::Map(decode_map(r, &enclosed, version)?),
    })
}

fn decode_bit_packed(r: &mut CdrReader, bits: u32) -> Result<u64> {
    Ok(match bits {
        0 => 0,
        8 => r.read_u8()? as u64,
        16 => r.read_u16()? as u64,
        32 => r.read_u32()? as u64,
        _ => r.read_u64()?,
    })
}

fn decode_string8(r: &mut CdrReader, type_: &Arc<TypeDescriptor>) -> Result<Value> {
    let s = r.read_string8()?;
    check_string_bound(&s, type_.bounds.first().copied().unwrap_or(0))?;
    Ok(Value::String8(s))
}

fn check_string_bound(s: &str, bound: u32) -> Result<()> {
    if bound > 0 && s.chars().count() as u32 > bound {
        return Err(Error::BadParameter(format!("decoded string of length {} exceeds bound {}", s.chars().count(), bound)));
    }
    Ok(())
}

fn serializable_members(type_: &Arc<TypeDescriptor>) -> Vec<Member> {
    type_.get_all_members_by_index().into_iter().filter(|m| !m.is_non_serialized).collect()
}

fn decode_struct(r: &mut CdrReader, type_: &Arc<TypeDescriptor>, version: XcdrVersion) -> Result<StructValue> {
    let members = serializable_members(type_);
    let mut out = StructValue::default();
    match framing_for(type_.extensibility, version) {
        Framing::Plain => {
            for m in &members {
                let v = decode_value(r, &m.type_, version)?;
                insert_if_non_default(&mut out, m, v);
            }
        }
        Framing::Delimited => {
            let body_len = r.read_u32()? as usize;
            let body_start = r.pos;
            for m in &members {
                let v = decode_value(r, &m.type_, version)?;
                insert_if_non_default(&mut out, m, v);
            }
            let consumed = r.pos - body_start;
            if consumed > body_len {
                return Err(Error::BadParameter(format!("delimited struct body overran its declared length ({} > {})", consumed, body_len)));
            }
            r.skip(body_len - consumed)?;
        }
        Framing::ParameterList => {
            let body_len = r.read_u32()? as usize;
            let body_start = r.pos;
            while r.pos - body_start < body_len {
                let member_id = r.read_u32()?;
                let length = r.read_u32()? as usize;
                let member_start = r.pos;
                match members.iter().find(|m| m.id == member_id) {
                    Some(m) => {
                        let v = decode_value(r, &m.type_, version)?;
                        let consumed = r.pos - member_start;
                        if consumed > length {
                            return Err(Error::BadParameter(format!(
                                "PL member {} overran its declared length ({} > {})",
                                member_id, consumed, length
                            )));
                        }
                        r.skip(length - consumed)?;
                        insert_if_non_default(&mut out, m, v);
                    }
                    None => {
                        crate::debug!("skipping unknown PL member id {} ({} bytes)", member_id, length);
                        r.skip(length)?;
                    }
                }
            }
        }
    }
    Ok(out)
}

fn insert_if_non_default(out: &mut StructValue, member: &Member, v: Value) {
    if v != crate::data_model::member_default(member) {
        out.fields.insert(member.id, Box::new(v));
    }
}

fn decode_union(r: &mut CdrReader, type_: &Arc<TypeDescriptor>, version: XcdrVersion) -> Result<UnionValue> {
    let disc_type = type_.discriminator_type.as_ref().ok_or_else(|| Error::BadParameter("union has no discriminator type".into()))?;
    let disc_value = decode_value(r, disc_type, version)?;
    let label = disc_value.as_i64().ok_or_else(|| Error::BadParameter("union discriminator did not decode to an integral label".into()))?;
    match type_.case_by_discriminator(label) {
        Some(member) => {
            let id = member.id;
            let member_type = member.type_.clone();
            let v = decode_value(r, &member_type, version)?;
            Ok(UnionValue { selected_member: id, value: Some(Box::new(v)) })
        }
        // No case matches and there is no default member to fall back on:
        // spec §4.3/§7 mandate BadParameter for an unknown discriminator
        // with no default, rather than silently decoding as unselected.
        None => Err(Error::BadParameter(format!("union discriminator {} matches no declared label and the union has no default case", label))),
    }
}

fn decode_array(r: &mut CdrReader, type_: &Arc<TypeDescriptor>, version: XcdrVersion) -> Result<ArrayValue> {
    let total = type_.array_total_bound();
    let elem_type = type_.element_type.as_ref().ok_or_else(|| Error::BadParameter("array has no element type".into()))?;
    let mut out = ArrayValue::default();
    for i in 0..total {
        let v = decode_value(r, elem_type, version)?;
        if v != default_value(elem_type) {
            out.elements.insert(i, Box::new(v));
        }
    }
    Ok(out)
}

fn decode_sequence(r: &mut CdrReader, type_: &Arc<TypeDescriptor>, version: XcdrVersion) -> Result<SequenceValue> {
    let bound = type_.bounds.first().copied().unwrap_or(0);
    let len = r.read_u32()?;
    if bound > 0 && len > bound {
        return Err(Error::BadParameter(format!("decoded sequence length {} exceeds bound {}", len, bound)));
    }
    let elem_type = type_.element_type.as_ref().ok_or_else(|| Error::BadParameter("sequence has no element type".into()))?;
    let mut out = SequenceValue::default();
    for _ in 0..len {
        out.elements.push(Box::new(decode_value(r, elem_type, version)?));
    }
    Ok(out)
}

fn decode_map(r: &mut CdrReader, type_: &Arc<TypeDescriptor>, version: XcdrVersion) -> Result<MapValue> {
    let bound = type_.bounds.first().copied().unwrap_or(0);
    let len = r.read_u32()?;
    if bound > 0 && len > bound {
        return Err(Error::BadParameter(format!("decoded map size {} exceeds bound {}", len, bound)));
    }
    let key_type = type_.key_element_type.as_ref().ok_or_else(|| Error::BadParameter("map has no key type".into()))?;
    let elem_type = type_.element_type.as_ref().ok_or_else(|| Error::BadParameter("map has no element type".into()))?;
    let mut out = MapValue::default();
    for _ in 0..len {
        let k = decode_value(r, key_type, version)?;
        let v = decode_value(r, elem_type, version)?;
        out.insert(k, v);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::io::Endianness;
    use crate::type_model::{Kind as K, TypeBuilder, TypeDescriptor as TD};

    #[test]
    fn test_decode_struct_plain_framing() {
        let int32 = TD::primitive(K::Int32);
        let point = TypeBuilder::new_struct("Point").field("x", int32.clone()).field("y", int32).build().unwrap();
        let bytes = [1u8, 0, 0, 0, 2, 0, 0, 0];
        let mut r = CdrReader::new(&bytes, Endianness::Little);
        let v = decode_value(&mut r, &point, XcdrVersion::V2).unwrap();
        let Value::Struct(s) = v else { panic!("expected struct") };
        assert_eq!(*s.fields[&0], Value::Int32(1));
        assert_eq!(*s.fields[&1], Value::Int32(2));
    }
}
