// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Recursive XCDR encoder (spec §4.3).
//!
//! One function per storage shape, dispatched on the type's *enclosed*
//! kind (aliases are transparent, per spec §4.1/§4.3). Mirrors the shape
//! of `hdds`'s per-kind `cdr2::{structs,unions,collections,bitsets}.rs`
//! split, generalized from the teacher's static `TypeObject` meta-model
//! encoding to runtime-typed `Value` encoding.

use super::io::{framing_for, CdrWriter, Framing, XcdrVersion};
use crate::data_model::{member_default, ArrayValue, MapValue, SequenceValue, StructValue, UnionValue, Value};
use crate::error::{Error, Result};
use crate::type_model::{Kind, Member, TypeDescriptor, MEMBER_ID_INVALID};
use std::sync::Arc;

pub fn encode_value(w: &mut CdrWriter, value: &Value, type_: &Arc<TypeDescriptor>, version: XcdrVersion) -> Result<()> {
    let enclosed = type_.resolve_alias_enclosed();
    match enclosed.kind {
        Kind::None | Kind::Annotation | Kind::Alias => Ok(()),
        Kind::Bool => {
            w.write_bool(value.as_bool().ok_or_else(|| kind_mismatch("Bool", value))?);
            Ok(())
        }
        Kind::Byte => write_u8_like(w, value, "Byte"),
        Kind::Int8 => {
            let Value::Int8(v) = value else { return Err(kind_mismatch("Int8", value)) };
            w.write_i8(*v);
            Ok(())
        }
        Kind::Uint8 => write_u8_like(w, value, "Uint8"),
        Kind::Int16 => {
            let Value::Int16(v) = value else { return Err(kind_mismatch("Int16", value)) };
            w.write_i16(*v);
            Ok(())
        }
        Kind::Uint16 => {
            let Value::Uint16(v) = value else { return Err(kind_mismatch("Uint16", value)) };
            w.write_u16(*v);
            Ok(())
        }
        Kind::Int32 => {
            let Value::Int32(v) = value else { return Err(kind_mismatch("Int32", value)) };
            w.write_i32(*v);
            Ok(())
        }
        Kind::Uint32 => {
            let Value::Uint32(v) = value else { return Err(kind_mismatch("Uint32", value)) };
            w.write_u32(*v);
            Ok(())
        }
        Kind::Int64 => {
            let Value::Int64(v) = value else { return Err(kind_mismatch("Int64", value)) };
            w.write_i64(*v);
            Ok(())
        }
        Kind::Uint64 => {
            let Value::Uint64(v) = value else { return Err(kind_mismatch("Uint64", value)) };
            w.write_u64(*v);
            Ok(())
        }
        Kind::Float32 => {
            let Value::Float32(v) = value else { return Err(kind_mismatch("Float32", value)) };
            w.write_f32(*v);
            Ok(())
        }
        Kind::Float64 => {
            let Value::Float64(v) = value else { return Err(kind_mismatch("Float64", value)) };
            w.write_f64(*v);
            Ok(())
        }
        Kind::Float128 => {
            let Value::Float128(bytes) = value else { return Err(kind_mismatch("Float128", value)) };
            w.write_f128(bytes);
            Ok(())
        }
        Kind::Char8 => write_u8_like(w, value, "Char8"),
        Kind::Char16 => {
            let Value::Char16(c) = value else { return Err(kind_mismatch("Char16", value)) };
            w.write_u32(*c as u32);
            Ok(())
        }
        Kind::String8 => encode_string8(w, value, &enclosed),
        Kind::String16 => encode_string16(w, value, &enclosed),
        Kind::Enum => {
            let v = value.as_i64().ok_or_else(|| kind_mismatch("Enum", value))?;
            w.write_i32(v as i32);
            Ok(())
        }
        Kind::Bitmask => {
            let v = value.as_i64().ok_or_else(|| kind_mismatch("Bitmask", value))? as u64;
            encode_bit_packed(w, v, enclosed.bitmask_storage_bytes() as u32 * 8);
            Ok(())
        }
        Kind::Bitset => {
            let v = value.as_i64().ok_or_else(|| kind_mismatch("Bitset", value))? as u64;
            encode_bit_packed(w, v, enclosed.bitset_storage_bits());
            Ok(())
        }
        Kind::Structure => {
            let Value::Struct(s) = value else { return Err(kind_mismatch("Structure", value)) };
            encode_struct(w, s, &enclosed, version)
        }
        Kind::Union => {
            let Value::Union(u) = value else { return Err(kind_mismatch("Union", value)) };
            encode_union(w, u, &enclosed, version)
        }
        Kind::Array => {
            let Value::Array(a) = value else { return Err(kind_mismatch("Array", value)) };
            encode_array(w, a, &enclosed, version)
        }
        Kind::Sequence => {
            let Value::Sequence(s) = value else { return Err(kind_mismatch("Sequence", value)) };
            encode_sequence(w, s, &enclosed, version)
        }
        Kind::Map => {
            let Value::Map(m) = value else { return Err(kind_mismatch("Map", value)) };
            encode_map(w, m, &enclosed, version)
        }
    }
}

fn kind_mismatch(expected: &str, got: &Value) -> Error {
    Error::BadParameter(format!("expected a {} value, got {:?}", expected, got))
}

fn write_u8_like(w: &mut CdrWriter, value: &Value, expected: &str) -> Result<()> {
    let v = match value {
        Value::Byte(v) | Value::Uint8(v) | Value::Char8(v) => *v,
        _ => return Err(kind_mismatch(expected, value)),
    };
    w.write_u8(v);
    Ok(())
}

fn encode_bit_packed(w: &mut CdrWriter, value: u64, bits: u32) {
    match bits {
        0 => {}
        8 => w.write_u8(value as u8),
        16 => w.write_u16(value as u16),
        32 => w.write_u32(value as u32),
        _ => w.write_u64(value),
    }
}

fn string_text(value: &Value) -> Result<&str> {
    match value {
        Value::String8(s) | Value::String16(s) => Ok(s.as_str()),
        _ => Err(kind_mismatch("String", value)),
    }
}

fn check_string_bound(s: &str, bound: u32) -> Result<()> {
    if bound > 0 && s.chars().count() as u32 > bound {
        return Err(Error::BadParameter(format!(
            "string of length {} exceeds bound {}",
            s.chars().count(),
            bound
        )));
    }
    Ok(())
}

fn encode_string8(w: &mut CdrWriter, value: &Value, type_: &Arc<TypeDescriptor>) -> Result<()> {
    let s = string_text(value)?;
    check_string_bound(s, type_.bounds.first().copied().unwrap_or(0))?;
    w.write_string8(s);
    Ok(())
}

fn encode_string16(w: &mut CdrWriter, value: &Value, type_: &Arc<TypeDescriptor>) -> Result<()> {
    let s = string_text(value)?;
    check_string_bound(s, type_.bounds.first().copied().unwrap_or(0))?;
    w.write_string16(s);
    Ok(())
}

/// All declared members in order, base-first, skipping `@non_serialized`.
fn serializable_members(type_: &Arc<TypeDescriptor>) -> Vec<Member> {
    type_.get_all_members_by_index().into_iter().filter(|m| !m.is_non_serialized).collect()
}

fn field_or_default(fields: &StructValue, member: &Member) -> Value {
    fields.fields.get(&member.id).map(|b| (**b).clone()).unwrap_or_else(|| member_default(member))
}

fn encode_struct(w: &mut CdrWriter, s: &StructValue, type_: &Arc<TypeDescriptor>, version: XcdrVersion) -> Result<()> {
    let members = serializable_members(type_);
    match framing_for(type_.extensibility, version) {
        Framing::Plain => {
            for m in &members {
                encode_value(w, &field_or_default(s, m), &m.type_, version)?;
            }
            Ok(())
        }
        Framing::Delimited => {
            let dheader_pos = w.reserve_u32();
            let body_start = w.len();
            for m in &members {
                encode_value(w, &field_or_default(s, m), &m.type_, version)?;
            }
            let body_len = (w.len() - body_start) as u32;
            w.patch_u32(dheader_pos, body_len);
            Ok(())
        }
        Framing::ParameterList => {
            let dheader_pos = w.reserve_u32();
            let body_start = w.len();
            for m in &members {
                let v = field_or_default(s, m);
                w.write_u32(m.id);
                let len_pos = w.reserve_u32();
                let member_start = w.len();
                encode_value(w, &v, &m.type_, version)?;
                let member_len = (w.len() - member_start) as u32;
                w.patch_u32(len_pos, member_len);
            }
            let body_len = (w.len() - body_start) as u32;
            w.patch_u32(dheader_pos, body_len);
            Ok(())
        }
    }
}

/// Encode a union's discriminator, following spec §4.3: when unselected,
/// the discriminator is encoded as a value matching no declared label
/// (the default label if one exists, else the spec §9 deterministic
/// "first unused integer" rule).
fn encode_union(w: &mut CdrWriter, u: &UnionValue, type_: &Arc<TypeDescriptor>, version: XcdrVersion) -> Result<()> {
    let disc_type = type_.discriminator_type.as_ref().ok_or_else(|| Error::BadParameter("union has no discriminator type".into()))?;
    let label = if u.selected_member == MEMBER_ID_INVALID {
        crate::data_model::implicit_default_discriminator(type_)
    } else {
        let member = type_.get_member_by_id(u.selected_member)?;
        match member.labels.first().copied() {
            Some(label) => label,
            // The selected member is the default case (no explicit labels
            // of its own): its wire discriminator must still match no
            // declared label, computed the same way as the unselected case.
            None => crate::data_model::implicit_default_discriminator(type_),
        }
    };
    let disc_value = label_to_value(label, disc_type);
    encode_value(w, &disc_value, disc_type, version)?;
    if u.selected_member != MEMBER_ID_INVALID {
        let member = type_.get_member_by_id(u.selected_member)?;
        let body = u.value.as_deref().cloned().unwrap_or_else(|| member_default(&member));
        encode_value(w, &body, &member.type_, version)?;
    }
    Ok(())
}

fn label_to_value(label: i64, disc_type: &Arc<TypeDescriptor>) -> Value {
    let enclosed = disc_type.resolve_alias_enclosed();
    match enclosed.kind {
        Kind::Bool => Value::Bool(label != 0),
        Kind::Char8 => Value::Char8(label as u8),
        Kind::Char16 => Value::Char16(char::from_u32(label as u32).unwrap_or('\0')),
        Kind::Int8 => Value::Int8(label as i8),
        Kind::Uint8 => Value::Uint8(label as u8),
        Kind::Int16 => Value::Int16(label as i16),
        Kind::Uint16 => Value::Uint16(label as u16),
        Kind::Int32 => Value::Int32(label as i32),
        Kind::Uint32 => Value::Uint32(label as u32),
        Kind::Int64 => Value::Int64(label),
        Kind::Uint64 => Value::Uint64(label as u64),
        Kind::Enum => Value::Enum(label),
        Kind::Bitmask => Value::Bitmask(label as u64),
        _ => Value::Int32(label as i32),
    }
}

fn encode_array(w: &mut CdrWriter, a: &ArrayValue, type_: &Arc<TypeDescriptor>, version: XcdrVersion) -> Result<()> {
    let total = type_.array_total_bound();
    let elem_type = type_.element_type.as_ref().ok_or_else(|| Error::BadParameter("array has no element type".into()))?;
    for i in 0..total {
        let v = a.elements.get(&i).map(|b| (**b).clone()).unwrap_or_else(|| crate::data_model::default_value(elem_type));
        encode_value(w, &v, elem_type, version)?;
    }
    Ok(())
}

fn encode_sequence(w: &mut CdrWriter, s: &SequenceValue, type_: &Arc<TypeDescriptor>, version: XcdrVersion) -> Result<()> {
    let bound = type_.bounds.first().copied().unwrap_or(0);
    if bound > 0 && s.elements.len() as u32 > bound {
        return Err(Error::BadParameter(format!("sequence length {} exceeds bound {}", s.elements.len(), bound)));
    }
    let elem_type = type_.element_type.as_ref().ok_or_else(|| Error::BadParameter("sequence has no element type".into()))?;
    w.write_u32(s.elements.len() as u32);
    for v in &s.elements {
        encode_value(w, v, elem_type, version)?;
    }
    Ok(())
}

fn encode_map(w: &mut CdrWriter, m: &MapValue, type_: &Arc<TypeDescriptor>, version: XcdrVersion) -> Result<()> {
    let bound = type_.bounds.first().copied().unwrap_or(0);
    if bound > 0 && m.pairs.len() as u32 > bound {
        return Err(Error::BadParameter(format!("map size {} exceeds bound {}", m.pairs.len(), bound)));
    }
    let key_type = type_.key_element_type.as_ref().ok_or_else(|| Error::BadParameter("map has no key type".into()))?;
    let elem_type = type_.element_type.as_ref().ok_or_else(|| Error::BadParameter("map has no element type".into()))?;
    w.write_u32(m.pairs.len() as u32);
    for (k, v) in &m.pairs {
        encode_value(w, k, key_type, version)?;
        encode_value(w, v, elem_type, version)?;
    }
    Ok(())
}
