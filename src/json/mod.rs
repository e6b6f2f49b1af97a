// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bidirectional JSON projection, in two dialects (spec §4.5).
//!
//! Shaped like `codec::encode`/`codec::decode`: one function per storage
//! kind, dispatched on the type's enclosed kind, threading a `Dialect`
//! parameter through the recursion rather than branching on global state
//! (spec §9's "JSON dialect branching" note). The two dialects differ only
//! in how `Enum` and `Bitmask` values are projected.

use crate::data_model::{default_value, member_default, ArrayValue, MapValue, SequenceValue, StructValue, UnionValue, Value};
use crate::error::{Error, Result};
use crate::type_model::{Kind, Member, TypeDescriptor, MEMBER_ID_INVALID};
use serde_json::{Map as JsonMap, Number, Value as Json};
use std::sync::Arc;

/// Which of the two OMG-described wire dialects a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Enums as their literal name, bitmasks as a plain integer.
    Standard,
    /// Enums as `{"name","value"}`, bitmasks as `{"value","binary","active"}`.
    Extended,
}

pub fn to_string(value: &Value, type_: &Arc<TypeDescriptor>, dialect: Dialect) -> Result<String> {
    let json = to_json(value, type_, dialect)?;
    serde_json::to_string(&json).map_err(|e| Error::BadParameter(format!("JSON encoding failed: {}", e)))
}

pub fn to_string_pretty(value: &Value, type_: &Arc<TypeDescriptor>, dialect: Dialect) -> Result<String> {
    let json = to_json(value, type_, dialect)?;
    serde_json::to_string_pretty(&json).map_err(|e| Error::BadParameter(format!("JSON encoding failed: {}", e)))
}

pub fn from_str(text: &str, type_: &Arc<TypeDescriptor>) -> Result<Value> {
    let json: Json = serde_json::from_str(text).map_err(|e| Error::BadParameter(format!("malformed JSON: {}", e)))?;
    from_json(&json, type_)
}

pub fn to_json(value: &Value, type_: &Arc<TypeDescriptor>, dialect: Dialect) -> Result<Json> {
    let enclosed = type_.resolve_alias_enclosed();
    match enclosed.kind {
        Kind::None | Kind::Annotation | Kind::Alias => Ok(Json::Null),
        Kind::Bool => Ok(Json::Bool(value.as_bool().ok_or_else(|| kind_mismatch("Bool", value))?)),
        Kind::Byte | Kind::Uint8 => Ok(Json::Number(value.as_i64().ok_or_else(|| kind_mismatch("Uint8", value))?.into())),
        Kind::Int8 | Kind::Int16 | Kind::Uint16 | Kind::Int32 | Kind::Uint32 | Kind::Int64 => {
            Ok(Json::Number(value.as_i64().ok_or_else(|| kind_mismatch("integer", value))?.into()))
        }
        Kind::Uint64 => match value {
            Value::Uint64(v) => Ok(Json::Number((*v).into())),
            _ => Err(kind_mismatch("Uint64", value)),
        },
        Kind::Float32 => match value {
            Value::Float32(v) => Ok(float_to_json(*v as f64)),
            _ => Err(kind_mismatch("Float32", value)),
        },
        Kind::Float64 => match value {
            Value::Float64(v) => Ok(float_to_json(*v)),
            _ => Err(kind_mismatch("Float64", value)),
        },
        Kind::Float128 => match value {
            Value::Float128(bytes) => Ok(Json::String(hex_string(bytes))),
            _ => Err(kind_mismatch("Float128", value)),
        },
        Kind::Char8 => {
            let Value::Char8(b) = value else { return Err(kind_mismatch("Char8", value)) };
            Ok(Json::String((*b as char).to_string()))
        }
        Kind::Char16 => {
            let Value::Char16(c) = value else { return Err(kind_mismatch("Char16", value)) };
            Ok(Json::String(c.to_string()))
        }
        Kind::String8 | Kind::String16 => Ok(Json::String(value.as_str().ok_or_else(|| kind_mismatch("String", value))?.to_string())),
        Kind::Enum => enum_to_json(value, &enclosed, dialect),
        Kind::Bitmask => bitmask_to_json(value, &enclosed, dialect),
        Kind::Bitset => Ok(Json::Number(value.as_i64().ok_or_else(|| kind_mismatch("Bitset", value))?.into())),
        Kind::Structure => {
            let Value::Struct(s) = value else { return Err(kind_mismatch("Structure", value)) };
            struct_to_json(s, &enclosed, dialect)
        }
        Kind::Union => {
            let Value::Union(u) = value else { return Err(kind_mismatch("Union", value)) };
            union_to_json(u, &enclosed, dialect)
        }
        Kind::Array => {
            let Value::Array(a) = value else { return Err(kind_mismatch("Array", value)) };
            array_to_json(a, &enclosed, dialect)
        }
        Kind::Sequence => {
            let Value::Sequence(s) = value else { return Err(kind_mismatch("Sequence", value)) };
            let elem_type = enclosed.element_type.as_ref().ok_or_else(|| Error::BadParameter("sequence has no element type".into()))?;
            let items = s.elements.iter().map(|v| to_json(v, elem_type, dialect)).collect::<Result<Vec<_>>>()?;
            Ok(Json::Array(items))
        }
        Kind::Map => {
            let Value::Map(m) = value else { return Err(kind_mismatch("Map", value)) };
            map_to_json(m, &enclosed, dialect)
        }
    }
}

fn kind_mismatch(expected: &str, got: &Value) -> Error {
    Error::BadParameter(format!("expected a {} value for JSON projection, got {:?}", expected, got))
}

/// NaN/Infinity have no JSON numeric representation; project them as a
/// recognizable string instead of failing the whole document (supplemental
/// behavior recovered from the original `DynamicDataJsonImpl` — SPEC_FULL.md).
fn float_to_json(v: f64) -> Json {
    if v.is_nan() {
        Json::String("NaN".to_string())
    } else if v.is_infinite() {
        Json::String(if v > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() })
    } else {
        Number::from_f64(v).map(Json::Number).unwrap_or(Json::Null)
    }
}

fn hex_string(bytes: &[u8; 16]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn enum_to_json(value: &Value, type_: &Arc<TypeDescriptor>, dialect: Dialect) -> Result<Json> {
    let v = value.as_i64().ok_or_else(|| kind_mismatch("Enum", value))?;
    let name = type_.enum_literal_by_value(v).map(|m| m.name.clone()).unwrap_or_default();
    match dialect {
        Dialect::Standard => Ok(Json::String(name)),
        Dialect::Extended => {
            let mut obj = JsonMap::new();
            obj.insert("name".into(), Json::String(name));
            obj.insert("value".into(), Json::Number(v.into()));
            Ok(Json::Object(obj))
        }
    }
}

fn bitmask_to_json(value: &Value, type_: &Arc<TypeDescriptor>, dialect: Dialect) -> Result<Json> {
    let v = value.as_i64().ok_or_else(|| kind_mismatch("Bitmask", value))? as u64;
    match dialect {
        Dialect::Standard => Ok(Json::Number(v.into())),
        Dialect::Extended => {
            let width = (type_.bitmask_storage_bytes() * 8).max(1);
            let binary = format!("{:0width$b}", v, width = width);
            let mut active: Vec<Json> = type_
                .members
                .iter()
                .filter(|m| v & (1u64 << m.bit_bound.unwrap_or(0)) != 0)
                .map(|m| Json::String(m.name.clone()))
                .collect();
            active.sort_by_key(|j| j.as_str().map(|s| s.to_string()).unwrap_or_default());
            let mut obj = JsonMap::new();
            obj.insert("value".into(), Json::Number(v.into()));
            obj.insert("binary".into(), Json::String(binary));
            obj.insert("active".into(), Json::Array(active));
            Ok(Json::Object(obj))
        }
    }
}

fn serializable_members(type_: &Arc<TypeDescriptor>) -> Vec<Member> {
    type_.get_all_members_by_index()
}

fn field_or_default(fields: &StructValue, member: &Member) -> Value {
    fields.fields.get(&member.id).map(|b| (**b).clone()).unwrap_or_else(|| member_default(member))
}

fn struct_to_json(s: &StructValue, type_: &Arc<TypeDescriptor>, dialect: Dialect) -> Result<Json> {
    let mut obj = JsonMap::new();
    for m in serializable_members(type_) {
        let v = field_or_default(s, &m);
        obj.insert(m.name.clone(), to_json(&v, &m.type_, dialect)?);
    }
    Ok(Json::Object(obj))
}

fn union_to_json(u: &UnionValue, type_: &Arc<TypeDescriptor>, dialect: Dialect) -> Result<Json> {
    if u.selected_member == MEMBER_ID_INVALID {
        return Ok(Json::Object(JsonMap::new()));
    }
    let member = type_.get_member_by_id(u.selected_member)?;
    let body = u.value.as_deref().cloned().unwrap_or_else(|| member_default(&member));
    let mut obj = JsonMap::new();
    obj.insert(member.name.clone(), to_json(&body, &member.type_, dialect)?);
    Ok(Json::Object(obj))
}

fn array_to_json(a: &ArrayValue, type_: &Arc<TypeDescriptor>, dialect: Dialect) -> Result<Json> {
    let elem_type = type_.element_type.as_ref().ok_or_else(|| Error::BadParameter("array has no element type".into()))?;
    build_array_dim(&a.elements, elem_type, &type_.bounds, 0, dialect)
}

/// Nest one JSON array level per array dimension (spec §4.5: "Arrays are
/// serialized as nested JSON arrays reflecting the dimension rank"),
/// reading `elements` as the same flat row-major index the codec uses.
fn build_array_dim(
    elements: &std::collections::BTreeMap<u32, Box<Value>>,
    elem_type: &Arc<TypeDescriptor>,
    dims: &[u32],
    base: u32,
    dialect: Dialect,
) -> Result<Json> {
    let (this_dim, rest) = dims.split_first().ok_or_else(|| Error::BadParameter("array has no dimensions".into()))?;
    if rest.is_empty() {
        let mut items = Vec::with_capacity(*this_dim as usize);
        for i in 0..*this_dim {
            let flat = base + i;
            let v = elements.get(&flat).map(|b| (**b).clone()).unwrap_or_else(|| default_value(elem_type));
            items.push(to_json(&v, elem_type, dialect)?);
        }
        Ok(Json::Array(items))
    } else {
        let stride: u32 = rest.iter().product();
        let mut items = Vec::with_capacity(*this_dim as usize);
        for i in 0..*this_dim {
            items.push(build_array_dim(elements, elem_type, rest, base + i * stride, dialect)?);
        }
        Ok(Json::Array(items))
    }
}

fn map_to_json(m: &MapValue, type_: &Arc<TypeDescriptor>, dialect: Dialect) -> Result<Json> {
    let elem_type = type_.element_type.as_ref().ok_or_else(|| Error::BadParameter("map has no element type".into()))?;
    let mut obj = JsonMap::new();
    for (k, v) in &m.pairs {
        let key_text = map_key_text(k)?;
        obj.insert(key_text, to_json(v, elem_type, dialect)?);
    }
    Ok(Json::Object(obj))
}

fn map_key_text(key: &Value) -> Result<String> {
    match key {
        Value::String8(s) | Value::String16(s) => Ok(s.clone()),
        _ => key.as_i64().map(|v| v.to_string()).ok_or_else(|| Error::BadParameter("unsupported map key type for JSON projection".into())),
    }
}

pub fn from_json(json: &Json, type_: &Arc<TypeDescriptor>) -> Result<Value> {
    let enclosed = type_.resolve_alias_enclosed();
    match enclosed.kind {
        Kind::None | Kind::Annotation | Kind::Alias => Ok(Value::None),
        Kind::Bool => Ok(Value::Bool(json.as_bool().ok_or_else(|| json_mismatch("boolean", json))?)),
        Kind::Byte => Ok(Value::Byte(json_u64(json)? as u8)),
        Kind::Uint8 => Ok(Value::Uint8(json_u64(json)? as u8)),
        Kind::Int8 => Ok(Value::Int8(json_i64(json)? as i8)),
        Kind::Int16 => Ok(Value::Int16(json_i64(json)? as i16)),
        Kind::Uint16 => Ok(Value::Uint16(json_u64(json)? as u16)),
        Kind::Int32 => Ok(Value::Int32(json_i64(json)? as i32)),
        Kind::Uint32 => Ok(Value::Uint32(json_u64(json)? as u32)),
        Kind::Int64 => Ok(Value::Int64(json_i64(json)?)),
        Kind::Uint64 => Ok(Value::Uint64(json_u64(json)?)),
        Kind::Float32 => Ok(Value::Float32(json_f64(json)? as f32)),
        Kind::Float64 => Ok(Value::Float64(json_f64(json)?)),
        Kind::Float128 => {
            let text = json.as_str().ok_or_else(|| json_mismatch("hex string", json))?;
            Ok(Value::Float128(parse_hex_bytes(text)?))
        }
        Kind::Char8 => {
            let text = json.as_str().ok_or_else(|| json_mismatch("single-character string", json))?;
            let b = text.bytes().next().ok_or_else(|| Error::BadParameter("empty Char8 string".into()))?;
            Ok(Value::Char8(b))
        }
        Kind::Char16 => {
            let text = json.as_str().ok_or_else(|| json_mismatch("single-character string", json))?;
            let c = text.chars().next().ok_or_else(|| Error::BadParameter("empty Char16 string".into()))?;
            Ok(Value::Char16(c))
        }
        Kind::String8 => Ok(Value::String8(json.as_str().ok_or_else(|| json_mismatch("string", json))?.to_string())),
        Kind::String16 => Ok(Value::String16(json.as_str().ok_or_else(|| json_mismatch("string", json))?.to_string())),
        Kind::Enum => enum_from_json(json, &enclosed),
        Kind::Bitmask => bitmask_from_json(json, &enclosed),
        Kind::Bitset => Ok(Value::Bitset(json_u64(json)?)),
        Kind::Structure => struct_from_json(json, &enclosed),
        Kind::Union => union_from_json(json, &enclosed),
        Kind::Array => array_from_json(json, &enclosed),
        Kind::Sequence => sequence_from_json(json, &enclosed),
        Kind::Map => map_from_json(json, &enclosed),
    }
}

fn json_mismatch(expected: &str, got: &Json) -> Error {
    Error::BadParameter(format!("expected a JSON {}, got {}", expected, got))
}

fn json_i64(json: &Json) -> Result<i64> {
    json.as_i64().ok_or_else(|| json_mismatch("integer", json))
}

fn json_u64(json: &Json) -> Result<u64> {
    json.as_u64().or_else(|| json.as_i64().map(|v| v as u64)).ok_or_else(|| json_mismatch("integer", json))
}

fn json_f64(json: &Json) -> Result<f64> {
    if let Some(text) = json.as_str() {
        return match text {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other.parse::<f64>().map_err(|_| Error::BadParameter(format!("invalid float string '{}'", other))),
        };
    }
    json.as_f64().ok_or_else(|| json_mismatch("number", json))
}

fn parse_hex_bytes(text: &str) -> Result<[u8; 16]> {
    if text.len() != 32 {
        return Err(Error::BadParameter("Float128 hex string must be 32 characters".into()));
    }
    let mut out = [0u8; 16];
    for i in 0..16 {
        out[i] = u8::from_str_radix(&text[i * 2..i * 2 + 2], 16).map_err(|_| Error::BadParameter("invalid Float128 hex string".into()))?;
    }
    Ok(out)
}

/// Accepts either dialect: a bare string (name), an integer (value), or
/// `{"name","value"}`.
fn enum_from_json(json: &Json, type_: &Arc<TypeDescriptor>) -> Result<Value> {
    if let Some(name) = json.as_str() {
        let member = type_.get_member_by_name(name)?;
        return Ok(Value::Enum(member.labels.first().copied().unwrap_or(0)));
    }
    if let Some(obj) = json.as_object() {
        if let Some(v) = obj.get("value") {
            return Ok(Value::Enum(json_i64(v)?));
        }
        if let Some(n) = obj.get("name").and_then(|n| n.as_str()) {
            let member = type_.get_member_by_name(n)?;
            return Ok(Value::Enum(member.labels.first().copied().unwrap_or(0)));
        }
    }
    Ok(Value::Enum(json_i64(json)?))
}

/// Accepts either dialect: a bare integer, or `{"value": N, ...}`.
fn bitmask_from_json(json: &Json, _type_: &Arc<TypeDescriptor>) -> Result<Value> {
    if let Some(obj) = json.as_object() {
        if let Some(v) = obj.get("value") {
            return Ok(Value::Bitmask(json_u64(v)?));
        }
    }
    Ok(Value::Bitmask(json_u64(json)?))
}

fn struct_from_json(json: &Json, type_: &Arc<TypeDescriptor>) -> Result<Value> {
    let obj = json.as_object().ok_or_else(|| json_mismatch("object", json))?;
    let mut s = StructValue::default();
    for m in serializable_members(type_) {
        if let Some(field_json) = obj.get(&m.name) {
            let v = from_json(field_json, &m.type_)?;
            if v != default_value(&m.type_) {
                s.fields.insert(m.id, Box::new(v));
            }
        }
    }
    Ok(Value::Struct(s))
}

fn union_from_json(json: &Json, type_: &Arc<TypeDescriptor>) -> Result<Value> {
    let obj = json.as_object().ok_or_else(|| json_mismatch("object", json))?;
    let Some((key, val_json)) = obj.iter().next() else {
        return Ok(Value::Union(UnionValue::default()));
    };
    let member = type_.get_member_by_name(key)?;
    let v = from_json(val_json, &member.type_)?;
    Ok(Value::Union(UnionValue { selected_member: member.id, value: Some(Box::new(v)) }))
}

fn array_from_json(json: &Json, type_: &Arc<TypeDescriptor>) -> Result<Value> {
    let elem_type = type_.element_type.as_ref().ok_or_else(|| Error::BadParameter("array has no element type".into()))?;
    let mut elements = std::collections::BTreeMap::new();
    fill_array_dim(json, elem_type, &type_.bounds, 0, &mut elements)?;
    Ok(Value::Array(ArrayValue { elements }))
}

fn fill_array_dim(
    json: &Json,
    elem_type: &Arc<TypeDescriptor>,
    dims: &[u32],
    base: u32,
    out: &mut std::collections::BTreeMap<u32, Box<Value>>,
) -> Result<()> {
    let (this_dim, rest) = dims.split_first().ok_or_else(|| Error::BadParameter("array has no dimensions".into()))?;
    let items = json.as_array().ok_or_else(|| json_mismatch("array", json))?;
    if items.len() as u32 != *this_dim {
        return Err(Error::BadParameter(format!("array dimension mismatch: expected {}, got {}", this_dim, items.len())));
    }
    if rest.is_empty() {
        for (i, item) in items.iter().enumerate() {
            let v = from_json(item, elem_type)?;
            if v != default_value(elem_type) {
                out.insert(base + i as u32, Box::new(v));
            }
        }
    } else {
        let stride: u32 = rest.iter().product();
        for (i, item) in items.iter().enumerate() {
            fill_array_dim(item, elem_type, rest, base + i as u32 * stride, out)?;
        }
    }
    Ok(())
}

fn sequence_from_json(json: &Json, type_: &Arc<TypeDescriptor>) -> Result<Value> {
    let elem_type = type_.element_type.as_ref().ok_or_else(|| Error::BadParameter("sequence has no element type".into()))?;
    let items = json.as_array().ok_or_else(|| json_mismatch("array", json))?;
    let bound = type_.bounds.first().copied().unwrap_or(0);
    if bound > 0 && items.len() as u32 > bound {
        return Err(Error::BadParameter(format!("sequence length {} exceeds bound {}", items.len(), bound)));
    }
    let elements = items.iter().map(|i| from_json(i, elem_type).map(Box::new)).collect::<Result<Vec<_>>>()?;
    Ok(Value::Sequence(SequenceValue { elements }))
}

fn map_from_json(json: &Json, type_: &Arc<TypeDescriptor>) -> Result<Value> {
    let key_type = type_.key_element_type.as_ref().ok_or_else(|| Error::BadParameter("map has no key type".into()))?;
    let elem_type = type_.element_type.as_ref().ok_or_else(|| Error::BadParameter("map has no element type".into()))?;
    let obj = json.as_object().ok_or_else(|| json_mismatch("object", json))?;
    let mut m = MapValue::default();
    for (k, v) in obj {
        let key_value = key_from_text(k, key_type)?;
        let val_value = from_json(v, elem_type)?;
        m.insert(key_value, val_value);
    }
    Ok(Value::Map(m))
}

fn key_from_text(text: &str, key_type: &Arc<TypeDescriptor>) -> Result<Value> {
    let enclosed = key_type.resolve_alias_enclosed();
    match enclosed.kind {
        Kind::String8 => Ok(Value::String8(text.to_string())),
        Kind::String16 => Ok(Value::String16(text.to_string())),
        _ => {
            let n: i64 = text.parse().map_err(|_| Error::BadParameter(format!("map key '{}' is not a valid integer", text)))?;
            from_json(&Json::Number(n.into()), key_type)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_model::{Kind as K, TypeBuilder, TypeDescriptor as TD};

    #[test]
    fn test_struct_round_trip_standard_dialect() {
        let int32 = TD::primitive(K::Int32);
        let string_t = TD::string(false, 32);
        let t = TypeBuilder::new_struct("P").field("x", int32).field("name", string_t).build().unwrap();
        let mut s = StructValue::default();
        s.fields.insert(0, Box::new(Value::Int32(7)));
        s.fields.insert(1, Box::new(Value::String8("hi".into())));
        let value = Value::Struct(s);
        let json = to_json(&value, &t, Dialect::Standard).unwrap();
        assert_eq!(json, serde_json::json!({"x": 7, "name": "hi"}));
        let back = from_json(&json, &t).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_enum_standard_vs_extended() {
        let t = TypeBuilder::new_enum("Color", TD::primitive(K::Int32)).variant("RED", 0).variant("GREEN", 1).build().unwrap();
        let v = Value::Enum(1);
        assert_eq!(to_json(&v, &t, Dialect::Standard).unwrap(), Json::String("GREEN".into()));
        assert_eq!(to_json(&v, &t, Dialect::Extended).unwrap(), serde_json::json!({"name": "GREEN", "value": 1}));
    }

    #[test]
    fn test_bitmask_extended_dialect_matches_seed_scenario() {
        let t = TypeBuilder::new_bitmask("M", 12).flag("FLAG_A", 0).flag("FLAG_B", 1).build().unwrap();
        let v = Value::Bitmask(0b11);
        let json = to_json(&v, &t, Dialect::Extended).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"value": 3, "binary": "0000000000000011", "active": ["FLAG_A", "FLAG_B"]})
        );
    }

    #[test]
    fn test_union_unselected_is_empty_object() {
        let int32 = TD::primitive(K::Int32);
        let t = TypeBuilder::new_union("U", TD::primitive(K::Int32)).case("a", vec![1], int32).build().unwrap();
        let v = Value::Union(UnionValue::default());
        assert_eq!(to_json(&v, &t, Dialect::Standard).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_union_selected_single_key_round_trip() {
        let int32 = TD::primitive(K::Int32);
        let t = TypeBuilder::new_union("U", TD::primitive(K::Int32)).case("a", vec![1], int32).build().unwrap();
        let v = Value::Union(UnionValue { selected_member: 0, value: Some(Box::new(Value::Int32(5))) });
        let json = to_json(&v, &t, Dialect::Standard).unwrap();
        assert_eq!(json, serde_json::json!({"a": 5}));
        assert_eq!(from_json(&json, &t).unwrap(), v);
    }

    #[test]
    fn test_float_nan_and_infinity_become_strings() {
        let t = TD::primitive(K::Float64);
        assert_eq!(to_json(&Value::Float64(f64::NAN), &t, Dialect::Standard).unwrap(), Json::String("NaN".into()));
        assert_eq!(to_json(&Value::Float64(f64::INFINITY), &t, Dialect::Standard).unwrap(), Json::String("Infinity".into()));
        let back = from_json(&Json::String("NaN".into()), &t).unwrap();
        assert!(matches!(back, Value::Float64(v) if v.is_nan()));
    }

    #[test]
    fn test_2d_array_nesting_matches_dimension_rank() {
        let int32 = TD::primitive(K::Int32);
        let t = TypeBuilder::new_array("A", int32, vec![2, 2]).build().unwrap();
        let mut elements = std::collections::BTreeMap::new();
        elements.insert(1, Box::new(Value::Int32(5)));
        let v = Value::Array(ArrayValue { elements });
        let json = to_json(&v, &t, Dialect::Standard).unwrap();
        assert_eq!(json, serde_json::json!([[0, 5], [0, 0]]));
        assert_eq!(from_json(&json, &t).unwrap(), v);
    }

    #[test]
    fn test_map_round_trip_with_string_keys() {
        let int32 = TD::primitive(K::Int32);
        let string_t = TD::string(false, 16);
        let t = TypeBuilder::new_map("Mp", string_t, int32, 4).build().unwrap();
        let mut m = MapValue::default();
        m.insert(Value::String8("a".into()), Value::Int32(1));
        let v = Value::Map(m);
        let json = to_json(&v, &t, Dialect::Standard).unwrap();
        assert_eq!(json, serde_json::json!({"a": 1}));
        assert_eq!(from_json(&json, &t).unwrap(), v);
    }
}
