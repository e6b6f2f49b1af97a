// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `Value`: the polymorphic storage behind a `DynamicData` instance.
//!
//! Grounded on `hdds`'s `dynamic::value::DynamicValue` (a tagged enum with
//! a variant per primitive plus `Struct`/`Sequence`/`Array`/`Enum`/`Union`),
//! generalized per spec §3.2/§9 ("polymorphic value -> tagged union"):
//! aggregate/collection children are keyed by `MemberId`, arrays are
//! sparse with default-elision, maps keep a side index, and unions carry
//! an explicit `selected_member`.

use crate::type_model::{Kind, MemberId, TypeDescriptor, MEMBER_ID_INVALID};
use std::collections::BTreeMap;
use std::sync::Arc;

/// `Struct`/`Union` storage: a sparse map from member id to child value.
/// An absent entry means "default".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructValue {
    pub fields: BTreeMap<MemberId, Box<Value>>,
}

/// Union storage: `selected_member == MEMBER_ID_INVALID` means
/// "unselected" (implicit default), in which case `value` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionValue {
    pub selected_member: MemberId,
    pub value: Option<Box<Value>>,
}

impl Default for UnionValue {
    fn default() -> Self {
        UnionValue { selected_member: MEMBER_ID_INVALID, value: None }
    }
}

/// Array storage: sparse, keyed by flat row-major index in
/// `[0, total_bound)`. Absent entries equal the element type's default
/// (spec invariant: "setting a child to a value equal to the type's
/// element default is a no-op (elision)").
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArrayValue {
    pub elements: BTreeMap<u32, Box<Value>>,
}

/// Sequence storage: dense, contiguous indices `[0, len)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SequenceValue {
    pub elements: Vec<Box<Value>>,
}

/// Map storage: ordered pairs plus a side index from the key's canonical
/// string form to its position, so paired lookup by key stays close to
/// the O(log n) the spec asks for without duplicating key storage.
#[derive(Debug, Clone, Default)]
pub struct MapValue {
    pub pairs: Vec<(Box<Value>, Box<Value>)>,
    pub index: BTreeMap<String, usize>,
}

impl PartialEq for MapValue {
    fn eq(&self, other: &Self) -> bool {
        // Map equality is order-insensitive (spec §4.2): compare as sets
        // keyed by canonical string form.
        if self.pairs.len() != other.pairs.len() {
            return false;
        }
        for (k, idx) in &self.index {
            let Some(&other_idx) = other.index.get(k) else { return false };
            if self.pairs[*idx].1 != other.pairs[other_idx].1 {
                return false;
            }
        }
        true
    }
}

impl MapValue {
    pub fn canonical_key(key: &Value) -> String {
        format!("{:?}", key)
    }

    pub fn insert(&mut self, key: Value, value: Value) {
        let canon = Self::canonical_key(&key);
        if let Some(&idx) = self.index.get(&canon) {
            self.pairs[idx] = (Box::new(key), Box::new(value));
            return;
        }
        self.index.insert(canon, self.pairs.len());
        self.pairs.push((Box::new(key), Box::new(value)));
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        let canon = Self::canonical_key(key);
        self.index.get(&canon).map(|&idx| self.pairs[idx].1.as_ref())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// The tagged-union value representation (spec §3.2, design note §9).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Byte(u8),
    Int8(i8),
    Uint8(u8),
    Int16(i16),
    Uint16(u16),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    /// Raw 128-bit float bytes; Rust has no native `f128` on stable.
    Float128([u8; 16]),
    Char8(u8),
    Char16(char),
    String8(String),
    String16(String),
    /// The enum literal's declared integer value.
    Enum(i64),
    /// Bitmask flags packed into their storage-width integer.
    Bitmask(u64),
    /// Bitset fields packed into their storage-width integer.
    Bitset(u64),
    Struct(StructValue),
    Union(UnionValue),
    Array(ArrayValue),
    Sequence(SequenceValue),
    Map(MapValue),
}

impl Default for Value {
    fn default() -> Self {
        Value::None
    }
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => return Some(if *b { 1 } else { 0 }),
            Value::Char16(c) => return Some(*c as i64),
            _ => {}
        }
        match *self {
            Value::Int8(v) => Some(v as i64),
            Value::Int16(v) => Some(v as i64),
            Value::Int32(v) => Some(v as i64),
            Value::Int64(v) => Some(v),
            Value::Uint8(v) | Value::Byte(v) | Value::Char8(v) => Some(v as i64),
            Value::Uint16(v) => Some(v as i64),
            Value::Uint32(v) => Some(v as i64),
            Value::Uint64(v) => Some(v as i64),
            Value::Enum(v) => Some(v),
            Value::Bitmask(v) | Value::Bitset(v) => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String8(s) | Value::String16(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Recursively construct the type's default-initialized value (spec
/// §4.2's `set_default_value`, and the array default-elision rule).
/// Grounded on `hdds`'s `dynamic_data::default_value`/`default_primitive`.
pub fn default_value(type_: &Arc<TypeDescriptor>) -> Value {
    let enclosed = type_.resolve_alias_enclosed();
    match enclosed.kind {
        Kind::None => Value::None,
        Kind::Bool => default_from_text(&enclosed, Value::Bool(false)),
        Kind::Byte => default_from_text(&enclosed, Value::Byte(0)),
        Kind::Int8 => default_from_text(&enclosed, Value::Int8(0)),
        Kind::Uint8 => default_from_text(&enclosed, Value::Uint8(0)),
        Kind::Int16 => default_from_text(&enclosed, Value::Int16(0)),
        Kind::Uint16 => default_from_text(&enclosed, Value::Uint16(0)),
        Kind::Int32 => default_from_text(&enclosed, Value::Int32(0)),
        Kind::Uint32 => default_from_text(&enclosed, Value::Uint32(0)),
        Kind::Int64 => default_from_text(&enclosed, Value::Int64(0)),
        Kind::Uint64 => default_from_text(&enclosed, Value::Uint64(0)),
        Kind::Float32 => default_from_text(&enclosed, Value::Float32(0.0)),
        Kind::Float64 => default_from_text(&enclosed, Value::Float64(0.0)),
        Kind::Float128 => Value::Float128([0u8; 16]),
        Kind::Char8 => Value::Char8(0),
        Kind::Char16 => Value::Char16('\0'),
        Kind::String8 | Kind::String16 => {
            default_from_text(&enclosed, Value::String8(String::new())).coerce_string(enclosed.kind)
        }
        Kind::Enum => {
            let value = enclosed.members.first().and_then(|m| m.labels.first().copied()).unwrap_or(0);
            Value::Enum(value)
        }
        Kind::Bitmask => Value::Bitmask(0),
        Kind::Bitset => Value::Bitset(0),
        Kind::Structure => {
            // Absent entries already mean "default" for every member, so
            // an empty field map is a fully valid default structure.
            Value::Struct(StructValue::default())
        }
        Kind::Union => Value::Union(UnionValue::default()),
        Kind::Array => Value::Array(ArrayValue::default()),
        Kind::Sequence => Value::Sequence(SequenceValue::default()),
        Kind::Map => Value::Map(MapValue::default()),
        Kind::Alias | Kind::Annotation => Value::None,
    }
}

impl Value {
    fn coerce_string(self, kind: Kind) -> Value {
        match (self, kind) {
            (Value::String8(s), Kind::String16) => Value::String16(s),
            (other, _) => other,
        }
    }
}

fn default_from_text(type_: &Arc<TypeDescriptor>, fallback: Value) -> Value {
    // Type-level `@default` annotation, not a member default; members'
    // own textual defaults are handled by `accessors::set_default_value`.
    use crate::type_model::Annotation;
    for ann in &type_.annotations {
        if let Annotation::Default(text) = ann {
            if let Some(parsed) = parse_scalar_default(&fallback, text) {
                return parsed;
            }
        }
    }
    fallback
}

pub(crate) fn parse_scalar_default(template: &Value, text: &str) -> Option<Value> {
    match template {
        Value::Bool(_) => text.parse::<bool>().ok().map(Value::Bool),
        Value::Byte(_) => text.parse::<u8>().ok().map(Value::Byte),
        Value::Int8(_) => text.parse::<i8>().ok().map(Value::Int8),
        Value::Uint8(_) => text.parse::<u8>().ok().map(Value::Uint8),
        Value::Int16(_) => text.parse::<i16>().ok().map(Value::Int16),
        Value::Uint16(_) => text.parse::<u16>().ok().map(Value::Uint16),
        Value::Int32(_) => text.parse::<i32>().ok().map(Value::Int32),
        Value::Uint32(_) => text.parse::<u32>().ok().map(Value::Uint32),
        Value::Int64(_) => text.parse::<i64>().ok().map(Value::Int64),
        Value::Uint64(_) => text.parse::<u64>().ok().map(Value::Uint64),
        Value::Float32(_) => text.parse::<f32>().ok().map(Value::Float32),
        Value::Float64(_) => text.parse::<f64>().ok().map(Value::Float64),
        Value::String8(_) => Some(Value::String8(text.to_string())),
        _ => None,
    }
}

/// A declared member's effective default: its textual `default_value` if
/// present and parseable, else the member's type default. Shared between
/// `data_model::accessors` and `codec`, both of which need "what does this
/// field read as when absent" without going through a `DynamicData`.
pub(crate) fn member_default(member: &crate::type_model::Member) -> Value {
    if let Some(text) = &member.default_value {
        if let Some(parsed) = parse_scalar_default(&default_value(&member.type_), text) {
            return parsed;
        }
    }
    default_value(&member.type_)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_model::TypeBuilder;

    #[test]
    fn test_default_primitive_values() {
        assert_eq!(default_value(&TypeDescriptor::primitive(Kind::Int32)), Value::Int32(0));
        assert_eq!(default_value(&TypeDescriptor::primitive(Kind::Bool)), Value::Bool(false));
    }

    #[test]
    fn test_default_struct_is_empty_field_map() {
        let t = TypeBuilder::new_struct("Empty").build().unwrap();
        assert_eq!(default_value(&t), Value::Struct(StructValue::default()));
    }

    #[test]
    fn test_map_value_insert_get_order_insensitive_eq() {
        let mut a = MapValue::default();
        a.insert(Value::String8("hi".into()), Value::Int32(1));
        a.insert(Value::String8("bye".into()), Value::Int32(2));

        let mut b = MapValue::default();
        b.insert(Value::String8("bye".into()), Value::Int32(2));
        b.insert(Value::String8("hi".into()), Value::Int32(1));

        assert_eq!(a, b);
        assert_eq!(a.get(&Value::String8("hi".into())), Some(&Value::Int32(1)));
    }

    #[test]
    fn test_array_elision_absent_equals_default() {
        let arr = ArrayValue::default();
        assert!(arr.elements.is_empty());
    }
}
