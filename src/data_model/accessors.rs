// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `DynamicData`: a `Value` paired with the `TypeDescriptor` it instances,
//! plus the loan protocol, typed accessors, defaults, union coherence and
//! structural equality from spec §4.2.
//!
//! Grounded on `hdds`'s `dynamic::dynamic_data::DynamicData`, generalized
//! from its flat `HashMap<String,_>` storage to `MemberId`-keyed access
//! with real loan bookkeeping (the teacher's version had none).

use super::value::{self, ArrayValue, MapValue, SequenceValue, StructValue, UnionValue, Value};
use crate::error::{Error, Result};
use crate::type_model::{Kind, MemberId, TypeDescriptor, MEMBER_ID_INVALID};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug)]
pub struct DynamicData {
    type_: Arc<TypeDescriptor>,
    storage: Value,
    loaned_member_ids: HashSet<MemberId>,
    /// True for a value that is the key half of a `Map` pair: the value-set
    /// API refuses to overwrite it directly (spec §3.2).
    key_element_flag: bool,
}

impl DynamicData {
    /// Create a default-initialized instance of `type_`.
    pub fn new(type_: Arc<TypeDescriptor>) -> Self {
        let storage = value::default_value(&type_);
        DynamicData { type_, storage, loaned_member_ids: HashSet::new(), key_element_flag: false }
    }

    pub fn from_value(type_: Arc<TypeDescriptor>, storage: Value) -> Self {
        DynamicData { type_, storage, loaned_member_ids: HashSet::new(), key_element_flag: false }
    }

    pub(crate) fn mark_key_element(mut self) -> Self {
        self.key_element_flag = true;
        self
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.type_
    }

    pub fn type_name(&self) -> &str {
        self.type_.get_name()
    }

    pub fn value(&self) -> &Value {
        &self.storage
    }

    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.storage
    }

    pub fn into_value(self) -> Value {
        self.storage
    }

    fn enclosed_kind(&self) -> Kind {
        self.type_.resolve_alias_enclosed().kind
    }

    fn check_not_loaned(&self, id: MemberId) -> Result<()> {
        if self.loaned_member_ids.contains(&id) {
            return Err(Error::PreconditionNotMet(format!("member {} is on loan", id)));
        }
        Ok(())
    }

    // ---- Primitive accessors -------------------------------------------------

    pub fn get_primitive(&self, id: MemberId) -> Result<&Value> {
        if id == MEMBER_ID_INVALID {
            return Ok(&self.storage);
        }
        match &self.storage {
            Value::Struct(s) => {
                if let Some(v) = s.fields.get(&id) {
                    return Ok(v.as_ref());
                }
                // absent => default; caller resolves the member's type
                Err(Error::BadParameter(format!("member {} not present (use get_field for defaults)", id)))
            }
            Value::Array(a) => a.elements.get(&id).map(|v| v.as_ref()).ok_or_else(|| {
                Error::BadParameter(format!("array index {} not present (use get_field for defaults)", id))
            }),
            Value::Sequence(s) => s
                .elements
                .get(id as usize)
                .map(|v| v.as_ref())
                .ok_or_else(|| Error::BadParameter(format!("sequence index {} out of range", id))),
            _ => Err(Error::BadParameter("value kind does not support indexed primitive access".into())),
        }
    }

    /// Typed getter matching the field/element/top-level value's declared
    /// type. Returns the stored value if present, or the member's default
    /// otherwise (spec: absent entries denote "default").
    pub fn get_field(&self, id: MemberId) -> Result<Value> {
        if id == MEMBER_ID_INVALID {
            return Ok(self.storage.clone());
        }
        match &self.storage {
            Value::Struct(s) => {
                if let Some(v) = s.fields.get(&id) {
                    return Ok((**v).clone());
                }
                let member = self.type_.get_member_by_id(id)?;
                Ok(self.default_for_member(&member))
            }
            Value::Union(u) => {
                if u.selected_member == id {
                    return Ok(u.value.as_deref().cloned().unwrap_or(Value::None));
                }
                Err(Error::BadParameter(format!("member {} is not the union's selected case", id)))
            }
            Value::Array(a) => {
                if let Some(v) = a.elements.get(&id) {
                    return Ok((**v).clone());
                }
                let elem_type = self.type_.element_type.as_ref().ok_or_else(|| {
                    Error::BadParameter("array type has no element type".into())
                })?;
                Ok(value::default_value(elem_type))
            }
            Value::Sequence(s) => s
                .elements
                .get(id as usize)
                .map(|v| (**v).clone())
                .ok_or_else(|| Error::BadParameter(format!("sequence index {} out of range", id))),
            _ => Err(Error::BadParameter("value kind does not support field access".into())),
        }
    }

    fn default_for_member(&self, member: &crate::type_model::Member) -> Value {
        if let Some(text) = &member.default_value {
            if let Some(parsed) = value::parse_scalar_default(&value::default_value(&member.type_), text) {
                return parsed;
            }
        }
        value::default_value(&member.type_)
    }

    /// Set a field/element by id. For union members this also updates
    /// the discriminator to select that member (spec §4.2).
    pub fn set_field(&mut self, id: MemberId, new_value: Value) -> Result<()> {
        if self.key_element_flag {
            return Err(Error::PreconditionNotMet("cannot overwrite a map key-half value".into()));
        }
        self.check_not_loaned(id)?;
        match &mut self.storage {
            Value::Struct(s) => {
                let member = self.type_.get_member_by_id(id)?;
                if values_equal_default(&new_value, &member) {
                    s.fields.remove(&id);
                } else {
                    s.fields.insert(id, Box::new(new_value));
                }
                Ok(())
            }
            Value::Union(u) => {
                let member = self.type_.get_member_by_id(id)?;
                u.selected_member = id;
                u.value = Some(Box::new(new_value));
                let _ = member;
                Ok(())
            }
            Value::Array(a) => {
                let total = self.type_.array_total_bound();
                if id >= total {
                    return Err(Error::BadParameter(format!("array index {} out of bounds ({})", id, total)));
                }
                let elem_type = self.type_.element_type.as_ref().unwrap();
                if new_value == value::default_value(elem_type) {
                    a.elements.remove(&id);
                } else {
                    a.elements.insert(id, Box::new(new_value));
                }
                Ok(())
            }
            Value::Sequence(s) => {
                let bound = self.type_.bounds.first().copied().unwrap_or(0);
                let idx = id as usize;
                if idx < s.elements.len() {
                    s.elements[idx] = Box::new(new_value);
                } else if idx == s.elements.len() {
                    if bound > 0 && s.elements.len() as u32 >= bound {
                        return Err(Error::BadParameter(format!("sequence length would exceed bound {}", bound)));
                    }
                    s.elements.push(Box::new(new_value));
                } else {
                    return Err(Error::BadParameter("sequence index would leave a gap".into()));
                }
                Ok(())
            }
            _ => Err(Error::BadParameter("value kind does not support field assignment".into())),
        }
    }

    pub fn push_element(&mut self, new_value: Value) -> Result<()> {
        match &mut self.storage {
            Value::Sequence(s) => {
                let bound = self.type_.bounds.first().copied().unwrap_or(0);
                if bound > 0 && s.elements.len() as u32 >= bound {
                    return Err(Error::BadParameter(format!("sequence length would exceed bound {}", bound)));
                }
                s.elements.push(Box::new(new_value));
                Ok(())
            }
            _ => Err(Error::BadParameter("push_element is only valid for sequences".into())),
        }
    }

    pub fn len(&self) -> usize {
        match &self.storage {
            Value::Sequence(s) => s.elements.len(),
            Value::Array(_) => self.type_.array_total_bound() as usize,
            Value::Map(m) => m.len(),
            Value::Struct(_) => self.type_.get_all_members_by_index().len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ---- Loan protocol --------------------------------------------------------

    /// Check out a composite member by id. The parent marks the id as
    /// loaned and refuses further mutation/loans of it until
    /// `return_loan` gives it back. An out-of-bounds array index is
    /// implicitly extended with a default element first.
    pub fn loan_value(&mut self, id: MemberId) -> Result<DynamicData> {
        self.check_not_loaned(id)?;
        let (child_type, child_value) = match &mut self.storage {
            Value::Struct(s) => {
                let member = self.type_.get_member_by_id(id)?;
                let v = s.fields.remove(&id).map(|b| *b).unwrap_or_else(|| self.default_for_member(&member));
                (member.type_, v)
            }
            Value::Union(u) => {
                if u.selected_member != id {
                    return Err(Error::BadParameter(format!("member {} is not the union's selected case", id)));
                }
                let member = self.type_.get_member_by_id(id)?;
                let v = u.value.take().map(|b| *b).unwrap_or(Value::None);
                (member.type_, v)
            }
            Value::Array(a) => {
                let total = self.type_.array_total_bound();
                if id >= total {
                    return Err(Error::BadParameter(format!("array index {} out of bounds ({})", id, total)));
                }
                let elem_type = self.type_.element_type.clone().unwrap();
                let v = a.elements.remove(&id).map(|b| *b).unwrap_or_else(|| value::default_value(&elem_type));
                (elem_type, v)
            }
            Value::Sequence(s) => {
                let idx = id as usize;
                if idx >= s.elements.len() {
                    return Err(Error::BadParameter(format!("sequence index {} out of range", id)));
                }
                let elem_type = self.type_.element_type.clone().unwrap();
                let v = *std::mem::replace(&mut s.elements[idx], Box::new(Value::None));
                (elem_type, v)
            }
            _ => return Err(Error::BadParameter("value kind does not support loans".into())),
        };
        self.loaned_member_ids.insert(id);
        Ok(DynamicData::from_value(child_type, child_value))
    }

    /// Loans of a map's key half are forbidden by the spec; use
    /// `get_field`/map-specific accessors for keys instead.
    pub fn loan_map_key(&self) -> Result<()> {
        Err(Error::PreconditionNotMet("loans of a map's key half are forbidden".into()))
    }

    pub fn return_loan(&mut self, id: MemberId, loaned: DynamicData) -> Result<()> {
        if !self.loaned_member_ids.remove(&id) {
            return Err(Error::PreconditionNotMet(format!("member {} was not on loan", id)));
        }
        let DynamicData { storage: child_value, .. } = loaned;
        match &mut self.storage {
            Value::Struct(s) => {
                let member = self.type_.get_member_by_id(id)?;
                if values_equal_default(&child_value, &member) {
                    s.fields.remove(&id);
                } else {
                    s.fields.insert(id, Box::new(child_value));
                }
            }
            Value::Union(u) => {
                u.selected_member = id;
                u.value = Some(Box::new(child_value));
            }
            Value::Array(a) => {
                let elem_type = self.type_.element_type.as_ref().unwrap();
                if child_value == value::default_value(elem_type) {
                    a.elements.remove(&id);
                } else {
                    a.elements.insert(id, Box::new(child_value));
                }
            }
            Value::Sequence(s) => {
                let idx = id as usize;
                if idx < s.elements.len() {
                    s.elements[idx] = Box::new(child_value);
                }
            }
            _ => return Err(Error::BadParameter("value kind does not support loans".into())),
        }
        Ok(())
    }

    // ---- Defaults ---------------------------------------------------------

    pub fn set_default_value(&mut self, id: MemberId) -> Result<()> {
        let member = self.type_.get_member_by_id(id)?;
        let default = self.default_for_member(&member);
        self.set_field(id, default)
    }

    // ---- Union coherence (spec §4.2, §9) -----------------------------------

    /// Set the union discriminator to `label`, following the single-pass
    /// coherence algorithm: matching member selected, else default
    /// member, else unselected (`MEMBER_ID_INVALID`).
    pub fn set_discriminator(&mut self, label: i64) -> Result<()> {
        let enclosed = self.type_.resolve_alias_enclosed();
        if enclosed.kind != Kind::Union {
            return Err(Error::BadParameter("set_discriminator is only valid for unions".into()));
        }
        let Value::Union(u) = &mut self.storage else {
            return Err(Error::BadParameter("union type without union storage".into()));
        };
        match enclosed.case_by_discriminator(label) {
            Some(member) => {
                if u.selected_member != member.id {
                    u.selected_member = member.id;
                    u.value = Some(Box::new(value::default_value(&member.type_)));
                }
            }
            None => {
                u.selected_member = MEMBER_ID_INVALID;
                u.value = None;
            }
        }
        Ok(())
    }

    /// Read back the discriminator: the first label of the selected
    /// member, or the spec's mandated "first integer >= 0 not in any
    /// label set" when unselected with no explicit default.
    pub fn get_discriminator(&self) -> Result<i64> {
        let enclosed = self.type_.resolve_alias_enclosed();
        let Value::Union(u) = &self.storage else {
            return Err(Error::BadParameter("union type without union storage".into()));
        };
        if u.selected_member == MEMBER_ID_INVALID {
            return Ok(implicit_default_discriminator(&enclosed));
        }
        let member = enclosed.get_member_by_id(u.selected_member)?;
        match member.labels.first().copied() {
            Some(label) => Ok(label),
            None => Ok(implicit_default_discriminator(&enclosed)),
        }
    }

    pub fn selected_member(&self) -> Result<MemberId> {
        match &self.storage {
            Value::Union(u) => Ok(u.selected_member),
            _ => Err(Error::BadParameter("selected_member is only valid for unions".into())),
        }
    }

    // ---- Equality / clone ---------------------------------------------------

    /// Structural equality per spec §4.2: same type, same selected union
    /// member (others ignored), absent array entries compare equal to
    /// the element default.
    pub fn equals(&self, other: &DynamicData) -> bool {
        if !self.type_.equals(&other.type_) {
            return false;
        }
        values_structurally_equal(&self.storage, &other.storage, &self.type_)
    }

    /// Deep clone with no outstanding loans (spec §3.2 lifecycle note).
    pub fn deep_clone(&self) -> DynamicData {
        DynamicData {
            type_: Arc::clone(&self.type_),
            storage: self.storage.clone(),
            loaned_member_ids: HashSet::new(),
            key_element_flag: self.key_element_flag,
        }
    }
}

fn values_equal_default(v: &Value, member: &crate::type_model::Member) -> bool {
    member.default_value.is_none() && *v == value::default_value(&member.type_)
}

pub(crate) fn implicit_default_discriminator(union_type: &Arc<TypeDescriptor>) -> i64 {
    // Whether or not an explicit default case exists, the encoded/reported
    // discriminator for "no label matched" must itself match no declared
    // label (spec §4.3), so both cases use the same lowest-unclaimed-integer
    // search rather than special-casing the default member's (empty) labels.
    let mut used: Vec<i64> = union_type.members.iter().flat_map(|m| m.labels.iter().copied()).collect();
    used.sort_unstable();
    let mut candidate = 0i64;
    for label in used {
        if label == candidate {
            candidate += 1;
        } else if label > candidate {
            break;
        }
    }
    candidate
}

fn values_structurally_equal(a: &Value, b: &Value, type_: &Arc<TypeDescriptor>) -> bool {
    match (a, b) {
        (Value::Union(ua), Value::Union(ub)) => {
            if ua.selected_member != ub.selected_member {
                return false;
            }
            match (&ua.value, &ub.value) {
                (Some(x), Some(y)) => x == y,
                (None, None) => true,
                _ => false,
            }
        }
        (Value::Array(aa), Value::Array(ab)) => {
            let elem_type = type_.element_type.as_ref();
            let total = type_.array_total_bound();
            for i in 0..total {
                let da = aa.elements.get(&i).map(|v| v.as_ref().clone()).unwrap_or_else(|| {
                    elem_type.map(value::default_value).unwrap_or(Value::None)
                });
                let db = ab.elements.get(&i).map(|v| v.as_ref().clone()).unwrap_or_else(|| {
                    elem_type.map(value::default_value).unwrap_or(Value::None)
                });
                if da != db {
                    return false;
                }
            }
            true
        }
        _ => a == b,
    }
}

// ---- Typed primitive get/set traits (spec §4.2's get_X/set_X contract) -------

pub trait FromValue: Sized {
    fn from_value(v: &Value) -> Result<Self>;
}

pub trait IntoValue {
    fn into_value(self) -> Value;
}

macro_rules! impl_scalar_conversion {
    ($variant:ident, $ty:ty) => {
        impl FromValue for $ty {
            fn from_value(v: &Value) -> Result<Self> {
                match v {
                    Value::$variant(x) => Ok(*x),
                    other => Err(Error::BadParameter(format!(
                        "type mismatch: expected {}, got {:?}",
                        stringify!($variant),
                        other
                    ))),
                }
            }
        }
        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

impl_scalar_conversion!(Bool, bool);
impl_scalar_conversion!(Int8, i8);
impl_scalar_conversion!(Uint8, u8);
impl_scalar_conversion!(Int16, i16);
impl_scalar_conversion!(Uint16, u16);
impl_scalar_conversion!(Int32, i32);
impl_scalar_conversion!(Uint32, u32);
impl_scalar_conversion!(Int64, i64);
impl_scalar_conversion!(Uint64, u64);
impl_scalar_conversion!(Float32, f32);
impl_scalar_conversion!(Float64, f64);
impl_scalar_conversion!(Char16, char);

impl FromValue for String {
    fn from_value(v: &Value) -> Result<Self> {
        match v {
            Value::String8(s) | Value::String16(s) => Ok(s.clone()),
            other => Err(Error::BadParameter(format!("type mismatch: expected string, got {:?}", other))),
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String8(self)
    }
}

impl DynamicData {
    pub fn get<T: FromValue>(&self, id: MemberId) -> Result<T> {
        let v = self.get_field(id)?;
        T::from_value(&v)
    }

    pub fn set<T: IntoValue>(&mut self, id: MemberId, value: T) -> Result<()> {
        self.set_field(id, value.into_value())
    }
}

pub use super::value::{ArrayValue as DataArrayValue, MapValue as DataMapValue, SequenceValue as DataSequenceValue, StructValue as DataStructValue, UnionValue as DataUnionValue};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_model::TypeBuilder;

    fn point_type() -> Arc<TypeDescriptor> {
        let int32 = TypeDescriptor::primitive(Kind::Int32);
        TypeBuilder::new_struct("Point").field("x", int32.clone()).field("y", int32).build().unwrap()
    }

    #[test]
    fn test_set_get_roundtrip() {
        let mut dd = DynamicData::new(point_type());
        dd.set(0, 7i32).unwrap();
        dd.set(1, 9i32).unwrap();
        assert_eq!(dd.get::<i32>(0).unwrap(), 7);
        assert_eq!(dd.get::<i32>(1).unwrap(), 9);
    }

    #[test]
    fn test_default_field_read_without_set() {
        let dd = DynamicData::new(point_type());
        assert_eq!(dd.get::<i32>(0).unwrap(), 0);
    }

    #[test]
    fn test_loan_exclusion_then_return() {
        let nested = TypeBuilder::new_struct("Outer").field("inner", point_type()).build().unwrap();
        let mut dd = DynamicData::new(nested);
        let loaned = dd.loan_value(0).unwrap();
        assert!(matches!(dd.set_field(0, Value::None), Err(Error::PreconditionNotMet(_))));
        dd.return_loan(0, loaned).unwrap();
        assert!(dd.set_field(0, value::default_value(&point_type())).is_ok());
    }

    #[test]
    fn test_return_loan_not_outstanding_fails() {
        let mut dd = DynamicData::new(point_type());
        let fake = DynamicData::new(TypeDescriptor::primitive(Kind::Int32));
        assert!(matches!(dd.return_loan(0, fake), Err(Error::PreconditionNotMet(_))));
    }

    #[test]
    fn test_union_coherence_default_and_invalid() {
        let int32 = TypeDescriptor::primitive(Kind::Int32);
        let bool_t = TypeDescriptor::primitive(Kind::Bool);
        let union_t = TypeBuilder::new_union("U", int32.clone())
            .case("a", vec![1], int32.clone())
            .case("b", vec![2], int32)
            .default_case("c", bool_t)
            .build()
            .unwrap();
        let mut dd = DynamicData::new(union_t);
        dd.set_discriminator(1).unwrap();
        assert_eq!(dd.selected_member().unwrap(), 0);
        dd.set_discriminator(99).unwrap();
        assert_eq!(dd.selected_member().unwrap(), dd.descriptor().default_case().unwrap().id);
    }

    #[test]
    fn test_implicit_default_discriminator_first_unused_integer() {
        let int32 = TypeDescriptor::primitive(Kind::Int32);
        let bool_t = TypeDescriptor::primitive(Kind::Bool);
        let union_t = TypeBuilder::new_union("U", int32.clone())
            .case("a", vec![1], int32.clone())
            .case("b", vec![2], bool_t)
            .build()
            .unwrap();
        let dd = DynamicData::new(union_t);
        // no default case, no selection => discriminator must be the
        // first integer >= 0 not in {1,2}, i.e. 0.
        assert_eq!(dd.get_discriminator().unwrap(), 0);
    }

    #[test]
    fn test_clone_independence() {
        let mut dd = DynamicData::new(point_type());
        dd.set(0, 5i32).unwrap();
        let mut clone = dd.deep_clone();
        clone.set(0, 99i32).unwrap();
        assert_eq!(dd.get::<i32>(0).unwrap(), 5);
        assert_eq!(clone.get::<i32>(0).unwrap(), 99);
    }

    #[test]
    fn test_array_default_elision_equality() {
        let int32 = TypeDescriptor::primitive(Kind::Int32);
        let array_t = TypeBuilder::new_array("A", int32, vec![4]).build().unwrap();
        let mut dd = DynamicData::new(array_t.clone());
        dd.set_field(0, Value::Int32(7)).unwrap();
        let mut other = DynamicData::new(array_t);
        other.set_field(0, Value::Int32(7)).unwrap();
        other.set_field(1, Value::Int32(0)).unwrap(); // elided, stays absent
        assert!(dd.equals(&other));
    }
}
