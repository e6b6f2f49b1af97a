// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `TypeDescriptor`: the immutable, reference-counted type record produced
//! by `TypeBuilder::build()`.
//!
//! Grounded on `hdds`'s `dynamic::type_descriptor::TypeDescriptor`, rebuilt
//! around `MemberId`-keyed lookup, inheritance, aliasing, annotations and
//! extensibility as required by the specification (the teacher's version
//! only modeled a flat, non-inheriting, non-aliased subset of this).

use super::kind::{Kind, MemberId, MEMBER_ID_INVALID};
use super::member::{Annotation, Member};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Controls CDR framing for `Structure`/`Union` (spec §3.1, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extensibility {
    Final,
    Appendable,
    Mutable,
}

impl Default for Extensibility {
    fn default() -> Self {
        Extensibility::Final
    }
}

/// An immutable, arena-shared type record. Every reference to a type
/// elsewhere in the model is an `Arc<TypeDescriptor>` — there is no
/// separate index-based arena, since `Arc` already gives us the stable,
/// shareable identity the design notes ask for, without requiring a
/// registry-wide slab allocator.
#[derive(Debug)]
pub struct TypeDescriptor {
    pub kind: Kind,
    pub name: String,
    pub base_type: Option<Arc<TypeDescriptor>>,
    pub discriminator_type: Option<Arc<TypeDescriptor>>,
    pub element_type: Option<Arc<TypeDescriptor>>,
    pub key_element_type: Option<Arc<TypeDescriptor>>,
    pub bounds: Vec<u32>,
    pub extensibility: Extensibility,
    pub is_nested: bool,
    pub members: Vec<Member>,
    pub annotations: Vec<Annotation>,

    members_by_id: HashMap<MemberId, usize>,
    members_by_name: HashMap<String, usize>,
    /// Union dispatch cache: label value -> index into `members`.
    labels_by_discriminator: HashMap<i64, usize>,
    default_member_index: Option<usize>,
}

impl TypeDescriptor {
    /// Construct a bare primitive descriptor (no members, no bounds).
    /// Used directly by callers that need a primitive `Type` reference
    /// (e.g. a struct field of kind `Int32`) without going through
    /// `TypeBuilder`.
    pub fn primitive(kind: Kind) -> Arc<TypeDescriptor> {
        assert!(kind.is_primitive(), "primitive() called with aggregate kind {:?}", kind);
        Arc::new(TypeDescriptor {
            kind,
            name: format!("{:?}", kind),
            base_type: None,
            discriminator_type: None,
            element_type: None,
            key_element_type: None,
            bounds: Vec::new(),
            extensibility: Extensibility::Final,
            is_nested: false,
            members: Vec::new(),
            annotations: Vec::new(),
            members_by_id: HashMap::new(),
            members_by_name: HashMap::new(),
            labels_by_discriminator: HashMap::new(),
            default_member_index: None,
        })
    }

    /// Bounded/unbounded string descriptor. `max_length == 0` means
    /// unbounded.
    pub fn string(wide: bool, max_length: u32) -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor {
            kind: if wide { Kind::String16 } else { Kind::String8 },
            name: if wide { "wstring".into() } else { "string".into() },
            base_type: None,
            discriminator_type: None,
            element_type: None,
            key_element_type: None,
            bounds: vec![max_length],
            extensibility: Extensibility::Final,
            is_nested: false,
            members: Vec::new(),
            annotations: Vec::new(),
            members_by_id: HashMap::new(),
            members_by_name: HashMap::new(),
            labels_by_discriminator: HashMap::new(),
            default_member_index: None,
        })
    }

    /// Internal constructor used by `TypeBuilder::build()` once all
    /// invariants have been validated. Builds the by-id/by-name/label
    /// dispatch tables.
    pub(super) fn finalize(
        kind: Kind,
        name: String,
        base_type: Option<Arc<TypeDescriptor>>,
        discriminator_type: Option<Arc<TypeDescriptor>>,
        element_type: Option<Arc<TypeDescriptor>>,
        key_element_type: Option<Arc<TypeDescriptor>>,
        bounds: Vec<u32>,
        extensibility: Extensibility,
        is_nested: bool,
        members: Vec<Member>,
        annotations: Vec<Annotation>,
    ) -> Result<Arc<TypeDescriptor>> {
        let mut members_by_id = HashMap::new();
        let mut members_by_name = HashMap::new();
        let mut labels_by_discriminator = HashMap::new();
        let mut default_member_index = None;

        for (idx, m) in members.iter().enumerate() {
            if m.id != MEMBER_ID_INVALID && members_by_id.insert(m.id, idx).is_some() {
                return Err(Error::BadParameter(format!(
                    "duplicate member id {} in type '{}'",
                    m.id, name
                )));
            }
            if !m.name.is_empty() && members_by_name.insert(m.name.clone(), idx).is_some() {
                return Err(Error::BadParameter(format!(
                    "duplicate member name '{}' in type '{}'",
                    m.name, name
                )));
            }
            if kind == Kind::Union || kind == Kind::Enum {
                if m.is_default_label {
                    if default_member_index.is_some() {
                        return Err(Error::BadParameter(format!(
                            "union '{}' has more than one default case",
                            name
                        )));
                    }
                    default_member_index = Some(idx);
                }
                for label in &m.labels {
                    if labels_by_discriminator.insert(*label, idx).is_some() {
                        return Err(Error::BadParameter(format!(
                            "union '{}' has overlapping label {} across members",
                            name, label
                        )));
                    }
                }
            }
        }

        Ok(Arc::new(TypeDescriptor {
            kind,
            name,
            base_type,
            discriminator_type,
            element_type,
            key_element_type,
            bounds,
            extensibility,
            is_nested,
            members,
            annotations,
            members_by_id,
            members_by_name,
            labels_by_discriminator,
            default_member_index,
        }))
    }

    pub fn get_kind(&self) -> Kind {
        self.kind
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Looks in `self.members` first, then walks `base_type` for
    /// inherited members. Returns an owned `Member` (cheap: its `type_`
    /// field is an `Arc`) so the search can cross into a parent
    /// descriptor without fighting borrow lifetimes.
    pub fn get_member_by_id(&self, id: MemberId) -> Result<Member> {
        if let Some(&idx) = self.members_by_id.get(&id) {
            return Ok(self.members[idx].clone());
        }
        if let Some(base) = &self.base_type {
            if let Ok(m) = base.get_member_by_id(id) {
                return Ok(m);
            }
        }
        Err(Error::BadParameter(format!(
            "no member with id {} in type '{}'",
            id, self.name
        )))
    }

    pub fn get_member_by_name(&self, name: &str) -> Result<Member> {
        if let Some(&idx) = self.members_by_name.get(name) {
            return Ok(self.members[idx].clone());
        }
        if let Some(base) = &self.base_type {
            if let Ok(m) = base.get_member_by_name(name) {
                return Ok(m);
            }
        }
        Err(Error::BadParameter(format!(
            "no member named '{}' in type '{}'",
            name, self.name
        )))
    }

    /// All members keyed by id, including those inherited from `base_type`.
    pub fn get_all_members_by_id(&self) -> HashMap<MemberId, Member> {
        self.get_all_members_by_index()
            .into_iter()
            .map(|m| (m.id, m))
            .collect()
    }

    /// All members in declaration order, base-type members first.
    pub fn get_all_members_by_index(&self) -> Vec<Member> {
        let mut out = Vec::new();
        if let Some(base) = &self.base_type {
            out.extend(base.get_all_members_by_index());
        }
        out.extend(self.members.iter().cloned());
        out
    }

    /// Strip `Alias` chains; returns `self` if not an alias.
    pub fn resolve_alias_enclosed(self: &Arc<Self>) -> Arc<TypeDescriptor> {
        let mut current = Arc::clone(self);
        while current.kind == Kind::Alias {
            match &current.base_type {
                Some(next) => current = Arc::clone(next),
                None => break,
            }
        }
        current
    }

    pub fn get_annotation(&self, index: usize) -> Option<&Annotation> {
        self.annotations.get(index)
    }

    pub fn has_annotation_key(&self) -> bool {
        self.annotations.iter().any(|a| matches!(a, Annotation::Key))
    }

    /// Union case lookup: spec §4.1/§9's single-pass coherence algorithm.
    /// Returns the matching member if `label` is in its label set, else
    /// the default-case member, else `None` (implicit-default/unselected).
    pub fn case_by_discriminator(&self, label: i64) -> Option<&Member> {
        if let Some(&idx) = self.labels_by_discriminator.get(&label) {
            return Some(&self.members[idx]);
        }
        self.default_member_index.map(|idx| &self.members[idx])
    }

    pub fn default_case(&self) -> Option<&Member> {
        self.default_member_index.map(|idx| &self.members[idx])
    }

    /// Look up an enum literal by its declared integer value.
    pub fn enum_literal_by_value(&self, value: i64) -> Option<&Member> {
        debug_assert_eq!(self.kind, Kind::Enum);
        self.labels_by_discriminator.get(&value).map(|&idx| &self.members[idx])
    }

    /// Product of array dimensions; 0 if any dimension is 0 (invariant
    /// forbids that, but we do not re-assert it here).
    pub fn array_total_bound(&self) -> u32 {
        debug_assert_eq!(self.kind, Kind::Array);
        self.bounds.iter().product()
    }

    /// Storage width in bits for a `Bitset`, rounded up to {0,8,16,32,64}.
    /// A bitset with no bitfields has zero-byte storage (supplemented
    /// from the original C++ `DynamicTypeImpl` behavior — see SPEC_FULL.md).
    pub fn bitset_storage_bits(&self) -> u32 {
        debug_assert_eq!(self.kind, Kind::Bitset);
        let total: u32 = self.bounds.iter().sum();
        round_up_storage_bits(total)
    }

    /// Storage width in bytes for a `Bitmask`, the smallest of {1,2,4,8}
    /// that fits `bound` bits.
    pub fn bitmask_storage_bytes(&self) -> usize {
        debug_assert_eq!(self.kind, Kind::Bitmask);
        let bound = self.bounds.first().copied().unwrap_or(32);
        (round_up_storage_bits(bound) / 8) as usize
    }

    /// Structural equality per spec §4.1: same kind, name, bounds, and
    /// members (recursively).
    pub fn equals(&self, other: &TypeDescriptor) -> bool {
        if self.kind != other.kind || self.name != other.name || self.bounds != other.bounds {
            return false;
        }
        if self.members.len() != other.members.len() {
            return false;
        }
        for (a, b) in self.members.iter().zip(other.members.iter()) {
            if a.id != b.id || a.name != b.name || a.labels != b.labels {
                return false;
            }
            if !a.type_.equals(&b.type_) {
                return false;
            }
        }
        match (&self.element_type, &other.element_type) {
            (Some(a), Some(b)) if !a.equals(b) => return false,
            (None, Some(_)) | (Some(_), None) => return false,
            _ => {}
        }
        true
    }
}

/// Round a bit count up to the smallest storage width in {0, 8, 16, 32, 64}.
fn round_up_storage_bits(bits: u32) -> u32 {
    match bits {
        0 => 0,
        n if n <= 8 => 8,
        n if n <= 16 => 16,
        n if n <= 32 => 32,
        _ => 64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_model::builder::TypeBuilder;

    #[test]
    fn test_primitive_descriptor() {
        let t = TypeDescriptor::primitive(Kind::Int32);
        assert_eq!(t.get_kind(), Kind::Int32);
    }

    #[test]
    fn test_bitmask_storage_bytes() {
        let t = TypeBuilder::new_bitmask("M", 12)
            .flag("FLAG_A", 0)
            .flag("FLAG_B", 1)
            .build()
            .unwrap();
        assert_eq!(t.bitmask_storage_bytes(), 2);
    }

    #[test]
    fn test_bitset_zero_width() {
        let t = TypeBuilder::new_bitset("Empty").build().unwrap();
        assert_eq!(t.bitset_storage_bits(), 0);
    }

    #[test]
    fn test_union_case_by_discriminator_and_default() {
        let int32 = TypeDescriptor::primitive(Kind::Int32);
        let bool_t = TypeDescriptor::primitive(Kind::Bool);
        let t = TypeBuilder::new_union("U", TypeDescriptor::primitive(Kind::Int32))
            .case("a", vec![1], int32.clone())
            .case("b", vec![2], int32.clone())
            .default_case("c", bool_t)
            .build()
            .unwrap();
        assert_eq!(t.case_by_discriminator(1).unwrap().name, "a");
        assert_eq!(t.case_by_discriminator(2).unwrap().name, "b");
        assert_eq!(t.case_by_discriminator(99).unwrap().name, "c");
    }

    #[test]
    fn test_array_total_bound_multi_dimension() {
        let t = TypeBuilder::new_array("A", TypeDescriptor::primitive(Kind::Int32), vec![2, 3])
            .build()
            .unwrap();
        assert_eq!(t.array_total_bound(), 6);
    }

    #[test]
    fn test_structural_equality() {
        let a = TypeDescriptor::primitive(Kind::Int32);
        let b = TypeDescriptor::primitive(Kind::Int32);
        assert!(a.equals(&b));
        let c = TypeDescriptor::primitive(Kind::Int64);
        assert!(!a.equals(&c));
    }
}
