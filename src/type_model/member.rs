// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `Member` descriptors and the small `Annotation` set the type model
//! recognizes.

use super::kind::MemberId;
use super::TypeDescriptor;
use std::sync::Arc;

/// Recognized annotation kinds (spec §3.1).
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Key,
    NonSerialized,
    BitBound(u32),
    Default(String),
}

/// A single field (struct), case (union), literal (enum), flag (bitmask)
/// or bitfield (bitset).
#[derive(Debug, Clone)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub type_: Arc<TypeDescriptor>,
    pub default_value: Option<String>,
    pub is_key: bool,
    pub is_optional: bool,
    pub is_must_understand: bool,
    /// `@non_serialized`: the codec skips this member on the wire (spec §4.3).
    pub is_non_serialized: bool,
    /// Union case labels; empty for non-union members.
    pub labels: Vec<i64>,
    /// True if this member is the union's implicit `default:` case.
    pub is_default_label: bool,
    /// Bit position/width, for enum literals and bitmask flags.
    pub bit_bound: Option<u32>,
}

impl Member {
    pub fn new(id: MemberId, name: impl Into<String>, type_: Arc<TypeDescriptor>) -> Self {
        Member {
            id,
            name: name.into(),
            type_,
            default_value: None,
            is_key: false,
            is_optional: false,
            is_must_understand: false,
            is_non_serialized: false,
            labels: Vec::new(),
            is_default_label: false,
            bit_bound: None,
        }
    }

    pub fn with_id(mut self, id: MemberId) -> Self {
        self.id = id;
        self
    }

    pub fn key(mut self) -> Self {
        self.is_key = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn must_understand(mut self) -> Self {
        self.is_must_understand = true;
        self
    }

    pub fn non_serialized(mut self) -> Self {
        self.is_non_serialized = true;
        self
    }

    pub fn with_default(mut self, text: impl Into<String>) -> Self {
        self.default_value = Some(text.into());
        self
    }

    pub fn with_labels(mut self, labels: Vec<i64>) -> Self {
        self.labels = labels;
        self
    }

    pub fn default_case(mut self) -> Self {
        self.is_default_label = true;
        self
    }

    pub fn with_bit_bound(mut self, bound: u32) -> Self {
        self.bit_bound = Some(bound);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_model::{Kind, TypeDescriptor};

    #[test]
    fn test_member_builder_chain() {
        let int32 = TypeDescriptor::primitive(Kind::Int32);
        let m = Member::new(1, "x", int32).key().with_default("0");
        assert_eq!(m.id, 1);
        assert!(m.is_key);
        assert_eq!(m.default_value.as_deref(), Some("0"));
    }
}
