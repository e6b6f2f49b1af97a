// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The process-wide, name-keyed type table (spec §5).
//!
//! A single mutex-guarded `HashMap` plays the role `hdds`'s participant-wide
//! lookup tables play elsewhere in the teacher crate (e.g. its discovery
//! cache): insertion and lookup are serialized through the lock, but a
//! looked-up `Arc<TypeDescriptor>` is immutable and freely shared afterward
//! without holding the lock (spec §5's "Shared state" paragraph).

use crate::error::{Error, Result};
use crate::type_model::TypeDescriptor;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Process-wide type registry. Construct one with [`Registry::new`], or use
/// [`global`] for the shared singleton most callers want.
pub struct Registry {
    types: Mutex<HashMap<String, Arc<TypeDescriptor>>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry { types: Mutex::new(HashMap::new()) }
    }

    /// Register `type_` under its own name. Rejects a name already bound
    /// (spec §4.4's name-redefinition policy applies uniformly, not just to
    /// the XML loader).
    pub fn register(&self, type_: Arc<TypeDescriptor>) -> Result<()> {
        self.register_as(type_.get_name().to_string(), type_)
    }

    /// Register `type_` under an explicit `name` (useful for aliases or
    /// when the descriptor's own name differs from its registry key).
    pub fn register_as(&self, name: String, type_: Arc<TypeDescriptor>) -> Result<()> {
        let mut types = self.types.lock();
        if types.contains_key(&name) {
            return Err(Error::BadParameter(format!("a type named '{}' is already registered", name)));
        }
        types.insert(name, type_);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.lock().contains_key(name)
    }

    /// Remove a registered type. Not part of spec §5's described surface,
    /// but kept small and explicit for test teardown rather than leaving
    /// registries to grow unbounded across a long test run.
    pub fn unregister(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.lock().remove(name)
    }

    pub fn len(&self) -> usize {
        self.types.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static GLOBAL: std::sync::OnceLock<Registry> = std::sync::OnceLock::new();

/// The process-wide singleton registry (spec §5: "the type registry is a
/// process-wide table"). Most callers outside of tests want this rather
/// than constructing their own `Registry`.
pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(Registry::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_model::{Kind, TypeBuilder, TypeDescriptor as TD};

    fn point_type(name: &str) -> Arc<TypeDescriptor> {
        let int32 = TD::primitive(Kind::Int32);
        TypeBuilder::new_struct(name).field("x", int32.clone()).field("y", int32).build().unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let reg = Registry::new();
        reg.register(point_type("Point")).unwrap();
        let found = reg.lookup("Point").unwrap();
        assert_eq!(found.get_name(), "Point");
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let reg = Registry::new();
        reg.register(point_type("Point")).unwrap();
        let err = reg.register(point_type("Point")).unwrap_err();
        assert!(matches!(err, Error::BadParameter(_)));
    }

    #[test]
    fn test_lookup_missing_returns_none() {
        let reg = Registry::new();
        assert!(reg.lookup("Nope").is_none());
    }

    #[test]
    fn test_unregister_frees_the_name() {
        let reg = Registry::new();
        reg.register(point_type("Point")).unwrap();
        assert!(reg.unregister("Point").is_some());
        reg.register(point_type("Point")).unwrap();
    }
}
