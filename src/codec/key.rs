// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Key-only serialization and the 16-byte instance handle (spec §4.3,
//! §6). The key hasher always runs XCDR2 big-endian regardless of the
//! data's own encapsulation (design note §9), so that instance handles
//! are byte-exact across platforms of differing native endianness.

use super::encode::encode_value;
use super::io::{CdrWriter, Endianness, XcdrVersion};
use crate::data_model::{member_default, Value};
use crate::error::{Error, Result};
use crate::type_model::{Kind, TypeDescriptor};
use std::sync::Arc;

/// Recursively serialize only the key-bearing portion of `value`, per
/// spec §4.3: a structure key-serializes its `is_key` members (or every
/// member, if none are marked — the OMG default rule); any other kind,
/// at the top level, key-serializes to its full encoding iff the type
/// itself carries `@key`, otherwise to nothing.
pub fn serialize_key(value: &Value, type_: &Arc<TypeDescriptor>) -> Result<Vec<u8>> {
    let mut w = CdrWriter::new(Endianness::Big);
    encode_key_toplevel(&mut w, value, type_)?;
    Ok(w.buf)
}

/// Top-level dispatch: a bare (non-struct) keyed type only contributes
/// bytes if `@key` was applied to the type itself, since there is no
/// member-level `is_key` to consult here (spec §4.3).
fn encode_key_toplevel(w: &mut CdrWriter, value: &Value, type_: &Arc<TypeDescriptor>) -> Result<()> {
    let enclosed = type_.resolve_alias_enclosed();
    match enclosed.kind {
        Kind::Structure => encode_struct_key(w, value, &enclosed),
        _ => {
            if enclosed.has_annotation_key() {
                encode_value(w, value, type_, XcdrVersion::V2)
            } else {
                Ok(())
            }
        }
    }
}

fn encode_struct_key(w: &mut CdrWriter, value: &Value, type_: &Arc<TypeDescriptor>) -> Result<()> {
    let Value::Struct(s) = value else {
        return Err(Error::BadParameter("expected a structure value for key serialization".into()));
    };
    let all = type_.get_all_members_by_index();
    let any_key = all.iter().any(|m| m.is_key);
    for m in &all {
        if any_key && !m.is_key {
            continue;
        }
        let v = s.fields.get(&m.id).map(|b| (**b).clone()).unwrap_or_else(|| member_default(m));
        encode_key_member(w, &v, &m.type_)?;
    }
    Ok(())
}

/// Encode a member already selected as a key by its parent struct: a
/// nested struct recurses through its own key selection, everything
/// else (including a bitset or a plain scalar) encodes in full — the
/// member was already chosen by `is_key`, so re-checking `@key` on its
/// own type here would wrongly drop plain scalar key fields, which
/// never carry that annotation themselves.
fn encode_key_member(w: &mut CdrWriter, value: &Value, type_: &Arc<TypeDescriptor>) -> Result<()> {
    let enclosed = type_.resolve_alias_enclosed();
    match enclosed.kind {
        Kind::Structure => encode_struct_key(w, value, &enclosed),
        _ => encode_value(w, value, type_, XcdrVersion::V2),
    }
}

/// Compute the 16-byte instance handle: `MD5(key_bytes)` when
/// `force_md5` is set or the key is longer than 16 bytes, else the raw
/// key bytes zero-padded to 16 (spec §6).
pub fn get_key(value: &Value, type_: &Arc<TypeDescriptor>, force_md5: bool) -> Result<[u8; 16]> {
    let bytes = serialize_key(value, type_)?;
    if force_md5 || bytes.len() > 16 {
        Ok(md5_digest(&bytes))
    } else {
        let mut handle = [0u8; 16];
        handle[..bytes.len()].copy_from_slice(&bytes);
        Ok(handle)
    }
}

#[cfg(feature = "md5-key")]
fn md5_digest(bytes: &[u8]) -> [u8; 16] {
    use md5::{Digest, Md5};
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

#[cfg(not(feature = "md5-key"))]
fn md5_digest(_bytes: &[u8]) -> [u8; 16] {
    // Without the `md5-key` feature this crate has no MD5 primitive
    // available (spec §1 treats it as an external collaborator); callers
    // compiling without the feature must not rely on oversized keys.
    [0u8; 16]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_model::{Kind as K, TypeBuilder, TypeDescriptor as TD};

    #[test]
    fn test_key_serialization_only_key_members() {
        let int32 = TD::primitive(K::Int32);
        let string_t = TD::string(false, 64);
        let t = TypeBuilder::new_struct("K")
            .key_field("id", int32)
            .field("name", string_t)
            .build()
            .unwrap();
        let mut s = crate::data_model::StructValue::default();
        s.fields.insert(0, Box::new(Value::Int32(42)));
        s.fields.insert(1, Box::new(Value::String8("whatever".into())));
        let bytes = serialize_key(&Value::Struct(s), &t).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 42]);
    }

    #[test]
    fn test_get_key_short_is_zero_padded() {
        let int32 = TD::primitive(K::Int32);
        let t = TypeBuilder::new_struct("K").key_field("id", int32).build().unwrap();
        let mut s = crate::data_model::StructValue::default();
        s.fields.insert(0, Box::new(Value::Int32(42)));
        let handle = get_key(&Value::Struct(s), &t, false).unwrap();
        assert_eq!(handle, [0, 0, 0, 42, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_non_key_type_serializes_empty() {
        let t = TD::primitive(K::Int32);
        let bytes = serialize_key(&Value::Int32(5), &t).unwrap();
        assert!(bytes.is_empty());
    }

}
