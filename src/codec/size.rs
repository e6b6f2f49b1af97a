// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Size calculators (spec §4.3): `serialized_size`, `max_serialized_size`,
//! `empty_serialized_size`, `key_max_serialized_size`.
//!
//! `serialized_size`/`empty_serialized_size` have an exact answer for a
//! concrete value, so they are computed by running the real encoder into
//! a scratch buffer and reading back its length — that is definitionally
//! exact (spec invariant 3) and keeps one code path responsible for the
//! wire layout instead of two that could drift apart.
//!
//! `max_serialized_size`/`key_max_serialized_size` have no value to
//! encode; they walk the type's bounds structurally, mirroring `hdds`'s
//! `max_cdr2_size()` recursive-upper-bound pattern (`xtypes/cdr2/*.rs`).
//! Unbounded strings/sequences/maps (`bound == 0`) have no finite upper
//! bound in principle; this crate reports one by capping unbounded
//! collections at `UNBOUNDED_CAP` elements/characters, documented in
//! DESIGN.md, consistent with how bounded-buffer DDS implementations
//! size scratch buffers for topics with at least one unbounded member.

use super::encode::encode_value;
use super::io::{framing_for, CdrWriter, Endianness, Framing, XcdrVersion};
use crate::data_model::{default_value, Value};
use crate::error::Result;
use crate::type_model::{Kind, TypeDescriptor};
use std::sync::Arc;

/// Conservative cap used when a string/sequence/map declares no bound.
pub const UNBOUNDED_CAP: u32 = 256;

pub fn serialized_size(value: &Value, type_: &Arc<TypeDescriptor>, version: XcdrVersion) -> Result<usize> {
    let mut w = CdrWriter::new(Endianness::Little);
    encode_value(&mut w, value, type_, version)?;
    Ok(w.len())
}

pub fn empty_serialized_size(type_: &Arc<TypeDescriptor>, version: XcdrVersion) -> Result<usize> {
    serialized_size(&default_value(type_), type_, version)
}

pub fn max_serialized_size(type_: &Arc<TypeDescriptor>, version: XcdrVersion) -> usize {
    max_size_of(type_, version, false)
}

pub fn key_max_serialized_size(type_: &Arc<TypeDescriptor>, version: XcdrVersion) -> usize {
    max_size_of(type_, version, true)
}

fn align_up(offset: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        offset
    } else {
        (offset + alignment - 1) & !(alignment - 1)
    }
}

/// Structural upper-bound walk. `key_only` restricts structure/bitset
/// traversal to `is_key` members (or all members if none are marked, per
/// the OMG default rule) the same way `codec::key` does at runtime.
fn max_size_of(type_: &Arc<TypeDescriptor>, version: XcdrVersion, key_only: bool) -> usize {
    let mut cursor = 0usize;
    accumulate_max(&mut cursor, type_, version, key_only);
    cursor
}

fn accumulate_max(cursor: &mut usize, type_: &Arc<TypeDescriptor>, version: XcdrVersion, key_only: bool) {
    let enclosed = type_.resolve_alias_enclosed();
    match enclosed.kind {
        Kind::None | Kind::Annotation | Kind::Alias => {}
        Kind::Bool | Kind::Byte | Kind::Int8 | Kind::Uint8 | Kind::Char8 => *cursor += 1,
        Kind::Int16 | Kind::Uint16 => {
            *cursor = align_up(*cursor, 2) + 2;
        }
        Kind::Int32 | Kind::Uint32 | Kind::Float32 | Kind::Char16 => {
            *cursor = align_up(*cursor, 4) + 4;
        }
        Kind::Int64 | Kind::Uint64 | Kind::Float64 => {
            *cursor = align_up(*cursor, 8) + 8;
        }
        Kind::Float128 => {
            *cursor = align_up(*cursor, 8) + 16;
        }
        Kind::String8 => {
            let bound = string_cap(&enclosed);
            *cursor = align_up(*cursor, 4) + 4 + bound as usize + 1;
        }
        Kind::String16 => {
            let bound = string_cap(&enclosed);
            *cursor = align_up(*cursor, 4) + 4 + bound as usize * 4;
        }
        Kind::Enum => {
            *cursor = align_up(*cursor, 4) + 4;
        }
        Kind::Bitmask => {
            let bytes = enclosed.bitmask_storage_bytes();
            *cursor = align_up(*cursor, bytes.max(1)) + bytes;
        }
        Kind::Bitset => {
            let bytes = (enclosed.bitset_storage_bits() / 8) as usize;
            *cursor = align_up(*cursor, bytes.max(1)) + bytes;
        }
        Kind::Structure => accumulate_struct(cursor, &enclosed, version, key_only),
        Kind::Union => accumulate_union(cursor, &enclosed, version, key_only),
        Kind::Array => {
            let total = enclosed.array_total_bound();
            if let Some(elem) = &enclosed.element_type {
                for _ in 0..total {
                    accumulate_max(cursor, elem, version, key_only);
                }
            }
        }
        Kind::Sequence => {
            *cursor = align_up(*cursor, 4) + 4;
            let bound = bounded_cap(enclosed.bounds.first().copied().unwrap_or(0));
            if let Some(elem) = &enclosed.element_type {
                for _ in 0..bound {
                    accumulate_max(cursor, elem, version, key_only);
                }
            }
        }
        Kind::Map => {
            *cursor = align_up(*cursor, 4) + 4;
            let bound = bounded_cap(enclosed.bounds.first().copied().unwrap_or(0));
            if let (Some(k), Some(v)) = (&enclosed.key_element_type, &enclosed.element_type) {
                for _ in 0..bound {
                    accumulate_max(cursor, k, version, key_only);
                    accumulate_max(cursor, v, version, key_only);
                }
            }
        }
    }
}

fn string_cap(type_: &Arc<TypeDescriptor>) -> u32 {
    bounded_cap(type_.bounds.first().copied().unwrap_or(0))
}

fn bounded_cap(bound: u32) -> u32 {
    if bound == 0 {
        UNBOUNDED_CAP
    } else {
        bound
    }
}

fn accumulate_struct(cursor: &mut usize, type_: &Arc<TypeDescriptor>, version: XcdrVersion, key_only: bool) {
    let all = type_.get_all_members_by_index();
    let any_key = all.iter().any(|m| m.is_key);
    let framing = framing_for(type_.extensibility, version);
    if matches!(framing, Framing::Delimited | Framing::ParameterList) {
        *cursor = align_up(*cursor, 4) + 4;
    }
    for m in &all {
        if m.is_non_serialized {
            continue;
        }
        if key_only && any_key && !m.is_key {
            continue;
        }
        if matches!(framing, Framing::ParameterList) {
            *cursor = align_up(*cursor, 4) + 8; // member-id + length header
        }
        accumulate_max(cursor, &m.type_, version, key_only);
    }
}

fn accumulate_union(cursor: &mut usize, type_: &Arc<TypeDescriptor>, version: XcdrVersion, key_only: bool) {
    if let Some(disc) = &type_.discriminator_type {
        accumulate_max(cursor, disc, version, key_only);
    }
    let mut worst = *cursor;
    for m in &type_.members {
        let mut c = *cursor;
        accumulate_max(&mut c, &m.type_, version, key_only);
        worst = worst.max(c);
    }
    *cursor = worst;
}
