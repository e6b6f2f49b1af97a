// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime (dynamic) OMG DDS-XTypes type system and XCDR codec.
//!
//! This crate builds and introspects DDS types at runtime, without
//! generated code: a recursive [`type_model`] describes a type's shape,
//! [`data_model`] holds runtime-typed values against that shape, and
//! [`codec`] serializes/deserializes them to XCDR v1/v2 on the wire.
//! Optional projections round-trip the same values through XML type
//! definitions ([`xml`]) and JSON documents ([`json`]); [`registry`] is
//! the process-wide name-to-type table both projections resolve against,
//! and [`type_support`] is the thin consumer-facing adapter that ties a
//! type, the codec and the registry together for a single topic type.
//!
//! ```
//! use xtypes_dynamic::type_model::{Kind, TypeBuilder, TypeDescriptor};
//! use xtypes_dynamic::data_model::DynamicData;
//! use xtypes_dynamic::codec::{self, Representation};
//!
//! let int32 = TypeDescriptor::primitive(Kind::Int32);
//! let point = TypeBuilder::new_struct("Point")
//!     .field("x", int32.clone())
//!     .field("y", int32)
//!     .build()
//!     .unwrap();
//!
//! let mut data = DynamicData::new(point.clone());
//! data.set(0, 3i32).unwrap();
//! data.set(1, 4i32).unwrap();
//!
//! let bytes = codec::encode(data.value(), &point, Representation::XCdrV2).unwrap();
//! let back = codec::decode(&bytes, &point, Representation::XCdrV2).unwrap();
//! assert_eq!(*data.value(), back);
//! ```

pub mod codec;
pub mod data_model;
pub mod error;
pub mod logging;
#[cfg(feature = "json")]
pub mod json;
pub mod registry;
pub mod type_model;
pub mod type_support;
#[cfg(feature = "xml")]
pub mod xml;

pub use error::{Error, Result};
