// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime values for a `TypeDescriptor` (spec §3.2, §4.2).
//!
//! ```ignore
//! use xtypes_dynamic::type_model::{Kind, TypeBuilder, TypeDescriptor};
//! use xtypes_dynamic::data_model::DynamicData;
//!
//! let int32 = TypeDescriptor::primitive(Kind::Int32);
//! let point = TypeBuilder::new_struct("Point")
//!     .field("x", int32.clone())
//!     .field("y", int32)
//!     .build()
//!     .unwrap();
//! let mut data = DynamicData::new(point);
//! data.set(0, 3i32).unwrap();
//! assert_eq!(data.get::<i32>(0).unwrap(), 3);
//! ```

mod accessors;
mod value;

pub use accessors::{DynamicData, FromValue, IntoValue};
pub use value::{default_value, ArrayValue, MapValue, SequenceValue, StructValue, UnionValue, Value};

pub(crate) use accessors::implicit_default_discriminator;
pub(crate) use value::member_default;
