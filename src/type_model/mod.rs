// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The recursive, DAG-shaped type descriptor graph (spec §3.1, §4.1).
//!
//! ```ignore
//! use xtypes_dynamic::type_model::{Kind, TypeBuilder, TypeDescriptor};
//!
//! let int32 = TypeDescriptor::primitive(Kind::Int32);
//! let point = TypeBuilder::new_struct("Point")
//!     .field("x", int32.clone())
//!     .field("y", int32)
//!     .build()
//!     .unwrap();
//! assert_eq!(point.get_member_by_name("x").unwrap().id, 0);
//! ```

mod builder;
mod descriptor;
mod kind;
mod member;

pub use builder::TypeBuilder;
pub use descriptor::{Extensibility, TypeDescriptor};
pub use kind::{Kind, MemberId, MEMBER_ID_INVALID};
pub use member::{Annotation, Member};
