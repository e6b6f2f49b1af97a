// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error taxonomy.
//!
//! The closed error set mirrors the DDS `ReturnCode_t` space: every fallible
//! operation in this crate returns one of these variants rather than a
//! bare string or a `Box<dyn Error>`.

use std::fmt;

/// Closed error taxonomy shared by every public operation in this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Success sentinel, kept for symmetry with the DDS return-code space.
    /// Never constructed as an `Err`.
    Ok,
    Error(String),
    BadParameter(String),
    PreconditionNotMet(String),
    NotEnabled,
    OutOfResources,
    Unsupported(String),
    Immutable,
    IllegalOperation(String),
    NoData,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Misuse
            Error::Ok => write!(f, "ok"),
            Error::BadParameter(reason) => write!(f, "bad parameter: {}", reason),
            Error::IllegalOperation(reason) => write!(f, "illegal operation: {}", reason),
            // State violation
            Error::PreconditionNotMet(reason) => write!(f, "precondition not met: {}", reason),
            Error::Immutable => write!(f, "type or value is immutable"),
            // Capacity
            Error::OutOfResources => write!(f, "out of resources"),
            // Unsupported
            Error::Unsupported(what) => write!(f, "unsupported: {}", what),
            Error::NotEnabled => write!(f, "not enabled"),
            // Other
            Error::NoData => write!(f, "no data"),
            Error::Error(reason) => write!(f, "error: {}", reason),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_variants() {
        assert_eq!(
            format!("{}", Error::BadParameter("bad kind".into())),
            "bad parameter: bad kind"
        );
        assert_eq!(
            format!("{}", Error::PreconditionNotMet("loan outstanding".into())),
            "precondition not met: loan outstanding"
        );
        assert_eq!(format!("{}", Error::Immutable), "type or value is immutable");
        assert_eq!(format!("{}", Error::OutOfResources), "out of resources");
        assert_eq!(format!("{}", Error::NoData), "no data");
    }

    #[test]
    fn test_error_is_std_error() {
        fn assert_std_error<E: std::error::Error>(_e: &E) {}
        assert_std_error(&Error::NotEnabled);
    }
}
