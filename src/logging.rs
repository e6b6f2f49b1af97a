// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compile-time configurable diagnostics.
//!
//! Four macros (`debug!`, `info!`, `warn!`, `error!`) forward to the `log`
//! facade when the `logging` feature is enabled; they expand to nothing
//! when it is disabled, so a non-`logging` build pays zero cost. This
//! crate has no process-wide sink of its own — it only ever forwards to
//! whatever subscriber the embedding application installed.

#[macro_export]
#[cfg(feature = "logging")]
macro_rules! debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[macro_export]
#[cfg(feature = "logging")]
macro_rules! info {
    ($($arg:tt)*) => { log::info!($($arg)*) };
}

#[macro_export]
#[cfg(feature = "logging")]
macro_rules! warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[macro_export]
#[cfg(feature = "logging")]
macro_rules! error {
    ($($arg:tt)*) => { log::error!($($arg)*) };
}

#[macro_export]
#[cfg(not(feature = "logging"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[macro_export]
#[cfg(not(feature = "logging"))]
macro_rules! info {
    ($($arg:tt)*) => {};
}

#[macro_export]
#[cfg(not(feature = "logging"))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

#[macro_export]
#[cfg(not(feature = "logging"))]
macro_rules! error {
    ($($arg:tt)*) => {};
}

#[cfg(all(test, feature = "logging"))]
mod tests {
    #[test]
    fn test_macros_compile() {
        crate::debug!("decode struct at offset {}", 4);
        crate::warn!("unknown discriminator {}", 7);
        crate::error!("short buffer: need {} have {}", 8, 2);
    }
}
