//! Generic error handling for broker components.
//!
//! Components that only need to surface an error, rather than let callers match on its
//! shape, use [`GenericError`]. Errors with a meaningful structure are defined as
//! dedicated `snafu` enums in the crates that own them.
#![deny(warnings)]
#![deny(missing_docs)]

/// An opaque, context-carrying error.
pub type GenericError = anyhow::Error;

#[doc(hidden)]
pub use anyhow::anyhow as _anyhow;

/// Constructs a [`GenericError`].
///
/// Accepts a string literal, a format string with arguments (same rules as
/// `std::format!`), or an existing value implementing `Debug` and `Display`. When given
/// an existing error value, its source chain is preserved.
#[macro_export]
macro_rules! generic_error {
    ($msg:literal $(,)?) => { $crate::_anyhow!($msg) };
    ($err:expr $(,)?) => { $crate::_anyhow!($err) };
    ($fmt:expr, $($arg:tt)*) => { $crate::_anyhow!($fmt, $($arg)*) };
}
