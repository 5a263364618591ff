//! Common types and utilities.

/// Gateway error type.
pub use crate::error::Error;

/// Gateway result type.
pub type Result<T> = core::result::Result<T, Error>;
