//! Error types for token precision
//!
//! Raised when a token precision registry cannot be represented by `Decimal`.

use thiserror::Error;

/// Errors that can occur while configuring token precision
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PrecisionError {
    /// Token declares more decimals than `Decimal` can carry
    #[error("Unsupported precision: {decimals} decimals exceeds maximum of {max}")]
    UnsupportedDecimals { decimals: u8, max: u32 },
}
