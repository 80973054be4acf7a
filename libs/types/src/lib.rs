//! # Multi-Path Arbitrage Types Library
//!
//! Shared numeric types for the arbitrage workspace.
//!
//! ## Design Philosophy
//!
//! - **No Floating Point**: every amount and percentage is a `Decimal`
//! - **Native Token Precision**: amounts are truncated to the token's own decimals
//!   whenever they cross a quote or swap boundary
//! - **Explicit Conversions**: fraction <-> percent conversions live
//!   in one place so compounding code never guesses at scale
//!
//! ## Quick Start
//!
//! ```rust
//! use types::TokenPrecision;
//! use rust_decimal_macros::dec;
//!
//! let precision = TokenPrecision::new(8).with_token("GUSDC", 6);
//! let amount = precision.amount("GUSDC", dec!(12.3456789));
//! assert_eq!(amount.value(), dec!(12.345678));
//! ```

pub mod common;
pub mod precision;
pub mod time;

pub use common::errors::PrecisionError;
pub use common::fixed_point::{fraction_to_percent, percent_of, percent_to_fraction};
pub use precision::{TokenAmount, TokenPrecision, DEFAULT_TOKEN_DECIMALS};
pub use time::{current_timestamp_ns, NANOS_PER_SECOND};

pub use rust_decimal::Decimal;
