//! Token Amount Precision Handling
//!
//! Every token carries its own native precision (GALA 8, GUSDC 6, GWETH 18, ...).
//! Quotes and swap results are truncated to that precision before they are chained
//! into the next hop, so a 3-4 hop loop never accumulates sub-unit dust that the
//! chain itself could not settle.
//!
//! ## Critical Rules
//!
//! 1. **NO FLOATING POINT**: amounts are `Decimal`, never f32/f64
//! 2. **Truncate, never round up**: a swap can not deliver more than the smallest unit
//! 3. **Bounded scale**: a registry may not declare more than 28 decimals
//!
//! ## Example Usage
//!
//! ```rust
//! use types::TokenPrecision;
//! use rust_decimal_macros::dec;
//!
//! let precision = TokenPrecision::new(8).with_token("GWETH", 18);
//! let gala = precision.amount("GALA", dec!(100.123456789));
//! assert_eq!(gala.value(), dec!(100.12345678));
//! assert_eq!(gala.decimals(), 8);
//! ```

use crate::common::errors::PrecisionError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Decimals assumed for tokens with no registered precision
pub const DEFAULT_TOKEN_DECIMALS: u8 = 8;

/// Largest scale `Decimal` can represent
const MAX_DECIMALS: u32 = 28;

pub type Result<T> = std::result::Result<T, PrecisionError>;

/// Token amount truncated to the token's native precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenAmount {
    value: Decimal,
    decimals: u8,
}

impl TokenAmount {
    fn truncated(value: Decimal, decimals: u8) -> Self {
        let decimals = decimals.min(MAX_DECIMALS as u8);
        Self {
            value: value.round_dp_with_strategy(decimals as u32, RoundingStrategy::ToZero),
            decimals,
        }
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

fn check_decimals(decimals: u8) -> Result<u8> {
    if decimals as u32 > MAX_DECIMALS {
        return Err(PrecisionError::UnsupportedDecimals {
            decimals,
            max: MAX_DECIMALS,
        });
    }
    Ok(decimals)
}

/// Registry of native decimals per token symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPrecision {
    default_decimals: u8,
    #[serde(default)]
    overrides: HashMap<String, u8>,
}

impl TokenPrecision {
    pub fn new(default_decimals: u8) -> Self {
        Self {
            default_decimals: default_decimals.min(MAX_DECIMALS as u8),
            overrides: HashMap::new(),
        }
    }

    /// Builder-style registration of a token's decimals
    pub fn with_token(mut self, symbol: impl Into<String>, decimals: u8) -> Self {
        self.set_decimals(symbol, decimals);
        self
    }

    pub fn set_decimals(&mut self, symbol: impl Into<String>, decimals: u8) {
        self.overrides
            .insert(symbol.into(), decimals.min(MAX_DECIMALS as u8));
    }

    pub fn decimals_of(&self, symbol: &str) -> u8 {
        self.overrides
            .get(symbol)
            .copied()
            .unwrap_or(self.default_decimals)
    }

    /// Truncate `value` to the native precision of `symbol`
    pub fn quantize(&self, symbol: &str, value: Decimal) -> Decimal {
        self.amount(symbol, value).value()
    }

    pub fn amount(&self, symbol: &str, value: Decimal) -> TokenAmount {
        TokenAmount::truncated(value, self.decimals_of(symbol))
    }

    /// Reject registries (typically deserialized ones) that declare more
    /// decimals than `Decimal` can carry
    pub fn validate(&self) -> Result<()> {
        check_decimals(self.default_decimals)?;
        for decimals in self.overrides.values() {
            check_decimals(*decimals)?;
        }
        Ok(())
    }
}

impl Default for TokenPrecision {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_DECIMALS)
            .with_token("GUSDC", 6)
            .with_token("GUSDT", 6)
            .with_token("GWETH", 18)
            .with_token("GWBTC", 8)
    }
}
