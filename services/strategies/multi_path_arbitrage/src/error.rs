//! Error types for multi-path arbitrage
//!
//! Routine outcomes (a path with no route, a path that fails thresholds) are
//! carried as data on `OptimizedPath` / `ScanReport`. The variants here are
//! returned only where a caller must branch on them.

use rust_decimal::Decimal;
use thiserror::Error;
use types::PrecisionError;

/// Failure reported by the quote gateway
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuoteError {
    /// No pool or no liquidity for the pair; not worth retrying this cycle
    #[error("No route for {token_in}→{token_out}")]
    NoRoute { token_in: String, token_out: String },

    /// Network or service hiccup; the same quote may succeed later
    #[error("Transient quote failure: {reason}")]
    Transient { reason: String },
}

/// Failure reported by the swap executor
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SwapError {
    #[error("Swap rejected: {reason}")]
    Rejected { reason: String },

    #[error("Swap output {actual} below minimum {minimum}")]
    SlippageExceeded { minimum: Decimal, actual: Decimal },

    #[error("Swap did not settle: {reason}")]
    Timeout { reason: String },
}

/// Structured error types for path optimization and execution
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArbitrageError {
    #[error("Route unavailable at hop {hop_index} ({token_in}→{token_out}): {reason}")]
    RouteUnavailable {
        hop_index: usize,
        token_in: String,
        token_out: String,
        reason: String,
    },

    #[error("Invalid path: {reason}")]
    InvalidPath { reason: String },

    #[error("Execution failed at hop {hop_index}: {reason}")]
    ExecutionFailed { hop_index: usize, reason: String },

    #[error(
        "Rollback failed at reverse hop {reverse_hop_index}: {reason} \
         (stranded {stranded_amount} {stranded_token})"
    )]
    RollbackFailed {
        reverse_hop_index: usize,
        reason: String,
        stranded_token: String,
        stranded_amount: Decimal,
    },

    #[error("Opportunity {opportunity_id} expired at {expired_at_ns}ns")]
    OpportunityExpired {
        opportunity_id: String,
        expired_at_ns: u64,
    },

    #[error("Opportunity {active_id} is still in flight")]
    ExecutionInFlight { active_id: String },

    #[error("Opportunity {opportunity_id} is not executable: {reasons}")]
    NotExecutable {
        opportunity_id: String,
        reasons: String,
    },

    /// The execution future was dropped after at least one swap landed
    #[error("Execution abandoned after {executed_hops} hops")]
    Abandoned { executed_hops: usize },

    #[error("No manual rollback is pending")]
    NoPendingRollback,

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Precision error: {0}")]
    Precision(#[from] PrecisionError),
}

pub type Result<T> = std::result::Result<T, ArbitrageError>;
