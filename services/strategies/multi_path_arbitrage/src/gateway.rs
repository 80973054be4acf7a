//! External collaborator contracts: quoting and swap execution
//!
//! Both are injected as `Arc<dyn ...>` handles. Every call is an await point;
//! callers never fire-and-forget a swap because the next hop is sized from the
//! previous hop's actual output.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{FeeTier, Urgency};
use crate::error::{QuoteError, SwapError};

/// Expected output for a hypothetical swap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub amount_out: Decimal,
    pub fee_tier: FeeTier,
}

/// Pricing service for hypothetical swaps
///
/// Must be safe to call repeatedly and rapidly: probing, alternative-route search
/// and final re-quoting all go through it.
#[async_trait]
pub trait QuoteGateway: Send + Sync {
    /// Quote `amount_in` of `token_in` into `token_out`.
    ///
    /// With `fee_tier = None` the gateway picks its own best tier.
    async fn quote(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: Decimal,
        fee_tier: Option<FeeTier>,
    ) -> Result<Quote, QuoteError>;

    /// Fee tiers worth querying per hop
    fn available_fee_tiers(&self) -> Vec<FeeTier> {
        FeeTier::ALL.to_vec()
    }
}

/// A single swap submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
    pub min_amount_out: Decimal,
    pub fee_tier: FeeTier,
    /// Slippage tolerance in percent
    pub slippage_tolerance: Decimal,
    pub urgency: Urgency,
    /// Address swaps are attributed to
    pub wallet: String,
}

/// Terminal success of a swap; `amount_out` is the actual settled output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapOutcome {
    pub amount_out: Decimal,
    pub transaction_id: Option<String>,
}

/// Submits swaps and waits for their terminal result
#[async_trait]
pub trait SwapExecutor: Send + Sync {
    async fn execute(&self, request: &SwapRequest) -> Result<SwapOutcome, SwapError>;
}
