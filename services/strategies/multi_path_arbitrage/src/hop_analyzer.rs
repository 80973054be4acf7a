//! # Hop Analyzer
//!
//! ## Purpose
//!
//! Assesses a single swap edge before commitment: best fee tier by expected
//! output, modelled slippage, measured price impact, approximate pool depth,
//! a three-level execution risk and the alternative fee-tier routes.
//!
//! ## Pool Depth Approximation
//!
//! Depth is the largest probe size (1×, 2×, 5× the intended amount by default)
//! that still returns a valid quote, multiplied by `liquidity_depth_multiplier`
//! (×10). A probe is valid when it returns a positive output whose effective rate
//! is within `max_price_impact_per_hop` of the reference rate. This is a proxy
//! for pool depth, not a reading of pool reserves; results are cached per
//! directed pair for `liquidity_cache_ttl_secs` and reused for any amount the
//! cached probes already covered.
//!
//! ## Performance Profile
//!
//! Cold hop: one quote per fee tier plus one reference quote plus one quote per
//! probe multiplier, issued concurrently in two batches. Warm hop (depth cached):
//! fee-tier quotes plus the reference quote.

use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::config::MultiPathConfig;
use crate::domain::{ExecutionRisk, FeeTier};
use crate::error::{ArbitrageError, QuoteError, Result};
use crate::gateway::QuoteGateway;
use crate::market::{LiquidityCache, MarketConditions};

/// Reference quotes are taken at this fraction of the intended amount
const REFERENCE_FRACTION: Decimal = dec!(0.01);

/// A non-optimal fee tier that can still route the hop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeRoute {
    pub fee_tier: FeeTier,
    pub expected_output: Decimal,
    /// Hop risk score plus the output shortfall versus the optimal tier, capped at 1
    pub risk_score: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopAnalysis {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
    pub expected_amount_out: Decimal,
    pub optimal_fee_tier: FeeTier,
    /// Modelled slippage before the per-hop cap (percent)
    pub raw_slippage: Decimal,
    /// Modelled slippage capped at `max_slippage_per_hop` (percent)
    pub estimated_slippage: Decimal,
    /// Rate degradation of the intended amount versus a small reference trade (percent)
    pub price_impact: Decimal,
    /// Approximate pool depth in units of `token_in`
    pub liquidity_depth: Decimal,
    pub execution_risk: ExecutionRisk,
    /// Weighted risk score in [0, 1]
    pub risk_score: Decimal,
    /// In units of the path's starting token
    pub gas_estimate: Decimal,
    pub alternatives: Vec<AlternativeRoute>,
}

impl HopAnalysis {
    pub fn pair_label(&self) -> String {
        format!("{}→{}", self.token_in, self.token_out)
    }

    /// Trade size relative to estimated depth
    pub fn size_ratio(&self) -> Decimal {
        size_ratio(self.amount_in, self.liquidity_depth)
    }
}

pub struct HopAnalyzer {
    gateway: Arc<dyn QuoteGateway>,
    cache: Arc<LiquidityCache>,
}

impl HopAnalyzer {
    pub fn new(gateway: Arc<dyn QuoteGateway>, cache: Arc<LiquidityCache>) -> Self {
        Self { gateway, cache }
    }

    pub fn cache(&self) -> &Arc<LiquidityCache> {
        &self.cache
    }

    /// Analyze `amount_in` of `token_in` → `token_out`
    ///
    /// `hop_index` only labels the `RouteUnavailable` error.
    pub async fn analyze_hop(
        &self,
        hop_index: usize,
        token_in: &str,
        token_out: &str,
        amount_in: Decimal,
        conditions: &MarketConditions,
        config: &MultiPathConfig,
    ) -> Result<HopAnalysis> {
        let unavailable = |reason: String| ArbitrageError::RouteUnavailable {
            hop_index,
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            reason,
        };

        if amount_in <= Decimal::ZERO {
            return Err(unavailable(format!("non-positive input amount {}", amount_in)));
        }

        // Quote every tier concurrently, keep positive outputs
        let tiers = self.gateway.available_fee_tiers();
        let tier_quotes = join_all(tiers.iter().map(|tier| {
            self.gateway
                .quote(token_in, token_out, amount_in, Some(*tier))
        }))
        .await;

        let mut valid: Vec<(FeeTier, Decimal)> = Vec::new();
        let mut last_error: Option<QuoteError> = None;
        for (tier, result) in tiers.iter().zip(tier_quotes) {
            match result {
                Ok(quote) if quote.amount_out > Decimal::ZERO => {
                    valid.push((*tier, quote.amount_out))
                }
                Ok(_) => {}
                Err(e) => last_error = Some(e),
            }
        }

        let (best_tier, best_output) = valid
            .iter()
            .copied()
            .max_by(|a, b| a.1.cmp(&b.1))
            .ok_or_else(|| {
                unavailable(
                    last_error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "no fee tier returned a positive quote".to_string()),
                )
            })?;

        let reference_rate = self
            .reference_rate(token_in, token_out, amount_in, best_tier)
            .await;
        // a cached depth only covers amounts up to the probe size that produced it
        let covered = amount_in * config.optimizer.liquidity_depth_multiplier;
        let liquidity_depth = match self.cache.get(token_in, token_out) {
            Some(depth) if depth >= covered => depth,
            _ => {
                let depth = self
                    .probe_depth(token_in, token_out, amount_in, best_tier, reference_rate, config)
                    .await;
                self.cache.insert(token_in, token_out, depth);
                depth
            }
        };

        let ratio = size_ratio(amount_in, liquidity_depth);
        let price_impact = match reference_rate {
            Some(reference) => rate_degradation(reference, best_output / amount_in),
            // no reference quote: fall back to the size/depth proxy
            None => ratio * dec!(100),
        };

        let primaries = &config.universe.primary;
        let exotic = !primaries.iter().any(|t| t == token_in)
            || !primaries.iter().any(|t| t == token_out);
        let raw_slippage = estimate_slippage(config, conditions, ratio, exotic);
        let estimated_slippage = raw_slippage.min(config.optimizer.max_slippage_per_hop);

        let risk_score = hop_risk_score(config, conditions, raw_slippage, price_impact, ratio);
        let execution_risk = classify_execution_risk(config, risk_score);

        let alternatives = valid
            .iter()
            .filter(|(tier, _)| *tier != best_tier)
            .map(|(tier, output)| {
                let shortfall = (best_output - *output) / best_output;
                AlternativeRoute {
                    fee_tier: *tier,
                    expected_output: *output,
                    risk_score: (risk_score + shortfall).min(Decimal::ONE),
                }
            })
            .collect();

        debug!(
            pair = %format!("{}→{}", token_in, token_out),
            tier = %best_tier,
            %raw_slippage,
            %price_impact,
            %liquidity_depth,
            "hop analyzed"
        );

        Ok(HopAnalysis {
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount_in,
            expected_amount_out: best_output,
            optimal_fee_tier: best_tier,
            raw_slippage,
            estimated_slippage,
            price_impact,
            liquidity_depth,
            execution_risk,
            risk_score,
            gas_estimate: config.optimizer.gas_cost_per_hop,
            alternatives,
        })
    }

    async fn reference_rate(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: Decimal,
        tier: FeeTier,
    ) -> Option<Decimal> {
        let reference_amount = amount_in * REFERENCE_FRACTION;
        match self
            .gateway
            .quote(token_in, token_out, reference_amount, Some(tier))
            .await
        {
            Ok(quote) if quote.amount_out > Decimal::ZERO => {
                Some(quote.amount_out / reference_amount)
            }
            _ => None,
        }
    }

    /// Largest valid probe multiple × depth multiplier, in `token_in` units
    async fn probe_depth(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: Decimal,
        tier: FeeTier,
        reference_rate: Option<Decimal>,
        config: &MultiPathConfig,
    ) -> Decimal {
        let multiples = &config.optimizer.liquidity_probe_multipliers;
        let probes = join_all(multiples.iter().map(|multiple| {
            self.gateway
                .quote(token_in, token_out, amount_in * *multiple, Some(tier))
        }))
        .await;

        let max_impact = config.optimizer.max_price_impact_per_hop;
        let largest_valid = multiples
            .iter()
            .zip(probes)
            .filter_map(|(multiple, result)| {
                let quote = result.ok()?;
                if quote.amount_out <= Decimal::ZERO {
                    return None;
                }
                let within_impact = reference_rate
                    .map(|reference| {
                        let rate = quote.amount_out / (amount_in * *multiple);
                        rate_degradation(reference, rate) <= max_impact
                    })
                    .unwrap_or(true);
                within_impact.then_some(*multiple)
            })
            .max()
            .unwrap_or(Decimal::ONE);

        amount_in * largest_valid * config.optimizer.liquidity_depth_multiplier
    }
}

/// Deterministic slippage model in percent, uncapped
pub fn estimate_slippage(
    config: &MultiPathConfig,
    conditions: &MarketConditions,
    size_ratio: Decimal,
    exotic_pair: bool,
) -> Decimal {
    let model = &config.slippage_model;
    let mut slippage = model.base_slippage
        + conditions.volatility * model.volatility_weight
        + conditions.network_congestion * model.congestion_weight;

    if size_ratio > model.large_size_ratio {
        slippage += model.large_size_bonus;
    } else if size_ratio > model.medium_size_ratio {
        slippage += model.medium_size_bonus;
    }

    if exotic_pair {
        slippage += model.exotic_pair_bonus;
    }

    slippage
}

/// Weighted score in [0, 1] from slippage, impact, depth bucket and ambient signals
pub fn hop_risk_score(
    config: &MultiPathConfig,
    conditions: &MarketConditions,
    slippage: Decimal,
    price_impact: Decimal,
    size_ratio: Decimal,
) -> Decimal {
    let risk = &config.risk_model;
    let optimizer = &config.optimizer;
    let unit = |v: Decimal| v.max(Decimal::ZERO).min(Decimal::ONE);

    let slippage_component = unit(slippage / optimizer.max_slippage_per_hop);
    let impact_component = unit(price_impact / optimizer.max_price_impact_per_hop);
    let liquidity_component = liquidity_bucket(config, size_ratio);
    let market_component =
        unit((conditions.competition_level + conditions.network_congestion) / dec!(2));

    let weights = risk.slippage_weight
        + risk.price_impact_weight
        + risk.liquidity_weight
        + risk.market_weight;
    let weighted = slippage_component * risk.slippage_weight
        + impact_component * risk.price_impact_weight
        + liquidity_component * risk.liquidity_weight
        + market_component * risk.market_weight;

    unit(weighted / weights)
}

/// Depth bucket score: deeper pools relative to trade size score lower
pub fn liquidity_bucket(config: &MultiPathConfig, size_ratio: Decimal) -> Decimal {
    let model = &config.slippage_model;
    if size_ratio > model.large_size_ratio {
        Decimal::ONE
    } else if size_ratio > model.medium_size_ratio {
        dec!(0.6)
    } else if size_ratio > model.medium_size_ratio / dec!(2) {
        dec!(0.3)
    } else {
        dec!(0.1)
    }
}

pub fn classify_execution_risk(config: &MultiPathConfig, score: Decimal) -> ExecutionRisk {
    let risk = &config.risk_model;
    if score >= risk.hop_high_threshold {
        ExecutionRisk::High
    } else if score >= risk.hop_medium_threshold {
        ExecutionRisk::Medium
    } else {
        ExecutionRisk::Low
    }
}

fn size_ratio(amount: Decimal, depth: Decimal) -> Decimal {
    if depth <= Decimal::ZERO {
        Decimal::ONE
    } else {
        amount / depth
    }
}

/// Percent by which `rate` falls short of `reference`
fn rate_degradation(reference: Decimal, rate: Decimal) -> Decimal {
    if reference <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    ((Decimal::ONE - rate / reference) * dec!(100)).max(Decimal::ZERO)
}
