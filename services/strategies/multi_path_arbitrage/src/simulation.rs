//! Constant-product paper-trading market
//!
//! `SimulatedMarket` implements both [`QuoteGateway`] and [`SwapExecutor`] over
//! an in-memory x·y=k pool book. Swaps move reserves, so a quote taken after a
//! swap reflects it. Failures can be injected per directed pair for exercising
//! the rollback paths.

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::config::{PoolSeed, SimulationConfig};
use crate::domain::FeeTier;
use crate::error::{QuoteError, SwapError};
use crate::gateway::{Quote, QuoteGateway, SwapExecutor, SwapOutcome, SwapRequest};

#[derive(Debug, Clone, PartialEq)]
struct Pool {
    token_a: String,
    token_b: String,
    reserve_a: Decimal,
    reserve_b: Decimal,
}

impl Pool {
    fn reserves_for(&self, token_in: &str) -> (Decimal, Decimal) {
        if token_in == self.token_a {
            (self.reserve_a, self.reserve_b)
        } else {
            (self.reserve_b, self.reserve_a)
        }
    }

    fn apply_swap(&mut self, token_in: &str, amount_in: Decimal, amount_out: Decimal) {
        if token_in == self.token_a {
            self.reserve_a += amount_in;
            self.reserve_b -= amount_out;
        } else {
            self.reserve_b += amount_in;
            self.reserve_a -= amount_out;
        }
    }
}

/// Output of `amount_in` against `reserve_in`/`reserve_out` after the tier fee
pub fn constant_product_output(
    amount_in: Decimal,
    reserve_in: Decimal,
    reserve_out: Decimal,
    fee_tier: FeeTier,
) -> Option<Decimal> {
    if amount_in <= Decimal::ZERO || reserve_in <= Decimal::ZERO || reserve_out <= Decimal::ZERO {
        return None;
    }
    let after_fee = amount_in * (Decimal::ONE - fee_tier.fee_fraction());
    let numerator = after_fee.checked_mul(reserve_out)?;
    let denominator = reserve_in + after_fee;
    numerator.checked_div(denominator)
}

type PoolKey = (String, String, FeeTier);

fn pool_key(token_a: &str, token_b: &str, fee_tier: FeeTier) -> PoolKey {
    if token_a <= token_b {
        (token_a.to_string(), token_b.to_string(), fee_tier)
    } else {
        (token_b.to_string(), token_a.to_string(), fee_tier)
    }
}

#[derive(Debug, Default)]
struct Faults {
    swap_failures: HashMap<(String, String), SwapError>,
    quote_outages: HashSet<(String, String)>,
    transient_quotes_remaining: u32,
    /// Percent shaved off every swap's output versus its quote
    output_drift: Decimal,
}

#[derive(Debug, Default)]
pub struct SimulatedMarket {
    pools: Mutex<HashMap<PoolKey, Pool>>,
    faults: Mutex<Faults>,
    swap_log: Mutex<Vec<SwapRequest>>,
    tx_counter: AtomicU64,
}

impl SimulatedMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        let market = Self::new();
        for seed in &config.pools {
            market.add_pool(seed);
        }
        market
    }

    pub fn add_pool(&self, seed: &PoolSeed) {
        self.pools.lock().insert(
            pool_key(&seed.token_a, &seed.token_b, seed.fee_tier),
            Pool {
                token_a: seed.token_a.clone(),
                token_b: seed.token_b.clone(),
                reserve_a: seed.reserve_a,
                reserve_b: seed.reserve_b,
            },
        );
    }

    /// Reserves as `(reserve of token_a, reserve of token_b)`
    pub fn reserves(
        &self,
        token_a: &str,
        token_b: &str,
        fee_tier: FeeTier,
    ) -> Option<(Decimal, Decimal)> {
        self.pools
            .lock()
            .get(&pool_key(token_a, token_b, fee_tier))
            .map(|pool| pool.reserves_for(token_a))
    }

    /// Every swap for `token_in → token_out` fails with `error` until cleared
    pub fn fail_swaps(&self, token_in: &str, token_out: &str, error: SwapError) {
        self.faults
            .lock()
            .swap_failures
            .insert((token_in.to_string(), token_out.to_string()), error);
    }

    pub fn clear_swap_failure(&self, token_in: &str, token_out: &str) {
        self.faults
            .lock()
            .swap_failures
            .remove(&(token_in.to_string(), token_out.to_string()));
    }

    /// Quotes for the pair return `NoRoute`
    pub fn drop_route(&self, token_in: &str, token_out: &str) {
        self.faults
            .lock()
            .quote_outages
            .insert((token_in.to_string(), token_out.to_string()));
    }

    /// The next `count` quotes fail with `QuoteError::Transient`
    pub fn inject_transient_quotes(&self, count: u32) {
        self.faults.lock().transient_quotes_remaining = count;
    }

    pub fn set_output_drift(&self, percent: Decimal) {
        self.faults.lock().output_drift = percent;
    }

    pub fn executed_swaps(&self) -> Vec<SwapRequest> {
        self.swap_log.lock().clone()
    }

    fn best_output(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: Decimal,
        fee_tier: Option<FeeTier>,
    ) -> Option<(FeeTier, Decimal)> {
        let pools = self.pools.lock();
        let tiers: Vec<FeeTier> = match fee_tier {
            Some(tier) => vec![tier],
            None => FeeTier::ALL.to_vec(),
        };
        tiers
            .into_iter()
            .filter_map(|tier| {
                let pool = pools.get(&pool_key(token_in, token_out, tier))?;
                let (reserve_in, reserve_out) = pool.reserves_for(token_in);
                constant_product_output(amount_in, reserve_in, reserve_out, tier)
                    .map(|out| (tier, out))
            })
            .max_by(|a, b| a.1.cmp(&b.1))
    }
}

#[async_trait]
impl QuoteGateway for SimulatedMarket {
    async fn quote(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: Decimal,
        fee_tier: Option<FeeTier>,
    ) -> Result<Quote, QuoteError> {
        {
            let mut faults = self.faults.lock();
            if faults.transient_quotes_remaining > 0 {
                faults.transient_quotes_remaining -= 1;
                return Err(QuoteError::Transient {
                    reason: "simulated gateway hiccup".to_string(),
                });
            }
            if faults
                .quote_outages
                .contains(&(token_in.to_string(), token_out.to_string()))
            {
                return Err(QuoteError::NoRoute {
                    token_in: token_in.to_string(),
                    token_out: token_out.to_string(),
                });
            }
        }

        self.best_output(token_in, token_out, amount_in, fee_tier)
            .map(|(fee_tier, amount_out)| Quote {
                amount_out,
                fee_tier,
            })
            .ok_or_else(|| QuoteError::NoRoute {
                token_in: token_in.to_string(),
                token_out: token_out.to_string(),
            })
    }
}

#[async_trait]
impl SwapExecutor for SimulatedMarket {
    async fn execute(&self, request: &SwapRequest) -> Result<SwapOutcome, SwapError> {
        let drift = {
            let faults = self.faults.lock();
            if let Some(error) = faults
                .swap_failures
                .get(&(request.token_in.clone(), request.token_out.clone()))
            {
                return Err(error.clone());
            }
            faults.output_drift
        };

        let mut pools = self.pools.lock();
        let key = pool_key(&request.token_in, &request.token_out, request.fee_tier);
        let pool = pools.get_mut(&key).ok_or_else(|| SwapError::Rejected {
            reason: format!(
                "no {} pool for {}→{}",
                request.fee_tier, request.token_in, request.token_out
            ),
        })?;

        let (reserve_in, reserve_out) = pool.reserves_for(&request.token_in);
        let quoted = constant_product_output(
            request.amount_in,
            reserve_in,
            reserve_out,
            request.fee_tier,
        )
        .ok_or_else(|| SwapError::Rejected {
            reason: "invalid swap amount".to_string(),
        })?;
        let actual = quoted * (Decimal::ONE - drift / Decimal::from(100));

        if actual < request.min_amount_out {
            return Err(SwapError::SlippageExceeded {
                minimum: request.min_amount_out,
                actual,
            });
        }

        pool.apply_swap(&request.token_in, request.amount_in, actual);
        drop(pools);

        let id = self.tx_counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.swap_log.lock().push(request.clone());
        debug!(
            "simulated swap {} {} → {} {}",
            request.amount_in, request.token_in, actual, request.token_out
        );

        Ok(SwapOutcome {
            amount_out: actual,
            transaction_id: Some(format!("sim-{}", id)),
        })
    }
}
