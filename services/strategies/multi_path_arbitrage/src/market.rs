//! Market-condition inputs and the pool-depth cache shared by hop analysis

use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Ambient market state feeding the slippage and risk models
///
/// Each field is a score in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketConditions {
    pub volatility: Decimal,
    pub network_congestion: Decimal,
    pub competition_level: Decimal,
}

impl Default for MarketConditions {
    fn default() -> Self {
        Self {
            volatility: dec!(0.1),
            network_congestion: dec!(0.2),
            competition_level: dec!(0.3),
        }
    }
}

impl MarketConditions {
    /// Clamp every score into [0, 1]
    pub fn clamped(self) -> Self {
        let clamp = |v: Decimal| v.max(Decimal::ZERO).min(Decimal::ONE);
        Self {
            volatility: clamp(self.volatility),
            network_congestion: clamp(self.network_congestion),
            competition_level: clamp(self.competition_level),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedDepth {
    depth: Decimal,
    observed_at: Instant,
}

/// Estimated pool depth per directed pair, expiring after a TTL
#[derive(Debug)]
pub struct LiquidityCache {
    ttl: Duration,
    entries: RwLock<HashMap<(String, String), CachedDepth>>,
}

impl LiquidityCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, token_in: &str, token_out: &str) -> Option<Decimal> {
        let entries = self.entries.read();
        entries
            .get(&(token_in.to_string(), token_out.to_string()))
            .filter(|entry| entry.observed_at.elapsed() < self.ttl)
            .map(|entry| entry.depth)
    }

    pub fn insert(&self, token_in: &str, token_out: &str, depth: Decimal) {
        self.entries.write().insert(
            (token_in.to_string(), token_out.to_string()),
            CachedDepth {
                depth,
                observed_at: Instant::now(),
            },
        );
    }

    /// Drop expired entries
    pub fn prune(&self) {
        let ttl = self.ttl;
        self.entries
            .write()
            .retain(|_, entry| entry.observed_at.elapsed() < ttl);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_and_direction() {
        let cache = LiquidityCache::new(Duration::from_secs(60));
        cache.insert("GALA", "GUSDC", dec!(5000));

        assert_eq!(cache.get("GALA", "GUSDC"), Some(dec!(5000)));
        assert_eq!(cache.get("GUSDC", "GALA"), None);
    }

    #[test]
    fn test_cache_expiry() {
        let cache = LiquidityCache::new(Duration::from_millis(0));
        cache.insert("GALA", "GUSDC", dec!(5000));

        assert_eq!(cache.get("GALA", "GUSDC"), None);
        cache.prune();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_conditions_clamped() {
        let conditions = MarketConditions {
            volatility: dec!(1.5),
            network_congestion: dec!(-0.2),
            competition_level: dec!(0.4),
        }
        .clamped();
        assert_eq!(conditions.volatility, Decimal::ONE);
        assert_eq!(conditions.network_congestion, Decimal::ZERO);
        assert_eq!(conditions.competition_level, dec!(0.4));
    }
}
