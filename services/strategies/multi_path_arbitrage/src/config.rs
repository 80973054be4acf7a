//! # Multi-Path Arbitrage Configuration
//!
//! ## Purpose
//!
//! Runtime parameter control for path generation, hop analysis, risk scoring,
//! rollback and scanning. Supports TOML/JSON file loading, environment variable
//! overrides, validation and partial runtime updates via [`ConfigUpdate`].
//!
//! ## Conventions
//!
//! - Percent fields use 1.5 == 1.5%
//! - Risk scores and weights are in [0, 1]
//! - Amounts (position sizes, gas, liquidity) are in token units; gas and position
//!   sizes are denominated in the path's starting token
//!
//! Every heuristic constant (slippage bonuses, risk weights, rollback success
//! probabilities, liquidity depth multiplier) is a default here rather than a
//! hardcoded truth.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use types::TokenPrecision;

use crate::domain::{FeeTier, RollbackStrategy};
use crate::error::{ArbitrageError, Result};

/// Complete configuration for the multi-path arbitrage strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MultiPathConfig {
    pub optimizer: OptimizerConfig,
    pub slippage_model: SlippageModelConfig,
    pub risk_model: RiskModelConfig,
    pub rollback: RollbackConfig,
    pub scan: ScanConfig,
    pub universe: UniverseConfig,
    pub simulation: SimulationConfig,
}

/// Viability limits and per-hop cost assumptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Maximum estimated slippage for any single hop (percent)
    pub max_slippage_per_hop: Decimal,
    /// Ceiling for compound slippage across the whole path (percent)
    pub max_total_slippage: Decimal,
    /// Minimum estimated pool depth per hop, in units of the path's starting token
    pub min_liquidity_per_hop: Decimal,
    /// Maximum price impact for any single hop (percent)
    pub max_price_impact_per_hop: Decimal,
    /// Gas cost per hop, in units of the path's starting token
    pub gas_cost_per_hop: Decimal,
    /// Largest successful probe size is multiplied by this to approximate pool depth
    pub liquidity_depth_multiplier: Decimal,
    /// Probe sizes as multiples of the intended amount
    pub liquidity_probe_multipliers: Vec<Decimal>,
    pub liquidity_cache_ttl_secs: u64,
}

/// Deterministic per-hop slippage model (all outputs in percent)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlippageModelConfig {
    pub base_slippage: Decimal,
    /// Added per unit of market volatility (volatility in [0, 1])
    pub volatility_weight: Decimal,
    /// Added per unit of network congestion (congestion in [0, 1])
    pub congestion_weight: Decimal,
    /// Trade size / liquidity ratio above which `medium_size_bonus` applies
    pub medium_size_ratio: Decimal,
    pub medium_size_bonus: Decimal,
    /// Trade size / liquidity ratio above which `large_size_bonus` applies instead
    pub large_size_ratio: Decimal,
    pub large_size_bonus: Decimal,
    /// Added when either side of the pair is not a primary token
    pub exotic_pair_bonus: Decimal,
}

/// Weights and thresholds for hop and path risk scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskModelConfig {
    pub slippage_weight: Decimal,
    pub price_impact_weight: Decimal,
    pub liquidity_weight: Decimal,
    pub market_weight: Decimal,
    /// Hop score at or above which execution risk is Medium
    pub hop_medium_threshold: Decimal,
    /// Hop score at or above which execution risk is High
    pub hop_high_threshold: Decimal,
    pub path_medium_threshold: Decimal,
    pub path_high_threshold: Decimal,
    pub path_extreme_threshold: Decimal,
    pub technical_base: Decimal,
    pub technical_congestion_weight: Decimal,
    /// Technical risk added for every hop beyond 3
    pub technical_per_extra_hop: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollbackConfig {
    /// Strategy used unless the path risk is extreme (extreme always forces manual)
    pub strategy: RollbackStrategy,
    /// Slippage tolerance for reverse swaps (percent)
    pub slippage_tolerance: Decimal,
    /// Pause before reverse swaps under the delayed strategy
    pub delay_ms: u64,
    pub baseline_success_probability: Decimal,
    pub high_risk_success_probability: Decimal,
    pub extreme_risk_success_probability: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Minimum net profit percent for an opportunity to be executable
    pub min_profit_percent: Decimal,
    pub enable_triangular: bool,
    pub enable_quadrangular: bool,
    /// Execute the top-ranked executable opportunity after each scan
    pub auto_execute: bool,
    pub opportunity_ttl_secs: u64,
    pub scan_interval_ms: u64,
    pub path_refresh_secs: u64,
    /// Amount used for liveness probes during path generation
    pub probe_amount: Decimal,
    /// Position size when the path starts from an anchor (stable) token
    pub stable_position_size: Decimal,
    /// Position size when the path starts from a non-anchor primary token
    pub primary_position_size: Decimal,
    /// Position size when the path starts from an intermediate token
    pub intermediate_position_size: Decimal,
    pub wallet_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    /// Major tokens; every path must contain one
    pub primary: Vec<String>,
    /// Satellite tokens
    pub intermediate: Vec<String>,
    /// Stable tokens used for position sizing and the quadrangular quality rule
    pub anchors: Vec<String>,
    /// Tokens considered for enumeration, primaries first
    pub max_universe_size: usize,
    /// Known-good loops used when generation yields nothing
    pub fallback_paths: Vec<Vec<String>>,
    pub precision: TokenPrecision,
}

/// Paper-trading pool book used by the binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub pools: Vec<PoolSeed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSeed {
    pub token_a: String,
    pub token_b: String,
    pub reserve_a: Decimal,
    pub reserve_b: Decimal,
    pub fee_tier: FeeTier,
}

/// Partial runtime update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    pub max_slippage_per_hop: Option<Decimal>,
    pub max_total_slippage: Option<Decimal>,
    pub min_liquidity_per_hop: Option<Decimal>,
    pub max_price_impact_per_hop: Option<Decimal>,
    pub min_profit_percent: Option<Decimal>,
    pub rollback_strategy: Option<RollbackStrategy>,
    pub enable_triangular: Option<bool>,
    pub enable_quadrangular: Option<bool>,
    pub auto_execute: Option<bool>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_slippage_per_hop: dec!(2.0),
            max_total_slippage: dec!(5.0),
            min_liquidity_per_hop: dec!(1000),
            max_price_impact_per_hop: dec!(3.0),
            gas_cost_per_hop: dec!(0.01),
            liquidity_depth_multiplier: dec!(10),
            liquidity_probe_multipliers: vec![dec!(1), dec!(2), dec!(5)],
            liquidity_cache_ttl_secs: 60,
        }
    }
}

impl Default for SlippageModelConfig {
    fn default() -> Self {
        Self {
            base_slippage: dec!(0.1),
            volatility_weight: dec!(1.0),
            congestion_weight: dec!(0.5),
            medium_size_ratio: dec!(0.05),
            medium_size_bonus: dec!(0.3),
            large_size_ratio: dec!(0.10),
            large_size_bonus: dec!(0.6),
            exotic_pair_bonus: dec!(0.2),
        }
    }
}

impl Default for RiskModelConfig {
    fn default() -> Self {
        Self {
            slippage_weight: dec!(0.35),
            price_impact_weight: dec!(0.25),
            liquidity_weight: dec!(0.25),
            market_weight: dec!(0.15),
            hop_medium_threshold: dec!(0.3),
            hop_high_threshold: dec!(0.6),
            path_medium_threshold: dec!(0.3),
            path_high_threshold: dec!(0.5),
            path_extreme_threshold: dec!(0.7),
            technical_base: dec!(0.1),
            technical_congestion_weight: dec!(0.5),
            technical_per_extra_hop: dec!(0.15),
        }
    }
}

impl Default for RollbackConfig {
    fn default() -> Self {
        Self {
            strategy: RollbackStrategy::Immediate,
            slippage_tolerance: dec!(5.0),
            delay_ms: 2_000,
            baseline_success_probability: dec!(0.9),
            high_risk_success_probability: dec!(0.7),
            extreme_risk_success_probability: dec!(0.5),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_profit_percent: dec!(0.5),
            enable_triangular: true,
            enable_quadrangular: true,
            auto_execute: true,
            opportunity_ttl_secs: 300, // 5 minutes
            scan_interval_ms: 30_000,
            path_refresh_secs: 600,
            probe_amount: dec!(1),
            stable_position_size: dec!(100),
            primary_position_size: dec!(50),
            intermediate_position_size: dec!(20),
            wallet_address: "client|multipath-arbitrage".to_string(),
        }
    }
}

impl Default for UniverseConfig {
    fn default() -> Self {
        let owned = |tokens: &[&str]| tokens.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        Self {
            primary: owned(&["GALA", "GUSDC", "GUSDT", "GWETH"]),
            intermediate: owned(&["GWBTC", "ETIME", "SILK", "TOWN"]),
            anchors: owned(&["GUSDC", "GUSDT"]),
            max_universe_size: 8,
            fallback_paths: vec![
                owned(&["GALA", "GUSDC", "GWETH"]),
                owned(&["GALA", "GUSDT", "GUSDC"]),
                owned(&["GUSDC", "GWETH", "GALA"]),
            ],
            precision: TokenPrecision::default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let seed = |a: &str, b: &str, ra: Decimal, rb: Decimal, fee_tier| PoolSeed {
            token_a: a.to_string(),
            token_b: b.to_string(),
            reserve_a: ra,
            reserve_b: rb,
            fee_tier,
        };
        // GWETH is ~1.5% rich in GALA terms relative to the GUSDC legs
        Self {
            pools: vec![
                seed("GALA", "GUSDC", dec!(2_000_000), dec!(50_000), FeeTier::Standard),
                seed("GUSDC", "GWETH", dec!(400_000), dec!(160), FeeTier::Stable),
                seed("GWETH", "GALA", dec!(50), dec!(5_075_000), FeeTier::Standard),
                seed("GALA", "GUSDT", dec!(2_000_000), dec!(50_100), FeeTier::Standard),
                seed("GUSDT", "GUSDC", dec!(500_000), dec!(500_000), FeeTier::Stable),
                seed("GALA", "SILK", dec!(300_000), dec!(900_000), FeeTier::Volatile),
                seed("SILK", "GUSDC", dec!(400_000), dec!(3_300), FeeTier::Volatile),
            ],
        }
    }
}

impl MultiPathConfig {
    /// Load configuration from a JSON file
    pub fn from_json_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Load from TOML or JSON depending on the file extension
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        if path.ends_with(".json") {
            Self::from_json_file(path)
        } else {
            torq_strategy_shared::load_config(path)
        }
    }

    /// Save configuration to a JSON file
    pub fn save_to_file(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Apply `MULTIPATH_*` environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(value) = env_decimal("MULTIPATH_MIN_PROFIT_PCT") {
            self.scan.min_profit_percent = value;
        }
        if let Some(value) = env_decimal("MULTIPATH_MAX_TOTAL_SLIPPAGE") {
            self.optimizer.max_total_slippage = value;
        }
        if let Some(value) = env_decimal("MULTIPATH_MAX_HOP_SLIPPAGE") {
            self.optimizer.max_slippage_per_hop = value;
        }
        if let Ok(value) = std::env::var("MULTIPATH_ENABLE_TRIANGULAR") {
            self.scan.enable_triangular = value.to_lowercase() == "true";
        }
        if let Ok(value) = std::env::var("MULTIPATH_ENABLE_QUADRANGULAR") {
            self.scan.enable_quadrangular = value.to_lowercase() == "true";
        }
        if let Ok(value) = std::env::var("MULTIPATH_SCAN_INTERVAL_MS") {
            if let Ok(ms) = value.parse::<u64>() {
                self.scan.scan_interval_ms = ms;
            }
        }
        if let Ok(wallet) = std::env::var("MULTIPATH_WALLET_ADDRESS") {
            self.scan.wallet_address = wallet;
        }
        self
    }

    /// Load defaults plus environment overrides
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply a partial update, keeping the old config if the result is invalid
    pub fn apply_update(&mut self, update: &ConfigUpdate) -> Result<()> {
        let mut next = self.clone();
        if let Some(v) = update.max_slippage_per_hop {
            next.optimizer.max_slippage_per_hop = v;
        }
        if let Some(v) = update.max_total_slippage {
            next.optimizer.max_total_slippage = v;
        }
        if let Some(v) = update.min_liquidity_per_hop {
            next.optimizer.min_liquidity_per_hop = v;
        }
        if let Some(v) = update.max_price_impact_per_hop {
            next.optimizer.max_price_impact_per_hop = v;
        }
        if let Some(v) = update.min_profit_percent {
            next.scan.min_profit_percent = v;
        }
        if let Some(v) = update.rollback_strategy {
            next.rollback.strategy = v;
        }
        if let Some(v) = update.enable_triangular {
            next.scan.enable_triangular = v;
        }
        if let Some(v) = update.enable_quadrangular {
            next.scan.enable_quadrangular = v;
        }
        if let Some(v) = update.auto_execute {
            next.scan.auto_execute = v;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let opt = &self.optimizer;
        ensure_percent("max_slippage_per_hop", opt.max_slippage_per_hop)?;
        ensure_percent("max_total_slippage", opt.max_total_slippage)?;
        ensure_percent("max_price_impact_per_hop", opt.max_price_impact_per_hop)?;
        if opt.min_liquidity_per_hop < Decimal::ZERO {
            return invalid("min_liquidity_per_hop must be non-negative");
        }
        if opt.gas_cost_per_hop < Decimal::ZERO {
            return invalid("gas_cost_per_hop must be non-negative");
        }
        if opt.liquidity_depth_multiplier <= Decimal::ZERO {
            return invalid("liquidity_depth_multiplier must be positive");
        }
        if opt.liquidity_probe_multipliers.is_empty()
            || opt
                .liquidity_probe_multipliers
                .iter()
                .any(|m| *m <= Decimal::ZERO)
        {
            return invalid("liquidity_probe_multipliers must be non-empty and positive");
        }

        let slip = &self.slippage_model;
        if slip.medium_size_ratio > slip.large_size_ratio {
            return invalid("medium_size_ratio must not exceed large_size_ratio");
        }

        let risk = &self.risk_model;
        let weights = risk.slippage_weight
            + risk.price_impact_weight
            + risk.liquidity_weight
            + risk.market_weight;
        if weights <= Decimal::ZERO {
            return invalid("risk model weights must sum to a positive value");
        }
        if !(risk.hop_medium_threshold < risk.hop_high_threshold) {
            return invalid("hop risk thresholds must be ascending");
        }
        if !(risk.path_medium_threshold < risk.path_high_threshold
            && risk.path_high_threshold < risk.path_extreme_threshold)
        {
            return invalid("path risk thresholds must be ascending");
        }

        let rb = &self.rollback;
        ensure_percent("rollback slippage_tolerance", rb.slippage_tolerance)?;
        for p in [
            rb.baseline_success_probability,
            rb.high_risk_success_probability,
            rb.extreme_risk_success_probability,
        ] {
            if p < Decimal::ZERO || p > Decimal::ONE {
                return invalid("rollback success probabilities must be within [0, 1]");
            }
        }

        let scan = &self.scan;
        if scan.min_profit_percent < Decimal::ZERO {
            return invalid("min_profit_percent must be non-negative");
        }
        if scan.opportunity_ttl_secs == 0 {
            return invalid("opportunity_ttl_secs must be positive");
        }
        if scan.scan_interval_ms == 0 {
            return invalid("scan_interval_ms must be positive");
        }
        for (name, size) in [
            ("probe_amount", scan.probe_amount),
            ("stable_position_size", scan.stable_position_size),
            ("primary_position_size", scan.primary_position_size),
            ("intermediate_position_size", scan.intermediate_position_size),
        ] {
            if size <= Decimal::ZERO {
                return invalid(&format!("{} must be positive", name));
            }
        }
        if scan.wallet_address.is_empty() {
            return invalid("wallet_address is required");
        }

        if self.universe.primary.is_empty() {
            return invalid("universe must contain at least one primary token");
        }
        if self.universe.max_universe_size < 3 {
            return invalid("max_universe_size must be at least 3");
        }
        self.universe.precision.validate()?;

        Ok(())
    }
}

impl torq_strategy_shared::StrategyConfig for MultiPathConfig {
    fn validate(&self) -> anyhow::Result<()> {
        MultiPathConfig::validate(self).map_err(Into::into)
    }
}

fn env_decimal(name: &str) -> Option<Decimal> {
    std::env::var(name)
        .ok()
        .and_then(|value| Decimal::from_str(value.trim()).ok())
}

fn ensure_percent(name: &str, value: Decimal) -> Result<()> {
    if value <= Decimal::ZERO || value > dec!(100) {
        return invalid(&format!("{} must be within (0, 100] percent", name));
    }
    Ok(())
}

fn invalid(reason: &str) -> Result<()> {
    Err(ArbitrageError::InvalidConfig {
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::PrecisionError;

    #[test]
    fn test_default_config_validation() {
        let config = MultiPathConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = MultiPathConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: MultiPathConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_text = r#"
            [scan]
            min_profit_percent = "1.25"
            enable_quadrangular = false

            [rollback]
            strategy = "delayed"
        "#;
        let config: MultiPathConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(config.scan.min_profit_percent, dec!(1.25));
        assert!(!config.scan.enable_quadrangular);
        assert!(config.scan.enable_triangular);
        assert_eq!(config.rollback.strategy, RollbackStrategy::Delayed);
        assert_eq!(config.optimizer, OptimizerConfig::default());
    }

    #[test]
    fn test_apply_update() {
        let mut config = MultiPathConfig::default();
        let update = ConfigUpdate {
            max_total_slippage: Some(dec!(3.0)),
            enable_triangular: Some(false),
            rollback_strategy: Some(RollbackStrategy::Manual),
            ..Default::default()
        };
        config.apply_update(&update).unwrap();
        assert_eq!(config.optimizer.max_total_slippage, dec!(3.0));
        assert!(!config.scan.enable_triangular);
        assert_eq!(config.rollback.strategy, RollbackStrategy::Manual);
    }

    #[test]
    fn test_invalid_update_is_rejected_atomically() {
        let mut config = MultiPathConfig::default();
        let before = config.clone();
        let update = ConfigUpdate {
            min_profit_percent: Some(dec!(2.0)),
            max_slippage_per_hop: Some(dec!(-1)),
            ..Default::default()
        };
        assert!(matches!(
            config.apply_update(&update),
            Err(ArbitrageError::InvalidConfig { .. })
        ));
        assert_eq!(config, before);
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("MULTIPATH_MIN_PROFIT_PCT", "2.50");
        std::env::set_var("MULTIPATH_ENABLE_QUADRANGULAR", "false");

        let config = MultiPathConfig::from_env();

        assert_eq!(config.scan.min_profit_percent, dec!(2.50));
        assert!(!config.scan.enable_quadrangular);

        std::env::remove_var("MULTIPATH_MIN_PROFIT_PCT");
        std::env::remove_var("MULTIPATH_ENABLE_QUADRANGULAR");
    }

    #[test]
    fn test_threshold_ordering_validated() {
        let mut config = MultiPathConfig::default();
        config.risk_model.path_high_threshold = dec!(0.9);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_token_decimals_rejected() {
        let mut config = MultiPathConfig::default();
        config.universe.precision.set_decimals("GWETH", 18);
        assert!(config.validate().is_ok());

        let json = serde_json::to_string(&config)
            .unwrap()
            .replace("\"GWETH\":18", "\"GWETH\":40");
        let parsed: MultiPathConfig = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            parsed.validate(),
            Err(ArbitrageError::Precision(PrecisionError::UnsupportedDecimals {
                decimals: 40,
                ..
            }))
        ));
    }

    #[test]
    fn test_shipped_profile_parses() {
        let config: MultiPathConfig =
            toml::from_str(include_str!("../config/multi_path.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert!(!config.scan.auto_execute);
        assert_eq!(config.universe.precision.decimals_of("GUSDC"), 6);
        assert_eq!(config.universe.precision, TokenPrecision::default());
        assert_eq!(config.simulation, SimulationConfig::default());
    }
}
