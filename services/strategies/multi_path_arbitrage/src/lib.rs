//! # Multi-Path Arbitrage Strategy
//!
//! ## Purpose
//!
//! Discovers closed triangular (A→B→C→A) and quadrangular (A→B→C→D→A) token
//! loops on a pool-based exchange, prices them hop by hop under modelled
//! slippage and risk, and executes the best one as a sequence of separate
//! swaps. The exchange has no atomic multi-swap, so a path that halts part-way
//! is unwound by a rollback plan.
//!
//! ## Integration Points
//!
//! - **Quote Gateway** ([`QuoteGateway`]): pricing for probes, hop analysis and re-quotes
//! - **Swap Executor** ([`SwapExecutor`]): submits one swap and awaits settlement
//! - **Configuration** ([`MultiPathConfig`]): TOML/JSON file, `MULTIPATH_*` env overrides,
//!   runtime partial updates
//!
//! ## Architecture Role
//!
//! ```text
//! PathGenerator → PathRegistry → OpportunityAnalyzer → ExecutionCoordinator
//!                                     ↓                      ↓
//!                        PathOptimizer / HopAnalyzer    RollbackPlan
//!                                     ↓                      ↓
//!                               QuoteGateway            SwapExecutor
//! ```
//!
//! [`MultiPathArbitrageStrategy`] wires these together and runs the periodic scan
//! loop. [`SimulatedMarket`] implements both gateways over an in-memory pool book
//! for paper trading and tests.

pub mod analyzer;
pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod hop_analyzer;
pub mod logging;
pub mod market;
pub mod opportunity;
pub mod path_generator;
pub mod path_optimizer;
pub mod simulation;
pub mod stats;
pub mod strategy;

pub use analyzer::{OpportunityAnalyzer, PathEvaluation, ScanReport};
pub use config::{ConfigUpdate, MultiPathConfig};
pub use domain::{
    ExecutionComplexity, ExecutionRisk, FeeTier, Hop, PathType, RiskLevel, RollbackStrategy,
    TradingPath, Urgency,
};
pub use error::{ArbitrageError, QuoteError, SwapError};
pub use executor::{ExecutionCoordinator, ExecutionReport, ExecutionState, StrandedPosition};
pub use gateway::{Quote, QuoteGateway, SwapExecutor, SwapOutcome, SwapRequest};
pub use hop_analyzer::{AlternativeRoute, HopAnalysis, HopAnalyzer};
pub use market::{LiquidityCache, MarketConditions};
pub use opportunity::{Executability, MultiPathOpportunity};
pub use path_generator::{PathGenerator, PathRegistry, PathSet, TokenUniverse};
pub use path_optimizer::{compound_slippage, OptimizedPath, PathOptimizer, PathRisk, RollbackPlan};
pub use simulation::SimulatedMarket;
pub use stats::{PathPerformance, StatsTracker, StrategyStats};
pub use strategy::MultiPathArbitrageStrategy;
