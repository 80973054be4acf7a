//! Strategy traits and interfaces

use anyhow::Result;
use async_trait::async_trait;

/// Core strategy trait that all trading strategies must implement
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Strategy name for identification
    fn name(&self) -> &'static str;

    /// Start the strategy
    async fn start(&mut self) -> Result<()>;

    /// Stop the strategy
    async fn stop(&mut self) -> Result<()>;

    /// Get current strategy metrics
    fn metrics(&self) -> StrategyMetrics;
}

/// Basic strategy metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyMetrics {
    pub scans_completed: u64,
    pub opportunities_found: u64,
    pub executions_attempted: u64,
    pub executions_succeeded: u64,
    pub rollbacks_triggered: u64,
    pub errors: u64,
}

/// Strategy configuration trait
pub trait StrategyConfig: Send + Sync + Clone {
    /// Validate configuration
    fn validate(&self) -> Result<()>;
}
