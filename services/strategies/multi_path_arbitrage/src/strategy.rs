//! # Multi-Path Arbitrage Strategy
//!
//! ## Purpose
//!
//! Public façade wiring the generator, analyzer and coordinator together behind
//! injected quote and swap handles. Owns the runtime config, market conditions,
//! the path registry and statistics.
//!
//! ## Scan Cycle
//!
//! ```text
//! refresh paths (if stale) → scan all enabled paths → rank
//!        → execute top executable, unexpired opportunity (at most one)
//! ```
//!
//! A cycle that errors is logged and counted; the periodic loop keeps going.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use torq_strategy_shared::{MetricsCollector, Strategy, StrategyMetrics};
use tracing::{debug, info, warn};
use types::current_timestamp_ns;

use crate::analyzer::{OpportunityAnalyzer, ScanReport};
use crate::config::{ConfigUpdate, MultiPathConfig};
use crate::domain::TradingPath;
use crate::error::ArbitrageError;
use crate::executor::{ExecutionCoordinator, ExecutionReport, ExecutionState, PendingRollback};
use crate::gateway::{QuoteGateway, SwapExecutor};
use crate::hop_analyzer::HopAnalyzer;
use crate::market::{LiquidityCache, MarketConditions};
use crate::opportunity::MultiPathOpportunity;
use crate::path_generator::{PathGenerator, PathRegistry, TokenUniverse};
use crate::path_optimizer::{OptimizedPath, PathOptimizer};
use crate::stats::{StatsTracker, StrategyStats};
use crate::{log_error, log_metrics, log_search};

pub struct MultiPathArbitrageStrategy {
    config: RwLock<MultiPathConfig>,
    conditions: RwLock<MarketConditions>,
    gateway: Arc<dyn QuoteGateway>,
    registry: PathRegistry,
    analyzer: OpportunityAnalyzer,
    coordinator: ExecutionCoordinator,
    stats: Arc<StatsTracker>,
    metrics: MetricsCollector,
    last_scan: RwLock<Option<ScanReport>>,
    running: AtomicBool,
}

impl MultiPathArbitrageStrategy {
    pub fn new(
        config: MultiPathConfig,
        gateway: Arc<dyn QuoteGateway>,
        executor: Arc<dyn SwapExecutor>,
    ) -> std::result::Result<Self, ArbitrageError> {
        config.validate()?;

        let cache = Arc::new(LiquidityCache::new(Duration::from_secs(
            config.optimizer.liquidity_cache_ttl_secs,
        )));
        let optimizer = Arc::new(PathOptimizer::new(HopAnalyzer::new(gateway.clone(), cache)));
        let stats = Arc::new(StatsTracker::new());

        Ok(Self {
            analyzer: OpportunityAnalyzer::new(optimizer, gateway.clone()),
            coordinator: ExecutionCoordinator::new(executor, stats.clone()),
            config: RwLock::new(config),
            conditions: RwLock::new(MarketConditions::default()),
            gateway,
            registry: PathRegistry::new(),
            stats,
            metrics: MetricsCollector::new(),
            last_scan: RwLock::new(None),
            running: AtomicBool::new(false),
        })
    }

    /// Regenerate the path set from the configured universe
    pub async fn refresh_paths(&self) -> usize {
        let config = self.get_config();
        let generator = PathGenerator::new(
            self.gateway.clone(),
            config.scan.probe_amount,
            config.universe.fallback_paths.clone(),
        );
        let paths = generator
            .generate(&TokenUniverse::from_config(&config.universe))
            .await;
        let count = paths.len();
        self.registry.replace(paths);
        self.analyzer.optimizer().hop_analyzer().cache().prune();
        count
    }

    pub fn path_registry(&self) -> &PathRegistry {
        &self.registry
    }

    /// Optimize an arbitrary loop; open (`[A, B, C]`) or closed (`[A, B, C, A]`)
    pub async fn optimize_path<S: AsRef<str>>(
        &self,
        tokens: &[S],
        input_amount: Decimal,
    ) -> std::result::Result<OptimizedPath, ArbitrageError> {
        let path = TradingPath::parse(tokens)?;
        let config = self.get_config();
        let conditions = *self.conditions.read();
        Ok(self
            .analyzer
            .optimizer()
            .optimize_path(&path, input_amount, &conditions, &config)
            .await)
    }

    /// Scan every enabled path and execute at most one opportunity
    ///
    /// Returns all viable opportunities ranked best first.
    pub async fn scan_for_opportunities(&self) -> Vec<MultiPathOpportunity> {
        let config = self.get_config();
        if self
            .registry
            .needs_refresh(Duration::from_secs(config.scan.path_refresh_secs))
        {
            self.refresh_paths().await;
        }

        let paths = self.registry.current();
        let conditions = *self.conditions.read();
        let report = self
            .analyzer
            .scan(&paths, &conditions, &config, &self.stats)
            .await;

        self.stats
            .record_scan(report.paths_evaluated, report.opportunities.len());
        self.metrics.increment_scans();
        self.metrics.add_opportunities(report.opportunities.len() as u64);

        if config.scan.auto_execute {
            self.execute_best(&report, &config).await;
        }

        let opportunities = report.opportunities.clone();
        *self.last_scan.write() = Some(report);
        opportunities
    }

    async fn execute_best(&self, report: &ScanReport, config: &MultiPathConfig) {
        if self.coordinator.is_busy() {
            debug!("Execution slot busy, skipping dispatch this cycle");
            return;
        }
        let Some(best) = report.select_for_execution(config, current_timestamp_ns()) else {
            return;
        };
        if let Err(e) = self.execute_opportunity(best).await {
            warn!("Dispatch of {} refused: {}", best.path_name(), e);
        }
    }

    /// Execute one opportunity through the coordinator
    pub async fn execute_opportunity(
        &self,
        opportunity: &MultiPathOpportunity,
    ) -> std::result::Result<ExecutionReport, ArbitrageError> {
        let config = self.get_config();
        let report = match self.coordinator.execute(opportunity, &config).await {
            Ok(report) => report,
            Err(e) => {
                if !matches!(e, ArbitrageError::ExecutionInFlight { .. }) {
                    self.metrics.increment_errors();
                }
                return Err(e);
            }
        };

        self.metrics.increment_executions();
        if report.is_success() {
            self.metrics.increment_successes();
        }
        if report.rollback_required {
            self.metrics.increment_rollbacks();
        }
        Ok(report)
    }

    pub fn update_config(&self, update: &ConfigUpdate) -> std::result::Result<(), ArbitrageError> {
        let mut config = self.config.write();
        config.apply_update(update)?;
        info!("Configuration updated: {:?}", update);
        Ok(())
    }

    pub fn get_config(&self) -> MultiPathConfig {
        self.config.read().clone()
    }

    pub fn set_market_conditions(&self, conditions: MarketConditions) {
        *self.conditions.write() = conditions.clamped();
    }

    pub fn market_conditions(&self) -> MarketConditions {
        *self.conditions.read()
    }

    pub fn get_stats(&self) -> StrategyStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    pub fn last_scan(&self) -> Option<ScanReport> {
        self.last_scan.read().clone()
    }

    pub fn last_execution(&self) -> Option<ExecutionReport> {
        self.coordinator.last_report()
    }

    pub fn execution_state(&self) -> Option<ExecutionState> {
        self.coordinator.active_state()
    }

    pub fn pending_rollback(&self) -> Option<PendingRollback> {
        self.coordinator.pending_rollback()
    }

    pub fn resolve_manual_rollback(
        &self,
        succeeded: bool,
    ) -> std::result::Result<ExecutionState, ArbitrageError> {
        self.coordinator.resolve_manual_rollback(succeeded)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Periodic scan loop until `shutdown` flips to true or `stop` is called
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        self.running.store(true, Ordering::Relaxed);
        let interval_ms = self.get_config().scan.scan_interval_ms;
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        log_search!("Multi-path scanner started ({}ms interval)", interval_ms);

        while self.is_running() {
            tokio::select! {
                _ = interval.tick() => {
                    let opportunities = self.scan_for_opportunities().await;
                    debug!("Cycle produced {} opportunities", opportunities.len());
                    if let Some(report) = self.last_execution() {
                        if report.state == ExecutionState::RollbackFailed {
                            log_error!("Unresolved exposure: {}", report.summary());
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.running.store(false, Ordering::Relaxed);
        let stats = self.get_stats();
        log_metrics!(
            "Scanner stopped: {} scans, {} executions ({} succeeded), total profit {}",
            stats.scans_completed,
            stats.executions_attempted,
            stats.executions_succeeded,
            stats.total_profit
        );
    }
}

#[async_trait]
impl Strategy for MultiPathArbitrageStrategy {
    fn name(&self) -> &'static str {
        "multi_path_arbitrage"
    }

    async fn start(&mut self) -> Result<()> {
        let paths = self.refresh_paths().await;
        info!("Loaded {} paths", paths);
        self.running.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn metrics(&self) -> StrategyMetrics {
        self.metrics.get_metrics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RollbackStrategy;
    use crate::simulation::SimulatedMarket;
    use rust_decimal_macros::dec;

    fn strategy(config: MultiPathConfig) -> (MultiPathArbitrageStrategy, Arc<SimulatedMarket>) {
        let market = Arc::new(SimulatedMarket::from_config(&config.simulation));
        let strategy =
            MultiPathArbitrageStrategy::new(config, market.clone(), market.clone()).unwrap();
        (strategy, market)
    }

    #[tokio::test]
    async fn test_optimize_path_accepts_closed_tokens() {
        let (strategy, _) = strategy(MultiPathConfig::default());
        let optimized = strategy
            .optimize_path(&["GALA", "GUSDC", "GWETH", "GALA"], dec!(50))
            .await
            .unwrap();
        assert_eq!(optimized.hops.len(), 3);
        assert!(optimized.expected_output > Decimal::ZERO);

        assert!(matches!(
            strategy.optimize_path(&["GALA", "GUSDC"], dec!(50)).await,
            Err(ArbitrageError::InvalidPath { .. })
        ));
    }

    #[tokio::test]
    async fn test_scan_executes_at_most_one() {
        let (strategy, market) = strategy(MultiPathConfig::default());
        let opportunities = strategy.scan_for_opportunities().await;

        // the seeded pools carry a GALA/GUSDC/GWETH mispricing
        assert!(!opportunities.is_empty());
        assert!(opportunities[0].is_executable(&strategy.get_config()));

        let stats = strategy.get_stats();
        assert_eq!(stats.scans_completed, 1);
        assert_eq!(stats.executions_attempted, 1);
        assert_eq!(stats.executions_succeeded, 1);
        assert!(market.executed_swaps().len() <= 4);
        assert_eq!(strategy.metrics().executions_succeeded, 1);
        assert_eq!(
            strategy.last_execution().unwrap().state,
            ExecutionState::Completed
        );
    }

    #[tokio::test]
    async fn test_scan_without_auto_execute_places_no_swaps() {
        let mut config = MultiPathConfig::default();
        config.scan.auto_execute = false;
        let (strategy, market) = strategy(config);

        strategy.scan_for_opportunities().await;
        assert!(market.executed_swaps().is_empty());
        assert!(strategy.last_scan().is_some());
    }

    #[test]
    fn test_update_config_round_trip() {
        let (strategy, _) = strategy(MultiPathConfig::default());
        strategy
            .update_config(&ConfigUpdate {
                rollback_strategy: Some(RollbackStrategy::Delayed),
                min_profit_percent: Some(dec!(1.0)),
                ..Default::default()
            })
            .unwrap();

        let config = strategy.get_config();
        assert_eq!(config.rollback.strategy, RollbackStrategy::Delayed);
        assert_eq!(config.scan.min_profit_percent, dec!(1.0));

        assert!(strategy
            .update_config(&ConfigUpdate {
                max_total_slippage: Some(dec!(0)),
                ..Default::default()
            })
            .is_err());
        assert_eq!(strategy.get_config().scan.min_profit_percent, dec!(1.0));
    }

    #[tokio::test]
    async fn test_reset_stats() {
        let (strategy, _) = strategy(MultiPathConfig::default());
        strategy.scan_for_opportunities().await;
        strategy.reset_stats();
        assert_eq!(strategy.get_stats(), StrategyStats::default());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let mut config = MultiPathConfig::default();
        config.scan.scan_interval_ms = 10;
        config.scan.auto_execute = false;
        let (strategy, _) = strategy(config);
        let strategy = Arc::new(strategy);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(strategy.clone().run(rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(!strategy.is_running());
        assert!(strategy.get_stats().scans_completed >= 1);
    }
}
