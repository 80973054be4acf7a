//! # Opportunity Analyzer
//!
//! ## Purpose
//!
//! Turns the current path set into ranked opportunities. Each enabled path is
//! sized by its starting token, optimized, and only if viable re-quoted hop by
//! hop at the exact chained amounts before profit is computed.
//!
//! ## Architecture Role
//!
//! ```text
//! PathRegistry → [OpportunityAnalyzer::scan] → ScanReport → ExecutionCoordinator
//!                     ↓ per path, concurrently
//!           PathOptimizer → re-quote (QuoteGateway) → MultiPathOpportunity
//! ```
//!
//! Paths share no mutable state during a scan, so they are evaluated
//! concurrently. A path whose route disappears or that fails thresholds is
//! counted in the report and skipped; it never aborts the scan.

use futures::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use types::current_timestamp_ns;

use crate::config::MultiPathConfig;
use crate::domain::{PathType, TradingPath};
use crate::error::{ArbitrageError, Result};
use crate::gateway::QuoteGateway;
use crate::market::MarketConditions;
use crate::opportunity::{rank, MultiPathOpportunity};
use crate::path_generator::PathSet;
use crate::path_optimizer::{OptimizedPath, PathOptimizer};
use crate::stats::StatsTracker;
use crate::{log_profit, log_search};

/// Outcome of evaluating one path during a scan
#[derive(Debug, Clone)]
pub enum PathEvaluation {
    Opportunity(Box<MultiPathOpportunity>),
    RouteUnavailable { path_name: String, reason: String },
    Rejected { path_name: String, reasons: Vec<String> },
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Ranked best first; includes viable opportunities that are not executable
    pub opportunities: Vec<MultiPathOpportunity>,
    pub paths_evaluated: usize,
    pub route_failures: usize,
    pub rejected: usize,
    pub scanned_at_ns: u64,
    pub duration: Duration,
}

impl ScanReport {
    /// Top-ranked opportunity that is executable and unexpired at `now_ns`
    pub fn select_for_execution(
        &self,
        config: &MultiPathConfig,
        now_ns: u64,
    ) -> Option<&MultiPathOpportunity> {
        self.opportunities
            .iter()
            .find(|opp| opp.is_executable(config) && !opp.is_expired_at(now_ns))
    }

    pub fn executable_count(&self, config: &MultiPathConfig) -> usize {
        self.opportunities
            .iter()
            .filter(|opp| opp.is_executable(config))
            .count()
    }
}

pub struct OpportunityAnalyzer {
    optimizer: Arc<PathOptimizer>,
    gateway: Arc<dyn QuoteGateway>,
}

impl OpportunityAnalyzer {
    pub fn new(optimizer: Arc<PathOptimizer>, gateway: Arc<dyn QuoteGateway>) -> Self {
        Self { optimizer, gateway }
    }

    pub fn optimizer(&self) -> &Arc<PathOptimizer> {
        &self.optimizer
    }

    /// Stable start ⇒ stable size, other primary ⇒ primary size, else intermediate size
    pub fn position_size(path: &TradingPath, config: &MultiPathConfig) -> Decimal {
        let start = path.start_token();
        let universe = &config.universe;
        if universe.anchors.iter().any(|t| t == start) {
            config.scan.stable_position_size
        } else if universe.primary.iter().any(|t| t == start) {
            config.scan.primary_position_size
        } else {
            config.scan.intermediate_position_size
        }
    }

    pub async fn scan(
        &self,
        paths: &PathSet,
        conditions: &MarketConditions,
        config: &MultiPathConfig,
        stats: &StatsTracker,
    ) -> ScanReport {
        let started = Instant::now();

        let mut enabled: Vec<&TradingPath> = Vec::new();
        if config.scan.enable_triangular {
            enabled.extend(paths.of_type(PathType::Triangular));
        }
        if config.scan.enable_quadrangular {
            enabled.extend(paths.of_type(PathType::Quadrangular));
        }

        let evaluations = join_all(
            enabled
                .iter()
                .map(|path| self.evaluate_path(path, conditions, config, stats)),
        )
        .await;

        let mut report = ScanReport {
            paths_evaluated: enabled.len(),
            scanned_at_ns: current_timestamp_ns(),
            ..Default::default()
        };
        for evaluation in evaluations {
            match evaluation {
                PathEvaluation::Opportunity(opp) => report.opportunities.push(*opp),
                PathEvaluation::RouteUnavailable { path_name, reason } => {
                    debug!(path = %path_name, "route unavailable: {}", reason);
                    report.route_failures += 1;
                }
                PathEvaluation::Rejected { path_name, reasons } => {
                    debug!(path = %path_name, "rejected: {}", reasons.join("; "));
                    report.rejected += 1;
                }
            }
        }
        rank(&mut report.opportunities);
        report.duration = started.elapsed();

        log_search!(
            "Scanned {} paths in {:?}: {} opportunities ({} executable), {} no-route, {} rejected",
            report.paths_evaluated,
            report.duration,
            report.opportunities.len(),
            report.executable_count(config),
            report.route_failures,
            report.rejected
        );
        if let Some(best) = report.opportunities.first() {
            log_profit!(
                "Best: {} net {:.4}% (priority {:.1}, risk {})",
                best.path_name(),
                best.net_profit_percent,
                best.priority,
                best.path_risk.level
            );
        }

        report
    }

    pub async fn evaluate_path(
        &self,
        path: &TradingPath,
        conditions: &MarketConditions,
        config: &MultiPathConfig,
        stats: &StatsTracker,
    ) -> PathEvaluation {
        let input = Self::position_size(path, config);
        let mut optimized = self
            .optimizer
            .optimize_path(path, input, conditions, config)
            .await;

        if let Some(failure) = &optimized.failure {
            return PathEvaluation::RouteUnavailable {
                path_name: path.name(),
                reason: failure.to_string(),
            };
        }
        if !optimized.is_viable {
            return PathEvaluation::Rejected {
                path_name: path.name(),
                reasons: optimized.viability_reasons,
            };
        }

        if let Err(e) = self.realize_hops(&mut optimized, config).await {
            return PathEvaluation::RouteUnavailable {
                path_name: path.name(),
                reason: e.to_string(),
            };
        }

        let history = stats.path_performance(&path.name());
        PathEvaluation::Opportunity(Box::new(MultiPathOpportunity::from_optimized(
            optimized,
            history.as_ref(),
            config,
        )))
    }

    /// Re-quote each hop at its exact chained amount with the chosen fee tier
    pub async fn realize_hops(
        &self,
        optimized: &mut OptimizedPath,
        config: &MultiPathConfig,
    ) -> Result<()> {
        let precision = &config.universe.precision;
        let mut amount = precision.quantize(optimized.path.start_token(), optimized.input_amount);

        for (index, hop) in optimized.hops.iter_mut().enumerate() {
            let quote = self
                .gateway
                .quote(&hop.token_in, &hop.token_out, amount, Some(hop.fee_tier))
                .await
                .map_err(|e| ArbitrageError::RouteUnavailable {
                    hop_index: index,
                    token_in: hop.token_in.clone(),
                    token_out: hop.token_out.clone(),
                    reason: e.to_string(),
                })?;
            let expected = precision.quantize(&hop.token_out, quote.amount_out);
            if expected <= Decimal::ZERO {
                return Err(ArbitrageError::RouteUnavailable {
                    hop_index: index,
                    token_in: hop.token_in.clone(),
                    token_out: hop.token_out.clone(),
                    reason: "re-quote returned no output".to_string(),
                });
            }

            let keep = Decimal::ONE - hop.slippage_tolerance / Decimal::from(100);
            hop.amount_in = amount;
            hop.expected_amount_out = expected;
            hop.min_amount_out = precision.quantize(&hop.token_out, expected * keep);
            amount = expected;
        }

        optimized.expected_output = amount;
        Ok(())
    }
}
