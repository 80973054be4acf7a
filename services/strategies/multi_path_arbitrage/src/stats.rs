//! Execution statistics and per-path performance history
//!
//! The whole aggregate sits behind one mutex so a path's attempts and
//! successes are always updated together.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use types::current_timestamp_ns;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PathPerformance {
    pub path_name: String,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    /// successes / attempts, in [0, 1]
    pub success_rate: Decimal,
    pub total_profit: Decimal,
    /// Running mean of realized profit over successful executions
    pub average_profit: Decimal,
    pub last_attempt_ns: u64,
}

impl PathPerformance {
    fn new(path_name: &str) -> Self {
        Self {
            path_name: path_name.to_string(),
            ..Default::default()
        }
    }

    fn record(&mut self, success: bool, profit: Decimal) {
        self.attempts += 1;
        if success {
            self.successes += 1;
            self.total_profit += profit;
            self.average_profit = self.total_profit / Decimal::from(self.successes);
        } else {
            self.failures += 1;
        }
        self.success_rate = Decimal::from(self.successes) / Decimal::from(self.attempts);
        self.last_attempt_ns = current_timestamp_ns();
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StrategyStats {
    pub scans_completed: u64,
    pub paths_evaluated: u64,
    pub opportunities_found: u64,
    pub executions_attempted: u64,
    pub executions_succeeded: u64,
    pub executions_failed: u64,
    pub rollbacks_attempted: u64,
    pub rollbacks_succeeded: u64,
    pub total_profit: Decimal,
    pub best_profit_percent: Decimal,
    /// Largest realized loss, as a positive amount
    pub worst_loss: Decimal,
    /// Failed executions since the last success; a circuit-breaker input
    pub consecutive_failures: u64,
    pub average_execution_ms: Decimal,
    pub path_performance: HashMap<String, PathPerformance>,
}

impl StrategyStats {
    pub fn success_rate(&self) -> Decimal {
        if self.executions_attempted == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.executions_succeeded) / Decimal::from(self.executions_attempted)
    }

    fn record_elapsed(&mut self, elapsed: Duration) {
        let ms = Decimal::from(elapsed.as_millis() as u64);
        let n = Decimal::from(self.executions_attempted);
        self.average_execution_ms += (ms - self.average_execution_ms) / n;
    }
}

/// Outcome of a failed execution as seen by the statistics table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailureRecord {
    /// Positive amount lost in the starting token, when it could be measured
    pub loss: Option<Decimal>,
    pub rollback_attempted: bool,
    pub rollback_succeeded: bool,
}

#[derive(Debug, Default)]
pub struct StatsTracker {
    inner: Mutex<StrategyStats>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_scan(&self, paths_evaluated: usize, opportunities_found: usize) {
        let mut stats = self.inner.lock();
        stats.scans_completed += 1;
        stats.paths_evaluated += paths_evaluated as u64;
        stats.opportunities_found += opportunities_found as u64;
    }

    pub fn record_success(
        &self,
        path_name: &str,
        profit: Decimal,
        profit_percent: Decimal,
        elapsed: Duration,
    ) {
        let mut stats = self.inner.lock();
        stats.executions_attempted += 1;
        stats.executions_succeeded += 1;
        stats.consecutive_failures = 0;
        stats.total_profit += profit;
        if profit_percent > stats.best_profit_percent {
            stats.best_profit_percent = profit_percent;
        }
        stats.record_elapsed(elapsed);
        stats
            .path_performance
            .entry(path_name.to_string())
            .or_insert_with(|| PathPerformance::new(path_name))
            .record(true, profit);
    }

    pub fn record_failure(&self, path_name: &str, failure: FailureRecord, elapsed: Duration) {
        let mut stats = self.inner.lock();
        stats.executions_attempted += 1;
        stats.executions_failed += 1;
        stats.consecutive_failures += 1;
        if failure.rollback_attempted {
            stats.rollbacks_attempted += 1;
        }
        if failure.rollback_succeeded {
            stats.rollbacks_succeeded += 1;
        }
        if let Some(loss) = failure.loss {
            stats.total_profit -= loss;
            if loss > stats.worst_loss {
                stats.worst_loss = loss;
            }
        }
        stats.record_elapsed(elapsed);
        stats
            .path_performance
            .entry(path_name.to_string())
            .or_insert_with(|| PathPerformance::new(path_name))
            .record(false, Decimal::ZERO);
    }

    /// A pending manual rollback that was later resolved
    pub fn record_manual_rollback(&self, succeeded: bool) {
        let mut stats = self.inner.lock();
        stats.rollbacks_attempted += 1;
        if succeeded {
            stats.rollbacks_succeeded += 1;
        }
    }

    pub fn snapshot(&self) -> StrategyStats {
        self.inner.lock().clone()
    }

    pub fn path_performance(&self, path_name: &str) -> Option<PathPerformance> {
        self.inner.lock().path_performance.get(path_name).cloned()
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.inner.lock().consecutive_failures
    }

    pub fn reset(&self) {
        *self.inner.lock() = StrategyStats::default();
    }
}
