//! Strategy metrics collection

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe metrics collector for strategies
#[derive(Debug)]
pub struct MetricsCollector {
    scans_completed: AtomicU64,
    opportunities_found: AtomicU64,
    executions_attempted: AtomicU64,
    executions_succeeded: AtomicU64,
    rollbacks_triggered: AtomicU64,
    errors: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            scans_completed: AtomicU64::new(0),
            opportunities_found: AtomicU64::new(0),
            executions_attempted: AtomicU64::new(0),
            executions_succeeded: AtomicU64::new(0),
            rollbacks_triggered: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn increment_scans(&self) {
        self.scans_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_opportunities(&self, count: u64) {
        self.opportunities_found.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_executions(&self) {
        self.executions_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_successes(&self) {
        self.executions_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rollbacks(&self) {
        self.rollbacks_triggered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self) -> super::StrategyMetrics {
        super::StrategyMetrics {
            scans_completed: self.scans_completed.load(Ordering::Relaxed),
            opportunities_found: self.opportunities_found.load(Ordering::Relaxed),
            executions_attempted: self.executions_attempted.load(Ordering::Relaxed),
            executions_succeeded: self.executions_succeeded.load(Ordering::Relaxed),
            rollbacks_triggered: self.rollbacks_triggered.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let collector = MetricsCollector::new();
        collector.increment_scans();
        collector.increment_scans();
        collector.add_opportunities(3);
        collector.increment_executions();
        collector.increment_rollbacks();

        let metrics = collector.get_metrics();
        assert_eq!(metrics.scans_completed, 2);
        assert_eq!(metrics.opportunities_found, 3);
        assert_eq!(metrics.executions_attempted, 1);
        assert_eq!(metrics.executions_succeeded, 0);
        assert_eq!(metrics.rollbacks_triggered, 1);
    }
}
