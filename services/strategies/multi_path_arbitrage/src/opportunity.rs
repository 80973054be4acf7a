//! Multi-path opportunities: profit, priority, executability and ranking

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use types::{current_timestamp_ns, percent_of, NANOS_PER_SECOND};

use crate::config::MultiPathConfig;
use crate::domain::{
    CompetitiveRisk, ExecutionComplexity, ExecutionRisk, Hop, PathType, RiskLevel, TradingPath,
};
use crate::path_optimizer::{OptimizedPath, PathRisk, RollbackPlan};
use crate::stats::PathPerformance;

/// Attempts needed before history moves priority
const HISTORY_MIN_ATTEMPTS: u64 = 3;
const HISTORY_NUDGE: Decimal = dec!(0.5);

/// A viable, re-quoted path ready to be ranked and possibly executed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPathOpportunity {
    pub id: String,
    pub path: TradingPath,
    /// Re-quoted at the exact amounts; `amount_in` chains from the previous output
    pub hops: Vec<Hop>,
    pub input_amount: Decimal,
    pub expected_output: Decimal,
    pub gross_profit: Decimal,
    /// Gross profit minus gas, in the starting token
    pub net_profit: Decimal,
    pub net_profit_percent: Decimal,
    /// Reported compound slippage (percent, capped)
    pub compound_slippage: Decimal,
    /// Uncapped compound slippage checked against the ceiling (percent)
    pub raw_compound_slippage: Decimal,
    pub total_gas: Decimal,
    pub path_risk: PathRisk,
    pub hop_risks: Vec<ExecutionRisk>,
    pub execution_complexity: ExecutionComplexity,
    /// 1 (trivial) to 10 (hard to unwind)
    pub rollback_complexity: u8,
    /// 1 to 10
    pub priority: Decimal,
    pub competitive_risk: CompetitiveRisk,
    pub is_viable: bool,
    pub viability_reasons: Vec<String>,
    pub rollback_plan: RollbackPlan,
    pub created_at_ns: u64,
    pub expires_at_ns: u64,
}

/// The four independent checks behind `is_executable`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executability {
    pub profit_ok: bool,
    pub slippage_ok: bool,
    pub risk_ok: bool,
    pub viable: bool,
}

impl Executability {
    pub fn is_executable(&self) -> bool {
        self.profit_ok && self.slippage_ok && self.risk_ok && self.viable
    }

    pub fn failed_checks(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if !self.profit_ok {
            failed.push("profit below minimum");
        }
        if !self.slippage_ok {
            failed.push("compound slippage above ceiling");
        }
        if !self.risk_ok {
            failed.push("extreme path risk");
        }
        if !self.viable {
            failed.push("path not viable");
        }
        failed
    }
}

impl MultiPathOpportunity {
    /// Build from an optimized path whose hops have been re-quoted
    pub fn from_optimized(
        optimized: OptimizedPath,
        history: Option<&PathPerformance>,
        config: &MultiPathConfig,
    ) -> Self {
        let input = optimized.input_amount;
        let expected_output = optimized
            .hops
            .last()
            .map(|h| h.expected_amount_out)
            .unwrap_or(Decimal::ZERO);
        let gross_profit = expected_output - input;
        let net_profit = gross_profit - optimized.total_gas;
        let net_profit_percent = percent_of(net_profit, input);

        let hop_risks: Vec<ExecutionRisk> =
            optimized.analyses.iter().map(|a| a.execution_risk).collect();
        let execution_complexity = execution_complexity(
            optimized.path.path_type(),
            &hop_risks,
            optimized.path_risk.level,
        );
        let rollback_complexity =
            rollback_complexity(optimized.path.hop_count(), optimized.path_risk.level);
        let priority = apply_history(
            calculate_priority(
                net_profit_percent,
                optimized.path_risk.level,
                execution_complexity,
            ),
            history,
        );

        let created_at_ns = current_timestamp_ns();
        let expires_at_ns =
            created_at_ns + config.scan.opportunity_ttl_secs * NANOS_PER_SECOND;

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            competitive_risk: competitive_risk(net_profit_percent),
            path: optimized.path,
            hops: optimized.hops,
            input_amount: input,
            expected_output,
            gross_profit,
            net_profit,
            net_profit_percent,
            compound_slippage: optimized.compound_slippage,
            raw_compound_slippage: optimized.raw_compound_slippage,
            total_gas: optimized.total_gas,
            path_risk: optimized.path_risk,
            hop_risks,
            execution_complexity,
            rollback_complexity,
            priority,
            is_viable: optimized.is_viable,
            viability_reasons: optimized.viability_reasons,
            rollback_plan: optimized.rollback_plan,
            created_at_ns,
            expires_at_ns,
        }
    }

    /// Recomputed from stored inputs against the given thresholds
    pub fn executability(&self, config: &MultiPathConfig) -> Executability {
        Executability {
            profit_ok: self.net_profit_percent >= config.scan.min_profit_percent,
            slippage_ok: self.raw_compound_slippage <= config.optimizer.max_total_slippage,
            risk_ok: self.path_risk.level != RiskLevel::Extreme,
            viable: self.is_viable,
        }
    }

    pub fn is_executable(&self, config: &MultiPathConfig) -> bool {
        self.executability(config).is_executable()
    }

    pub fn is_expired_at(&self, now_ns: u64) -> bool {
        now_ns >= self.expires_at_ns
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ns())
    }

    pub fn path_name(&self) -> String {
        self.path.name()
    }
}

/// Priority in [1, 10] from profit, risk tier and execution complexity
pub fn calculate_priority(
    net_profit_percent: Decimal,
    risk: RiskLevel,
    complexity: ExecutionComplexity,
) -> Decimal {
    let risk_factor = match risk {
        RiskLevel::Low => dec!(1.0),
        RiskLevel::Medium => dec!(0.8),
        RiskLevel::High | RiskLevel::Extreme => dec!(0.6),
    };
    let complexity_factor = match complexity {
        ExecutionComplexity::Moderate => dec!(1.0),
        ExecutionComplexity::High => dec!(0.9),
        ExecutionComplexity::Extreme => dec!(0.7),
    };
    clamp_priority(net_profit_percent.min(dec!(10)) * risk_factor * complexity_factor)
}

/// Nudge priority by the path's track record once it has enough attempts
pub fn apply_history(priority: Decimal, history: Option<&PathPerformance>) -> Decimal {
    let Some(perf) = history.filter(|p| p.attempts >= HISTORY_MIN_ATTEMPTS) else {
        return priority;
    };
    let nudged = if perf.success_rate >= dec!(0.7) {
        priority + HISTORY_NUDGE
    } else if perf.success_rate <= dec!(0.3) {
        priority - HISTORY_NUDGE
    } else {
        priority
    };
    clamp_priority(nudged)
}

fn clamp_priority(priority: Decimal) -> Decimal {
    priority.max(Decimal::ONE).min(dec!(10))
}

pub fn competitive_risk(net_profit_percent: Decimal) -> CompetitiveRisk {
    if net_profit_percent > dec!(5) {
        CompetitiveRisk::High
    } else if net_profit_percent > dec!(2) {
        CompetitiveRisk::Medium
    } else {
        CompetitiveRisk::Low
    }
}

pub fn execution_complexity(
    path_type: PathType,
    hop_risks: &[ExecutionRisk],
    path_risk: RiskLevel,
) -> ExecutionComplexity {
    if path_risk >= RiskLevel::High || hop_risks.contains(&ExecutionRisk::High) {
        return ExecutionComplexity::Extreme;
    }
    match path_type {
        PathType::Triangular => ExecutionComplexity::Moderate,
        PathType::Quadrangular => ExecutionComplexity::High,
    }
}

pub fn rollback_complexity(hop_count: usize, path_risk: RiskLevel) -> u8 {
    let bump = match path_risk {
        RiskLevel::Low => 0,
        RiskLevel::Medium => 1,
        RiskLevel::High => 3,
        RiskLevel::Extreme => 5,
    };
    (hop_count + bump).clamp(1, 10) as u8
}

/// Net profit percent descending, then lower path risk, then easier rollback
pub fn rank(opportunities: &mut [MultiPathOpportunity]) {
    opportunities.sort_by(|a, b| {
        b.net_profit_percent
            .cmp(&a.net_profit_percent)
            .then_with(|| a.path_risk.level.cmp(&b.path_risk.level))
            .then_with(|| a.rollback_complexity.cmp(&b.rollback_complexity))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_optimizer::evaluate;
    use crate::path_optimizer::test_support::{analysis, calm};

    fn opportunity(output: Decimal) -> MultiPathOpportunity {
        let config = MultiPathConfig::default();
        let path = TradingPath::new(&["GALA", "GUSDC", "GWETH"]).unwrap();
        let mut analyses = vec![
            analysis("GALA", "GUSDC", dec!(100), dec!(0.3)),
            analysis("GUSDC", "GWETH", dec!(100), dec!(0.3)),
            analysis("GWETH", "GALA", dec!(100), dec!(0.3)),
        ];
        analyses[2].expected_amount_out = output;
        let optimized = evaluate(&path, dec!(100), analyses, &calm(), &config);
        MultiPathOpportunity::from_optimized(optimized, None, &config)
    }

    #[test]
    fn test_profit_accounting() {
        let opp = opportunity(dec!(102));
        assert_eq!(opp.gross_profit, dec!(2));
        assert_eq!(opp.net_profit, dec!(1.97));
        assert_eq!(opp.net_profit_percent, dec!(1.97));
        assert_eq!(opp.competitive_risk, CompetitiveRisk::Low);
        assert_eq!(opp.execution_complexity, ExecutionComplexity::Moderate);
        assert_eq!(opp.rollback_complexity, 3);
        assert!(opp.is_executable(&MultiPathConfig::default()));
    }

    #[test]
    fn test_executability_checks_are_independent() {
        let config = MultiPathConfig::default();
        let opp = opportunity(dec!(100.2));
        let checks = opp.executability(&config);
        assert!(!checks.profit_ok);
        assert!(checks.slippage_ok);
        assert!(checks.risk_ok);
        assert!(checks.viable);
        assert_eq!(checks.failed_checks(), vec!["profit below minimum"]);
    }

    #[test]
    fn test_expiration_boundary() {
        let opp = opportunity(dec!(102));
        assert_eq!(
            opp.expires_at_ns - opp.created_at_ns,
            300 * NANOS_PER_SECOND
        );
        assert!(!opp.is_expired_at(opp.expires_at_ns - 1));
        assert!(opp.is_expired_at(opp.expires_at_ns));
    }

    #[test]
    fn test_priority_factors_and_clamp() {
        assert_eq!(
            calculate_priority(dec!(4), RiskLevel::Low, ExecutionComplexity::Moderate),
            dec!(4)
        );
        assert_eq!(
            calculate_priority(dec!(5), RiskLevel::Medium, ExecutionComplexity::High),
            dec!(3.6)
        );
        assert_eq!(
            calculate_priority(dec!(50), RiskLevel::Low, ExecutionComplexity::Moderate),
            dec!(10)
        );
        assert_eq!(
            calculate_priority(dec!(0.2), RiskLevel::High, ExecutionComplexity::Extreme),
            Decimal::ONE
        );
    }

    #[test]
    fn test_history_nudge_requires_attempts() {
        let mut perf = PathPerformance {
            attempts: 2,
            successes: 2,
            success_rate: Decimal::ONE,
            ..Default::default()
        };
        assert_eq!(apply_history(dec!(4), Some(&perf)), dec!(4));

        perf.attempts = 4;
        assert_eq!(apply_history(dec!(4), Some(&perf)), dec!(4.5));

        perf.success_rate = dec!(0.25);
        assert_eq!(apply_history(dec!(4), Some(&perf)), dec!(3.5));
    }

    #[test]
    fn test_competitive_risk_thresholds() {
        assert_eq!(competitive_risk(dec!(2)), CompetitiveRisk::Low);
        assert_eq!(competitive_risk(dec!(2.1)), CompetitiveRisk::Medium);
        assert_eq!(competitive_risk(dec!(5.1)), CompetitiveRisk::High);
    }

    #[test]
    fn test_execution_complexity_rules() {
        use ExecutionRisk::*;
        assert_eq!(
            execution_complexity(PathType::Quadrangular, &[Low, Low, Low, Low], RiskLevel::Low),
            ExecutionComplexity::High
        );
        assert_eq!(
            execution_complexity(PathType::Triangular, &[Low, High, Low], RiskLevel::Low),
            ExecutionComplexity::Extreme
        );
        assert_eq!(
            execution_complexity(PathType::Triangular, &[Low, Low, Low], RiskLevel::High),
            ExecutionComplexity::Extreme
        );
    }

    #[test]
    fn test_rank_orders_by_profit_then_risk() {
        let mut a = opportunity(dec!(101));
        let mut b = opportunity(dec!(103));
        let mut c = opportunity(dec!(103));
        c.path_risk.level = RiskLevel::Medium;
        b.rollback_complexity = 3;
        a.rollback_complexity = 3;

        let mut list = vec![a.clone(), c.clone(), b.clone()];
        rank(&mut list);

        assert_eq!(list[0].id, b.id);
        assert_eq!(list[1].id, c.id);
        assert_eq!(list[2].id, a.id);
    }
}
