//! # Path Optimizer
//!
//! ## Purpose
//!
//! Composes per-hop analyses across a whole loop: chains hop inputs from the
//! previous hop's expected output, compounds slippage multiplicatively, sums gas
//! and price impact, scores overall path risk, decides viability and prepares the
//! rollback plan used if execution halts part-way.
//!
//! ## Integration Points
//!
//! - **Input**: `TradingPath` + input amount from the opportunity analyzer
//! - **Dependencies**: [`HopAnalyzer`] (one call per hop, sequential since each
//!   hop is sized from the previous output)
//! - **Output**: [`OptimizedPath`], always fully populated. Route failures are
//!   carried in `failure`, threshold failures in `viability_reasons`.
//!
//! ## Slippage Accounting
//!
//! Compound slippage is `1 − Π(1 − sᵢ)`, never the sum. Two values are kept:
//! `raw_compound_slippage` from uncapped per-hop estimates, which is what the
//! viability ceiling is checked against, and `compound_slippage` built from the
//! capped per-hop estimates and itself capped at `max_total_slippage` for
//! reporting.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::{fraction_to_percent, percent_to_fraction};

use crate::config::MultiPathConfig;
use crate::domain::{FeeTier, Hop, RiskLevel, RollbackStrategy, TradingPath};
use crate::error::ArbitrageError;
use crate::hop_analyzer::{liquidity_bucket, HopAnalysis, HopAnalyzer};
use crate::market::MarketConditions;

/// Overall risk assessment for a path; component scores are in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRisk {
    pub level: RiskLevel,
    pub score: Decimal,
    pub liquidity_risk: Decimal,
    pub execution_risk: Decimal,
    pub competitive_risk: Decimal,
    pub technical_risk: Decimal,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
}

impl PathRisk {
    pub fn extreme(factor: String) -> Self {
        Self {
            level: RiskLevel::Extreme,
            score: Decimal::ONE,
            liquidity_risk: Decimal::ONE,
            execution_risk: Decimal::ONE,
            competitive_risk: Decimal::ONE,
            technical_risk: Decimal::ONE,
            factors: vec![factor],
            recommendations: vec!["do not execute".to_string()],
        }
    }
}

/// One compensating swap, undoing forward hop `forward_hop_index`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackHop {
    pub forward_hop_index: usize,
    pub token_in: String,
    pub token_out: String,
    pub fee_tier: FeeTier,
    /// Percent
    pub slippage_tolerance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackPlan {
    pub strategy: RollbackStrategy,
    /// Reverse order: the last forward hop is undone first
    pub reverse_hops: Vec<RollbackHop>,
    pub cost_per_hop: Decimal,
    pub estimated_cost: Decimal,
    pub success_probability: Decimal,
    pub mitigations: Vec<String>,
}

impl RollbackPlan {
    pub fn build(hops: &[Hop], risk: RiskLevel, config: &MultiPathConfig) -> Self {
        let rollback = &config.rollback;
        let strategy = if risk == RiskLevel::Extreme {
            RollbackStrategy::Manual
        } else {
            rollback.strategy
        };
        let success_probability = match risk {
            RiskLevel::Extreme => rollback.extreme_risk_success_probability,
            RiskLevel::High => rollback.high_risk_success_probability,
            _ => rollback.baseline_success_probability,
        };

        let reverse_hops: Vec<RollbackHop> = hops
            .iter()
            .enumerate()
            .rev()
            .map(|(index, hop)| RollbackHop {
                forward_hop_index: index,
                token_in: hop.token_out.clone(),
                token_out: hop.token_in.clone(),
                fee_tier: hop.fee_tier,
                slippage_tolerance: rollback.slippage_tolerance,
            })
            .collect();

        let mut mitigations = vec![format!(
            "reverse swaps accept up to {}% slippage",
            rollback.slippage_tolerance
        )];
        match strategy {
            RollbackStrategy::Manual => {
                mitigations.push("operator must unwind the stranded position".to_string())
            }
            RollbackStrategy::Delayed => mitigations.push(format!(
                "reverse swaps wait {}ms for prices to settle",
                rollback.delay_ms
            )),
            RollbackStrategy::Immediate => {}
        }

        let cost_per_hop = config.optimizer.gas_cost_per_hop;
        Self {
            strategy,
            estimated_cost: cost_per_hop * Decimal::from(reverse_hops.len()),
            reverse_hops,
            cost_per_hop,
            success_probability,
            mitigations,
        }
    }

    /// Plan restricted to the first `executed` forward hops
    pub fn for_executed(&self, executed: usize) -> Self {
        let reverse_hops: Vec<RollbackHop> = self
            .reverse_hops
            .iter()
            .filter(|hop| hop.forward_hop_index < executed)
            .cloned()
            .collect();
        Self {
            strategy: self.strategy,
            estimated_cost: self.cost_per_hop * Decimal::from(reverse_hops.len()),
            reverse_hops,
            cost_per_hop: self.cost_per_hop,
            success_probability: self.success_probability,
            mitigations: self.mitigations.clone(),
        }
    }

    /// Plan left once the first `completed` reverse swaps have landed
    pub fn after_reversed(&self, completed: usize) -> Self {
        let reverse_hops: Vec<RollbackHop> =
            self.reverse_hops.iter().skip(completed).cloned().collect();
        Self {
            strategy: self.strategy,
            estimated_cost: self.cost_per_hop * Decimal::from(reverse_hops.len()),
            reverse_hops,
            cost_per_hop: self.cost_per_hop,
            success_probability: self.success_probability,
            mitigations: self.mitigations.clone(),
        }
    }

    fn manual_empty() -> Self {
        Self {
            strategy: RollbackStrategy::Manual,
            reverse_hops: Vec::new(),
            cost_per_hop: Decimal::ZERO,
            estimated_cost: Decimal::ZERO,
            success_probability: Decimal::ZERO,
            mitigations: vec!["nothing to unwind before the first hop".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedPath {
    pub path: TradingPath,
    pub input_amount: Decimal,
    pub hops: Vec<Hop>,
    pub analyses: Vec<HopAnalysis>,
    pub expected_output: Decimal,
    /// Reported compound slippage, capped at `max_total_slippage` (percent)
    pub compound_slippage: Decimal,
    /// Compound of uncapped per-hop estimates (percent)
    pub raw_compound_slippage: Decimal,
    pub total_gas: Decimal,
    /// Sum of per-hop price impact (percent)
    pub total_price_impact: Decimal,
    pub path_risk: PathRisk,
    pub is_viable: bool,
    pub viability_reasons: Vec<String>,
    pub rollback_plan: RollbackPlan,
    #[serde(skip)]
    pub failure: Option<ArbitrageError>,
}

impl OptimizedPath {
    /// Fully populated result for a path that could not be optimized
    pub fn failed(path: TradingPath, input_amount: Decimal, error: ArbitrageError) -> Self {
        let reason = error.to_string();
        Self {
            path,
            input_amount,
            hops: Vec::new(),
            analyses: Vec::new(),
            expected_output: Decimal::ZERO,
            compound_slippage: Decimal::ZERO,
            raw_compound_slippage: Decimal::ZERO,
            total_gas: Decimal::ZERO,
            total_price_impact: Decimal::ZERO,
            path_risk: PathRisk::extreme(reason.clone()),
            is_viable: false,
            viability_reasons: vec![reason],
            rollback_plan: RollbackPlan::manual_empty(),
            failure: Some(error),
        }
    }

    pub fn is_route_failure(&self) -> bool {
        matches!(self.failure, Some(ArbitrageError::RouteUnavailable { .. }))
    }
}

/// `1 − Π(1 − sᵢ)` over percent slippages, returned in percent
pub fn compound_slippage(slippages: &[Decimal]) -> Decimal {
    let retained = slippages
        .iter()
        .map(|s| Decimal::ONE - percent_to_fraction(*s))
        .fold(Decimal::ONE, |acc, keep| acc * keep);
    fraction_to_percent(Decimal::ONE - retained)
}

/// Hop depth converted into units of the path's starting token
pub fn depth_in_start_units(analysis: &HopAnalysis, input_amount: Decimal) -> Decimal {
    if analysis.amount_in <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    analysis.liquidity_depth * input_amount / analysis.amount_in
}

pub fn assess_path_risk(
    analyses: &[HopAnalysis],
    input_amount: Decimal,
    conditions: &MarketConditions,
    config: &MultiPathConfig,
) -> PathRisk {
    let risk = &config.risk_model;
    let unit = |v: Decimal| v.max(Decimal::ZERO).min(Decimal::ONE);
    let hop_count = Decimal::from(analyses.len().max(1));

    let mut factors = Vec::new();
    let mut recommendations = Vec::new();

    let shortfalls: Vec<&HopAnalysis> = analyses
        .iter()
        .filter(|a| depth_in_start_units(a, input_amount) < config.optimizer.min_liquidity_per_hop)
        .collect();
    let liquidity_risk = if shortfalls.is_empty() {
        analyses
            .iter()
            .map(|a| liquidity_bucket(config, a.size_ratio()))
            .max()
            .unwrap_or(Decimal::ZERO)
    } else {
        for a in &shortfalls {
            factors.push(format!("liquidity shortfall on {}", a.pair_label()));
        }
        Decimal::ONE
    };

    let execution_risk =
        unit(analyses.iter().map(|a| a.risk_score).sum::<Decimal>() / hop_count);
    let competitive_risk = unit(conditions.competition_level);

    let extra_hops = Decimal::from(analyses.len().saturating_sub(3));
    let technical_risk = unit(
        risk.technical_base
            + conditions.network_congestion * risk.technical_congestion_weight
            + extra_hops * risk.technical_per_extra_hop,
    );

    let score = (liquidity_risk + execution_risk + competitive_risk + technical_risk) / dec!(4);
    let level = if score >= risk.path_extreme_threshold {
        RiskLevel::Extreme
    } else if score >= risk.path_high_threshold {
        RiskLevel::High
    } else if score >= risk.path_medium_threshold {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    if execution_risk >= risk.hop_medium_threshold {
        factors.push("elevated per-hop execution risk".to_string());
    }
    if competitive_risk >= dec!(0.5) {
        factors.push("heavy competition for the same routes".to_string());
        recommendations.push("enable protective bidding".to_string());
    }
    if conditions.network_congestion >= dec!(0.5) {
        factors.push("network congestion".to_string());
    }
    if analyses.len() > 3 {
        factors.push(format!("{}-hop path", analyses.len()));
    }

    match level {
        RiskLevel::Extreme => recommendations.push("do not execute".to_string()),
        RiskLevel::High => {
            recommendations.push("prepare rollback".to_string());
            recommendations.push("reduce position size".to_string());
        }
        RiskLevel::Medium => recommendations.push("prepare rollback".to_string()),
        RiskLevel::Low => {}
    }

    PathRisk {
        level,
        score,
        liquidity_risk,
        execution_risk,
        competitive_risk,
        technical_risk,
        factors,
        recommendations,
    }
}

/// Check configured limits; reasons are returned for viable paths too
pub fn viability(
    analyses: &[HopAnalysis],
    raw_compound_slippage: Decimal,
    input_amount: Decimal,
    path_risk: &PathRisk,
    config: &MultiPathConfig,
) -> (bool, Vec<String>) {
    let limits = &config.optimizer;
    let mut failures = Vec::new();

    if raw_compound_slippage > limits.max_total_slippage {
        failures.push(format!(
            "compound slippage {:.4}% exceeds ceiling {}%",
            raw_compound_slippage, limits.max_total_slippage
        ));
    }

    for (index, analysis) in analyses.iter().enumerate() {
        let pair = analysis.pair_label();
        if analysis.raw_slippage > limits.max_slippage_per_hop {
            failures.push(format!(
                "hop {} ({}) slippage {:.4}% exceeds {}%",
                index + 1,
                pair,
                analysis.raw_slippage,
                limits.max_slippage_per_hop
            ));
        }
        if analysis.price_impact > limits.max_price_impact_per_hop {
            failures.push(format!(
                "hop {} ({}) price impact {:.4}% exceeds {}%",
                index + 1,
                pair,
                analysis.price_impact,
                limits.max_price_impact_per_hop
            ));
        }
        let depth = depth_in_start_units(analysis, input_amount);
        if depth < limits.min_liquidity_per_hop {
            failures.push(format!(
                "hop {} ({}) insufficient liquidity: depth {:.4} below minimum {}",
                index + 1,
                pair,
                depth,
                limits.min_liquidity_per_hop
            ));
        }
    }

    if path_risk.level == RiskLevel::Extreme {
        failures.push("path risk is extreme".to_string());
    }

    if failures.is_empty() {
        let reasons = vec![
            format!(
                "compound slippage {:.4}% within {}%",
                raw_compound_slippage, limits.max_total_slippage
            ),
            format!("all {} hops within per-hop limits", analyses.len()),
            format!("path risk {}", path_risk.level),
        ];
        (true, reasons)
    } else {
        (false, failures)
    }
}

/// Assemble an `OptimizedPath` from completed hop analyses
pub fn evaluate(
    path: &TradingPath,
    input_amount: Decimal,
    analyses: Vec<HopAnalysis>,
    conditions: &MarketConditions,
    config: &MultiPathConfig,
) -> OptimizedPath {
    let hops: Vec<Hop> = analyses
        .iter()
        .map(|a| {
            let keep = Decimal::ONE - a.estimated_slippage / dec!(100);
            Hop {
                token_in: a.token_in.clone(),
                token_out: a.token_out.clone(),
                amount_in: a.amount_in,
                expected_amount_out: a.expected_amount_out,
                min_amount_out: config
                    .universe
                    .precision
                    .quantize(&a.token_out, a.expected_amount_out * keep),
                fee_tier: a.optimal_fee_tier,
                slippage_tolerance: a.estimated_slippage,
                pool_liquidity: a.liquidity_depth,
            }
        })
        .collect();

    let raw: Vec<Decimal> = analyses.iter().map(|a| a.raw_slippage).collect();
    let capped: Vec<Decimal> = analyses.iter().map(|a| a.estimated_slippage).collect();
    let raw_compound_slippage = compound_slippage(&raw);
    let compound = compound_slippage(&capped).min(config.optimizer.max_total_slippage);

    let total_gas: Decimal = analyses.iter().map(|a| a.gas_estimate).sum();
    let total_price_impact: Decimal = analyses.iter().map(|a| a.price_impact).sum();
    let expected_output = hops
        .last()
        .map(|h| h.expected_amount_out)
        .unwrap_or(Decimal::ZERO);

    let path_risk = assess_path_risk(&analyses, input_amount, conditions, config);
    let (is_viable, viability_reasons) =
        viability(&analyses, raw_compound_slippage, input_amount, &path_risk, config);
    let rollback_plan = RollbackPlan::build(&hops, path_risk.level, config);

    OptimizedPath {
        path: path.clone(),
        input_amount,
        hops,
        analyses,
        expected_output,
        compound_slippage: compound,
        raw_compound_slippage,
        total_gas,
        total_price_impact,
        path_risk,
        is_viable,
        viability_reasons,
        rollback_plan,
        failure: None,
    }
}

pub struct PathOptimizer {
    hop_analyzer: HopAnalyzer,
}

impl PathOptimizer {
    pub fn new(hop_analyzer: HopAnalyzer) -> Self {
        Self { hop_analyzer }
    }

    pub fn hop_analyzer(&self) -> &HopAnalyzer {
        &self.hop_analyzer
    }

    /// Analyze every hop in order and assemble the result
    ///
    /// Never fails; an unquotable hop yields `OptimizedPath::failed`.
    pub async fn optimize_path(
        &self,
        path: &TradingPath,
        input_amount: Decimal,
        conditions: &MarketConditions,
        config: &MultiPathConfig,
    ) -> OptimizedPath {
        let precision = &config.universe.precision;
        let mut analyses = Vec::with_capacity(path.hop_count());
        let mut amount = precision.quantize(path.start_token(), input_amount);

        for (index, (token_in, token_out)) in path.hop_pairs().enumerate() {
            match self
                .hop_analyzer
                .analyze_hop(index, token_in, token_out, amount, conditions, config)
                .await
            {
                Ok(analysis) => {
                    amount = precision.quantize(token_out, analysis.expected_amount_out);
                    analyses.push(analysis);
                }
                Err(e) => {
                    debug!(path = %path.name(), hop = index, "route unavailable: {}", e);
                    return OptimizedPath::failed(path.clone(), input_amount, e);
                }
            }
        }

        evaluate(path, input_amount, analyses, conditions, config)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::ExecutionRisk;

    /// Synthetic analysis with a 1:1 rate and deep liquidity
    pub fn analysis(
        token_in: &str,
        token_out: &str,
        amount: Decimal,
        slippage: Decimal,
    ) -> HopAnalysis {
        HopAnalysis {
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount_in: amount,
            expected_amount_out: amount,
            optimal_fee_tier: FeeTier::Standard,
            raw_slippage: slippage,
            estimated_slippage: slippage,
            price_impact: dec!(0.2),
            liquidity_depth: amount * dec!(50),
            execution_risk: ExecutionRisk::Low,
            risk_score: dec!(0.1),
            gas_estimate: dec!(0.01),
            alternatives: Vec::new(),
        }
    }

    pub fn calm() -> MarketConditions {
        MarketConditions {
            volatility: dec!(0.05),
            network_congestion: dec!(0.1),
            competition_level: dec!(0.1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{analysis, calm};
    use super::*;

    fn triangle() -> TradingPath {
        TradingPath::new(&["GALA", "GUSDC", "GWETH"]).unwrap()
    }

    #[test]
    fn test_compound_slippage_is_multiplicative() {
        let compound = compound_slippage(&[dec!(0.5), dec!(0.8), dec!(0.3)]);
        // 1 − 0.995 × 0.992 × 0.997
        assert_eq!(compound, dec!(1.592112));
        assert!(compound < dec!(1.6));
    }

    #[test]
    fn test_evaluate_viable_triangle() {
        let config = MultiPathConfig::default();
        let analyses = vec![
            analysis("GALA", "GUSDC", dec!(100), dec!(0.5)),
            analysis("GUSDC", "GWETH", dec!(100), dec!(0.8)),
            analysis("GWETH", "GALA", dec!(100), dec!(0.3)),
        ];

        let optimized = evaluate(&triangle(), dec!(100), analyses, &calm(), &config);

        assert!(optimized.is_viable, "{:?}", optimized.viability_reasons);
        assert!(!optimized.viability_reasons.is_empty());
        assert_eq!(optimized.total_gas, dec!(0.03));
        assert_eq!(optimized.path_risk.level, RiskLevel::Low);
        assert_eq!(optimized.rollback_plan.reverse_hops.len(), 3);
        assert_eq!(optimized.rollback_plan.success_probability, dec!(0.9));
        assert_eq!(optimized.rollback_plan.strategy, RollbackStrategy::Immediate);
        assert_eq!(optimized.hops[0].min_amount_out, dec!(99.5));
    }

    #[test]
    fn test_raw_compound_checked_against_ceiling() {
        let config = MultiPathConfig::default();
        // each hop capped at 2%, raw 3% each
        let pairs = [("GALA", "GUSDC"), ("GUSDC", "GWETH"), ("GWETH", "GALA")];
        let mut analyses: Vec<HopAnalysis> = pairs
            .iter()
            .map(|(a, b)| analysis(a, b, dec!(100), dec!(2.0)))
            .collect();
        for a in &mut analyses {
            a.raw_slippage = dec!(3.0);
        }

        let optimized = evaluate(&triangle(), dec!(100), analyses, &calm(), &config);

        assert!(!optimized.is_viable);
        assert!(optimized.raw_compound_slippage > dec!(5.0));
        assert!(optimized.compound_slippage <= dec!(5.0));
        assert!(optimized
            .viability_reasons
            .iter()
            .any(|r| r.contains("compound slippage")));
    }

    #[test]
    fn test_rollback_plan_reverses_hops() {
        let config = MultiPathConfig::default();
        let analyses = vec![
            analysis("GALA", "GUSDC", dec!(100), dec!(0.5)),
            analysis("GUSDC", "GWETH", dec!(100), dec!(0.5)),
            analysis("GWETH", "GALA", dec!(100), dec!(0.5)),
        ];
        let optimized = evaluate(&triangle(), dec!(100), analyses, &calm(), &config);
        let plan = &optimized.rollback_plan;

        assert_eq!(plan.reverse_hops[0].forward_hop_index, 2);
        assert_eq!(plan.reverse_hops[0].token_in, "GALA");
        assert_eq!(plan.reverse_hops[0].token_out, "GWETH");
        assert_eq!(plan.estimated_cost, dec!(0.03));

        let partial = plan.for_executed(1);
        assert_eq!(partial.reverse_hops.len(), 1);
        assert_eq!(partial.reverse_hops[0].token_in, "GUSDC");
        assert_eq!(partial.reverse_hops[0].token_out, "GALA");
        assert_eq!(partial.estimated_cost, dec!(0.01));
        assert!(plan.for_executed(0).reverse_hops.is_empty());

        let unwinding = plan.for_executed(2).after_reversed(1);
        assert_eq!(unwinding.reverse_hops.len(), 1);
        assert_eq!(unwinding.reverse_hops[0].forward_hop_index, 0);
        assert_eq!(unwinding.estimated_cost, dec!(0.01));
    }

    #[test]
    fn test_extreme_risk_forces_manual_rollback() {
        let config = MultiPathConfig::default();
        let hops = vec![];
        let plan = RollbackPlan::build(&hops, RiskLevel::Extreme, &config);
        assert_eq!(plan.strategy, RollbackStrategy::Manual);
        assert_eq!(plan.success_probability, dec!(0.5));

        let plan = RollbackPlan::build(&hops, RiskLevel::High, &config);
        assert_eq!(plan.strategy, RollbackStrategy::Immediate);
        assert_eq!(plan.success_probability, dec!(0.7));
    }

    #[test]
    fn test_technical_risk_grows_with_length() {
        let config = MultiPathConfig::default();
        let three: Vec<_> = (0..3).map(|_| analysis("A", "B", dec!(100), dec!(0.5))).collect();
        let four: Vec<_> = (0..4).map(|_| analysis("A", "B", dec!(100), dec!(0.5))).collect();

        let r3 = assess_path_risk(&three, dec!(100), &calm(), &config);
        let r4 = assess_path_risk(&four, dec!(100), &calm(), &config);
        assert!(r4.technical_risk > r3.technical_risk);
    }

    #[test]
    fn test_failed_path_is_fully_populated() {
        let error = ArbitrageError::RouteUnavailable {
            hop_index: 1,
            token_in: "GUSDC".to_string(),
            token_out: "GWETH".to_string(),
            reason: "no pool".to_string(),
        };
        let failed = OptimizedPath::failed(triangle(), dec!(100), error);

        assert!(!failed.is_viable);
        assert!(failed.is_route_failure());
        assert_eq!(failed.path_risk.level, RiskLevel::Extreme);
        assert_eq!(failed.rollback_plan.strategy, RollbackStrategy::Manual);
        assert_eq!(failed.expected_output, Decimal::ZERO);
        assert!(failed.viability_reasons[0].contains("GUSDC→GWETH"));
    }
}
