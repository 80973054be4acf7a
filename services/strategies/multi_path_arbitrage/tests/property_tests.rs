//! Multi-Path Arbitrage Property Tests
//!
//! Mathematical properties of slippage compounding, viability checks and
//! rollback planning that must hold for any hop configuration.

mod common;

use multi_path_arbitrage::path_optimizer::{
    assess_path_risk, compound_slippage, evaluate, viability, RollbackPlan,
};
use multi_path_arbitrage::{MultiPathConfig, RiskLevel, TradingPath};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// Property test strategies
prop_compose! {
    /// Per-hop slippage between 0% and 10% in 0.01% steps
    fn hop_slippage()
        (hundredths in 0u32..=1000u32) -> Decimal {
        Decimal::from(hundredths) / dec!(100)
    }
}

prop_compose! {
    fn slippage_vector()
        (slippages in prop::collection::vec(hop_slippage(), 3..=4)) -> Vec<Decimal> {
        slippages
    }
}

prop_compose! {
    fn trading_path()
        (quadrangular in any::<bool>()) -> TradingPath {
        if quadrangular {
            TradingPath::new(&["GALA", "GUSDC", "GWETH", "SILK"]).unwrap()
        } else {
            TradingPath::new(&["GALA", "GUSDC", "GWETH"]).unwrap()
        }
    }
}

proptest! {
    /// Property: compound slippage never exceeds the plain sum of hop slippages
    #[test]
    fn compound_slippage_bounded_by_sum(slippages in slippage_vector()) {
        let compound = compound_slippage(&slippages);
        let sum: Decimal = slippages.iter().sum();

        prop_assert!(compound <= sum,
            "compound {} exceeds sum {}", compound, sum);
    }

    /// Property: compound slippage is at least the worst single hop
    #[test]
    fn compound_slippage_at_least_worst_hop(slippages in slippage_vector()) {
        let compound = compound_slippage(&slippages);
        let worst = slippages.iter().copied().max().unwrap_or(Decimal::ZERO);

        prop_assert!(compound >= worst,
            "compound {} below worst hop {}", compound, worst);
        prop_assert!(compound < dec!(100));
    }

    /// Property: more slippage on any hop never turns a rejected path viable
    #[test]
    fn added_slippage_never_improves_viability(
        slippages in prop::collection::vec(hop_slippage(), 3..=3),
        hop in 0usize..3,
        bump in hop_slippage(),
    ) {
        let config = MultiPathConfig::default();
        let path = TradingPath::new(&["GALA", "GUSDC", "GWETH"]).unwrap();
        let amount = dec!(100);

        let before = common::analyses_for(&path, amount, &slippages);
        let risk = assess_path_risk(&before, amount, &common::calm(), &config);
        let (viable_before, _) =
            viability(&before, compound_slippage(&slippages), amount, &risk, &config);

        let mut worse = slippages.clone();
        worse[hop] += bump;
        let after = common::analyses_for(&path, amount, &worse);
        let risk_after = assess_path_risk(&after, amount, &common::calm(), &config);
        let (viable_after, _) =
            viability(&after, compound_slippage(&worse), amount, &risk_after, &config);

        prop_assert!(!viable_after || viable_before,
            "slippage {:?} viable but {:?} was not", worse, slippages);
    }

    /// Property: more price impact on any hop never turns a rejected path viable
    #[test]
    fn added_price_impact_never_improves_viability(
        impact_hundredths in 0u32..=500u32,
        hop in 0usize..3,
        bump_hundredths in 0u32..=500u32,
    ) {
        let config = MultiPathConfig::default();
        let path = TradingPath::new(&["GALA", "GUSDC", "GWETH"]).unwrap();
        let amount = dec!(100);
        let slippages = [dec!(0.5), dec!(0.5), dec!(0.5)];
        let compound = compound_slippage(&slippages);

        let mut before = common::analyses_for(&path, amount, &slippages);
        before[hop].price_impact = Decimal::from(impact_hundredths) / dec!(100);
        let risk = assess_path_risk(&before, amount, &common::calm(), &config);
        let (viable_before, _) = viability(&before, compound, amount, &risk, &config);

        let mut after = before.clone();
        after[hop].price_impact += Decimal::from(bump_hundredths) / dec!(100);
        let (viable_after, _) = viability(&after, compound, amount, &risk, &config);

        prop_assert!(!viable_after || viable_before);
    }

    /// Property: a hop shallower than the liquidity floor always rejects the path
    #[test]
    fn depth_below_minimum_is_never_viable(
        slippages in prop::collection::vec(hop_slippage(), 3..=3),
        hop in 0usize..3,
        depth in 0u32..1000u32,
    ) {
        let config = MultiPathConfig::default();
        let path = TradingPath::new(&["GALA", "GUSDC", "GWETH"]).unwrap();
        let amount = dec!(100);

        let mut analyses = common::analyses_for(&path, amount, &slippages);
        analyses[hop].liquidity_depth = Decimal::from(depth);
        let optimized = evaluate(&path, amount, analyses, &common::calm(), &config);

        prop_assert!(!optimized.is_viable);
        let has_liquidity_reason = optimized
            .viability_reasons
            .iter()
            .any(|r| {
                r.starts_with(&format!("hop {} ", hop + 1)) && r.contains("insufficient liquidity")
            });
        prop_assert!(has_liquidity_reason);
    }

    /// Property: reported compound slippage never exceeds the configured ceiling
    #[test]
    fn reported_compound_slippage_is_capped(
        path in trading_path(),
        slippages in prop::collection::vec(hop_slippage(), 4..=4),
    ) {
        let config = MultiPathConfig::default();
        let amount = dec!(100);
        let analyses = common::analyses_for(&path, amount, &slippages[..path.hop_count()]);
        let optimized = evaluate(&path, amount, analyses, &common::calm(), &config);

        prop_assert!(optimized.compound_slippage <= config.optimizer.max_total_slippage);
        prop_assert!(optimized.compound_slippage <= optimized.raw_compound_slippage);
    }

    /// Property: rolling back after k hops reverses exactly hops k-1..0
    #[test]
    fn rollback_reverses_executed_hops_in_order(
        path in trading_path(),
        executed_fraction in 0usize..=4,
    ) {
        let config = MultiPathConfig::default();
        let amount = dec!(100);
        let slippages = vec![dec!(0.5); path.hop_count()];
        let analyses = common::analyses_for(&path, amount, &slippages);
        let optimized = evaluate(&path, amount, analyses, &common::calm(), &config);
        let executed = executed_fraction.min(path.hop_count());

        let plan = RollbackPlan::build(&optimized.hops, RiskLevel::Low, &config)
            .for_executed(executed);

        prop_assert_eq!(plan.reverse_hops.len(), executed);
        for (step, reverse) in plan.reverse_hops.iter().enumerate() {
            let forward = &optimized.hops[executed - 1 - step];
            prop_assert_eq!(reverse.forward_hop_index, executed - 1 - step);
            prop_assert_eq!(&reverse.token_in, &forward.token_out);
            prop_assert_eq!(&reverse.token_out, &forward.token_in);
            prop_assert_eq!(reverse.fee_tier, forward.fee_tier);
        }
        prop_assert_eq!(
            plan.estimated_cost,
            config.optimizer.gas_cost_per_hop * Decimal::from(executed)
        );
    }
}

#[cfg(test)]
mod known_values {
    use super::*;

    #[test]
    fn test_three_hop_compound_slippage() {
        let compound = compound_slippage(&[dec!(0.5), dec!(0.3), dec!(0.8)]);
        assert_eq!(compound.round_dp(6), dec!(1.592112));
    }

    #[test]
    fn test_no_hops_means_no_slippage() {
        assert_eq!(compound_slippage(&[]), Decimal::ZERO);
    }
}
