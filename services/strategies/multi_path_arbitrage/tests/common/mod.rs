//! Shared fixtures for integration tests

#![allow(dead_code)]

use multi_path_arbitrage::hop_analyzer::HopAnalyzer;
use multi_path_arbitrage::market::LiquidityCache;
use multi_path_arbitrage::path_optimizer::PathOptimizer;
use multi_path_arbitrage::{
    ExecutionRisk, FeeTier, HopAnalysis, MarketConditions, MultiPathConfig, OpportunityAnalyzer,
    PathEvaluation, MultiPathOpportunity, SimulatedMarket, StatsTracker, TradingPath,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

/// Hop analysis with a 1:1 rate, low risk and depth 50× the amount
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

/// One analysis per hop of `path`, each with the given slippage
pub fn analyses_for(
    path: &TradingPath,
    amount: Decimal,
    slippages: &[Decimal],
) -> Vec<HopAnalysis> {
    path.hop_pairs()
        .zip(slippages)
        .map(|((a, b), s)| analysis(a, b, amount, *s))
        .collect()
}

pub fn calm() -> MarketConditions {
    MarketConditions {
        volatility: dec!(0.05),
        network_congestion: dec!(0.1),
        competition_level: dec!(0.1),
    }
}

pub fn analyzer(market: Arc<SimulatedMarket>) -> OpportunityAnalyzer {
    let cache = Arc::new(LiquidityCache::new(Duration::from_secs(60)));
    let optimizer = Arc::new(PathOptimizer::new(HopAnalyzer::new(market.clone(), cache)));
    OpportunityAnalyzer::new(optimizer, market)
}

/// Opportunity for GALA→GUSDC→GWETH→GALA priced against the default pool book
pub async fn seeded_opportunity(
    config: &MultiPathConfig,
) -> (MultiPathOpportunity, Arc<SimulatedMarket>) {
    let market = Arc::new(SimulatedMarket::from_config(&config.simulation));
    let path = TradingPath::new(&["GALA", "GUSDC", "GWETH"]).unwrap();
    let evaluation = analyzer(market.clone())
        .evaluate_path(&path, &MarketConditions::default(), config, &StatsTracker::new())
        .await;
    match evaluation {
        PathEvaluation::Opportunity(opp) => (*opp, market),
        other => panic!("seeded path should be an opportunity, got {:?}", other),
    }
}
