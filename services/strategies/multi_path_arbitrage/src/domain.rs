//! Core domain types: paths, hops, fee tiers and risk classifications

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ArbitrageError, Result};

/// Closed-loop shape of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PathType {
    /// A → B → C → A
    Triangular,
    /// A → B → C → D → A
    Quadrangular,
}

impl PathType {
    pub fn hop_count(&self) -> usize {
        match self {
            PathType::Triangular => 3,
            PathType::Quadrangular => 4,
        }
    }

    pub fn from_hop_count(hops: usize) -> Option<Self> {
        match hops {
            3 => Some(PathType::Triangular),
            4 => Some(PathType::Quadrangular),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PathType::Triangular => "triangular",
            PathType::Quadrangular => "quadrangular",
        }
    }
}

impl fmt::Display for PathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable closed loop of 3 or 4 distinct tokens
///
/// Stored closed (`[A, B, C, A]`); `open_tokens()` drops the implicit closing token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradingPath {
    tokens: Vec<String>,
    path_type: PathType,
}

impl TradingPath {
    /// Build from the open token sequence, e.g. `[GALA, GUSDC, GWETH]`
    pub fn new<S: AsRef<str>>(open_tokens: &[S]) -> Result<Self> {
        let path_type = PathType::from_hop_count(open_tokens.len()).ok_or_else(|| {
            ArbitrageError::InvalidPath {
                reason: format!("expected 3 or 4 tokens, got {}", open_tokens.len()),
            }
        })?;

        let mut tokens: Vec<String> = open_tokens
            .iter()
            .map(|t| t.as_ref().to_string())
            .collect();

        for (i, token) in tokens.iter().enumerate() {
            if token.is_empty() {
                return Err(ArbitrageError::InvalidPath {
                    reason: "empty token identifier".to_string(),
                });
            }
            if tokens[..i].contains(token) {
                return Err(ArbitrageError::InvalidPath {
                    reason: format!("token {} appears more than once", token),
                });
            }
        }

        tokens.push(tokens[0].clone());
        Ok(Self { tokens, path_type })
    }

    /// Build from either an open or a closed sequence (`[A, B, C, A]`)
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        let closed = tokens.len() > 1 && tokens.first().map(|t| t.as_ref())
            == tokens.last().map(|t| t.as_ref());
        if closed {
            Self::new(&tokens[..tokens.len() - 1])
        } else {
            Self::new(tokens)
        }
    }

    /// Closed token sequence, first == last
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Token sequence without the closing duplicate
    pub fn open_tokens(&self) -> &[String] {
        &self.tokens[..self.tokens.len() - 1]
    }

    pub fn start_token(&self) -> &str {
        &self.tokens[0]
    }

    pub fn path_type(&self) -> PathType {
        self.path_type
    }

    pub fn hop_count(&self) -> usize {
        self.tokens.len() - 1
    }

    /// `(token_in, token_out)` for every hop in path order
    pub fn hop_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens
            .windows(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
    }

    pub fn contains(&self, token: &str) -> bool {
        self.open_tokens().iter().any(|t| t == token)
    }

    /// Display name used as the key of the path-performance table
    pub fn name(&self) -> String {
        self.tokens.join("→")
    }
}

impl fmt::Display for TradingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.path_type)
    }
}

/// Liquidity-pool fee bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeeTier {
    /// 0.05%, stable pairs
    Stable,
    /// 0.3%, standard pairs
    Standard,
    /// 1%, volatile pairs
    Volatile,
}

impl FeeTier {
    pub const ALL: [FeeTier; 3] = [FeeTier::Stable, FeeTier::Standard, FeeTier::Volatile];

    /// Fee in hundredths of a basis point (500 = 0.05%)
    pub fn pips(&self) -> u32 {
        match self {
            FeeTier::Stable => 500,
            FeeTier::Standard => 3_000,
            FeeTier::Volatile => 10_000,
        }
    }

    /// Fee as a fraction of the input (0.003 for Standard)
    pub fn fee_fraction(&self) -> Decimal {
        Decimal::from(self.pips()) / Decimal::from(1_000_000u32)
    }
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pips())
    }
}

/// One swap edge of a path, regenerated every evaluation
///
/// Percent fields use 1.5 == 1.5%.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hop {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
    pub expected_amount_out: Decimal,
    /// Expected output after the hop's slippage tolerance
    pub min_amount_out: Decimal,
    pub fee_tier: FeeTier,
    /// Slippage tolerance in percent
    pub slippage_tolerance: Decimal,
    /// Estimated pool depth observed when the hop was built
    pub pool_liquidity: Decimal,
}

impl Hop {
    pub fn pair_label(&self) -> String {
        format!("{}→{}", self.token_in, self.token_out)
    }
}

/// Per-hop execution risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExecutionRisk {
    Low,
    Medium,
    High,
}

/// Path-level risk tier; ordering follows severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Extreme => "extreme",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExecutionComplexity {
    Moderate,
    High,
    Extreme,
}

/// Likelihood that competing actors take the same opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CompetitiveRisk {
    Low,
    Medium,
    High,
}

/// How a partially executed path is unwound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackStrategy {
    /// Reverse swaps issued as soon as the forward path halts
    Immediate,
    /// Reverse swaps issued after a configured pause
    Delayed,
    /// No automatic swaps; the stranded position is surfaced to the operator
    Manual,
}

impl fmt::Display for RollbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RollbackStrategy::Immediate => "immediate",
            RollbackStrategy::Delayed => "delayed",
            RollbackStrategy::Manual => "manual",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Urgency {
    Normal,
    High,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_path_closes_loop() {
        let path = TradingPath::new(&["GALA", "GUSDC", "GWETH"]).unwrap();
        assert_eq!(path.tokens(), &["GALA", "GUSDC", "GWETH", "GALA"]);
        assert_eq!(path.open_tokens().len(), 3);
        assert_eq!(path.path_type(), PathType::Triangular);
        assert_eq!(path.name(), "GALA→GUSDC→GWETH→GALA");

        let pairs: Vec<_> = path.hop_pairs().collect();
        assert_eq!(
            pairs,
            vec![("GALA", "GUSDC"), ("GUSDC", "GWETH"), ("GWETH", "GALA")]
        );
    }

    #[test]
    fn test_parse_accepts_closed_sequence() {
        let closed = TradingPath::parse(&["GALA", "GUSDC", "GWETH", "SILK", "GALA"]).unwrap();
        assert_eq!(closed.path_type(), PathType::Quadrangular);
        assert_eq!(closed.hop_count(), 4);

        let open = TradingPath::parse(&["GALA", "GUSDC", "GWETH", "SILK"]).unwrap();
        assert_eq!(closed, open);
    }

    #[test]
    fn test_path_rejects_bad_shapes() {
        assert!(TradingPath::new(&["GALA", "GUSDC"]).is_err());
        assert!(TradingPath::new(&["A", "B", "C", "D", "E"]).is_err());
        assert!(matches!(
            TradingPath::new(&["GALA", "GUSDC", "GALA"]),
            Err(ArbitrageError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_fee_tier_fractions() {
        assert_eq!(FeeTier::Stable.fee_fraction(), dec!(0.0005));
        assert_eq!(FeeTier::Standard.fee_fraction(), dec!(0.003));
        assert_eq!(FeeTier::Volatile.fee_fraction(), dec!(0.01));
    }

    #[test]
    fn test_risk_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::High < RiskLevel::Extreme);
    }
}
