//! # Path Generator
//!
//! ## Purpose
//!
//! Enumerates closed triangular (A→B→C→A) and quadrangular (A→B→C→D→A) loops
//! over a bounded token universe, keeps only loops passing the quality filter,
//! and confirms every hop is quotable with a small probe before the loop is
//! handed to the optimizer.
//!
//! ## Architecture Role
//!
//! ```text
//! UniverseConfig → [TokenUniverse] → candidate loops → quality filter
//!                                                       ↓
//!                       QuoteGateway ← pair probes (deduplicated, concurrent)
//!                                                       ↓
//!                                  PathSet → PathRegistry → OpportunityAnalyzer
//! ```
//!
//! A pair is probed once per generation run no matter how many loops use it.
//! When enumeration yields nothing the configured fallback loops are returned
//! instead, unprobed.

use futures::future::join_all;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use types::current_timestamp_ns;

use crate::config::UniverseConfig;
use crate::domain::{PathType, TradingPath};
use crate::gateway::QuoteGateway;
use crate::{log_search, log_warning};

/// Candidate tokens split by role
#[derive(Debug, Clone, PartialEq)]
pub struct TokenUniverse {
    pub primary: Vec<String>,
    pub intermediate: Vec<String>,
    /// Stable tokens; a subset of primary or intermediate in practice
    pub anchors: Vec<String>,
    pub max_size: usize,
}

impl TokenUniverse {
    pub fn from_config(config: &UniverseConfig) -> Self {
        Self {
            primary: config.primary.clone(),
            intermediate: config.intermediate.clone(),
            anchors: config.anchors.clone(),
            max_size: config.max_universe_size,
        }
    }

    pub fn is_primary(&self, token: &str) -> bool {
        self.primary.iter().any(|t| t == token)
    }

    pub fn is_anchor(&self, token: &str) -> bool {
        self.anchors.iter().any(|t| t == token)
    }

    /// Enumeration candidates: primaries first, deduplicated, truncated to `max_size`
    pub fn candidates(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.primary
            .iter()
            .chain(self.intermediate.iter())
            .filter(|t| seen.insert((*t).clone()))
            .take(self.max_size)
            .cloned()
            .collect()
    }

    /// Triangular loops need a primary token; quadrangular loops also need an
    /// anchor or a second primary
    pub fn passes_quality_filter(&self, tokens: &[String]) -> bool {
        let primaries = tokens.iter().filter(|t| self.is_primary(t)).count();
        match tokens.len() {
            3 => primaries >= 1,
            4 => primaries >= 2 || (primaries >= 1 && tokens.iter().any(|t| self.is_anchor(t))),
            _ => false,
        }
    }
}

/// Generated loops split by shape
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathSet {
    pub triangular: Vec<TradingPath>,
    pub quadrangular: Vec<TradingPath>,
    pub generated_at_ns: u64,
    /// True when the set came from configured fallback loops
    pub from_fallback: bool,
}

impl PathSet {
    pub fn len(&self) -> usize {
        self.triangular.len() + self.quadrangular.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn of_type(&self, path_type: PathType) -> &[TradingPath] {
        match path_type {
            PathType::Triangular => &self.triangular,
            PathType::Quadrangular => &self.quadrangular,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TradingPath> {
        self.triangular.iter().chain(self.quadrangular.iter())
    }

    fn push(&mut self, path: TradingPath) {
        match path.path_type() {
            PathType::Triangular => self.triangular.push(path),
            PathType::Quadrangular => self.quadrangular.push(path),
        }
    }
}

pub struct PathGenerator {
    gateway: Arc<dyn QuoteGateway>,
    probe_amount: Decimal,
    fallback: Vec<Vec<String>>,
}

impl PathGenerator {
    pub fn new(
        gateway: Arc<dyn QuoteGateway>,
        probe_amount: Decimal,
        fallback: Vec<Vec<String>>,
    ) -> Self {
        Self {
            gateway,
            probe_amount,
            fallback,
        }
    }

    /// Enumerate, filter and probe loops over `universe`
    ///
    /// Never fails: an empty result is replaced by the fallback loops.
    pub async fn generate(&self, universe: &TokenUniverse) -> PathSet {
        let candidates = universe.candidates();
        if candidates.len() < 3 {
            log_warning!(
                "Token universe has {} candidates, using fallback paths",
                candidates.len()
            );
            return self.fallback_set();
        }

        let loops: Vec<Vec<String>> = enumerate_loops(&candidates, 3)
            .into_iter()
            .chain(enumerate_loops(&candidates, 4))
            .filter(|tokens| universe.passes_quality_filter(tokens))
            .collect();

        let live = self.probe_pairs(&loops).await;

        let mut set = PathSet {
            generated_at_ns: current_timestamp_ns(),
            ..Default::default()
        };
        for tokens in &loops {
            let all_live = closed_pairs(tokens).all(|pair| live.contains(&pair));
            if !all_live {
                continue;
            }
            match TradingPath::new(tokens) {
                Ok(path) => set.push(path),
                Err(e) => debug!("Skipping loop {:?}: {}", tokens, e),
            }
        }

        if set.is_empty() {
            log_warning!("No live paths generated, using fallback paths");
            return self.fallback_set();
        }

        log_search!(
            "Generated {} triangular and {} quadrangular paths from {} tokens",
            set.triangular.len(),
            set.quadrangular.len(),
            candidates.len()
        );
        set
    }

    /// Probe every distinct directed pair once; returns the live pairs
    async fn probe_pairs(&self, loops: &[Vec<String>]) -> HashSet<(String, String)> {
        let pairs: HashSet<(String, String)> = loops
            .iter()
            .flat_map(|tokens| closed_pairs(tokens).collect::<Vec<_>>())
            .collect();

        let probes = pairs.into_iter().map(|(token_in, token_out)| async move {
            let result = self
                .gateway
                .quote(&token_in, &token_out, self.probe_amount, None)
                .await;
            let live = match result {
                Ok(quote) => quote.amount_out > Decimal::ZERO,
                Err(e) => {
                    debug!("Probe {}→{} failed: {}", token_in, token_out, e);
                    false
                }
            };
            (token_in, token_out, live)
        });

        join_all(probes)
            .await
            .into_iter()
            .filter(|(_, _, live)| *live)
            .map(|(token_in, token_out, _)| (token_in, token_out))
            .collect()
    }

    fn fallback_set(&self) -> PathSet {
        let mut set = PathSet {
            generated_at_ns: current_timestamp_ns(),
            from_fallback: true,
            ..Default::default()
        };
        for tokens in &self.fallback {
            match TradingPath::parse(tokens) {
                Ok(path) => set.push(path),
                Err(e) => warn!("Ignoring invalid fallback path {:?}: {}", tokens, e),
            }
        }
        set
    }
}

/// Ordered sequences of `len` distinct tokens
fn enumerate_loops(tokens: &[String], len: usize) -> Vec<Vec<String>> {
    fn extend(
        tokens: &[String],
        len: usize,
        current: &mut Vec<String>,
        out: &mut Vec<Vec<String>>,
    ) {
        if current.len() == len {
            out.push(current.clone());
            return;
        }
        for token in tokens {
            if current.contains(token) {
                continue;
            }
            current.push(token.clone());
            extend(tokens, len, current, out);
            current.pop();
        }
    }

    let mut out = Vec::new();
    extend(tokens, len, &mut Vec::with_capacity(len), &mut out);
    out
}

/// Directed hops of the loop including the closing hop
fn closed_pairs(tokens: &[String]) -> impl Iterator<Item = (String, String)> + '_ {
    tokens
        .iter()
        .zip(tokens.iter().cycle().skip(1))
        .map(|(a, b)| (a.clone(), b.clone()))
}

struct RegistryState {
    paths: Arc<PathSet>,
    refreshed_at: Option<Instant>,
}

/// Current path set; written only by the refresh task, read by every scan
pub struct PathRegistry {
    state: RwLock<RegistryState>,
}

impl Default for PathRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PathRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState {
                paths: Arc::new(PathSet::default()),
                refreshed_at: None,
            }),
        }
    }

    pub fn current(&self) -> Arc<PathSet> {
        Arc::clone(&self.state.read().paths)
    }

    pub fn replace(&self, paths: PathSet) {
        let mut state = self.state.write();
        state.paths = Arc::new(paths);
        state.refreshed_at = Some(Instant::now());
    }

    pub fn needs_refresh(&self, interval: Duration) -> bool {
        match self.state.read().refreshed_at {
            Some(at) => at.elapsed() >= interval,
            None => true,
        }
    }

    pub fn path_counts(&self) -> HashMap<PathType, usize> {
        let state = self.state.read();
        HashMap::from([
            (PathType::Triangular, state.paths.triangular.len()),
            (PathType::Quadrangular, state.paths.quadrangular.len()),
        ])
    }
}
