//! # Execution Coordinator
//!
//! ## Purpose
//!
//! Executes a multi-path opportunity one hop at a time and unwinds partially
//! executed paths. There is no atomic multi-swap primitive, so every hop is a
//! separate swap whose actual output sizes the next hop; a failure mid-path
//! leaves the wallet holding an intermediate token that the rollback plan tries
//! to convert back.
//!
//! ## State Machine
//!
//! ```text
//! Pending → Executing{0} → … → Executing{n-1} → Completed
//!                 ↓ hop k fails
//!           Failed{0}                       (k = 0, nothing to unwind)
//!           RollbackPending → RolledBack | RollbackFailed   (immediate / delayed)
//!           RollbackPending → resolve_manual_rollback → RolledBack | RollbackFailed
//! ```
//!
//! Only one opportunity is in flight at a time: dispatch while another is
//! `Executing` or `RollbackPending` returns `ExecutionInFlight`.
//!
//! If the `execute` future is dropped after a swap has landed, the held position
//! is parked as a pending manual rollback and the attempt is recorded as failed.
//!
//! ## Result Shape
//!
//! `execute` returns `Err` only when it refuses to start (expired, not
//! executable, busy). Once started, forward and rollback failures are reported in
//! the returned [`ExecutionReport`] with `state` and `error` set.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use types::{current_timestamp_ns, percent_of, percent_to_fraction, TokenPrecision};

use crate::config::MultiPathConfig;
use crate::domain::{RollbackStrategy, Urgency};
use crate::error::{ArbitrageError, Result};
use crate::gateway::{SwapExecutor, SwapRequest};
use crate::opportunity::MultiPathOpportunity;
use crate::path_optimizer::RollbackPlan;
use crate::stats::{FailureRecord, StatsTracker};
use crate::{log_error, log_execution, log_profit, log_rollback, log_success};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionState {
    Pending,
    Executing { hop_index: usize },
    Completed,
    Failed { hop_index: usize },
    RollbackPending,
    RolledBack,
    RollbackFailed,
}

impl ExecutionState {
    /// States that block another dispatch
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            ExecutionState::Executing { .. } | ExecutionState::RollbackPending
        )
    }
}

/// One submitted swap, forward or reverse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapStep {
    pub hop_index: usize,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
    pub min_amount_out: Decimal,
    pub amount_out: Option<Decimal>,
    pub transaction_id: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Tokens left in the wallet that are not the starting token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrandedPosition {
    pub token: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub opportunity_id: String,
    pub path_name: String,
    pub state: ExecutionState,
    pub executed_hops: usize,
    pub total_hops: usize,
    pub forward_steps: Vec<SwapStep>,
    pub rollback_steps: Vec<SwapStep>,
    pub rollback_required: bool,
    pub rollback_strategy: Option<RollbackStrategy>,
    pub rollback_attempted: bool,
    pub rollback_succeeded: bool,
    /// Final amount of the starting token, when the wallet holds only that
    pub actual_output: Option<Decimal>,
    /// `actual_output − input − gas` in the starting token
    pub realized_profit: Option<Decimal>,
    pub stranded: Option<StrandedPosition>,
    /// Loss booked for a stranded position, marked at the planned rate less
    /// rollback slippage for the reverse swaps it still needs
    pub estimated_loss: Option<Decimal>,
    #[serde(skip)]
    pub error: Option<ArbitrageError>,
    pub elapsed_ms: u64,
}

impl ExecutionReport {
    fn new(opportunity: &MultiPathOpportunity) -> Self {
        Self {
            opportunity_id: opportunity.id.clone(),
            path_name: opportunity.path_name(),
            state: ExecutionState::Pending,
            executed_hops: 0,
            total_hops: opportunity.hops.len(),
            forward_steps: Vec::new(),
            rollback_steps: Vec::new(),
            rollback_required: false,
            rollback_strategy: None,
            rollback_attempted: false,
            rollback_succeeded: false,
            actual_output: None,
            realized_profit: None,
            stranded: None,
            estimated_loss: None,
            error: None,
            elapsed_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == ExecutionState::Completed
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} [{:?}] {}/{} hops",
            self.path_name, self.state, self.executed_hops, self.total_hops
        );
        if let Some(profit) = self.realized_profit {
            summary.push_str(&format!(", realized {:.6}", profit));
        }
        if self.rollback_required {
            summary.push_str(&format!(
                ", rollback {} ({})",
                if self.rollback_succeeded {
                    "succeeded"
                } else if self.rollback_attempted {
                    "failed"
                } else {
                    "not attempted"
                },
                self.rollback_strategy
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "none".to_string())
            ));
        }
        if let Some(stranded) = &self.stranded {
            summary.push_str(&format!(", stranded {} {}", stranded.amount, stranded.token));
        }
        summary
    }
}

/// A partial execution waiting for an operator to unwind it
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRollback {
    pub opportunity_id: String,
    pub path_name: String,
    pub plan: RollbackPlan,
    pub stranded: StrandedPosition,
}

/// Position held by the in-flight execution after its latest landed swap
#[derive(Debug, Clone)]
struct Exposure {
    report: ExecutionReport,
    /// Reverse swaps still needed to unwind `held`
    plan: RollbackPlan,
    held: StrandedPosition,
    estimated_loss: Decimal,
    started: Instant,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    active: Option<(String, ExecutionState)>,
    exposure: Option<Exposure>,
    pending_manual: Option<PendingRollback>,
    last_report: Option<ExecutionReport>,
}

pub struct ExecutionCoordinator {
    executor: Arc<dyn SwapExecutor>,
    stats: Arc<StatsTracker>,
    state: Arc<Mutex<CoordinatorState>>,
}

/// Releases or parks the in-flight slot if the execution future is dropped
struct InFlightGuard {
    state: Arc<Mutex<CoordinatorState>>,
    stats: Arc<StatsTracker>,
    opportunity_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        let ours = matches!(
            &state.active,
            Some((id, active)) if *id == self.opportunity_id && active.is_busy()
        );
        let parked = matches!(
            &state.pending_manual,
            Some(pending) if pending.opportunity_id == self.opportunity_id
        );
        if !ours || parked {
            return;
        }

        let Some(exposure) = state.exposure.take() else {
            // nothing landed yet
            state.active = None;
            return;
        };

        let Exposure {
            mut report,
            mut plan,
            held,
            estimated_loss,
            started,
        } = exposure;
        plan.strategy = RollbackStrategy::Manual;
        report.state = ExecutionState::RollbackPending;
        report.rollback_required = true;
        report.rollback_strategy = Some(RollbackStrategy::Manual);
        report.stranded = Some(held.clone());
        report.estimated_loss = Some(estimated_loss);
        report.error = Some(ArbitrageError::Abandoned {
            executed_hops: report.executed_hops,
        });
        report.elapsed_ms = started.elapsed().as_millis() as u64;

        state.active = Some((self.opportunity_id.clone(), ExecutionState::RollbackPending));
        state.pending_manual = Some(PendingRollback {
            opportunity_id: self.opportunity_id.clone(),
            path_name: report.path_name.clone(),
            plan,
            stranded: held.clone(),
        });
        let path_name = report.path_name.clone();
        let rollback_attempted = report.rollback_attempted;
        state.last_report = Some(report);
        drop(state);

        self.stats.record_failure(
            &path_name,
            FailureRecord {
                loss: Some(estimated_loss),
                rollback_attempted,
                rollback_succeeded: false,
            },
            started.elapsed(),
        );
        log_error!(
            "{} abandoned mid-path: holding {} {}, manual rollback required",
            path_name,
            held.amount,
            held.token
        );
    }
}

struct RollbackOutcome {
    succeeded: bool,
    recovered: Option<Decimal>,
    stranded: Option<StrandedPosition>,
    /// Reverse swaps the stranded position still needs
    remaining_reverse_hops: usize,
    error: Option<ArbitrageError>,
}

impl ExecutionCoordinator {
    pub fn new(executor: Arc<dyn SwapExecutor>, stats: Arc<StatsTracker>) -> Self {
        Self {
            executor,
            stats,
            state: Arc::new(Mutex::new(CoordinatorState::default())),
        }
    }

    /// State of the in-flight or pending-rollback opportunity, if any
    pub fn active_state(&self) -> Option<ExecutionState> {
        self.state.lock().active.as_ref().map(|(_, state)| *state)
    }

    pub fn is_busy(&self) -> bool {
        self.active_state().map(|s| s.is_busy()).unwrap_or(false)
    }

    pub fn last_report(&self) -> Option<ExecutionReport> {
        self.state.lock().last_report.clone()
    }

    pub fn pending_rollback(&self) -> Option<PendingRollback> {
        self.state.lock().pending_manual.clone()
    }

    pub async fn execute(
        &self,
        opportunity: &MultiPathOpportunity,
        config: &MultiPathConfig,
    ) -> Result<ExecutionReport> {
        let now = current_timestamp_ns();
        if opportunity.is_expired_at(now) {
            return Err(ArbitrageError::OpportunityExpired {
                opportunity_id: opportunity.id.clone(),
                expired_at_ns: opportunity.expires_at_ns,
            });
        }

        let checks = opportunity.executability(config);
        if !checks.is_executable() {
            return Err(ArbitrageError::NotExecutable {
                opportunity_id: opportunity.id.clone(),
                reasons: checks.failed_checks().join(", "),
            });
        }

        let _guard = self.claim(&opportunity.id)?;
        let started = Instant::now();
        let mut report = ExecutionReport::new(opportunity);
        let precision = &config.universe.precision;

        log_execution!(
            "Executing {} ({} hops, input {}, expected net {:.4}%)",
            report.path_name,
            report.total_hops,
            opportunity.input_amount,
            opportunity.net_profit_percent
        );

        let mut amount =
            precision.quantize(opportunity.path.start_token(), opportunity.input_amount);
        let mut failure: Option<(usize, String)> = None;

        for (index, hop) in opportunity.hops.iter().enumerate() {
            self.set_active(&opportunity.id, ExecutionState::Executing { hop_index: index });

            let min_amount_out = rescale_min_output(
                precision,
                &hop.token_out,
                hop.min_amount_out,
                hop.amount_in,
                amount,
            );
            let request = SwapRequest {
                token_in: hop.token_in.clone(),
                token_out: hop.token_out.clone(),
                amount_in: amount,
                min_amount_out,
                fee_tier: hop.fee_tier,
                slippage_tolerance: hop.slippage_tolerance,
                urgency: Urgency::Normal,
                wallet: config.scan.wallet_address.clone(),
            };

            let step_started = Instant::now();
            let result = self.executor.execute(&request).await;
            let mut step = SwapStep {
                hop_index: index,
                token_in: request.token_in,
                token_out: request.token_out,
                amount_in: request.amount_in,
                min_amount_out: request.min_amount_out,
                amount_out: None,
                transaction_id: None,
                error: None,
                duration_ms: step_started.elapsed().as_millis() as u64,
            };

            match result {
                Ok(outcome) => {
                    amount = precision.quantize(&hop.token_out, outcome.amount_out);
                    step.amount_out = Some(amount);
                    step.transaction_id = outcome.transaction_id;
                    log_execution!(
                        "Hop {}/{} {} → {} {}",
                        index + 1,
                        report.total_hops,
                        hop.pair_label(),
                        amount,
                        hop.token_out
                    );
                    report.forward_steps.push(step);
                    report.executed_hops += 1;
                    if report.executed_hops < report.total_hops {
                        self.track_exposure(
                            opportunity,
                            config,
                            &report,
                            opportunity.rollback_plan.for_executed(report.executed_hops),
                            StrandedPosition {
                                token: hop.token_out.clone(),
                                amount,
                            },
                            started,
                        );
                    }
                }
                Err(e) => {
                    step.error = Some(e.to_string());
                    report.forward_steps.push(step);
                    failure = Some((index, e.to_string()));
                    break;
                }
            }
        }

        match failure {
            None => {
                let profit = amount - opportunity.input_amount - opportunity.total_gas;
                report.state = ExecutionState::Completed;
                report.actual_output = Some(amount);
                report.realized_profit = Some(profit);
                report.elapsed_ms = started.elapsed().as_millis() as u64;

                let percent = percent_of(profit, opportunity.input_amount);
                self.stats
                    .record_success(&report.path_name, profit, percent, started.elapsed());
                log_success!("{}", report.summary());
                log_profit!(
                    "Realized {:.6} {} ({:.4}%)",
                    profit,
                    opportunity.path.start_token(),
                    percent
                );
            }
            Some((hop_index, reason)) => {
                report.error = Some(ArbitrageError::ExecutionFailed {
                    hop_index,
                    reason: reason.clone(),
                });
                log_error!(
                    "{} failed at hop {}: {}",
                    report.path_name,
                    hop_index + 1,
                    reason
                );
                self.handle_partial(opportunity, config, &mut report, hop_index, amount, started)
                    .await;
            }
        }

        self.finish(&opportunity.id, &report);
        Ok(report)
    }

    /// Unwind (or park) a path that halted at `failed_hop`
    async fn handle_partial(
        &self,
        opportunity: &MultiPathOpportunity,
        config: &MultiPathConfig,
        report: &mut ExecutionReport,
        failed_hop: usize,
        held_amount: Decimal,
        started: Instant,
    ) {
        if failed_hop == 0 {
            report.state = ExecutionState::Failed { hop_index: 0 };
            report.actual_output = Some(opportunity.input_amount);
            report.realized_profit = Some(Decimal::ZERO);
            report.elapsed_ms = started.elapsed().as_millis() as u64;
            self.stats.record_failure(
                &report.path_name,
                FailureRecord {
                    loss: None,
                    rollback_attempted: false,
                    rollback_succeeded: false,
                },
                started.elapsed(),
            );
            return;
        }

        let plan = opportunity.rollback_plan.for_executed(failed_hop);
        let stranded = StrandedPosition {
            token: opportunity.hops[failed_hop].token_in.clone(),
            amount: held_amount,
        };
        report.rollback_required = true;
        report.rollback_strategy = Some(plan.strategy);
        self.set_active(&opportunity.id, ExecutionState::RollbackPending);

        match plan.strategy {
            RollbackStrategy::Manual => {
                let loss =
                    estimate_stranded_loss(opportunity, &stranded, plan.reverse_hops.len(), config);
                log_rollback!(
                    "Manual rollback required for {}: holding {} {}",
                    report.path_name,
                    stranded.amount,
                    stranded.token
                );
                report.state = ExecutionState::RollbackPending;
                report.stranded = Some(stranded.clone());
                report.estimated_loss = Some(loss);
                self.state.lock().pending_manual = Some(PendingRollback {
                    opportunity_id: opportunity.id.clone(),
                    path_name: report.path_name.clone(),
                    plan,
                    stranded,
                });
                report.elapsed_ms = started.elapsed().as_millis() as u64;
                self.stats.record_failure(
                    &report.path_name,
                    FailureRecord {
                        loss: Some(loss),
                        rollback_attempted: false,
                        rollback_succeeded: false,
                    },
                    started.elapsed(),
                );
                return;
            }
            RollbackStrategy::Delayed => {
                log_rollback!(
                    "Delaying rollback of {} by {}ms",
                    report.path_name,
                    config.rollback.delay_ms
                );
                tokio::time::sleep(Duration::from_millis(config.rollback.delay_ms)).await;
            }
            RollbackStrategy::Immediate => {}
        }

        report.rollback_attempted = true;
        let outcome = self
            .run_reverse_swaps(opportunity, &plan, held_amount, config, report, started)
            .await;

        report.rollback_succeeded = outcome.succeeded;
        let loss = match (outcome.recovered, &outcome.stranded) {
            (Some(recovered), _) => Some((opportunity.input_amount - recovered).max(Decimal::ZERO)),
            (None, Some(stranded)) => Some(estimate_stranded_loss(
                opportunity,
                stranded,
                outcome.remaining_reverse_hops,
                config,
            )),
            (None, None) => None,
        };
        report.stranded = outcome.stranded;
        if let Some(recovered) = outcome.recovered {
            report.actual_output = Some(recovered);
            report.realized_profit = Some(recovered - opportunity.input_amount);
        } else {
            report.estimated_loss = loss;
        }
        if outcome.succeeded {
            report.state = ExecutionState::RolledBack;
            log_rollback!("{}", report.summary());
        } else {
            report.state = ExecutionState::RollbackFailed;
            if let Some(error) = outcome.error {
                log_error!("ROLLBACK FAILED for {}: {}", report.path_name, error);
                report.error = Some(error);
            }
        }
        report.elapsed_ms = started.elapsed().as_millis() as u64;

        self.stats.record_failure(
            &report.path_name,
            FailureRecord {
                loss,
                rollback_attempted: true,
                rollback_succeeded: outcome.succeeded,
            },
            started.elapsed(),
        );
    }

    /// Issue the plan's reverse swaps in order, aborting on the first failure
    async fn run_reverse_swaps(
        &self,
        opportunity: &MultiPathOpportunity,
        plan: &RollbackPlan,
        held_amount: Decimal,
        config: &MultiPathConfig,
        report: &mut ExecutionReport,
        started: Instant,
    ) -> RollbackOutcome {
        let precision = &config.universe.precision;
        let keep = Decimal::ONE - percent_to_fraction(config.rollback.slippage_tolerance);
        let mut held = held_amount;

        for (reverse_index, reverse) in plan.reverse_hops.iter().enumerate() {
            let forward_input = report
                .forward_steps
                .get(reverse.forward_hop_index)
                .map(|step| step.amount_in)
                .unwrap_or(Decimal::ZERO);
            let request = SwapRequest {
                token_in: reverse.token_in.clone(),
                token_out: reverse.token_out.clone(),
                amount_in: held,
                min_amount_out: precision.quantize(&reverse.token_out, forward_input * keep),
                fee_tier: reverse.fee_tier,
                slippage_tolerance: reverse.slippage_tolerance,
                urgency: Urgency::High,
                wallet: config.scan.wallet_address.clone(),
            };

            log_rollback!(
                "Reverse hop {} {}→{} amount {}",
                reverse_index + 1,
                request.token_in,
                request.token_out,
                request.amount_in
            );

            let step_started = Instant::now();
            let result = self.executor.execute(&request).await;
            let mut step = SwapStep {
                hop_index: reverse.forward_hop_index,
                token_in: request.token_in.clone(),
                token_out: request.token_out.clone(),
                amount_in: request.amount_in,
                min_amount_out: request.min_amount_out,
                amount_out: None,
                transaction_id: None,
                error: None,
                duration_ms: step_started.elapsed().as_millis() as u64,
            };

            match result {
                Ok(outcome) => {
                    held = precision.quantize(&reverse.token_out, outcome.amount_out);
                    step.amount_out = Some(held);
                    step.transaction_id = outcome.transaction_id;
                    report.rollback_steps.push(step);

                    let remaining = plan.after_reversed(reverse_index + 1);
                    if !remaining.reverse_hops.is_empty() {
                        self.track_exposure(
                            opportunity,
                            config,
                            report,
                            remaining,
                            StrandedPosition {
                                token: reverse.token_out.clone(),
                                amount: held,
                            },
                            started,
                        );
                    }
                }
                Err(e) => {
                    step.error = Some(e.to_string());
                    report.rollback_steps.push(step);
                    return RollbackOutcome {
                        succeeded: false,
                        recovered: None,
                        stranded: Some(StrandedPosition {
                            token: request.token_in.clone(),
                            amount: held,
                        }),
                        remaining_reverse_hops: plan.reverse_hops.len() - reverse_index,
                        error: Some(ArbitrageError::RollbackFailed {
                            reverse_hop_index: reverse_index,
                            reason: e.to_string(),
                            stranded_token: request.token_in,
                            stranded_amount: held,
                        }),
                    };
                }
            }
        }

        RollbackOutcome {
            succeeded: true,
            recovered: Some(held),
            stranded: None,
            remaining_reverse_hops: 0,
            error: None,
        }
    }

    /// Record the operator's outcome for a pending manual rollback
    pub fn resolve_manual_rollback(&self, succeeded: bool) -> Result<ExecutionState> {
        let mut state = self.state.lock();
        let pending = state
            .pending_manual
            .take()
            .ok_or(ArbitrageError::NoPendingRollback)?;

        let resolved = if succeeded {
            ExecutionState::RolledBack
        } else {
            ExecutionState::RollbackFailed
        };
        if matches!(&state.active, Some((id, _)) if *id == pending.opportunity_id) {
            state.active = None;
        }
        if let Some(report) = state
            .last_report
            .as_mut()
            .filter(|r| r.opportunity_id == pending.opportunity_id)
        {
            report.state = resolved;
            report.rollback_attempted = true;
            report.rollback_succeeded = succeeded;
            if succeeded {
                report.stranded = None;
            }
        }
        drop(state);

        self.stats.record_manual_rollback(succeeded);
        log_rollback!(
            "Manual rollback for {} resolved: {:?}",
            pending.path_name,
            resolved
        );
        Ok(resolved)
    }

    fn claim(&self, opportunity_id: &str) -> Result<InFlightGuard> {
        let mut state = self.state.lock();
        if let Some((active_id, active_state)) = &state.active {
            if active_state.is_busy() {
                return Err(ArbitrageError::ExecutionInFlight {
                    active_id: active_id.clone(),
                });
            }
        }
        state.active = Some((
            opportunity_id.to_string(),
            ExecutionState::Executing { hop_index: 0 },
        ));
        state.exposure = None;
        Ok(InFlightGuard {
            state: Arc::clone(&self.state),
            stats: Arc::clone(&self.stats),
            opportunity_id: opportunity_id.to_string(),
        })
    }

    fn set_active(&self, opportunity_id: &str, execution_state: ExecutionState) {
        self.state.lock().active = Some((opportunity_id.to_string(), execution_state));
    }

    fn track_exposure(
        &self,
        opportunity: &MultiPathOpportunity,
        config: &MultiPathConfig,
        report: &ExecutionReport,
        plan: RollbackPlan,
        held: StrandedPosition,
        started: Instant,
    ) {
        let estimated_loss =
            estimate_stranded_loss(opportunity, &held, plan.reverse_hops.len(), config);
        self.state.lock().exposure = Some(Exposure {
            report: report.clone(),
            plan,
            held,
            estimated_loss,
            started,
        });
    }

    fn finish(&self, opportunity_id: &str, report: &ExecutionReport) {
        let mut state = self.state.lock();
        state.exposure = None;
        state.active = if report.state == ExecutionState::RollbackPending {
            Some((opportunity_id.to_string(), ExecutionState::RollbackPending))
        } else {
            None
        };
        state.last_report = Some(report.clone());
    }
}

/// Loss implied by holding `held` instead of the starting token.
///
/// The position is marked at the planned rate for its token and haircut by the
/// rollback tolerance once per reverse swap it still needs; an unknown token is
/// marked at zero.
fn estimate_stranded_loss(
    opportunity: &MultiPathOpportunity,
    held: &StrandedPosition,
    reverse_hops: usize,
    config: &MultiPathConfig,
) -> Decimal {
    let input = opportunity.input_amount;
    let planned = if held.token == opportunity.path.start_token() {
        Some(input)
    } else {
        opportunity
            .hops
            .iter()
            .skip(1)
            .find(|hop| hop.token_in == held.token)
            .map(|hop| hop.amount_in)
    };

    let value = match planned {
        Some(planned) if planned > Decimal::ZERO => {
            let keep = Decimal::ONE - percent_to_fraction(config.rollback.slippage_tolerance);
            (0..reverse_hops).fold(held.amount * input / planned, |value, _| value * keep)
        }
        _ => Decimal::ZERO,
    };
    (input - value).max(Decimal::ZERO)
}

/// Scale a planned minimum output to the amount actually being swapped
fn rescale_min_output(
    precision: &TokenPrecision,
    token_out: &str,
    planned_min: Decimal,
    planned_in: Decimal,
    actual_in: Decimal,
) -> Decimal {
    if planned_in <= Decimal::ZERO || actual_in == planned_in {
        return planned_min;
    }
    precision.quantize(token_out, planned_min * actual_in / planned_in)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolSeed;
    use crate::domain::{FeeTier, TradingPath};
    use crate::error::SwapError;
    use crate::path_optimizer::evaluate;
    use crate::path_optimizer::test_support::{analysis, calm};
    use crate::simulation::SimulatedMarket;
    use rust_decimal_macros::dec;

    fn seeded_market() -> Arc<SimulatedMarket> {
        let market = SimulatedMarket::new();
        // GWETH trades 2% rich against GALA
        for (a, b, rb) in [
            ("GALA", "GUSDC", dec!(10_000_000)),
            ("GUSDC", "GWETH", dec!(10_000_000)),
            ("GWETH", "GALA", dec!(10_200_000)),
        ] {
            market.add_pool(&PoolSeed {
                token_a: a.to_string(),
                token_b: b.to_string(),
                reserve_a: dec!(10_000_000),
                reserve_b: rb,
                fee_tier: FeeTier::Standard,
            });
        }
        Arc::new(market)
    }

    /// Synthetic 1:1 opportunity with a generous tolerance on each hop
    fn opportunity(config: &MultiPathConfig) -> MultiPathOpportunity {
        let path = TradingPath::new(&["GALA", "GUSDC", "GWETH"]).unwrap();
        let mut analyses = vec![
            analysis("GALA", "GUSDC", dec!(100), dec!(1.0)),
            analysis("GUSDC", "GWETH", dec!(100), dec!(1.0)),
            analysis("GWETH", "GALA", dec!(100), dec!(1.0)),
        ];
        analyses[2].expected_amount_out = dec!(101);
        let optimized = evaluate(&path, dec!(100), analyses, &calm(), config);
        MultiPathOpportunity::from_optimized(optimized, None, config)
    }

    fn coordinator(market: Arc<SimulatedMarket>) -> (ExecutionCoordinator, Arc<StatsTracker>) {
        let stats = Arc::new(StatsTracker::new());
        (ExecutionCoordinator::new(market, stats.clone()), stats)
    }

    #[tokio::test]
    async fn test_first_hop_failure_needs_no_rollback() {
        let config = MultiPathConfig::default();
        let market = seeded_market();
        market.fail_swaps("GALA", "GUSDC", SwapError::Rejected { reason: "paused".to_string() });
        let (coordinator, stats) = coordinator(market.clone());

        let report = coordinator.execute(&opportunity(&config), &config).await.unwrap();

        assert_eq!(report.state, ExecutionState::Failed { hop_index: 0 });
        assert_eq!(report.executed_hops, 0);
        assert!(!report.rollback_required);
        assert!(market.executed_swaps().is_empty());
        assert_eq!(stats.snapshot().executions_failed, 1);
        assert!(!coordinator.is_busy());
    }

    #[tokio::test]
    async fn test_hop_amounts_follow_actual_output() {
        let config = MultiPathConfig::default();
        let market = seeded_market();
        let (coordinator, _) = coordinator(market.clone());

        let report = coordinator.execute(&opportunity(&config), &config).await.unwrap();

        assert_eq!(report.executed_hops, 3);
        for pair in report.forward_steps.windows(2) {
            assert_eq!(Some(pair[1].amount_in), pair[0].amount_out);
        }
        assert_eq!(report.state, ExecutionState::Completed);
        assert!(report.realized_profit.unwrap() > Decimal::ZERO);
        assert_eq!(report.actual_output, report.forward_steps[2].amount_out);
    }

    #[tokio::test]
    async fn test_manual_rollback_blocks_until_resolved() {
        let mut config = MultiPathConfig::default();
        config.rollback.strategy = RollbackStrategy::Manual;
        let market = seeded_market();
        market.fail_swaps("GWETH", "GALA", SwapError::Timeout { reason: "no receipt".to_string() });
        let (coordinator, _) = coordinator(market.clone());

        let opp = opportunity(&config);
        assert_eq!(opp.rollback_plan.strategy, RollbackStrategy::Manual);
        let report = coordinator.execute(&opp, &config).await.unwrap();

        assert_eq!(report.state, ExecutionState::RollbackPending);
        assert_eq!(report.executed_hops, 2);
        assert_eq!(report.stranded.as_ref().unwrap().token, "GWETH");
        assert!(report.estimated_loss.unwrap() > Decimal::ZERO);
        // two forward swaps, no reverse swaps
        assert_eq!(market.executed_swaps().len(), 2);

        let second = opportunity(&config);
        assert!(matches!(
            coordinator.execute(&second, &config).await,
            Err(ArbitrageError::ExecutionInFlight { .. })
        ));

        assert_eq!(
            coordinator.resolve_manual_rollback(true).unwrap(),
            ExecutionState::RolledBack
        );
        assert!(!coordinator.is_busy());
        assert_eq!(coordinator.last_report().unwrap().state, ExecutionState::RolledBack);
        assert!(matches!(
            coordinator.resolve_manual_rollback(true),
            Err(ArbitrageError::NoPendingRollback)
        ));
    }

    #[tokio::test]
    async fn test_rollback_failure_surfaces_stranded_position() {
        let config = MultiPathConfig::default();
        let market = seeded_market();
        market.fail_swaps("GWETH", "GALA", SwapError::Rejected { reason: "paused".to_string() });
        // reverse of hop 2 fails too
        market.fail_swaps("GWETH", "GUSDC", SwapError::Rejected { reason: "paused".to_string() });
        let (coordinator, stats) = coordinator(market.clone());

        let report = coordinator.execute(&opportunity(&config), &config).await.unwrap();

        assert_eq!(report.state, ExecutionState::RollbackFailed);
        assert!(report.rollback_attempted);
        assert!(!report.rollback_succeeded);
        let stranded = report.stranded.unwrap();
        assert_eq!(stranded.token, "GWETH");
        assert!(matches!(
            report.error,
            Some(ArbitrageError::RollbackFailed { reverse_hop_index: 0, .. })
        ));
        assert_eq!(report.rollback_steps.len(), 1);

        let stats = stats.snapshot();
        assert_eq!(stats.rollbacks_succeeded, 0);
        assert!(stats.worst_loss > Decimal::ZERO);
        assert_eq!(report.estimated_loss, Some(stats.worst_loss));
        assert_eq!(stats.total_profit, -stats.worst_loss);
    }

    #[test]
    fn test_stranded_loss_marks_at_plan_less_rollback_slippage() {
        let config = MultiPathConfig::default();
        let opp = opportunity(&config);
        let planned = opp.hops[2].amount_in;
        let held = StrandedPosition {
            token: "GWETH".to_string(),
            amount: planned,
        };
        let keep = Decimal::ONE - percent_to_fraction(config.rollback.slippage_tolerance);

        assert_eq!(estimate_stranded_loss(&opp, &held, 0, &config), Decimal::ZERO);
        assert_eq!(
            estimate_stranded_loss(&opp, &held, 2, &config),
            opp.input_amount - opp.input_amount * keep * keep
        );

        let unknown = StrandedPosition {
            token: "SILK".to_string(),
            amount: dec!(5),
        };
        assert_eq!(estimate_stranded_loss(&opp, &unknown, 1, &config), opp.input_amount);
    }

    #[tokio::test]
    async fn test_not_executable_is_refused() {
        let mut config = MultiPathConfig::default();
        let opp = opportunity(&config);
        config.scan.min_profit_percent = dec!(50);
        let (coordinator, _) = coordinator(seeded_market());

        assert!(matches!(
            coordinator.execute(&opp, &config).await,
            Err(ArbitrageError::NotExecutable { .. })
        ));
    }

    #[test]
    fn test_rescale_min_output() {
        let precision = TokenPrecision::default();
        assert_eq!(
            rescale_min_output(&precision, "GUSDC", dec!(99), dec!(100), dec!(50)),
            dec!(49.5)
        );
        assert_eq!(
            rescale_min_output(&precision, "GUSDC", dec!(99), dec!(100), dec!(100)),
            dec!(99)
        );
    }
}
