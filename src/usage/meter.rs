//! File-backed usage meter with automatic period rollover

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    CostSummary, QuotaSummary, UsageMeter, UsagePlan, UsageSummary, UsageWarning, WarningLevel,
    CAUTION_THRESHOLD, LIMIT_THRESHOLD, WARNING_THRESHOLD,
};
use crate::clock::Clock;

/// Counters for one accounting period, as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsagePeriodState {
    pub period_id: String,
    #[serde(default)]
    pub call_counts: BTreeMap<String, u64>,
    /// Metered-cost plans only
    #[serde(default)]
    pub accumulated_cost: f64,
    /// Quota plans only
    #[serde(default)]
    pub call_total: u64,
}

impl UsagePeriodState {
    pub fn fresh(period_id: String) -> Self {
        Self {
            period_id,
            ..Default::default()
        }
    }

    pub fn total_calls(&self) -> u64 {
        self.call_counts.values().sum()
    }
}

/// Usage meter for one provider, persisted to a JSON file.
///
/// The period is re-checked against the clock before every read or write,
/// so a process that outlives a month or day boundary, or a state file left
/// behind by an earlier run, never leaks counts into the new period.
pub struct PeriodUsageMeter {
    plan: UsagePlan,
    path: PathBuf,
    clock: Arc<dyn Clock>,
    state: Mutex<UsagePeriodState>,
}

impl PeriodUsageMeter {
    pub fn open(path: impl Into<PathBuf>, plan: UsagePlan, clock: Arc<dyn Clock>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create usage directory {}", parent.display()))?;
        }

        let state = match load_state(&path) {
            Some(state) => state,
            None => UsagePeriodState::fresh(plan.period().period_id(&clock.now())),
        };

        Ok(Self {
            plan,
            path,
            clock,
            state: Mutex::new(state),
        })
    }

    pub fn plan(&self) -> &UsagePlan {
        &self.plan
    }

    /// Snapshot of the current counters, after any pending rollover
    pub fn state(&self) -> Result<UsagePeriodState> {
        let mut state = self.lock_state();
        self.roll_over(&mut state)?;
        Ok(state.clone())
    }

    fn lock_state(&self) -> MutexGuard<'_, UsagePeriodState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn roll_over(&self, state: &mut UsagePeriodState) -> Result<()> {
        let current = self.plan.period().period_id(&self.clock.now());
        if state.period_id != current {
            tracing::info!(
                "Usage period rolled over from {} to {}, resetting counters",
                state.period_id,
                current
            );
            *state = UsagePeriodState::fresh(current);
            self.persist(state)?;
        }
        Ok(())
    }

    fn persist(&self, state: &UsagePeriodState) -> Result<()> {
        let content = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write usage file {}", self.path.display()))
    }

    /// Fraction of the period budget consumed so far
    fn consumption(&self, state: &UsagePeriodState) -> f64 {
        match &self.plan {
            UsagePlan::MeteredCost(plan) if plan.monthly_credit > 0.0 => {
                state.accumulated_cost / plan.monthly_credit
            }
            UsagePlan::DailyQuota(plan) if plan.daily_limit > 0 => {
                state.call_total as f64 / plan.daily_limit as f64
            }
            _ => 0.0,
        }
    }
}

impl UsageMeter for PeriodUsageMeter {
    fn record(&self, operation: &str, count: u64) -> Result<()> {
        let mut state = self.lock_state();
        self.roll_over(&mut state)?;

        *state.call_counts.entry(operation.to_string()).or_insert(0) += count;
        match &self.plan {
            UsagePlan::MeteredCost(plan) => {
                state.accumulated_cost += count as f64 * plan.unit_price(operation);
            }
            UsagePlan::DailyQuota(_) => {
                state.call_total += count;
            }
        }

        self.persist(&state)
    }

    fn summary(&self) -> Result<UsageSummary> {
        let mut state = self.lock_state();
        self.roll_over(&mut state)?;

        let summary = match &self.plan {
            UsagePlan::MeteredCost(plan) => {
                let total_calls = state.total_calls();
                let remaining_credit = (plan.monthly_credit - state.accumulated_cost).max(0.0);
                let average_cost = if total_calls > 0 {
                    state.accumulated_cost / total_calls as f64
                } else {
                    plan.fallback_unit_price
                };
                let estimated_remaining_calls = if average_cost > 0.0 {
                    (remaining_credit / average_cost) as u64
                } else {
                    0
                };

                UsageSummary::MeteredCost(CostSummary {
                    month: state.period_id.clone(),
                    total_api_calls: total_calls,
                    accumulated_cost: state.accumulated_cost,
                    remaining_credit,
                    estimated_remaining_calls,
                    calls_by_api: state.call_counts.clone(),
                    within_free_tier: state.accumulated_cost <= plan.monthly_credit,
                })
            }
            UsagePlan::DailyQuota(plan) => {
                let usage_percentage = if plan.daily_limit > 0 {
                    state.call_total as f64 / plan.daily_limit as f64 * 100.0
                } else {
                    0.0
                };

                UsageSummary::DailyQuota(QuotaSummary {
                    date: state.period_id.clone(),
                    total_api_calls: state.call_total,
                    daily_limit: plan.daily_limit,
                    remaining_calls: plan.daily_limit.saturating_sub(state.call_total),
                    usage_percentage,
                    calls_by_api: state.call_counts.clone(),
                    within_limit: state.call_total <= plan.daily_limit,
                })
            }
        };

        Ok(summary)
    }

    fn warning(&self) -> Result<Option<UsageWarning>> {
        let mut state = self.lock_state();
        self.roll_over(&mut state)?;

        let consumed = self.consumption(&state);
        let warning = match &self.plan {
            UsagePlan::DailyQuota(plan) if consumed >= LIMIT_THRESHOLD => Some(UsageWarning {
                level: WarningLevel::LimitReached,
                message: format!(
                    "⚠️ LIMIT REACHED: You've used all {} API calls allowed today!",
                    plan.daily_limit
                ),
            }),
            UsagePlan::DailyQuota(_) if consumed >= WARNING_THRESHOLD => Some(UsageWarning {
                level: WarningLevel::Warning,
                message: "⚠️ WARNING: You've used 90%+ of your daily API limit.".to_string(),
            }),
            UsagePlan::DailyQuota(_) if consumed >= CAUTION_THRESHOLD => Some(UsageWarning {
                level: WarningLevel::Caution,
                message: "⚠️ CAUTION: You've used 75%+ of your daily API limit.".to_string(),
            }),
            UsagePlan::MeteredCost(_) if consumed >= WARNING_THRESHOLD => Some(UsageWarning {
                level: WarningLevel::Warning,
                message: "⚠️ WARNING: You've used 90%+ of your free tier credit this month!"
                    .to_string(),
            }),
            UsagePlan::MeteredCost(_) if consumed >= CAUTION_THRESHOLD => Some(UsageWarning {
                level: WarningLevel::Caution,
                message: "⚠️ CAUTION: You've used 75%+ of your free tier credit this month."
                    .to_string(),
            }),
            _ => None,
        };

        Ok(warning)
    }
}

fn load_state(path: &Path) -> Option<UsagePeriodState> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::warn!("Ignoring unreadable usage file {}: {}", path.display(), e);
            None
        }
    }
}
