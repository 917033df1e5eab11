//! Free-tier usage metering
//!
//! Every provider call that misses the cache is billable. A [`UsageMeter`]
//! counts those calls per operation within an accounting period (a calendar
//! month for metered-cost providers, a calendar day for quota-limited ones),
//! estimates what has been consumed, and warns as the free tier runs out.
//! Counters live in a small JSON file and are reset when the wall clock
//! crosses into a new period.

mod meter;
mod plan;

use anyhow::Result;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

pub use meter::{PeriodUsageMeter, UsagePeriodState};
pub use plan::{BillingPeriod, CostPlan, QuotaPlan, UsagePlan};

/// Consumption fraction at which a caution is raised
pub const CAUTION_THRESHOLD: f64 = 0.75;
/// Consumption fraction at which the stronger warning is raised
pub const WARNING_THRESHOLD: f64 = 0.90;
/// Consumption fraction at which a quota is exhausted
pub const LIMIT_THRESHOLD: f64 = 1.0;

/// Period-scoped call counter for one provider
pub trait UsageMeter: Send + Sync {
    /// Count `count` billable units for `operation`
    fn record(&self, operation: &str, count: u64) -> Result<()>;

    /// Summarize usage in the current period
    fn summary(&self) -> Result<UsageSummary>;

    /// Proximity-to-limit warning, if any
    fn warning(&self) -> Result<Option<UsageWarning>>;
}

/// Meter used when usage tracking is turned off
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMeter;

impl UsageMeter for NullMeter {
    fn record(&self, _operation: &str, _count: u64) -> Result<()> {
        Ok(())
    }

    fn summary(&self) -> Result<UsageSummary> {
        Ok(UsageSummary::Untracked {
            message: "Usage tracking is disabled for this provider.".to_string(),
        })
    }

    fn warning(&self) -> Result<Option<UsageWarning>> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningLevel {
    Caution,
    Warning,
    LimitReached,
}

/// A proximity-to-limit message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageWarning {
    pub level: WarningLevel,
    pub message: String,
}

impl fmt::Display for UsageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Serialize for UsageWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.message)
    }
}

/// Usage in the current period, shaped per plan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UsageSummary {
    MeteredCost(CostSummary),
    DailyQuota(QuotaSummary),
    Untracked { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSummary {
    pub month: String,
    pub total_api_calls: u64,
    #[serde(rename = "estimated_cost", serialize_with = "as_dollars")]
    pub accumulated_cost: f64,
    #[serde(rename = "free_credit_remaining", serialize_with = "as_dollars")]
    pub remaining_credit: f64,
    pub estimated_remaining_calls: u64,
    pub calls_by_api: BTreeMap<String, u64>,
    pub within_free_tier: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaSummary {
    pub date: String,
    pub total_api_calls: u64,
    pub daily_limit: u64,
    pub remaining_calls: u64,
    #[serde(serialize_with = "as_percentage")]
    pub usage_percentage: f64,
    pub calls_by_api: BTreeMap<String, u64>,
    pub within_limit: bool,
}

fn as_dollars<S: Serializer>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("${:.2}", amount))
}

fn as_percentage<S: Serializer>(percent: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.1}%", percent))
}
