//! Free-tier budgets for the supported providers

use chrono::{DateTime, Local};
use std::collections::BTreeMap;

/// Calendar bucket that scopes a set of usage counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingPeriod {
    Monthly,
    Daily,
}

impl BillingPeriod {
    pub fn period_id(&self, now: &DateTime<Local>) -> String {
        match self {
            BillingPeriod::Monthly => now.format("%Y-%m").to_string(),
            BillingPeriod::Daily => now.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Budget bounded by an estimated dollar credit per month
#[derive(Debug, Clone, PartialEq)]
pub struct CostPlan {
    pub monthly_credit: f64,
    /// Price of one billable unit per operation
    pub unit_prices: BTreeMap<String, f64>,
    /// Assumed price per call before any call has been made
    pub fallback_unit_price: f64,
}

impl CostPlan {
    /// Google Maps Platform pricing with the $200 monthly credit
    pub fn google_maps() -> Self {
        let unit_prices = [
            ("places_nearby", 0.032),
            ("places_search", 0.032),
            ("place_details", 0.017),
            ("geocode", 0.005),
            ("directions", 0.005),
            ("distance_matrix", 0.005),
        ]
        .into_iter()
        .map(|(operation, price)| (operation.to_string(), price))
        .collect();

        Self {
            monthly_credit: 200.0,
            unit_prices,
            fallback_unit_price: 0.015,
        }
    }

    pub fn with_monthly_credit(mut self, monthly_credit: f64) -> Self {
        self.monthly_credit = monthly_credit;
        self
    }

    /// Operations missing from the table are free
    pub fn unit_price(&self, operation: &str) -> f64 {
        self.unit_prices.get(operation).copied().unwrap_or(0.0)
    }
}

/// Budget bounded by a fixed number of calls per day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPlan {
    pub daily_limit: u64,
}

impl QuotaPlan {
    /// Yelp Fusion free tier
    pub fn yelp_fusion() -> Self {
        Self { daily_limit: 500 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UsagePlan {
    MeteredCost(CostPlan),
    DailyQuota(QuotaPlan),
}

impl UsagePlan {
    pub fn period(&self) -> BillingPeriod {
        match self {
            UsagePlan::MeteredCost(_) => BillingPeriod::Monthly,
            UsagePlan::DailyQuota(_) => BillingPeriod::Daily,
        }
    }
}
