use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate counts for the dashboard, covering everything since `since`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct DashboardStats {
    pub since: Option<DateTime<Utc>>,
    pub total_registrations: u32,
    pub total_visitors: u32,
    pub checked_in_visitors: u32,
    pub single_day_visitors: u32,
    pub multi_day_visitors: u32,
    pub vegetarian_meals: u32,
    pub non_vegetarian_meals: u32,
    pub no_meal: u32,
    pub cash_payments: u32,
    pub online_payments: u32,
    pub waived_payments: u32,
    /// Minor currency units.
    pub amount_collected: i64,
}

impl DashboardStats {
    pub fn pending_visitors(&self) -> u32 {
        self.total_visitors.saturating_sub(self.checked_in_visitors)
    }

    pub fn total_payments(&self) -> u32 {
        self.cash_payments + self.online_payments + self.waived_payments
    }
}
