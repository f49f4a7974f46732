use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Average days per month, used only when calendar arithmetic overflows.
const FALLBACK_DAYS_PER_MONTH: i64 = 30;

/// Billing cadence of a plan
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    AsRefStr,
    Display,
    EnumString,
    Default,
)]
#[sqlx(type_name = "billing_period", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BillingPeriod {
    #[default]
    Monthly,
    Quarterly,
    SemiAnnual,
    Yearly,
}

impl BillingPeriod {
    /// Number of calendar months in one period
    pub fn months(&self) -> u32 {
        match self {
            BillingPeriod::Monthly => 1,
            BillingPeriod::Quarterly => 3,
            BillingPeriod::SemiAnnual => 6,
            BillingPeriod::Yearly => 12,
        }
    }

    /// End of a period starting at `start`.
    ///
    /// Calendar months are used, so Jan 31 + 1 month lands on the last day of February.
    pub fn advance(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start
            .checked_add_months(Months::new(self.months()))
            .unwrap_or_else(|| start + self.fallback_duration())
    }

    /// Start of the period that ends at `end`.
    pub fn rewind(&self, end: DateTime<Utc>) -> DateTime<Utc> {
        end.checked_sub_months(Months::new(self.months()))
            .unwrap_or_else(|| end - self.fallback_duration())
    }

    fn fallback_duration(&self) -> Duration {
        Duration::days(FALLBACK_DAYS_PER_MONTH * self.months() as i64)
    }
}
