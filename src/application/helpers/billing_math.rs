use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::domain::entities::billing_period::BillingPeriod;

const SECONDS_PER_DAY: i64 = 86_400;

/// Round a money amount to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a percentage to two decimals.
fn round_pct(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Time-weighted price difference for switching plans mid-period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Proration {
    /// Positive is a charge, negative a credit
    pub amount: Decimal,
    pub remaining_days: i64,
    pub period_days: i64,
}

/// Prorate the price difference over the days left in the current period.
///
/// `remaining_days` is rounded up to whole days and clamped to `[0, period_days]`.
/// `period_days` spans the calendar period ending at `end_date` and is at least 1.
/// Without an end date nothing remains to prorate.
pub fn prorate(
    old_price: Decimal,
    new_price: Decimal,
    end_date: Option<DateTime<Utc>>,
    period: BillingPeriod,
    now: DateTime<Utc>,
) -> Proration {
    let Some(end) = end_date else {
        let period_days = period.advance(now).signed_duration_since(now).num_days().max(1);
        return Proration {
            amount: Decimal::ZERO,
            remaining_days: 0,
            period_days,
        };
    };

    let period_days = end
        .signed_duration_since(period.rewind(end))
        .num_days()
        .max(1);

    let remaining_secs = end.signed_duration_since(now).num_seconds();
    let remaining_days = if remaining_secs <= 0 {
        0
    } else {
        // ceil division on positive values
        ((remaining_secs + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY).min(period_days)
    };

    let amount = round_money(
        (new_price - old_price) * Decimal::from(remaining_days) / Decimal::from(period_days),
    );

    Proration {
        amount,
        remaining_days,
        period_days,
    }
}

/// Share of a limit in use, in percent. A zero or negative limit yields 0.0.
pub fn usage_percentage(used: i64, limit: i64) -> f64 {
    if limit <= 0 {
        return 0.0;
    }
    round_pct(used as f64 / limit as f64 * 100.0)
}

/// Completed share of all finished payment attempts, in percent.
///
/// With no attempts at all the rate is 100.0.
pub fn success_rate(completed: i64, failed: i64) -> f64 {
    let attempts = completed + failed;
    if attempts <= 0 {
        return 100.0;
    }
    round_pct(completed as f64 / attempts as f64 * 100.0)
}

/// Mean of `count` amounts totalling `total`; zero when `count` is zero.
pub fn average_amount(total: Decimal, count: i64) -> Decimal {
    if count <= 0 {
        return Decimal::ZERO;
    }
    round_money(total / Decimal::from(count))
}

/// Period-over-period growth in percent.
///
/// - previous > 0: (current - previous) / previous * 100
/// - previous = 0, current > 0: 100.0
/// - both zero: 0.0
pub fn growth_rate(current: Decimal, previous: Decimal) -> f64 {
    if previous > Decimal::ZERO {
        let pct = (current - previous) / previous * Decimal::ONE_HUNDRED;
        return round_pct(pct.to_f64().unwrap_or(0.0));
    }
    if current > Decimal::ZERO { 100.0 } else { 0.0 }
}
