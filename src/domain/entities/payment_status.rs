use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Payment status for subscription payments.
///
/// A payment is recorded as `Pending` before the gateway is called and is
/// updated exactly once to a terminal status afterwards.
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
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    /// Check if this status represents a successful payment
    pub fn is_successful(&self) -> bool {
        matches!(self, PaymentStatus::Completed)
    }

    /// Check if this status represents a failed payment
    pub fn is_failed(&self) -> bool {
        matches!(self, PaymentStatus::Failed)
    }

    /// Terminal statuses are never overwritten
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }

    /// Check if transition to the given status is valid (one-way only)
    pub fn can_transition_to(&self, new_status: PaymentStatus) -> bool {
        matches!(
            (self, new_status),
            (
                PaymentStatus::Pending,
                PaymentStatus::Completed | PaymentStatus::Failed
            )
        )
    }
}
