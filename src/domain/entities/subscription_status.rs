use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Lifecycle status of a campus subscription.
///
/// Used as a state machine: every lifecycle mutation checks
/// [`SubscriptionStatus::can_transition_to`] before writing.
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
)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SubscriptionStatus {
    /// Free trial period, no payment collected yet
    Trial,
    /// Paid and running
    Active,
    /// Canceled by the campus or an administrator; may still be inside its grace period
    Canceled,
    /// Paid term ran out without renewal
    Expired,
}

impl SubscriptionStatus {
    /// Returns true if the subscription counts as the campus's live subscription.
    /// A campus holds at most one live subscription at a time.
    pub fn is_live(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trial)
    }

    /// Terminal states are kept for history and never left again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionStatus::Canceled | SubscriptionStatus::Expired)
    }

    /// Valid transitions from this state
    pub fn valid_transitions(&self) -> &'static [SubscriptionStatus] {
        match self {
            SubscriptionStatus::Trial => &[
                SubscriptionStatus::Active,
                SubscriptionStatus::Canceled,
                SubscriptionStatus::Expired,
            ],
            // Active -> Active is a plan change
            SubscriptionStatus::Active => &[
                SubscriptionStatus::Active,
                SubscriptionStatus::Canceled,
                SubscriptionStatus::Expired,
            ],
            SubscriptionStatus::Canceled | SubscriptionStatus::Expired => &[],
        }
    }

    /// Check if transition to the given state is valid
    pub fn can_transition_to(&self, new_status: SubscriptionStatus) -> bool {
        self.valid_transitions().contains(&new_status)
    }

    /// The statuses that occupy a campus's single live slot.
    pub fn live() -> &'static [SubscriptionStatus] {
        &[SubscriptionStatus::Active, SubscriptionStatus::Trial]
    }
}
