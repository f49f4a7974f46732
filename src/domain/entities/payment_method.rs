use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// How a campus pays for its subscription.
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
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    DebitCard,
    BankTransfer,
    Wallet,
    Other,
}

impl PaymentMethod {
    /// Human-readable name used in notices
    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "Credit card",
            PaymentMethod::DebitCard => "Debit card",
            PaymentMethod::BankTransfer => "Bank transfer",
            PaymentMethod::Wallet => "Wallet",
            PaymentMethod::Other => "Other",
        }
    }
}
