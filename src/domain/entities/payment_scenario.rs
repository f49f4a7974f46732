use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Payment scenario for the dummy gateway.
/// Simulates different gateway outcomes without any external calls.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PaymentScenario {
    /// Payment succeeds immediately
    #[default]
    Success,
    /// Card is declined
    Decline,
    /// Insufficient funds
    InsufficientFunds,
    /// Card is expired
    ExpiredCard,
    /// The gateway cannot be reached
    NetworkError,
}

impl PaymentScenario {
    /// Test token that triggers this scenario
    pub fn test_token(&self) -> &'static str {
        match self {
            PaymentScenario::Success => "tok_success",
            PaymentScenario::Decline => "tok_decline",
            PaymentScenario::InsufficientFunds => "tok_insufficient_funds",
            PaymentScenario::ExpiredCard => "tok_expired_card",
            PaymentScenario::NetworkError => "tok_network_error",
        }
    }

    /// Detect scenario from a payment token. Unknown tokens succeed.
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "tok_decline" => PaymentScenario::Decline,
            "tok_insufficient_funds" => PaymentScenario::InsufficientFunds,
            "tok_expired_card" => PaymentScenario::ExpiredCard,
            "tok_network_error" => PaymentScenario::NetworkError,
            _ => PaymentScenario::Success,
        }
    }

    /// Business decline message, for scenarios the gateway answers with a decline
    pub fn decline_message(&self) -> Option<&'static str> {
        match self {
            PaymentScenario::Success | PaymentScenario::NetworkError => None,
            PaymentScenario::Decline => Some("Your card was declined."),
            PaymentScenario::InsufficientFunds => Some("Your card has insufficient funds."),
            PaymentScenario::ExpiredCard => Some("Your card has expired."),
        }
    }

    /// All available scenarios
    pub fn all() -> &'static [PaymentScenario] {
        &[
            PaymentScenario::Success,
            PaymentScenario::Decline,
            PaymentScenario::InsufficientFunds,
            PaymentScenario::ExpiredCard,
            PaymentScenario::NetworkError,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        for scenario in PaymentScenario::all() {
            assert_eq!(PaymentScenario::from_token(scenario.test_token()), *scenario);
        }
    }

    #[test]
    fn test_unknown_token_succeeds() {
        assert_eq!(
            PaymentScenario::from_token("tok_visa_4242"),
            PaymentScenario::Success
        );
    }

    #[test]
    fn test_decline_messages() {
        assert!(PaymentScenario::Success.decline_message().is_none());
        assert!(PaymentScenario::NetworkError.decline_message().is_none());
        assert_eq!(
            PaymentScenario::Decline.decline_message(),
            Some("Your card was declined.")
        );
    }
}
