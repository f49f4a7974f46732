use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    app_error::AppResult, application::use_cases::payment::PaymentProfile,
    domain::entities::payment_method::PaymentMethod,
};

/// Caller's request to charge a subscription.
///
/// Amount and currency fall back to the subscription's price snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Opaque card or wallet token handed to the gateway
    pub payment_token: Option<String>,
    pub description: Option<String>,
}

/// What the gateway answered for one attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub successful: bool,
    pub transaction_id: Option<String>,
    pub error_message: Option<String>,
    /// Raw gateway payload, stored for reconciliation
    pub raw_response: serde_json::Value,
}

impl GatewayResponse {
    pub fn approved(transaction_id: impl Into<String>, raw_response: serde_json::Value) -> Self {
        Self {
            successful: true,
            transaction_id: Some(transaction_id.into()),
            error_message: None,
            raw_response,
        }
    }

    pub fn declined(message: Option<String>, raw_response: serde_json::Value) -> Self {
        Self {
            successful: false,
            transaction_id: None,
            error_message: message,
            raw_response,
        }
    }
}

/// External payment gateway.
///
/// A business decline is an `Ok` response with `successful = false`.
/// Transport faults are returned as `AppError::Gateway`.
#[async_trait]
pub trait PaymentGatewayPort: Send + Sync {
    async fn attempt(
        &self,
        payment: &PaymentProfile,
        request: &PaymentRequest,
    ) -> AppResult<GatewayResponse>;
}
