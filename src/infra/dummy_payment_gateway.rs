use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_gateway::{GatewayResponse, PaymentGatewayPort, PaymentRequest},
        use_cases::payment::PaymentProfile,
    },
    domain::entities::payment_scenario::PaymentScenario,
};

/// Local gateway simulator for development and demos.
///
/// The payment token picks the outcome (see [`PaymentScenario::from_token`]);
/// no external calls are made.
#[derive(Clone, Copy, Default)]
pub struct DummyPaymentGateway;

impl DummyPaymentGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentGatewayPort for DummyPaymentGateway {
    async fn attempt(
        &self,
        payment: &PaymentProfile,
        request: &PaymentRequest,
    ) -> AppResult<GatewayResponse> {
        let scenario = request
            .payment_token
            .as_deref()
            .map(PaymentScenario::from_token)
            .unwrap_or_default();

        tracing::debug!(
            payment_id = %payment.id,
            scenario = %scenario,
            "Dummy gateway attempt"
        );

        if scenario == PaymentScenario::NetworkError {
            return Err(AppError::Gateway("Unable to reach payment gateway".into()));
        }

        let raw = serde_json::json!({
            "provider": "dummy",
            "scenario": scenario.as_ref(),
            "amount": format!("{:.2}", payment.amount),
            "currency": payment.currency,
        });

        match scenario.decline_message() {
            Some(message) => Ok(GatewayResponse::declined(Some(message.to_string()), raw)),
            None => Ok(GatewayResponse::approved(
                format!("dummy_txn_{}", Uuid::new_v4().simple()),
                raw,
            )),
        }
    }
}
