use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_gateway::{GatewayResponse, PaymentGatewayPort, PaymentRequest},
        use_cases::payment::PaymentProfile,
    },
};

/// Card gateway reached over HTTPS.
///
/// `POST {base_url}charges` with the payment id as idempotency key. 2xx and 4xx
/// answers carry a verdict; anything else is a transport fault.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    charges_url: Url,
    api_key: SecretString,
}

impl HttpPaymentGateway {
    pub fn new(client: Client, base_url: &Url, api_key: SecretString) -> AppResult<Self> {
        let charges_url = base_url
            .join("charges")
            .map_err(|e| AppError::Internal(format!("Invalid payment gateway URL: {e}")))?;
        Ok(Self {
            client,
            charges_url,
            api_key,
        })
    }
}

#[derive(Serialize)]
struct ChargeReq<'a> {
    reference: Uuid,
    amount: String,
    currency: &'a str,
    payment_method: &'a str,
    payment_token: Option<&'a str>,
    description: Option<&'a str>,
}

#[derive(Deserialize, Default)]
struct ChargeResp {
    #[serde(default)]
    approved: bool,
    transaction_id: Option<String>,
    message: Option<String>,
}

#[async_trait]
impl PaymentGatewayPort for HttpPaymentGateway {
    async fn attempt(
        &self,
        payment: &PaymentProfile,
        request: &PaymentRequest,
    ) -> AppResult<GatewayResponse> {
        let body = ChargeReq {
            reference: payment.id,
            amount: format!("{:.2}", payment.amount),
            currency: &payment.currency,
            payment_method: payment.payment_method.as_ref(),
            payment_token: request.payment_token.as_deref(),
            description: payment.description.as_deref(),
        };

        let response = self
            .client
            .post(self.charges_url.clone())
            .bearer_auth(self.api_key.expose_secret())
            .header("Idempotency-Key", payment.id.to_string())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Payment gateway unreachable: {e}")))?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::Gateway(format!(
                "Payment gateway returned {status}"
            )));
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Invalid payment gateway response: {e}")))?;
        let parsed: ChargeResp = serde_json::from_value(raw.clone()).unwrap_or_default();

        tracing::debug!(
            payment_id = %payment.id,
            http_status = %status,
            approved = parsed.approved,
            "Payment gateway answered"
        );

        match (status.is_success() && parsed.approved, parsed.transaction_id) {
            (true, Some(transaction_id)) => Ok(GatewayResponse::approved(transaction_id, raw)),
            (true, None) => Err(AppError::Gateway(
                "Payment gateway approved without a transaction id".into(),
            )),
            (false, _) => Ok(GatewayResponse::declined(parsed.message, raw)),
        }
    }
}
