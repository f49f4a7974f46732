use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::{app_error::AppResult, application::use_cases::payment::PaymentProfile};

/// Invoice confirmation returned by the invoicing collaborator
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceProfile {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub invoice_number: String,
    pub amount: Decimal,
    pub currency: String,
    pub issued_at: DateTime<Utc>,
}

#[async_trait]
pub trait InvoiceGenerator: Send + Sync {
    /// Issue an invoice for a completed payment. Idempotent per payment id.
    async fn create_invoice_for_payment(&self, payment: &PaymentProfile)
    -> AppResult<InvoiceProfile>;
}

/// Human-readable invoice number, e.g. `INV-20250415-1A2B3C4D`.
pub fn invoice_number(payment_id: Uuid, issued_at: DateTime<Utc>) -> String {
    let simple = payment_id.simple().to_string().to_uppercase();
    format!("INV-{}-{}", issued_at.format("%Y%m%d"), &simple[..8])
}
