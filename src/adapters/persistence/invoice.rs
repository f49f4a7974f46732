use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::{
        ports::invoicing::{InvoiceGenerator, InvoiceProfile, invoice_number},
        use_cases::payment::PaymentProfile,
    },
};

fn row_to_profile(row: sqlx::postgres::PgRow) -> InvoiceProfile {
    InvoiceProfile {
        id: row.get("id"),
        payment_id: row.get("payment_id"),
        invoice_number: row.get("invoice_number"),
        amount: row.get("amount"),
        currency: row.get("currency"),
        issued_at: row.get("issued_at"),
    }
}

const SELECT_COLS: &str = "id, payment_id, invoice_number, amount, currency, issued_at";

/// One invoice per completed payment; a repeated request returns the existing one.
#[async_trait]
impl InvoiceGenerator for PostgresPersistence {
    async fn create_invoice_for_payment(
        &self,
        payment: &PaymentProfile,
    ) -> AppResult<InvoiceProfile> {
        let issued_at = Utc::now();
        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO invoices (id, payment_id, invoice_number, amount, currency, issued_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (payment_id) DO NOTHING
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(payment.id)
        .bind(invoice_number(payment.id, issued_at))
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(issued_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        if let Some(row) = inserted {
            return Ok(row_to_profile(row));
        }

        let existing = sqlx::query(&format!(
            "SELECT {} FROM invoices WHERE payment_id = $1",
            SELECT_COLS
        ))
        .bind(payment.id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(existing))
    }
}
