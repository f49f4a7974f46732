use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::payment::{
        NewPayment, PaymentProfile, PaymentRepo, PaymentTotals, TerminalUpdate,
    },
    domain::entities::payment_status::PaymentStatus,
};

fn row_to_profile(row: &sqlx::postgres::PgRow) -> PaymentProfile {
    PaymentProfile {
        id: row.get("id"),
        subscription_id: row.get("subscription_id"),
        amount: row.get("amount"),
        currency: row.get("currency"),
        payment_method: row.get("payment_method"),
        status: row.get("status"),
        transaction_id: row.get("transaction_id"),
        failure_reason: row.get("failure_reason"),
        gateway_response: row.get("gateway_response"),
        description: row.get("description"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        processed_at: row.get("processed_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, subscription_id, amount, currency, payment_method, status, transaction_id,
    failure_reason, gateway_response, description, created_by, created_at, updated_at,
    processed_at
"#;

#[async_trait]
impl PaymentRepo for PostgresPersistence {
    async fn create_pending(&self, input: &NewPayment) -> AppResult<PaymentProfile> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscription_payments
                (id, subscription_id, amount, currency, payment_method, status, description, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(input.subscription_id)
        .bind(input.amount)
        .bind(&input.currency)
        .bind(input.payment_method)
        .bind(PaymentStatus::Pending)
        .bind(&input.description)
        .bind(input.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(&row))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<PaymentProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscription_payments WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn list_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> AppResult<Vec<PaymentProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscription_payments WHERE subscription_id = $1 ORDER BY created_at DESC",
            SELECT_COLS
        ))
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_profile).collect())
    }

    async fn finalize(
        &self,
        id: Uuid,
        update: &TerminalUpdate,
    ) -> AppResult<Option<PaymentProfile>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE subscription_payments SET
                status = $2,
                transaction_id = $3,
                failure_reason = $4,
                gateway_response = $5,
                processed_at = $6,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(update.status)
        .bind(&update.transaction_id)
        .bind(&update.failure_reason)
        .bind(&update.gateway_response)
        .bind(update.processed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn totals_for_subscription(&self, subscription_id: Uuid) -> AppResult<PaymentTotals> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'completed') AS completed_count,
                COALESCE(SUM(amount) FILTER (WHERE status = 'completed'), 0) AS completed_amount,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed_count
            FROM subscription_payments
            WHERE subscription_id = $1
            "#,
        )
        .bind(subscription_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(PaymentTotals {
            completed_count: row.get("completed_count"),
            completed_amount: row.get("completed_amount"),
            failed_count: row.get("failed_count"),
        })
    }

    async fn completed_amount_between(
        &self,
        subscription_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Decimal> {
        let amount: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM subscription_payments
            WHERE subscription_id = $1
              AND status = 'completed'
              AND created_at >= $2
              AND created_at < $3
            "#,
        )
        .bind(subscription_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(amount)
    }
}
