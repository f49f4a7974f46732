use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::{
        BillingInfo, BillingPatch, Cancellation, NewSubscription, PlanSwitch,
        SubscriptionProfile, SubscriptionRepo, TrialActivation,
    },
    domain::entities::{
        subscription_status::SubscriptionStatus,
        usage::{UsageCounters, UsageDeltas},
    },
};

fn row_to_profile(row: &sqlx::postgres::PgRow) -> SubscriptionProfile {
    SubscriptionProfile {
        id: row.get("id"),
        campus_id: row.get("campus_id"),
        plan_id: row.get("plan_id"),
        status: row.get("status"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        trial_end_date: row.get("trial_end_date"),
        next_billing_date: row.get("next_billing_date"),
        price: row.get("price"),
        currency: row.get("currency"),
        auto_renew: row.get("auto_renew"),
        cancellation_reason: row.get("cancellation_reason"),
        canceled_at: row.get("canceled_at"),
        grace_period_end: row.get("grace_period_end"),
        billing: BillingInfo {
            billing_name: row.get("billing_name"),
            billing_email: row.get("billing_email"),
            billing_phone: row.get("billing_phone"),
            billing_address: row.get("billing_address"),
            tax_id: row.get("tax_id"),
            tax_office: row.get("tax_office"),
        },
        usage: UsageCounters {
            schools: row.get("current_schools"),
            users: row.get("current_users"),
            appointments_this_month: row.get("current_appointments_this_month"),
            gallery_items: row.get("current_gallery_items"),
            posts_this_month: row.get("current_posts_this_month"),
            storage_used_mb: row.get("storage_used_mb"),
        },
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, campus_id, plan_id, status, start_date, end_date, trial_end_date, next_billing_date,
    price, currency, auto_renew, cancellation_reason, canceled_at, grace_period_end,
    billing_name, billing_email, billing_phone, billing_address, tax_id, tax_office,
    current_schools, current_users, current_appointments_this_month, current_gallery_items,
    current_posts_this_month, storage_used_mb, created_by, created_at, updated_at
"#;

const LIVE_STATUSES: &str = "('trial', 'active')";

/// Counter columns in the order their deltas are bound, starting at `$2`.
const USAGE_COLUMNS: [&str; 6] = [
    "current_schools",
    "current_users",
    "current_appointments_this_month",
    "current_gallery_items",
    "current_posts_this_month",
    "storage_used_mb",
];

/// Counters saturate at both ends, matching `UsageDeltas::apply_to`.
/// The sum is taken in numeric so it can't overflow bigint.
fn usage_update_sql() -> String {
    let assignments = USAGE_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, col)| {
            format!(
                "{col} = LEAST(GREATEST({col}::numeric + ${}, 0), {})::bigint",
                i + 2,
                i64::MAX
            )
        })
        .collect::<Vec<_>>()
        .join(",\n                ");
    format!(
        r#"
            UPDATE campus_subscriptions SET
                {assignments},
                updated_at = NOW()
            WHERE campus_id = $1 AND status IN {LIVE_STATUSES}
            RETURNING {SELECT_COLS}
            "#
    )
}

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM campus_subscriptions WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn get_live_by_campus(
        &self,
        campus_id: Uuid,
    ) -> AppResult<Option<SubscriptionProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM campus_subscriptions WHERE campus_id = $1 AND status IN {} ORDER BY created_at DESC LIMIT 1",
            SELECT_COLS, LIVE_STATUSES
        ))
        .bind(campus_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn list_by_campus(&self, campus_id: Uuid) -> AppResult<Vec<SubscriptionProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM campus_subscriptions WHERE campus_id = $1 ORDER BY created_at DESC",
            SELECT_COLS
        ))
        .bind(campus_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_profile).collect())
    }

    async fn create_for_campus(&self, input: &NewSubscription) -> AppResult<SubscriptionProfile> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        // Row lock on the campus serializes creators across processes
        let campus: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM campuses WHERE id = $1 FOR UPDATE")
                .bind(input.campus_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(AppError::from)?;
        if campus.is_none() {
            return Err(AppError::NotFound);
        }

        let live: Option<Uuid> = sqlx::query_scalar(&format!(
            "SELECT id FROM campus_subscriptions WHERE campus_id = $1 AND status IN {} LIMIT 1",
            LIVE_STATUSES
        ))
        .bind(input.campus_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?;
        if live.is_some() {
            return Err(AppError::Conflict(
                "Campus already has an active or trial subscription".into(),
            ));
        }

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO campus_subscriptions
                (id, campus_id, plan_id, status, start_date, end_date, trial_end_date,
                 next_billing_date, price, currency, auto_renew,
                 billing_name, billing_email, billing_phone, billing_address, tax_id, tax_office,
                 created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(input.campus_id)
        .bind(input.plan_id)
        .bind(input.status)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.trial_end_date)
        .bind(input.next_billing_date)
        .bind(input.price)
        .bind(&input.currency)
        .bind(input.auto_renew)
        .bind(&input.billing.billing_name)
        .bind(&input.billing.billing_email)
        .bind(&input.billing.billing_phone)
        .bind(&input.billing.billing_address)
        .bind(&input.billing.tax_id)
        .bind(&input.billing.tax_office)
        .bind(input.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)?;

        sqlx::query("UPDATE campuses SET is_subscribed = true WHERE id = $1")
            .bind(input.campus_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;
        Ok(row_to_profile(&row))
    }

    async fn cancel(
        &self,
        id: Uuid,
        cancellation: &Cancellation,
    ) -> AppResult<Option<SubscriptionProfile>> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE campus_subscriptions SET
                status = $2,
                auto_renew = false,
                cancellation_reason = $3,
                canceled_at = $4,
                grace_period_end = $5,
                updated_at = NOW()
            WHERE id = $1 AND status IN {}
            RETURNING {}
            "#,
            LIVE_STATUSES, SELECT_COLS
        ))
        .bind(id)
        .bind(SubscriptionStatus::Canceled)
        .bind(&cancellation.reason)
        .bind(cancellation.canceled_at)
        .bind(cancellation.grace_period_end)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?;

        let Some(row) = row else {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(None);
        };
        let canceled = row_to_profile(&row);

        if cancellation.clear_campus_flag {
            sqlx::query("UPDATE campuses SET is_subscribed = false WHERE id = $1")
                .bind(canceled.campus_id)
                .execute(&mut *tx)
                .await
                .map_err(AppError::from)?;
        }

        tx.commit().await.map_err(AppError::from)?;
        Ok(Some(canceled))
    }

    async fn switch_plan(
        &self,
        id: Uuid,
        switch: &PlanSwitch,
    ) -> AppResult<Option<SubscriptionProfile>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE campus_subscriptions SET
                plan_id = $2, price = $3, currency = $4, updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(switch.plan_id)
        .bind(switch.price)
        .bind(&switch.currency)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn update_billing(
        &self,
        id: Uuid,
        patch: &BillingPatch,
    ) -> AppResult<SubscriptionProfile> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE campus_subscriptions SET
                billing_name = COALESCE($2, billing_name),
                billing_email = COALESCE($3, billing_email),
                billing_phone = COALESCE($4, billing_phone),
                billing_address = COALESCE($5, billing_address),
                tax_id = COALESCE($6, tax_id),
                tax_office = COALESCE($7, tax_office),
                auto_renew = COALESCE($8, auto_renew),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(&patch.billing_name)
        .bind(&patch.billing_email)
        .bind(&patch.billing_phone)
        .bind(&patch.billing_address)
        .bind(&patch.tax_id)
        .bind(&patch.tax_office)
        .bind(patch.auto_renew)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.as_ref().map(row_to_profile).ok_or(AppError::NotFound)
    }

    async fn activate_trial(
        &self,
        id: Uuid,
        activation: &TrialActivation,
    ) -> AppResult<Option<SubscriptionProfile>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE campus_subscriptions SET
                status = $2, start_date = $3, end_date = $4, next_billing_date = $5,
                updated_at = NOW()
            WHERE id = $1 AND status = 'trial'
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(SubscriptionStatus::Active)
        .bind(activation.start_date)
        .bind(activation.end_date)
        .bind(activation.next_billing_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn apply_usage_deltas(
        &self,
        campus_id: Uuid,
        deltas: &UsageDeltas,
    ) -> AppResult<Option<SubscriptionProfile>> {
        // One statement, so concurrent emitters can't lose updates
        let row = sqlx::query(&usage_update_sql())
            .bind(campus_id)
            .bind(deltas.schools)
            .bind(deltas.users)
            .bind(deltas.appointments_this_month)
            .bind(deltas.gallery_items)
            .bind(deltas.posts_this_month)
            .bind(deltas.storage_used_mb)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }
}
