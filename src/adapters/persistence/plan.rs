use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, parse_json_with_fallback},
    app_error::{AppError, AppResult},
    application::use_cases::plan_catalog::{CreatePlanInput, PlanProfile, PlanRepo, UpdatePlanInput},
    domain::entities::usage::PlanLimits,
};

fn row_to_profile(row: sqlx::postgres::PgRow) -> PlanProfile {
    let id: Uuid = row.get("id");
    let features_json: serde_json::Value = row.get("features");
    let features: Vec<String> =
        parse_json_with_fallback(&features_json, "features", "subscription_plan", &id.to_string());

    PlanProfile {
        id,
        name: row.get("name"),
        display_name: row.get("display_name"),
        description: row.get("description"),
        price: row.get("price"),
        currency: row.get("currency"),
        billing_period: row.get("billing_period"),
        trial_days: row.get("trial_days"),
        limits: PlanLimits {
            max_schools: row.get("max_schools"),
            max_users: row.get("max_users"),
            max_appointments_per_month: row.get("max_appointments_per_month"),
            max_gallery_items: row.get("max_gallery_items"),
            max_posts_per_month: row.get("max_posts_per_month"),
            storage_quota_mb: row.get("storage_quota_mb"),
        },
        features,
        is_public: row.get("is_public"),
        sort_order: row.get("sort_order"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, name, display_name, description, price, currency, billing_period, trial_days,
    max_schools, max_users, max_appointments_per_month, max_gallery_items,
    max_posts_per_month, storage_quota_mb, features, is_public, sort_order, is_active,
    created_at, updated_at
"#;

#[async_trait]
impl PlanRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<PlanProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscription_plans WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }

    async fn get_by_name(&self, name: &str) -> AppResult<Option<PlanProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscription_plans WHERE name = $1",
            SELECT_COLS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }

    async fn list(&self, include_inactive: bool) -> AppResult<Vec<PlanProfile>> {
        let query = if include_inactive {
            format!(
                "SELECT {} FROM subscription_plans ORDER BY sort_order, name",
                SELECT_COLS
            )
        } else {
            format!(
                "SELECT {} FROM subscription_plans WHERE is_active = true ORDER BY sort_order, name",
                SELECT_COLS
            )
        };
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_profile).collect())
    }

    async fn create(&self, input: &CreatePlanInput) -> AppResult<PlanProfile> {
        let features_json = serde_json::to_value(&input.features).unwrap_or(serde_json::json!([]));

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscription_plans
                (id, name, display_name, description, price, currency, billing_period, trial_days,
                 max_schools, max_users, max_appointments_per_month, max_gallery_items,
                 max_posts_per_month, storage_quota_mb, features, is_public, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.display_name)
        .bind(&input.description)
        .bind(input.price)
        .bind(&input.currency)
        .bind(input.billing_period)
        .bind(input.trial_days)
        .bind(input.limits.max_schools)
        .bind(input.limits.max_users)
        .bind(input.limits.max_appointments_per_month)
        .bind(input.limits.max_gallery_items)
        .bind(input.limits.max_posts_per_month)
        .bind(input.limits.storage_quota_mb)
        .bind(features_json)
        .bind(input.is_public)
        .bind(input.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(row))
    }

    async fn update(&self, id: Uuid, input: &UpdatePlanInput) -> AppResult<PlanProfile> {
        let features_json = input
            .features
            .as_ref()
            .map(|f| serde_json::to_value(f).unwrap_or(serde_json::json!([])));
        let limits = input.limits.as_ref();

        let row = sqlx::query(&format!(
            r#"
            UPDATE subscription_plans SET
                name = COALESCE($2, name),
                display_name = COALESCE($3, display_name),
                description = COALESCE($4, description),
                price = COALESCE($5, price),
                currency = COALESCE($6, currency),
                billing_period = COALESCE($7, billing_period),
                trial_days = COALESCE($8, trial_days),
                max_schools = COALESCE($9, max_schools),
                max_users = COALESCE($10, max_users),
                max_appointments_per_month = COALESCE($11, max_appointments_per_month),
                max_gallery_items = COALESCE($12, max_gallery_items),
                max_posts_per_month = COALESCE($13, max_posts_per_month),
                storage_quota_mb = COALESCE($14, storage_quota_mb),
                features = COALESCE($15, features),
                is_public = COALESCE($16, is_public),
                sort_order = COALESCE($17, sort_order),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.display_name)
        .bind(&input.description)
        .bind(input.price)
        .bind(&input.currency)
        .bind(input.billing_period)
        .bind(input.trial_days)
        .bind(limits.map(|l| l.max_schools))
        .bind(limits.map(|l| l.max_users))
        .bind(limits.map(|l| l.max_appointments_per_month))
        .bind(limits.map(|l| l.max_gallery_items))
        .bind(limits.map(|l| l.max_posts_per_month))
        .bind(limits.map(|l| l.storage_quota_mb))
        .bind(features_json)
        .bind(input.is_public)
        .bind(input.sort_order)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.map(row_to_profile).ok_or(AppError::NotFound)
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> AppResult<PlanProfile> {
        let row = sqlx::query(&format!(
            "UPDATE subscription_plans SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            SELECT_COLS
        ))
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.map(row_to_profile).ok_or(AppError::NotFound)
    }

    async fn count_subscriptions(&self, plan_id: Uuid) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM campus_subscriptions WHERE plan_id = $1")
                .bind(plan_id)
                .fetch_one(&self.pool)
                .await
                .map_err(AppError::from)?;
        Ok(count)
    }
}
