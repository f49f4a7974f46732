use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        access::AccessPolicy,
        validators::{is_valid_currency, is_valid_plan_name},
    },
    domain::entities::{billing_period::BillingPeriod, role_level::Actor, usage::PlanLimits},
};

// ============================================================================
// Profile Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PlanProfile {
    pub id: Uuid,
    /// Catalog key, unique and fixed once a subscription references the plan
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub billing_period: BillingPeriod,
    pub trial_days: i32,
    pub limits: PlanLimits,
    pub features: Vec<String>,
    pub is_public: bool,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PlanProfile {
    pub fn has_trial(&self) -> bool {
        self.trial_days > 0
    }
}

// ============================================================================
// Input Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlanInput {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    #[serde(default)]
    pub billing_period: BillingPeriod,
    #[serde(default)]
    pub trial_days: i32,
    #[serde(default)]
    pub limits: PlanLimits,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_true() -> bool {
    true
}

/// Partial plan update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePlanInput {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub billing_period: Option<BillingPeriod>,
    pub trial_days: Option<i32>,
    pub limits: Option<PlanLimits>,
    pub features: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub sort_order: Option<i32>,
}

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait PlanRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<PlanProfile>>;
    async fn get_by_name(&self, name: &str) -> AppResult<Option<PlanProfile>>;
    /// Ordered by sort order, then name
    async fn list(&self, include_inactive: bool) -> AppResult<Vec<PlanProfile>>;
    async fn create(&self, input: &CreatePlanInput) -> AppResult<PlanProfile>;
    async fn update(&self, id: Uuid, input: &UpdatePlanInput) -> AppResult<PlanProfile>;
    async fn set_active(&self, id: Uuid, is_active: bool) -> AppResult<PlanProfile>;
    /// Number of subscriptions, in any status, referencing the plan
    async fn count_subscriptions(&self, plan_id: Uuid) -> AppResult<i64>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct PlanCatalogUseCases {
    plan_repo: Arc<dyn PlanRepo>,
    access: Arc<dyn AccessPolicy>,
}

impl PlanCatalogUseCases {
    pub fn new(plan_repo: Arc<dyn PlanRepo>, access: Arc<dyn AccessPolicy>) -> Self {
        Self { plan_repo, access }
    }

    fn require_system_admin(&self, actor: &Actor) -> AppResult<()> {
        if !self.access.is_system_administrator(actor) {
            tracing::warn!(
                user_id = %actor.user_id,
                role = %actor.role,
                "Plan catalog mutation requires system administrator"
            );
            return Err(AppError::Forbidden);
        }
        Ok(())
    }

    pub async fn get_plan(&self, plan_id: Uuid) -> AppResult<PlanProfile> {
        self.plan_repo
            .get_by_id(plan_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Plan lookup for new subscriptions and plan changes; inactive plans count as missing.
    pub async fn get_plan_by_name(&self, name: &str) -> AppResult<PlanProfile> {
        self.plan_repo
            .get_by_name(name.trim())
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn list_plans(&self, include_inactive: bool) -> AppResult<Vec<PlanProfile>> {
        self.plan_repo.list(include_inactive).await
    }

    pub async fn create_plan(
        &self,
        actor: &Actor,
        mut input: CreatePlanInput,
    ) -> AppResult<PlanProfile> {
        self.require_system_admin(actor)?;

        input.name = input.name.trim().to_string();
        input.display_name = input.display_name.trim().to_string();
        input.currency = input.currency.trim().to_uppercase();

        if !is_valid_plan_name(&input.name) {
            return Err(AppError::InvalidInput(
                "Plan name must be 1-50 lowercase letters, digits, '-' or '_'".into(),
            ));
        }
        validate_plan_fields(
            &input.display_name,
            input.price,
            &input.currency,
            input.trial_days,
            &input.limits,
        )?;

        if self.plan_repo.get_by_name(&input.name).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "A plan named '{}' already exists",
                input.name
            )));
        }

        let plan = self.plan_repo.create(&input).await?;
        tracing::info!(
            plan_id = %plan.id,
            plan_name = %plan.name,
            user_id = %actor.user_id,
            "Created plan"
        );
        Ok(plan)
    }

    pub async fn update_plan(
        &self,
        actor: &Actor,
        plan_id: Uuid,
        mut input: UpdatePlanInput,
    ) -> AppResult<PlanProfile> {
        self.require_system_admin(actor)?;
        let plan = self.get_plan(plan_id).await?;

        if let Some(name) = input.name.take() {
            let name = name.trim().to_string();
            if name != plan.name {
                if !is_valid_plan_name(&name) {
                    return Err(AppError::InvalidInput(
                        "Plan name must be 1-50 lowercase letters, digits, '-' or '_'".into(),
                    ));
                }
                if self.plan_repo.count_subscriptions(plan_id).await? > 0 {
                    return Err(AppError::Conflict(
                        "Plan name cannot change once a subscription references it".into(),
                    ));
                }
                if self.plan_repo.get_by_name(&name).await?.is_some() {
                    return Err(AppError::Conflict(format!(
                        "A plan named '{}' already exists",
                        name
                    )));
                }
                input.name = Some(name);
            }
        }

        if let Some(display_name) = input.display_name.as_mut() {
            *display_name = display_name.trim().to_string();
        }
        if let Some(currency) = input.currency.as_mut() {
            *currency = currency.trim().to_uppercase();
        }

        // Validate the merged result so a patch can't produce an invalid plan
        validate_plan_fields(
            input.display_name.as_deref().unwrap_or(&plan.display_name),
            input.price.unwrap_or(plan.price),
            input.currency.as_deref().unwrap_or(&plan.currency),
            input.trial_days.unwrap_or(plan.trial_days),
            input.limits.as_ref().unwrap_or(&plan.limits),
        )?;

        let updated = self.plan_repo.update(plan_id, &input).await?;
        tracing::info!(plan_id = %plan_id, user_id = %actor.user_id, "Updated plan");
        Ok(updated)
    }

    /// Soft-deactivate a plan. Existing subscriptions keep their price snapshot.
    pub async fn deactivate_plan(&self, actor: &Actor, plan_id: Uuid) -> AppResult<PlanProfile> {
        self.require_system_admin(actor)?;
        let plan = self.get_plan(plan_id).await?;
        if !plan.is_active {
            return Ok(plan);
        }

        let plan = self.plan_repo.set_active(plan_id, false).await?;
        tracing::info!(plan_id = %plan_id, user_id = %actor.user_id, "Deactivated plan");
        Ok(plan)
    }
}

fn validate_plan_fields(
    display_name: &str,
    price: Decimal,
    currency: &str,
    trial_days: i32,
    limits: &PlanLimits,
) -> AppResult<()> {
    if display_name.is_empty() {
        return Err(AppError::InvalidInput("Display name is required".into()));
    }
    if price < Decimal::ZERO {
        return Err(AppError::InvalidInput("Price cannot be negative".into()));
    }
    if price.normalize().scale() > 2 {
        return Err(AppError::InvalidInput(
            "Price cannot have more than two decimal places".into(),
        ));
    }
    if !is_valid_currency(currency) {
        return Err(AppError::InvalidInput(
            "Currency must be a three-letter code".into(),
        ));
    }
    if trial_days < 0 {
        return Err(AppError::InvalidInput("Trial days cannot be negative".into()));
    }
    if let Some(resource) = limits.first_negative() {
        return Err(AppError::InvalidInput(format!(
            "Limit for {} cannot be negative",
            resource
        )));
    }
    Ok(())
}
