use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        access::AccessPolicy,
        entity_locks::EntityLocks,
        helpers::billing_math::{Proration, prorate, round_money},
        ports::{
            notifications::{BillingNotice, NoticeKind, NotificationSender, dispatch},
            pricing::CouponPricing,
        },
        use_cases::{
            campus::CampusRepo,
            plan_catalog::{PlanProfile, PlanRepo},
        },
        validators::is_valid_email,
    },
    domain::entities::{
        payment_method::PaymentMethod,
        role_level::Actor,
        subscription_status::SubscriptionStatus,
        usage::{ResourceUsage, UsageCounters, UsageDeltas, usage_report},
    },
};

// ============================================================================
// Profile Types
// ============================================================================

/// Billing contact fields of a subscription
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingInfo {
    pub billing_name: Option<String>,
    pub billing_email: Option<String>,
    pub billing_phone: Option<String>,
    pub billing_address: Option<String>,
    pub tax_id: Option<String>,
    pub tax_office: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionProfile {
    pub id: Uuid,
    pub campus_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub trial_end_date: Option<DateTime<Utc>>,
    pub next_billing_date: Option<DateTime<Utc>>,
    /// Price snapshot, decoupled from later plan edits
    pub price: Decimal,
    pub currency: String,
    pub auto_renew: bool,
    pub cancellation_reason: Option<String>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub grace_period_end: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub billing: BillingInfo,
    pub usage: UsageCounters,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Outcome of a plan change, reported to the caller. Nothing is charged.
#[derive(Debug, Clone, Serialize)]
pub struct PlanChangeSummary {
    pub old_plan_id: Uuid,
    pub new_plan_id: Uuid,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub currency: String,
    /// Positive is owed by the campus, negative is a credit
    pub prorated_amount: Decimal,
    pub remaining_days: i64,
    pub period_days: i64,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanChangeOutcome {
    pub subscription: SubscriptionProfile,
    pub summary: PlanChangeSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageLimitsReport {
    pub subscription_id: Uuid,
    pub campus_id: Uuid,
    pub plan_id: Uuid,
    pub resources: Vec<ResourceUsage>,
}

// ============================================================================
// Input Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriptionInput {
    pub campus_id: Uuid,
    pub plan_id: Uuid,
    #[serde(flatten)]
    pub billing: BillingInfo,
    #[serde(default = "default_auto_renew")]
    pub auto_renew: bool,
    pub coupon_code: Option<String>,
}

fn default_auto_renew() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelSubscriptionInput {
    pub reason: Option<String>,
    #[serde(default)]
    pub immediate: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePlanInput {
    pub new_plan_id: Uuid,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// Partial update of billing details. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingPatch {
    pub billing_name: Option<String>,
    pub billing_email: Option<String>,
    pub billing_phone: Option<String>,
    pub billing_address: Option<String>,
    pub tax_id: Option<String>,
    pub tax_office: Option<String>,
    pub auto_renew: Option<bool>,
}

impl BillingPatch {
    pub fn is_empty(&self) -> bool {
        self.billing_name.is_none()
            && self.billing_email.is_none()
            && self.billing_phone.is_none()
            && self.billing_address.is_none()
            && self.tax_id.is_none()
            && self.tax_office.is_none()
            && self.auto_renew.is_none()
    }

    pub fn apply_to(&self, subscription: &mut SubscriptionProfile) {
        let billing = &mut subscription.billing;
        if let Some(v) = &self.billing_name {
            billing.billing_name = Some(v.clone());
        }
        if let Some(v) = &self.billing_email {
            billing.billing_email = Some(v.clone());
        }
        if let Some(v) = &self.billing_phone {
            billing.billing_phone = Some(v.clone());
        }
        if let Some(v) = &self.billing_address {
            billing.billing_address = Some(v.clone());
        }
        if let Some(v) = &self.tax_id {
            billing.tax_id = Some(v.clone());
        }
        if let Some(v) = &self.tax_office {
            billing.tax_office = Some(v.clone());
        }
        if let Some(v) = self.auto_renew {
            subscription.auto_renew = v;
        }
    }
}

// ============================================================================
// Repository Write Models
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub campus_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub trial_end_date: Option<DateTime<Utc>>,
    pub next_billing_date: Option<DateTime<Utc>>,
    pub price: Decimal,
    pub currency: String,
    pub auto_renew: bool,
    pub billing: BillingInfo,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct Cancellation {
    pub reason: Option<String>,
    pub canceled_at: DateTime<Utc>,
    pub grace_period_end: DateTime<Utc>,
    /// Clear the campus subscribed flag in the same transaction
    pub clear_campus_flag: bool,
}

#[derive(Debug, Clone)]
pub struct PlanSwitch {
    pub plan_id: Uuid,
    pub price: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct TrialActivation {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub next_billing_date: DateTime<Utc>,
}

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionProfile>>;

    /// The campus's ACTIVE or TRIAL subscription
    async fn get_live_by_campus(&self, campus_id: Uuid)
    -> AppResult<Option<SubscriptionProfile>>;

    /// All subscriptions of a campus, newest first
    async fn list_by_campus(&self, campus_id: Uuid) -> AppResult<Vec<SubscriptionProfile>>;

    /// Insert the subscription and mark the campus subscribed atomically.
    /// `Conflict` if the campus already holds a live subscription.
    async fn create_for_campus(&self, input: &NewSubscription) -> AppResult<SubscriptionProfile>;

    /// Cancel a live subscription. `None` if its status no longer allows it.
    async fn cancel(
        &self,
        id: Uuid,
        cancellation: &Cancellation,
    ) -> AppResult<Option<SubscriptionProfile>>;

    /// Swap plan and price snapshot of an ACTIVE subscription. `None` if not ACTIVE.
    async fn switch_plan(
        &self,
        id: Uuid,
        switch: &PlanSwitch,
    ) -> AppResult<Option<SubscriptionProfile>>;

    async fn update_billing(&self, id: Uuid, patch: &BillingPatch)
    -> AppResult<SubscriptionProfile>;

    /// Move a TRIAL subscription to ACTIVE. `None` if not in TRIAL.
    async fn activate_trial(
        &self,
        id: Uuid,
        activation: &TrialActivation,
    ) -> AppResult<Option<SubscriptionProfile>>;

    /// Add signed deltas to the live subscription's counters, clamping each at zero,
    /// as a single atomic write. `None` if the campus has no live subscription.
    async fn apply_usage_deltas(
        &self,
        campus_id: Uuid,
        deltas: &UsageDeltas,
    ) -> AppResult<Option<SubscriptionProfile>>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct SubscriptionUseCases {
    subscription_repo: Arc<dyn SubscriptionRepo>,
    campus_repo: Arc<dyn CampusRepo>,
    plan_repo: Arc<dyn PlanRepo>,
    access: Arc<dyn AccessPolicy>,
    coupons: Arc<dyn CouponPricing>,
    notifier: Arc<dyn NotificationSender>,
    locks: Arc<EntityLocks>,
}

impl SubscriptionUseCases {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepo>,
        campus_repo: Arc<dyn CampusRepo>,
        plan_repo: Arc<dyn PlanRepo>,
        access: Arc<dyn AccessPolicy>,
        coupons: Arc<dyn CouponPricing>,
        notifier: Arc<dyn NotificationSender>,
        locks: Arc<EntityLocks>,
    ) -> Self {
        Self {
            subscription_repo,
            campus_repo,
            plan_repo,
            access,
            coupons,
            notifier,
            locks,
        }
    }

    pub(crate) fn require_manager(&self, actor: &Actor) -> AppResult<()> {
        if !self.access.can_manage_subscriptions(actor) {
            tracing::warn!(
                user_id = %actor.user_id,
                role = %actor.role,
                "Actor may not manage subscriptions"
            );
            return Err(AppError::Forbidden);
        }
        Ok(())
    }

    /// Serialize mutations of one subscription (or one campus, for creation).
    pub(crate) async fn lock(&self, id: Uuid) -> OwnedMutexGuard<()> {
        self.locks.acquire(id).await
    }

    async fn load(&self, subscription_id: Uuid) -> AppResult<SubscriptionProfile> {
        self.subscription_repo
            .get_by_id(subscription_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn load_active_plan(&self, plan_id: Uuid) -> AppResult<PlanProfile> {
        match self.plan_repo.get_by_id(plan_id).await? {
            Some(plan) if plan.is_active => Ok(plan),
            _ => Err(AppError::NotFound),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get_subscription(&self, subscription_id: Uuid) -> AppResult<SubscriptionProfile> {
        self.load(subscription_id).await
    }

    pub async fn get_current_subscription(
        &self,
        campus_id: Uuid,
    ) -> AppResult<Option<SubscriptionProfile>> {
        self.subscription_repo.get_live_by_campus(campus_id).await
    }

    pub async fn list_campus_subscriptions(
        &self,
        campus_id: Uuid,
    ) -> AppResult<Vec<SubscriptionProfile>> {
        self.subscription_repo.list_by_campus(campus_id).await
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub async fn create_subscription(
        &self,
        actor: &Actor,
        mut input: CreateSubscriptionInput,
    ) -> AppResult<SubscriptionProfile> {
        self.require_manager(actor)?;
        normalize_billing(&mut input.billing)?;

        let _guard = self.lock(input.campus_id).await;

        match self.campus_repo.get_by_id(input.campus_id).await? {
            Some(campus) if campus.is_active => {}
            _ => return Err(AppError::NotFound),
        }
        let plan = self.load_active_plan(input.plan_id).await?;

        if let Some(existing) = self
            .subscription_repo
            .get_live_by_campus(input.campus_id)
            .await?
        {
            tracing::debug!(
                campus_id = %input.campus_id,
                existing_subscription_id = %existing.id,
                "Campus already has a live subscription"
            );
            return Err(AppError::Conflict(
                "Campus already has an active or trial subscription".into(),
            ));
        }

        let price = match input.coupon_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                round_money(self.coupons.apply(code, plan.price)).max(Decimal::ZERO)
            }
            _ => plan.price,
        };

        let now = Utc::now();
        let new_subscription = if plan.has_trial() {
            let trial_end = now + Duration::days(i64::from(plan.trial_days));
            NewSubscription {
                campus_id: input.campus_id,
                plan_id: plan.id,
                status: SubscriptionStatus::Trial,
                start_date: now,
                end_date: Some(trial_end),
                trial_end_date: Some(trial_end),
                next_billing_date: Some(trial_end),
                price,
                currency: plan.currency.clone(),
                auto_renew: input.auto_renew,
                billing: input.billing,
                created_by: Some(actor.user_id),
            }
        } else {
            let end = plan.billing_period.advance(now);
            NewSubscription {
                campus_id: input.campus_id,
                plan_id: plan.id,
                status: SubscriptionStatus::Active,
                start_date: now,
                end_date: Some(end),
                trial_end_date: None,
                next_billing_date: Some(end),
                price,
                currency: plan.currency.clone(),
                auto_renew: input.auto_renew,
                billing: input.billing,
                created_by: Some(actor.user_id),
            }
        };

        let subscription = self
            .subscription_repo
            .create_for_campus(&new_subscription)
            .await?;

        tracing::info!(
            subscription_id = %subscription.id,
            campus_id = %subscription.campus_id,
            plan_id = %subscription.plan_id,
            status = %subscription.status,
            user_id = %actor.user_id,
            "Created subscription"
        );

        dispatch(
            self.notifier.clone(),
            BillingNotice {
                recipient: subscription.billing.billing_email.clone(),
                campus_id: subscription.campus_id,
                subscription_id: subscription.id,
                kind: NoticeKind::Welcome {
                    plan_name: plan.display_name.clone(),
                    status: subscription.status,
                    trial_end_date: subscription.trial_end_date,
                },
            },
        );

        Ok(subscription)
    }

    pub async fn cancel_subscription(
        &self,
        actor: &Actor,
        subscription_id: Uuid,
        input: CancelSubscriptionInput,
    ) -> AppResult<SubscriptionProfile> {
        self.require_manager(actor)?;
        let _guard = self.lock(subscription_id).await;

        let subscription = self.load(subscription_id).await?;
        if !subscription
            .status
            .can_transition_to(SubscriptionStatus::Canceled)
        {
            return Err(AppError::Conflict(format!(
                "Subscription is already {}",
                subscription.status
            )));
        }

        let now = Utc::now();
        let cancellation = Cancellation {
            reason: input
                .reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            canceled_at: now,
            grace_period_end: if input.immediate {
                now
            } else {
                subscription.end_date.unwrap_or(now)
            },
            clear_campus_flag: input.immediate,
        };

        let canceled = self
            .subscription_repo
            .cancel(subscription_id, &cancellation)
            .await?
            .ok_or_else(|| AppError::Conflict("Subscription can no longer be canceled".into()))?;

        tracing::info!(
            subscription_id = %subscription_id,
            campus_id = %canceled.campus_id,
            immediate = input.immediate,
            user_id = %actor.user_id,
            "Canceled subscription"
        );

        dispatch(
            self.notifier.clone(),
            BillingNotice {
                recipient: canceled.billing.billing_email.clone(),
                campus_id: canceled.campus_id,
                subscription_id,
                kind: NoticeKind::Cancellation {
                    reason: canceled.cancellation_reason.clone(),
                    immediate: input.immediate,
                    grace_period_end: canceled.grace_period_end,
                },
            },
        );

        Ok(canceled)
    }

    pub async fn change_subscription_plan(
        &self,
        actor: &Actor,
        subscription_id: Uuid,
        input: ChangePlanInput,
    ) -> AppResult<PlanChangeOutcome> {
        self.require_manager(actor)?;
        let _guard = self.lock(subscription_id).await;

        let subscription = self.load(subscription_id).await?;
        if subscription.status != SubscriptionStatus::Active {
            return Err(AppError::Conflict(format!(
                "Only active subscriptions can change plan (status is {})",
                subscription.status
            )));
        }
        if input.new_plan_id == subscription.plan_id {
            return Err(AppError::Conflict(
                "Subscription is already on this plan".into(),
            ));
        }

        let new_plan = self.load_active_plan(input.new_plan_id).await?;
        // Prices are only comparable within one currency
        if new_plan.currency != subscription.currency {
            return Err(AppError::Conflict(format!(
                "Plan is priced in {} but the subscription bills in {}",
                new_plan.currency, subscription.currency
            )));
        }
        let old_plan = self.plan_repo.get_by_id(subscription.plan_id).await?;
        // The running period was set by the old plan's cadence
        let period = old_plan
            .as_ref()
            .map(|p| p.billing_period)
            .unwrap_or(new_plan.billing_period);

        let Proration {
            amount,
            remaining_days,
            period_days,
        } = prorate(
            subscription.price,
            new_plan.price,
            subscription.end_date,
            period,
            Utc::now(),
        );

        let updated = self
            .subscription_repo
            .switch_plan(
                subscription_id,
                &PlanSwitch {
                    plan_id: new_plan.id,
                    price: new_plan.price,
                    currency: new_plan.currency.clone(),
                },
            )
            .await?
            .ok_or_else(|| AppError::Conflict("Subscription is no longer active".into()))?;

        let summary = PlanChangeSummary {
            old_plan_id: subscription.plan_id,
            new_plan_id: new_plan.id,
            old_price: subscription.price,
            new_price: new_plan.price,
            currency: new_plan.currency.clone(),
            prorated_amount: amount,
            remaining_days,
            period_days,
            payment_method: input.payment_method,
        };

        tracing::info!(
            subscription_id = %subscription_id,
            old_plan_id = %summary.old_plan_id,
            new_plan_id = %summary.new_plan_id,
            prorated_amount = %summary.prorated_amount,
            user_id = %actor.user_id,
            "Changed subscription plan"
        );

        dispatch(
            self.notifier.clone(),
            BillingNotice {
                recipient: updated.billing.billing_email.clone(),
                campus_id: updated.campus_id,
                subscription_id,
                kind: NoticeKind::PlanChanged {
                    old_plan_name: old_plan
                        .map(|p| p.display_name)
                        .unwrap_or_else(|| summary.old_plan_id.to_string()),
                    new_plan_name: new_plan.display_name.clone(),
                    prorated_amount: summary.prorated_amount,
                    currency: summary.currency.clone(),
                },
            },
        );

        Ok(PlanChangeOutcome {
            subscription: updated,
            summary,
        })
    }

    pub async fn update_subscription(
        &self,
        actor: &Actor,
        subscription_id: Uuid,
        mut patch: BillingPatch,
    ) -> AppResult<SubscriptionProfile> {
        self.require_manager(actor)?;
        if let Some(email) = patch.billing_email.as_mut() {
            *email = email.trim().to_string();
            if !is_valid_email(email) {
                return Err(AppError::InvalidInput("Invalid billing email".into()));
            }
        }

        let _guard = self.lock(subscription_id).await;
        let subscription = self.load(subscription_id).await?;
        if patch.is_empty() {
            return Ok(subscription);
        }

        let updated = self
            .subscription_repo
            .update_billing(subscription_id, &patch)
            .await?;
        tracing::info!(
            subscription_id = %subscription_id,
            user_id = %actor.user_id,
            "Updated subscription billing details"
        );
        Ok(updated)
    }

    /// Promote a TRIAL subscription to ACTIVE and start its first paid period.
    pub async fn activate_trial(&self, subscription_id: Uuid) -> AppResult<SubscriptionProfile> {
        let _guard = self.lock(subscription_id).await;
        self.activate_trial_while_locked(subscription_id).await
    }

    /// Same as [`Self::activate_trial`]; the caller must hold the subscription lock.
    pub(crate) async fn activate_trial_while_locked(
        &self,
        subscription_id: Uuid,
    ) -> AppResult<SubscriptionProfile> {
        let subscription = self.load(subscription_id).await?;
        if subscription.status != SubscriptionStatus::Trial {
            return Err(AppError::Conflict(format!(
                "Only trial subscriptions can be activated (status is {})",
                subscription.status
            )));
        }

        let plan = self
            .plan_repo
            .get_by_id(subscription.plan_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let now = Utc::now();
        let end = plan.billing_period.advance(now);
        let activated = self
            .subscription_repo
            .activate_trial(
                subscription_id,
                &TrialActivation {
                    start_date: now,
                    end_date: end,
                    next_billing_date: end,
                },
            )
            .await?
            .ok_or_else(|| AppError::Conflict("Subscription is no longer in trial".into()))?;

        tracing::info!(
            subscription_id = %subscription_id,
            plan_id = %plan.id,
            next_billing_date = %end,
            "Activated trial subscription"
        );
        Ok(activated)
    }

    // ========================================================================
    // Usage
    // ========================================================================

    pub async fn check_usage_limits(&self, campus_id: Uuid) -> AppResult<UsageLimitsReport> {
        let subscription = self
            .subscription_repo
            .get_live_by_campus(campus_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let plan = self
            .plan_repo
            .get_by_id(subscription.plan_id)
            .await?
            .ok_or(AppError::NotFound)?;

        Ok(UsageLimitsReport {
            subscription_id: subscription.id,
            campus_id,
            plan_id: plan.id,
            resources: usage_report(&subscription.usage, &plan.limits),
        })
    }

    /// Apply usage deltas to the campus's live subscription.
    ///
    /// Never fails for a campus without a live subscription; usage emitters must not block.
    pub async fn update_usage_counters(
        &self,
        campus_id: Uuid,
        deltas: UsageDeltas,
    ) -> AppResult<Option<SubscriptionProfile>> {
        let updated = self
            .subscription_repo
            .apply_usage_deltas(campus_id, &deltas)
            .await?;

        match &updated {
            Some(subscription) => tracing::debug!(
                subscription_id = %subscription.id,
                campus_id = %campus_id,
                "Updated usage counters"
            ),
            None => tracing::info!(
                campus_id = %campus_id,
                "No live subscription for campus, usage update skipped"
            ),
        }
        Ok(updated)
    }
}

/// Trim billing fields, drop blank ones, and validate the email if present.
fn normalize_billing(billing: &mut BillingInfo) -> AppResult<()> {
    for field in [
        &mut billing.billing_name,
        &mut billing.billing_email,
        &mut billing.billing_phone,
        &mut billing.billing_address,
        &mut billing.tax_id,
        &mut billing.tax_office,
    ] {
        *field = field
            .take()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
    }

    if let Some(email) = &billing.billing_email {
        if !is_valid_email(email) {
            return Err(AppError::InvalidInput("Invalid billing email".into()));
        }
    }
    Ok(())
}
