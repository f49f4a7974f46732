//! In-memory mock implementations for the billing repository traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        campus::{CampusProfile, CampusRepo},
        payment::{NewPayment, PaymentProfile, PaymentRepo, PaymentTotals, TerminalUpdate},
        plan_catalog::{CreatePlanInput, PlanProfile, PlanRepo, UpdatePlanInput},
        subscription::{
            BillingPatch, Cancellation, NewSubscription, PlanSwitch, SubscriptionProfile,
            SubscriptionRepo, TrialActivation,
        },
    },
    domain::entities::{
        payment_status::PaymentStatus,
        subscription_status::SubscriptionStatus,
        usage::{UsageCounters, UsageDeltas},
    },
};

// ============================================================================
// InMemoryPlanRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPlanRepo {
    pub plans: Mutex<HashMap<Uuid, PlanProfile>>,
    // Referencing subscriptions per plan for count_subscriptions
    pub subscription_counts: Mutex<HashMap<Uuid, i64>>,
}

impl InMemoryPlanRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plans(plans: Vec<PlanProfile>) -> Self {
        let map: HashMap<Uuid, PlanProfile> = plans.into_iter().map(|p| (p.id, p)).collect();
        Self {
            plans: Mutex::new(map),
            ..Default::default()
        }
    }

    pub fn set_subscription_count(&self, plan_id: Uuid, count: i64) {
        self.subscription_counts
            .lock()
            .unwrap()
            .insert(plan_id, count);
    }
}

#[async_trait]
impl PlanRepo for InMemoryPlanRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<PlanProfile>> {
        Ok(self.plans.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> AppResult<Option<PlanProfile>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn list(&self, include_inactive: bool) -> AppResult<Vec<PlanProfile>> {
        let mut plans: Vec<PlanProfile> = self
            .plans
            .lock()
            .unwrap()
            .values()
            .filter(|p| include_inactive || p.is_active)
            .cloned()
            .collect();
        plans.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(plans)
    }

    async fn create(&self, input: &CreatePlanInput) -> AppResult<PlanProfile> {
        let mut plans = self.plans.lock().unwrap();
        if plans.values().any(|p| p.name == input.name) {
            return Err(AppError::Conflict("Plan name already exists".into()));
        }
        let now = Utc::now();
        let plan = PlanProfile {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            display_name: input.display_name.clone(),
            description: input.description.clone(),
            price: input.price,
            currency: input.currency.clone(),
            billing_period: input.billing_period,
            trial_days: input.trial_days,
            limits: input.limits,
            features: input.features.clone(),
            is_public: input.is_public,
            sort_order: input.sort_order,
            is_active: true,
            created_at: Some(now),
            updated_at: Some(now),
        };
        plans.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn update(&self, id: Uuid, input: &UpdatePlanInput) -> AppResult<PlanProfile> {
        let mut plans = self.plans.lock().unwrap();
        let plan = plans.get_mut(&id).ok_or(AppError::NotFound)?;
        if let Some(v) = &input.name {
            plan.name = v.clone();
        }
        if let Some(v) = &input.display_name {
            plan.display_name = v.clone();
        }
        if let Some(v) = &input.description {
            plan.description = Some(v.clone());
        }
        if let Some(v) = input.price {
            plan.price = v;
        }
        if let Some(v) = &input.currency {
            plan.currency = v.clone();
        }
        if let Some(v) = input.billing_period {
            plan.billing_period = v;
        }
        if let Some(v) = input.trial_days {
            plan.trial_days = v;
        }
        if let Some(v) = input.limits {
            plan.limits = v;
        }
        if let Some(v) = &input.features {
            plan.features = v.clone();
        }
        if let Some(v) = input.is_public {
            plan.is_public = v;
        }
        if let Some(v) = input.sort_order {
            plan.sort_order = v;
        }
        plan.updated_at = Some(Utc::now());
        Ok(plan.clone())
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> AppResult<PlanProfile> {
        let mut plans = self.plans.lock().unwrap();
        let plan = plans.get_mut(&id).ok_or(AppError::NotFound)?;
        plan.is_active = is_active;
        plan.updated_at = Some(Utc::now());
        Ok(plan.clone())
    }

    async fn count_subscriptions(&self, plan_id: Uuid) -> AppResult<i64> {
        Ok(self
            .subscription_counts
            .lock()
            .unwrap()
            .get(&plan_id)
            .copied()
            .unwrap_or(0))
    }
}

// ============================================================================
// InMemoryBillingStore
// ============================================================================

#[derive(Default)]
struct BillingTables {
    campuses: HashMap<Uuid, CampusProfile>,
    subscriptions: HashMap<Uuid, SubscriptionProfile>,
}

impl BillingTables {
    fn live_for_campus(&self, campus_id: Uuid) -> Option<&SubscriptionProfile> {
        self.subscriptions
            .values()
            .find(|s| s.campus_id == campus_id && s.status.is_live())
    }
}

/// Campuses and subscriptions behind one lock, so multi-row writes are atomic
/// the way they are inside a database transaction.
#[derive(Default)]
pub struct InMemoryBillingStore {
    tables: Mutex<BillingTables>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_campus(&self, campus: CampusProfile) -> CampusProfile {
        self.tables
            .lock()
            .unwrap()
            .campuses
            .insert(campus.id, campus.clone());
        campus
    }

    pub fn insert_subscription(&self, subscription: SubscriptionProfile) -> SubscriptionProfile {
        self.tables
            .lock()
            .unwrap()
            .subscriptions
            .insert(subscription.id, subscription.clone());
        subscription
    }

    pub fn campus(&self, id: Uuid) -> Option<CampusProfile> {
        self.tables.lock().unwrap().campuses.get(&id).cloned()
    }

    pub fn subscription(&self, id: Uuid) -> Option<SubscriptionProfile> {
        self.tables.lock().unwrap().subscriptions.get(&id).cloned()
    }

    pub fn subscription_count(&self) -> usize {
        self.tables.lock().unwrap().subscriptions.len()
    }
}

#[async_trait]
impl CampusRepo for InMemoryBillingStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<CampusProfile>> {
        Ok(self.campus(id))
    }
}

#[async_trait]
impl SubscriptionRepo for InMemoryBillingStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionProfile>> {
        Ok(self.subscription(id))
    }

    async fn get_live_by_campus(
        &self,
        campus_id: Uuid,
    ) -> AppResult<Option<SubscriptionProfile>> {
        Ok(self.tables.lock().unwrap().live_for_campus(campus_id).cloned())
    }

    async fn list_by_campus(&self, campus_id: Uuid) -> AppResult<Vec<SubscriptionProfile>> {
        let mut subscriptions: Vec<SubscriptionProfile> = self
            .tables
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .filter(|s| s.campus_id == campus_id)
            .cloned()
            .collect();
        subscriptions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(subscriptions)
    }

    async fn create_for_campus(&self, input: &NewSubscription) -> AppResult<SubscriptionProfile> {
        let mut tables = self.tables.lock().unwrap();
        if tables.live_for_campus(input.campus_id).is_some() {
            return Err(AppError::Conflict(
                "Campus already has an active or trial subscription".into(),
            ));
        }
        let campus = tables
            .campuses
            .get_mut(&input.campus_id)
            .ok_or(AppError::NotFound)?;
        campus.is_subscribed = true;

        let now = Utc::now();
        let subscription = SubscriptionProfile {
            id: Uuid::new_v4(),
            campus_id: input.campus_id,
            plan_id: input.plan_id,
            status: input.status,
            start_date: input.start_date,
            end_date: input.end_date,
            trial_end_date: input.trial_end_date,
            next_billing_date: input.next_billing_date,
            price: input.price,
            currency: input.currency.clone(),
            auto_renew: input.auto_renew,
            cancellation_reason: None,
            canceled_at: None,
            grace_period_end: None,
            billing: input.billing.clone(),
            usage: UsageCounters::default(),
            created_by: input.created_by,
            created_at: Some(now),
            updated_at: Some(now),
        };
        tables
            .subscriptions
            .insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn cancel(
        &self,
        id: Uuid,
        cancellation: &Cancellation,
    ) -> AppResult<Option<SubscriptionProfile>> {
        let mut tables = self.tables.lock().unwrap();
        let Some(subscription) = tables.subscriptions.get_mut(&id) else {
            return Ok(None);
        };
        if !subscription.status.is_live() {
            return Ok(None);
        }
        subscription.status = SubscriptionStatus::Canceled;
        subscription.auto_renew = false;
        subscription.cancellation_reason = cancellation.reason.clone();
        subscription.canceled_at = Some(cancellation.canceled_at);
        subscription.grace_period_end = Some(cancellation.grace_period_end);
        subscription.updated_at = Some(Utc::now());
        let canceled = subscription.clone();

        if cancellation.clear_campus_flag {
            if let Some(campus) = tables.campuses.get_mut(&canceled.campus_id) {
                campus.is_subscribed = false;
            }
        }
        Ok(Some(canceled))
    }

    async fn switch_plan(
        &self,
        id: Uuid,
        switch: &PlanSwitch,
    ) -> AppResult<Option<SubscriptionProfile>> {
        let mut tables = self.tables.lock().unwrap();
        match tables.subscriptions.get_mut(&id) {
            Some(s) if s.status == SubscriptionStatus::Active => {
                s.plan_id = switch.plan_id;
                s.price = switch.price;
                s.currency = switch.currency.clone();
                s.updated_at = Some(Utc::now());
                Ok(Some(s.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_billing(
        &self,
        id: Uuid,
        patch: &BillingPatch,
    ) -> AppResult<SubscriptionProfile> {
        let mut tables = self.tables.lock().unwrap();
        let subscription = tables
            .subscriptions
            .get_mut(&id)
            .ok_or(AppError::NotFound)?;
        patch.apply_to(subscription);
        subscription.updated_at = Some(Utc::now());
        Ok(subscription.clone())
    }

    async fn activate_trial(
        &self,
        id: Uuid,
        activation: &TrialActivation,
    ) -> AppResult<Option<SubscriptionProfile>> {
        let mut tables = self.tables.lock().unwrap();
        match tables.subscriptions.get_mut(&id) {
            Some(s) if s.status == SubscriptionStatus::Trial => {
                s.status = SubscriptionStatus::Active;
                s.start_date = activation.start_date;
                s.end_date = Some(activation.end_date);
                s.next_billing_date = Some(activation.next_billing_date);
                s.updated_at = Some(Utc::now());
                Ok(Some(s.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn apply_usage_deltas(
        &self,
        campus_id: Uuid,
        deltas: &UsageDeltas,
    ) -> AppResult<Option<SubscriptionProfile>> {
        let mut tables = self.tables.lock().unwrap();
        let live = tables
            .subscriptions
            .values_mut()
            .find(|s| s.campus_id == campus_id && s.status.is_live());
        Ok(live.map(|s| {
            s.usage = deltas.apply_to(&s.usage);
            s.updated_at = Some(Utc::now());
            s.clone()
        }))
    }
}

// ============================================================================
// InMemoryPaymentRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPaymentRepo {
    pub payments: Mutex<HashMap<Uuid, PaymentProfile>>,
    // Successful finalize calls per payment
    pub finalize_counts: Mutex<HashMap<Uuid, usize>>,
}

impl InMemoryPaymentRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, payment: PaymentProfile) -> PaymentProfile {
        self.payments
            .lock()
            .unwrap()
            .insert(payment.id, payment.clone());
        payment
    }

    /// All payments, oldest first.
    pub fn all(&self) -> Vec<PaymentProfile> {
        let mut payments: Vec<PaymentProfile> =
            self.payments.lock().unwrap().values().cloned().collect();
        payments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        payments
    }

    pub fn update_count(&self, id: Uuid) -> usize {
        self.finalize_counts
            .lock()
            .unwrap()
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    fn finished_for(&self, subscription_id: Uuid) -> Vec<PaymentProfile> {
        self.payments
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.subscription_id == subscription_id && p.status.is_terminal())
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PaymentRepo for InMemoryPaymentRepo {
    async fn create_pending(&self, input: &NewPayment) -> AppResult<PaymentProfile> {
        let now = Utc::now();
        let payment = PaymentProfile {
            id: Uuid::new_v4(),
            subscription_id: input.subscription_id,
            amount: input.amount,
            currency: input.currency.clone(),
            payment_method: input.payment_method,
            status: PaymentStatus::Pending,
            transaction_id: None,
            failure_reason: None,
            gateway_response: None,
            description: input.description.clone(),
            created_by: input.created_by,
            created_at: Some(now),
            updated_at: Some(now),
            processed_at: None,
        };
        Ok(self.insert(payment))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<PaymentProfile>> {
        Ok(self.payments.lock().unwrap().get(&id).cloned())
    }

    async fn list_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> AppResult<Vec<PaymentProfile>> {
        let mut payments: Vec<PaymentProfile> = self
            .payments
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.subscription_id == subscription_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    async fn finalize(
        &self,
        id: Uuid,
        update: &TerminalUpdate,
    ) -> AppResult<Option<PaymentProfile>> {
        let mut payments = self.payments.lock().unwrap();
        let payment = match payments.get_mut(&id) {
            Some(p) if p.status == PaymentStatus::Pending => p,
            _ => return Ok(None),
        };
        payment.status = update.status;
        payment.transaction_id = update.transaction_id.clone();
        payment.failure_reason = update.failure_reason.clone();
        payment.gateway_response = update.gateway_response.clone();
        payment.processed_at = Some(update.processed_at);
        payment.updated_at = Some(Utc::now());
        let settled = payment.clone();
        drop(payments);

        *self.finalize_counts.lock().unwrap().entry(id).or_insert(0) += 1;
        Ok(Some(settled))
    }

    async fn totals_for_subscription(&self, subscription_id: Uuid) -> AppResult<PaymentTotals> {
        let mut totals = PaymentTotals::default();
        for payment in self.finished_for(subscription_id) {
            if payment.status.is_successful() {
                totals.completed_count += 1;
                totals.completed_amount += payment.amount;
            } else if payment.status.is_failed() {
                totals.failed_count += 1;
            }
        }
        Ok(totals)
    }

    async fn completed_amount_between(
        &self,
        subscription_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Decimal> {
        Ok(self
            .finished_for(subscription_id)
            .into_iter()
            .filter(|p| p.status.is_successful())
            .filter(|p| p.created_at.is_some_and(|at| at >= from && at < to))
            .map(|p| p.amount)
            .sum())
    }
}
