//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, Utc};
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::{
    application::use_cases::{
        campus::CampusProfile,
        payment::PaymentProfile,
        plan_catalog::PlanProfile,
        subscription::{BillingInfo, SubscriptionProfile},
    },
    domain::entities::{
        billing_period::BillingPeriod,
        payment_method::PaymentMethod,
        payment_status::PaymentStatus,
        subscription_status::SubscriptionStatus,
        usage::{PlanLimits, UsageCounters},
    },
};

/// Create an active campus without a subscription.
pub fn create_test_campus(overrides: impl FnOnce(&mut CampusProfile)) -> CampusProfile {
    let mut campus = CampusProfile {
        id: Uuid::new_v4(),
        name: "Northside Campus".to_string(),
        is_active: true,
        is_subscribed: false,
    };
    overrides(&mut campus);
    campus
}

/// Create an active monthly plan without a trial.
pub fn create_test_plan(overrides: impl FnOnce(&mut PlanProfile)) -> PlanProfile {
    let mut plan = PlanProfile {
        id: Uuid::new_v4(),
        name: "basic".to_string(),
        display_name: "Basic".to_string(),
        description: Some("Everything a single school needs".to_string()),
        price: dec!(99.00),
        currency: "USD".to_string(),
        billing_period: BillingPeriod::Monthly,
        trial_days: 0,
        limits: PlanLimits {
            max_schools: 1,
            max_users: 50,
            max_appointments_per_month: 500,
            max_gallery_items: 200,
            max_posts_per_month: 100,
            storage_quota_mb: 1024,
        },
        features: vec!["gallery".to_string(), "appointments".to_string()],
        is_public: true,
        sort_order: 0,
        is_active: true,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut plan);
    plan
}

/// Create an ACTIVE subscription in the middle of a monthly period.
pub fn create_test_subscription(
    campus_id: Uuid,
    plan_id: Uuid,
    overrides: impl FnOnce(&mut SubscriptionProfile),
) -> SubscriptionProfile {
    let now = Utc::now();
    let start_date = now - chrono::Duration::days(10);
    let end_date = BillingPeriod::Monthly.advance(start_date);
    let mut subscription = SubscriptionProfile {
        id: Uuid::new_v4(),
        campus_id,
        plan_id,
        status: SubscriptionStatus::Active,
        start_date,
        end_date: Some(end_date),
        trial_end_date: None,
        next_billing_date: Some(end_date),
        price: dec!(99.00),
        currency: "USD".to_string(),
        auto_renew: true,
        cancellation_reason: None,
        canceled_at: None,
        grace_period_end: None,
        billing: BillingInfo {
            billing_name: Some("Campus Accounts".to_string()),
            ..Default::default()
        },
        usage: UsageCounters::default(),
        created_by: Some(Uuid::new_v4()),
        created_at: Some(now),
        updated_at: Some(now),
    };
    overrides(&mut subscription);
    subscription
}

/// Create a PENDING card payment for a subscription.
pub fn create_test_payment(
    subscription_id: Uuid,
    overrides: impl FnOnce(&mut PaymentProfile),
) -> PaymentProfile {
    let now = Utc::now();
    let mut payment = PaymentProfile {
        id: Uuid::new_v4(),
        subscription_id,
        amount: dec!(99.00),
        currency: "USD".to_string(),
        payment_method: PaymentMethod::CreditCard,
        status: PaymentStatus::Pending,
        transaction_id: None,
        failure_reason: None,
        gateway_response: None,
        description: None,
        created_by: None,
        created_at: Some(now),
        updated_at: Some(now),
        processed_at: None,
    };
    overrides(&mut payment);
    payment
}

/// Fixed timestamp for catalog fixtures.
pub fn test_datetime() -> DateTime<Utc> {
    DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default()
}
