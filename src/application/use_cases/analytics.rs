use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        helpers::billing_math::{average_amount, growth_rate, success_rate, usage_percentage},
        use_cases::{payment::PaymentRepo, plan_catalog::PlanRepo, subscription::SubscriptionRepo},
    },
    domain::entities::usage::{MeteredResource, PlanLimits, usage_report},
};

const MAX_GROWTH_WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Clone, Serialize)]
pub struct ResourceUtilization {
    pub resource: MeteredResource,
    pub used: i64,
    pub limit: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionAnalytics {
    pub subscription_id: Uuid,
    /// Completed payments
    pub total_payments: i64,
    pub total_amount_paid: Decimal,
    pub average_payment_amount: Decimal,
    pub failed_payments: i64,
    pub payment_success_rate: f64,
    pub usage: Vec<ResourceUtilization>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentGrowth {
    pub subscription_id: Uuid,
    pub window_days: i64,
    pub current_amount: Decimal,
    pub previous_amount: Decimal,
    pub growth_rate: f64,
}

/// Read-only metrics derived from counters and payment history.
#[derive(Clone)]
pub struct AnalyticsUseCases {
    subscription_repo: Arc<dyn SubscriptionRepo>,
    plan_repo: Arc<dyn PlanRepo>,
    payment_repo: Arc<dyn PaymentRepo>,
}

impl AnalyticsUseCases {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepo>,
        plan_repo: Arc<dyn PlanRepo>,
        payment_repo: Arc<dyn PaymentRepo>,
    ) -> Self {
        Self {
            subscription_repo,
            plan_repo,
            payment_repo,
        }
    }

    pub async fn get_subscription_analytics(
        &self,
        subscription_id: Uuid,
    ) -> AppResult<SubscriptionAnalytics> {
        let subscription = self
            .subscription_repo
            .get_by_id(subscription_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let totals = self
            .payment_repo
            .totals_for_subscription(subscription_id)
            .await?;

        let limits = match self.plan_repo.get_by_id(subscription.plan_id).await? {
            Some(plan) => plan.limits,
            None => {
                tracing::warn!(
                    subscription_id = %subscription_id,
                    plan_id = %subscription.plan_id,
                    "Plan missing, reporting usage against zero limits"
                );
                PlanLimits::default()
            }
        };

        let usage = usage_report(&subscription.usage, &limits)
            .into_iter()
            .map(|u| ResourceUtilization {
                resource: u.resource,
                used: u.used,
                limit: u.limit,
                percentage: usage_percentage(u.used, u.limit),
            })
            .collect();

        Ok(SubscriptionAnalytics {
            subscription_id,
            total_payments: totals.completed_count,
            total_amount_paid: totals.completed_amount,
            average_payment_amount: average_amount(
                totals.completed_amount,
                totals.completed_count,
            ),
            failed_payments: totals.failed_count,
            payment_success_rate: success_rate(totals.completed_count, totals.failed_count),
            usage,
        })
    }

    /// Completed amount in the last `window_days` against the window before it.
    pub async fn get_payment_growth(
        &self,
        subscription_id: Uuid,
        window_days: i64,
    ) -> AppResult<PaymentGrowth> {
        if window_days <= 0 || window_days > MAX_GROWTH_WINDOW_DAYS {
            return Err(AppError::InvalidInput(format!(
                "Window must be between 1 and {} days",
                MAX_GROWTH_WINDOW_DAYS
            )));
        }
        self.subscription_repo
            .get_by_id(subscription_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let now = Utc::now();
        let window = Duration::days(window_days);
        let current_amount = self
            .payment_repo
            .completed_amount_between(subscription_id, now - window, now)
            .await?;
        let previous_amount = self
            .payment_repo
            .completed_amount_between(subscription_id, now - window - window, now - window)
            .await?;

        Ok(PaymentGrowth {
            subscription_id,
            window_days,
            current_amount,
            previous_amount,
            growth_rate: growth_rate(current_amount, previous_amount),
        })
    }
}
