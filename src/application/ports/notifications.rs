use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{app_error::AppResult, domain::entities::subscription_status::SubscriptionStatus};

/// A billing event to tell the campus about.
#[derive(Debug, Clone, Serialize)]
pub struct BillingNotice {
    /// Billing contact email, if the subscription has one
    pub recipient: Option<String>,
    pub campus_id: Uuid,
    pub subscription_id: Uuid,
    pub kind: NoticeKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoticeKind {
    Welcome {
        plan_name: String,
        status: SubscriptionStatus,
        trial_end_date: Option<DateTime<Utc>>,
    },
    Cancellation {
        reason: Option<String>,
        immediate: bool,
        grace_period_end: Option<DateTime<Utc>>,
    },
    PlanChanged {
        old_plan_name: String,
        new_plan_name: String,
        prorated_amount: Decimal,
        currency: String,
    },
    PaymentSucceeded {
        payment_id: Uuid,
        amount: Decimal,
        currency: String,
        transaction_id: Option<String>,
    },
    PaymentFailed {
        payment_id: Uuid,
        amount: Decimal,
        currency: String,
        reason: String,
    },
}

impl NoticeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::Welcome { .. } => "welcome",
            NoticeKind::Cancellation { .. } => "cancellation",
            NoticeKind::PlanChanged { .. } => "plan_changed",
            NoticeKind::PaymentSucceeded { .. } => "payment_succeeded",
            NoticeKind::PaymentFailed { .. } => "payment_failed",
        }
    }
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notice: &BillingNotice) -> AppResult<()>;
}

/// Send a notice in the background. Failures are logged, never returned.
pub fn dispatch(sender: Arc<dyn NotificationSender>, notice: BillingNotice) {
    tokio::spawn(async move {
        if let Err(err) = sender.send(&notice).await {
            tracing::warn!(
                subscription_id = %notice.subscription_id,
                notice = notice.kind.as_str(),
                error = %err,
                "Failed to send billing notice"
            );
        }
    });
}
