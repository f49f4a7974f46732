use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::{
            invoicing::InvoiceGenerator,
            notifications::{BillingNotice, NoticeKind, NotificationSender, dispatch},
            payment_gateway::{PaymentGatewayPort, PaymentRequest},
        },
        use_cases::subscription::{SubscriptionProfile, SubscriptionUseCases},
        validators::is_valid_currency,
    },
    domain::entities::{
        payment_method::PaymentMethod, payment_status::PaymentStatus, role_level::Actor,
        subscription_status::SubscriptionStatus,
    },
};

/// Gateway timeout used when none is configured
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

const DECLINE_FALLBACK_REASON: &str = "Payment declined by gateway";

// ============================================================================
// Profile Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PaymentProfile {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    /// Raw gateway payload, kept for reconciliation
    pub gateway_response: Option<serde_json::Value>,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Aggregates over a subscription's finished payments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentTotals {
    pub completed_count: i64,
    pub completed_amount: Decimal,
    pub failed_count: i64,
}

// ============================================================================
// Repository Write Models
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub subscription_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
}

/// The one update a PENDING payment receives
#[derive(Debug, Clone)]
pub struct TerminalUpdate {
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    pub gateway_response: Option<serde_json::Value>,
    pub processed_at: DateTime<Utc>,
}

impl TerminalUpdate {
    pub fn completed(transaction_id: Option<String>, gateway_response: serde_json::Value) -> Self {
        Self {
            status: PaymentStatus::Completed,
            transaction_id,
            failure_reason: None,
            gateway_response: Some(gateway_response),
            processed_at: Utc::now(),
        }
    }

    pub fn failed(reason: String, gateway_response: Option<serde_json::Value>) -> Self {
        Self {
            status: PaymentStatus::Failed,
            transaction_id: None,
            failure_reason: Some(reason),
            gateway_response,
            processed_at: Utc::now(),
        }
    }
}

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait PaymentRepo: Send + Sync {
    async fn create_pending(&self, input: &NewPayment) -> AppResult<PaymentProfile>;
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<PaymentProfile>>;
    /// Newest first
    async fn list_by_subscription(&self, subscription_id: Uuid) -> AppResult<Vec<PaymentProfile>>;
    /// Apply the terminal update only while the payment is PENDING.
    /// `None` if it had already left PENDING.
    async fn finalize(&self, id: Uuid, update: &TerminalUpdate)
    -> AppResult<Option<PaymentProfile>>;
    async fn totals_for_subscription(&self, subscription_id: Uuid) -> AppResult<PaymentTotals>;
    /// Sum of COMPLETED amounts created in `[from, to)`
    async fn completed_amount_between(
        &self,
        subscription_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Decimal>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct PaymentUseCases {
    subscriptions: SubscriptionUseCases,
    payment_repo: Arc<dyn PaymentRepo>,
    gateway: Arc<dyn PaymentGatewayPort>,
    invoices: Arc<dyn InvoiceGenerator>,
    notifier: Arc<dyn NotificationSender>,
    gateway_timeout: Duration,
}

impl PaymentUseCases {
    pub fn new(
        subscriptions: SubscriptionUseCases,
        payment_repo: Arc<dyn PaymentRepo>,
        gateway: Arc<dyn PaymentGatewayPort>,
        invoices: Arc<dyn InvoiceGenerator>,
        notifier: Arc<dyn NotificationSender>,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            subscriptions,
            payment_repo,
            gateway,
            invoices,
            notifier,
            gateway_timeout,
        }
    }

    pub async fn get_payment(&self, payment_id: Uuid) -> AppResult<PaymentProfile> {
        self.payment_repo
            .get_by_id(payment_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn list_subscription_payments(
        &self,
        subscription_id: Uuid,
    ) -> AppResult<Vec<PaymentProfile>> {
        self.subscriptions.get_subscription(subscription_id).await?;
        self.payment_repo.list_by_subscription(subscription_id).await
    }

    /// Record a PENDING payment, attempt it at the gateway and persist the outcome.
    ///
    /// Gateway declines, transport faults and timeouts all end as a FAILED payment
    /// returned in `Ok`. Only validation, lookup and persistence errors are `Err`.
    pub async fn process_payment(
        &self,
        actor: &Actor,
        subscription_id: Uuid,
        request: PaymentRequest,
    ) -> AppResult<PaymentProfile> {
        self.subscriptions.require_manager(actor)?;
        let guard = self.subscriptions.lock(subscription_id).await;
        let subscription = self.subscriptions.get_subscription(subscription_id).await?;

        let amount = request.amount.unwrap_or(subscription.price);
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "Payment amount must be positive".into(),
            ));
        }
        if amount.normalize().scale() > 2 {
            return Err(AppError::InvalidInput(
                "Payment amount cannot have more than two decimal places".into(),
            ));
        }
        let currency = request
            .currency
            .as_deref()
            .map(|c| c.trim().to_uppercase())
            .unwrap_or_else(|| subscription.currency.clone());
        if !is_valid_currency(&currency) {
            return Err(AppError::InvalidInput(
                "Currency must be a three-letter code".into(),
            ));
        }

        let payment = self
            .payment_repo
            .create_pending(&NewPayment {
                subscription_id,
                amount,
                currency,
                payment_method: request.payment_method,
                description: request.description.clone(),
                created_by: Some(actor.user_id),
            })
            .await?;

        tracing::info!(
            payment_id = %payment.id,
            subscription_id = %subscription_id,
            amount = %payment.amount,
            currency = %payment.currency,
            method = %payment.payment_method,
            user_id = %actor.user_id,
            "Recorded pending payment"
        );

        // The attempt runs detached so a dropped request can't abandon it mid-flight.
        let this = self.clone();
        let attempt = tokio::spawn(async move {
            let _guard = guard;
            this.settle(subscription, payment, request).await
        });

        attempt
            .await
            .map_err(|err| AppError::Internal(format!("Payment task failed: {err}")))?
    }

    async fn settle(
        &self,
        subscription: SubscriptionProfile,
        payment: PaymentProfile,
        request: PaymentRequest,
    ) -> AppResult<PaymentProfile> {
        // The gateway runs on its own task so a panicking adapter still ends in FAILED.
        let gateway = self.gateway.clone();
        let attempted = payment.clone();
        let mut call = tokio::spawn(async move { gateway.attempt(&attempted, &request).await });

        let update = match tokio::time::timeout(self.gateway_timeout, &mut call).await {
            Ok(Ok(Ok(response))) if response.successful => {
                TerminalUpdate::completed(response.transaction_id, response.raw_response)
            }
            Ok(Ok(Ok(response))) => {
                let reason = response
                    .error_message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DECLINE_FALLBACK_REASON.to_string());
                TerminalUpdate::failed(reason, Some(response.raw_response))
            }
            Ok(Ok(Err(err))) => {
                tracing::warn!(
                    payment_id = %payment.id,
                    error = %err,
                    "Payment gateway call failed"
                );
                let reason = match err {
                    AppError::Gateway(msg) => msg,
                    other => other.to_string(),
                };
                TerminalUpdate::failed(reason, None)
            }
            Ok(Err(join_err)) => {
                let reason = aborted_attempt_reason(join_err);
                tracing::error!(
                    payment_id = %payment.id,
                    reason = %reason,
                    "Payment gateway call aborted"
                );
                TerminalUpdate::failed(reason, None)
            }
            Err(_) => {
                call.abort();
                tracing::warn!(
                    payment_id = %payment.id,
                    timeout_secs = self.gateway_timeout.as_secs(),
                    "Payment gateway timed out"
                );
                TerminalUpdate::failed(
                    format!(
                        "Payment gateway timed out after {}s",
                        self.gateway_timeout.as_secs()
                    ),
                    None,
                )
            }
        };

        let settled = match self.payment_repo.finalize(payment.id, &update).await? {
            Some(settled) => settled,
            None => {
                tracing::warn!(payment_id = %payment.id, "Payment was already settled");
                return self.get_payment(payment.id).await;
            }
        };

        tracing::info!(
            payment_id = %settled.id,
            subscription_id = %settled.subscription_id,
            status = %settled.status,
            "Payment settled"
        );

        if settled.status.is_successful() {
            self.after_success(&subscription, &settled).await;
        } else {
            dispatch(
                self.notifier.clone(),
                BillingNotice {
                    recipient: subscription.billing.billing_email.clone(),
                    campus_id: subscription.campus_id,
                    subscription_id: subscription.id,
                    kind: NoticeKind::PaymentFailed {
                        payment_id: settled.id,
                        amount: settled.amount,
                        currency: settled.currency.clone(),
                        reason: settled
                            .failure_reason
                            .clone()
                            .unwrap_or_else(|| DECLINE_FALLBACK_REASON.to_string()),
                    },
                },
            );
        }

        Ok(settled)
    }

    /// Follow-ups of a completed payment. None of them can undo it, so failures are logged.
    async fn after_success(&self, subscription: &SubscriptionProfile, payment: &PaymentProfile) {
        match self.invoices.create_invoice_for_payment(payment).await {
            Ok(invoice) => tracing::info!(
                payment_id = %payment.id,
                invoice_number = %invoice.invoice_number,
                "Invoice issued"
            ),
            Err(err) => tracing::error!(
                payment_id = %payment.id,
                error = %err,
                "Failed to issue invoice for completed payment"
            ),
        }

        if subscription.status == SubscriptionStatus::Trial {
            if let Err(err) = self
                .subscriptions
                .activate_trial_while_locked(subscription.id)
                .await
            {
                tracing::error!(
                    subscription_id = %subscription.id,
                    payment_id = %payment.id,
                    error = %err,
                    "Failed to activate trial after payment"
                );
            }
        }

        dispatch(
            self.notifier.clone(),
            BillingNotice {
                recipient: subscription.billing.billing_email.clone(),
                campus_id: subscription.campus_id,
                subscription_id: subscription.id,
                kind: NoticeKind::PaymentSucceeded {
                    payment_id: payment.id,
                    amount: payment.amount,
                    currency: payment.currency.clone(),
                    transaction_id: payment.transaction_id.clone(),
                },
            },
        );
    }
}

fn aborted_attempt_reason(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return "Payment gateway call was cancelled".to_string();
    }
    let payload = err.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("Payment gateway failed unexpectedly: {detail}")
}
