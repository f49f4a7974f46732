//! Scriptable stand-ins for the outbound ports: gateway, invoices, notices, coupons.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::{
            invoicing::{InvoiceGenerator, InvoiceProfile, invoice_number},
            notifications::{BillingNotice, NotificationSender},
            payment_gateway::{GatewayResponse, PaymentGatewayPort, PaymentRequest},
            pricing::CouponPricing,
        },
        use_cases::payment::PaymentProfile,
    },
};

// ============================================================================
// ScriptedGateway
// ============================================================================

/// What a [`ScriptedGateway`] does on every attempt.
#[derive(Debug, Clone)]
pub enum GatewayScript {
    Approve,
    Decline(Option<String>),
    TransportError(String),
    /// Never answers
    Hang,
    /// Approve after the delay
    Delay(Duration),
    Custom(GatewayResponse),
    /// The adapter itself blows up
    Panic(&'static str),
}

pub struct ScriptedGateway {
    script: GatewayScript,
    attempts: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new(script: GatewayScript) -> Self {
        Self {
            script,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

fn approval(payment: &PaymentProfile) -> GatewayResponse {
    let transaction_id = format!("txn_{}", payment.id.simple());
    GatewayResponse::approved(
        transaction_id.clone(),
        serde_json::json!({ "id": transaction_id, "status": "approved" }),
    )
}

#[async_trait]
impl PaymentGatewayPort for ScriptedGateway {
    async fn attempt(
        &self,
        payment: &PaymentProfile,
        _request: &PaymentRequest,
    ) -> AppResult<GatewayResponse> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            GatewayScript::Approve => Ok(approval(payment)),
            GatewayScript::Decline(message) => Ok(GatewayResponse::declined(
                message.clone(),
                serde_json::json!({ "status": "declined" }),
            )),
            GatewayScript::TransportError(message) => Err(AppError::Gateway(message.clone())),
            GatewayScript::Hang => std::future::pending::<AppResult<GatewayResponse>>().await,
            GatewayScript::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(approval(payment))
            }
            GatewayScript::Custom(response) => Ok(response.clone()),
            GatewayScript::Panic(message) => panic!("{message}"),
        }
    }
}

// ============================================================================
// RecordingInvoices
// ============================================================================

#[derive(Default)]
pub struct RecordingInvoices {
    invoiced: Mutex<Vec<Uuid>>,
    fail: bool,
}

impl RecordingInvoices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every invoice request errors.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn invoiced(&self) -> Vec<Uuid> {
        self.invoiced.lock().unwrap().clone()
    }
}

#[async_trait]
impl InvoiceGenerator for RecordingInvoices {
    async fn create_invoice_for_payment(
        &self,
        payment: &PaymentProfile,
    ) -> AppResult<InvoiceProfile> {
        if self.fail {
            return Err(AppError::Database("invoice table unavailable".into()));
        }
        self.invoiced.lock().unwrap().push(payment.id);
        let issued_at = Utc::now();
        Ok(InvoiceProfile {
            id: Uuid::new_v4(),
            payment_id: payment.id,
            invoice_number: invoice_number(payment.id, issued_at),
            amount: payment.amount,
            currency: payment.currency.clone(),
            issued_at,
        })
    }
}

// ============================================================================
// Notifiers
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<BillingNotice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<BillingNotice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.kind.as_str())
            .collect()
    }

    /// Notices go out on spawned tasks; yield until `count` have arrived.
    pub async fn wait_for(&self, count: usize) -> Vec<&'static str> {
        for _ in 0..100 {
            if self.notices.lock().unwrap().len() >= count {
                break;
            }
            tokio::task::yield_now().await;
        }
        self.kinds()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send(&self, notice: &BillingNotice) -> AppResult<()> {
        self.notices.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

/// Notifier that takes `delay` to deliver each notice.
pub struct SlowNotifier {
    delay: Duration,
    delivered: AtomicUsize,
}

impl SlowNotifier {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            delivered: AtomicUsize::new(0),
        }
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSender for SlowNotifier {
    async fn send(&self, _notice: &BillingNotice) -> AppResult<()> {
        tokio::time::sleep(self.delay).await;
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Notifier whose every send fails.
pub struct FailingNotifier;

#[async_trait]
impl NotificationSender for FailingNotifier {
    async fn send(&self, _notice: &BillingNotice) -> AppResult<()> {
        Err(AppError::Internal("mail relay down".into()))
    }
}

// ============================================================================
// CountingCoupons
// ============================================================================

/// Coupon rule that records each code and leaves the price unchanged.
#[derive(Default)]
pub struct CountingCoupons {
    calls: Mutex<Vec<String>>,
}

impl CountingCoupons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CouponPricing for CountingCoupons {
    fn apply(&self, code: &str, price: Decimal) -> Decimal {
        self.calls.lock().unwrap().push(code.to_string());
        price
    }
}
