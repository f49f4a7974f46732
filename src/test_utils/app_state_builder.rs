//! Test app state builder for HTTP-level integration testing.
//!
//! `TestAppStateBuilder` wires the real use cases over in-memory repositories
//! and scripted ports, so route tests exercise the full request path.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        access::RoleBasedAccessPolicy,
        entity_locks::EntityLocks,
        ports::pricing::NoDiscount,
        use_cases::{
            analytics::AnalyticsUseCases,
            campus::CampusProfile,
            payment::{DEFAULT_GATEWAY_TIMEOUT, PaymentProfile, PaymentUseCases},
            plan_catalog::{PlanCatalogUseCases, PlanProfile},
            subscription::{SubscriptionProfile, SubscriptionUseCases},
        },
    },
    infra::config::{AppConfig, PaymentGatewayConfig},
    test_utils::{
        GatewayScript, InMemoryBillingStore, InMemoryPaymentRepo, InMemoryPlanRepo,
        RecordingInvoices, RecordingNotifier, ScriptedGateway,
    },
};

/// Handles on the in-memory collaborators behind a built [`AppState`].
pub struct TestMocks {
    pub store: Arc<InMemoryBillingStore>,
    pub payments: Arc<InMemoryPaymentRepo>,
    pub gateway: Arc<ScriptedGateway>,
    pub notifier: Arc<RecordingNotifier>,
}

pub struct TestAppStateBuilder {
    campuses: Vec<CampusProfile>,
    plans: Vec<PlanProfile>,
    subscriptions: Vec<SubscriptionProfile>,
    payments: Vec<PaymentProfile>,
    gateway: GatewayScript,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            campuses: Vec::new(),
            plans: Vec::new(),
            subscriptions: Vec::new(),
            payments: Vec::new(),
            gateway: GatewayScript::Approve,
        }
    }

    pub fn with_campus(mut self, campus: CampusProfile) -> Self {
        self.campuses.push(campus);
        self
    }

    pub fn with_plan(mut self, plan: PlanProfile) -> Self {
        self.plans.push(plan);
        self
    }

    pub fn with_subscription(mut self, subscription: SubscriptionProfile) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    pub fn with_payment(mut self, payment: PaymentProfile) -> Self {
        self.payments.push(payment);
        self
    }

    /// Set what the payment gateway answers (approves by default).
    pub fn with_gateway(mut self, script: GatewayScript) -> Self {
        self.gateway = script;
        self
    }

    pub fn build(self) -> AppState {
        self.build_with_mocks().0
    }

    /// Build the AppState and return the mocks for assertions.
    pub fn build_with_mocks(self) -> (AppState, TestMocks) {
        let store = Arc::new(InMemoryBillingStore::new());
        for campus in self.campuses {
            store.insert_campus(campus);
        }
        for subscription in self.subscriptions {
            store.insert_subscription(subscription);
        }
        let plans = Arc::new(InMemoryPlanRepo::with_plans(self.plans));
        let payments = Arc::new(InMemoryPaymentRepo::new());
        for payment in self.payments {
            payments.insert(payment);
        }
        let gateway = Arc::new(ScriptedGateway::new(self.gateway));
        let notifier = Arc::new(RecordingNotifier::new());
        let access = Arc::new(RoleBasedAccessPolicy);

        let plan_use_cases = Arc::new(PlanCatalogUseCases::new(plans.clone(), access.clone()));
        let subscription_use_cases = SubscriptionUseCases::new(
            store.clone(),
            store.clone(),
            plans.clone(),
            access,
            Arc::new(NoDiscount),
            notifier.clone(),
            Arc::new(EntityLocks::new()),
        );
        let payment_use_cases = Arc::new(PaymentUseCases::new(
            subscription_use_cases.clone(),
            payments.clone(),
            gateway.clone(),
            Arc::new(RecordingInvoices::new()),
            notifier.clone(),
            DEFAULT_GATEWAY_TIMEOUT,
        ));
        let analytics_use_cases = Arc::new(AnalyticsUseCases::new(
            store.clone(),
            plans,
            payments.clone(),
        ));

        // Create minimal config for testing
        let config = Arc::new(AppConfig {
            database_url: String::new(),
            database_max_connections: 1,
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            payment_gateway: PaymentGatewayConfig::Dummy,
            payment_gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            resend_api_key: None,
            notification_from_email: "billing@test.local".to_string(),
        });

        let app_state = AppState {
            config,
            plan_use_cases,
            subscription_use_cases: Arc::new(subscription_use_cases),
            payment_use_cases,
            analytics_use_cases,
        };
        let mocks = TestMocks {
            store,
            payments,
            gateway,
            notifier,
        };
        (app_state, mocks)
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
