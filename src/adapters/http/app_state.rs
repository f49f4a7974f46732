use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    infra::config::AppConfig,
    use_cases::{
        analytics::AnalyticsUseCases, payment::PaymentUseCases, plan_catalog::PlanCatalogUseCases,
        subscription::SubscriptionUseCases,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub plan_use_cases: Arc<PlanCatalogUseCases>,
    pub subscription_use_cases: Arc<SubscriptionUseCases>,
    pub payment_use_cases: Arc<PaymentUseCases>,
    pub analytics_use_cases: Arc<AnalyticsUseCases>,
}

impl FromRef<AppState> for Arc<SubscriptionUseCases> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.subscription_use_cases.clone()
    }
}
