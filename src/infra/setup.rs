use crate::{
    adapters::{
        email::resend::{LogNotificationSender, ResendNotificationSender},
        http::app_state::AppState,
    },
    application::{
        access::{AccessPolicy, RoleBasedAccessPolicy},
        entity_locks::EntityLocks,
        ports::{
            invoicing::InvoiceGenerator, notifications::NotificationSender,
            payment_gateway::PaymentGatewayPort, pricing::NoDiscount,
        },
    },
    infra::{
        config::{AppConfig, PaymentGatewayConfig},
        dummy_payment_gateway::DummyPaymentGateway,
        error::InfraError,
        http_client::{build_client, build_client_with_timeout},
        http_payment_gateway::HttpPaymentGateway,
        postgres_persistence,
    },
    use_cases::{
        analytics::AnalyticsUseCases,
        campus::CampusRepo,
        payment::{PaymentRepo, PaymentUseCases},
        plan_catalog::{PlanCatalogUseCases, PlanRepo},
        subscription::{SubscriptionRepo, SubscriptionUseCases},
    },
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env()?;

    let postgres_arc = Arc::new(
        postgres_persistence(&config.database_url, config.database_max_connections).await?,
    );
    let campus_repo = postgres_arc.clone() as Arc<dyn CampusRepo>;
    let plan_repo = postgres_arc.clone() as Arc<dyn PlanRepo>;
    let subscription_repo = postgres_arc.clone() as Arc<dyn SubscriptionRepo>;
    let payment_repo = postgres_arc.clone() as Arc<dyn PaymentRepo>;
    let invoices = postgres_arc.clone() as Arc<dyn InvoiceGenerator>;

    let gateway: Arc<dyn PaymentGatewayPort> = match &config.payment_gateway {
        PaymentGatewayConfig::Dummy => {
            tracing::warn!("No payment gateway configured, using the dummy gateway");
            Arc::new(DummyPaymentGateway::new())
        }
        PaymentGatewayConfig::Http { base_url, api_key } => {
            let client = build_client_with_timeout(config.payment_gateway_timeout)
                .map_err(InfraError::from)?;
            tracing::info!(base_url = %base_url, "Using HTTP payment gateway");
            Arc::new(HttpPaymentGateway::new(client, base_url, api_key.clone())?)
        }
    };

    let notifier: Arc<dyn NotificationSender> = match &config.resend_api_key {
        Some(api_key) => Arc::new(ResendNotificationSender::new(
            build_client().map_err(InfraError::from)?,
            api_key.clone(),
            config.notification_from_email.clone(),
        )),
        None => {
            tracing::info!("RESEND_API_KEY not set, billing notices are only logged");
            Arc::new(LogNotificationSender)
        }
    };

    let access: Arc<dyn AccessPolicy> = Arc::new(RoleBasedAccessPolicy);

    let plan_use_cases = PlanCatalogUseCases::new(plan_repo.clone(), access.clone());

    let subscription_use_cases = SubscriptionUseCases::new(
        subscription_repo.clone(),
        campus_repo,
        plan_repo.clone(),
        access,
        Arc::new(NoDiscount),
        notifier.clone(),
        Arc::new(EntityLocks::new()),
    );

    let payment_use_cases = PaymentUseCases::new(
        subscription_use_cases.clone(),
        payment_repo.clone(),
        gateway,
        invoices,
        notifier,
        config.payment_gateway_timeout,
    );

    let analytics_use_cases = AnalyticsUseCases::new(subscription_repo, plan_repo, payment_repo);

    Ok(AppState {
        config: Arc::new(config),
        plan_use_cases: Arc::new(plan_use_cases),
        subscription_use_cases: Arc::new(subscription_use_cases),
        payment_use_cases: Arc::new(payment_use_cases),
        analytics_use_cases: Arc::new(analytics_use_cases),
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "campus_billing=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // Optional file with structured JSON logs
    let json_layer = std::env::var("LOG_FILE")
        .ok()
        .and_then(|path| match File::create(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("cannot create log file {path}: {e}");
                None
            }
        })
        .map(|file| {
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(true)
                .with_span_list(true)
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
