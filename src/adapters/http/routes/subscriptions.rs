use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, identity::current_actor},
    app_error::AppResult,
    application::{
        ports::payment_gateway::PaymentRequest,
        use_cases::subscription::{
            BillingPatch, CancelSubscriptionInput, ChangePlanInput, CreateSubscriptionInput,
        },
    },
};

const DEFAULT_GROWTH_WINDOW_DAYS: i64 = 30;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_subscription))
        .route("/{id}", get(get_subscription).patch(update_subscription))
        .route("/{id}/cancel", post(cancel_subscription))
        .route("/{id}/change-plan", post(change_plan))
        .route("/{id}/analytics", get(get_analytics))
        .route("/{id}/growth", get(get_growth))
        .route("/{id}/payments", get(list_payments).post(process_payment))
}

async fn create_subscription(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateSubscriptionInput>,
) -> AppResult<impl IntoResponse> {
    let actor = current_actor(&headers)?;
    let subscription = app_state
        .subscription_use_cases
        .create_subscription(&actor, input)
        .await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

async fn get_subscription(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    current_actor(&headers)?;
    let subscription = app_state.subscription_use_cases.get_subscription(id).await?;
    Ok(Json(subscription))
}

async fn update_subscription(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(patch): Json<BillingPatch>,
) -> AppResult<impl IntoResponse> {
    let actor = current_actor(&headers)?;
    let subscription = app_state
        .subscription_use_cases
        .update_subscription(&actor, id, patch)
        .await?;
    Ok(Json(subscription))
}

async fn cancel_subscription(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<CancelSubscriptionInput>,
) -> AppResult<impl IntoResponse> {
    let actor = current_actor(&headers)?;
    let subscription = app_state
        .subscription_use_cases
        .cancel_subscription(&actor, id, input)
        .await?;
    Ok(Json(subscription))
}

async fn change_plan(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<ChangePlanInput>,
) -> AppResult<impl IntoResponse> {
    let actor = current_actor(&headers)?;
    let outcome = app_state
        .subscription_use_cases
        .change_subscription_plan(&actor, id, input)
        .await?;
    Ok(Json(outcome))
}

async fn get_analytics(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    current_actor(&headers)?;
    let analytics = app_state
        .analytics_use_cases
        .get_subscription_analytics(id)
        .await?;
    Ok(Json(analytics))
}

#[derive(Deserialize)]
struct GrowthQuery {
    window_days: Option<i64>,
}

async fn get_growth(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Query(query): Query<GrowthQuery>,
) -> AppResult<impl IntoResponse> {
    current_actor(&headers)?;
    let growth = app_state
        .analytics_use_cases
        .get_payment_growth(id, query.window_days.unwrap_or(DEFAULT_GROWTH_WINDOW_DAYS))
        .await?;
    Ok(Json(growth))
}

async fn list_payments(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    current_actor(&headers)?;
    let payments = app_state
        .payment_use_cases
        .list_subscription_payments(id)
        .await?;
    Ok(Json(payments))
}

/// Declined payments are still recorded, so both outcomes answer 201.
async fn process_payment(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<PaymentRequest>,
) -> AppResult<impl IntoResponse> {
    let actor = current_actor(&headers)?;
    let payment = app_state
        .payment_use_cases
        .process_payment(&actor, id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}
