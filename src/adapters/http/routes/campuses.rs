use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, identity::current_actor},
    app_error::AppResult,
    domain::entities::usage::UsageDeltas,
    use_cases::subscription::SubscriptionUseCases,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/subscriptions", get(list_subscriptions))
        .route("/{id}/subscription", get(current_subscription))
        .route("/{id}/usage", get(check_usage).post(update_usage))
}

async fn list_subscriptions(
    State(subscriptions): State<Arc<SubscriptionUseCases>>,
    headers: HeaderMap,
    Path(campus_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    current_actor(&headers)?;
    let list = subscriptions.list_campus_subscriptions(campus_id).await?;
    Ok(Json(list))
}

/// The campus's ACTIVE or TRIAL subscription, `null` when there is none.
async fn current_subscription(
    State(subscriptions): State<Arc<SubscriptionUseCases>>,
    headers: HeaderMap,
    Path(campus_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    current_actor(&headers)?;
    let current = subscriptions.get_current_subscription(campus_id).await?;
    Ok(Json(current))
}

async fn check_usage(
    State(subscriptions): State<Arc<SubscriptionUseCases>>,
    headers: HeaderMap,
    Path(campus_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    current_actor(&headers)?;
    let report = subscriptions.check_usage_limits(campus_id).await?;
    Ok(Json(report))
}

/// Usage emitters are never blocked: without a live subscription this is a 204.
async fn update_usage(
    State(subscriptions): State<Arc<SubscriptionUseCases>>,
    headers: HeaderMap,
    Path(campus_id): Path<Uuid>,
    Json(deltas): Json<UsageDeltas>,
) -> AppResult<impl IntoResponse> {
    current_actor(&headers)?;
    let response = match subscriptions
        .update_usage_counters(campus_id, deltas)
        .await?
    {
        Some(subscription) => Json(subscription).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    };
    Ok(response)
}
