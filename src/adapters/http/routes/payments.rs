use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, identity::current_actor},
    app_error::AppResult,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(get_payment))
}

async fn get_payment(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    current_actor(&headers)?;
    let payment = app_state.payment_use_cases.get_payment(id).await?;
    Ok(Json(payment))
}
