pub mod campuses;
pub mod payments;
pub mod plans;
pub mod subscriptions;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/subscriptions", subscriptions::router())
        .nest("/payments", payments::router())
        .nest("/campuses", campuses::router())
        .nest("/plans", plans::router())
}
