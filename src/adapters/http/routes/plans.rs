use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, identity::current_actor},
    app_error::AppResult,
    use_cases::plan_catalog::{CreatePlanInput, UpdatePlanInput},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_plans).post(create_plan))
        .route(
            "/{id}",
            get(get_plan).patch(update_plan).delete(deactivate_plan),
        )
}

#[derive(Deserialize)]
struct ListPlansQuery {
    #[serde(default)]
    include_inactive: bool,
}

async fn list_plans(
    State(app_state): State<AppState>,
    Query(query): Query<ListPlansQuery>,
) -> AppResult<impl IntoResponse> {
    let plans = app_state
        .plan_use_cases
        .list_plans(query.include_inactive)
        .await?;
    Ok(Json(plans))
}

async fn get_plan(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let plan = app_state.plan_use_cases.get_plan(id).await?;
    Ok(Json(plan))
}

async fn create_plan(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreatePlanInput>,
) -> AppResult<impl IntoResponse> {
    let actor = current_actor(&headers)?;
    let plan = app_state.plan_use_cases.create_plan(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

async fn update_plan(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePlanInput>,
) -> AppResult<impl IntoResponse> {
    let actor = current_actor(&headers)?;
    let plan = app_state
        .plan_use_cases
        .update_plan(&actor, id, input)
        .await?;
    Ok(Json(plan))
}

/// Soft delete: the plan stays readable but can't be subscribed to.
async fn deactivate_plan(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = current_actor(&headers)?;
    let plan = app_state.plan_use_cases.deactivate_plan(&actor, id).await?;
    Ok(Json(plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use serde_json::json;

    use crate::{
        adapters::http::identity::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER},
        test_utils::{TestAppStateBuilder, create_test_plan},
    };

    fn build_test_server(app_state: AppState) -> TestServer {
        TestServer::new(router().with_state(app_state)).unwrap()
    }

    #[tokio::test]
    async fn list_hides_inactive_plans_by_default() {
        let active = create_test_plan(|_| {});
        let retired = create_test_plan(|p| {
            p.name = "legacy".to_string();
            p.is_active = false;
        });
        let server = build_test_server(
            TestAppStateBuilder::new()
                .with_plan(active.clone())
                .with_plan(retired)
                .build(),
        );

        let response = server.get("/").await;
        response.assert_status(StatusCode::OK);
        let plans = response.json::<Vec<serde_json::Value>>();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0]["id"], active.id.to_string());

        let response = server.get("/?include_inactive=true").await;
        assert_eq!(response.json::<Vec<serde_json::Value>>().len(), 2);
    }

    #[tokio::test]
    async fn create_plan_as_system_admin_returns_201() {
        let server = build_test_server(TestAppStateBuilder::new().build());

        let response = server
            .post("/")
            .add_header(ACTOR_ID_HEADER, Uuid::new_v4().to_string())
            .add_header(ACTOR_ROLE_HEADER, "system_administrator")
            .json(&json!({
                "name": "premium",
                "display_name": "Premium",
                "price": "249.00",
                "currency": "usd",
                "billing_period": "yearly",
                "trial_days": 14,
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["name"], "premium");
        assert_eq!(body["currency"], "USD");
        assert_eq!(body["is_active"], true);
    }

    #[tokio::test]
    async fn create_plan_as_campus_admin_returns_403() {
        let server = build_test_server(TestAppStateBuilder::new().build());

        let response = server
            .post("/")
            .add_header(ACTOR_ID_HEADER, Uuid::new_v4().to_string())
            .add_header(ACTOR_ROLE_HEADER, "campus_administrator")
            .json(&json!({
                "name": "premium",
                "display_name": "Premium",
                "price": "249.00",
                "currency": "USD",
            }))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn duplicate_plan_name_returns_409() {
        let existing = create_test_plan(|_| {});
        let server = build_test_server(TestAppStateBuilder::new().with_plan(existing).build());

        let response = server
            .post("/")
            .add_header(ACTOR_ID_HEADER, Uuid::new_v4().to_string())
            .add_header(ACTOR_ROLE_HEADER, "system_administrator")
            .json(&json!({
                "name": "basic",
                "display_name": "Basic again",
                "price": "10.00",
                "currency": "USD",
            }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn patch_rejects_negative_price() {
        let plan = create_test_plan(|_| {});
        let server = build_test_server(TestAppStateBuilder::new().with_plan(plan.clone()).build());

        let response = server
            .patch(&format!("/{}", plan.id))
            .add_header(ACTOR_ID_HEADER, Uuid::new_v4().to_string())
            .add_header(ACTOR_ROLE_HEADER, "system_administrator")
            .json(&json!({ "price": "-1.00" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_deactivates_plan() {
        let plan = create_test_plan(|_| {});
        let server = build_test_server(TestAppStateBuilder::new().with_plan(plan.clone()).build());

        let response = server
            .delete(&format!("/{}", plan.id))
            .add_header(ACTOR_ID_HEADER, Uuid::new_v4().to_string())
            .add_header(ACTOR_ROLE_HEADER, "system_administrator")
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.json::<serde_json::Value>()["is_active"], false);

        let response = server.get(&format!("/{}", plan.id)).await;
        response.assert_status(StatusCode::OK);
        assert_eq!(response.json::<serde_json::Value>()["is_active"], false);
    }
}
