use std::str::FromStr;

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::role_level::{Actor, RoleLevel},
};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Resolve the acting user from headers set by the upstream identity proxy.
pub fn current_actor(headers: &HeaderMap) -> AppResult<Actor> {
    let user_id = header_str(headers, ACTOR_ID_HEADER)
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or(AppError::Unauthenticated)?;
    let role = header_str(headers, ACTOR_ROLE_HEADER)
        .and_then(|v| RoleLevel::from_str(v).ok())
        .ok_or(AppError::Unauthenticated)?;
    Ok(Actor::new(user_id, role))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
