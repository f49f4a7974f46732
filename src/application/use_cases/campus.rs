use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::app_error::AppResult;

/// Directory record of a billable campus. Billing only reads it and flips `is_subscribed`.
#[derive(Debug, Clone, Serialize)]
pub struct CampusProfile {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub is_subscribed: bool,
}

#[async_trait]
pub trait CampusRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<CampusProfile>>;
}
