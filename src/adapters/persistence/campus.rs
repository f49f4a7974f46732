use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::campus::{CampusProfile, CampusRepo},
};

#[async_trait]
impl CampusRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<CampusProfile>> {
        let row = sqlx::query("SELECT id, name, is_active, is_subscribed FROM campuses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.map(|row| CampusProfile {
            id: row.get("id"),
            name: row.get("name"),
            is_active: row.get("is_active"),
            is_subscribed: row.get("is_subscribed"),
        }))
    }
}
