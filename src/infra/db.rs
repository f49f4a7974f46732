use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

use crate::infra::error::InfraError;

pub async fn init_db(database_url: &str, max_connections: u32) -> Result<PgPool, InfraError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    info!(max_connections, "Connected to database!");
    Ok(pool)
}
