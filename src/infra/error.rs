use thiserror::Error;

/// Infrastructure errors that can occur during application startup.
///
/// Display messages are safe for logs. Debug output includes the `#[source]`
/// chain, which may contain connection strings, so log with `%e`.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("Database connection failed. Check DATABASE_URL and ensure the database is running.")]
    DatabaseConnection(#[source] sqlx::Error),

    #[error("Configuration error: {var} {reason}")]
    InvalidConfig { var: &'static str, reason: String },

    #[error("HTTP client initialization failed")]
    HttpClient(#[source] reqwest::Error),

    #[error("TCP bind failed")]
    TcpBind(#[source] std::io::Error),

    #[error("Server error")]
    Server(#[source] std::io::Error),
}

impl From<sqlx::Error> for InfraError {
    fn from(e: sqlx::Error) -> Self {
        InfraError::DatabaseConnection(e)
    }
}

impl From<reqwest::Error> for InfraError {
    fn from(e: reqwest::Error) -> Self {
        InfraError::HttpClient(e)
    }
}
