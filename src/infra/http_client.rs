//! HTTP client factory with consistent timeout configuration.
//!
//! Outbound clients (payment gateway, Resend) are built here rather than
//! through `reqwest::Client::new()` so none of them can wait forever.

use reqwest::Client;
use std::time::Duration;

/// Connect timeout (TCP handshake + TLS).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request/response time for calls that should finish within seconds.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build a client with the default timeouts.
pub fn build_client() -> Result<Client, reqwest::Error> {
    build_client_with_timeout(DEFAULT_REQUEST_TIMEOUT)
}

/// Build a client whose request timeout is `request_timeout`.
///
/// The connect timeout never exceeds the request timeout.
pub fn build_client_with_timeout(request_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(request_timeout))
        .timeout(request_timeout)
        .build()
}
