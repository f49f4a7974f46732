use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

use crate::infra::error::InfraError;

pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub cors_origin: HeaderValue,
    pub payment_gateway: PaymentGatewayConfig,
    /// Upper bound on a single gateway attempt
    pub payment_gateway_timeout: Duration,
    /// Without a key, notices are logged instead of mailed.
    pub resend_api_key: Option<SecretString>,
    pub notification_from_email: String,
}

pub enum PaymentGatewayConfig {
    /// Local simulator driven by test tokens
    Dummy,
    Http { base_url: Url, api_key: SecretString },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, InfraError> {
        let database_url: String = get_env("DATABASE_URL");
        let database_max_connections: u32 = get_env_default("DATABASE_MAX_CONNECTIONS", 5);
        let bind_addr: SocketAddr =
            get_env_default("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3001)));
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .map_err(|_| InfraError::InvalidConfig {
                    var: "CORS_ORIGIN",
                    reason: "must be a valid header value".into(),
                })?;

        let payment_gateway = gateway_from_parts(
            get_env_default("USE_DUMMY_GATEWAY", false),
            std::env::var("PAYMENT_GATEWAY_URL").ok(),
            std::env::var("PAYMENT_GATEWAY_API_KEY").ok(),
        )?;
        let timeout_secs: u64 = get_env_default("PAYMENT_GATEWAY_TIMEOUT_SECS", 30);
        if timeout_secs == 0 {
            return Err(InfraError::InvalidConfig {
                var: "PAYMENT_GATEWAY_TIMEOUT_SECS",
                reason: "must be at least 1".into(),
            });
        }

        let resend_api_key = std::env::var("RESEND_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(|k| SecretString::new(k.into()));
        let notification_from_email: String = get_env_default(
            "NOTIFICATION_FROM_EMAIL",
            String::from("billing@localhost"),
        );

        Ok(Self {
            database_url,
            database_max_connections,
            bind_addr,
            cors_origin,
            payment_gateway,
            payment_gateway_timeout: Duration::from_secs(timeout_secs),
            resend_api_key,
            notification_from_email,
        })
    }
}

/// Pick the gateway adapter. No URL means the simulator.
fn gateway_from_parts(
    use_dummy: bool,
    url: Option<String>,
    api_key: Option<String>,
) -> Result<PaymentGatewayConfig, InfraError> {
    let Some(url) = url.filter(|u| !u.trim().is_empty()) else {
        return Ok(PaymentGatewayConfig::Dummy);
    };
    if use_dummy {
        return Ok(PaymentGatewayConfig::Dummy);
    }

    let base_url = url
        .trim()
        .parse::<Url>()
        .map_err(|e| InfraError::InvalidConfig {
            var: "PAYMENT_GATEWAY_URL",
            reason: e.to_string(),
        })?;
    let api_key = api_key
        .filter(|k| !k.trim().is_empty())
        .ok_or(InfraError::InvalidConfig {
            var: "PAYMENT_GATEWAY_API_KEY",
            reason: "is required when PAYMENT_GATEWAY_URL is set".into(),
        })?;

    Ok(PaymentGatewayConfig::Http {
        base_url,
        api_key: SecretString::new(api_key.into()),
    })
}
