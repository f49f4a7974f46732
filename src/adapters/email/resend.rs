use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        notice_templates::render_notice,
        ports::notifications::{BillingNotice, NotificationSender},
    },
};

const RESEND_EMAILS_URL: &str = "https://api.resend.com/emails";

/// Mails billing notices through Resend.
#[derive(Clone)]
pub struct ResendNotificationSender {
    client: Client,
    api_key: SecretString,
    from: String,
}

impl ResendNotificationSender {
    pub fn new(client: Client, api_key: SecretString, from: String) -> Self {
        Self {
            client,
            api_key,
            from,
        }
    }
}

#[derive(Serialize)]
struct ResendReq<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[async_trait]
impl NotificationSender for ResendNotificationSender {
    async fn send(&self, notice: &BillingNotice) -> AppResult<()> {
        let Some(to) = notice.recipient.as_deref() else {
            tracing::debug!(
                subscription_id = %notice.subscription_id,
                notice = notice.kind.as_str(),
                "No billing email on file, notice skipped"
            );
            return Ok(());
        };

        let (subject, html) = render_notice(notice);
        let body = ResendReq {
            from: &self.from,
            to: [to],
            subject: &subject,
            html: &html,
        };

        self.client
            .post(RESEND_EMAILS_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to send email: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Internal(format!("Email API error: {e}")))?;

        tracing::info!(
            subscription_id = %notice.subscription_id,
            notice = notice.kind.as_str(),
            "Billing notice sent"
        );
        Ok(())
    }
}

/// Writes notices to the log. Used when no mail provider is configured.
#[derive(Clone, Copy, Default)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, notice: &BillingNotice) -> AppResult<()> {
        let (subject, _) = render_notice(notice);
        tracing::info!(
            subscription_id = %notice.subscription_id,
            campus_id = %notice.campus_id,
            notice = notice.kind.as_str(),
            recipient = notice.recipient.as_deref().unwrap_or("-"),
            subject = %subject,
            "Billing notice (mail disabled)"
        );
        Ok(())
    }
}
