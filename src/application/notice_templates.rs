use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    application::ports::notifications::{BillingNotice, NoticeKind},
    domain::entities::subscription_status::SubscriptionStatus,
};

const BRAND_NAME: &str = "Campus Billing";

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|| "immediately".to_string())
}

fn format_money(amount: Decimal, currency: &str) -> String {
    format!("{:.2} {}", amount, currency.to_uppercase())
}

/// Render a billing notice to `(subject, html)`.
pub fn render_notice(notice: &BillingNotice) -> (String, String) {
    match &notice.kind {
        NoticeKind::Welcome {
            plan_name,
            status,
            trial_end_date,
        } => {
            let subject = format!("Welcome to {}", plan_name);
            let lead = match status {
                SubscriptionStatus::Trial => format!(
                    "Your <strong>{}</strong> trial is active until {}.",
                    plan_name,
                    format_date(*trial_end_date)
                ),
                _ => format!("Your <strong>{}</strong> subscription is active.", plan_name),
            };
            let html = wrap_notice(
                "Your subscription has started",
                &lead,
                "",
                "a subscription was created for your campus",
            );
            (subject, html)
        }
        NoticeKind::Cancellation {
            reason,
            immediate,
            grace_period_end,
        } => {
            let subject = "Your subscription has been canceled".to_string();
            let lead = if *immediate {
                "Your subscription was canceled and access has ended.".to_string()
            } else {
                format!(
                    "Your subscription was canceled. Access continues until {}.",
                    format_date(*grace_period_end)
                )
            };
            let body = reason
                .as_deref()
                .map(|r| {
                    format!(
                        r#"<p style="margin:12px 0 0;color:#374151;">Reason given: {}</p>"#,
                        r
                    )
                })
                .unwrap_or_default();
            let html = wrap_notice(
                "Subscription canceled",
                &lead,
                &body,
                "your campus subscription changed",
            );
            (subject, html)
        }
        NoticeKind::PlanChanged {
            old_plan_name,
            new_plan_name,
            prorated_amount,
            currency,
        } => {
            let subject = format!("Your plan changed to {}", new_plan_name);
            let lead = format!(
                "Your subscription moved from <strong>{}</strong> to <strong>{}</strong>.",
                old_plan_name, new_plan_name
            );
            let proration = if prorated_amount.is_sign_negative() {
                format!(
                    "A credit of {} applies for the rest of this period.",
                    format_money(prorated_amount.abs(), currency)
                )
            } else {
                format!(
                    "The prorated difference for this period is {}.",
                    format_money(*prorated_amount, currency)
                )
            };
            let body = format!(
                r#"<p style="margin:12px 0 0;color:#374151;">{}</p>"#,
                proration
            );
            let html = wrap_notice(
                "Plan changed",
                &lead,
                &body,
                "your campus subscription changed",
            );
            (subject, html)
        }
        NoticeKind::PaymentSucceeded {
            amount,
            currency,
            transaction_id,
            ..
        } => {
            let subject = "Payment received".to_string();
            let lead = format!(
                "We received your payment of <strong>{}</strong>.",
                format_money(*amount, currency)
            );
            let body = transaction_id
                .as_deref()
                .map(|t| {
                    format!(
                        r#"<p style="margin:12px 0 0;color:#374151;">Transaction reference: {}</p>"#,
                        t
                    )
                })
                .unwrap_or_default();
            let html = wrap_notice("Thank you", &lead, &body, "a payment was made");
            (subject, html)
        }
        NoticeKind::PaymentFailed {
            amount,
            currency,
            reason,
            ..
        } => {
            let subject = "Payment failed".to_string();
            let lead = format!(
                "Your payment of <strong>{}</strong> could not be processed.",
                format_money(*amount, currency)
            );
            let body = format!(
                r#"<p style="margin:12px 0 0;color:#374151;">{}</p><p style="margin:12px 0 0;color:#374151;">Please update your payment details and try again.</p>"#,
                reason
            );
            let html = wrap_notice("Payment failed", &lead, &body, "a payment was attempted");
            (subject, html)
        }
    }
}

pub fn wrap_notice(headline: &str, lead: &str, body_html: &str, reason: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <body style="background:#f8fafc;margin:0;padding:24px;font-family:Arial,Helvetica,sans-serif;">
    <div style="max-width:560px;margin:0 auto;background:#ffffff;border:1px solid #e5e7eb;border-radius:12px;padding:24px;">
      <div style="font-size:12px;letter-spacing:0.08em;text-transform:uppercase;color:#6b7280;">{brand}</div>
      <h1 style="margin:12px 0 8px;font-size:22px;color:#111827;">{headline}</h1>
      <p style="margin:0 0 12px;font-size:15px;color:#111827;line-height:1.6;">{lead}</p>
      {body_html}
      <div style="margin-top:20px;padding-top:16px;border-top:1px solid #e5e7eb;">
        <p style="margin:0;font-size:13px;color:#4b5563;">Why you got this email: {reason}.</p>
      </div>
    </div>
  </body>
</html>
"#,
        brand = BRAND_NAME,
        headline = headline,
        lead = lead,
        body_html = body_html,
        reason = reason,
    )
}
