use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info, warn};

use crate::{
    clients::provider::Provider,
    error::NotificationError,
    models::{
        payload::{NotificationPayload, NotificationType},
        response::{NotificationResponse, local_id},
        sendgrid::{
            SendGridAddress, SendGridClickTracking, SendGridContent, SendGridMail,
            SendGridPersonalization, SendGridTrackingSettings,
        },
        validation::missing_recipient_reason,
    },
    utils::redact_recipient,
};

const DEFAULT_FROM_EMAIL: &str = "noreply@localhost";
const DEFAULT_SUBJECT: &str = "Notification";

pub struct SendGridEmailProvider {
    http_client: Client,
    api_key: String,
    from_email: String,
    from_name: Option<String>,
    base_url: String,
}

impl SendGridEmailProvider {
    pub fn new(
        http_client: Client,
        api_key: &str,
        from_email: Option<&str>,
        from_name: Option<&str>,
        base_url: &str,
    ) -> Result<Self, NotificationError> {
        if api_key.trim().is_empty() {
            return Err(NotificationError::Configuration(
                "SendGrid API key not configured".to_string(),
            ));
        }

        info!(base_url, "SendGrid email provider initialized");

        Ok(Self {
            http_client,
            api_key: api_key.to_string(),
            from_email: from_email.unwrap_or(DEFAULT_FROM_EMAIL).to_string(),
            from_name: from_name.map(str::to_string),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_mail(&self, recipient: &str, payload: &NotificationPayload) -> SendGridMail {
        let mut content = Vec::new();

        if !payload.body.is_empty() {
            content.push(SendGridContent {
                content_type: "text/plain".to_string(),
                value: payload.body.clone(),
            });
        }

        if let Some(html) = payload.html_body.as_ref().filter(|html| !html.is_empty()) {
            content.push(SendGridContent {
                content_type: "text/html".to_string(),
                value: html.clone(),
            });
        }

        let tracking_settings = payload.action_url.as_ref().map(|_| SendGridTrackingSettings {
            click_tracking: SendGridClickTracking {
                enable: true,
                enable_text: false,
            },
        });

        let mut custom_args = HashMap::new();
        custom_args.insert("organization_id".to_string(), payload.organization_id.clone());
        if let Some(action_url) = &payload.action_url {
            custom_args.insert("action_url".to_string(), action_url.clone());
        }

        SendGridMail {
            personalizations: vec![SendGridPersonalization {
                to: vec![SendGridAddress {
                    email: recipient.to_string(),
                    name: None,
                }],
            }],
            from: SendGridAddress {
                email: self.from_email.clone(),
                name: self.from_name.clone(),
            },
            subject: payload
                .subject
                .clone()
                .or_else(|| payload.title.clone())
                .unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            content,
            tracking_settings,
            custom_args,
        }
    }
}

#[async_trait]
impl Provider for SendGridEmailProvider {
    fn name(&self) -> &'static str {
        "sendgrid"
    }

    fn channel(&self) -> NotificationType {
        NotificationType::Email
    }

    async fn send(&self, payload: &NotificationPayload) -> NotificationResponse {
        let Some(recipient) = payload.recipient_email.as_deref().filter(|to| !to.trim().is_empty())
        else {
            warn!(
                provider = "sendgrid",
                organization_id = %payload.organization_id,
                "Email notification skipped: no recipient"
            );
            return NotificationResponse::failed(
                local_id("sg"),
                missing_recipient_reason(NotificationType::Email),
            );
        };

        let mail = self.build_mail(recipient.trim(), payload);
        let url = format!("{}/v3/mail/send", self.base_url);

        let response = match self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&mail)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(
                    provider = "sendgrid",
                    organization_id = %payload.organization_id,
                    error = %e,
                    "SendGrid request failed"
                );
                return NotificationResponse::failed(
                    local_id("sg"),
                    format!("SendGrid request failed: {}", e),
                );
            }
        };

        let status = response.status();

        if status.is_success() {
            let id = response
                .headers()
                .get("x-message-id")
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| local_id("sg"));

            info!(
                provider = "sendgrid",
                organization_id = %payload.organization_id,
                to = %redact_recipient(recipient),
                subject = %mail.subject,
                message_id = %id,
                "Email notification sent via SendGrid API"
            );

            NotificationResponse::sent(id)
        } else {
            let error_text = response.text().await.unwrap_or_default();

            error!(
                provider = "sendgrid",
                organization_id = %payload.organization_id,
                status = status.as_u16(),
                error = %error_text,
                "SendGrid API returned an error"
            );

            NotificationResponse::failed(
                local_id("sg"),
                format!("SendGrid API error ({}): {}", status.as_u16(), error_text),
            )
        }
    }
}
