use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info, warn};

use crate::{
    clients::provider::Provider,
    error::NotificationError,
    models::{
        payload::{NotificationPayload, NotificationType},
        response::{NotificationResponse, local_id},
        twilio::{TwilioMessageForm, TwilioMessageResponse},
        validation::missing_recipient_reason,
    },
    utils::redact_recipient,
};

pub struct TwilioSmsProvider {
    http_client: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    base_url: String,
}

impl TwilioSmsProvider {
    pub fn new(
        http_client: Client,
        account_sid: &str,
        auth_token: &str,
        from_number: &str,
        base_url: &str,
    ) -> Result<Self, NotificationError> {
        if [account_sid, auth_token, from_number]
            .iter()
            .any(|value| value.trim().is_empty())
        {
            return Err(NotificationError::Configuration(
                "Twilio credentials not configured".to_string(),
            ));
        }

        info!(base_url, "Twilio SMS provider initialized");

        Ok(Self {
            http_client,
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Provider for TwilioSmsProvider {
    fn name(&self) -> &'static str {
        "twilio"
    }

    fn channel(&self) -> NotificationType {
        NotificationType::Sms
    }

    async fn send(&self, payload: &NotificationPayload) -> NotificationResponse {
        let Some(recipient) = payload.recipient_phone.as_deref().filter(|to| !to.trim().is_empty())
        else {
            warn!(
                provider = "twilio",
                organization_id = %payload.organization_id,
                "SMS notification skipped: no recipient"
            );
            return NotificationResponse::failed(
                local_id("tw"),
                missing_recipient_reason(NotificationType::Sms),
            );
        };

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );

        let form = TwilioMessageForm {
            to: recipient.trim().to_string(),
            from: self.from_number.clone(),
            body: payload.body.clone(),
        };

        let response = match self
            .http_client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(
                    provider = "twilio",
                    organization_id = %payload.organization_id,
                    error = %e,
                    "Twilio request failed"
                );
                return NotificationResponse::failed(
                    local_id("tw"),
                    format!("Twilio request failed: {}", e),
                );
            }
        };

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            error!(
                provider = "twilio",
                organization_id = %payload.organization_id,
                status = status.as_u16(),
                error = %error_text,
                "Twilio API returned an error"
            );

            return NotificationResponse::failed(
                local_id("tw"),
                format!("Twilio API error ({}): {}", status.as_u16(), error_text),
            );
        }

        let id = match response.json::<TwilioMessageResponse>().await {
            Ok(body) => body.sid.unwrap_or_else(|| local_id("tw")),
            Err(_) => local_id("tw"),
        };

        info!(
            provider = "twilio",
            organization_id = %payload.organization_id,
            to = %redact_recipient(recipient),
            message_id = %id,
            "SMS notification sent via Twilio API"
        );

        NotificationResponse::sent(id)
    }
}
