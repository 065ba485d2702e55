use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{
    models::{payload::NotificationPayload, response::NotificationResponse, status::DeliveryStatus},
    utils::redact_recipient,
};

/// One audit record per delivery attempt.
#[derive(Debug, Clone, Serialize)]
pub struct CreateAuditLog {
    pub organization_id: String,
    pub user_id: Option<String>,
    pub channel: String,
    pub recipient: Option<String>,
    pub status: DeliveryStatus,
    pub provider_message_id: String,
    pub error_message: Option<String>,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl CreateAuditLog {
    pub fn new(
        organization_id: String,
        channel: String,
        provider_message_id: String,
        status: DeliveryStatus,
    ) -> Self {
        Self {
            organization_id,
            user_id: None,
            channel,
            recipient: None,
            status,
            provider_message_id,
            error_message: None,
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    /// Builds the record for one attempt; the recipient is stored redacted.
    pub fn for_attempt(payload: &NotificationPayload, response: &NotificationResponse) -> Self {
        let mut log = Self::new(
            payload.organization_id.clone(),
            payload.notification_type.to_string(),
            response.id.clone(),
            response.status(),
        )
        .with_metadata(serde_json::json!({ "priority": payload.priority }));

        log.user_id = payload.user_id.clone();
        log.recipient = payload.recipient().map(redact_recipient);

        match response.failure_reason() {
            Some(reason) => log.with_error(reason.to_string()),
            None => log,
        }
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error_message = Some(error);
        self
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = metadata;
        self
    }
}
