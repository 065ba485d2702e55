use std::{
    collections::HashMap,
    fmt::{Display, Formatter, Result},
};

use serde::{Deserialize, Serialize};

/// Delivery channel of a notification.
///
/// `InApp` is part of the platform vocabulary but no provider in this engine
/// delivers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    #[default]
    Email,
    Sms,
    Push,
    InApp,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Email => "email",
            NotificationType::Sms => "sms",
            NotificationType::Push => "push",
            NotificationType::InApp => "in_app",
        }
    }
}

impl Display for NotificationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.as_str())
    }
}

/// Advisory only; delivery order never depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// A logical notification request.
///
/// Serialized in camelCase so queue snapshots stay readable by the rest of
/// the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub organization_id: String,

    #[serde(rename = "type")]
    pub notification_type: NotificationType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_firebase_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default)]
    pub body: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_body: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,

    #[serde(default)]
    pub priority: Priority,
}

impl NotificationPayload {
    pub fn email(organization_id: &str, recipient: &str, subject: &str, body: &str) -> Self {
        Self {
            organization_id: organization_id.to_string(),
            notification_type: NotificationType::Email,
            recipient_email: Some(recipient.to_string()),
            subject: Some(subject.to_string()),
            body: body.to_string(),
            ..Default::default()
        }
    }

    pub fn sms(organization_id: &str, recipient: &str, body: &str) -> Self {
        Self {
            organization_id: organization_id.to_string(),
            notification_type: NotificationType::Sms,
            recipient_phone: Some(recipient.to_string()),
            body: body.to_string(),
            ..Default::default()
        }
    }

    pub fn push(organization_id: &str, token: &str, title: &str, body: &str) -> Self {
        Self {
            organization_id: organization_id.to_string(),
            notification_type: NotificationType::Push,
            recipient_firebase_token: Some(token.to_string()),
            title: Some(title.to_string()),
            body: body.to_string(),
            ..Default::default()
        }
    }

    /// The recipient field matching this payload's channel, if non-empty.
    pub fn recipient(&self) -> Option<&str> {
        let field = match self.notification_type {
            NotificationType::Email => self.recipient_email.as_deref(),
            NotificationType::Sms => self.recipient_phone.as_deref(),
            NotificationType::Push => self.recipient_firebase_token.as_deref(),
            NotificationType::InApp => self.user_id.as_deref(),
        };

        field.map(str::trim).filter(|value| !value.is_empty())
    }
}
