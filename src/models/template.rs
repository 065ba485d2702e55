use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::payload::NotificationType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationTemplate {
    pub id: Uuid,
    /// `None` for a platform-wide template.
    pub organization_id: Option<String>,
    pub template_key: String,
    pub subject: Option<String>,
    pub body_template: String,
    pub html_body_template: Option<String>,
    /// In preference order.
    pub channels: Vec<NotificationType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    pub subject: Option<String>,
    pub body: String,
    pub html_body: Option<String>,
}

/// Recipients offered to a template send; the template's channel order picks
/// the one used.
#[derive(Debug, Clone, Default)]
pub struct TemplateRecipients {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub firebase_token: Option<String>,
}

impl TemplateRecipients {
    pub fn email(address: &str) -> Self {
        Self {
            email: Some(address.to_string()),
            ..Default::default()
        }
    }

    pub fn phone(number: &str) -> Self {
        Self {
            phone: Some(number.to_string()),
            ..Default::default()
        }
    }

    pub fn for_channel(&self, channel: NotificationType) -> Option<&str> {
        let recipient = match channel {
            NotificationType::Email => self.email.as_deref(),
            NotificationType::Sms => self.phone.as_deref(),
            NotificationType::Push => self.firebase_token.as_deref(),
            NotificationType::InApp => None,
        };

        recipient.filter(|value| !value.trim().is_empty())
    }
}
