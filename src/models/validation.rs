use anyhow::{Result, anyhow};

use crate::models::payload::{NotificationPayload, NotificationType};

/// Reason reported when the channel's recipient field is absent.
pub fn missing_recipient_reason(channel: NotificationType) -> &'static str {
    match channel {
        NotificationType::Email => "Recipient email not provided",
        NotificationType::Sms => "Recipient phone number not provided",
        NotificationType::Push => "Recipient Firebase token not provided",
        NotificationType::InApp => "Recipient user id not provided",
    }
}

/// Shape check applied before a payload is accepted into the queue.
pub fn validate_payload(payload: &NotificationPayload) -> Result<()> {
    if payload.organization_id.trim().is_empty() {
        return Err(anyhow!("Organization id cannot be empty"));
    }

    if payload.recipient().is_none() {
        return Err(anyhow!(missing_recipient_reason(payload.notification_type)));
    }

    let has_html = payload
        .html_body
        .as_deref()
        .is_some_and(|html| !html.trim().is_empty());

    if payload.body.trim().is_empty() && !has_html {
        return Err(anyhow!("Notification body cannot be empty"));
    }

    if payload.notification_type == NotificationType::Email {
        let address = payload.recipient().unwrap_or_default();
        if !address.contains('@') {
            return Err(anyhow!("Recipient email is not a valid address"));
        }
    }

    Ok(())
}
