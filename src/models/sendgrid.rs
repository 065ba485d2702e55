use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SendGridMail {
    pub personalizations: Vec<SendGridPersonalization>,
    pub from: SendGridAddress,
    pub subject: String,
    pub content: Vec<SendGridContent>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_settings: Option<SendGridTrackingSettings>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub custom_args: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendGridPersonalization {
    pub to: Vec<SendGridAddress>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendGridAddress {
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendGridContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendGridTrackingSettings {
    pub click_tracking: SendGridClickTracking,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendGridClickTracking {
    pub enable: bool,
    pub enable_text: bool,
}
