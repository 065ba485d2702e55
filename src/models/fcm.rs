use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct FcmRequest {
    pub message: FcmMessage,
}

#[derive(Debug, Clone, Serialize)]
pub struct FcmMessage {
    pub token: String,
    pub notification: FcmNotification,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpush: Option<FcmWebpush>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FcmNotification {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FcmWebpush {
    pub fcm_options: FcmWebpushOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct FcmWebpushOptions {
    pub link: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FcmResponse {
    /// `projects/<project>/messages/<id>`
    pub name: Option<String>,
}
