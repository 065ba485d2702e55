use serde::{Deserialize, Serialize};

/// Form body of `POST /2010-04-01/Accounts/{sid}/Messages.json`.
#[derive(Debug, Clone, Serialize)]
pub struct TwilioMessageForm {
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body")]
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwilioMessageResponse {
    pub sid: Option<String>,
    pub status: Option<String>,
}
