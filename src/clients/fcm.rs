use std::sync::Arc;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use gcp_auth::TokenProvider;
use reqwest::Client;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::{
    clients::provider::Provider,
    error::NotificationError,
    models::{
        fcm::{FcmMessage, FcmNotification, FcmRequest, FcmResponse, FcmWebpush, FcmWebpushOptions},
        payload::{NotificationPayload, NotificationType},
        response::{NotificationResponse, local_id},
        validation::missing_recipient_reason,
    },
    utils::stringify_metadata,
};

const FCM_SCOPES: &[&str] = &["https://www.googleapis.com/auth/firebase.messaging"];

/// How the provider authenticates against the FCM HTTP v1 API.
#[derive(Debug, Clone)]
pub enum FcmAuth {
    ApiKey(String),
    ApplicationDefault,
    Missing,
}

impl FcmAuth {
    pub fn from_settings(api_key: Option<&str>, use_application_credentials: bool) -> Self {
        match api_key.filter(|key| !key.trim().is_empty()) {
            Some(key) => FcmAuth::ApiKey(key.to_string()),
            None if use_application_credentials => FcmAuth::ApplicationDefault,
            None => FcmAuth::Missing,
        }
    }
}

pub struct FirebasePushProvider {
    http_client: Client,
    project_id: String,
    auth: FcmAuth,
    base_url: String,
    token_provider: OnceCell<Arc<dyn TokenProvider>>,
}

impl FirebasePushProvider {
    pub fn new(
        http_client: Client,
        project_id: &str,
        auth: FcmAuth,
        base_url: &str,
    ) -> Result<Self, NotificationError> {
        if project_id.trim().is_empty() {
            return Err(NotificationError::Configuration(
                "Firebase project ID not configured".to_string(),
            ));
        }

        info!(project_id, "FCM push provider initialized");

        Ok(Self {
            http_client,
            project_id: project_id.to_string(),
            auth,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_provider: OnceCell::new(),
        })
    }

    fn build_request(&self, token: &str, payload: &NotificationPayload) -> FcmRequest {
        let mut data = stringify_metadata(&payload.metadata);

        let webpush = payload.action_url.as_ref().map(|link| {
            data.insert("actionUrl".to_string(), link.clone());
            FcmWebpush {
                fcm_options: FcmWebpushOptions { link: link.clone() },
            }
        });

        FcmRequest {
            message: FcmMessage {
                token: token.to_string(),
                notification: FcmNotification {
                    title: payload
                        .title
                        .clone()
                        .or_else(|| payload.subject.clone())
                        .unwrap_or_default(),
                    body: payload.body.clone(),
                },
                data,
                webpush,
            },
        }
    }

    async fn bearer_token(&self) -> Result<String, Error> {
        match &self.auth {
            FcmAuth::ApiKey(key) => Ok(key.clone()),
            FcmAuth::ApplicationDefault => {
                let provider = self
                    .token_provider
                    .get_or_try_init(|| async { gcp_auth::provider().await })
                    .await?;

                let token = provider.token(FCM_SCOPES).await?;
                Ok(token.as_str().to_string())
            }
            FcmAuth::Missing => Err(anyhow!("Firebase API key not configured")),
        }
    }

    async fn send_once(&self, bearer: &str, request: &FcmRequest) -> Result<String, Error> {
        let url = format!(
            "{}/v1/projects/{}/messages:send",
            self.base_url, self.project_id
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(bearer)
            .json(request)
            .send()
            .await
            .map_err(|e| anyhow!("FCM request failed: {}", e))?;

        let status = response.status();

        if status.is_success() {
            let body: FcmResponse = response.json().await.unwrap_or(FcmResponse { name: None });
            Ok(body.name.unwrap_or_else(|| local_id("fcm")))
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(anyhow!("FCM API error ({}): {}", status.as_u16(), error_text))
        }
    }
}

#[async_trait]
impl Provider for FirebasePushProvider {
    fn name(&self) -> &'static str {
        "firebase"
    }

    fn channel(&self) -> NotificationType {
        NotificationType::Push
    }

    async fn send(&self, payload: &NotificationPayload) -> NotificationResponse {
        let Some(device_token) = payload
            .recipient_firebase_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
        else {
            warn!(
                provider = "firebase",
                organization_id = %payload.organization_id,
                "Push notification skipped: no device token"
            );
            return NotificationResponse::failed(
                local_id("fcm"),
                missing_recipient_reason(NotificationType::Push),
            );
        };

        let bearer = match self.bearer_token().await {
            Ok(bearer) => bearer,
            Err(e) => {
                error!(provider = "firebase", error = %e, "FCM credentials unavailable");
                return NotificationResponse::failed(local_id("fcm"), e.to_string());
            }
        };

        debug!(
            organization_id = %payload.organization_id,
            data_fields = payload.metadata.len(),
            "Sending FCM push notification"
        );

        let request = self.build_request(device_token.trim(), payload);

        match self.send_once(&bearer, &request).await {
            Ok(id) => {
                info!(
                    provider = "firebase",
                    organization_id = %payload.organization_id,
                    message_id = %id,
                    "Push notification sent via FCM"
                );
                NotificationResponse::sent(id)
            }
            Err(e) => {
                error!(
                    provider = "firebase",
                    organization_id = %payload.organization_id,
                    error = %e,
                    "FCM push notification failed"
                );
                NotificationResponse::failed(local_id("fcm"), e.to_string())
            }
        }
    }
}
