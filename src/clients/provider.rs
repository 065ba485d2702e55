use async_trait::async_trait;

use crate::models::{
    payload::{NotificationPayload, NotificationType},
    response::NotificationResponse,
};

/// A delivery backend for one channel.
///
/// `send` never fails: network errors, non-2xx responses and missing
/// recipients all come back as a failed `NotificationResponse`. Missing
/// credentials are rejected when the provider is constructed.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    fn channel(&self) -> NotificationType;

    async fn send(&self, payload: &NotificationPayload) -> NotificationResponse;
}

impl std::fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name())
            .field("channel", &self.channel())
            .finish()
    }
}
