use std::{collections::HashMap, sync::Arc};

use reqwest::Client;
use tracing::{info, warn};

use crate::{
    clients::{
        fcm::{FcmAuth, FirebasePushProvider},
        provider::Provider,
        sendgrid::SendGridEmailProvider,
        twilio::TwilioSmsProvider,
    },
    config::Config,
    error::NotificationError,
    models::payload::NotificationType,
};

/// Channel to provider lookup, built once at start-up and read-only after.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<NotificationType, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every channel whose configuration is present. A channel that
    /// is missing keys or fails construction is skipped; the others still
    /// register.
    pub fn from_config(config: &Config, http_client: Client) -> Self {
        let mut registry = Self::new();

        if let Some(api_key) = config.sendgrid_api_key.as_deref() {
            registry.register_result(SendGridEmailProvider::new(
                http_client.clone(),
                api_key,
                config.sendgrid_from_email.as_deref(),
                config.sendgrid_from_name.as_deref(),
                &config.sendgrid_api_url,
            ));
        }

        if let (Some(sid), Some(token), Some(from)) = (
            config.twilio_account_sid.as_deref(),
            config.twilio_auth_token.as_deref(),
            config.twilio_phone_number.as_deref(),
        ) {
            registry.register_result(TwilioSmsProvider::new(
                http_client.clone(),
                sid,
                token,
                from,
                &config.twilio_api_url,
            ));
        }

        if let Some(project_id) = config.firebase_project_id.as_deref() {
            let auth = FcmAuth::from_settings(
                config.firebase_api_key.as_deref(),
                config.firebase_use_application_credentials,
            );
            registry.register_result(FirebasePushProvider::new(
                http_client,
                project_id,
                auth,
                &config.fcm_api_url,
            ));
        }

        info!(channels = ?registry.channels(), "Provider registry ready");

        registry
    }

    fn register_result<P: Provider + 'static>(&mut self, provider: Result<P, NotificationError>) {
        match provider {
            Ok(provider) => self.register(Arc::new(provider)),
            Err(e) => warn!(error = %e, "Skipping misconfigured provider"),
        }
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.channel(), provider);
    }

    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.register(provider);
        self
    }

    pub fn resolve(&self, channel: NotificationType) -> Option<Arc<dyn Provider>> {
        self.providers.get(&channel).cloned()
    }

    pub fn channels(&self) -> Vec<NotificationType> {
        let mut channels: Vec<_> = self.providers.keys().copied().collect();
        channels.sort_by_key(|channel| channel.as_str());
        channels
    }
}
