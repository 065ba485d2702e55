use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::models::retry::{RetryConfig, RetrySelection};

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub database_url: String,

    pub sendgrid_api_key: Option<String>,
    pub sendgrid_from_email: Option<String>,
    pub sendgrid_from_name: Option<String>,
    #[serde(default = "default_sendgrid_api_url")]
    pub sendgrid_api_url: String,

    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_phone_number: Option<String>,
    #[serde(default = "default_twilio_api_url")]
    pub twilio_api_url: String,

    pub firebase_project_id: Option<String>,
    pub firebase_api_key: Option<String>,
    #[serde(default)]
    pub firebase_use_application_credentials: bool,
    #[serde(default = "default_fcm_api_url")]
    pub fcm_api_url: String,

    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,

    #[serde(default = "default_retry_base_delay_seconds")]
    pub retry_base_delay_seconds: u64,
    #[serde(default = "default_retry_max_delay_seconds")]
    pub retry_max_delay_seconds: u64,
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: i32,
    #[serde(default = "default_retry_batch_size")]
    pub retry_batch_size: i64,
    #[serde(default)]
    pub retry_selection: RetrySelection,

    #[serde(default = "default_pending_batch_size")]
    pub pending_batch_size: i64,
    #[serde(default = "default_claim_lease_seconds")]
    pub claim_lease_seconds: u64,

    #[serde(default = "default_bulk_concurrency")]
    pub bulk_concurrency: usize,

    #[serde(default = "default_pending_job_interval_seconds")]
    pub pending_job_interval_seconds: u64,
    #[serde(default = "default_retry_job_interval_seconds")]
    pub retry_job_interval_seconds: u64,

    #[serde(default = "default_server_port")]
    pub server_port: u16,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
    #[serde(default = "default_true")]
    pub log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;
        Ok(config)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_retry_attempts,
            base_delay_seconds: self.retry_base_delay_seconds,
            max_delay_seconds: self.retry_max_delay_seconds,
            batch_size: self.retry_batch_size,
            claim_lease_seconds: self.claim_lease_seconds,
            selection: self.retry_selection,
        }
    }
}

fn default_sendgrid_api_url() -> String {
    "https://api.sendgrid.com".to_string()
}

fn default_twilio_api_url() -> String {
    "https://api.twilio.com".to_string()
}

fn default_fcm_api_url() -> String {
    "https://fcm.googleapis.com".to_string()
}

fn default_http_timeout_seconds() -> u64 {
    10
}

fn default_retry_base_delay_seconds() -> u64 {
    300
}

fn default_retry_max_delay_seconds() -> u64 {
    86_400
}

fn default_max_retry_attempts() -> i32 {
    3
}

fn default_retry_batch_size() -> i64 {
    100
}

fn default_pending_batch_size() -> i64 {
    50
}

fn default_claim_lease_seconds() -> u64 {
    300
}

fn default_bulk_concurrency() -> usize {
    10
}

fn default_pending_job_interval_seconds() -> u64 {
    60
}

fn default_retry_job_interval_seconds() -> u64 {
    300
}

fn default_server_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}
