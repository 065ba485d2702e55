//! Engine error types.
//!
//! Send-path operations report delivery problems as a failed
//! `NotificationResponse`; these errors cover the cases that must reach the
//! caller: provider misconfiguration, rejected queue writes, and store outages.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("{0}")]
    Configuration(String),

    #[error("Invalid notification payload: {0}")]
    Validation(String),

    #[error("Store operation failed: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_err = NotificationError::Configuration("SendGrid API key not configured".into());
        assert_eq!(config_err.to_string(), "SendGrid API key not configured");

        let validation_err = NotificationError::Validation("Recipient email not provided".into());
        assert_eq!(
            validation_err.to_string(),
            "Invalid notification payload: Recipient email not provided"
        );

        let store_err = NotificationError::Unavailable("connection refused".into());
        assert_eq!(store_err.to_string(), "Store unavailable: connection refused");
    }
}
