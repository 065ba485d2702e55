use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::status::DeliveryStatus;

/// Result of a single delivery attempt.
///
/// The `status` tag and its payload are one value, so a sent outcome always
/// carries `sentAt` and a failed one always carries `failureReason`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DeliveryOutcome {
    Sent {
        #[serde(rename = "sentAt")]
        sent_at: DateTime<Utc>,
    },
    Failed {
        #[serde(rename = "failureReason")]
        failure_reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub id: String,

    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

impl NotificationResponse {
    pub fn sent(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            outcome: DeliveryOutcome::Sent {
                sent_at: Utc::now(),
            },
        }
    }

    pub fn failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            outcome: DeliveryOutcome::Failed {
                failure_reason: reason.into(),
            },
        }
    }

    /// A failure raised by the engine itself rather than by a provider.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::failed(local_id("ntf"), reason)
    }

    pub fn status(&self) -> DeliveryStatus {
        match self.outcome {
            DeliveryOutcome::Sent { .. } => DeliveryStatus::Sent,
            DeliveryOutcome::Failed { .. } => DeliveryStatus::Failed,
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Sent { .. })
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        match self.outcome {
            DeliveryOutcome::Sent { sent_at } => Some(sent_at),
            DeliveryOutcome::Failed { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            DeliveryOutcome::Sent { .. } => None,
            DeliveryOutcome::Failed { failure_reason } => Some(failure_reason),
        }
    }
}

/// Locally generated message id, e.g. `sg-<uuid>`.
pub fn local_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}
