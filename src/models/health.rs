use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::payload::NotificationType;

/// Channels an external provider is expected to serve.
pub const DELIVERABLE_CHANNELS: [NotificationType; 3] = [
    NotificationType::Email,
    NotificationType::Sms,
    NotificationType::Push,
];

/// Ordered from best to worst.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCheck {
    pub status: HealthStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StoreCheck {
    pub fn reachable(latency_ms: u64) -> Self {
        Self {
            status: HealthStatus::Healthy,
            latency_ms: Some(latency_ms),
            error: None,
        }
    }

    pub fn unreachable(error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelCoverage {
    pub channel: NotificationType,
    pub provider: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineHealth {
    pub status: HealthStatus,
    pub checked_at: DateTime<Utc>,
    pub store: StoreCheck,
    pub channels: Vec<ChannelCoverage>,
}

impl EngineHealth {
    /// An unreachable store makes the engine unhealthy; a deliverable channel
    /// without a provider only degrades it.
    pub fn assemble(store: StoreCheck, channels: Vec<ChannelCoverage>) -> Self {
        let uncovered = channels
            .iter()
            .any(|c| c.provider.is_none() && DELIVERABLE_CHANNELS.contains(&c.channel));

        let coverage = if uncovered {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            status: store.status.max(coverage),
            checked_at: Utc::now(),
            store,
            channels,
        }
    }
}
