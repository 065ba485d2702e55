use std::{sync::Arc, time::Instant};

use tracing::{debug, warn};

use crate::{
    clients::{database::DatabaseClient, registry::ProviderRegistry},
    models::{
        health::{ChannelCoverage, EngineHealth, StoreCheck},
        payload::NotificationType,
    },
};

const REPORTED_CHANNELS: [NotificationType; 4] = [
    NotificationType::Email,
    NotificationType::Sms,
    NotificationType::Push,
    NotificationType::InApp,
];

pub struct HealthChecker {
    database: DatabaseClient,
    registry: Arc<ProviderRegistry>,
}

impl HealthChecker {
    pub fn new(database: DatabaseClient, registry: Arc<ProviderRegistry>) -> Self {
        Self { database, registry }
    }

    pub async fn check(&self) -> EngineHealth {
        EngineHealth::assemble(self.probe_store().await, self.coverage())
    }

    async fn probe_store(&self) -> StoreCheck {
        let start = Instant::now();

        match self.database.ping().await {
            Ok(()) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                debug!(latency_ms, "Queue store reachable");
                StoreCheck::reachable(latency_ms)
            }
            Err(e) => {
                warn!(error = %e, "Queue store unreachable");
                StoreCheck::unreachable(e.to_string())
            }
        }
    }

    fn coverage(&self) -> Vec<ChannelCoverage> {
        REPORTED_CHANNELS
            .iter()
            .map(|&channel| ChannelCoverage {
                channel,
                provider: self.registry.resolve(channel).map(|p| p.name()),
            })
            .collect()
    }
}
