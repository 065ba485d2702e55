//! Batch jobs run on a schedule.
//!
//! Both jobs swallow store outages: they log the error and report a zero
//! summary so the scheduler driving them keeps running.

use std::{future::Future, time::Duration};

use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use crate::{
    config::Config,
    error::NotificationError,
    models::{
        queue::QueueFilter,
        retry::{BatchSummary, RetrySelection, RetrySummary},
        status::QueueStatus,
    },
    service::NotificationService,
};

/// Delivers up to `batch_size` pending notifications.
pub async fn process_pending_notifications(
    service: &NotificationService,
    batch_size: i64,
) -> BatchSummary {
    match service.process_pending(batch_size).await {
        Ok(summary) => {
            info!(
                processed = summary.processed,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Pending notification batch finished"
            );
            summary
        }
        Err(e) => {
            error!(error = %e, "Pending notification batch failed");
            BatchSummary::default()
        }
    }
}

/// Runs `retry_failed` for every tenant with outstanding failures. A tenant
/// whose pass fails is logged and skipped; the others still run.
pub async fn retry_failed_notifications_job(service: &NotificationService) -> RetrySummary {
    match retry_all_tenants(service).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Retry job failed");
            RetrySummary::default()
        }
    }
}

async fn retry_all_tenants(service: &NotificationService) -> Result<RetrySummary, NotificationError> {
    let retry_config = service.retry_config();

    let filter = match retry_config.selection {
        RetrySelection::FailedOnly => {
            QueueFilter::with_status(QueueStatus::Failed).below_attempts(retry_config.max_attempts)
        }
        RetrySelection::BackoffElapsed => {
            QueueFilter::with_status(QueueStatus::Failed).or_status(QueueStatus::Retrying)
        }
    };

    let tenants = service.queue_store().tenants(&filter).await?;
    let mut summary = RetrySummary::default();

    for tenant_id in &tenants {
        match service.retry_failed(tenant_id, retry_config.max_attempts).await {
            Ok(tenant_summary) => summary.absorb(tenant_summary),
            Err(e) => error!(tenant_id = %tenant_id, error = %e, "Retry pass failed for tenant"),
        }
    }

    info!(
        tenants = tenants.len(),
        retried = summary.retried,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Retry job finished"
    );

    Ok(summary)
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub pending_interval: Duration,
    pub retry_interval: Duration,
    pub pending_batch_size: i64,
}

impl From<&Config> for SchedulerSettings {
    fn from(config: &Config) -> Self {
        Self {
            pending_interval: Duration::from_secs(config.pending_job_interval_seconds.max(1)),
            retry_interval: Duration::from_secs(config.retry_job_interval_seconds.max(1)),
            pending_batch_size: config.pending_batch_size,
        }
    }
}

/// In-process scheduler. Each job awaits its previous run before the next
/// tick is taken, so the two never overlap with themselves here; cross-process
/// overlap is handled by row claims.
pub async fn run_scheduler<S>(service: NotificationService, settings: SchedulerSettings, shutdown: S)
where
    S: Future<Output = ()>,
{
    let mut pending_tick = interval(settings.pending_interval);
    pending_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut retry_tick = interval(settings.retry_interval);
    retry_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::pin!(shutdown);

    info!(
        pending_interval_secs = settings.pending_interval.as_secs(),
        retry_interval_secs = settings.retry_interval.as_secs(),
        "Notification scheduler started"
    );

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Notification scheduler stopping");
                break;
            }
            _ = pending_tick.tick() => {
                process_pending_notifications(&service, settings.pending_batch_size).await;
            }
            _ = retry_tick.tick() => {
                retry_failed_notifications_job(&service).await;
            }
        }
    }
}
