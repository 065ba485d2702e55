use std::{sync::Arc, time::Duration};

use anyhow::Result;
use notification_engine::{
    clients::{memory::InMemoryTemplateStore, registry::ProviderRegistry},
    jobs::{
        SchedulerSettings, process_pending_notifications, retry_failed_notifications_job,
        run_scheduler,
    },
    models::{
        payload::NotificationType,
        retry::{BatchSummary, RetrySummary},
        status::QueueStatus,
    },
    service::NotificationService,
};

use crate::common::{
    BrokenAuditSink, RecordingQueueStore, StubProvider, TenantOutageQueueStore,
    UnavailableQueueStore, email_payload, harness, seed_row,
};

fn service_over(store: Arc<RecordingQueueStore>) -> NotificationService {
    let registry = ProviderRegistry::new().with_provider(StubProvider::new(NotificationType::Email));
    NotificationService::new(
        Arc::new(registry),
        store,
        Arc::new(InMemoryTemplateStore::new()),
        Arc::new(BrokenAuditSink),
    )
}

/// Test: the batch size is passed to the store as the claim limit
#[tokio::test]
async fn pending_batch_size_limits_claim() -> Result<()> {
    let store = Arc::new(RecordingQueueStore::new());
    for _ in 0..30 {
        seed_row(&store.inner, &email_payload("Hello"), |row| row).await;
    }

    let summary = process_pending_notifications(&service_over(store.clone()), 25).await;

    assert_eq!(summary.processed, 25);
    assert_eq!(*store.claim_limits.lock().unwrap(), vec![Some(25)]);

    let still_pending = store
        .inner
        .all()
        .await
        .iter()
        .filter(|row| row.status == QueueStatus::Pending)
        .count();
    assert_eq!(still_pending, 5);

    Ok(())
}

/// Test: pending rows are delivered and their outcome written back
#[tokio::test]
async fn pending_rows_are_delivered() -> Result<()> {
    let h = harness();
    let ok = seed_row(&h.queue, &email_payload("Hello"), |row| row).await;
    let bad = seed_row(&h.queue, &email_payload("FAIL"), |row| row).await;

    let summary = process_pending_notifications(&h.service, 50).await;

    assert_eq!(
        summary,
        BatchSummary {
            processed: 2,
            succeeded: 1,
            failed: 1
        }
    );

    let ok = h.queue.get(ok).await.expect("row present");
    assert_eq!(ok.status, QueueStatus::Sent);
    assert_eq!(ok.attempt_count, 1);
    assert!(ok.sent_at.is_some());

    let bad = h.queue.get(bad).await.expect("row present");
    assert_eq!(bad.status, QueueStatus::Failed);
    assert_eq!(bad.attempt_count, 1);
    assert!(bad.last_error.is_some());

    Ok(())
}

/// Test: a pending row with a null payload is skipped without a send
#[tokio::test]
async fn pending_null_payload_is_skipped() -> Result<()> {
    let h = harness();
    let id = seed_row(&h.queue, &email_payload("Hello"), |mut row| {
        row.payload = Some(serde_json::Value::Null);
        row
    })
    .await;

    let summary = process_pending_notifications(&h.service, 50).await;

    assert_eq!(summary.processed, 0);
    assert_eq!(h.email.calls(), 0);
    assert_eq!(h.queue.get(id).await.map(|r| r.status), Some(QueueStatus::Pending));

    Ok(())
}

/// Test: only pending rows are picked up by the batch
#[tokio::test]
async fn pending_batch_ignores_other_statuses() -> Result<()> {
    let h = harness();
    seed_row(&h.queue, &email_payload("Hello"), |mut row| {
        row.status = QueueStatus::Failed;
        row
    })
    .await;

    let summary = process_pending_notifications(&h.service, 50).await;

    assert_eq!(summary, BatchSummary::default());

    Ok(())
}

/// Test: the retry job covers every tenant and sums their results
#[tokio::test]
async fn retry_job_aggregates_tenants() -> Result<()> {
    let h = harness();
    for (org, body) in [("org-1", "Hello"), ("org-2", "FAIL"), ("org-2", "Hello")] {
        let mut payload = email_payload(body);
        payload.organization_id = org.to_string();
        seed_row(&h.queue, &payload, |mut row| {
            row.status = QueueStatus::Failed;
            row.attempt_count = 1;
            row
        })
        .await;
    }

    let summary = retry_failed_notifications_job(&h.service).await;

    assert_eq!(
        summary,
        RetrySummary {
            retried: 3,
            succeeded: 2,
            failed: 1
        }
    );

    Ok(())
}

/// Test: one tenant's store failure doesn't stop or zero out the others
#[tokio::test]
async fn retry_job_continues_past_failing_tenant() -> Result<()> {
    let store = Arc::new(TenantOutageQueueStore::new("org-2"));
    for org in ["org-1", "org-2", "org-3"] {
        let mut payload = email_payload("Hello");
        payload.organization_id = org.to_string();
        seed_row(&store.inner, &payload, |mut row| {
            row.status = QueueStatus::Failed;
            row.attempt_count = 1;
            row
        })
        .await;
    }

    let registry = ProviderRegistry::new().with_provider(StubProvider::new(NotificationType::Email));
    let service = NotificationService::new(
        Arc::new(registry),
        store.clone(),
        Arc::new(InMemoryTemplateStore::new()),
        Arc::new(BrokenAuditSink),
    );

    let summary = retry_failed_notifications_job(&service).await;

    assert_eq!(
        summary,
        RetrySummary {
            retried: 2,
            succeeded: 2,
            failed: 0
        }
    );

    let statuses: Vec<(String, QueueStatus)> = store
        .inner
        .all()
        .await
        .into_iter()
        .map(|row| (row.tenant_id, row.status))
        .collect();
    assert!(statuses.contains(&("org-1".to_string(), QueueStatus::Sent)));
    assert!(statuses.contains(&("org-2".to_string(), QueueStatus::Failed)));
    assert!(statuses.contains(&("org-3".to_string(), QueueStatus::Sent)));

    Ok(())
}

/// Test: store outages make both jobs report zero instead of erroring
#[tokio::test]
async fn jobs_swallow_store_outages() -> Result<()> {
    let service = NotificationService::new(
        Arc::new(ProviderRegistry::new()),
        Arc::new(UnavailableQueueStore),
        Arc::new(InMemoryTemplateStore::new()),
        Arc::new(BrokenAuditSink),
    );

    assert_eq!(process_pending_notifications(&service, 50).await, BatchSummary::default());
    assert_eq!(retry_failed_notifications_job(&service).await, RetrySummary::default());

    Ok(())
}

/// Test: the scheduler runs the pending job and stops on shutdown
#[tokio::test]
async fn scheduler_processes_pending_until_shutdown() -> Result<()> {
    let h = harness();
    let id = seed_row(&h.queue, &email_payload("Hello"), |row| row).await;

    let settings = SchedulerSettings {
        pending_interval: Duration::from_secs(60),
        retry_interval: Duration::from_secs(60),
        pending_batch_size: 10,
    };

    run_scheduler(h.service.clone(), settings, tokio::time::sleep(Duration::from_millis(200))).await;

    assert_eq!(h.queue.get(id).await.map(|r| r.status), Some(QueueStatus::Sent));

    Ok(())
}
