//! Notification Service: the engine's public entry points.
//!
//! Delivery outcomes are always returned as a `NotificationResponse`. Only the
//! explicit queue write and store outages surface as `Err`.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use futures_util::{StreamExt, stream};
use serde_json::Value as JsonValue;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    clients::{
        registry::ProviderRegistry,
        store::{AuditSink, QueueStore, TemplateStore},
        template::TemplateRenderer,
    },
    error::NotificationError,
    models::{
        audit::CreateAuditLog,
        payload::{NotificationPayload, NotificationType},
        queue::{QueueFilter, QueuePatch, QueuedNotification},
        response::{DeliveryOutcome, NotificationResponse},
        retry::{BatchSummary, RetryConfig, RetrySelection, RetrySummary},
        status::QueueStatus,
        template::TemplateRecipients,
        validation::validate_payload,
    },
    utils::{backoff_delay, next_attempt_at, redact_recipient},
};

const DEFAULT_BULK_CONCURRENCY: usize = 10;

#[derive(Clone)]
pub struct NotificationService {
    registry: Arc<ProviderRegistry>,
    queue_store: Arc<dyn QueueStore>,
    template_store: Arc<dyn TemplateStore>,
    audit_sink: Arc<dyn AuditSink>,
    retry_config: RetryConfig,
    bulk_concurrency: usize,
}

impl NotificationService {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        queue_store: Arc<dyn QueueStore>,
        template_store: Arc<dyn TemplateStore>,
        audit_sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            registry,
            queue_store,
            template_store,
            audit_sink,
            retry_config: RetryConfig::default(),
            bulk_concurrency: DEFAULT_BULK_CONCURRENCY,
        }
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn with_bulk_concurrency(mut self, bulk_concurrency: usize) -> Self {
        self.bulk_concurrency = bulk_concurrency.max(1);
        self
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    pub fn queue_store(&self) -> &Arc<dyn QueueStore> {
        &self.queue_store
    }

    /// Sends immediately and records the attempt in the background.
    pub async fn send(&self, payload: &NotificationPayload) -> NotificationResponse {
        let response = self.deliver(payload).await;
        self.record_attempt(payload, &response);
        response
    }

    /// Validates and stores the payload as a `pending` row; returns its id.
    pub async fn queue(&self, payload: &NotificationPayload) -> Result<Uuid, NotificationError> {
        validate_payload(payload).map_err(|e| NotificationError::Validation(e.to_string()))?;

        let queued = QueuedNotification::new(payload, QueueStatus::Pending)?;
        self.queue_store.insert(&queued).await?;

        info!(
            notification_id = %queued.id,
            organization_id = %payload.organization_id,
            channel = %payload.notification_type,
            priority = ?payload.priority,
            "Notification queued"
        );

        Ok(queued.id)
    }

    /// Sends every payload independently; the result at index `i` belongs to
    /// `payloads[i]`.
    pub async fn send_bulk(&self, payloads: &[NotificationPayload]) -> Vec<NotificationResponse> {
        let responses: Vec<NotificationResponse> = stream::iter(payloads)
            .map(|payload| self.send(payload))
            .buffered(self.bulk_concurrency)
            .collect()
            .await;

        let sent = responses.iter().filter(|r| r.is_sent()).count();
        info!(
            total = responses.len(),
            sent,
            failed = responses.len() - sent,
            "Bulk notification dispatch finished"
        );

        responses
    }

    pub async fn send_from_template(
        &self,
        organization_id: &str,
        template_key: &str,
        recipients: &TemplateRecipients,
        variables: &HashMap<String, JsonValue>,
    ) -> NotificationResponse {
        let template = match self.template_store.find(organization_id, template_key).await {
            Ok(Some(template)) => template,
            Ok(None) => {
                warn!(organization_id, template_key, "Template not found");
                return NotificationResponse::rejected(format!("Template not found: {}", template_key));
            }
            Err(e) => {
                error!(organization_id, template_key, error = %e, "Template lookup failed");
                return NotificationResponse::rejected(format!("Template lookup failed: {}", e));
            }
        };

        let Some((channel, recipient)) = template
            .channels
            .iter()
            .find_map(|&channel| recipients.for_channel(channel).map(|to| (channel, to)))
        else {
            let channels: Vec<&str> = template.channels.iter().map(|c| c.as_str()).collect();
            warn!(organization_id, template_key, "No recipient matches template channels");
            return NotificationResponse::rejected(format!(
                "No recipient supplied for template channels: {}",
                channels.join(", ")
            ));
        };

        let rendered = TemplateRenderer::render(&template, variables);

        let mut payload = NotificationPayload {
            organization_id: organization_id.to_string(),
            notification_type: channel,
            subject: rendered.subject.clone(),
            body: rendered.body,
            html_body: rendered.html_body,
            ..Default::default()
        };
        payload
            .metadata
            .insert("templateKey".to_string(), JsonValue::String(template_key.to_string()));

        match channel {
            NotificationType::Email => payload.recipient_email = Some(recipient.to_string()),
            NotificationType::Sms => payload.recipient_phone = Some(recipient.to_string()),
            NotificationType::Push => {
                payload.recipient_firebase_token = Some(recipient.to_string());
                payload.title = rendered.subject;
            }
            NotificationType::InApp => payload.user_id = Some(recipient.to_string()),
        }

        let response = self.send(&payload).await;

        if response.is_sent() {
            info!(
                organization_id,
                template_key,
                channel = %channel,
                notification_id = %response.id,
                "Template notification sent"
            );
        } else {
            warn!(
                organization_id,
                template_key,
                channel = %channel,
                reason = response.failure_reason().unwrap_or_default(),
                "Template notification failed"
            );
        }

        response
    }

    /// Re-attempts the tenant's failed rows that are below `max_attempts`.
    pub async fn retry_failed(
        &self,
        tenant_id: &str,
        max_attempts: i32,
    ) -> Result<RetrySummary, NotificationError> {
        let now = Utc::now();

        let filter = match self.retry_config.selection {
            RetrySelection::FailedOnly => QueueFilter::with_status(QueueStatus::Failed),
            RetrySelection::BackoffElapsed => {
                self.finalize_exhausted(tenant_id, max_attempts).await?;

                QueueFilter::with_status(QueueStatus::Failed)
                    .or_status(QueueStatus::Retrying)
                    .due_by(now)
            }
        }
        .for_tenant(tenant_id)
        .below_attempts(max_attempts)
        .limit(self.retry_config.batch_size);

        let candidates = self.queue_store.claim(&filter, self.claim_lease()).await?;
        let mut summary = RetrySummary::default();

        for queued in candidates {
            let Some(payload) = queued.decode_payload() else {
                warn!(notification_id = %queued.id, "Skipping queued notification with unreadable payload");
                continue;
            };

            summary.retried += 1;
            let attempt_count = queued.attempt_count + 1;
            let response = self.deliver(&payload).await;

            let patch = match &response.outcome {
                DeliveryOutcome::Sent { sent_at } => {
                    summary.succeeded += 1;
                    QueuePatch::status(QueueStatus::Sent)
                        .attempts(attempt_count)
                        .sent(*sent_at)
                }
                DeliveryOutcome::Failed { failure_reason } => {
                    summary.failed += 1;
                    let delay = backoff_delay(&self.retry_config, queued.attempt_count);

                    info!(
                        notification_id = %queued.id,
                        attempt_count,
                        delay_seconds = delay.num_seconds(),
                        "Retry failed, backing off"
                    );

                    QueuePatch::status(QueueStatus::Retrying)
                        .attempts(attempt_count)
                        .error(failure_reason.clone())
                        .next_attempt(next_attempt_at(&self.retry_config, queued.attempt_count, Utc::now()))
                }
            };

            if let Err(e) = self.queue_store.update(queued.id, &patch).await {
                error!(notification_id = %queued.id, error = %e, "Failed to update retried notification");
            }
        }

        info!(
            tenant_id,
            retried = summary.retried,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Retry pass finished"
        );

        Ok(summary)
    }

    /// Delivers up to `batch_size` pending rows, oldest first.
    pub async fn process_pending(&self, batch_size: i64) -> Result<BatchSummary, NotificationError> {
        let filter = QueueFilter::with_status(QueueStatus::Pending).limit(batch_size);
        let pending = self.queue_store.claim(&filter, self.claim_lease()).await?;
        let mut summary = BatchSummary::default();

        for queued in pending {
            let Some(payload) = queued.decode_payload() else {
                warn!(notification_id = %queued.id, "Skipping queued notification with unreadable payload");
                continue;
            };

            summary.processed += 1;
            let attempt_count = queued.attempt_count + 1;
            let response = self.deliver(&payload).await;

            let patch = match &response.outcome {
                DeliveryOutcome::Sent { sent_at } => {
                    summary.succeeded += 1;
                    QueuePatch::status(QueueStatus::Sent)
                        .attempts(attempt_count)
                        .sent(*sent_at)
                }
                DeliveryOutcome::Failed { failure_reason } => {
                    summary.failed += 1;
                    QueuePatch::status(QueueStatus::Failed)
                        .attempts(attempt_count)
                        .error(failure_reason.clone())
                }
            };

            if let Err(e) = self.queue_store.update(queued.id, &patch).await {
                error!(notification_id = %queued.id, error = %e, "Failed to update queued notification");
            }
        }

        Ok(summary)
    }

    /// Resolves the provider and performs one attempt, emitting its audit
    /// record. Does not touch the queue.
    async fn deliver(&self, payload: &NotificationPayload) -> NotificationResponse {
        let response = match self.registry.resolve(payload.notification_type) {
            Some(provider) => provider.send(payload).await,
            None => {
                warn!(
                    organization_id = %payload.organization_id,
                    channel = %payload.notification_type,
                    "No provider configured for channel"
                );
                NotificationResponse::rejected(format!(
                    "No provider configured for notification type: {}",
                    payload.notification_type
                ))
            }
        };

        self.emit_audit(payload, &response);
        response
    }

    fn emit_audit(&self, payload: &NotificationPayload, response: &NotificationResponse) {
        let sink = Arc::clone(&self.audit_sink);
        let log = CreateAuditLog::for_attempt(payload, response);

        tokio::spawn(async move {
            if let Err(e) = sink.record(log).await {
                warn!(error = %e, "Failed to write audit log");
            }
        });
    }

    fn record_attempt(&self, payload: &NotificationPayload, response: &NotificationResponse) {
        let store = Arc::clone(&self.queue_store);
        let queued = match QueuedNotification::new(payload, response.status().into()) {
            Ok(queued) => queued.with_attempts(1),
            Err(e) => {
                warn!(error = %e, "Failed to store notification in queue");
                return;
            }
        };

        let queued = match &response.outcome {
            DeliveryOutcome::Sent { sent_at } => queued.with_sent_at(*sent_at),
            DeliveryOutcome::Failed { failure_reason } => queued.with_error(failure_reason.clone()),
        };

        let recipient = payload.recipient().map(redact_recipient).unwrap_or_default();

        tokio::spawn(async move {
            if let Err(e) = store.insert(&queued).await {
                warn!(
                    error = %e,
                    notification_id = %queued.id,
                    recipient = %recipient,
                    "Failed to store notification in queue"
                );
            }
        });
    }

    /// Moves `retrying` rows that have used up their attempts to `failed`.
    async fn finalize_exhausted(&self, tenant_id: &str, max_attempts: i32) -> Result<(), NotificationError> {
        let filter = QueueFilter::with_status(QueueStatus::Retrying)
            .for_tenant(tenant_id)
            .at_least_attempts(max_attempts);

        for exhausted in self.queue_store.select(&filter).await? {
            let patch = QueuePatch::status(QueueStatus::Failed);
            if let Err(e) = self.queue_store.update(exhausted.id, &patch).await {
                error!(notification_id = %exhausted.id, error = %e, "Failed to finalize exhausted notification");
            }
        }

        Ok(())
    }

    fn claim_lease(&self) -> Duration {
        Duration::from_secs(self.retry_config.claim_lease_seconds)
    }
}
