//! Storage seams of the engine.
//!
//! Each operation is a single-row or single-statement call; the engine never
//! spans a transaction across them.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::NotificationError,
    models::{
        audit::CreateAuditLog,
        queue::{QueueFilter, QueuePatch, QueuedNotification},
        template::NotificationTemplate,
    },
};

#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn insert(&self, notification: &QueuedNotification) -> Result<(), NotificationError>;

    async fn select(&self, filter: &QueueFilter) -> Result<Vec<QueuedNotification>, NotificationError>;

    /// Selects like `select`, oldest first, skipping rows under an unexpired
    /// claim, and leases the returned rows for `lease`.
    async fn claim(
        &self,
        filter: &QueueFilter,
        lease: Duration,
    ) -> Result<Vec<QueuedNotification>, NotificationError>;

    async fn update(&self, id: Uuid, patch: &QueuePatch) -> Result<(), NotificationError>;

    /// Tenants owning at least one row matching `filter`.
    async fn tenants(&self, filter: &QueueFilter) -> Result<Vec<String>, NotificationError>;
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// The organization's template for `template_key`, falling back to a
    /// platform-wide one.
    async fn find(
        &self,
        organization_id: &str,
        template_key: &str,
    ) -> Result<Option<NotificationTemplate>, NotificationError>;
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, log: CreateAuditLog) -> Result<(), NotificationError>;
}
