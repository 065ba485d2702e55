//! In-process stores for local runs and tests.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    clients::store::{AuditSink, QueueStore, TemplateStore},
    error::NotificationError,
    models::{
        audit::CreateAuditLog,
        queue::{QueueFilter, QueuePatch, QueuedNotification},
        template::NotificationTemplate,
    },
};

#[derive(Default)]
pub struct InMemoryQueueStore {
    rows: RwLock<Vec<QueuedNotification>>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: Uuid) -> Option<QueuedNotification> {
        self.rows.read().await.iter().find(|row| row.id == id).cloned()
    }

    pub async fn all(&self) -> Vec<QueuedNotification> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn insert(&self, notification: &QueuedNotification) -> Result<(), NotificationError> {
        self.rows.write().await.push(notification.clone());
        Ok(())
    }

    async fn select(&self, filter: &QueueFilter) -> Result<Vec<QueuedNotification>, NotificationError> {
        let rows = self.rows.read().await;
        let mut selected: Vec<_> = rows.iter().filter(|row| filter.matches(row)).cloned().collect();
        selected.sort_by_key(|row| row.created_at);

        if let Some(limit) = filter.limit {
            selected.truncate(limit.max(0) as usize);
        }

        Ok(selected)
    }

    async fn claim(
        &self,
        filter: &QueueFilter,
        lease: Duration,
    ) -> Result<Vec<QueuedNotification>, NotificationError> {
        let now = Utc::now();
        let lease = chrono::Duration::from_std(lease)
            .map_err(|e| NotificationError::Unavailable(e.to_string()))?;

        let mut rows = self.rows.write().await;
        let mut candidates: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| filter.matches(row))
            .filter(|(_, row)| row.claimed_until.is_none_or(|until| until <= now))
            .map(|(index, _)| index)
            .collect();
        candidates.sort_by_key(|&index| rows[index].created_at);

        if let Some(limit) = filter.limit {
            candidates.truncate(limit.max(0) as usize);
        }

        let mut claimed = Vec::with_capacity(candidates.len());
        for index in candidates {
            rows[index].claimed_until = Some(now + lease);
            claimed.push(rows[index].clone());
        }

        Ok(claimed)
    }

    async fn update(&self, id: Uuid, patch: &QueuePatch) -> Result<(), NotificationError> {
        let mut rows = self.rows.write().await;

        if let Some(row) = rows.iter_mut().find(|row| row.id == id) {
            patch.apply(row);
        }

        Ok(())
    }

    async fn tenants(&self, filter: &QueueFilter) -> Result<Vec<String>, NotificationError> {
        let rows = self.rows.read().await;
        let mut tenants: Vec<String> = rows
            .iter()
            .filter(|row| filter.matches(row))
            .map(|row| row.tenant_id.clone())
            .collect();
        tenants.sort();
        tenants.dedup();
        Ok(tenants)
    }
}

#[derive(Default)]
pub struct InMemoryTemplateStore {
    templates: RwLock<HashMap<(Option<String>, String), NotificationTemplate>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, template: NotificationTemplate) {
        let key = (template.organization_id.clone(), template.template_key.clone());
        self.templates.write().await.insert(key, template);
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn find(
        &self,
        organization_id: &str,
        template_key: &str,
    ) -> Result<Option<NotificationTemplate>, NotificationError> {
        let templates = self.templates.read().await;

        let scoped = templates.get(&(Some(organization_id.to_string()), template_key.to_string()));
        let global = || templates.get(&(None, template_key.to_string()));

        Ok(scoped.or_else(global).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryAuditSink {
    records: RwLock<Vec<CreateAuditLog>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<CreateAuditLog> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, log: CreateAuditLog) -> Result<(), NotificationError> {
        self.records.write().await.push(log);
        Ok(())
    }
}
