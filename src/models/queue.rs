use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::{
    payload::NotificationPayload,
    status::QueueStatus,
};

/// A persisted unit of delivery work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedNotification {
    pub id: Uuid,
    pub tenant_id: String,
    pub notification_type: String,

    /// Verbatim snapshot of the original request. May be `null` in rows
    /// written by other parts of the platform.
    pub payload: Option<JsonValue>,

    pub status: QueueStatus,
    pub attempt_count: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub claimed_until: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QueuedNotification {
    pub fn new(
        payload: &NotificationPayload,
        status: QueueStatus,
    ) -> Result<Self, serde_json::Error> {
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id: payload.organization_id.clone(),
            notification_type: payload.notification_type.as_str().to_string(),
            payload: Some(serde_json::to_value(payload)?),
            status,
            attempt_count: 0,
            last_error: None,
            next_attempt_at: None,
            claimed_until: None,
            sent_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_attempts(mut self, attempt_count: i32) -> Self {
        self.attempt_count = attempt_count;
        self
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.last_error = Some(error);
        self
    }

    pub fn with_sent_at(mut self, sent_at: DateTime<Utc>) -> Self {
        self.sent_at = Some(sent_at);
        self
    }

    /// Decodes the stored snapshot, or `None` when it is missing or unreadable.
    pub fn decode_payload(&self) -> Option<NotificationPayload> {
        let value = self.payload.as_ref().filter(|v| !v.is_null())?;
        serde_json::from_value(value.clone()).ok()
    }
}

/// Row selection for `QueueStore::select` and `QueueStore::claim`.
#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    pub tenant_id: Option<String>,
    pub statuses: Vec<QueueStatus>,
    /// Only rows with `attempt_count < max_attempts`.
    pub max_attempts: Option<i32>,
    /// Only rows with `attempt_count >= min_attempts`.
    pub min_attempts: Option<i32>,
    /// Only rows with no `next_attempt_at` or one at or before this instant.
    pub due_at: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl QueueFilter {
    pub fn with_status(status: QueueStatus) -> Self {
        Self {
            statuses: vec![status],
            ..Default::default()
        }
    }

    pub fn for_tenant(mut self, tenant_id: &str) -> Self {
        self.tenant_id = Some(tenant_id.to_string());
        self
    }

    pub fn or_status(mut self, status: QueueStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn below_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn at_least_attempts(mut self, min_attempts: i32) -> Self {
        self.min_attempts = Some(min_attempts);
        self
    }

    pub fn due_by(mut self, at: DateTime<Utc>) -> Self {
        self.due_at = Some(at);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, row: &QueuedNotification) -> bool {
        if let Some(tenant_id) = &self.tenant_id {
            if &row.tenant_id != tenant_id {
                return false;
            }
        }

        if !self.statuses.is_empty() && !self.statuses.contains(&row.status) {
            return false;
        }

        if let Some(max_attempts) = self.max_attempts {
            if row.attempt_count >= max_attempts {
                return false;
            }
        }

        if let Some(min_attempts) = self.min_attempts {
            if row.attempt_count < min_attempts {
                return false;
            }
        }

        if let (Some(due_at), Some(next_attempt_at)) = (self.due_at, row.next_attempt_at) {
            if next_attempt_at > due_at {
                return false;
            }
        }

        true
    }
}

/// Partial update applied by `QueueStore::update`. Unset fields are left
/// untouched; every update releases the row's claim.
#[derive(Debug, Clone, Default)]
pub struct QueuePatch {
    pub status: Option<QueueStatus>,
    pub attempt_count: Option<i32>,
    pub last_error: Option<String>,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl QueuePatch {
    pub fn status(status: QueueStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn attempts(mut self, attempt_count: i32) -> Self {
        self.attempt_count = Some(attempt_count);
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(error.into());
        self
    }

    pub fn next_attempt(mut self, at: DateTime<Utc>) -> Self {
        self.next_attempt_at = Some(at);
        self
    }

    pub fn sent(mut self, at: DateTime<Utc>) -> Self {
        self.sent_at = Some(at);
        self
    }

    pub fn apply(&self, row: &mut QueuedNotification) {
        if let Some(status) = self.status {
            row.status = status;
        }
        if let Some(attempt_count) = self.attempt_count {
            row.attempt_count = attempt_count;
        }
        if let Some(last_error) = &self.last_error {
            row.last_error = Some(last_error.clone());
        }
        if let Some(next_attempt_at) = self.next_attempt_at {
            row.next_attempt_at = Some(next_attempt_at);
        }
        if let Some(sent_at) = self.sent_at {
            row.sent_at = Some(sent_at);
        }
        row.claimed_until = None;
        row.updated_at = Utc::now();
    }
}
