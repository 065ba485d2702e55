use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, postgres::PgPoolOptions};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    clients::store::{AuditSink, QueueStore, TemplateStore},
    error::NotificationError,
    models::{
        audit::CreateAuditLog,
        payload::NotificationType,
        queue::{QueueFilter, QueuePatch, QueuedNotification},
        template::NotificationTemplate,
    },
};

const QUEUE_COLUMNS: &str = "id, tenant_id, notification_type, payload, status, attempt_count, \
     last_error, next_attempt_at, claimed_until, sent_at, created_at, updated_at";

#[derive(Clone)]
pub struct DatabaseClient {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct QueueRow {
    id: Uuid,
    tenant_id: String,
    notification_type: String,
    payload: Option<serde_json::Value>,
    status: String,
    attempt_count: i32,
    last_error: Option<String>,
    next_attempt_at: Option<DateTime<Utc>>,
    claimed_until: Option<DateTime<Utc>>,
    sent_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<QueueRow> for QueuedNotification {
    type Error = NotificationError;

    fn try_from(row: QueueRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(NotificationError::Unavailable)?;

        Ok(Self {
            id: row.id,
            tenant_id: row.tenant_id,
            notification_type: row.notification_type,
            payload: row.payload,
            status,
            attempt_count: row.attempt_count,
            last_error: row.last_error,
            next_attempt_at: row.next_attempt_at,
            claimed_until: row.claimed_until,
            sent_at: row.sent_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TemplateRow {
    id: Uuid,
    organization_id: Option<String>,
    template_key: String,
    subject: Option<String>,
    body_template: String,
    html_body_template: Option<String>,
    channels: Vec<String>,
}

impl DatabaseClient {
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        info!("Connecting to PostgreSQL database");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;

        info!("PostgreSQL connection established");

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), Error> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to run migrations: {}", e))?;

        info!("Database migrations applied");
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), NotificationError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &QueueFilter) {
        builder.push(" WHERE TRUE");

        if let Some(tenant_id) = &filter.tenant_id {
            builder.push(" AND tenant_id = ").push_bind(tenant_id.clone());
        }

        if !filter.statuses.is_empty() {
            let statuses: Vec<String> = filter
                .statuses
                .iter()
                .map(|status| status.as_str().to_string())
                .collect();
            builder.push(" AND status = ANY(").push_bind(statuses).push(")");
        }

        if let Some(max_attempts) = filter.max_attempts {
            builder.push(" AND attempt_count < ").push_bind(max_attempts);
        }

        if let Some(min_attempts) = filter.min_attempts {
            builder.push(" AND attempt_count >= ").push_bind(min_attempts);
        }

        if let Some(due_at) = filter.due_at {
            builder
                .push(" AND (next_attempt_at IS NULL OR next_attempt_at <= ")
                .push_bind(due_at)
                .push(")");
        }
    }

    fn into_notifications(rows: Vec<QueueRow>) -> Result<Vec<QueuedNotification>, NotificationError> {
        rows.into_iter().map(QueuedNotification::try_from).collect()
    }
}

#[async_trait]
impl QueueStore for DatabaseClient {
    async fn insert(&self, notification: &QueuedNotification) -> Result<(), NotificationError> {
        sqlx::query(
            r#"
            INSERT INTO notification_queue (
                id,
                tenant_id,
                notification_type,
                payload,
                status,
                attempt_count,
                last_error,
                next_attempt_at,
                sent_at,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(notification.id)
        .bind(&notification.tenant_id)
        .bind(&notification.notification_type)
        .bind(&notification.payload)
        .bind(notification.status.as_str())
        .bind(notification.attempt_count)
        .bind(&notification.last_error)
        .bind(notification.next_attempt_at)
        .bind(notification.sent_at)
        .bind(notification.created_at)
        .bind(notification.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                notification_id = %notification.id,
                "Failed to insert queued notification"
            );
            NotificationError::Store(e)
        })?;

        debug!(
            notification_id = %notification.id,
            status = %notification.status,
            "Queued notification stored"
        );

        Ok(())
    }

    async fn select(&self, filter: &QueueFilter) -> Result<Vec<QueuedNotification>, NotificationError> {
        let mut builder = QueryBuilder::new(format!("SELECT {} FROM notification_queue", QUEUE_COLUMNS));
        Self::push_conditions(&mut builder, filter);
        builder.push(" ORDER BY created_at");

        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }

        let rows = builder
            .build_query_as::<QueueRow>()
            .fetch_all(&self.pool)
            .await?;

        Self::into_notifications(rows)
    }

    async fn claim(
        &self,
        filter: &QueueFilter,
        lease: Duration,
    ) -> Result<Vec<QueuedNotification>, NotificationError> {
        let mut builder = QueryBuilder::new(
            "UPDATE notification_queue SET claimed_until = now() + make_interval(secs => ",
        );
        builder.push_bind(lease.as_secs_f64());
        builder.push(") WHERE id IN (SELECT id FROM notification_queue");
        Self::push_conditions(&mut builder, filter);
        builder.push(" AND (claimed_until IS NULL OR claimed_until <= now()) ORDER BY created_at");

        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }

        builder.push(" FOR UPDATE SKIP LOCKED) RETURNING ");
        builder.push(QUEUE_COLUMNS);

        let rows = builder
            .build_query_as::<QueueRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut claimed = Self::into_notifications(rows)?;
        claimed.sort_by_key(|row| row.created_at);

        debug!(claimed = claimed.len(), "Claimed queued notifications");

        Ok(claimed)
    }

    async fn update(&self, id: Uuid, patch: &QueuePatch) -> Result<(), NotificationError> {
        let result = sqlx::query(
            r#"
            UPDATE notification_queue
            SET status = COALESCE($2, status),
                attempt_count = COALESCE($3, attempt_count),
                last_error = COALESCE($4, last_error),
                next_attempt_at = COALESCE($5, next_attempt_at),
                sent_at = COALESCE($6, sent_at),
                claimed_until = NULL,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.status.map(|status| status.as_str()))
        .bind(patch.attempt_count)
        .bind(&patch.last_error)
        .bind(patch.next_attempt_at)
        .bind(patch.sent_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(notification_id = %id, "Queue update matched no row");
        }

        Ok(())
    }

    async fn tenants(&self, filter: &QueueFilter) -> Result<Vec<String>, NotificationError> {
        let mut builder = QueryBuilder::new("SELECT DISTINCT tenant_id FROM notification_queue");
        Self::push_conditions(&mut builder, filter);
        builder.push(" ORDER BY tenant_id");

        let tenants = builder
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?;

        Ok(tenants)
    }
}

#[async_trait]
impl TemplateStore for DatabaseClient {
    async fn find(
        &self,
        organization_id: &str,
        template_key: &str,
    ) -> Result<Option<NotificationTemplate>, NotificationError> {
        let row = sqlx::query_as::<_, TemplateRow>(
            r#"
            SELECT id, organization_id, template_key, subject, body_template,
                   html_body_template, channels
            FROM notification_templates
            WHERE template_key = $2
              AND is_active
              AND (organization_id = $1 OR organization_id IS NULL)
            ORDER BY organization_id NULLS LAST
            LIMIT 1
            "#,
        )
        .bind(organization_id)
        .bind(template_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let channels = row
                .channels
                .iter()
                .filter_map(|channel| {
                    let parsed = serde_json::from_value::<NotificationType>(serde_json::Value::String(
                        channel.clone(),
                    ));
                    if parsed.is_err() {
                        warn!(template_key = %row.template_key, channel = %channel, "Ignoring unknown template channel");
                    }
                    parsed.ok()
                })
                .collect();

            NotificationTemplate {
                id: row.id,
                organization_id: row.organization_id,
                template_key: row.template_key,
                subject: row.subject,
                body_template: row.body_template,
                html_body_template: row.html_body_template,
                channels,
            }
        }))
    }
}

#[async_trait]
impl AuditSink for DatabaseClient {
    async fn record(&self, log: CreateAuditLog) -> Result<(), NotificationError> {
        let status_str = log.status.to_string();

        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                organization_id,
                user_id,
                channel,
                recipient,
                status,
                provider_message_id,
                error_message,
                metadata,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&log.organization_id)
        .bind(&log.user_id)
        .bind(&log.channel)
        .bind(&log.recipient)
        .bind(&status_str)
        .bind(&log.provider_message_id)
        .bind(&log.error_message)
        .bind(&log.metadata)
        .bind(log.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                organization_id = %log.organization_id,
                "Failed to write audit log to database"
            );
            NotificationError::Store(e)
        })?;

        debug!(
            organization_id = %log.organization_id,
            status = %status_str,
            "Audit log written to database"
        );

        Ok(())
    }
}
