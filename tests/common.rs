use std::{
    collections::VecDeque,
    io::Write,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use notification_engine::{
    clients::{
        memory::{InMemoryAuditSink, InMemoryQueueStore, InMemoryTemplateStore},
        provider::Provider,
        registry::ProviderRegistry,
        store::{AuditSink, QueueStore},
    },
    error::NotificationError,
    models::{
        audit::CreateAuditLog,
        payload::{NotificationPayload, NotificationType},
        queue::{QueueFilter, QueuePatch, QueuedNotification},
        response::NotificationResponse,
        retry::RetryConfig,
        status::QueueStatus,
    },
    service::NotificationService,
};
use uuid::Uuid;

/// Provider double: fails any payload whose body contains `FAIL`, records
/// every payload it sees.
pub struct StubProvider {
    channel: NotificationType,
    calls: AtomicUsize,
    seen: Mutex<Vec<NotificationPayload>>,
    scripted: Mutex<VecDeque<bool>>,
}

impl StubProvider {
    pub fn new(channel: NotificationType) -> Arc<Self> {
        Arc::new(Self {
            channel,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            scripted: Mutex::new(VecDeque::new()),
        })
    }

    /// Queues explicit outcomes (`true` = sent) consumed before the body rule.
    pub fn script(&self, outcomes: &[bool]) {
        self.scripted.lock().unwrap().extend(outcomes.iter().copied());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<NotificationPayload> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn channel(&self) -> NotificationType {
        self.channel
    }

    async fn send(&self, payload: &NotificationPayload) -> NotificationResponse {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(payload.clone());

        let scripted = self.scripted.lock().unwrap().pop_front();
        let succeed = scripted.unwrap_or_else(|| !payload.body.contains("FAIL"));

        if succeed {
            NotificationResponse::sent(format!("stub-{}", call))
        } else {
            NotificationResponse::failed(format!("stub-{}", call), "Stub provider error (500): boom")
        }
    }
}

pub struct Harness {
    pub service: NotificationService,
    pub queue: Arc<InMemoryQueueStore>,
    pub templates: Arc<InMemoryTemplateStore>,
    pub audit: Arc<InMemoryAuditSink>,
    pub email: Arc<StubProvider>,
    pub sms: Arc<StubProvider>,
}

pub fn harness() -> Harness {
    harness_with(RetryConfig::default())
}

pub fn harness_with(retry_config: RetryConfig) -> Harness {
    let queue = Arc::new(InMemoryQueueStore::new());
    let templates = Arc::new(InMemoryTemplateStore::new());
    let audit = Arc::new(InMemoryAuditSink::new());
    let email = StubProvider::new(NotificationType::Email);
    let sms = StubProvider::new(NotificationType::Sms);

    let registry = ProviderRegistry::new()
        .with_provider(email.clone())
        .with_provider(sms.clone());

    let service = NotificationService::new(
        Arc::new(registry),
        queue.clone(),
        templates.clone(),
        audit.clone(),
    )
    .with_retry_config(retry_config);

    Harness {
        service,
        queue,
        templates,
        audit,
        email,
        sms,
    }
}

pub fn email_payload(body: &str) -> NotificationPayload {
    NotificationPayload::email("org-123", "user@example.com", "Test", body)
}

/// Inserts a row directly, bypassing `queue()`.
pub async fn seed_row(
    store: &InMemoryQueueStore,
    payload: &NotificationPayload,
    row: impl FnOnce(QueuedNotification) -> QueuedNotification,
) -> Uuid {
    let queued = row(QueuedNotification::new(payload, QueueStatus::Pending).unwrap());
    let id = queued.id;
    store.insert(&queued).await.unwrap();
    id
}

/// Polls until `check` holds; background writes are spawned tasks.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Queue store that is always down.
pub struct UnavailableQueueStore;

#[async_trait]
impl QueueStore for UnavailableQueueStore {
    async fn insert(&self, _: &QueuedNotification) -> Result<(), NotificationError> {
        Err(NotificationError::Unavailable("connection refused".into()))
    }

    async fn select(&self, _: &QueueFilter) -> Result<Vec<QueuedNotification>, NotificationError> {
        Err(NotificationError::Unavailable("connection refused".into()))
    }

    async fn claim(&self, _: &QueueFilter, _: Duration) -> Result<Vec<QueuedNotification>, NotificationError> {
        Err(NotificationError::Unavailable("connection refused".into()))
    }

    async fn update(&self, _: Uuid, _: &QueuePatch) -> Result<(), NotificationError> {
        Err(NotificationError::Unavailable("connection refused".into()))
    }

    async fn tenants(&self, _: &QueueFilter) -> Result<Vec<String>, NotificationError> {
        Err(NotificationError::Unavailable("connection refused".into()))
    }
}

/// Delegates to an in-memory store and records the filters it was asked for.
pub struct RecordingQueueStore {
    pub inner: InMemoryQueueStore,
    pub claim_limits: Mutex<Vec<Option<i64>>>,
}

impl RecordingQueueStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryQueueStore::new(),
            claim_limits: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl QueueStore for RecordingQueueStore {
    async fn insert(&self, notification: &QueuedNotification) -> Result<(), NotificationError> {
        self.inner.insert(notification).await
    }

    async fn select(&self, filter: &QueueFilter) -> Result<Vec<QueuedNotification>, NotificationError> {
        self.inner.select(filter).await
    }

    async fn claim(
        &self,
        filter: &QueueFilter,
        lease: Duration,
    ) -> Result<Vec<QueuedNotification>, NotificationError> {
        self.claim_limits.lock().unwrap().push(filter.limit);
        self.inner.claim(filter, lease).await
    }

    async fn update(&self, id: Uuid, patch: &QueuePatch) -> Result<(), NotificationError> {
        self.inner.update(id, patch).await
    }

    async fn tenants(&self, filter: &QueueFilter) -> Result<Vec<String>, NotificationError> {
        self.inner.tenants(filter).await
    }
}

/// Audit sink that always fails.
pub struct BrokenAuditSink;

#[async_trait]
impl AuditSink for BrokenAuditSink {
    async fn record(&self, _: CreateAuditLog) -> Result<(), NotificationError> {
        Err(NotificationError::Unavailable("audit store down".into()))
    }
}

/// Queue store whose claims fail for one tenant only.
pub struct TenantOutageQueueStore {
    pub inner: InMemoryQueueStore,
    pub broken_tenant: String,
}

impl TenantOutageQueueStore {
    pub fn new(broken_tenant: &str) -> Self {
        Self {
            inner: InMemoryQueueStore::new(),
            broken_tenant: broken_tenant.to_string(),
        }
    }
}

#[async_trait]
impl QueueStore for TenantOutageQueueStore {
    async fn insert(&self, notification: &QueuedNotification) -> Result<(), NotificationError> {
        self.inner.insert(notification).await
    }

    async fn select(&self, filter: &QueueFilter) -> Result<Vec<QueuedNotification>, NotificationError> {
        self.inner.select(filter).await
    }

    async fn claim(
        &self,
        filter: &QueueFilter,
        lease: Duration,
    ) -> Result<Vec<QueuedNotification>, NotificationError> {
        if filter.tenant_id.as_deref() == Some(self.broken_tenant.as_str()) {
            return Err(NotificationError::Unavailable("shard offline".into()));
        }
        self.inner.claim(filter, lease).await
    }

    async fn update(&self, id: Uuid, patch: &QueuePatch) -> Result<(), NotificationError> {
        self.inner.update(id, patch).await
    }

    async fn tenants(&self, filter: &QueueFilter) -> Result<Vec<String>, NotificationError> {
        self.inner.tenants(filter).await
    }
}

/// Collects JSON log lines emitted on the current thread while installed.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
