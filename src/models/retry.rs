use serde::Deserialize;

/// Which queue rows `retry_failed` picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrySelection {
    /// Only rows whose status is `failed`.
    FailedOnly,
    /// `failed` rows plus `retrying` rows whose backoff has elapsed.
    #[default]
    BackoffElapsed,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: i32,
    pub base_delay_seconds: u64,
    pub max_delay_seconds: u64,
    pub batch_size: i64,
    pub claim_lease_seconds: u64,
    pub selection: RetrySelection,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_seconds: 300,
            max_delay_seconds: 86_400,
            batch_size: 100,
            claim_lease_seconds: 300,
            selection: RetrySelection::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RetrySummary {
    pub retried: u32,
    pub succeeded: u32,
    pub failed: u32,
}

impl RetrySummary {
    pub fn absorb(&mut self, other: RetrySummary) {
        self.retried += other.retried;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BatchSummary {
    pub processed: u32,
    pub succeeded: u32,
    pub failed: u32,
}
