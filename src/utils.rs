use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value as JsonValue;

use crate::models::retry::RetryConfig;

// chrono::Duration panics beyond i64::MAX milliseconds.
const MAX_DELAY_SECONDS: u64 = i64::MAX as u64 / 1000;

/// Delay before the next retry: `base * 2^attempt_count`, capped at the
/// configured ceiling.
pub fn backoff_delay(config: &RetryConfig, attempt_count: i32) -> Duration {
    let exponent = attempt_count.clamp(0, 62) as u32;
    let seconds = 2u64
        .checked_pow(exponent)
        .and_then(|factor| config.base_delay_seconds.checked_mul(factor))
        .unwrap_or(u64::MAX)
        .min(config.max_delay_seconds);

    Duration::seconds(seconds.min(MAX_DELAY_SECONDS) as i64)
}

pub fn next_attempt_at(config: &RetryConfig, attempt_count: i32, now: DateTime<Utc>) -> DateTime<Utc> {
    now + backoff_delay(config, attempt_count)
}

/// Text form of a JSON scalar as it appears in rendered output.
pub fn value_to_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// FCM rejects non-string data values.
pub fn stringify_metadata(metadata: &HashMap<String, JsonValue>) -> HashMap<String, String> {
    metadata
        .iter()
        .map(|(key, value)| (key.clone(), value_to_text(value)))
        .collect()
}

/// Masks a recipient for logs and audit rows, keeping enough to correlate.
pub fn redact_recipient(recipient: &str) -> String {
    if let Some((local, domain)) = recipient.split_once('@') {
        let first: String = local.chars().take(1).collect();
        return format!("{}***@{}", first, domain);
    }

    let count = recipient.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }

    let tail: String = recipient.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}
