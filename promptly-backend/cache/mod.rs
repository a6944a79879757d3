pub mod keys;
pub mod memory;
pub mod redis_cache;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A cached value. The kind is chosen by the writer and preserved on read,
/// so text that happens to parse as JSON comes back as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CachePayload {
    Text(String),
    Json(Value),
}

impl CachePayload {
    /// Serialize into the string stored in the backend.
    pub fn encode(&self) -> String {
        // Serializing a Value or String cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse a stored string. Values written without the envelope (by an older
    /// writer or by hand) are read as JSON when they parse, raw text otherwise.
    pub fn decode(raw: &str) -> Self {
        if let Ok(payload) = serde_json::from_str::<CachePayload>(raw) {
            return payload;
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => CachePayload::Json(value),
            Err(_) => CachePayload::Text(raw.to_string()),
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            CachePayload::Text(text) => Some(text),
            CachePayload::Json(Value::String(text)) => Some(text),
            CachePayload::Json(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            CachePayload::Json(value) => Some(value),
            CachePayload::Text(_) => None,
        }
    }
}

/// Advisory key/value cache. Implementations never fail the caller: backend
/// errors are logged and reads degrade to a miss, writes to a no-op.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<CachePayload>;
    /// Store `value` under `key`. A zero `ttl` stores without expiry.
    async fn set(&self, key: &str, value: CachePayload, ttl: Duration);
    async fn delete(&self, key: &str);
}

/// Cache that never stores anything.
pub struct DisabledCache;

#[async_trait]
impl Cache for DisabledCache {
    async fn get(&self, _key: &str) -> Option<CachePayload> {
        None
    }

    async fn set(&self, _key: &str, _value: CachePayload, _ttl: Duration) {}

    async fn delete(&self, _key: &str) {}
}
