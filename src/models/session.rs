//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key under which the flash message is stored in the session data
const FLASH_KEY: &str = "flash";

/// Session entity
///
/// A server-side record keyed by an opaque token, holding transient data
/// (flash messages) as a JSON object. Sessions carry a fixed absolute
/// lifetime measured from creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session token
    pub token: String,
    /// Transient session data (JSON object)
    pub data: serde_json::Value,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Store a flash message, replacing any existing one
    pub fn put_flash(&mut self, message: impl Into<String>) {
        if let Some(map) = self.data.as_object_mut() {
            map.insert(
                FLASH_KEY.to_string(),
                serde_json::Value::String(message.into()),
            );
        }
    }

    /// Remove and return the flash message, if any (read-once semantics)
    pub fn take_flash(&mut self) -> Option<String> {
        self.data
            .as_object_mut()
            .and_then(|map| map.remove(FLASH_KEY))
            .and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    /// Check whether the session carries any data worth persisting
    pub fn is_empty(&self) -> bool {
        self.data.as_object().map_or(true, |map| map.is_empty())
    }
}
