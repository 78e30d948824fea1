//! Snippet model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Expiry choices offered by the creation form, in days
pub const VALID_EXPIRES_DAYS: &[i64] = &[1, 7, 365];

/// Snippet entity
///
/// A snippet is never updated in place: it is created once and becomes
/// invisible after `expires_at` (filtered at query time, not deleted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    /// Unique identifier, assigned by the database
    pub id: i64,
    /// Snippet title
    pub title: String,
    /// Snippet body text
    pub content: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Expiry timestamp, always after `created_at`
    pub expires_at: DateTime<Utc>,
}

impl Snippet {
    /// Check if the snippet has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Input for creating a new snippet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSnippetInput {
    /// Snippet title
    pub title: String,
    /// Snippet body text
    pub content: String,
    /// Days until expiry, one of `VALID_EXPIRES_DAYS`
    pub expires_days: i64,
}

impl CreateSnippetInput {
    /// Create a new snippet input
    pub fn new(title: impl Into<String>, content: impl Into<String>, expires_days: i64) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            expires_days,
        }
    }
}
