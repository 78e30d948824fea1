//! Snippet service
//!
//! Implements business logic for snippets:
//! - Creation with field validation
//! - Detail lookup (expired snippets are invisible)
//! - Latest listing for the home page

use crate::db::repositories::SnippetRepository;
use crate::models::{CreateSnippetInput, Snippet, VALID_EXPIRES_DAYS};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Maximum allowed title length in characters
pub const MAX_TITLE_CHARS: usize = 100;

/// Field-keyed validation error messages
pub type ValidationErrors = BTreeMap<&'static str, String>;

/// Error types for snippet service operations
#[derive(Debug, thiserror::Error)]
pub enum SnippetServiceError {
    /// One or more form fields failed validation
    #[error("Validation failed")]
    Validation(ValidationErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Snippet service
pub struct SnippetService {
    repo: Arc<dyn SnippetRepository>,
}

impl SnippetService {
    /// Create a new snippet service with the given repository
    pub fn new(repo: Arc<dyn SnippetRepository>) -> Self {
        Self { repo }
    }

    /// Validate creation input without touching the database.
    ///
    /// Returns the field-keyed error map so callers can re-render the
    /// form with per-field messages.
    pub fn validate(input: &CreateSnippetInput) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if input.title.trim().is_empty() {
            errors.insert("title", "This field cannot be blank".to_string());
        } else if input.title.chars().count() > MAX_TITLE_CHARS {
            errors.insert(
                "title",
                format!("This field cannot be more than {} characters long", MAX_TITLE_CHARS),
            );
        }

        if input.content.trim().is_empty() {
            errors.insert("content", "This field cannot be blank".to_string());
        }

        if !VALID_EXPIRES_DAYS.contains(&input.expires_days) {
            errors.insert("expires", "This field must equal 1, 7 or 365".to_string());
        }

        errors
    }

    /// Create a new snippet.
    ///
    /// Expiry is computed from the validated `expires_days` choice, so
    /// `expires_at > created_at` always holds.
    pub async fn create(&self, input: CreateSnippetInput) -> Result<Snippet, SnippetServiceError> {
        let errors = Self::validate(&input);
        if !errors.is_empty() {
            return Err(SnippetServiceError::Validation(errors));
        }

        let created_at = Utc::now();
        let expires_at = created_at + Duration::days(input.expires_days);

        let snippet = self
            .repo
            .insert(&input.title, &input.content, created_at, expires_at)
            .await
            .context("Failed to create snippet")?;

        Ok(snippet)
    }

    /// Get an unexpired snippet by id.
    ///
    /// Returns `None` for unknown ids and for snippets past their expiry.
    pub async fn get(&self, id: i64) -> Result<Option<Snippet>, SnippetServiceError> {
        let snippet = self
            .repo
            .get(id)
            .await
            .context("Failed to get snippet")?;

        Ok(snippet)
    }

    /// Get the ten most recently created unexpired snippets
    pub async fn latest(&self) -> Result<Vec<Snippet>, SnippetServiceError> {
        let snippets = self.repo.latest().await.context("Failed to list snippets")?;

        Ok(snippets)
    }
}
