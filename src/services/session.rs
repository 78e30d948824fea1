//! Session manager
//!
//! Wraps the session repository with the lifecycle rules the HTTP layer
//! relies on:
//! - unknown, missing, or expired tokens yield a fresh session
//! - expired rows are deleted as soon as they are seen
//! - sessions have a fixed absolute lifetime measured from creation
//! - a session is only written to the store once it carries data
//!
//! The lifetime is injectable so tests can exercise expiry without
//! waiting for the clock.

use crate::db::repositories::SessionRepository;
use crate::models::Session;
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Default absolute session lifetime in hours
pub const DEFAULT_LIFETIME_HOURS: i64 = 12;

/// Error types for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionServiceError {
    /// Internal error (the store is unavailable or corrupt)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Session manager
pub struct SessionManager {
    repo: Arc<dyn SessionRepository>,
    lifetime: Duration,
}

impl SessionManager {
    /// Create a new session manager with the default 12-hour lifetime
    pub fn new(repo: Arc<dyn SessionRepository>) -> Self {
        Self {
            repo,
            lifetime: Duration::hours(DEFAULT_LIFETIME_HOURS),
        }
    }

    /// Create a new session manager with a custom lifetime
    pub fn with_lifetime(repo: Arc<dyn SessionRepository>, lifetime: Duration) -> Self {
        Self { repo, lifetime }
    }

    /// The configured absolute session lifetime
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Load the session for a token, or create a fresh one.
    ///
    /// A missing token, an unknown token, or an expired row all yield a
    /// fresh session with a new token; expired rows are deleted on sight.
    /// The returned flag is `true` when the session is fresh (the caller
    /// must issue the cookie).
    pub async fn load(
        &self,
        token: Option<&str>,
    ) -> Result<(Session, bool), SessionServiceError> {
        if let Some(token) = token {
            let existing = self
                .repo
                .get(token)
                .await
                .context("Failed to load session")?;

            if let Some(session) = existing {
                if session.is_expired() {
                    self.repo
                        .delete(token)
                        .await
                        .context("Failed to delete expired session")?;
                } else {
                    return Ok((session, false));
                }
            }
        }

        Ok((self.fresh_session(), true))
    }

    /// Persist a session.
    ///
    /// Empty sessions are not written: a purely-read request never
    /// creates a row.
    pub async fn save(&self, session: &Session) -> Result<(), SessionServiceError> {
        if session.is_empty() {
            return Ok(());
        }

        self.repo
            .upsert(session)
            .await
            .context("Failed to save session")?;

        Ok(())
    }

    /// Delete all sessions past their lifetime
    pub async fn sweep_expired(&self) -> Result<i64, SessionServiceError> {
        let deleted = self
            .repo
            .delete_expired()
            .await
            .context("Failed to sweep expired sessions")?;

        Ok(deleted)
    }

    fn fresh_session(&self) -> Session {
        let now = Utc::now();
        Session {
            token: Uuid::new_v4().to_string(),
            data: serde_json::json!({}),
            created_at: now,
            expires_at: now + self.lifetime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxSessionRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_manager(lifetime: Duration) -> SessionManager {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SessionManager::with_lifetime(SqlxSessionRepository::boxed(pool), lifetime)
    }

    #[tokio::test]
    async fn test_load_without_token_creates_fresh_session() {
        let manager = setup_manager(Duration::hours(12)).await;

        let (session, fresh) = manager.load(None).await.expect("Load should succeed");

        assert!(fresh);
        assert!(!session.token.is_empty());
        assert!(session.is_empty());
        assert!(session.expires_at > session.created_at);
    }

    #[tokio::test]
    async fn test_load_unknown_token_creates_fresh_session() {
        let manager = setup_manager(Duration::hours(12)).await;

        let (session, fresh) = manager
            .load(Some("no-such-token"))
            .await
            .expect("Load should succeed");

        assert!(fresh);
        assert_ne!(session.token, "no-such-token");
    }

    #[tokio::test]
    async fn test_saved_session_round_trips() {
        let manager = setup_manager(Duration::hours(12)).await;

        let (mut session, _) = manager.load(None).await.expect("Load should succeed");
        session.put_flash("Snippet successfully created!");
        manager.save(&session).await.expect("Save should succeed");

        let (mut loaded, fresh) = manager
            .load(Some(&session.token))
            .await
            .expect("Load should succeed");

        assert!(!fresh);
        assert_eq!(loaded.token, session.token);
        assert_eq!(
            loaded.take_flash().as_deref(),
            Some("Snippet successfully created!")
        );
    }

    #[tokio::test]
    async fn test_empty_session_is_not_persisted() {
        let manager = setup_manager(Duration::hours(12)).await;

        let (session, _) = manager.load(None).await.expect("Load should succeed");
        manager.save(&session).await.expect("Save should succeed");

        // Nothing was written, so the token is unknown on the next load.
        let (_, fresh) = manager
            .load(Some(&session.token))
            .await
            .expect("Load should succeed");
        assert!(fresh);
    }

    #[tokio::test]
    async fn test_expired_session_is_not_honored() {
        // Zero lifetime: every session is expired the moment it is created.
        let manager = setup_manager(Duration::zero()).await;

        let (mut session, _) = manager.load(None).await.expect("Load should succeed");
        session.put_flash("stale");
        manager.save(&session).await.expect("Save should succeed");

        let (loaded, fresh) = manager
            .load(Some(&session.token))
            .await
            .expect("Load should succeed");

        assert!(fresh);
        assert_ne!(loaded.token, session.token);
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_expired_row_is_deleted_on_load() {
        let manager = setup_manager(Duration::zero()).await;

        let (mut session, _) = manager.load(None).await.expect("Load should succeed");
        session.put_flash("stale");
        manager.save(&session).await.expect("Save should succeed");

        let _ = manager.load(Some(&session.token)).await.unwrap();

        // The expired row was removed, so there is nothing left to sweep.
        let swept = manager.sweep_expired().await.expect("Sweep should succeed");
        assert_eq!(swept, 0);
    }

    #[tokio::test]
    async fn test_sweep_expired_removes_stale_rows() {
        let manager = setup_manager(Duration::zero()).await;

        for _ in 0..3 {
            let (mut session, _) = manager.load(None).await.unwrap();
            session.put_flash("stale");
            manager.save(&session).await.unwrap();
        }

        let swept = manager.sweep_expired().await.expect("Sweep should succeed");
        assert_eq!(swept, 3);
    }
}
