//! Session repository
//!
//! Database operations for sessions.
//!
//! This module provides:
//! - `SessionRepository` trait defining the interface for session data access
//! - `SqlxSessionRepository` implementing the trait for SQLite and MySQL
//!
//! Session data is stored as a JSON text column so the store stays a
//! plain key-value mapping with expiry.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Get session by token
    async fn get(&self, token: &str) -> Result<Option<Session>>;

    /// Insert or update a session
    async fn upsert(&self, session: &Session) -> Result<()>;

    /// Delete a session
    async fn delete(&self, token: &str) -> Result<()>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<i64>;
}

/// SQLx-based session repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn get(&self, token: &str) -> Result<Option<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_session_sqlite(self.pool.as_sqlite().unwrap(), token).await,
            DatabaseDriver::Mysql => get_session_mysql(self.pool.as_mysql().unwrap(), token).await,
        }
    }

    async fn upsert(&self, session: &Session) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                upsert_session_sqlite(self.pool.as_sqlite().unwrap(), session).await
            }
            DatabaseDriver::Mysql => {
                upsert_session_mysql(self.pool.as_mysql().unwrap(), session).await
            }
        }
    }

    async fn delete(&self, token: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_session_sqlite(self.pool.as_sqlite().unwrap(), token).await
            }
            DatabaseDriver::Mysql => {
                delete_session_mysql(self.pool.as_mysql().unwrap(), token).await
            }
        }
    }

    async fn delete_expired(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_expired_sessions_sqlite(self.pool.as_sqlite().unwrap()).await
            }
            DatabaseDriver::Mysql => {
                delete_expired_sessions_mysql(self.pool.as_mysql().unwrap()).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_session_sqlite(pool: &SqlitePool, token: &str) -> Result<Option<Session>> {
    let row = sqlx::query(
        r#"
        SELECT token, data, created_at, expires_at
        FROM sessions
        WHERE token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await
    .context("Failed to get session by token")?;

    match row {
        Some(row) => Ok(Some(row_to_session_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn upsert_session_sqlite(pool: &SqlitePool, session: &Session) -> Result<()> {
    let data = serde_json::to_string(&session.data).context("Failed to serialize session data")?;

    sqlx::query(
        r#"
        INSERT INTO sessions (token, data, created_at, expires_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(token) DO UPDATE SET data = excluded.data
        "#,
    )
    .bind(&session.token)
    .bind(data)
    .bind(session.created_at)
    .bind(session.expires_at)
    .execute(pool)
    .await
    .context("Failed to save session")?;

    Ok(())
}

async fn delete_session_sqlite(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await
        .context("Failed to delete session")?;

    Ok(())
}

async fn delete_expired_sessions_sqlite(pool: &SqlitePool) -> Result<i64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;

    Ok(result.rows_affected() as i64)
}

fn row_to_session_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Session> {
    let data: String = row.get("data");
    let data = serde_json::from_str(&data).context("Failed to parse session data")?;

    Ok(Session {
        token: row.get("token"),
        data,
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_session_mysql(pool: &MySqlPool, token: &str) -> Result<Option<Session>> {
    let row = sqlx::query(
        r#"
        SELECT token, data, created_at, expires_at
        FROM sessions
        WHERE token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await
    .context("Failed to get session by token")?;

    match row {
        Some(row) => Ok(Some(row_to_session_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn upsert_session_mysql(pool: &MySqlPool, session: &Session) -> Result<()> {
    let data = serde_json::to_string(&session.data).context("Failed to serialize session data")?;

    sqlx::query(
        r#"
        INSERT INTO sessions (token, data, created_at, expires_at)
        VALUES (?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE data = VALUES(data)
        "#,
    )
    .bind(&session.token)
    .bind(data)
    .bind(session.created_at)
    .bind(session.expires_at)
    .execute(pool)
    .await
    .context("Failed to save session")?;

    Ok(())
}

async fn delete_session_mysql(pool: &MySqlPool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await
        .context("Failed to delete session")?;

    Ok(())
}

async fn delete_expired_sessions_mysql(pool: &MySqlPool) -> Result<i64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;

    Ok(result.rows_affected() as i64)
}

fn row_to_session_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Session> {
    let data: String = row.get("data");
    let data = serde_json::from_str(&data).context("Failed to parse session data")?;
    let created_at: DateTime<Utc> = row.get("created_at");
    let expires_at: DateTime<Utc> = row.get("expires_at");

    Ok(Session {
        token: row.get("token"),
        data,
        created_at,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;
    use uuid::Uuid;

    async fn setup_test_repo() -> SqlxSessionRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxSessionRepository::new(pool)
    }

    fn create_test_session(expires_in: Duration) -> Session {
        let now = Utc::now();
        Session {
            token: Uuid::new_v4().to_string(),
            data: serde_json::json!({}),
            created_at: now,
            expires_at: now + expires_in,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get_session() {
        let repo = setup_test_repo().await;

        let mut session = create_test_session(Duration::hours(12));
        session.put_flash("hello");
        repo.upsert(&session).await.expect("Failed to save session");

        let mut found = repo
            .get(&session.token)
            .await
            .expect("Failed to get session")
            .expect("Session not found");

        assert_eq!(found.token, session.token);
        assert_eq!(found.take_flash().as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_get_unknown_token_returns_none() {
        let repo = setup_test_repo().await;

        let found = repo
            .get("nonexistent-session-token")
            .await
            .expect("Failed to get session");

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_upsert_updates_data_in_place() {
        let repo = setup_test_repo().await;

        let mut session = create_test_session(Duration::hours(12));
        session.put_flash("first");
        repo.upsert(&session).await.expect("Failed to save session");

        session.put_flash("second");
        repo.upsert(&session).await.expect("Failed to save session");

        let mut found = repo
            .get(&session.token)
            .await
            .expect("Failed to get session")
            .expect("Session not found");

        assert_eq!(found.take_flash().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_delete_session() {
        let repo = setup_test_repo().await;

        let session = create_test_session(Duration::hours(12));
        repo.upsert(&session).await.expect("Failed to save session");

        repo.delete(&session.token)
            .await
            .expect("Failed to delete session");

        let found = repo
            .get(&session.token)
            .await
            .expect("Failed to get session");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let repo = setup_test_repo().await;

        let expired = create_test_session(Duration::hours(-1));
        let valid = create_test_session(Duration::hours(1));

        repo.upsert(&expired).await.expect("Failed to save session");
        repo.upsert(&valid).await.expect("Failed to save session");

        let deleted = repo
            .delete_expired()
            .await
            .expect("Failed to delete expired sessions");

        assert_eq!(deleted, 1);
        assert!(repo.get(&expired.token).await.unwrap().is_none());
        assert!(repo.get(&valid.token).await.unwrap().is_some());
    }
}
