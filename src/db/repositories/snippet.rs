//! Snippet repository
//!
//! Database operations for snippets.
//!
//! This module provides:
//! - `SnippetRepository` trait defining the interface for snippet data access
//! - `SqlxSnippetRepository` implementing the trait for SQLite and MySQL
//!
//! Expired snippets are filtered at query time: `get` and `latest` only
//! return rows whose expiry lies in the future.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Snippet;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Number of snippets shown on the home page
pub const LATEST_LIMIT: i64 = 10;

/// Snippet repository trait
#[async_trait]
pub trait SnippetRepository: Send + Sync {
    /// Insert a new snippet and return it with its assigned id
    async fn insert(
        &self,
        title: &str,
        content: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Snippet>;

    /// Get an unexpired snippet by id
    async fn get(&self, id: i64) -> Result<Option<Snippet>>;

    /// Get the ten most recently created unexpired snippets
    async fn latest(&self) -> Result<Vec<Snippet>>;
}

/// SQLx-based snippet repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSnippetRepository {
    pool: DynDatabasePool,
}

impl SqlxSnippetRepository {
    /// Create a new SQLx snippet repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SnippetRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SnippetRepository for SqlxSnippetRepository {
    async fn insert(
        &self,
        title: &str,
        content: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Snippet> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                insert_snippet_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    title,
                    content,
                    created_at,
                    expires_at,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                insert_snippet_mysql(
                    self.pool.as_mysql().unwrap(),
                    title,
                    content,
                    created_at,
                    expires_at,
                )
                .await
            }
        }
    }

    async fn get(&self, id: i64) -> Result<Option<Snippet>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_snippet_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_snippet_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn latest(&self) -> Result<Vec<Snippet>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => latest_snippets_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => latest_snippets_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn insert_snippet_sqlite(
    pool: &SqlitePool,
    title: &str,
    content: &str,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<Snippet> {
    let result = sqlx::query(
        r#"
        INSERT INTO snippets (title, content, created_at, expires_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(title)
    .bind(content)
    .bind(created_at)
    .bind(expires_at)
    .execute(pool)
    .await
    .context("Failed to insert snippet")?;

    Ok(Snippet {
        id: result.last_insert_rowid(),
        title: title.to_string(),
        content: content.to_string(),
        created_at,
        expires_at,
    })
}

async fn get_snippet_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Snippet>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, content, created_at, expires_at
        FROM snippets
        WHERE id = ? AND expires_at > ?
        "#,
    )
    .bind(id)
    .bind(Utc::now())
    .fetch_optional(pool)
    .await
    .context("Failed to get snippet by id")?;

    match row {
        Some(row) => Ok(Some(row_to_snippet_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn latest_snippets_sqlite(pool: &SqlitePool) -> Result<Vec<Snippet>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, content, created_at, expires_at
        FROM snippets
        WHERE expires_at > ?
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(Utc::now())
    .bind(LATEST_LIMIT)
    .fetch_all(pool)
    .await
    .context("Failed to list latest snippets")?;

    rows.iter().map(row_to_snippet_sqlite).collect()
}

fn row_to_snippet_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Snippet> {
    Ok(Snippet {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn insert_snippet_mysql(
    pool: &MySqlPool,
    title: &str,
    content: &str,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<Snippet> {
    let result = sqlx::query(
        r#"
        INSERT INTO snippets (title, content, created_at, expires_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(title)
    .bind(content)
    .bind(created_at)
    .bind(expires_at)
    .execute(pool)
    .await
    .context("Failed to insert snippet")?;

    Ok(Snippet {
        id: result.last_insert_id() as i64,
        title: title.to_string(),
        content: content.to_string(),
        created_at,
        expires_at,
    })
}

async fn get_snippet_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Snippet>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, content, created_at, expires_at
        FROM snippets
        WHERE id = ? AND expires_at > ?
        "#,
    )
    .bind(id)
    .bind(Utc::now())
    .fetch_optional(pool)
    .await
    .context("Failed to get snippet by id")?;

    match row {
        Some(row) => Ok(Some(row_to_snippet_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn latest_snippets_mysql(pool: &MySqlPool) -> Result<Vec<Snippet>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, content, created_at, expires_at
        FROM snippets
        WHERE expires_at > ?
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(Utc::now())
    .bind(LATEST_LIMIT)
    .fetch_all(pool)
    .await
    .context("Failed to list latest snippets")?;

    rows.iter().map(row_to_snippet_mysql).collect()
}

fn row_to_snippet_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Snippet> {
    let created_at: DateTime<Utc> = row.get("created_at");
    let expires_at: DateTime<Utc> = row.get("expires_at");

    Ok(Snippet {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        created_at,
        expires_at,
    })
}
