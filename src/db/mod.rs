//! Database layer
//!
//! This module provides database abstraction for the snippetbox
//! application. It supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The database driver is selected based on configuration; the rest of
//! the application only sees the `DatabasePool` trait and the repository
//! traits built on top of it.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
