//! Repository layer
//!
//! Data access traits and their sqlx-backed implementations. Each
//! repository dispatches on the configured driver so that the same
//! interface works against SQLite and MySQL.

pub mod session;
pub mod snippet;

pub use session::{SessionRepository, SqlxSessionRepository};
pub use snippet::{SnippetRepository, SqlxSnippetRepository};
