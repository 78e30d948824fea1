//! Data models
//!
//! Entities persisted by the snippetbox application.

pub mod session;
pub mod snippet;

pub use session::Session;
pub use snippet::{CreateSnippetInput, Snippet, VALID_EXPIRES_DAYS};
