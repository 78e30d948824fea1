//! Service layer
//!
//! Business logic built on top of the repositories.

pub mod session;
pub mod snippet;

pub use session::{SessionManager, SessionServiceError};
pub use snippet::{SnippetService, SnippetServiceError, ValidationErrors};
