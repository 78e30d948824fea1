//! Web middleware
//!
//! Contains:
//! - `AppState`, the aggregate of shared handles passed to every handler
//! - `WebError`, the request-scoped error policy
//! - the session middleware that loads and saves the session around
//!   each request

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::db::DynDatabasePool;
use crate::models::Session;
use crate::services::{SessionManager, SnippetService};
use crate::templates::TemplateCache;

/// Application state containing shared handles.
///
/// Constructed once at startup and cloned into every handler; handlers
/// only read from it.
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub snippets: Arc<SnippetService>,
    pub sessions: Arc<SessionManager>,
    pub templates: Arc<TemplateCache>,
}

/// Request-scoped error policy.
///
/// Not-found conditions surface as opaque 404s. Everything unexpected is
/// logged server-side with full detail and surfaced to the client as a
/// generic 500, never leaking internals.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
            WebError::Internal(err) => {
                tracing::error!("internal server error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

impl From<crate::services::SnippetServiceError> for WebError {
    fn from(err: crate::services::SnippetServiceError) -> Self {
        match err {
            crate::services::SnippetServiceError::Validation(_) => {
                // Validation is handled in the handlers by re-rendering;
                // reaching this conversion means a handler skipped it.
                WebError::Internal(anyhow::anyhow!("unhandled validation error"))
            }
            crate::services::SnippetServiceError::Internal(e) => WebError::Internal(e),
        }
    }
}

impl From<crate::services::SessionServiceError> for WebError {
    fn from(err: crate::services::SessionServiceError) -> Self {
        match err {
            crate::services::SessionServiceError::Internal(e) => WebError::Internal(e),
        }
    }
}

/// Per-request session handle stored in request extensions.
///
/// The handle is request-scoped; the mutex is only ever contended by the
/// handler and the middleware that created it, and is never held across
/// an await point.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionState>>,
}

struct SessionState {
    session: Session,
    fresh: bool,
    dirty: bool,
}

impl SessionHandle {
    fn new(session: Session, fresh: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState {
                session,
                fresh,
                dirty: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store a flash message for the next request
    pub fn put_flash(&self, message: impl Into<String>) {
        let mut state = self.lock();
        state.session.put_flash(message);
        state.dirty = true;
    }

    /// Remove and return the pending flash message, if any
    pub fn take_flash(&self) -> Option<String> {
        let mut state = self.lock();
        let flash = state.session.take_flash();
        if flash.is_some() {
            state.dirty = true;
        }
        flash
    }

    /// The session token
    pub fn token(&self) -> String {
        self.lock().session.token.clone()
    }

    fn snapshot(&self) -> (Session, bool, bool) {
        let state = self.lock();
        (state.session.clone(), state.fresh, state.dirty)
    }
}

/// Extract the session token from the request's cookies
fn extract_session_token(request: &Request) -> Option<String> {
    let cookie_header = request.headers().get(header::COOKIE)?;
    let cookie_str = cookie_header.to_str().ok()?;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some(token) = cookie.strip_prefix("session=") {
            return Some(token.to_string());
        }
    }

    None
}

/// Session middleware.
///
/// Loads the session named by the `session` cookie (or creates a fresh
/// one), exposes it to the handler through request extensions, and saves
/// it afterwards. The cookie is only issued once a fresh session has
/// actually been persisted. Store failures are request-scoped errors.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let token = extract_session_token(&request);
    let (session, fresh) = state.sessions.load(token.as_deref()).await?;

    let handle = SessionHandle::new(session, fresh);
    request.extensions_mut().insert(handle.clone());

    let mut response = next.run(request).await;

    let (session, fresh, dirty) = handle.snapshot();
    if dirty {
        state.sessions.save(&session).await?;

        if fresh && !session.is_empty() {
            let cookie = format!(
                "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
                session.token,
                state.sessions.lifetime().num_seconds()
            );
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn test_session() -> Session {
        let now = Utc::now();
        Session {
            token: "tok".to_string(),
            data: serde_json::json!({}),
            created_at: now,
            expires_at: now + Duration::hours(12),
        }
    }

    #[test]
    fn test_handle_tracks_dirtiness() {
        let handle = SessionHandle::new(test_session(), true);

        let (_, fresh, dirty) = handle.snapshot();
        assert!(fresh);
        assert!(!dirty);

        handle.put_flash("created");
        let (session, _, dirty) = handle.snapshot();
        assert!(dirty);
        assert!(!session.is_empty());
    }

    #[test]
    fn test_take_flash_on_clean_session_stays_clean() {
        let handle = SessionHandle::new(test_session(), false);

        assert_eq!(handle.take_flash(), None);

        let (_, _, dirty) = handle.snapshot();
        assert!(!dirty);
    }

    #[test]
    fn test_flash_round_trip_through_handle() {
        let handle = SessionHandle::new(test_session(), false);

        handle.put_flash("hello");
        assert_eq!(handle.take_flash().as_deref(), Some("hello"));
        assert_eq!(handle.take_flash(), None);
    }
}
