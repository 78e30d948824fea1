//! Web layer - HTTP routing and page handlers
//!
//! Maps the application's URL patterns to handlers and wires in the
//! session middleware and request tracing.

pub mod handlers;
pub mod middleware;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use middleware::{AppState, SessionHandle, WebError};

/// Build the application router.
///
/// Every route runs inside the session middleware; request tracing is
/// the outermost layer.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/snippet/view/{id}", get(handlers::view))
        .route("/snippet/create", get(handlers::create_form))
        .route("/snippet/create", post(handlers::create_post))
        .fallback(handlers::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
