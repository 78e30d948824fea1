//! Page handlers
//!
//! Handles HTTP requests for the snippet pages:
//! - GET  /                    - home page with the latest snippets
//! - GET  /snippet/view/{id}   - snippet detail
//! - GET  /snippet/create      - snippet creation form
//! - POST /snippet/create      - snippet creation submission
//!
//! Each handler validates its input, performs at most one data-access
//! call, and renders a cached template. Malformed input yields a 4xx;
//! unexpected failures are logged and yield an opaque 500.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tera::Context;

use crate::models::{CreateSnippetInput, Snippet};
use crate::services::{SnippetServiceError, ValidationErrors};
use crate::web::middleware::{AppState, SessionHandle, WebError};

/// Snippet fields prepared for template rendering
#[derive(Debug, Serialize)]
struct SnippetView {
    id: i64,
    title: String,
    content: String,
    created: String,
    expires: String,
}

impl From<Snippet> for SnippetView {
    fn from(snippet: Snippet) -> Self {
        Self {
            id: snippet.id,
            title: snippet.title,
            content: snippet.content,
            created: format_timestamp(snippet.created_at),
            expires: format_timestamp(snippet.expires_at),
        }
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%d %b %Y at %H:%M").to_string()
}

/// Form fields for snippet creation.
///
/// Every field defaults to empty so a missing field decodes instead of
/// failing extraction, letting validation re-render the form with a
/// message rather than surfacing a bare 4xx.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnippetForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub expires: String,
}

impl SnippetForm {
    fn to_input(&self) -> CreateSnippetInput {
        // An unparseable expiry falls through validation as an invalid
        // choice rather than a decode failure.
        let expires_days = self.expires.trim().parse::<i64>().unwrap_or(0);
        CreateSnippetInput::new(self.title.clone(), self.content.clone(), expires_days)
    }
}

/// Shared template context: the flash message, consumed read-once
fn page_context(session: &SessionHandle) -> Context {
    let mut context = Context::new();
    context.insert("flash", &session.take_flash());
    context
}

/// Render a page to an HTML response
fn render_page(state: &AppState, name: &str, context: &Context) -> Result<Html<String>, WebError> {
    let html = state.templates.render(name, context)?;
    Ok(Html(html))
}

/// GET / - home page listing the ten latest snippets
pub async fn home(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
) -> Result<Html<String>, WebError> {
    let snippets = state.snippets.latest().await?;
    let snippets: Vec<SnippetView> = snippets.into_iter().map(SnippetView::from).collect();

    let mut context = page_context(&session);
    context.insert("snippets", &snippets);

    render_page(&state, "home.html", &context)
}

/// GET /snippet/view/{id} - snippet detail page
///
/// The id must be a positive integer; anything else is a 404, as is an
/// unknown or expired snippet.
pub async fn view(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Path(id): Path<String>,
) -> Result<Html<String>, WebError> {
    let id: i64 = id.parse().map_err(|_| WebError::NotFound)?;
    if id < 1 {
        return Err(WebError::NotFound);
    }

    let snippet = state.snippets.get(id).await?.ok_or(WebError::NotFound)?;

    let mut context = page_context(&session);
    context.insert("snippet", &SnippetView::from(snippet));

    render_page(&state, "view.html", &context)
}

/// GET /snippet/create - empty creation form
pub async fn create_form(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
) -> Result<Html<String>, WebError> {
    let mut context = page_context(&session);
    context.insert("form", &SnippetForm {
        expires: "365".to_string(),
        ..SnippetForm::default()
    });
    context.insert("errors", &ValidationErrors::new());

    render_page(&state, "create.html", &context)
}

/// POST /snippet/create - creation submission
///
/// Validation failures re-render the form with per-field messages and
/// the submitted values, status 422. Success puts a flash message and
/// redirects to the new snippet's detail page.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Form(form): Form<SnippetForm>,
) -> Result<Response, WebError> {
    match state.snippets.create(form.to_input()).await {
        Ok(snippet) => {
            session.put_flash("Snippet successfully created!");
            Ok(Redirect::to(&format!("/snippet/view/{}", snippet.id)).into_response())
        }
        Err(SnippetServiceError::Validation(errors)) => {
            let mut context = page_context(&session);
            context.insert("form", &form);
            context.insert("errors", &errors);

            let html = render_page(&state, "create.html", &context)?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, html).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

/// Fallback for unknown routes
pub async fn not_found() -> WebError {
    WebError::NotFound
}
