#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

use snippetbox::db::repositories::{SqlxSessionRepository, SqlxSnippetRepository, SnippetRepository};
use snippetbox::db::{create_test_pool, migrations, DynDatabasePool};
use snippetbox::services::{SessionManager, SnippetService};
use snippetbox::templates::TemplateCache;
use snippetbox::web::{self, AppState};

// ---------------------------------------------------------------------------
// TestApp: a full router over an in-memory database
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub pool: DynDatabasePool,
    pub snippets: Arc<SnippetService>,
    pub snippet_repo: Arc<dyn SnippetRepository>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The `session=<token>` pair from the Set-Cookie header, if any
    pub fn session_cookie(&self) -> Option<String> {
        let set_cookie = self.headers.get(header::SET_COOKIE)?.to_str().ok()?;
        set_cookie
            .split(';')
            .next()
            .filter(|pair| pair.starts_with("session="))
            .map(|pair| pair.to_string())
    }
}

/// Build a test application with the default 12-hour session lifetime
pub async fn spawn_app() -> TestApp {
    spawn_app_with_lifetime(Duration::hours(12)).await
}

/// Build a test application with an injected session lifetime
pub async fn spawn_app_with_lifetime(lifetime: Duration) -> TestApp {
    let pool = create_test_pool().await.expect("failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("failed to run migrations");

    let snippet_repo = SqlxSnippetRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());

    let snippets = Arc::new(SnippetService::new(snippet_repo.clone()));
    let sessions = Arc::new(SessionManager::with_lifetime(session_repo, lifetime));

    let templates_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates");
    let templates = TemplateCache::new(&templates_dir).expect("failed to build template cache");

    let state = AppState {
        pool: pool.clone(),
        snippets: snippets.clone(),
        sessions,
        templates: Arc::new(templates),
    };

    TestApp {
        router: web::build_router(state),
        pool,
        snippets,
        snippet_repo,
    }
}

impl TestApp {
    /// Issue a GET request, optionally with a `session=<token>` cookie
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::empty()).expect("failed to build request");

        self.send(request).await
    }

    /// Issue a form POST, optionally with a `session=<token>` cookie
    pub async fn post_form(&self, path: &str, body: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder
            .body(Body::from(body.to_string()))
            .expect("failed to build request");

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read body");

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).to_string(),
        }
    }

    /// Create a snippet through the service, returning its id
    pub async fn create_snippet(&self, title: &str, content: &str) -> i64 {
        let input = snippetbox::models::CreateSnippetInput::new(title, content, 7);
        self.snippets
            .create(input)
            .await
            .expect("failed to create snippet")
            .id
    }

    /// Insert a snippet that expired in the past, bypassing validation
    pub async fn create_expired_snippet(&self, title: &str) -> i64 {
        let now = chrono::Utc::now();
        self.snippet_repo
            .insert(title, "content", now - Duration::days(2), now - Duration::days(1))
            .await
            .expect("failed to insert expired snippet")
            .id
    }
}
