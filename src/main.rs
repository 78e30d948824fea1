//! Snippetbox - a minimal web application for sharing text snippets

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snippetbox::{
    config::{CliArgs, Config, USAGE},
    db::{
        self,
        repositories::{SqlxSessionRepository, SqlxSnippetRepository},
    },
    services::{SessionManager, SnippetService},
    templates::TemplateCache,
    web::{self, AppState},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snippetbox=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line flags; malformed flags are fatal
    let args = CliArgs::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{}", USAGE);
        e
    })?;
    if args.help {
        print!("{}", USAGE);
        return Ok(());
    }

    // Load configuration (file, environment, flags)
    let config = Config::load_with_args(&args)?;
    tracing::info!("Configuration loaded");

    // Connect to the database
    let pool = db::create_pool(&config.database)
        .await
        .context("Unable to connect to database")?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Build the template cache
    let templates = TemplateCache::new(&config.templates.path)
        .context("Failed to build template cache")?;
    tracing::info!(
        "Template cache built: {} template(s)",
        templates.template_names().len()
    );

    // Create repositories and services
    let snippet_repo = SqlxSnippetRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());

    let snippets = Arc::new(SnippetService::new(snippet_repo));
    let sessions = Arc::new(SessionManager::with_lifetime(
        session_repo,
        chrono::Duration::hours(config.session.lifetime_hours),
    ));

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        snippets,
        sessions: sessions.clone(),
        templates: Arc::new(templates),
    };

    // Start session sweep task (runs every hour)
    {
        let sessions = sessions.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600));
            loop {
                interval.tick().await;
                match sessions.sweep_expired().await {
                    Ok(0) => {}
                    Ok(n) => tracing::debug!("Swept {} expired session(s)", n),
                    Err(e) => tracing::warn!("Session sweep failed: {}", e),
                }
            }
        });
    }

    // Build router
    let app = web::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.addr))?;
    tracing::info!("Server listening on http://{}", config.server.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Shut down cleanly");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
