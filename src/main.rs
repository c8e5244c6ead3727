use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use callscope::config::Config;
use callscope::AppState;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "callscope")]
#[command(author, version, about = "Role-gated speech analytics dashboard backend", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "callscope.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Callscope v{}", env!("CARGO_PKG_VERSION"));

    // Ensure data and upload directories exist
    std::fs::create_dir_all(&config.server.data_dir)?;
    std::fs::create_dir_all(config.uploads.dir(&config.server.data_dir))?;

    // Initialize database
    let db = callscope::db::init(&config.server.data_dir).await?;

    // Ensure default admin user exists
    callscope::auth::ensure_admin_user(
        &db,
        &config.auth.admin_username,
        &config.auth.admin_email,
        &config.auth.admin_password,
    )
    .await?;

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), db.clone()));

    // Create API router
    let api_router = callscope::api::create_router(state.clone());

    // Serve frontend static files with SPA fallback
    let static_dir = PathBuf::from("static/dist");
    let index_file = static_dir.join("index.html");
    let serve_static = ServeDir::new(&static_dir).not_found_service(ServeFile::new(&index_file));

    // Combine routers - API first, then static files as fallback
    let app = axum::Router::new()
        .merge(api_router)
        .fallback_service(serve_static);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
