use secrecy::ExposeSecret;
use std::net::{IpAddr, SocketAddr};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lms_gate::api::middleware::session::{create_session_layer, AppState};
use lms_gate::config::Config;
use lms_gate::db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lms_gate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting approval gate server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Create database pool
    let pool = db::create_pool(
        config.database_url.expose_secret(),
        config.database_max_connections,
    )
    .await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create session layer
    let session_layer = create_session_layer(pool.clone(), config.cookie_secure).await?;
    tracing::info!("Session layer initialized");

    let state = AppState { pool: pool.clone() };

    let app = lms_gate::api::router()
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let host: IpAddr = config.host.parse()?;
    let addr = SocketAddr::from((host, config.port));
    tracing::info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, cleaning up...");
}
