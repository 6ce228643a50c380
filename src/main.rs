//! WordPress MCP gateway - main application entry point.
//!
//! Serves the JSON-RPC endpoint that lets an automation client create and
//! edit pages on registered WordPress sites.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: API key with SHA-256 hashing, HMAC request signatures
//! - **Format**: JSON-RPC 2.0 over HTTPS
//!
//! # Startup Flow
//!
//! 1. Load and validate configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use wp_mcp_gateway::{
    AppState, build_router,
    config::Config,
    db,
    store::PgStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Invalid security options stop the service before it binds
    let config = Config::from_env()?;
    let security = config.security()?;
    let tools = config.tools();
    tracing::info!(?config, "Configuration loaded");

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let store = Arc::new(PgStore::new(pool));
    let state = AppState::new(security, tools, store.clone(), store);
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Peer addresses feed the IP allowlist
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
