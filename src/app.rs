//! Shared application state and the HTTP router.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::config::{SecurityConfig, ToolsConfig};
use crate::handlers;
use crate::middleware;
use crate::services::authenticator::Authenticator;
use crate::services::rate_limiter::RateLimiter;
use crate::services::signature::SignatureVerifier;
use crate::services::tools::ToolRegistry;
use crate::store::{CredentialStore, SiteStore};

/// State shared by every handler and middleware.
///
/// Built once at startup from validated configuration; cloning only bumps
/// reference counts.
#[derive(Clone)]
pub struct AppState {
    pub security: Arc<SecurityConfig>,
    pub tools_config: Arc<ToolsConfig>,
    pub credentials: Arc<dyn CredentialStore>,
    pub sites: Arc<dyn SiteStore>,
    pub authenticator: Arc<Authenticator>,
    pub rate_limiter: Arc<RateLimiter>,
    pub verifier: Arc<SignatureVerifier>,
    pub tools: Arc<ToolRegistry>,
}

impl AppState {
    pub fn new(
        security: SecurityConfig,
        tools_config: ToolsConfig,
        credentials: Arc<dyn CredentialStore>,
        sites: Arc<dyn SiteStore>,
    ) -> Self {
        let authenticator = Authenticator::new(credentials.clone(), &security);
        let rate_limiter = RateLimiter::new(credentials.clone(), security.rate_limit_per_minute);
        let verifier = SignatureVerifier::new(security.signature_max_skew_seconds);
        let tools = ToolRegistry::new(
            sites.clone(),
            security.app_secret.clone(),
            tools_config.clone(),
        );

        Self {
            security: Arc::new(security),
            tools_config: Arc::new(tools_config),
            credentials,
            sites,
            authenticator: Arc::new(authenticator),
            rate_limiter: Arc::new(rate_limiter),
            verifier: Arc::new(verifier),
            tools: Arc::new(tools),
        }
    }
}

/// Build the application router.
///
/// # Layers
///
/// - `/health` is open
/// - `GET /` and `GET /mcp` pass the transport gates only
/// - `POST /`, `POST /mcp` and `POST /sites` pass the transport gates and
///   then the full security pipeline
pub fn build_router(state: AppState) -> Router {
    let pipeline =
        axum_middleware::from_fn_with_state(state.clone(), middleware::auth::security_pipeline);
    let gates =
        axum_middleware::from_fn_with_state(state.clone(), middleware::gates::transport_gates);

    let mcp = get(handlers::mcp::info).merge(post(handlers::mcp::rpc).route_layer(pipeline.clone()));

    Router::new()
        .route("/", mcp.clone())
        .route("/mcp", mcp)
        .route(
            "/sites",
            post(handlers::sites::register_site).route_layer(pipeline),
        )
        // Only the routes above are gated
        .route_layer(gates)
        .route("/health", get(handlers::health::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
