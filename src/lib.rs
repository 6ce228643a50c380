//! WordPress MCP gateway.
//!
//! An API-key-authenticated, request-signed JSON-RPC endpoint that lets an
//! automation client drive content operations on registered WordPress
//! sites. Every protected request passes, in order:
//!
//! 1. Maintenance-mode gate
//! 2. HTTPS gate
//! 3. Authentication (API key hash lookup, IP allowlist, scopes)
//! 4. Per-key, per-minute rate limit
//! 5. HMAC signature verification over the raw body
//! 6. Method dispatch
//!
//! Stored WordPress passwords and signing secrets are sealed with
//! AES-256-GCM under the deployment `APP_SECRET`.

pub mod app;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

pub use app::{AppState, build_router};
