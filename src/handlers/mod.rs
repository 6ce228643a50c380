//! HTTP request handlers (route handlers).
//!
//! Handlers run after the middleware has admitted the request; protected
//! handlers receive the resolved `Principal` as a request extension.

/// Store connectivity probe
pub mod health;
/// JSON-RPC endpoint and service info
pub mod mcp;
/// Site registration helper
pub mod sites;
