//! HTTP middleware components.
//!
//! Middleware run before route handlers and short-circuit requests that fail
//! a security check:
//! - Transport gates (maintenance mode, HTTPS)
//! - The authentication, rate limit and signature pipeline

/// Request security pipeline
pub mod auth;
/// Maintenance and HTTPS gates
pub mod gates;
