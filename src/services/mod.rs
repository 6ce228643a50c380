//! Business logic services.
//!
//! Services hold the security pipeline stages and the tool implementations,
//! separated from the HTTP handlers and middleware that drive them.

pub mod audit_service;
pub mod authenticator;
pub mod ip_allowlist;
pub mod key_service;
pub mod rate_limiter;
pub mod signature;
pub mod site_service;
pub mod tools;
pub mod wp_client;
