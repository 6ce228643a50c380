//! Data models representing database entities.
//!
//! This module contains the records read from and written to the store, and
//! the authenticated principal derived from them.

/// API key authentication model
pub mod api_key;
/// Tool call audit log
pub mod audit;
pub mod principal;
/// Registered WordPress sites
pub mod site;
