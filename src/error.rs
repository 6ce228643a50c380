//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::crypto::CryptoError;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error code.
///
/// # Error Categories
///
/// - **Security gates**: `Unauthenticated`, `InvalidSignature`, `RateLimited`,
///   and the transport rejections `MaintenanceMode` and `HttpsRequired`
/// - **Request errors**: malformed bodies and missing fields
/// - **Internal errors**: store and crypto failures, never detailed to the client
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Store operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing, unknown, inactive or IP-restricted API key.
    ///
    /// Deliberately one variant for every cause so the response never tells
    /// a caller which check failed.
    #[error("Unauthorized")]
    Unauthenticated,

    /// Missing, stale, replayed or forged request signature.
    #[error("Invalid request signature")]
    InvalidSignature,

    /// Per-minute quota exhausted for this key.
    #[error("Rate limit exceeded")]
    RateLimited { limit_per_minute: i64 },

    #[error("Service is in maintenance mode")]
    MaintenanceMode,

    #[error("HTTPS is required")]
    HttpsRequired,

    /// Secret could not be encrypted or decrypted.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Missing required fields")]
    MissingFields,

    #[error("Request body too large")]
    BodyTooLarge,

    #[error("Site helper is disabled")]
    SiteHelperDisabled,

    /// Request body or parameters are invalid.
    ///
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Rate limited responses add `"limit_per_minute"` inside `error`.
///
/// # Status Code Mapping
///
/// - `Unauthenticated` → 401 `Unauthorized`
/// - `InvalidSignature` → 401 `invalid_signature`
/// - `RateLimited` → 429 `rate_limited`
/// - `MaintenanceMode` → 503 `maintenance_mode`
/// - `HttpsRequired` → 403 `https_required`
/// - `Database`, `Crypto` → 500 `internal_error` (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Unauthorized", self.to_string())
            }
            AppError::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                "invalid_signature",
                self.to_string(),
            ),
            AppError::RateLimited { limit_per_minute } => {
                let body = Json(json!({
                    "error": {
                        "code": "rate_limited",
                        "message": self.to_string(),
                        "limit_per_minute": limit_per_minute
                    }
                }));
                return (StatusCode::TOO_MANY_REQUESTS, body).into_response();
            }
            AppError::MaintenanceMode => (
                StatusCode::SERVICE_UNAVAILABLE,
                "maintenance_mode",
                self.to_string(),
            ),
            AppError::HttpsRequired => {
                (StatusCode::FORBIDDEN, "https_required", self.to_string())
            }
            AppError::InvalidJson => (StatusCode::BAD_REQUEST, "invalid_json", self.to_string()),
            AppError::MissingFields => {
                (StatusCode::BAD_REQUEST, "missing_fields", self.to_string())
            }
            AppError::BodyTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "body_too_large",
                self.to_string(),
            ),
            AppError::SiteHelperDisabled => (
                StatusCode::FORBIDDEN,
                "site_helper_disabled",
                self.to_string(),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Database(ref e) => {
                tracing::error!("Store error: {e}");
                internal_error()
            }
            AppError::Crypto(ref e) => {
                tracing::error!("Crypto error: {e}");
                internal_error()
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

fn internal_error() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "An internal error occurred".to_string(),
    )
}
