//! Transport gates.
//!
//! Run before any credential is looked at: maintenance mode first, then the
//! HTTPS requirement.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{app::AppState, error::AppError};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

pub async fn transport_gates(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if state.security.maintenance_mode {
        tracing::warn!(path = %request.uri().path(), "Request rejected: maintenance mode");
        return Err(AppError::MaintenanceMode);
    }

    if state.security.require_https && !is_https(&request, state.security.server_port) {
        tracing::warn!(path = %request.uri().path(), "Request rejected: HTTPS required");
        return Err(AppError::HttpsRequired);
    }

    Ok(next.run(request).await)
}

/// Whether the request arrived over HTTPS.
///
/// Accepts an `https` URI scheme, an `X-Forwarded-Proto: https` header
/// (first value when a list is forwarded), or a listener on port 443.
pub fn is_https(request: &Request, server_port: u16) -> bool {
    if request.uri().scheme_str() == Some("https") || server_port == 443 {
        return true;
    }

    request
        .headers()
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;

    fn request(uri: &str, forwarded: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri(uri);
        if let Some(proto) = forwarded {
            builder = builder.header(FORWARDED_PROTO, proto);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn detects_https_sources() {
        assert!(is_https(&request("https://gw.test/mcp", None), 3000));
        assert!(is_https(&request("/mcp", Some("https")), 3000));
        assert!(is_https(&request("/mcp", Some("HTTPS, http")), 3000));
        assert!(is_https(&request("/mcp", None), 443));
    }

    #[test]
    fn plain_http_is_not_https() {
        assert!(!is_https(&request("http://gw.test/mcp", None), 3000));
        assert!(!is_https(&request("/mcp", Some("http")), 8080));
        assert!(!is_https(&request("/mcp", Some("http, https")), 3000));
    }
}
