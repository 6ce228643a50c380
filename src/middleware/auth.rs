//! Request security pipeline.
//!
//! This middleware runs on every protected route after the transport gates:
//! 1. Authenticate the bearer key against the store and the IP allowlist
//! 2. Count the request against the key's per-minute quota
//! 3. Verify the request signature over the raw body, when required
//! 4. Inject the resolved [`Principal`] into the request
//!
//! Each stage is terminal on failure; later stages never run.

use std::net::SocketAddr;

use axum::{
    body::{self, Body},
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::{
    app::AppState,
    error::AppError,
    models::principal::Principal,
    services::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER, parse_timestamp},
};

/// Largest request body buffered for signature verification.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Security pipeline middleware function.
///
/// # Headers
///
/// ```text
/// Authorization: Bearer <api key>
/// X-MCP-Timestamp: <unix seconds>
/// X-MCP-Signature: <hex hmac-sha256>
/// ```
///
/// # Returns
///
/// - `Ok(Response)` from the next handler once every stage passes
/// - `Err(AppError::Unauthenticated)` for any authentication failure
/// - `Err(AppError::RateLimited)` when the quota is exhausted
/// - `Err(AppError::InvalidSignature)` for a missing, stale, forged or
///   replayed signature
pub async fn security_pipeline(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let api_key = bearer_token(request.headers()).map(str::to_owned);
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default();

    let principal = state
        .authenticator
        .authenticate(api_key.as_deref(), &client_ip)
        .await?;

    if !state.rate_limiter.allow(principal.api_key_id).await? {
        tracing::warn!(
            api_key_id = principal.api_key_id,
            "Request rejected: rate limit exceeded"
        );
        return Err(AppError::RateLimited {
            limit_per_minute: state.rate_limiter.limit(),
        });
    }

    let mut request = if state.security.require_signed_requests {
        verify_signature(&state, &principal, request).await?
    } else {
        request
    };

    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

/// Extract the key from `Authorization: Bearer <key>`.
///
/// The scheme is matched case-insensitively and the key is trimmed.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, rest) = value.split_at_checked(7)?;
    if !scheme.eq_ignore_ascii_case("Bearer ") {
        return None;
    }
    Some(rest.trim())
}

/// Buffer the body, verify its signature and hand back an equivalent request.
async fn verify_signature(
    state: &AppState,
    principal: &Principal,
    request: Request,
) -> Result<Request, AppError> {
    let (parts, body) = request.into_parts();
    let bytes = body::to_bytes(body, MAX_BODY_BYTES).await.map_err(|e| {
        tracing::warn!(api_key_id = principal.api_key_id, "Request body rejected: {e}");
        AppError::BodyTooLarge
    })?;

    let timestamp = header_str(&parts.headers, TIMESTAMP_HEADER);
    let signature = header_str(&parts.headers, SIGNATURE_HEADER);

    if !state.verifier.verify(principal, &bytes, timestamp, signature) {
        tracing::warn!(
            api_key_id = principal.api_key_id,
            "Request rejected: invalid signature"
        );
        return Err(AppError::InvalidSignature);
    }

    if state.security.reject_replayed_signatures {
        reject_replay(state, principal, timestamp, signature).await?;
    }

    Ok(Request::from_parts(parts, Body::from(bytes)))
}

/// Refuse a `(timestamp, signature)` pair this key has already used.
async fn reject_replay(
    state: &AppState,
    principal: &Principal,
    timestamp: Option<&str>,
    signature: Option<&str>,
) -> Result<(), AppError> {
    let (Some(ts), Some(signature)) = (timestamp.and_then(|t| parse_timestamp(t.trim())), signature)
    else {
        return Err(AppError::InvalidSignature);
    };

    let skew = i64::try_from(state.verifier.max_skew_seconds()).unwrap_or(i64::MAX);
    let not_before = Utc::now().timestamp().saturating_sub(skew);

    let fresh = state
        .credentials
        .remember_signature(
            principal.api_key_id,
            ts,
            &signature.trim().to_ascii_lowercase(),
            not_before,
        )
        .await?;

    if !fresh {
        tracing::warn!(
            api_key_id = principal.api_key_id,
            "Request rejected: replayed signature"
        );
        return Err(AppError::InvalidSignature);
    }

    Ok(())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(authorization).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(&headers("bearer   abc123  ")), Some("abc123"));
        assert_eq!(bearer_token(&headers("BEARER abc123")), Some("abc123"));
    }

    #[test]
    fn rejects_other_schemes() {
        assert_eq!(bearer_token(&headers("Basic YWJjOmRlZg==")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
