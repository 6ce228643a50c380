//! Site registration HTTP handler.

use axum::{Json, body::Bytes, extract::State};

use crate::{
    app::AppState,
    error::AppError,
    models::site::{RegisterSiteRequest, RegisterSiteResponse},
    services::site_service,
};

/// Register a WordPress site or replace its credentials.
///
/// # Endpoint
///
/// `POST /sites`
///
/// # Authentication
///
/// Requires the full security pipeline.
///
/// # Response
///
/// - **Success (200)**: `{"ok": true, "mode": "inserted", "site_id": .., "base_url": ..}`
/// - **Error (403)**: `SITE_HELPER_DISABLED` is set
/// - **Error (400)**: invalid JSON, missing fields or a non-http(s) `base_url`
pub async fn register_site(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RegisterSiteResponse>, AppError> {
    if state.tools_config.site_helper_disabled {
        return Err(AppError::SiteHelperDisabled);
    }

    let request: RegisterSiteRequest =
        serde_json::from_slice(&body).map_err(|_| AppError::InvalidJson)?;

    let response =
        site_service::register_site(state.sites.as_ref(), &state.security.app_secret, request)
            .await?;

    Ok(Json(response))
}
