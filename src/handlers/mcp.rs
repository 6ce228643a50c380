//! MCP endpoint handlers.
//!
//! This module implements the JSON-RPC surface:
//! - GET / and GET /mcp - Service info
//! - POST / and POST /mcp - JSON-RPC 2.0 dispatch (`initialize`,
//!   `tools/list`, `tools/call`)

use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::{Map, Value, json};

use crate::{app::AppState, error::AppError, models::principal::Principal};

pub const SERVER_NAME: &str = "wp-mcp-gateway";

/// JSON-RPC "method not found" code.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Service info.
///
/// # Endpoint
///
/// `GET /` or `GET /mcp`
///
/// Passes the transport gates only; no credentials are required.
///
/// ```json
/// { "ok": true, "name": "wp-mcp-gateway", "time": "2026-10-18T19:00:00+00:00" }
/// ```
pub async fn info() -> Json<Value> {
    Json(json!({
        "ok": true,
        "name": SERVER_NAME,
        "time": Utc::now().to_rfc3339(),
    }))
}

/// JSON-RPC dispatch.
///
/// # Endpoint
///
/// `POST /` or `POST /mcp`
///
/// # Authentication
///
/// Requires the full security pipeline; the resolved principal arrives as a
/// request extension.
///
/// # Request Body
///
/// ```json
/// {
///   "jsonrpc": "2.0",
///   "id": 1,
///   "method": "tools/call",
///   "params": { "name": "get_page", "arguments": { "site_id": "main", "slug": "about" } }
/// }
/// ```
///
/// # Response
///
/// - **200**: `{"jsonrpc": "2.0", "id": .., "result": ..}`
/// - **400**: body is not a JSON object (`invalid_json`), or a tool rejected
///   its arguments (JSON-RPC error `-32602`)
/// - **403 / 404 / 500**: tool failures as JSON-RPC errors
/// - **404**: unknown method (JSON-RPC error `-32601`)
pub async fn rpc(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> Result<Response, AppError> {
    let Ok(Value::Object(mut request)) = serde_json::from_slice::<Value>(&body) else {
        return Err(AppError::InvalidJson);
    };

    let id = request.remove("id").unwrap_or(Value::Null);
    let method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let params = object_or_empty(request.remove("params"));

    let result = match method.as_str() {
        "initialize" => json!({
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": { "tools": true },
        }),
        "tools/list" => state.tools.list_tools(),
        "tools/call" => {
            let name = params
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let arguments = Value::Object(object_or_empty(params.get("arguments").cloned()));

            match state.tools.call_tool(&principal, name, arguments).await {
                Ok(result) => result,
                Err(e) => return Ok(rpc_error(e.status(), id, e.to_rpc_error())),
            }
        }
        _ => {
            tracing::debug!(method = %method, "Unknown JSON-RPC method");
            return Ok(rpc_error(
                StatusCode::NOT_FOUND,
                id,
                json!({ "code": METHOD_NOT_FOUND, "message": "Method not found" }),
            ));
        }
    };

    Ok(Json(json!({ "jsonrpc": "2.0", "id": id, "result": result })).into_response())
}

fn object_or_empty(value: Option<Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn rpc_error(status: StatusCode, id: Value, error: Value) -> Response {
    (
        status,
        Json(json!({ "jsonrpc": "2.0", "id": id, "error": error })),
    )
        .into_response()
}
