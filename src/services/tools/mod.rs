//! Tool registry and dispatch for `tools/list` and `tools/call`.
//!
//! Each tool requires one scope. The scope check runs before arguments are
//! validated or any site is contacted.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::config::{AppSecret, ToolsConfig};
use crate::models::audit::{AuditEntry, AuditStatus};
use crate::models::principal::Principal;
use crate::services::audit_service;
use crate::services::site_service::{self, LoadSiteError};
use crate::services::wp_client::{WpClient, WpError};
use crate::store::SiteStore;

pub mod menus;
pub mod pages;

/// JSON-RPC "invalid params" code.
pub const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC implementation-defined server error code.
pub const SERVER_ERROR: i64 = -32000;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Missing scope: {0}")]
    MissingScope(&'static str),

    #[error("{0}")]
    InvalidArguments(String),

    #[error("Unknown site_id")]
    UnknownSite,

    /// Stored site credentials could not be decrypted.
    #[error("Site credentials unavailable")]
    SiteUnavailable,

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    WordPress(#[from] WpError),
}

impl From<LoadSiteError> for ToolError {
    fn from(error: LoadSiteError) -> Self {
        match error {
            LoadSiteError::UnknownSite => ToolError::UnknownSite,
            LoadSiteError::Database(e) => ToolError::Database(e),
            LoadSiteError::Crypto(e) => {
                tracing::error!("Site credentials failed to decrypt: {e}");
                ToolError::SiteUnavailable
            }
        }
    }
}

impl ToolError {
    pub fn status(&self) -> StatusCode {
        match self {
            ToolError::UnknownTool(_) | ToolError::InvalidArguments(_) => StatusCode::BAD_REQUEST,
            ToolError::MissingScope(_) => StatusCode::FORBIDDEN,
            ToolError::UnknownSite | ToolError::NotFound(_) => StatusCode::NOT_FOUND,
            ToolError::SiteUnavailable | ToolError::Database(_) | ToolError::WordPress(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// JSON-RPC error object for this failure.
    ///
    /// Store and crypto failures are reported without detail.
    pub fn to_rpc_error(&self) -> Value {
        match self {
            ToolError::UnknownTool(_) | ToolError::InvalidArguments(_) => json!({
                "code": INVALID_PARAMS,
                "message": self.to_string(),
            }),
            ToolError::Database(e) => {
                tracing::error!("Store error during tool call: {e}");
                json!({ "code": SERVER_ERROR, "message": "Server error" })
            }
            ToolError::SiteUnavailable => {
                json!({ "code": SERVER_ERROR, "message": "Server error" })
            }
            ToolError::WordPress(_) => json!({
                "code": SERVER_ERROR,
                "message": "Server error",
                "data": { "detail": self.to_string() },
            }),
            _ => json!({ "code": SERVER_ERROR, "message": self.to_string() }),
        }
    }
}

/// Tools exposed over JSON-RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    CreatePage,
    UpdatePage,
    InsertSection,
    GetPage,
    AddMenuItem,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::CreatePage,
        Tool::UpdatePage,
        Tool::InsertSection,
        Tool::GetPage,
        Tool::AddMenuItem,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Tool::CreatePage => "create_page",
            Tool::UpdatePage => "update_page",
            Tool::InsertSection => "insert_section",
            Tool::GetPage => "get_page",
            Tool::AddMenuItem => "add_menu_item",
        }
    }

    pub fn required_scope(self) -> &'static str {
        match self {
            Tool::CreatePage | Tool::UpdatePage | Tool::InsertSection => "pages.write",
            Tool::GetPage => "pages.read",
            Tool::AddMenuItem => "menus.write",
        }
    }

    pub fn descriptor(self) -> Value {
        let (description, properties, required) = match self {
            Tool::CreatePage => (
                "Create a WordPress page",
                json!({
                    "site_id": {"type": "string"},
                    "title": {"type": "string"},
                    "slug": {"type": "string"},
                    "content": {"type": "string"},
                    "status": {"type": "string", "enum": ["draft", "publish"]},
                }),
                json!(["site_id", "title"]),
            ),
            Tool::UpdatePage => (
                "Update a WordPress page",
                json!({
                    "site_id": {"type": "string"},
                    "page_id": {"type": "integer"},
                    "slug": {"type": "string"},
                    "title": {"type": "string"},
                    "content": {"type": "string"},
                    "status": {"type": "string", "enum": ["draft", "publish"]},
                }),
                json!(["site_id"]),
            ),
            Tool::InsertSection => (
                "Insert content after a heading (best-effort)",
                json!({
                    "site_id": {"type": "string"},
                    "page_id": {"type": "integer"},
                    "anchor_heading": {"type": "string"},
                    "content": {"type": "string"},
                }),
                json!(["site_id", "page_id", "anchor_heading", "content"]),
            ),
            Tool::GetPage => (
                "Get a WordPress page by slug",
                json!({
                    "site_id": {"type": "string"},
                    "slug": {"type": "string"},
                }),
                json!(["site_id", "slug"]),
            ),
            Tool::AddMenuItem => (
                "Add a menu item (site-specific; may require WP-side endpoint)",
                json!({
                    "site_id": {"type": "string"},
                    "menu_location": {"type": "string"},
                    "label": {"type": "string"},
                    "url": {"type": "string"},
                }),
                json!(["site_id", "menu_location", "label"]),
            ),
        };

        json!({
            "name": self.name(),
            "description": description,
            "input_schema": {
                "type": "object",
                "properties": properties,
                "required": required,
            },
        })
    }
}

/// Dispatches tool calls for authenticated principals.
pub struct ToolRegistry {
    sites: Arc<dyn SiteStore>,
    app_secret: AppSecret,
    config: ToolsConfig,
}

impl ToolRegistry {
    pub fn new(sites: Arc<dyn SiteStore>, app_secret: AppSecret, config: ToolsConfig) -> Self {
        Self {
            sites,
            app_secret,
            config,
        }
    }

    pub fn list_tools(&self) -> Value {
        json!({ "tools": Tool::ALL.map(Tool::descriptor) })
    }

    /// Run a tool on behalf of `principal`.
    ///
    /// # Errors
    ///
    /// - `UnknownTool`: no tool with this name
    /// - `MissingScope`: the principal lacks the tool's scope
    /// - Tool-specific validation, site and WordPress errors
    pub async fn call_tool(
        &self,
        principal: &Principal,
        name: &str,
        args: Value,
    ) -> Result<Value, ToolError> {
        let tool = Tool::from_name(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let scope = tool.required_scope();
        if !principal.has_scope(scope) {
            tracing::warn!(
                api_key_id = principal.api_key_id,
                tool = tool.name(),
                "Tool call denied: missing scope {scope}"
            );
            return Err(ToolError::MissingScope(scope));
        }

        tracing::info!(api_key_id = principal.api_key_id, tool = tool.name(), "Tool call");

        match tool {
            Tool::CreatePage => pages::create_page(self, principal, args).await,
            Tool::UpdatePage => pages::update_page(self, principal, args).await,
            Tool::InsertSection => pages::insert_section(self, principal, args).await,
            Tool::GetPage => pages::get_page(self, principal, args).await,
            Tool::AddMenuItem => menus::add_menu_item(self, principal, args).await,
        }
    }

    /// Load a site's credentials and build a client for it.
    pub(crate) async fn open_site(&self, site_id: &str) -> Result<WpClient, ToolError> {
        let site = site_service::load_site(self.sites.as_ref(), &self.app_secret, site_id).await?;
        Ok(WpClient::new(
            &site,
            Duration::from_secs(self.config.wp_timeout_seconds),
        )?)
    }

    pub(crate) async fn audit(
        &self,
        principal: &Principal,
        site_id: &str,
        tool: Tool,
        input: &Value,
        result: &Value,
        status: AuditStatus,
    ) {
        let entry = AuditEntry {
            api_key_id: principal.api_key_id,
            site_id: Some(site_id.to_string()).filter(|s| !s.is_empty()),
            tool_name: tool.name().to_string(),
            input: input.clone(),
            result: result.clone(),
            status,
        };
        audit_service::record_tool_call(self.sites.as_ref(), &self.config, entry).await;
    }
}

/// Decode tool arguments; missing fields take their defaults.
pub(crate) fn parse_args<T: DeserializeOwned>(args: &Value) -> Result<T, ToolError> {
    let args = if args.is_null() { json!({}) } else { args.clone() };
    serde_json::from_value(args)
        .map_err(|e| ToolError::InvalidArguments(format!("Invalid arguments: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::api_key::Scopes;
    use crate::store::MemoryStore;

    fn registry() -> ToolRegistry {
        ToolRegistry::new(
            Arc::new(MemoryStore::new()),
            AppSecret::new("tools-test-secret-0123456789"),
            ToolsConfig::default(),
        )
    }

    fn principal(scopes: &[&str]) -> Principal {
        Principal {
            api_key_id: 3,
            name: "client".to_string(),
            scopes: scopes.iter().copied().collect::<Scopes>(),
            signing_secret: None,
        }
    }

    #[test]
    fn lists_every_tool_with_schema() {
        let listed = registry().list_tools();
        let names: Vec<&str> = listed["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            ["create_page", "update_page", "insert_section", "get_page", "add_menu_item"]
        );
        assert_eq!(listed["tools"][0]["input_schema"]["required"], json!(["site_id", "title"]));
    }

    #[test]
    fn names_round_trip() {
        for tool in Tool::ALL {
            assert_eq!(Tool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(Tool::from_name("drop_database"), None);
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let err = registry()
            .call_tool(&principal(&["pages.write"]), "drop_database", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_rpc_error()["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn missing_scope_is_checked_before_arguments() {
        let err = registry()
            .call_tool(&principal(&["pages.read"]), "create_page", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingScope("pages.write")));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_rpc_error()["message"], "Missing scope: pages.write");
    }

    #[tokio::test]
    async fn unknown_site_is_not_found() {
        let err = registry()
            .call_tool(
                &principal(&["pages.read"]),
                "get_page",
                json!({"site_id": "nope", "slug": "about"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownSite));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_failures_hide_detail() {
        let rpc = ToolError::SiteUnavailable.to_rpc_error();
        assert_eq!(rpc["message"], "Server error");
        assert!(rpc.get("data").is_none());
    }
}
