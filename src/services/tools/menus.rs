//! Menu tools.
//!
//! Core WordPress has no REST endpoint for writing menu items, so
//! `add_menu_item` validates its input and answers with guidance instead of
//! calling the site. The call is audited with status `error`.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::models::audit::AuditStatus;
use crate::models::principal::Principal;
use crate::services::tools::{Tool, ToolError, ToolRegistry, parse_args};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AddMenuItemArgs {
    site_id: String,
    menu_location: String,
    label: String,
    url: Option<String>,
}

pub async fn add_menu_item(
    registry: &ToolRegistry,
    principal: &Principal,
    input: Value,
) -> Result<Value, ToolError> {
    let args: AddMenuItemArgs = parse_args(&input)?;
    if args.site_id.is_empty() || args.menu_location.is_empty() || args.label.is_empty() {
        return Err(ToolError::InvalidArguments(
            "site_id, menu_location, label are required".to_string(),
        ));
    }

    let out = json!({
        "ok": false,
        "error": "menu_not_supported",
        "message": "Menu editing requires a WP-side endpoint or a menus REST plugin; menu writes are not implemented.",
        "suggestion": {
            "option_a": "Install a WP menus REST plugin and wire it here.",
            "option_b": "Add a minimal WP plugin endpoint (recommended) and call it here.",
            "menu_location": args.menu_location,
            "label": args.label,
            "url": args.url.unwrap_or_default(),
        },
    });

    registry
        .audit(principal, &args.site_id, Tool::AddMenuItem, &input, &out, AuditStatus::Error)
        .await;
    Ok(out)
}
