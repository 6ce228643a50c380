//! Page tools backed by the WordPress `wp/v2/pages` endpoint.

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::models::audit::AuditStatus;
use crate::models::principal::Principal;
use crate::services::tools::{Tool, ToolError, ToolRegistry, parse_args};

const PAGES_PATH: &str = "/wp-json/wp/v2/pages";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreatePageArgs {
    site_id: String,
    title: String,
    slug: Option<String>,
    content: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpdatePageArgs {
    site_id: String,
    page_id: Option<i64>,
    slug: Option<String>,
    title: Option<String>,
    content: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InsertSectionArgs {
    site_id: String,
    page_id: i64,
    anchor_heading: String,
    content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GetPageArgs {
    site_id: String,
    slug: String,
}

enum PageTarget {
    Id(i64),
    Slug(String),
}

fn validate_status(status: &str) -> Result<(), ToolError> {
    match status {
        "draft" | "publish" => Ok(()),
        _ => Err(ToolError::InvalidArguments("invalid status".to_string())),
    }
}

fn slug_query(slug: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(slug.as_bytes()).collect();
    format!("{PAGES_PATH}?slug={encoded}")
}

/// Create a page. `status` defaults to `draft`.
pub async fn create_page(
    registry: &ToolRegistry,
    principal: &Principal,
    input: Value,
) -> Result<Value, ToolError> {
    let args: CreatePageArgs = parse_args(&input)?;
    if args.site_id.is_empty() || args.title.is_empty() {
        return Err(ToolError::InvalidArguments(
            "site_id and title are required".to_string(),
        ));
    }
    let status = args.status.unwrap_or_else(|| "draft".to_string());
    validate_status(&status)?;

    let wp = registry.open_site(&args.site_id).await?;

    let mut payload = Map::new();
    payload.insert("title".to_string(), json!(args.title));
    payload.insert("status".to_string(), json!(status));
    if let Some(slug) = args.slug.filter(|s| !s.is_empty()) {
        payload.insert("slug".to_string(), json!(slug));
    }
    if let Some(content) = args.content.filter(|c| !c.is_empty()) {
        payload.insert("content".to_string(), json!(content));
    }

    let res = wp.post(PAGES_PATH, &Value::Object(payload)).await?;

    let out = json!({
        "ok": true,
        "page_id": res.get("id"),
        "link": res.get("link"),
        "status": res.get("status"),
    });

    registry
        .audit(principal, &args.site_id, Tool::CreatePage, &input, &out, AuditStatus::Ok)
        .await;
    Ok(out)
}

/// Update a page identified by `page_id`, or by `slug` when no id is given.
pub async fn update_page(
    registry: &ToolRegistry,
    principal: &Principal,
    input: Value,
) -> Result<Value, ToolError> {
    let args: UpdatePageArgs = parse_args(&input)?;
    if args.site_id.is_empty() {
        return Err(ToolError::InvalidArguments("site_id is required".to_string()));
    }

    let target = match (
        args.page_id.filter(|id| *id > 0),
        args.slug.filter(|s| !s.is_empty()),
    ) {
        (Some(id), _) => PageTarget::Id(id),
        (None, Some(slug)) => PageTarget::Slug(slug),
        (None, None) => {
            return Err(ToolError::InvalidArguments(
                "page_id or slug is required".to_string(),
            ));
        }
    };

    let mut payload = Map::new();
    if let Some(title) = args.title {
        payload.insert("title".to_string(), json!(title));
    }
    if let Some(content) = args.content {
        payload.insert("content".to_string(), json!(content));
    }
    if let Some(status) = args.status {
        validate_status(&status)?;
        payload.insert("status".to_string(), json!(status));
    }
    if payload.is_empty() {
        return Err(ToolError::InvalidArguments("No fields to update".to_string()));
    }

    let wp = registry.open_site(&args.site_id).await?;

    let page_id = match target {
        PageTarget::Id(id) => id,
        PageTarget::Slug(slug) => {
            let found = wp.get(&slug_query(&slug)).await?;
            found
                .get(0)
                .and_then(|page| page.get("id"))
                .and_then(Value::as_i64)
                .ok_or_else(|| ToolError::NotFound("Page not found for slug".to_string()))?
        }
    };

    let res = wp
        .put(&format!("{PAGES_PATH}/{page_id}"), &Value::Object(payload))
        .await?;

    let out = json!({
        "ok": true,
        "page_id": res.get("id").cloned().unwrap_or(json!(page_id)),
        "link": res.get("link"),
        "status": res.get("status"),
    });

    registry
        .audit(principal, &args.site_id, Tool::UpdatePage, &input, &out, AuditStatus::Ok)
        .await;
    Ok(out)
}

/// Insert HTML right after the first heading whose text is `anchor_heading`.
pub async fn insert_section(
    registry: &ToolRegistry,
    principal: &Principal,
    input: Value,
) -> Result<Value, ToolError> {
    let args: InsertSectionArgs = parse_args(&input)?;
    if args.site_id.is_empty()
        || args.page_id <= 0
        || args.anchor_heading.is_empty()
        || args.content.is_empty()
    {
        return Err(ToolError::InvalidArguments(
            "site_id, page_id, anchor_heading, content are required".to_string(),
        ));
    }

    let wp = registry.open_site(&args.site_id).await?;
    let page_path = format!("{PAGES_PATH}/{}", args.page_id);

    let page = wp.get(&page_path).await?;
    let current = page
        .get("content")
        .and_then(|c| c.get("raw").or_else(|| c.get("rendered")))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let updated = insert_after_heading(current, &args.anchor_heading, &args.content).ok_or_else(
        || ToolError::NotFound("Anchor heading not found (or insertion not possible)".to_string()),
    )?;

    let res = wp.put(&page_path, &json!({ "content": updated })).await?;

    let out = json!({
        "ok": true,
        "page_id": res.get("id").cloned().unwrap_or(json!(args.page_id)),
        "link": res.get("link"),
        "note": "Best-effort HTML insertion; for robust Gutenberg edits, use a WP-side endpoint.",
    });

    registry
        .audit(principal, &args.site_id, Tool::InsertSection, &input, &out, AuditStatus::Ok)
        .await;
    Ok(out)
}

/// Look a page up by slug. A missing page is a successful `found: false`.
pub async fn get_page(
    registry: &ToolRegistry,
    principal: &Principal,
    input: Value,
) -> Result<Value, ToolError> {
    let args: GetPageArgs = parse_args(&input)?;
    if args.site_id.is_empty() || args.slug.is_empty() {
        return Err(ToolError::InvalidArguments(
            "site_id and slug are required".to_string(),
        ));
    }

    let wp = registry.open_site(&args.site_id).await?;
    let found = wp.get(&slug_query(&args.slug)).await?;

    let out = match found.get(0) {
        None => json!({ "ok": true, "found": false }),
        Some(page) => json!({
            "ok": true,
            "found": true,
            "page_id": page.get("id"),
            "title": page.get("title").and_then(|t| t.get("rendered")),
            "status": page.get("status"),
            "link": page.get("link"),
        }),
    };

    registry
        .audit(principal, &args.site_id, Tool::GetPage, &input, &out, AuditStatus::Ok)
        .await;
    Ok(out)
}

/// Insert `insert_html` on its own line after the first `<h1>`..`<h6>`
/// element whose trimmed text equals `heading` (case-insensitive).
///
/// Returns `None` when no such heading exists.
pub fn insert_after_heading(html: &str, heading: &str, insert_html: &str) -> Option<String> {
    let pattern = format!(
        r"(?i)<(h[1-6])\b[^>]*>\s*{}\s*</(h[1-6])>",
        regex::escape(heading)
    );
    let re = Regex::new(&pattern).ok()?;

    let end = re
        .captures_iter(html)
        .find(|caps| caps[1].eq_ignore_ascii_case(&caps[2]))
        .and_then(|caps| caps.get(0))
        .map(|m| m.end())?;

    Some(format!("{}\n{}\n{}", &html[..end], insert_html, &html[end..]))
}
