//! Tool call audit log.

use serde_json::Value;

use crate::config::ToolsConfig;
use crate::models::audit::AuditEntry;
use crate::store::SiteStore;

/// Input keys replaced by `"[redacted]"` unless sensitive logging is on.
const SENSITIVE_KEYS: [&str; 3] = ["wp_app_password", "wp_app_password_enc", "app_password"];

/// Replace sensitive top-level input values.
pub fn redact(mut input: Value) -> Value {
    if let Value::Object(map) = &mut input {
        for key in SENSITIVE_KEYS {
            if let Some(value) = map.get_mut(key) {
                *value = Value::String("[redacted]".to_string());
            }
        }
    }
    input
}

/// Record a tool call when `LOG_DB` is enabled.
///
/// Sensitive inputs are redacted first unless `LOG_SENSITIVE_INPUTS` is set.
///
/// # Error Handling
///
/// A failed write is logged and swallowed; the tool result is independent
/// of audit delivery.
pub async fn record_tool_call(store: &dyn SiteStore, config: &ToolsConfig, mut entry: AuditEntry) {
    if !config.log_db {
        return;
    }

    if !config.log_sensitive_inputs {
        entry.input = redact(entry.input);
    }

    if let Err(e) = store.record_tool_call(&entry).await {
        tracing::error!(
            tool_name = %entry.tool_name,
            api_key_id = entry.api_key_id,
            "Failed to write audit log: {e}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audit::AuditStatus;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn redacts_only_sensitive_keys() {
        let redacted = redact(json!({
            "site_id": "main",
            "wp_app_password": "secret",
            "app_password": "secret",
            "nested": {"wp_app_password": "left alone"}
        }));

        assert_eq!(redacted["site_id"], "main");
        assert_eq!(redacted["wp_app_password"], "[redacted]");
        assert_eq!(redacted["app_password"], "[redacted]");
        assert_eq!(redacted["nested"]["wp_app_password"], "left alone");
    }

    #[tokio::test]
    async fn respects_logging_switches() {
        let store = MemoryStore::new();
        let entry = AuditEntry {
            api_key_id: 1,
            site_id: Some("main".to_string()),
            tool_name: "get_page".to_string(),
            input: json!({"site_id": "main", "app_password": "pw"}),
            result: json!({"ok": true}),
            status: AuditStatus::Ok,
        };

        let mut config = ToolsConfig::default();
        record_tool_call(&store, &config, entry.clone()).await;

        config.log_sensitive_inputs = true;
        record_tool_call(&store, &config, entry.clone()).await;

        config.log_db = false;
        record_tool_call(&store, &config, entry).await;

        let entries = store.audit_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].input["app_password"], "[redacted]");
        assert_eq!(entries[1].input["app_password"], "pw");
        assert_eq!(entries[0].status, AuditStatus::Ok);
    }
}
