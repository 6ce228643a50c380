//! Tool call audit records.

use serde_json::Value;

/// One row of the `mcp_logs` table.
///
/// `input` has already been redacted by the audit service before it reaches
/// the store.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub api_key_id: i64,
    pub site_id: Option<String>,
    pub tool_name: String,
    pub input: Value,
    pub result: Value,
    pub status: AuditStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Ok,
    Error,
}

impl AuditStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditStatus::Ok => "ok",
            AuditStatus::Error => "error",
        }
    }
}
