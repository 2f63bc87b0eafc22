// src/models/tool.rs - Tools, tool executions and MCP server registrations

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    File,
    System,
    Mcp,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: ToolCategory,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub config: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecution {
    pub id: String,
    pub tool_id: String,
    pub session_id: String,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: i64,
    #[serde(default)]
    pub completed_at: Option<i64>,
}

/// Body of `POST /tools/execute`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolExecutionRequest {
    pub tool_id: String,
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_approval: Option<bool>,
    /// Server-side execution timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_token: Option<String>,
}

impl ToolExecutionRequest {
    pub fn new(tool_id: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            tool_id: tool_id.into(),
            params,
            ..Default::default()
        }
    }

    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    /// Milliseconds.
    #[serde(default)]
    pub execution_time: u64,
    #[serde(default)]
    pub tool_id: String,
}

impl ToolResult {
    pub fn failure(tool_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: Value::Null,
            error: Some(error.into()),
            cost: None,
            execution_time: 0,
            tool_id: tool_id.into(),
        }
    }
}

// ─── MCP servers ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpTransport {
    Stdio,
    Sse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpStatus {
    Connected,
    Disconnected,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServer {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub transport: McpTransport,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
    pub status: McpStatus,
}

/// Registration payload: everything but the server-assigned id and status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMcpServer {
    pub name: String,
    #[serde(rename = "type")]
    pub transport: McpTransport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
}

/// Partial update; unset fields are left untouched server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct McpServerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub transport: Option<McpTransport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTestResult {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub tools: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_terminal_statuses() {
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Cancelled.is_terminal());
        assert!(!ExecutionStatus::Pending.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
    }

    #[test]
    fn test_execution_request_body() {
        let mut params = Map::new();
        params.insert("command".into(), json!("npm test"));
        let req = ToolExecutionRequest::new("bash", params).in_session("session-1");
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["tool_id"], "bash");
        assert_eq!(v["session_id"], "session-1");
        assert!(v.get("timeout").is_none());
        assert!(v.get("validation_token").is_none());
    }

    #[test]
    fn test_tool_result_defaults_missing_fields() {
        let r: ToolResult = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert_eq!(r.execution_time, 0);
        assert!(r.result.is_null());
    }

    #[test]
    fn test_mcp_server_type_field() {
        let raw = r#"{"id":"m1","name":"fs","type":"stdio","command":"npx","status":"connected"}"#;
        let s: McpServer = serde_json::from_str(raw).unwrap();
        assert_eq!(s.transport, McpTransport::Stdio);
        assert_eq!(s.status, McpStatus::Connected);
    }

    #[test]
    fn test_mcp_update_only_sends_set_fields() {
        let update = McpServerUpdate {
            url: Some("http://localhost:9000/sse".into()),
            ..Default::default()
        };
        let v = serde_json::to_value(&update).unwrap();
        assert_eq!(v, json!({"url": "http://localhost:9000/sse"}));
    }
}
