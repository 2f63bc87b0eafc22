// src/models/session.rs - Sessions and their messages

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub project_path: String,
    pub provider: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_tools: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionTokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub project_path: String,
    pub provider: String,
    pub model: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub status: SessionStatus,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub total_cost: f64,
    pub config: SessionConfig,
    #[serde(default)]
    pub shared: Option<bool>,
    #[serde(default)]
    pub share_url: Option<String>,
    #[serde(default)]
    pub preview_text: Option<String>,
    #[serde(default)]
    pub tools_used: Option<Vec<String>>,
    #[serde(default)]
    pub token_usage: Option<SessionTokenUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub message_count: u64,
    pub total_cost: f64,
    pub avg_response_time: f64,
    pub tool_executions: u64,
    pub start_time: i64,
    pub duration: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareLink {
    pub url: String,
    pub expires_at: i64,
    pub password_protected: bool,
    #[serde(default)]
    pub view_count: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ShareOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_hours: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Markdown,
    Text,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Text => "text",
        }
    }
}

/// A file produced by an export endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedFile {
    pub content: String,
    pub filename: String,
}

// ─── Messages ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    User,
    Assistant,
    System,
    Tool,
}

/// Plain text, or a structured tool-call payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<Value>),
}

impl MessageContent {
    /// Text view of the content; structured parts are joined by their `text` fields.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageTokens {
    pub input: u64,
    pub output: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    pub name: String,
    #[serde(default)]
    pub input: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: MessageContent,
    pub timestamp: i64,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub tokens: Option<MessageTokens>,
    #[serde(default)]
    pub tool_calls: Option<Vec<MessageToolCall>>,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, Value>>,
}

/// Options for a buffered (non-streamed) send.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SendOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageAck {
    #[serde(rename = "messageId", alias = "message_id")]
    pub message_id: String,
}

/// Paging window for message history.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub since: Option<i64>,
}

impl MessageQuery {
    /// Query pairs in the order the backend documents them. Zero values are omitted.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(limit) = self.limit.filter(|v| *v > 0) {
            out.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset.filter(|v| *v > 0) {
            out.push(("offset", offset.to_string()));
        }
        if let Some(since) = self.since.filter(|v| *v > 0) {
            out.push(("since", since.to_string()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_session_parses_backend_shape() {
        let raw = serde_json::json!({
            "id": "session-1",
            "name": "Authentication Refactor",
            "project_path": "/Users/dev/myapp",
            "provider": "anthropic",
            "model": "claude-3-5-sonnet-20241022",
            "created_at": 1_700_000_000_000i64,
            "updated_at": 1_700_000_100_000i64,
            "status": "active",
            "message_count": 12,
            "total_cost": 0.45,
            "token_usage": {"input_tokens": 2500, "output_tokens": 3200},
            "config": {
                "project_path": "/Users/dev/myapp",
                "provider": "anthropic",
                "model": "claude-3-5-sonnet-20241022",
                "max_tokens": 8000,
                "temperature": 0.7
            }
        });
        let s: Session = serde_json::from_value(raw).unwrap();
        assert_eq!(s.status, SessionStatus::Active);
        assert_eq!(s.config.max_tokens, Some(8000));
        assert_eq!(s.token_usage.unwrap().output_tokens, 3200);
    }

    #[test]
    fn test_session_config_skips_unset_fields() {
        let cfg = SessionConfig {
            project_path: "/p".into(),
            provider: "openai".into(),
            model: "gpt-4o".into(),
            ..Default::default()
        };
        let v = serde_json::to_value(&cfg).unwrap();
        assert!(v.get("temperature").is_none());
        assert_eq!(v["model"], "gpt-4o");
    }

    #[test]
    fn test_message_content_text_or_parts() {
        let text: MessageContent = serde_json::from_str("\"hello\"").unwrap();
        assert_eq!(text.as_text(), "hello");

        let parts: MessageContent =
            serde_json::from_str(r#"[{"type":"text","text":"a"},{"type":"tool_use"},{"text":"b"}]"#)
                .unwrap();
        assert_eq!(parts.as_text(), "ab");
    }

    #[test]
    fn test_message_type_field_renamed() {
        let raw = r#"{"id":"m1","session_id":"s1","role":"assistant","type":"tool",
            "content":"x","timestamp":1,"provider":"p","model":"m"}"#;
        let m: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(m.kind, MessageType::Tool);
        assert_eq!(m.role, Role::Assistant);
    }

    #[test]
    fn test_message_ack_accepts_both_spellings() {
        let a: MessageAck = serde_json::from_str(r#"{"messageId":"x"}"#).unwrap();
        let b: MessageAck = serde_json::from_str(r#"{"message_id":"y"}"#).unwrap();
        assert_eq!(a.message_id, "x");
        assert_eq!(b.message_id, "y");
    }

    #[test]
    fn test_message_query_omits_zero_and_none() {
        let q = MessageQuery {
            limit: Some(50),
            offset: Some(0),
            since: None,
        };
        assert_eq!(q.pairs(), vec![("limit", "50".to_string())]);
        assert!(MessageQuery::default().pairs().is_empty());
    }

    #[test]
    fn test_export_format_names() {
        assert_eq!(ExportFormat::default().as_str(), "json");
        assert_eq!(ExportFormat::Markdown.as_str(), "markdown");
    }
}
