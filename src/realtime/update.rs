// src/realtime/update.rs - Push records received over a subscription socket

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::models::now_millis;

/// The `type` discriminator of a push record. Names this client does not
/// know are kept verbatim in `Other` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UpdateKind {
    Heartbeat,
    Message,
    Status,
    Error,
    ToolExecution,
    StreamStart,
    StreamEnd,
    // provider feed
    Metrics,
    Auth,
    // tool feed
    Execution,
    Approval,
    Result,
    Other(String),
}

impl UpdateKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Heartbeat => "heartbeat",
            Self::Message => "message",
            Self::Status => "status",
            Self::Error => "error",
            Self::ToolExecution => "tool_execution",
            Self::StreamStart => "stream_start",
            Self::StreamEnd => "stream_end",
            Self::Metrics => "metrics",
            Self::Auth => "auth",
            Self::Execution => "execution",
            Self::Approval => "approval",
            Self::Result => "result",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for UpdateKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "heartbeat" => Self::Heartbeat,
            "message" => Self::Message,
            "status" => Self::Status,
            "error" => Self::Error,
            "tool_execution" => Self::ToolExecution,
            "stream_start" => Self::StreamStart,
            "stream_end" => Self::StreamEnd,
            "metrics" => Self::Metrics,
            "auth" => Self::Auth,
            "execution" => Self::Execution,
            "approval" => Self::Approval,
            "result" => Self::Result,
            _ => Self::Other(name),
        }
    }
}

impl From<UpdateKind> for String {
    fn from(kind: UpdateKind) -> Self {
        match kind {
            UpdateKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Epoch milliseconds sent as a JSON number of either kind, or null.
/// Fractions are truncated; null and absent both read as 0.
fn lenient_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.map_or(0, |ms| ms as i64))
}

/// One decoded push record. Fields beyond `type`, `data` and `timestamp`
/// (e.g. `providerId`, `executionId`) are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushUpdate {
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub timestamp: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PushUpdate {
    pub fn new(kind: UpdateKind, data: Value) -> Self {
        Self {
            kind,
            data,
            timestamp: now_millis(),
            extra: Map::new(),
        }
    }

    /// Outgoing keep-alive: `{"type":"heartbeat","timestamp":<ms>}`.
    pub fn heartbeat() -> Self {
        Self::new(UpdateKind::Heartbeat, Value::Null)
    }

    /// Synthesized for direct callbacks when a socket drops abnormally.
    pub fn connection_lost(code: u16, reason: &str) -> Self {
        Self::new(
            UpdateKind::Error,
            json!({ "code": code, "reason": reason, "message": "Connection lost" }),
        )
    }

    pub fn is_heartbeat(&self) -> bool {
        self.kind == UpdateKind::Heartbeat
    }

    /// Look a field up in the top-level extras first, then inside `data`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(name).or_else(|| self.data.get(name))
    }

    pub fn to_json(&self) -> String {
        // A struct of JSON values always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_session_update() {
        let u: PushUpdate = serde_json::from_str(
            r#"{"type":"message","data":{"content":"hi"},"timestamp":42}"#,
        )
        .unwrap();
        assert_eq!(u.kind, UpdateKind::Message);
        assert_eq!(u.data["content"], "hi");
        assert_eq!(u.timestamp, 42);
        assert!(u.extra.is_empty());
    }

    #[test]
    fn test_extra_fields_preserved() {
        let u: PushUpdate =
            serde_json::from_str(r#"{"type":"status","providerId":"groq","data":{"status":"online"}}"#)
                .unwrap();
        assert_eq!(u.field("providerId"), Some(&json!("groq")));
        assert_eq!(u.field("status"), Some(&json!("online")));
        assert_eq!(u.timestamp, 0);
    }

    #[test]
    fn test_unknown_kind_round_trips() {
        let u: PushUpdate = serde_json::from_str(r#"{"type":"telemetry","data":1}"#).unwrap();
        assert_eq!(u.kind, UpdateKind::Other("telemetry".into()));
        assert_eq!(u.kind.as_str(), "telemetry");
        let v: Value = serde_json::from_str(&u.to_json()).unwrap();
        assert_eq!(v["type"], "telemetry");
        assert_eq!(v["data"], 1);
    }

    #[test]
    fn test_known_kind_names() {
        for name in ["tool_execution", "stream_start", "metrics", "result"] {
            let kind = UpdateKind::from(name.to_string());
            assert!(!matches!(kind, UpdateKind::Other(_)), "{name}");
            assert_eq!(String::from(kind), name);
        }
    }

    #[test]
    fn test_null_timestamp_reads_as_zero() {
        let u: PushUpdate =
            serde_json::from_str(r#"{"type":"message","data":{"x":1},"timestamp":null}"#).unwrap();
        assert_eq!(u.kind, UpdateKind::Message);
        assert_eq!(u.timestamp, 0);
    }

    #[test]
    fn test_fractional_timestamp_truncated() {
        let u: PushUpdate =
            serde_json::from_str(r#"{"type":"message","timestamp":1712345678901.5}"#).unwrap();
        assert_eq!(u.timestamp, 1_712_345_678_901);
    }

    #[test]
    fn test_missing_type_is_rejected() {
        assert!(serde_json::from_str::<PushUpdate>(r#"{"data":1}"#).is_err());
    }

    #[test]
    fn test_heartbeat_wire_shape() {
        let v: Value = serde_json::from_str(&PushUpdate::heartbeat().to_json()).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["type"], "heartbeat");
        assert!(obj["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_connection_lost_update() {
        let u = PushUpdate::connection_lost(1006, "reset");
        assert_eq!(u.kind, UpdateKind::Error);
        assert_eq!(u.data["code"], 1006);
    }
}
