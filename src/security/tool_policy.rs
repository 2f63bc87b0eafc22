// src/security/tool_policy.rs - Deny-list screening for tool execution requests
//
// This is a UI hint that catches obviously destructive requests before they
// leave the client. The backend remains responsible for enforcement.

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::infra::config::{ToolMatchAction, ToolsConfig};
use crate::models::ToolExecutionRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolVerdict {
    Allowed { token: String },
    NeedsApproval { reason: String, token: String },
    Blocked { reason: String },
}

#[derive(Debug, Clone)]
pub struct ToolPolicy {
    dangerous_tools: Vec<String>,
    suspicious_patterns: Vec<String>,
    on_match: ToolMatchAction,
}

impl ToolPolicy {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            dangerous_tools: config.dangerous_tools.clone(),
            suspicious_patterns: config.suspicious_patterns.clone(),
            on_match: config.on_match,
        }
    }

    pub fn evaluate(&self, tool_id: &str, params: &Map<String, Value>) -> ToolVerdict {
        match self.find_match(tool_id, params) {
            None => ToolVerdict::Allowed {
                token: validation_token(),
            },
            Some(reason) => match self.on_match {
                ToolMatchAction::Reject => ToolVerdict::Blocked { reason },
                ToolMatchAction::RequireApproval => ToolVerdict::NeedsApproval {
                    reason,
                    token: validation_token(),
                },
            },
        }
    }

    /// Describe the first rule the request trips, if any.
    fn find_match(&self, tool_id: &str, params: &Map<String, Value>) -> Option<String> {
        if let Some(name) = self
            .dangerous_tools
            .iter()
            .find(|name| !name.is_empty() && tool_id.contains(name.as_str()))
        {
            return Some(format!("tool '{}' matches deny-listed name '{}'", tool_id, name));
        }

        for (key, value) in params {
            let mut strings = Vec::new();
            collect_strings(value, &mut strings);
            for s in strings {
                if let Some(pattern) = self
                    .suspicious_patterns
                    .iter()
                    .find(|p| !p.is_empty() && s.contains(p.as_str()))
                {
                    return Some(format!(
                        "parameter '{}' contains suspicious pattern '{}'",
                        key, pattern
                    ));
                }
            }
        }
        None
    }
}

/// String leaves of a parameter value, including inside arrays and objects.
fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

fn validation_token() -> String {
    format!("validation_{}", Uuid::new_v4())
}

/// Decides whether a flagged tool request may be sent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolApprover: Send + Sync {
    async fn approve(&self, request: ToolExecutionRequest, reason: Option<String>) -> bool;
}

/// Approves everything and leaves a log line behind.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

#[async_trait]
impl ToolApprover for AutoApprove {
    async fn approve(&self, request: ToolExecutionRequest, reason: Option<String>) -> bool {
        tracing::info!(
            "Auto-approving tool execution {} ({})",
            request.tool_id,
            reason.as_deref().unwrap_or("no policy match")
        );
        true
    }
}
