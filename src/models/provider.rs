// src/models/provider.rs - AI vendors exposed by the backend

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Openai,
    Anthropic,
    Google,
    Groq,
    Local,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Online,
    Offline,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub authenticated: bool,
    pub status: ProviderStatus,
    #[serde(default)]
    pub cost_per_1k_tokens: f64,
    #[serde(default)]
    pub avg_response_time: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: Option<HashMap<String, Value>>,
}

impl Provider {
    /// Estimated cost for `tokens` tokens at this provider's per-1k rate.
    pub fn estimate_cost(&self, tokens: u64) -> f64 {
        self.cost_per_1k_tokens * tokens as f64 / 1000.0
    }

    pub fn is_usable(&self) -> bool {
        self.authenticated && self.status == ProviderStatus::Online
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowedMetrics {
    pub requests: u64,
    pub cost: f64,
    pub avg_response_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetrics {
    pub provider_id: String,
    pub requests: u64,
    pub avg_response_time: f64,
    pub total_cost: f64,
    pub error_rate: f64,
    #[serde(default)]
    pub last_24h: WindowedMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub provider_id: String,
    pub status: ProviderStatus,
    pub response_time: f64,
    pub last_check: i64,
    pub uptime: f64,
    #[serde(default)]
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResult {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub provider_id: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl AuthResult {
    pub fn failed(provider_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            provider_id: provider_id.into(),
            expires_at: None,
        }
    }
}
