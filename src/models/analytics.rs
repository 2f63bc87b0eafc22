// src/models/analytics.rs - Usage statistics and server metadata

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodUsage {
    pub sessions: u64,
    pub messages: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub total_sessions: u64,
    pub total_messages: u64,
    pub total_cost: f64,
    pub avg_response_time: f64,
    #[serde(default)]
    pub most_used_provider: String,
    #[serde(default)]
    pub most_used_model: String,
    #[serde(default)]
    pub today: PeriodUsage,
    #[serde(default)]
    pub this_week: PeriodUsage,
    #[serde(default)]
    pub this_month: PeriodUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostPeriod {
    Day,
    Week,
    #[default]
    Month,
}

impl CostPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdownEntry {
    pub provider_id: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_cost: f64,
    pub requests: u64,
    pub avg_cost_per_request: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UsageExportFormat {
    #[default]
    Csv,
    Json,
}

impl UsageExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerLimits {
    pub max_sessions: u64,
    pub max_message_length: u64,
    pub max_file_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub version: String,
    pub uptime: u64,
    pub providers_count: u64,
    pub active_sessions: u64,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub limits: ServerLimits,
}

impl ServerInfo {
    pub fn supports(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status != "error"
    }
}

/// Outcome of a round-trip to the health endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionTest {
    pub success: bool,
    pub latency_ms: u64,
    pub error: Option<String>,
}
