// src/client/analytics.rs - Usage analytics, server info and liveness checks

use std::time::Instant;

use super::DojoClient;
use crate::infra::errors::DojoError;
use crate::models::{
    ConnectionTest, CostBreakdownEntry, CostPeriod, ExportedFile, HealthStatus, ServerInfo,
    UsageExportFormat, UsageStats,
};

impl DojoClient {
    pub async fn get_usage_stats(&self) -> Result<UsageStats, DojoError> {
        self.get(&["analytics", "usage"]).await
    }

    pub async fn get_cost_breakdown(
        &self,
        period: CostPeriod,
    ) -> Result<Vec<CostBreakdownEntry>, DojoError> {
        self.get_with(
            &["analytics", "costs"],
            &[("period", period.as_str().to_string())],
        )
        .await
    }

    pub async fn export_usage_data(
        &self,
        format: UsageExportFormat,
    ) -> Result<ExportedFile, DojoError> {
        self.get_with(
            &["analytics", "export"],
            &[("format", format.as_str().to_string())],
        )
        .await
    }

    pub async fn get_server_info(&self) -> Result<ServerInfo, DojoError> {
        self.get(&["info"]).await
    }

    pub async fn health_check(&self) -> Result<HealthStatus, DojoError> {
        self.get(&["health"]).await
    }

    /// Round-trip to the health endpoint, reporting latency either way.
    pub async fn test_connection(&self) -> ConnectionTest {
        let started = Instant::now();
        let outcome = self.health_check().await;
        let latency_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(health) if health.is_ok() => ConnectionTest {
                success: true,
                latency_ms,
                error: None,
            },
            Ok(health) => ConnectionTest {
                success: false,
                latency_ms,
                error: Some(format!("Server reported status '{}'", health.status)),
            },
            Err(e) => ConnectionTest {
                success: false,
                latency_ms,
                error: Some(e.to_string()),
            },
        }
    }

    /// True when the backend answers its health check with a non-error status.
    pub async fn is_available(&self) -> bool {
        match self.health_check().await {
            Ok(health) => health.is_ok(),
            Err(e) => {
                tracing::debug!("Dojo server not available: {}", e);
                false
            }
        }
    }
}
