// src/client/providers.rs - Provider listing, health and authentication

use serde_json::json;
use std::collections::HashMap;

use super::{DojoClient, CLIENT_VERSION};
use crate::infra::errors::DojoError;
use crate::models::{
    now_millis, AuthResult, Provider, ProviderHealth, ProviderMetrics, ProviderStatus,
};

impl DojoClient {
    pub async fn get_providers(&self) -> Result<Vec<Provider>, DojoError> {
        self.get(&["providers"]).await
    }

    pub async fn get_provider_status(&self) -> Result<HashMap<String, ProviderStatus>, DojoError> {
        self.get(&["providers", "status"]).await
    }

    pub async fn get_provider_metrics(&self) -> Result<Vec<ProviderMetrics>, DojoError> {
        self.get(&["providers", "metrics"]).await
    }

    pub async fn get_provider_health(&self) -> Result<Vec<ProviderHealth>, DojoError> {
        self.get(&["providers", "health"]).await
    }

    /// Authenticate a provider. Never errors: invalid input and transport
    /// failures both come back as an unsuccessful `AuthResult`.
    pub async fn authenticate_provider(
        &self,
        provider_id: &str,
        credentials: &HashMap<String, String>,
    ) -> AuthResult {
        if provider_id.is_empty() || credentials.is_empty() {
            return AuthResult::failed(provider_id, "Invalid provider ID or credentials");
        }

        let body = json!({
            "providerId": provider_id,
            "credentials": credentials,
            "timestamp": now_millis(),
            "client_version": CLIENT_VERSION,
        });
        match self.post::<_, AuthResult>(&["providers", "auth"], &body).await {
            Ok(result) => {
                if result.success {
                    tracing::info!("Provider {} authenticated", provider_id);
                } else {
                    tracing::warn!(
                        "Provider {} rejected credentials: {}",
                        provider_id,
                        result.message.as_deref().unwrap_or("no reason given")
                    );
                }
                result
            }
            Err(e) => {
                tracing::error!("Authentication failed for provider {}: {}", provider_id, e);
                AuthResult::failed(provider_id, e.to_string())
            }
        }
    }
}
