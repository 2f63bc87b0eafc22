// src/client/settings.rs - Backend configuration, LSP servers and custom commands

use reqwest::Method;
use serde_json::json;
use std::collections::HashMap;

use super::DojoClient;
use crate::infra::errors::DojoError;
use crate::models::{
    CommandOutput, ConfigExport, CustomCommand, LspDiagnostic, LspServer, NewCustomCommand,
    Patch, RemoteConfig, ValidationResult,
};

impl DojoClient {
    pub async fn get_config(&self) -> Result<RemoteConfig, DojoError> {
        self.get(&["config"]).await
    }

    /// Apply a partial update; keys absent from `patch` are left unchanged.
    pub async fn update_config(&self, patch: &Patch) -> Result<(), DojoError> {
        self.put_unit(&["config"], patch).await
    }

    pub async fn validate_config(&self, config: &RemoteConfig) -> Result<ValidationResult, DojoError> {
        self.post(&["config", "validate"], config).await
    }

    pub async fn reset_config(&self) -> Result<RemoteConfig, DojoError> {
        self.post_empty(&["config", "reset"]).await
    }

    pub async fn export_config(&self) -> Result<ConfigExport, DojoError> {
        self.get(&["config", "export"]).await
    }

    pub async fn import_config(&self, config: &RemoteConfig) -> Result<ValidationResult, DojoError> {
        self.post(&["config", "import"], config).await
    }

    // ─── LSP ────────────────────────────────────────────────

    pub async fn get_lsp_servers(&self) -> Result<Vec<LspServer>, DojoError> {
        self.get(&["lsp", "servers"]).await
    }

    pub async fn get_diagnostics(&self, file_path: Option<&str>) -> Result<Vec<LspDiagnostic>, DojoError> {
        let query: Vec<(&str, String)> = file_path
            .map(|f| vec![("file", f.to_string())])
            .unwrap_or_default();
        self.get_with(&["lsp", "diagnostics"], &query).await
    }

    pub async fn enable_lsp_server(&self, server_id: &str) -> Result<(), DojoError> {
        self.execute(Method::POST, &["lsp", "servers", server_id, "enable"])
            .await
    }

    pub async fn disable_lsp_server(&self, server_id: &str) -> Result<(), DojoError> {
        self.execute(Method::POST, &["lsp", "servers", server_id, "disable"])
            .await
    }

    pub async fn restart_lsp_server(&self, server_id: &str) -> Result<(), DojoError> {
        self.execute(Method::POST, &["lsp", "servers", server_id, "restart"])
            .await
    }

    // ─── Custom commands ────────────────────────────────────

    pub async fn get_custom_commands(&self) -> Result<Vec<CustomCommand>, DojoError> {
        self.get(&["commands"]).await
    }

    pub async fn create_custom_command(
        &self,
        command: &NewCustomCommand,
    ) -> Result<CustomCommand, DojoError> {
        self.post(&["commands"], command).await
    }

    pub async fn update_custom_command(
        &self,
        command_id: &str,
        patch: &Patch,
    ) -> Result<CustomCommand, DojoError> {
        self.put(&["commands", command_id], patch).await
    }

    pub async fn delete_custom_command(&self, command_id: &str) -> Result<(), DojoError> {
        self.execute(Method::DELETE, &["commands", command_id]).await
    }

    pub async fn execute_command(
        &self,
        command_id: &str,
        args: &HashMap<String, String>,
    ) -> Result<CommandOutput, DojoError> {
        let body = json!({ "command_id": command_id, "args": args });
        self.post(&["commands", "execute"], &body).await
    }
}
