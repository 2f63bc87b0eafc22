// src/client/tools.rs - Tools, gated execution, and MCP server management

use reqwest::Method;
use std::time::Instant;

use super::DojoClient;
use crate::events::ClientEvent;
use crate::infra::errors::DojoError;
use crate::models::{
    McpServer, McpServerUpdate, McpTestResult, NewMcpServer, Tool, ToolExecution,
    ToolExecutionRequest, ToolResult,
};
use crate::security::tool_policy::ToolVerdict;

impl DojoClient {
    pub async fn get_tools(&self) -> Result<Vec<Tool>, DojoError> {
        self.get(&["tools"]).await
    }

    pub async fn get_tool_executions(
        &self,
        session_id: Option<&str>,
    ) -> Result<Vec<ToolExecution>, DojoError> {
        let query: Vec<(&str, String)> = session_id
            .map(|id| vec![("session_id", id.to_string())])
            .unwrap_or_default();
        self.get_with(&["tools", "executions"], &query).await
    }

    pub async fn get_tool_execution(&self, execution_id: &str) -> Result<ToolExecution, DojoError> {
        self.get(&["tools", "executions", execution_id]).await
    }

    pub async fn approve_tool_execution(&self, execution_id: &str) -> Result<(), DojoError> {
        self.execute(Method::POST, &["tools", "executions", execution_id, "approve"])
            .await
    }

    pub async fn cancel_tool_execution(&self, execution_id: &str) -> Result<(), DojoError> {
        self.execute(Method::POST, &["tools", "executions", execution_id, "cancel"])
            .await
    }

    /// Screen `request` against the local tool policy, ask the approver when
    /// needed, then dispatch it.
    ///
    /// A blocked or unapproved request returns a failed `ToolResult` without
    /// any network traffic. Transport and HTTP failures are returned as `Err`.
    pub async fn execute_tool(
        &self,
        mut request: ToolExecutionRequest,
    ) -> Result<ToolResult, DojoError> {
        let (token, flagged) = match self.policy.evaluate(&request.tool_id, &request.params) {
            ToolVerdict::Blocked { reason } => {
                tracing::warn!("Tool execution {} blocked: {}", request.tool_id, reason);
                return Ok(ToolResult::failure(
                    &request.tool_id,
                    format!("Tool execution blocked: {reason}"),
                ));
            }
            ToolVerdict::Allowed { token } => (token, None),
            ToolVerdict::NeedsApproval { reason, token } => (token, Some(reason)),
        };

        if flagged.is_some() || request.require_approval == Some(true) {
            tracing::info!("Requesting approval for tool execution {}", request.tool_id);
            self.bus.emit(&ClientEvent::ToolApprovalRequired {
                request: request.clone(),
                reason: flagged.clone(),
            });
            if !self.approver.approve(request.clone(), flagged).await {
                return Ok(ToolResult::failure(
                    &request.tool_id,
                    "Tool execution requires user approval",
                ));
            }
        }

        request.validation_token = Some(token);
        let started = Instant::now();
        let mut result: ToolResult = self.post(&["tools", "execute"], &request).await?;
        if result.execution_time == 0 {
            result.execution_time = started.elapsed().as_millis() as u64;
        }
        if result.tool_id.is_empty() {
            result.tool_id = request.tool_id.clone();
        }

        tracing::info!(
            "Tool execution logged: {} success={} time={}ms",
            result.tool_id,
            result.success,
            result.execution_time
        );
        self.bus.emit(&ClientEvent::ToolExecutionLogged {
            tool_id: result.tool_id.clone(),
            session_id: request.session_id.clone(),
            success: result.success,
            execution_time: result.execution_time,
            error: result.error.clone(),
        });
        Ok(result)
    }

    // ─── MCP servers ────────────────────────────────────────

    pub async fn get_mcp_servers(&self) -> Result<Vec<McpServer>, DojoError> {
        self.get(&["tools", "mcp"]).await
    }

    pub async fn add_mcp_server(&self, server: &NewMcpServer) -> Result<McpServer, DojoError> {
        self.post(&["tools", "mcp"], server).await
    }

    pub async fn update_mcp_server(
        &self,
        server_id: &str,
        update: &McpServerUpdate,
    ) -> Result<McpServer, DojoError> {
        self.put(&["tools", "mcp", server_id], update).await
    }

    pub async fn delete_mcp_server(&self, server_id: &str) -> Result<(), DojoError> {
        self.execute(Method::DELETE, &["tools", "mcp", server_id]).await
    }

    pub async fn test_mcp_server(&self, server_id: &str) -> Result<McpTestResult, DojoError> {
        self.post_empty(&["tools", "mcp", server_id, "test"]).await
    }
}
