// src/client/mod.rs - DojoClient: the single entry point for UI consumers
//
// Request/response calls live in the per-resource submodules; the streaming
// send is in `stream`; push subscriptions are delegated to `Realtime`.

pub mod analytics;
pub mod decoder;
pub mod projects;
pub mod providers;
mod request;
pub mod sessions;
pub mod settings;
pub mod stream;
pub mod tools;

pub use decoder::{SseLineDecoder, StreamChunk, StreamDecoder};
pub use stream::{StreamOptions, StreamOutcome};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use url::Url;

use crate::events::{ClientEvent, EventBus};
use crate::infra::config::{Config, ServerConfig};
use crate::infra::errors::DojoError;
use crate::models::now_millis;
use crate::realtime::{
    ConnectionSnapshot, Connector, PushUpdate, Realtime, Scope, SubscriptionHandle,
    TungsteniteConnector,
};
use crate::security::tool_policy::{AutoApprove, ToolApprover, ToolPolicy};

/// Sent as `client_version` on auth and streaming requests.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct DojoClient {
    http: reqwest::Client,
    base_url: Url,
    config: Config,
    bus: Arc<EventBus>,
    realtime: Realtime,
    policy: ToolPolicy,
    approver: Arc<dyn ToolApprover>,
}

impl DojoClient {
    pub fn new(config: Config) -> Result<Self, DojoError> {
        Self::with_connector(config, Arc::new(TungsteniteConnector))
    }

    /// Build a client whose push subscriptions go through `connector`.
    pub fn with_connector(config: Config, connector: Arc<dyn Connector>) -> Result<Self, DojoError> {
        let base_url = parse_base(&config.server.base_url)?;
        let ws_base = ws_base_for(&config.server)?;
        let http = reqwest::Client::builder()
            .default_headers(default_headers(&config.server)?)
            .user_agent(format!("dojo/{}", CLIENT_VERSION))
            .build()
            .map_err(|e| DojoError::Config(format!("Failed to build HTTP client: {e}")))?;

        let bus = Arc::new(EventBus::new());
        let realtime = Realtime::new(config.realtime.clone(), ws_base, connector, bus.clone());
        let policy = ToolPolicy::new(&config.tools);

        tracing::debug!("Dojo client targeting {}", base_url);
        Ok(Self {
            http,
            base_url,
            config,
            bus,
            realtime,
            policy,
            approver: Arc::new(AutoApprove),
        })
    }

    /// Replace the default auto-approving tool approver.
    pub fn with_approver(mut self, approver: Arc<dyn ToolApprover>) -> Self {
        self.approver = approver;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn realtime(&self) -> &Realtime {
        &self.realtime
    }

    // ─── Push subscriptions ─────────────────────────────────

    pub fn subscribe_to_session<F>(&self, session_id: &str, on_update: F) -> SubscriptionHandle
    where
        F: Fn(&PushUpdate) + Send + Sync + 'static,
    {
        self.realtime
            .subscribe(Scope::Session(session_id.to_string()), on_update)
    }

    pub fn subscribe_to_provider_updates<F>(&self, on_update: F) -> SubscriptionHandle
    where
        F: Fn(&PushUpdate) + Send + Sync + 'static,
    {
        self.realtime.subscribe(Scope::Providers, on_update)
    }

    pub fn subscribe_to_tool_executions<F>(&self, on_update: F) -> SubscriptionHandle
    where
        F: Fn(&PushUpdate) + Send + Sync + 'static,
    {
        self.realtime.subscribe(Scope::Tools, on_update)
    }

    pub fn connection_status(&self) -> ConnectionSnapshot {
        self.realtime.connection_status()
    }

    /// Close every socket, stop timers, announce `ClientDisconnected`, then
    /// drop all bus listeners. Idempotent.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down Dojo client");
        self.realtime.shutdown();
        self.bus.emit(&ClientEvent::ClientDisconnected {
            timestamp: now_millis(),
        });
        self.bus.clear();
    }
}

fn parse_base(raw: &str) -> Result<Url, DojoError> {
    let url = Url::parse(raw).map_err(|e| DojoError::Config(format!("Invalid base_url '{raw}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(DojoError::Config(format!("base_url '{raw}' cannot hold paths")));
    }
    Ok(url)
}

/// WebSocket base: the configured `ws_url`, else `base_url` with its scheme
/// swapped (http -> ws, https -> wss).
pub(crate) fn ws_base_for(server: &ServerConfig) -> Result<Url, DojoError> {
    if let Some(ws) = &server.ws_url {
        return parse_base(ws);
    }
    let mut url = parse_base(&server.base_url)?;
    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(DojoError::Config(format!(
                "Cannot derive a WebSocket URL from scheme '{other}'; set server.ws_url"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| DojoError::Config(format!("Cannot switch '{}' to {scheme}", server.base_url)))?;
    Ok(url)
}

fn default_headers(server: &ServerConfig) -> Result<HeaderMap, DojoError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    for (name, value) in &server.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| DojoError::Config(format!("Invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| DojoError::Config(format!("Invalid value for header '{name}': {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn server(base: &str, ws: Option<&str>) -> ServerConfig {
        ServerConfig {
            base_url: base.into(),
            ws_url: ws.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_ws_base_derived_from_http() {
        let url = ws_base_for(&server("http://localhost:8080", None)).unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8080/");
    }

    #[test]
    fn test_ws_base_derived_from_https() {
        let url = ws_base_for(&server("https://dojo.example.com/app", None)).unwrap();
        assert_eq!(url.as_str(), "wss://dojo.example.com/app");
    }

    #[test]
    fn test_ws_base_explicit_wins() {
        let url = ws_base_for(&server("http://a:1", Some("ws://b:2"))).unwrap();
        assert_eq!(url.host_str(), Some("b"));
    }

    #[test]
    fn test_ws_base_rejects_unknown_scheme() {
        assert!(matches!(
            ws_base_for(&server("ftp://files", None)),
            Err(DojoError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = Config::default();
        config.server.base_url = "not a url".into();
        assert!(matches!(DojoClient::new(config), Err(DojoError::Config(_))));
    }

    #[test]
    fn test_invalid_header_rejected() {
        let mut config = Config::default();
        config.server.headers = HashMap::from([("bad header".to_string(), "x".to_string())]);
        assert!(DojoClient::new(config).is_err());
    }

    #[test]
    fn test_shutdown_announces_then_clears() {
        let client = DojoClient::new(Config::default()).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        client.events().on(EventKind::ClientDisconnected, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        client.shutdown();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(client.events().event_kinds().is_empty());
        // second call is harmless
        client.shutdown();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
