// src/realtime/mod.rs - WebSocket push subscriptions
//
// One table row per scope, one driver task per row, one heartbeat monitor for
// the whole client. Table and status locks are never held across an await.

pub mod health;
pub mod socket;
pub mod subscription;
pub mod update;

pub use socket::{Connector, Frame, Socket, TungsteniteConnector};
pub use subscription::{reconnect_delay, Scope, SubscriptionHandle, SubscriptionState};
pub use update::{PushUpdate, UpdateKind};

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::events::{ClientEvent, EventBus};
use crate::infra::config::RealtimeConfig;
use crate::infra::errors::DojoError;
use crate::util::{call_guarded, lock};
use subscription::{Backoff, Entry, Outbound};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Connecting,
    Disconnected,
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Connected => "connected",
            Self::Connecting => "connecting",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Point-in-time view returned by `connection_status()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionSnapshot {
    pub status: ConnectionStatus,
    /// Sockets that are connecting or open.
    pub active_sockets: usize,
    /// Sum of pending reconnect attempts across subscriptions.
    pub reconnect_attempts: u32,
}

pub type UpdateCallback = Arc<dyn Fn(&PushUpdate) + Send + Sync>;

pub struct Realtime {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    pub(crate) config: RealtimeConfig,
    ws_base: Url,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) bus: Arc<EventBus>,
    table: Mutex<HashMap<String, Entry>>,
    status: Mutex<ConnectionStatus>,
    last_heartbeat: Mutex<Instant>,
    monitor: Mutex<Option<CancellationToken>>,
    ids: AtomicU64,
}

impl Realtime {
    pub fn new(
        config: RealtimeConfig,
        ws_base: Url,
        connector: Arc<dyn Connector>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                ws_base,
                connector,
                bus,
                table: Mutex::new(HashMap::new()),
                status: Mutex::new(ConnectionStatus::Disconnected),
                last_heartbeat: Mutex::new(Instant::now()),
                monitor: Mutex::new(None),
                ids: AtomicU64::new(1),
            }),
        }
    }

    /// Register `callback` for updates on `scope`, opening the scope's socket
    /// if none is live. Must be called from within a tokio runtime.
    pub fn subscribe<F>(&self, scope: Scope, callback: F) -> SubscriptionHandle
    where
        F: Fn(&PushUpdate) + Send + Sync + 'static,
    {
        let shared = &self.shared;
        let listener = shared.next_id();
        let key = scope.key();

        let spawn = {
            let mut table = lock(&shared.table);
            let entry = table
                .entry(key)
                .or_insert_with(|| Entry::new(scope.clone(), 0));
            entry.listeners.push((listener, Arc::new(callback)));
            if entry.generation == 0 {
                entry.generation = shared.next_id();
                Some(entry.driver())
            } else if entry.state.is_stopped() {
                Some(entry.restart(shared.next_id()))
            } else {
                tracing::debug!("Reusing socket for {}", scope);
                None
            }
        };

        if let Some(driver) = spawn {
            shared.set_status_if(ConnectionStatus::Disconnected, ConnectionStatus::Connecting);
            tokio::spawn(driver.run(shared.clone()));
        }
        shared.ensure_monitor();

        SubscriptionHandle::new(Arc::downgrade(shared), scope, listener)
    }

    /// Queue a JSON payload for `scope`'s socket. Sent right away when the
    /// socket is open, otherwise on the next open in FIFO order.
    pub fn send<T: Serialize>(&self, scope: &Scope, payload: &T) -> Result<(), DojoError> {
        let text =
            serde_json::to_string(payload).map_err(|e| DojoError::Encode(e.to_string()))?;
        let mut table = lock(&self.shared.table);
        match table.get_mut(&scope.key()) {
            Some(entry) => {
                entry.enqueue(Outbound::Payload(text));
                Ok(())
            }
            None => Err(DojoError::WebSocket {
                scope: scope.key(),
                message: "not subscribed".into(),
            }),
        }
    }

    /// Restart every closed or failed subscription with a fresh attempt
    /// budget. Returns how many were restarted.
    pub fn reconnect(&self) -> usize {
        let shared = &self.shared;
        let drivers: Vec<_> = {
            let mut table = lock(&shared.table);
            table
                .values_mut()
                .filter(|e| e.state.is_stopped() && !e.listeners.is_empty())
                .map(|e| e.restart(shared.next_id()))
                .collect()
        };
        if !drivers.is_empty() {
            shared.set_status(ConnectionStatus::Connecting);
        }
        let restarted = drivers.len();
        for driver in drivers {
            tokio::spawn(driver.run(shared.clone()));
        }
        if restarted > 0 {
            shared.ensure_monitor();
        }
        restarted
    }

    pub fn subscription_state(&self, scope: &Scope) -> Option<SubscriptionState> {
        lock(&self.shared.table).get(&scope.key()).map(|e| e.state)
    }

    pub fn status(&self) -> ConnectionStatus {
        *lock(&self.shared.status)
    }

    pub fn connection_status(&self) -> ConnectionSnapshot {
        let table = lock(&self.shared.table);
        ConnectionSnapshot {
            status: self.status(),
            active_sockets: table.values().filter(|e| e.state.is_live()).count(),
            reconnect_attempts: table.values().map(|e| e.attempts).sum(),
        }
    }

    /// Close every socket with a normal closure and stop the heartbeat
    /// monitor. Safe to call more than once.
    pub fn shutdown(&self) {
        self.shared.set_status(ConnectionStatus::Disconnected);
        self.shared.stop_tasks();
    }
}

impl Drop for Realtime {
    fn drop(&mut self) {
        self.shared.stop_tasks();
    }
}

impl Shared {
    fn next_id(&self) -> u64 {
        self.ids.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn socket_url(&self, scope: &Scope) -> String {
        let mut url = self.ws_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("api")
                .push("ws")
                .extend(scope.segments());
        }
        url.to_string()
    }

    fn stop_tasks(&self) {
        if let Some(token) = lock(&self.monitor).take() {
            token.cancel();
        }
        let entries: Vec<Entry> = lock(&self.table).drain().map(|(_, e)| e).collect();
        for entry in entries {
            entry.cancel.cancel();
        }
    }

    fn ensure_monitor(self: &Arc<Self>) {
        let mut monitor = lock(&self.monitor);
        if monitor.is_none() {
            let token = CancellationToken::new();
            tokio::spawn(health::monitor(self.clone(), token.clone()));
            *monitor = Some(token);
        }
    }

    pub(crate) fn status(&self) -> ConnectionStatus {
        *lock(&self.status)
    }

    pub(crate) fn set_status(&self, status: ConnectionStatus) {
        let changed = {
            let mut current = lock(&self.status);
            std::mem::replace(&mut *current, status) != status
        };
        if changed {
            tracing::debug!("Connection status -> {}", status);
            self.bus.emit(&ClientEvent::ConnectionStatusChanged { status });
        }
    }

    fn set_status_if(&self, from: ConnectionStatus, to: ConnectionStatus) {
        if self.status() == from {
            self.set_status(to);
        }
    }

    /// Run `f` on the row for `key` if it still belongs to `generation`.
    pub(crate) fn update_entry(
        &self,
        key: &str,
        generation: u64,
        f: impl FnOnce(&mut Entry),
    ) -> bool {
        let mut table = lock(&self.table);
        match table.get_mut(key) {
            Some(entry) if entry.generation == generation => {
                f(entry);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn pop_outbound(&self, key: &str, generation: u64) -> Option<Outbound> {
        let mut table = lock(&self.table);
        table
            .get_mut(key)
            .filter(|e| e.generation == generation)
            .and_then(|e| e.queue.pop_front())
    }

    fn listeners(&self, key: &str, generation: u64) -> Vec<UpdateCallback> {
        lock(&self.table)
            .get(key)
            .filter(|e| e.generation == generation)
            .map(|e| e.listeners.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn notify_listeners(&self, key: &str, generation: u64, update: &PushUpdate) {
        for callback in self.listeners(key, generation) {
            call_guarded(key, || callback(update));
        }
    }

    pub(crate) fn mark_connected(&self) {
        *lock(&self.last_heartbeat) = Instant::now();
        self.set_status(ConnectionStatus::Connected);
    }

    fn record_heartbeat(&self) {
        *lock(&self.last_heartbeat) = Instant::now();
        self.set_status_if(ConnectionStatus::Error, ConnectionStatus::Connected);
    }

    /// Handle one text frame from the socket for `scope`.
    pub(crate) fn dispatch(&self, key: &str, generation: u64, scope: &Scope, text: &str) {
        let update = match serde_json::from_str::<PushUpdate>(text) {
            Ok(update) => update,
            Err(e) => {
                tracing::warn!("Error parsing WebSocket message on {}: {}", scope, e);
                self.bus.emit(&ClientEvent::ParseError {
                    scope: scope.clone(),
                    message: e.to_string(),
                });
                return;
            }
        };
        if update.is_heartbeat() {
            self.record_heartbeat();
            return;
        }
        self.notify_listeners(key, generation, &update);
        self.bus.emit(&scope.event_for(update));
    }

    pub(crate) fn plan_reconnect(&self, key: &str, generation: u64) -> Backoff {
        let client_live = self.status() != ConnectionStatus::Disconnected;
        let mut table = lock(&self.table);
        let Some(entry) = table.get_mut(key).filter(|e| e.generation == generation) else {
            return Backoff::Stop;
        };
        if !client_live {
            entry.state = SubscriptionState::Closed;
            return Backoff::Stop;
        }
        if entry.attempts >= self.config.max_reconnect_attempts {
            entry.state = SubscriptionState::Failed;
            return Backoff::GiveUp;
        }
        let delay = reconnect_delay(self.config.reconnect_delay(), entry.attempts);
        entry.attempts += 1;
        entry.state = SubscriptionState::Reconnecting {
            attempt: entry.attempts,
        };
        Backoff::Retry {
            delay,
            attempt: entry.attempts,
        }
    }

    pub(crate) fn health_tick(&self) {
        let limit = self.config.heartbeat_interval() * 2;
        let elapsed = lock(&self.last_heartbeat).elapsed();
        if elapsed > limit {
            tracing::warn!(
                "Connection health degraded - no heartbeat for {:?}",
                elapsed
            );
            self.set_status(ConnectionStatus::Error);
        }

        let mut table = lock(&self.table);
        for entry in table.values_mut() {
            if entry.state == SubscriptionState::Open {
                entry.enqueue(Outbound::Heartbeat);
            }
        }
    }

    pub(crate) fn remove_listener(&self, scope: &Scope, listener: u64) {
        let key = scope.key();
        let removed = {
            let mut table = lock(&self.table);
            let Some(entry) = table.get_mut(&key) else {
                return;
            };
            entry.listeners.retain(|(id, _)| *id != listener);
            if entry.listeners.is_empty() {
                table.remove(&key)
            } else {
                None
            }
        };
        if let Some(entry) = removed {
            tracing::debug!("Last listener left {}, closing socket", scope);
            entry.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Refusing;

    #[async_trait]
    impl Connector for Refusing {
        async fn connect(&self, url: &str) -> Result<Box<dyn Socket>, DojoError> {
            Err(DojoError::WebSocket {
                scope: url.to_string(),
                message: "refused".into(),
            })
        }
    }

    fn realtime(base: &str) -> Realtime {
        Realtime::new(
            RealtimeConfig::default(),
            Url::parse(base).unwrap(),
            Arc::new(Refusing),
            Arc::new(EventBus::new()),
        )
    }

    #[test]
    fn test_socket_url_layout() {
        let rt = realtime("ws://localhost:8080");
        assert_eq!(
            rt.shared.socket_url(&Scope::Session("abc".into())),
            "ws://localhost:8080/api/ws/sessions/abc"
        );
        assert_eq!(
            rt.shared.socket_url(&Scope::Providers),
            "ws://localhost:8080/api/ws/providers"
        );
    }

    #[test]
    fn test_socket_url_keeps_base_path_and_escapes_ids() {
        let rt = realtime("wss://host/dojo/");
        assert_eq!(
            rt.shared.socket_url(&Scope::Session("a b/c".into())),
            "wss://host/dojo/api/ws/sessions/a%20b%2Fc"
        );
    }

    #[test]
    fn test_send_requires_subscription() {
        let rt = realtime("ws://localhost:8080");
        let err = rt
            .send(&Scope::Tools, &serde_json::json!({"type": "ping"}))
            .unwrap_err();
        assert!(matches!(err, DojoError::WebSocket { .. }));
    }

    #[test]
    fn test_send_unserializable_payload_is_encode_error() {
        let rt = realtime("ws://localhost:8080");
        let payload: HashMap<(i32, i32), i32> = HashMap::from([((1, 2), 3)]);
        let err = rt.send(&Scope::Tools, &payload).unwrap_err();
        assert!(matches!(err, DojoError::Encode(_)), "got {err:?}");
        assert!(!err.to_string().contains("push message"));
    }

    #[test]
    fn test_initial_snapshot() {
        let rt = realtime("ws://localhost:8080");
        let snap = rt.connection_status();
        assert_eq!(snap.status, ConnectionStatus::Disconnected);
        assert_eq!(snap.active_sockets, 0);
        assert_eq!(snap.reconnect_attempts, 0);
    }

    #[test]
    fn test_status_change_emits_once() {
        let rt = realtime("ws://localhost:8080");
        let hits = Arc::new(AtomicU64::new(0));
        let h = hits.clone();
        rt.shared
            .bus
            .on(crate::events::EventKind::ConnectionStatusChanged, move |_| {
                h.fetch_add(1, Ordering::SeqCst);
            });
        rt.shared.set_status(ConnectionStatus::Error);
        rt.shared.set_status(ConnectionStatus::Error);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
