// src/realtime/subscription.rs - Per-scope socket driver and its state machine

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::socket::{Frame, Socket, ABNORMAL_CLOSE, NORMAL_CLOSE};
use super::update::PushUpdate;
use super::{Shared, UpdateCallback};
use crate::events::ClientEvent;
use crate::infra::errors::DojoError;

/// What a subscription listens to. Each scope maps to exactly one socket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Session(String),
    Providers,
    Tools,
}

impl Scope {
    /// Path segments under `/api/ws/`.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Scope::Session(id) => vec!["sessions", id.as_str()],
            Scope::Providers => vec!["providers"],
            Scope::Tools => vec!["tools"],
        }
    }

    /// Table key; also the human-readable form.
    pub fn key(&self) -> String {
        self.segments().join("/")
    }

    /// The bus event carrying a forwarded update from this scope.
    pub(crate) fn event_for(&self, update: PushUpdate) -> ClientEvent {
        match self {
            Scope::Session(id) => ClientEvent::SessionUpdate {
                session_id: id.clone(),
                update,
            },
            Scope::Providers => ClientEvent::ProviderUpdate { update },
            Scope::Tools => ClientEvent::ToolExecutionUpdate { update },
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Connecting,
    Open,
    /// Waiting out the backoff before reconnect number `attempt`.
    Reconnecting { attempt: u32 },
    /// Closed normally; restarted by a new subscribe or `reconnect()`.
    Closed,
    /// Backoff budget exhausted.
    Failed,
}

impl SubscriptionState {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

/// Delay before the next reconnect, given how many reconnects already
/// happened since the last successful open: `base * 2^attempts`.
pub fn reconnect_delay(base: Duration, attempts: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempts))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outbound {
    Payload(String),
    Heartbeat,
}

impl Outbound {
    fn into_text(self) -> String {
        match self {
            Outbound::Payload(text) => text,
            Outbound::Heartbeat => PushUpdate::heartbeat().to_json(),
        }
    }
}

/// One row of the subscription table.
pub(crate) struct Entry {
    pub(crate) scope: Scope,
    pub(crate) state: SubscriptionState,
    pub(crate) listeners: Vec<(u64, UpdateCallback)>,
    pub(crate) queue: VecDeque<Outbound>,
    pub(crate) attempts: u32,
    pub(crate) cancel: CancellationToken,
    pub(crate) wake: Arc<Notify>,
    /// Bumped on every restart so a superseded driver cannot touch the row.
    pub(crate) generation: u64,
}

impl Entry {
    pub(crate) fn new(scope: Scope, generation: u64) -> Self {
        Self {
            scope,
            state: SubscriptionState::Connecting,
            listeners: Vec::new(),
            queue: VecDeque::new(),
            attempts: 0,
            cancel: CancellationToken::new(),
            wake: Arc::new(Notify::new()),
            generation,
        }
    }

    /// Re-arm a stopped row for a fresh driver.
    pub(crate) fn restart(&mut self, generation: u64) -> Driver {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.generation = generation;
        self.state = SubscriptionState::Connecting;
        self.attempts = 0;
        self.driver()
    }

    pub(crate) fn driver(&self) -> Driver {
        Driver {
            key: self.scope.key(),
            scope: self.scope.clone(),
            generation: self.generation,
            cancel: self.cancel.clone(),
            wake: self.wake.clone(),
        }
    }

    pub(crate) fn enqueue(&mut self, item: Outbound) {
        self.queue.push_back(item);
        self.wake.notify_one();
    }
}

/// Returned by `subscribe`. Dropping it does not unsubscribe.
pub struct SubscriptionHandle {
    shared: Weak<Shared>,
    scope: Scope,
    listener: u64,
    done: AtomicBool,
}

impl SubscriptionHandle {
    pub(crate) fn new(shared: Weak<Shared>, scope: Scope, listener: u64) -> Self {
        Self {
            shared,
            scope,
            listener,
            done: AtomicBool::new(false),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Remove this callback. The socket is closed once no callback is left.
    /// Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            shared.remove_listener(&self.scope, self.listener);
        }
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("scope", &self.scope)
            .field("listener", &self.listener)
            .finish()
    }
}

/// Everything a driver task needs to find its row again.
pub(crate) struct Driver {
    key: String,
    scope: Scope,
    generation: u64,
    cancel: CancellationToken,
    wake: Arc<Notify>,
}

enum Exit {
    Cancelled,
    Closed { code: u16, reason: String },
}

enum Step {
    Cancelled,
    Frame(Option<Frame>),
    Flush,
}

pub(crate) enum Backoff {
    Stop,
    GiveUp,
    Retry { delay: Duration, attempt: u32 },
}

impl Driver {
    /// Connect, pump, and reconnect until cancelled or out of attempts.
    pub(crate) async fn run(self, shared: Arc<Shared>) {
        let url = shared.socket_url(&self.scope);
        loop {
            if !shared.update_entry(&self.key, self.generation, |e| {
                e.state = SubscriptionState::Connecting
            }) {
                return;
            }
            tracing::debug!("Connecting {} to {}", self.scope, url);

            let connected = tokio::select! {
                _ = self.cancel.cancelled() => return,
                result = shared.connector.connect(&url) => result,
            };

            let (code, reason) = match connected {
                Ok(mut socket) => match self.pump(&shared, socket.as_mut()).await {
                    Exit::Cancelled => {
                        socket.close(NORMAL_CLOSE, "Client disconnect").await;
                        tracing::debug!("Closed socket for {}", self.scope);
                        return;
                    }
                    Exit::Closed { code, reason } => (code, reason),
                },
                Err(e) => {
                    tracing::warn!("WebSocket connect failed for {}: {}", self.scope, e);
                    shared.bus.emit(&ClientEvent::SocketError {
                        scope: self.scope.clone(),
                        message: e.to_string(),
                    });
                    (ABNORMAL_CLOSE, e.to_string())
                }
            };

            if code == NORMAL_CLOSE {
                tracing::info!("WebSocket for {} closed normally", self.scope);
                shared.update_entry(&self.key, self.generation, |e| {
                    e.state = SubscriptionState::Closed;
                    e.queue.clear();
                });
                shared.bus.emit(&ClientEvent::SocketDisconnected {
                    scope: self.scope.clone(),
                    code,
                    reason,
                });
                return;
            }

            tracing::warn!(
                "WebSocket for {} closed abnormally (code {}): {}",
                self.scope,
                code,
                reason
            );
            shared.notify_listeners(
                &self.key,
                self.generation,
                &PushUpdate::connection_lost(code, &reason),
            );
            shared.bus.emit(&ClientEvent::SocketDisconnected {
                scope: self.scope.clone(),
                code,
                reason,
            });

            match shared.plan_reconnect(&self.key, self.generation) {
                Backoff::Stop => return,
                Backoff::GiveUp => {
                    tracing::error!("Max reconnection attempts reached for {}", self.scope);
                    shared.bus.emit(&ClientEvent::ReconnectFailed {
                        scope: self.scope.clone(),
                    });
                    return;
                }
                Backoff::Retry { delay, attempt } => {
                    tracing::info!(
                        "Reconnecting {} in {:?} (attempt {})",
                        self.scope,
                        delay,
                        attempt
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    async fn pump(&self, shared: &Shared, socket: &mut dyn Socket) -> Exit {
        if !shared.update_entry(&self.key, self.generation, |e| {
            e.state = SubscriptionState::Open;
            e.attempts = 0;
            // heartbeats queued before open are stale
            e.queue.retain(|item| matches!(item, Outbound::Payload(_)));
        }) {
            return Exit::Cancelled;
        }

        if let Err(e) = self.flush(shared, socket).await {
            return Exit::Closed {
                code: ABNORMAL_CLOSE,
                reason: e.to_string(),
            };
        }
        if let Err(e) = socket.send(Outbound::Heartbeat.into_text()).await {
            return Exit::Closed {
                code: ABNORMAL_CLOSE,
                reason: e.to_string(),
            };
        }
        shared.mark_connected();
        tracing::info!("WebSocket connected for {}", self.scope);
        shared.bus.emit(&ClientEvent::SocketConnected {
            scope: self.scope.clone(),
        });

        loop {
            let step = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Step::Cancelled,
                frame = socket.recv() => Step::Frame(frame),
                _ = self.wake.notified() => Step::Flush,
            };
            match step {
                Step::Cancelled => return Exit::Cancelled,
                Step::Frame(Some(Frame::Text(text))) => {
                    shared.dispatch(&self.key, self.generation, &self.scope, &text)
                }
                Step::Frame(Some(Frame::Close { code, reason })) => {
                    return Exit::Closed { code, reason }
                }
                Step::Frame(None) => {
                    return Exit::Closed {
                        code: ABNORMAL_CLOSE,
                        reason: "connection lost".into(),
                    }
                }
                Step::Flush => {
                    if let Err(e) = self.flush(shared, socket).await {
                        return Exit::Closed {
                            code: ABNORMAL_CLOSE,
                            reason: e.to_string(),
                        };
                    }
                }
            }
        }
    }

    /// Send queued items in FIFO order. A payload that fails to send goes
    /// back to the head of the queue.
    async fn flush(&self, shared: &Shared, socket: &mut dyn Socket) -> Result<(), DojoError> {
        let mut sent = 0usize;
        while let Some(item) = shared.pop_outbound(&self.key, self.generation) {
            let requeue = matches!(item, Outbound::Payload(_)).then(|| item.clone());
            if let Err(e) = socket.send(item.into_text()).await {
                if let Some(item) = requeue {
                    shared.update_entry(&self.key, self.generation, |entry| {
                        entry.queue.push_front(item)
                    });
                }
                return Err(e);
            }
            sent += 1;
        }
        if sent > 0 {
            tracing::debug!("Flushed {} queued frame(s) for {}", sent, self.scope);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scope_keys() {
        assert_eq!(Scope::Session("abc".into()).key(), "sessions/abc");
        assert_eq!(Scope::Providers.key(), "providers");
        assert_eq!(Scope::Tools.to_string(), "tools");
    }

    #[test]
    fn test_reconnect_delay_doubles() {
        let base = Duration::from_millis(1000);
        let delays: Vec<u64> = (0..5)
            .map(|n| reconnect_delay(base, n).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000]);
    }

    #[test]
    fn test_reconnect_delay_saturates() {
        let d = reconnect_delay(Duration::from_secs(1), 200);
        assert!(d >= Duration::from_secs(u32::MAX as u64));
    }

    #[test]
    fn test_scope_event_mapping() {
        let update = PushUpdate::heartbeat();
        match Scope::Session("s1".into()).event_for(update.clone()) {
            ClientEvent::SessionUpdate { session_id, .. } => assert_eq!(session_id, "s1"),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(
            Scope::Tools.event_for(update),
            ClientEvent::ToolExecutionUpdate { .. }
        ));
    }

    #[test]
    fn test_restart_resets_row() {
        let mut entry = Entry::new(Scope::Providers, 1);
        let old = entry.cancel.clone();
        entry.state = SubscriptionState::Failed;
        entry.attempts = 5;
        let driver = entry.restart(7);
        assert!(old.is_cancelled());
        assert_eq!(entry.state, SubscriptionState::Connecting);
        assert_eq!(entry.attempts, 0);
        assert_eq!(driver.generation, 7);
        assert_eq!(driver.key, "providers");
    }

    #[test]
    fn test_state_predicates() {
        assert!(SubscriptionState::Open.is_live());
        assert!(!SubscriptionState::Reconnecting { attempt: 1 }.is_live());
        assert!(SubscriptionState::Failed.is_stopped());
        assert!(!SubscriptionState::Connecting.is_stopped());
    }
}
