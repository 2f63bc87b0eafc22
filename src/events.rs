// src/events.rs - In-process publish/subscribe bus
//
// Transport-independent fan-out of client notifications. Listeners are keyed
// by EventKind and run in registration order; a panicking listener is logged
// and the remaining listeners still run.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::models::ToolExecutionRequest;
use crate::realtime::{ConnectionStatus, PushUpdate, Scope};
use crate::util::{call_guarded, lock};

/// Everything the client announces on the bus.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    ConnectionStatusChanged {
        status: ConnectionStatus,
    },
    SocketConnected {
        scope: Scope,
    },
    SocketDisconnected {
        scope: Scope,
        code: u16,
        reason: String,
    },
    SocketError {
        scope: Scope,
        message: String,
    },
    ParseError {
        scope: Scope,
        message: String,
    },
    SessionUpdate {
        session_id: String,
        update: PushUpdate,
    },
    ProviderUpdate {
        update: PushUpdate,
    },
    ToolExecutionUpdate {
        update: PushUpdate,
    },
    /// Backoff budget exhausted; the subscription stays failed until `reconnect()`.
    ReconnectFailed {
        scope: Scope,
    },
    ToolApprovalRequired {
        request: ToolExecutionRequest,
        reason: Option<String>,
    },
    ToolExecutionLogged {
        tool_id: String,
        session_id: Option<String>,
        success: bool,
        execution_time: u64,
        error: Option<String>,
    },
    ClientDisconnected {
        timestamp: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    ConnectionStatusChanged,
    SocketConnected,
    SocketDisconnected,
    SocketError,
    ParseError,
    SessionUpdate,
    ProviderUpdate,
    ToolExecutionUpdate,
    ReconnectFailed,
    ToolApprovalRequired,
    ToolExecutionLogged,
    ClientDisconnected,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionStatusChanged => "connection_status_change",
            Self::SocketConnected => "websocket_connected",
            Self::SocketDisconnected => "websocket_disconnected",
            Self::SocketError => "websocket_error",
            Self::ParseError => "websocket_parse_error",
            Self::SessionUpdate => "session_update",
            Self::ProviderUpdate => "provider_update",
            Self::ToolExecutionUpdate => "tool_execution_update",
            Self::ReconnectFailed => "websocket_reconnect_failed",
            Self::ToolApprovalRequired => "tool_approval_required",
            Self::ToolExecutionLogged => "tool_execution_logged",
            Self::ClientDisconnected => "client_disconnected",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ClientEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ConnectionStatusChanged { .. } => EventKind::ConnectionStatusChanged,
            Self::SocketConnected { .. } => EventKind::SocketConnected,
            Self::SocketDisconnected { .. } => EventKind::SocketDisconnected,
            Self::SocketError { .. } => EventKind::SocketError,
            Self::ParseError { .. } => EventKind::ParseError,
            Self::SessionUpdate { .. } => EventKind::SessionUpdate,
            Self::ProviderUpdate { .. } => EventKind::ProviderUpdate,
            Self::ToolExecutionUpdate { .. } => EventKind::ToolExecutionUpdate,
            Self::ReconnectFailed { .. } => EventKind::ReconnectFailed,
            Self::ToolApprovalRequired { .. } => EventKind::ToolApprovalRequired,
            Self::ToolExecutionLogged { .. } => EventKind::ToolExecutionLogged,
            Self::ClientDisconnected { .. } => EventKind::ClientDisconnected,
        }
    }
}

/// Handle returned by `on`/`once`, used to remove that one listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type EventCallback = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

struct Listener {
    id: ListenerId,
    once: bool,
    callback: EventCallback,
}

#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<BTreeMap<EventKind, Vec<Listener>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.register(kind, false, Arc::new(callback))
    }

    /// Like `on`, but the listener is dropped after its first delivery.
    pub fn once<F>(&self, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.register(kind, true, Arc::new(callback))
    }

    fn register(&self, kind: EventKind, once: bool, callback: EventCallback) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners)
            .entry(kind)
            .or_default()
            .push(Listener { id, once, callback });
        id
    }

    /// Remove one listener, or every listener of `kind` when `id` is `None`.
    /// Returns whether anything was removed.
    pub fn off(&self, kind: EventKind, id: Option<ListenerId>) -> bool {
        let mut map = lock(&self.listeners);
        match id {
            None => map.remove(&kind).is_some(),
            Some(id) => {
                let Some(list) = map.get_mut(&kind) else {
                    return false;
                };
                let before = list.len();
                list.retain(|l| l.id != id);
                let removed = list.len() != before;
                if list.is_empty() {
                    map.remove(&kind);
                }
                removed
            }
        }
    }

    /// Deliver `event` to every listener of its kind. Returns how many ran
    /// to completion.
    pub fn emit(&self, event: &ClientEvent) -> usize {
        let kind = event.kind();
        // Snapshot under the lock, call outside it: listeners may re-enter the bus.
        let callbacks: Vec<EventCallback> = {
            let mut map = lock(&self.listeners);
            let Some(list) = map.get_mut(&kind) else {
                return 0;
            };
            let snapshot = list.iter().map(|l| l.callback.clone()).collect();
            list.retain(|l| !l.once);
            if list.is_empty() {
                map.remove(&kind);
            }
            snapshot
        };

        callbacks
            .iter()
            .filter(|cb| call_guarded(kind.as_str(), || cb(event)))
            .count()
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        lock(&self.listeners).get(&kind).map_or(0, Vec::len)
    }

    /// Kinds that currently have at least one listener.
    pub fn event_kinds(&self) -> Vec<EventKind> {
        lock(&self.listeners).keys().copied().collect()
    }

    pub fn clear(&self) {
        lock(&self.listeners).clear();
    }
}
