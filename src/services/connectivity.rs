//! Network connectivity notifications

use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::sync::mpsc;

/// Key under which the platform puts the network info object
pub const EXTRA_NETWORK_INFO: &str = "networkInfo";

/// Normalized connectivity change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityEvent {
    pub is_connected: bool,
}

/// Raw notification as delivered by the platform
#[derive(Debug, Clone, Default)]
pub struct NotificationPayload {
    extras: Map<String, Value>,
}

impl NotificationPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_extras(extras: Map<String, Value>) -> Self {
        Self { extras }
    }

    /// Payload carrying a network info object
    pub fn network_change(is_connected: bool) -> Self {
        let mut extras = Map::new();
        extras.insert(
            EXTRA_NETWORK_INFO.to_string(),
            serde_json::json!({ "isConnected": is_connected }),
        );
        Self { extras }
    }

    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extras.insert(key.to_string(), value);
        self
    }

    /// Typed lookup of a nested extra
    pub fn extra<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<T, PayloadError> {
        let value = self
            .extras
            .get(key)
            .ok_or_else(|| PayloadError::MissingExtra(key.to_string()))?;
        T::deserialize(value).map_err(|e| PayloadError::Malformed(e.to_string()))
    }
}

/// Network info object inside a notification
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub is_connected: bool,
    #[serde(default)]
    pub type_name: Option<String>,
}

/// Connectivity decoding errors
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Missing extra: {0}")]
    MissingExtra(String),

    #[error("Malformed network info: {0}")]
    Malformed(String),
}

/// Decode a notification into an event
pub fn decode(payload: &NotificationPayload) -> Result<ConnectivityEvent, PayloadError> {
    let info: NetworkInfo = payload.extra(EXTRA_NETWORK_INFO)?;
    Ok(ConnectivityEvent {
        is_connected: info.is_connected,
    })
}

/// Receives connectivity events
pub trait ConnectivityListener: Send + Sync {
    fn on_connectivity_changed(&self, event: ConnectivityEvent);
}

type Listeners = Mutex<Vec<(u64, Arc<dyn ConnectivityListener>)>>;

/// Fans decoded connectivity events out to subscribed listeners
pub struct ConnectivityMonitor {
    listeners: Arc<Listeners>,
    next_id: AtomicU64,
    last_known: RwLock<Option<ConnectivityEvent>>,
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
            last_known: RwLock::new(None),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register `listener` until the returned subscription is dropped
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe(&self, listener: Arc<dyn ConnectivityListener>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().push((id, listener));
        tracing::debug!("Connectivity listener {} registered", id);

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn last_known(&self) -> Option<ConnectivityEvent> {
        *self.last_known.read()
    }

    /// Decode and deliver one notification.
    ///
    /// A payload that cannot be decoded is logged and treated as "connected",
    /// which every listener handles as a no-op.
    pub fn deliver(&self, payload: &NotificationPayload) -> ConnectivityEvent {
        let event = decode(payload).unwrap_or_else(|e| {
            tracing::warn!("Ignoring connectivity notification: {}", e);
            ConnectivityEvent { is_connected: true }
        });

        tracing::debug!("Connectivity changed: connected={}", event.is_connected);
        *self.last_known.write() = Some(event);

        // Snapshot so listeners can subscribe/unsubscribe from the callback
        let listeners: Vec<_> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener.on_connectivity_changed(event);
        }
        event
    }

    /// Deliver notifications from `rx` in order until shutdown or until
    /// every sender is gone.
    pub async fn run(
        self: Arc<Self>,
        mut rx: mpsc::UnboundedReceiver<NotificationPayload>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                payload = rx.recv() => {
                    match payload {
                        Some(payload) => {
                            self.deliver(&payload);
                        }
                        None => {
                            tracing::debug!("Connectivity channel closed");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Connectivity monitor shutting down");
                    break;
                }
            }
        }
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration handle. Unregisters on drop.
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().retain(|(id, _)| *id != self.id);
            tracing::debug!("Connectivity listener {} unregistered", self.id);
        }
    }
}
