//! Background services and utilities

pub mod connectivity;
pub mod coordinator;
pub mod notifications;

pub use connectivity::{ConnectivityEvent, ConnectivityMonitor, NotificationPayload, Subscription};
pub use coordinator::{ActionOutcome, LogoutOutcome, SyncLifecycleCoordinator};
pub use notifications::{DesktopNotifier, MemoryNotifier, UserNotifier};

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Service manager for background tasks
pub struct ServiceManager {
    /// Shutdown signal sender
    shutdown_tx: mpsc::Sender<()>,

    /// Shutdown signal receiver
    shutdown_rx: Option<mpsc::Receiver<()>>,

    /// Platform side of the connectivity channel
    connectivity_tx: mpsc::UnboundedSender<NotificationPayload>,

    connectivity_rx: Option<mpsc::UnboundedReceiver<NotificationPayload>>,

    connectivity_task: Option<JoinHandle<()>>,
}

impl ServiceManager {
    /// Create a new service manager
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (connectivity_tx, connectivity_rx) = mpsc::unbounded_channel();
        Self {
            shutdown_tx,
            shutdown_rx: Some(shutdown_rx),
            connectivity_tx,
            connectivity_rx: Some(connectivity_rx),
            connectivity_task: None,
        }
    }

    /// Start delivering connectivity notifications to `monitor`
    pub fn start(&mut self, monitor: Arc<ConnectivityMonitor>) -> anyhow::Result<()> {
        let (Some(rx), Some(shutdown_rx)) = (self.connectivity_rx.take(), self.shutdown_rx.take())
        else {
            return Err(anyhow::anyhow!("Services already started"));
        };

        tracing::info!("Starting background services...");
        self.connectivity_task = Some(tokio::spawn(monitor.run(rx, shutdown_rx)));

        Ok(())
    }

    /// Where the platform posts raw connectivity notifications
    pub fn connectivity_sender(&self) -> mpsc::UnboundedSender<NotificationPayload> {
        self.connectivity_tx.clone()
    }

    /// Shutdown all services
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        tracing::info!("Shutting down background services...");

        // Send shutdown signal
        let _ = self.shutdown_tx.send(()).await;

        if let Some(task) = self.connectivity_task.take() {
            task.await?;
        }

        Ok(())
    }
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}
