//! Notification service

use crate::settings::NotificationSettings;
use notify_rust::{Notification, Timeout};
use parking_lot::Mutex;

/// Message shown when the network drops during a blocking operation
pub const NETWORK_DOWN: &str = "Network connection lost. The operation was cancelled.";

/// Prompt shown when logging out while a sync is running
pub const SYNC_IN_PROGRESS: &str = "Sync is in progress. Confirm logout to cancel it.";

/// Short-lived, user-visible messages
pub trait UserNotifier: Send + Sync {
    fn toast(&self, message: &str);
}

/// Desktop notifications through the platform notification daemon
pub struct DesktopNotifier {
    settings: NotificationSettings,
}

impl DesktopNotifier {
    pub fn new(settings: NotificationSettings) -> Self {
        Self { settings }
    }

    /// Hand `message` to the daemon. Returns `false` when notifications are
    /// switched off and nothing was sent.
    fn show(&self, message: &str) -> anyhow::Result<bool> {
        if !self.settings.enabled {
            return Ok(false);
        }

        Notification::new()
            .appname(&self.settings.app_name)
            .summary(&self.settings.app_name)
            .body(message)
            .timeout(Timeout::Milliseconds(self.settings.toast_timeout_ms))
            .show()?;

        Ok(true)
    }
}

impl UserNotifier for DesktopNotifier {
    fn toast(&self, message: &str) {
        match self.show(message) {
            Ok(true) => {}
            Ok(false) => tracing::debug!("Notifications disabled, dropping: {}", message),
            Err(e) => tracing::warn!("Failed to show notification: {}", e),
        }
    }
}

/// Keeps every message in memory. Used headless and in tests.
#[derive(Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn latest(&self) -> Option<String> {
        self.messages.lock().last().cloned()
    }

    pub fn count(&self, message: &str) -> usize {
        self.messages.lock().iter().filter(|m| m.as_str() == message).count()
    }
}

impl UserNotifier for MemoryNotifier {
    fn toast(&self, message: &str) {
        tracing::info!("Toast: {}", message);
        self.messages.lock().push(message.to_string());
    }
}
