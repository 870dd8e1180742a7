//! Main application shell state and logic

use crate::services::connectivity::{ConnectivityMonitor, Subscription};
use crate::services::coordinator::{ActionOutcome, LogoutOutcome, SyncLifecycleCoordinator};
use crate::sync::SyncEvent;
use crate::ui::{MenuAction, OptionsMenu, Shell, ShellHandle};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Lifecycle of one shell instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellState {
    Active,
    Finishing,
    Destroyed,
}

/// Progress of the running sync as last reported by the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncProgress {
    pub completed: usize,
    pub total: usize,
}

/// One screen instance. Rotation or restart replaces it with a new one
/// through [`FieldApp::recreate`]; the session and any running sync stay.
pub struct FieldApp {
    shell: Arc<ShellHandle>,
    coordinator: Arc<SyncLifecycleCoordinator>,
    subscription: Option<Subscription>,
    event_rx: Option<mpsc::UnboundedReceiver<SyncEvent>>,
    menu: OptionsMenu,
    menu_visible: bool,
    progress: Option<SyncProgress>,
    error_message: Option<String>,
}

impl FieldApp {
    /// Create a shell and register it for connectivity changes
    pub fn create(coordinator: Arc<SyncLifecycleCoordinator>, monitor: &ConnectivityMonitor) -> Self {
        let event_rx = coordinator.take_events();
        Self::attach(coordinator, monitor, event_rx)
    }

    fn attach(
        coordinator: Arc<SyncLifecycleCoordinator>,
        monitor: &ConnectivityMonitor,
        event_rx: Option<mpsc::UnboundedReceiver<SyncEvent>>,
    ) -> Self {
        let subscription = monitor.subscribe(coordinator.clone());

        let mut app = Self {
            shell: Arc::new(ShellHandle::new()),
            coordinator,
            subscription: Some(subscription),
            event_rx,
            menu: OptionsMenu::new(),
            menu_visible: false,
            progress: None,
            error_message: None,
        };
        tracing::debug!("Shell {} created", app.shell.shell_id());

        app.on_create_options_menu();
        app
    }

    /// Tear this shell down and build its replacement
    pub fn recreate(mut self, monitor: &ConnectivityMonitor) -> Self {
        let event_rx = self.event_rx.take();
        let coordinator = self.coordinator.clone();
        self.destroy();

        let mut app = Self::attach(coordinator, monitor, event_rx);
        app.process_events();
        app
    }

    /// Unregister from connectivity changes
    pub fn destroy(&mut self) {
        if self.subscription.take().is_some() {
            tracing::debug!("Shell {} destroyed", self.shell.shell_id());
        }
    }

    /// (Re)build the options menu. Returns whether it is shown.
    pub fn on_create_options_menu(&mut self) -> bool {
        self.menu_visible = self
            .coordinator
            .on_menu_build(self.shell.as_ref(), &mut self.menu);
        self.menu_visible
    }

    pub fn on_options_item_selected(&mut self, action: MenuAction) -> ActionOutcome {
        let outcome = self.coordinator.on_menu_action(self.shell.as_ref(), action);
        if outcome.changes_menu() {
            self.on_create_options_menu();
        }
        outcome
    }

    /// Logout after the "sync in progress" prompt was accepted
    pub fn confirm_logout(&mut self) -> LogoutOutcome {
        let outcome = self.coordinator.confirm_logout(self.shell.as_ref());
        self.on_create_options_menu();
        outcome
    }

    /// Drain worker events and refresh the menu when a sync ends
    pub fn process_events(&mut self) {
        let mut events: Vec<SyncEvent> = Vec::new();
        if let Some(rx) = self.event_rx.as_mut() {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }

        for event in events {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Started { total, .. } => {
                self.clear_error();
                self.progress = Some(SyncProgress { completed: 0, total });
            }
            SyncEvent::Progress { completed, total, .. } => {
                self.progress = Some(SyncProgress { completed, total });
            }
            SyncEvent::Completed { .. } | SyncEvent::Cancelled { .. } => {
                self.progress = None;
                self.on_create_options_menu();
            }
            SyncEvent::Failed { error, .. } => {
                tracing::error!("Sync failed: {}", error);
                self.progress = None;
                self.error_message = Some(error);
                self.on_create_options_menu();
            }
        }
    }

    pub fn state(&self) -> ShellState {
        if self.subscription.is_none() {
            ShellState::Destroyed
        } else if self.shell.is_finishing() {
            ShellState::Finishing
        } else {
            ShellState::Active
        }
    }

    pub fn is_finishing(&self) -> bool {
        self.shell.is_finishing()
    }

    pub fn shell(&self) -> &Arc<ShellHandle> {
        &self.shell
    }

    pub fn menu(&self) -> &OptionsMenu {
        &self.menu
    }

    pub fn is_menu_visible(&self) -> bool {
        self.menu_visible
    }

    pub fn progress(&self) -> Option<SyncProgress> {
        self.progress
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }
}

impl Drop for FieldApp {
    fn drop(&mut self) {
        self.destroy();
    }
}
