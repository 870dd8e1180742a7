//! Task handles and cooperative cancellation

use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identifier of a background task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a shell instance. A recreated shell gets a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShellId(Uuid);

impl ShellId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ShellId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An operation bound to a blocking progress indicator
pub trait DialogBoundTask: Send + Sync {
    fn id(&self) -> TaskId;

    fn cancel(&self);

    fn is_cancelled(&self) -> bool;
}

/// Handle to a running sync. Shared between the registry and the worker.
#[derive(Debug)]
pub struct SyncTaskHandle {
    id: TaskId,
    token: CancellationToken,
    cancel_requested: AtomicBool,
    bound_context: RwLock<Option<ShellId>>,
}

impl SyncTaskHandle {
    pub fn new(context: Option<ShellId>) -> Self {
        Self {
            id: TaskId::new(),
            token: CancellationToken::new(),
            cancel_requested: AtomicBool::new(false),
            bound_context: RwLock::new(context),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Request cancellation.
    ///
    /// Cancellation is advisory: with `may_interrupt_if_running == false` the
    /// step in flight runs to completion and the worker stops before the next
    /// one. Interruption is not supported; `true` is logged and treated the
    /// same way. Returns `true` if this call performed the cancellation.
    pub fn cancel(&self, may_interrupt_if_running: bool) -> bool {
        if may_interrupt_if_running {
            tracing::debug!("Task {} cannot be interrupted, cancelling after current step", self.id);
        }
        let first = !self.cancel_requested.swap(true, Ordering::SeqCst);
        self.token.cancel();
        if first {
            tracing::info!("Sync task {} cancelled", self.id);
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the task is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn bound_context(&self) -> Option<ShellId> {
        *self.bound_context.read()
    }

    /// Point the task at the current shell. Returns `true` if the binding changed.
    pub fn set_context(&self, shell: ShellId) -> bool {
        let mut bound = self.bound_context.write();
        if *bound == Some(shell) {
            return false;
        }
        tracing::debug!("Rebinding sync task {} to shell {}", self.id, shell);
        *bound = Some(shell);
        true
    }
}

impl DialogBoundTask for SyncTaskHandle {
    fn id(&self) -> TaskId {
        self.id
    }

    fn cancel(&self) {
        SyncTaskHandle::cancel(self, false);
    }

    fn is_cancelled(&self) -> bool {
        SyncTaskHandle::is_cancelled(self)
    }
}

/// A standalone blocking operation (login, single record upload, ...)
#[derive(Debug)]
pub struct DialogTask {
    id: TaskId,
    label: String,
    token: CancellationToken,
}

impl DialogTask {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            label: label.into(),
            token: CancellationToken::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Resolves once the task is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl DialogBoundTask for DialogTask {
    fn id(&self) -> TaskId {
        self.id
    }

    fn cancel(&self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        tracing::info!("Dialog task '{}' cancelled", self.label);
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
