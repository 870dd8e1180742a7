//! Holder of the active sync task and the dialog-bound task

use crate::sync::task::{DialogBoundTask, SyncTaskHandle, TaskId};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct Slots {
    current: Option<Arc<SyncTaskHandle>>,
    dialog: Option<Arc<dyn DialogBoundTask>>,
}

/// Registry of background work.
///
/// Both slots sit behind one mutex, so a connectivity-loss cancellation, a
/// user cancel and a worker's completion clear are always serialized.
#[derive(Default)]
pub struct TaskRegistry {
    slots: Mutex<Slots>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a handle, returning the one it replaced. The replaced handle is
    /// not cancelled.
    pub fn set(&self, task: Arc<SyncTaskHandle>) -> Option<Arc<SyncTaskHandle>> {
        self.slots.lock().current.replace(task)
    }

    pub fn get(&self) -> Option<Arc<SyncTaskHandle>> {
        self.slots.lock().current.clone()
    }

    pub fn is_occupied(&self) -> bool {
        self.slots.lock().current.is_some()
    }

    pub fn clear(&self) {
        if let Some(task) = self.slots.lock().current.take() {
            tracing::debug!("Cleared sync task {}", task.id());
        }
    }

    /// Remove and return the current handle in one step
    pub fn take(&self) -> Option<Arc<SyncTaskHandle>> {
        self.slots.lock().current.take()
    }

    /// Clear the slot only if it still holds `id`. Returns whether it did.
    pub fn clear_if(&self, id: TaskId) -> bool {
        let mut slots = self.slots.lock();
        match &slots.current {
            Some(task) if task.id() == id => {
                slots.current = None;
                true
            }
            _ => false,
        }
    }

    /// Register the handle produced by `create` if the slot is empty.
    ///
    /// Returns `Ok(new)` when registered, or `Err(existing)` when a sync is
    /// already running; `create` is not called in that case.
    pub fn try_start<F>(&self, create: F) -> Result<Arc<SyncTaskHandle>, Arc<SyncTaskHandle>>
    where
        F: FnOnce() -> Arc<SyncTaskHandle>,
    {
        self.start(create, false)
    }

    /// Like [`TaskRegistry::try_start`], and also binds the new handle as
    /// the dialog task before the lock is released.
    pub fn try_start_with_dialog<F>(&self, create: F) -> Result<Arc<SyncTaskHandle>, Arc<SyncTaskHandle>>
    where
        F: FnOnce() -> Arc<SyncTaskHandle>,
    {
        self.start(create, true)
    }

    fn start<F>(&self, create: F, bind_dialog: bool) -> Result<Arc<SyncTaskHandle>, Arc<SyncTaskHandle>>
    where
        F: FnOnce() -> Arc<SyncTaskHandle>,
    {
        let mut slots = self.slots.lock();
        if let Some(existing) = &slots.current {
            return Err(existing.clone());
        }
        let task = create();
        slots.current = Some(task.clone());
        if bind_dialog {
            slots.dialog = Some(task.clone());
        }
        Ok(task)
    }

    pub fn set_dialog(&self, task: Arc<dyn DialogBoundTask>) -> Option<Arc<dyn DialogBoundTask>> {
        self.slots.lock().dialog.replace(task)
    }

    pub fn dialog(&self) -> Option<Arc<dyn DialogBoundTask>> {
        self.slots.lock().dialog.clone()
    }

    /// Bind `task` unless an uncancelled dialog task is already bound.
    /// Returns the id of the one in the way.
    pub fn try_bind_dialog(&self, task: Arc<dyn DialogBoundTask>) -> Result<(), TaskId> {
        let mut slots = self.slots.lock();
        if let Some(existing) = slots.dialog.as_ref().filter(|d| !d.is_cancelled()) {
            return Err(existing.id());
        }
        slots.dialog = Some(task);
        Ok(())
    }

    pub fn take_dialog(&self) -> Option<Arc<dyn DialogBoundTask>> {
        self.slots.lock().dialog.take()
    }

    pub fn clear_dialog_if(&self, id: TaskId) -> bool {
        let mut slots = self.slots.lock();
        match &slots.dialog {
            Some(task) if task.id() == id => {
                slots.dialog = None;
                true
            }
            _ => false,
        }
    }

    /// Take the dialog task if it is still active and, if it is the
    /// registered sync task, clear that slot too. Both happen under the same
    /// lock. A cancelled dialog task is dropped from the slot and `None` is
    /// returned.
    pub fn take_dialog_with_sync(&self) -> Option<(Arc<dyn DialogBoundTask>, bool)> {
        let mut slots = self.slots.lock();
        let dialog = slots.dialog.take()?;
        if dialog.is_cancelled() {
            return None;
        }
        let same = matches!(&slots.current, Some(task) if task.id() == dialog.id());
        if same {
            slots.current = None;
        }
        Some((dialog, same))
    }
}
