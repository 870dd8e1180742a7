//! Shell-facing types: the options menu and the shell handle

pub mod menu;

pub use menu::{MenuAction, MenuItem, MenuState, OptionsMenu, CANCEL_SYNC_INDEX, SYNC_ALL_INDEX};

use crate::sync::ShellId;
use std::sync::atomic::{AtomicBool, Ordering};

/// What the coordinator needs from a screen
pub trait Shell: Send + Sync {
    fn shell_id(&self) -> ShellId;

    /// Close the screen
    fn finish(&self);
}

/// Identity and lifecycle flag of one shell instance
#[derive(Debug, Default)]
pub struct ShellHandle {
    id: ShellId,
    finishing: AtomicBool,
}

impl ShellHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finishing(&self) -> bool {
        self.finishing.load(Ordering::SeqCst)
    }
}

impl Shell for ShellHandle {
    fn shell_id(&self) -> ShellId {
        self.id
    }

    fn finish(&self) {
        if !self.finishing.swap(true, Ordering::SeqCst) {
            tracing::info!("Shell {} finishing", self.id);
        }
    }
}
