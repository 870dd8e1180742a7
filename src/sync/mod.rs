//! Background synchronization: task handles, the task registry and the worker

pub mod job;
pub mod registry;
pub mod task;

pub use job::{spawn_sync, PendingRecordsJob, RecordUploader, SyncJob, SyncJobFactory};
pub use registry::TaskRegistry;
pub use task::{DialogBoundTask, DialogTask, ShellId, SyncTaskHandle, TaskId};

use thiserror::Error;

/// Sync-related errors
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Another blocking operation is running: {0}")]
    Busy(TaskId),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        SyncError::Unknown(err.to_string())
    }
}

/// Events emitted by a running sync worker
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Worker picked up the task
    Started { task_id: TaskId, total: usize },
    /// One step finished
    Progress {
        task_id: TaskId,
        completed: usize,
        total: usize,
    },
    /// All steps finished
    Completed { task_id: TaskId },
    /// Worker observed cancellation and stopped between steps
    Cancelled { task_id: TaskId, completed: usize },
    /// A step failed; the worker stopped
    Failed { task_id: TaskId, error: String },
}

impl SyncEvent {
    pub fn task_id(&self) -> TaskId {
        match self {
            Self::Started { task_id, .. }
            | Self::Progress { task_id, .. }
            | Self::Completed { task_id }
            | Self::Cancelled { task_id, .. }
            | Self::Failed { task_id, .. } => *task_id,
        }
    }

    /// Whether the worker has exited after this event
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Cancelled { .. } | Self::Failed { .. }
        )
    }
}
