//! Sync worker: runs a job step by step until done or cancelled

use crate::sync::registry::TaskRegistry;
use crate::sync::task::SyncTaskHandle;
use crate::sync::{SyncError, SyncEvent};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

/// A unit of synchronization work split into steps.
///
/// The worker checks for cancellation between steps only, so a step that
/// has started always runs to completion.
pub trait SyncJob: Send + 'static {
    fn total_steps(&self) -> usize;

    fn run_step(&mut self, index: usize) -> BoxFuture<'_, Result<(), SyncError>>;

    /// Pause after each step. Cancellation ends it early.
    fn pause(&self) -> Duration {
        Duration::ZERO
    }
}

/// Builds a fresh job for each "sync all" request
pub trait SyncJobFactory: Send + Sync {
    fn create(&self) -> Box<dyn SyncJob>;
}

impl<F> SyncJobFactory for F
where
    F: Fn() -> Box<dyn SyncJob> + Send + Sync,
{
    fn create(&self) -> Box<dyn SyncJob> {
        self()
    }
}

/// Transport for a single record. The wire format lives behind this.
pub trait RecordUploader: Send + Sync {
    fn upload<'a>(&'a self, record_id: &'a str) -> BoxFuture<'a, Result<(), SyncError>>;
}

/// Uploads each pending record as one step
pub struct PendingRecordsJob {
    records: Vec<String>,
    uploader: Arc<dyn RecordUploader>,
    step_delay: Duration,
}

impl PendingRecordsJob {
    pub fn new(records: Vec<String>, uploader: Arc<dyn RecordUploader>) -> Self {
        Self {
            records,
            uploader,
            step_delay: Duration::ZERO,
        }
    }

    /// Pause between records
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }
}

impl SyncJob for PendingRecordsJob {
    fn total_steps(&self) -> usize {
        self.records.len()
    }

    fn run_step(&mut self, index: usize) -> BoxFuture<'_, Result<(), SyncError>> {
        Box::pin(async move {
            let record_id = self
                .records
                .get(index)
                .ok_or_else(|| SyncError::Unknown(format!("No record at step {}", index)))?;

            tracing::debug!("Uploading record {}", record_id);
            self.uploader.upload(record_id).await
        })
    }

    fn pause(&self) -> Duration {
        self.step_delay
    }
}

/// Run `job` for `task` on `runtime`.
///
/// On exit the worker clears the registry slot only if it still holds this
/// task; it never registers anything itself.
pub fn spawn_sync(
    runtime: &Handle,
    registry: Arc<TaskRegistry>,
    task: Arc<SyncTaskHandle>,
    mut job: Box<dyn SyncJob>,
    events: mpsc::UnboundedSender<SyncEvent>,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        let task_id = task.id();
        let total = job.total_steps();
        events.send(SyncEvent::Started { task_id, total }).ok();
        tracing::info!("Sync task {} started with {} steps", task_id, total);

        let mut completed = 0;
        let outcome = loop {
            if task.is_cancelled() {
                break SyncEvent::Cancelled { task_id, completed };
            }
            if completed == total {
                break SyncEvent::Completed { task_id };
            }

            match job.run_step(completed).await {
                Ok(()) => {
                    completed += 1;
                    events
                        .send(SyncEvent::Progress {
                            task_id,
                            completed,
                            total,
                        })
                        .ok();

                    let pause = job.pause();
                    if completed < total && !pause.is_zero() {
                        tokio::select! {
                            _ = sleep(pause) => {}
                            _ = task.cancelled() => {}
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Sync task {} failed at step {}: {}", task_id, completed, e);
                    break SyncEvent::Failed {
                        task_id,
                        error: e.to_string(),
                    };
                }
            }
        };

        registry.clear_if(task_id);
        registry.clear_dialog_if(task_id);

        match &outcome {
            SyncEvent::Completed { .. } => tracing::info!("Sync task {} completed", task_id),
            SyncEvent::Cancelled { completed, .. } => {
                tracing::info!("Sync task {} stopped after {} of {} steps", task_id, completed, total)
            }
            _ => {}
        }
        events.send(outcome).ok();
    })
}
