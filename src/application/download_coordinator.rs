use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{stream::BoxStream, StreamExt};
use tracing::{debug, error, info};

use super::backend::DownloadBackend;
use crate::domain::{AppError, DownloadTask, Phase};
use crate::utils::sanitize_filename;

/// Pause after each finished download before the next one is issued.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Default)]
struct RunFlags {
    running: AtomicBool,
    abort_requested: AtomicBool,
}

/// Owner of the "batch running / abort requested" state.
///
/// There is a single toggle: the first call starts a batch, any call while a
/// batch is running only asks it to stop at the next task boundary.
#[derive(Debug, Clone, Default)]
pub struct DownloadController {
    flags: Arc<RunFlags>,
}

pub enum Toggle {
    Started(RunGuard),
    AbortRequested,
}

/// Proof that a batch is running. Dropping it returns the controller to idle,
/// whatever way the batch ended.
#[derive(Debug)]
pub struct RunGuard {
    flags: Arc<RunFlags>,
}

impl RunGuard {
    pub fn abort_requested(&self) -> bool {
        self.flags.abort_requested.load(Ordering::SeqCst)
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.flags.abort_requested.store(false, Ordering::SeqCst);
        self.flags.running.store(false, Ordering::SeqCst);
    }
}

impl DownloadController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&self) -> Toggle {
        match self
            .flags
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {
                self.flags.abort_requested.store(false, Ordering::SeqCst);
                Toggle::Started(RunGuard {
                    flags: Arc::clone(&self.flags),
                })
            }
            Err(_) => {
                info!("Abort requested, stopping after the current document");
                self.flags.abort_requested.store(true, Ordering::SeqCst);
                Toggle::AbortRequested
            }
        }
    }

    pub fn phase(&self) -> Phase {
        if !self.flags.running.load(Ordering::SeqCst) {
            Phase::Idle
        } else if self.flags.abort_requested.load(Ordering::SeqCst) {
            Phase::Aborting
        } else {
            Phase::Running
        }
    }
}

#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Emitted right before document `processed` of `total` is started.
    Progress { processed: usize, total: usize },
    Finished(BatchOutcome),
}

#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Completed { total: usize },
    Aborted { processed: usize, total: usize },
    Failed { processed: usize, error: AppError },
}

#[derive(Clone)]
pub struct DownloadCoordinator {
    controller: DownloadController,
    backend: Arc<dyn DownloadBackend>,
    settle_delay: Duration,
}

impl DownloadCoordinator {
    pub fn new(backend: Arc<dyn DownloadBackend>, settle_delay: Duration) -> Self {
        Self {
            controller: DownloadController::new(),
            backend,
            settle_delay,
        }
    }

    pub fn controller(&self) -> &DownloadController {
        &self.controller
    }

    /// The batch as a stream of events, ending with exactly one `Finished`.
    ///
    /// The guard is released before `Finished` is yielded, or when the stream
    /// is dropped early.
    pub fn batch_stream(
        &self,
        guard: RunGuard,
        tasks: Vec<DownloadTask>,
    ) -> BoxStream<'static, BatchEvent> {
        info!(total = tasks.len(), "Starting batch download");

        let state = BatchState {
            guard: Some(guard),
            total: tasks.len(),
            tasks: tasks.into_iter(),
            pending: None,
            processed: 0,
            backend: Arc::clone(&self.backend),
            settle_delay: self.settle_delay,
        };

        futures::stream::unfold(state, BatchState::step).boxed()
    }
}

struct BatchState {
    guard: Option<RunGuard>,
    tasks: std::vec::IntoIter<DownloadTask>,
    pending: Option<DownloadTask>,
    processed: usize,
    total: usize,
    backend: Arc<dyn DownloadBackend>,
    settle_delay: Duration,
}

impl BatchState {
    async fn step(mut self) -> Option<(BatchEvent, BatchState)> {
        self.guard.as_ref()?;

        if let Some(task) = self.pending.take() {
            if let Err(error) = execute(self.backend.as_ref(), self.settle_delay, task).await {
                error!(processed = self.processed, %error, "Batch download failed");
                let outcome = BatchOutcome::Failed {
                    processed: self.processed,
                    error,
                };
                return Some(self.finish(outcome));
            }
        }

        let Some(task) = self.tasks.next() else {
            info!(total = self.total, "Batch download completed");
            let outcome = BatchOutcome::Completed { total: self.total };
            return Some(self.finish(outcome));
        };

        if self.abort_requested() {
            info!(
                processed = self.processed,
                total = self.total,
                "Batch download aborted"
            );
            let outcome = BatchOutcome::Aborted {
                processed: self.processed,
                total: self.total,
            };
            return Some(self.finish(outcome));
        }

        self.processed += 1;
        self.pending = Some(task);
        let event = BatchEvent::Progress {
            processed: self.processed,
            total: self.total,
        };
        Some((event, self))
    }

    fn abort_requested(&self) -> bool {
        self.guard.as_ref().is_some_and(RunGuard::abort_requested)
    }

    fn finish(mut self, outcome: BatchOutcome) -> (BatchEvent, BatchState) {
        self.guard = None;
        (BatchEvent::Finished(outcome), self)
    }
}

async fn execute(
    backend: &dyn DownloadBackend,
    settle_delay: Duration,
    task: DownloadTask,
) -> Result<(), AppError> {
    let filename = match task.filename {
        Some(name) => Some(name),
        None => lookup_filename(backend, &task.url).await,
    };

    debug!(url = %task.url, filename = ?filename, "Downloading document");
    backend.download(&task.url, filename.as_deref()).await?;

    if !settle_delay.is_zero() {
        tokio::time::sleep(settle_delay).await;
    }
    Ok(())
}

async fn lookup_filename(backend: &dyn DownloadBackend, url: &str) -> Option<String> {
    match backend.server_filename(url).await {
        Ok(Some(name)) => {
            let name = sanitize_filename(&name);
            (!name.is_empty()).then_some(name)
        }
        Ok(None) => {
            debug!(url, "No filename offered by server");
            None
        }
        Err(e) => {
            debug!(url, error = %e, "Filename lookup failed, using default name");
            None
        }
    }
}
