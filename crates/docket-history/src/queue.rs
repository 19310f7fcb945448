// Serialized commit execution
//
// Every commit against a backend goes through a `CommitScheduler`. The
// production scheduler, `CommitQueue`, runs one worker task that takes
// commit tasks off a channel in submission order and executes them one at a
// time. A failed task is reported to its caller only; the worker carries on.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use docket_error::{BackendError, CommitError};
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, debug_span, warn, Instrument};

use crate::backend::VersionBackend;
use crate::types::VersionId;

/// Outcome delivered to the submitter of a commit task
pub type CommitResult = Result<VersionId, CommitError>;

/// Future resolving once the task has been committed or has failed
pub type CommitFuture = BoxFuture<'static, CommitResult>;

/// A request to stage one path and create one version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitTask {
    pub path: PathBuf,
    pub message: String,
}

impl CommitTask {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Snapshot of a scheduler's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: u64,
    pub completed: u64,
    pub failed: u64,
}

impl QueueStats {
    /// Tasks submitted but not yet finished
    pub fn pending(&self) -> u64 {
        self.enqueued.saturating_sub(self.completed + self.failed)
    }
}

/// Executes commit tasks with at most one running at any time.
///
/// `enqueue` registers the task immediately; tasks finish in the order they
/// were enqueued. Dropping the returned future does not cancel the task.
pub trait CommitScheduler: Send + Sync {
    fn enqueue(&self, task: CommitTask) -> CommitFuture;

    fn stats(&self) -> QueueStats;
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> QueueStats {
        QueueStats {
            enqueued: self.enqueued.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

struct Job {
    id: u64,
    task: CommitTask,
    reply: oneshot::Sender<CommitResult>,
}

/// Single-worker FIFO commit queue
pub struct CommitQueue {
    sender: mpsc::UnboundedSender<Job>,
    counters: Arc<Counters>,
}

impl CommitQueue {
    /// Start a queue in front of `backend`.
    ///
    /// Spawns the worker on the current tokio runtime. The worker exits once
    /// the queue is dropped and every task already enqueued has run.
    pub fn new(backend: Arc<dyn VersionBackend>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        tokio::spawn(run_worker(backend, receiver, Arc::clone(&counters)));
        Self { sender, counters }
    }
}

impl CommitScheduler for CommitQueue {
    fn enqueue(&self, task: CommitTask) -> CommitFuture {
        let (reply, response) = oneshot::channel();
        let id = self.counters.enqueued.fetch_add(1, Ordering::SeqCst) + 1;
        let (path, message) = (task.path.clone(), task.message.clone());

        if let Err(mpsc::error::SendError(job)) = self.sender.send(Job { id, task, reply }) {
            self.counters.failed.fetch_add(1, Ordering::SeqCst);
            let cause = BackendError::Unavailable("commit queue is shut down".to_string());
            return future::ready(Err(CommitError::new(job.task.path, job.task.message, cause))).boxed();
        }
        debug!(task = id, path = %path.display(), "commit task enqueued");

        async move {
            response.await.unwrap_or_else(|_| {
                let cause = BackendError::Unavailable("commit worker stopped before the task finished".to_string());
                Err(CommitError::new(path, message, cause))
            })
        }
        .boxed()
    }

    fn stats(&self) -> QueueStats {
        self.counters.snapshot()
    }
}

async fn run_worker(
    backend: Arc<dyn VersionBackend>,
    mut receiver: mpsc::UnboundedReceiver<Job>,
    counters: Arc<Counters>,
) {
    while let Some(Job { id, task, reply }) = receiver.recv().await {
        let span = debug_span!("commit", task = id, path = %task.path.display());
        let result = commit_once(backend.as_ref(), &task).instrument(span).await;

        let outcome = match result {
            Ok(version_id) => {
                counters.completed.fetch_add(1, Ordering::SeqCst);
                debug!(task = id, version = %version_id, "commit task completed");
                Ok(version_id)
            }
            Err(cause) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                warn!(task = id, path = %task.path.display(), error = %cause, "commit task failed");
                Err(CommitError::new(task.path, task.message, cause))
            }
        };

        if reply.send(outcome).is_err() {
            debug!(task = id, "submitter stopped waiting for commit result");
        }
    }
    debug!("commit queue worker stopped");
}

/// Run one task, turning a panic inside the backend into a task failure
async fn commit_once(backend: &dyn VersionBackend, task: &CommitTask) -> Result<VersionId, BackendError> {
    AssertUnwindSafe(backend.stage_and_commit(&task.path, &task.message))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(BackendError::Internal("commit task panicked".to_string())))
}

/// Scheduler that commits on the caller's task, one at a time.
///
/// Order follows lock acquisition rather than submission; meant for tests
/// that do not care about ordering.
pub struct InlineCommitter {
    backend: Arc<dyn VersionBackend>,
    gate: Arc<Mutex<()>>,
    counters: Arc<Counters>,
}

impl InlineCommitter {
    pub fn new(backend: Arc<dyn VersionBackend>) -> Self {
        Self {
            backend,
            gate: Arc::new(Mutex::new(())),
            counters: Arc::new(Counters::default()),
        }
    }
}

impl CommitScheduler for InlineCommitter {
    fn enqueue(&self, task: CommitTask) -> CommitFuture {
        self.counters.enqueued.fetch_add(1, Ordering::SeqCst);
        let backend = Arc::clone(&self.backend);
        let gate = Arc::clone(&self.gate);
        let counters = Arc::clone(&self.counters);

        async move {
            let _turn = gate.lock().await;
            match commit_once(backend.as_ref(), &task).await {
                Ok(version_id) => {
                    counters.completed.fetch_add(1, Ordering::SeqCst);
                    Ok(version_id)
                }
                Err(cause) => {
                    counters.failed.fetch_add(1, Ordering::SeqCst);
                    Err(CommitError::new(task.path, task.message, cause))
                }
            }
        }
        .boxed()
    }

    fn stats(&self) -> QueueStats {
        self.counters.snapshot()
    }
}
