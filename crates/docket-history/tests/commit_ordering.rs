// Ordering and failure isolation of recorder commits

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docket_history::{
    CommitFuture, CommitQueue, CommitScheduler, CommitTask, DocumentId, DocumentTypes, MemoryBackend, PathResolver,
    QueueStats, RecordRequest, Recorder, RecorderError,
};
use futures::future::join_all;
use tempfile::{tempdir, TempDir};

/// Scheduler that notes the order tasks reach the queue in
struct ObservedQueue {
    inner: CommitQueue,
    enqueued: Mutex<Vec<PathBuf>>,
}

impl CommitScheduler for ObservedQueue {
    fn enqueue(&self, task: CommitTask) -> CommitFuture {
        let mut enqueued = self.enqueued.lock().unwrap();
        enqueued.push(task.path.clone());
        // Hold the lock across the send so the log order is the queue order
        self.inner.enqueue(task)
    }

    fn stats(&self) -> QueueStats {
        self.inner.stats()
    }
}

fn slow_backend(dir: &TempDir) -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new(dir.path()).with_commit_latency(Duration::from_millis(5)))
}

fn document(i: usize) -> DocumentId {
    DocumentId::in_collection(format!("service-{}", i), "privacy-policy")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_history_follows_enqueue_order() {
    let dir = tempdir().unwrap();
    let backend = slow_backend(&dir);
    let scheduler = Arc::new(ObservedQueue {
        inner: CommitQueue::new(backend.clone()),
        enqueued: Mutex::new(Vec::new()),
    });
    let recorder = Arc::new(Recorder::with_scheduler(
        PathResolver::new(dir.path(), "md"),
        backend.clone(),
        scheduler.clone(),
        DocumentTypes::builtin(),
    ));

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let recorder = Arc::clone(&recorder);
            tokio::spawn(async move { recorder.record(RecordRequest::new(document(i), format!("policy {}", i))).await })
        })
        .collect();
    for handle in join_all(handles).await {
        assert!(handle.unwrap().unwrap().is_committed());
    }

    let committed: Vec<PathBuf> = backend.history().into_iter().map(|commit| commit.path).collect();
    assert_eq!(committed, *scheduler.enqueued.lock().unwrap());
    assert_eq!(backend.max_concurrent_commits(), 1);
    assert_eq!(recorder.queue_stats(), QueueStats { enqueued: 12, completed: 12, failed: 0 });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_commit_does_not_block_others() {
    let dir = tempdir().unwrap();
    let backend = slow_backend(&dir);
    let recorder = Arc::new(Recorder::new(
        PathResolver::new(dir.path(), "md"),
        backend.clone(),
        DocumentTypes::builtin(),
    ));
    let broken = recorder.resolver().resolve(&document(1), None);
    backend.fail_commits_for(broken.clone());

    let results = join_all((0..3).map(|i| {
        let recorder = Arc::clone(&recorder);
        async move { recorder.record(RecordRequest::new(document(i), "text")).await }
    }))
    .await;

    assert!(results[0].as_ref().unwrap().is_committed());
    assert!(results[2].as_ref().unwrap().is_committed());
    match &results[1] {
        Err(RecorderError::Commit(err)) => {
            assert_eq!(err.path, broken);
            assert!(err.to_string().starts_with(&format!("Could not commit {}", broken.display())));
        }
        other => panic!("expected a commit failure, got {other:?}"),
    }

    let stats = recorder.queue_stats();
    assert_eq!((stats.completed, stats.failed, stats.pending()), (2, 1, 0));

    // The queue keeps serving after a failure
    backend.allow_commits_for(&broken);
    let retry = recorder.record(RecordRequest::new(document(1), "text")).await.unwrap();
    assert!(retry.is_committed());
    assert!(retry.is_first_version);
    assert_eq!(backend.history().len(), 3);
}
