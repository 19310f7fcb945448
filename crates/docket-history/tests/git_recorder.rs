// Recorder integration tests against a real git repository

use std::path::PathBuf;
use std::sync::Arc;

use docket_history::{
    BackendError, Content, DocumentId, GitBackend, RecordOutcome, RecordRequest, Recorder, RecorderConfig,
    RecorderError,
};
use futures::future::join_all;
use git2::Repository;
use tempfile::{tempdir, TempDir};

fn config_for(dir: &TempDir) -> RecorderConfig {
    RecorderConfig {
        root: dir.path().to_path_buf(),
        ..RecorderConfig::default()
    }
}

fn commit_count(dir: &TempDir) -> usize {
    let repo = Repository::open(dir.path()).unwrap();
    let mut walk = repo.revwalk().unwrap();
    walk.push_head().unwrap();
    walk.count()
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    docket_history::logging::init_test_logging();
    let dir = tempdir().unwrap();
    let recorder = Recorder::open(&config_for(&dir)).unwrap();
    let id = DocumentId::in_collection("acme", "privacy-policy");

    let first = recorder
        .record(RecordRequest::new(id.clone(), "v1 text").with_changelog("initial capture"))
        .await
        .unwrap();
    assert!(first.path.ends_with("acme/privacy-policy.md"));
    assert!(first.is_first_version);
    let v1 = first.version_id().cloned().expect("first record creates a version");
    assert!(!v1.as_str().is_empty());

    let again = recorder.record(RecordRequest::new(id.clone(), "v1 text")).await.unwrap();
    assert_eq!(again.outcome, RecordOutcome::Unchanged);
    assert!(!again.is_first_version);

    let second = recorder.record(RecordRequest::new(id.clone(), "v2 text")).await.unwrap();
    let v2 = second.version_id().cloned().expect("changed content creates a version");
    assert_ne!(v1, v2);
    assert!(!second.is_first_version);

    let latest = recorder.latest_record(&id).await.unwrap().unwrap();
    assert_eq!(latest.content, Content::Text("v2 text".to_string()));
    assert_eq!(latest.version_id, v2);
    assert_eq!(latest.mime_type, "text/markdown");

    assert_eq!(commit_count(&dir), 2);
}

#[tokio::test]
async fn test_commit_messages_in_history() {
    let dir = tempdir().unwrap();
    let recorder = Recorder::open(&config_for(&dir)).unwrap();
    let id = DocumentId::in_collection("acme", "terms-of-service");

    let first = recorder
        .record(RecordRequest::new(id.clone(), "A").with_changelog("initial capture"))
        .await
        .unwrap();
    let second = recorder.record(RecordRequest::new(id, "B")).await.unwrap();

    let repo = Repository::open(dir.path()).unwrap();
    let first_commit = repo
        .find_commit(git2::Oid::from_str(first.version_id().unwrap().as_str()).unwrap())
        .unwrap();
    let second_commit = repo
        .find_commit(git2::Oid::from_str(second.version_id().unwrap().as_str()).unwrap())
        .unwrap();

    assert_eq!(
        first_commit.message().unwrap(),
        "Start tracking acme Terms of Service\n\ninitial capture"
    );
    assert_eq!(second_commit.message().unwrap(), "Update acme Terms of Service");
    assert_eq!(second_commit.parent_id(0).unwrap(), first_commit.id());
    assert_eq!(second_commit.author().name(), Some("docket"));
}

#[tokio::test]
async fn test_latest_record_never_returns_older_version() {
    let dir = tempdir().unwrap();
    let recorder = Recorder::open(&config_for(&dir)).unwrap();
    let id = DocumentId::collection_wide("cookie-policy");
    let other = DocumentId::in_collection("globex", "cookie-policy");

    let v1 = recorder.record(RecordRequest::new(id.clone(), "A")).await.unwrap();
    let v2 = recorder.record(RecordRequest::new(id.clone(), "B")).await.unwrap();
    // A later commit of a different document must not shadow the lookup
    recorder.record(RecordRequest::new(other, "C")).await.unwrap();

    let latest = recorder.latest_record(&id).await.unwrap().unwrap();
    assert_eq!(latest.content.as_text(), Some("B"));
    assert_eq!(Some(&latest.version_id), v2.version_id());
    assert_ne!(Some(&latest.version_id), v1.version_id());
}

#[tokio::test]
async fn test_untracked_lookups_do_not_fail() {
    let dir = tempdir().unwrap();
    let recorder = Recorder::open(&config_for(&dir)).unwrap();
    let id = DocumentId::in_collection("acme", "privacy-policy");

    // Empty repository, no HEAD yet
    assert_eq!(recorder.latest_record(&id).await.unwrap(), None);
    assert!(!recorder.is_tracked(&id).await.unwrap());

    recorder
        .record(RecordRequest::new(DocumentId::in_collection("acme", "terms"), "x"))
        .await
        .unwrap();

    assert_eq!(recorder.latest_record(&id).await.unwrap(), None);
    assert!(!recorder.is_tracked(&id).await.unwrap());
}

#[tokio::test]
async fn test_is_tracked_across_extensions() {
    let dir = tempdir().unwrap();
    let recorder = Recorder::open(&config_for(&dir)).unwrap();
    let id = DocumentId::in_collection("acme", "terms");

    recorder
        .record(RecordRequest::new(id.clone(), vec![0x25u8, 0x50, 0x44, 0x46]).with_mime_type("application/pdf"))
        .await
        .unwrap();

    assert!(recorder.is_tracked(&id).await.unwrap());
    assert!(!recorder.is_tracked(&DocumentId::in_collection("acme", "terms.v2")).await.unwrap());

    let latest = recorder.latest_record(&id).await.unwrap().unwrap();
    assert_eq!(latest.mime_type, "application/pdf");
    assert_eq!(latest.content, Content::Binary(b"%PDF".to_vec()));
}

#[tokio::test]
async fn test_failed_commit_does_not_leak_into_next_version() {
    let dir = tempdir().unwrap();
    let recorder = Recorder::open(&config_for(&dir)).unwrap();
    let x = DocumentId::in_collection("acme", "terms");
    let y = DocumentId::in_collection("globex", "terms");

    recorder.record(RecordRequest::new(x.clone(), "x1")).await.unwrap();

    // A stale ref lock makes the next commit fail
    let repo = Repository::open(dir.path()).unwrap();
    let head_ref = repo.head().unwrap().name().unwrap().to_string();
    let lock = dir.path().join(".git").join(format!("{}.lock", head_ref));
    std::fs::write(&lock, "").unwrap();

    let err = recorder.record(RecordRequest::new(x.clone(), "x2")).await.unwrap_err();
    assert!(matches!(err, RecorderError::Commit(_)));
    std::fs::remove_file(&lock).unwrap();

    let y_record = recorder.record(RecordRequest::new(y, "y1")).await.unwrap();
    let y_commit = repo
        .find_commit(git2::Oid::from_str(y_record.version_id().unwrap().as_str()).unwrap())
        .unwrap();
    let parent_tree = y_commit.parent(0).unwrap().tree().unwrap();
    let diff = repo
        .diff_tree_to_tree(Some(&parent_tree), Some(&y_commit.tree().unwrap()), None)
        .unwrap();
    let touched: Vec<PathBuf> = diff
        .deltas()
        .map(|delta| delta.new_file().path().unwrap().to_path_buf())
        .collect();
    assert_eq!(touched, vec![PathBuf::from("globex/terms.md")]);

    // The failed snapshot is still pending and gets its own version
    let retry = recorder.record(RecordRequest::new(x.clone(), "x2")).await.unwrap();
    assert!(retry.is_committed());
    assert_ne!(retry.version_id(), y_record.version_id());

    let latest = recorder.latest_record(&x).await.unwrap().unwrap();
    assert_eq!(latest.content.as_text(), Some("x2"));
    assert_eq!(Some(&latest.version_id), retry.version_id());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_records_produce_linear_history() {
    let dir = tempdir().unwrap();
    let recorder = Arc::new(Recorder::open(&config_for(&dir)).unwrap());

    let records = join_all((0..8).map(|i| {
        let recorder = Arc::clone(&recorder);
        async move {
            let id = DocumentId::in_collection(format!("service-{}", i), "terms-of-service");
            recorder.record(RecordRequest::new(id, format!("terms {}", i))).await
        }
    }))
    .await;

    let mut ids = Vec::new();
    for record in records {
        let record = record.unwrap();
        assert!(record.is_first_version);
        ids.push(record.version_id().cloned().unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(commit_count(&dir), 8);
    assert_eq!(recorder.pending_commits(), 0);

    // Every commit touches exactly the one document it was created for
    let repo = Repository::open(dir.path()).unwrap();
    let mut walk = repo.revwalk().unwrap();
    walk.push_head().unwrap();
    for oid in walk {
        let commit = repo.find_commit(oid.unwrap()).unwrap();
        let tree = commit.tree().unwrap();
        let parent_tree = commit.parent(0).ok().map(|p| p.tree().unwrap());
        let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None).unwrap();
        assert_eq!(diff.deltas().len(), 1);
    }
}

#[tokio::test]
async fn test_publish_to_bare_remote() {
    let dir = tempdir().unwrap();
    let remote_dir = tempdir().unwrap();
    let remote = Repository::init_bare(remote_dir.path()).unwrap();

    let config = config_for(&dir);
    let backend = GitBackend::open_or_init(&config.root, config.git_settings()).unwrap();
    backend
        .set_remote("origin", remote_dir.path().to_str().unwrap())
        .await
        .unwrap();
    let recorder = Recorder::from_config(&config, Arc::new(backend));

    recorder
        .record(RecordRequest::new(DocumentId::in_collection("acme", "terms"), "v1"))
        .await
        .unwrap();
    recorder.publish().await.unwrap();

    let local = Repository::open(dir.path()).unwrap();
    let head = local.head().unwrap();
    let branch = head.shorthand().unwrap().to_string();
    let pushed = remote.find_reference(&format!("refs/heads/{}", branch)).unwrap();
    assert_eq!(pushed.target(), head.target());
}

#[tokio::test]
async fn test_publish_without_remote_fails() {
    let dir = tempdir().unwrap();
    let recorder = Recorder::open(&config_for(&dir)).unwrap();
    recorder
        .record(RecordRequest::new(DocumentId::in_collection("acme", "terms"), "v1"))
        .await
        .unwrap();

    let err = recorder.publish().await.unwrap_err();
    assert!(matches!(err, RecorderError::Publish(BackendError::Remote(_))));
}
