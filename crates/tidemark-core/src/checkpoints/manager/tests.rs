//! Tests for checkpoint manager

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use super::super::config::CheckpointManagerConfig;
use super::super::storage::{
    CheckpointStorage, FileCheckpointStorage, MemoryCheckpointStorage, MockCheckpointStorage,
};
use super::super::types::{
    ChangeAction, ChangeEvent, Checkpoint, CheckpointId, CheckpointTrigger, MinimapKind,
    RestoreFailure, RestoreOptions,
};
use super::types::CheckpointManager;
use crate::clock::{Clock, ManualClock};
use crate::config::TidemarkConfig;
use crate::error::TidemarkError;
use crate::host::{FsHost, WorkspaceHost};

const HOUR: i64 = 3_600_000;

struct TestProject {
    temp_dir: TempDir,
    clock: Arc<ManualClock>,
    manager: CheckpointManager,
}

impl TestProject {
    fn write(&self, path: &str, content: &str) {
        let full = self.temp_dir.path().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.temp_dir.path().join(path)).unwrap()
    }

    fn storage_dir(&self) -> std::path::PathBuf {
        self.manager.config().storage_path.clone()
    }

    async fn edit(&self, path: &str, content: &str, timestamp: i64) {
        self.write(path, content);
        self.manager
            .record_change(ChangeEvent::new(
                path,
                0,
                content,
                ChangeAction::Modified,
                timestamp,
            ))
            .await
            .unwrap();
    }
}

fn config_for(temp_dir: &TempDir, settings: TidemarkConfig) -> CheckpointManagerConfig {
    CheckpointManagerConfig::with_settings(temp_dir.path(), settings)
}

async fn setup_with(settings: TidemarkConfig) -> TestProject {
    let temp_dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let host: Arc<dyn WorkspaceHost> = Arc::new(FsHost::new(temp_dir.path()));
    let manager = CheckpointManager::with_host(
        config_for(&temp_dir, settings),
        host,
        clock.clone() as Arc<dyn Clock>,
    )
    .await
    .unwrap();
    TestProject {
        temp_dir,
        clock,
        manager,
    }
}

async fn setup_test_project() -> TestProject {
    setup_with(TidemarkConfig::default()).await
}

#[tokio::test]
async fn test_force_flush_then_build_scenario() {
    let project = setup_test_project().await;
    project.edit("a.txt", "v0", 0).await;
    project.edit("a.txt", "v1", 1).await;
    project.edit("a.txt", "v2", 2).await;

    assert!(project.manager.flush_file("a.txt").await.unwrap());
    let timeline = project.manager.get_timeline("a.txt").await.unwrap().unwrap();
    assert_eq!(timeline.timestamps(), vec![2]);
    assert_eq!(timeline.changes.len(), 3);

    let checkpoint = project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(project.manager.list_checkpoints().await.len(), 1);
    let file = &checkpoint.files["a.txt"];
    assert_eq!(file.snapshot, "v2");
    assert_eq!(file.changes.len(), 3);
    assert_eq!(file.timeline.snapshots.len(), 1);
    assert_eq!(file.minimap.points.len(), 3);
    assert!(checkpoint.metadata.is_initial_state);
    assert!(!checkpoint.metadata.is_automatic);

    let again = project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, None)
        .await
        .unwrap();
    assert!(again.is_none());
    assert_eq!(project.manager.list_checkpoints().await.len(), 1);
}

#[tokio::test]
async fn test_build_only_includes_files_with_pending_changes() {
    let project = setup_test_project().await;
    project.write("untouched.txt", "same");
    project.edit("a.txt", "a", 0).await;

    let first = project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.files.keys().collect::<Vec<_>>(), vec!["a.txt"]);

    project.edit("b.txt", "b", 1).await;
    let second = project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, Some("second".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.files.keys().collect::<Vec<_>>(), vec!["b.txt"]);
    assert_eq!(second.metadata.description, "second");
    assert!(!second.metadata.is_initial_state);
    assert!(second.timestamp > first.timestamp);
}

#[tokio::test]
async fn test_retention_keeps_twenty_and_deletes_evicted() {
    let project = setup_test_project().await;
    let mut ids = Vec::new();

    for i in 0..21 {
        project.clock.set(i * 10);
        project.edit("a.txt", &format!("v{}", i), i * 10).await;
        let checkpoint = project
            .manager
            .build_checkpoint(CheckpointTrigger::Manual, None)
            .await
            .unwrap()
            .unwrap();
        ids.push(checkpoint.id);
        assert!(project.manager.list_checkpoints().await.len() <= 20);
    }

    let history = project.manager.list_checkpoints().await;
    assert_eq!(history.len(), 20);
    assert_eq!(history[0].id, ids[1]);
    assert_eq!(history[19].id, ids[20]);
    assert!(!history.iter().any(|s| s.is_initial_state));

    // The oldest goes first, even when it is the initial state
    let evicted_dir = project.storage_dir().join("changes").join(ids[0].as_str());
    assert!(!evicted_dir.exists());
    assert!(project.manager.get_checkpoint(&ids[0]).await.unwrap().is_none());
}

#[tokio::test]
async fn test_single_checkpoint_retention_keeps_newest() {
    let project = setup_with(TidemarkConfig::default().with_max_checkpoints(1)).await;
    project.edit("a.txt", "v0", 0).await;
    let first = project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, None)
        .await
        .unwrap()
        .unwrap();

    project.clock.set(10);
    project.edit("a.txt", "v1", 10).await;
    let second = project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, None)
        .await
        .unwrap()
        .unwrap();

    let history = project.manager.list_checkpoints().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, second.id);
    let stored = project.manager.get_checkpoint(&second.id).await.unwrap().unwrap();
    assert_eq!(stored.files["a.txt"].snapshot, "v1");
    assert!(project.manager.get_checkpoint(&first.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_evicted_initial_state_stays_the_baseline() {
    let project = setup_with(TidemarkConfig::default().with_max_checkpoints(2)).await;
    project.write("keep.txt", "untouched");
    project.write("a.txt", "v0");
    let initial = project.manager.ensure_initial_state().await.unwrap().unwrap();

    for i in 1..=2 {
        project.clock.set(i * 10);
        project.edit("a.txt", &format!("v{}", i), i * 10).await;
        project
            .manager
            .build_checkpoint(CheckpointTrigger::Manual, None)
            .await
            .unwrap()
            .unwrap();
    }
    let history = project.manager.list_checkpoints().await;
    assert_eq!(history.len(), 2);
    assert!(!history.iter().any(|s| s.id == initial.id));

    // Untouched files keep their captured content
    assert_eq!(
        project.manager.read_at("keep.txt", initial.timestamp).await.unwrap(),
        "untouched"
    );
    assert!(project.manager.sync_workspace().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_minimap_projection_of_recorded_edit() {
    let project = setup_test_project().await;
    let content: String = (0..10)
        .map(|i| {
            if i == 5 {
                "    indented\n".to_string()
            } else {
                format!("line {}\n", i)
            }
        })
        .collect();
    project.write("src/a.rs", &content);

    project
        .manager
        .record_change(ChangeEvent::new(
            "src/a.rs",
            5,
            "    indented",
            ChangeAction::Added,
            0,
        ))
        .await
        .unwrap();

    let minimap = project.manager.get_minimap("src/a.rs").await.unwrap().unwrap();
    assert_eq!(minimap.points.len(), 1);
    let point = minimap.points[0];
    assert_eq!((point.x, point.y), (8, 50));
    assert_eq!(point.kind, MinimapKind::Add);
}

#[tokio::test]
async fn test_minimap_of_unreadable_file_projects_to_origin() {
    let project = setup_test_project().await;
    project
        .manager
        .record_change(ChangeEvent::new("gone.txt", 7, "", ChangeAction::Deleted, 0))
        .await
        .unwrap();

    let minimap = project.manager.get_minimap("gone.txt").await.unwrap().unwrap();
    assert_eq!((minimap.points[0].x, minimap.points[0].y), (0, 0));
}

#[tokio::test]
async fn test_out_of_order_event_is_rejected() {
    let project = setup_test_project().await;
    project.edit("a.txt", "v5", 5).await;

    let err = project
        .manager
        .record_change(ChangeEvent::new("a.txt", 0, "v4", ChangeAction::Modified, 4))
        .await
        .unwrap_err();
    assert!(err.is_invalid_input());

    let status = project.manager.status().await.unwrap();
    assert_eq!(status.events_since_checkpoint, 1);
}

#[tokio::test]
async fn test_flush_window_elapsed_flushes_on_record() {
    let project = setup_test_project().await;
    project.edit("a.txt", "one", 0).await;

    project.clock.set(5_001);
    project.write("a.txt", "two");
    let outcome = project
        .manager
        .record_change(ChangeEvent::new("a.txt", 0, "two", ChangeAction::Modified, 5_001))
        .await
        .unwrap();
    assert!(outcome.flushed);
    assert!(outcome.checkpoint.is_none());
    assert_eq!(
        project.manager.read_at("a.txt", 5_001).await.unwrap(),
        "two"
    );
}

#[tokio::test]
async fn test_flush_due_only_flushes_elapsed_batches() {
    let project = setup_test_project().await;
    project.edit("a.txt", "a", 0).await;
    project.clock.set(3_000);
    project.edit("b.txt", "b", 3_000).await;

    project.clock.set(6_000);
    let flushed = project.manager.flush_due().await.unwrap();
    assert_eq!(flushed, vec!["a.txt".to_string()]);

    let status = project.manager.status().await.unwrap();
    assert_eq!(status.open_batches, vec!["b.txt".to_string()]);
    assert_eq!(status.pending_files, vec!["a.txt".to_string()]);
}

#[tokio::test]
async fn test_edit_threshold_triggers_automatic_checkpoint() {
    let project = setup_with(TidemarkConfig::default().with_edit_threshold(3)).await;
    project.edit("a.txt", "1", 0).await;
    project.edit("a.txt", "2", 1).await;

    project.write("a.txt", "3");
    let outcome = project
        .manager
        .record_change(ChangeEvent::new("a.txt", 0, "3", ChangeAction::Modified, 2))
        .await
        .unwrap();

    let checkpoint = outcome.checkpoint.unwrap();
    assert!(checkpoint.metadata.is_automatic);
    assert_eq!(checkpoint.files["a.txt"].changes.len(), 3);
    assert_eq!(checkpoint.files["a.txt"].snapshot, "3");
    assert_eq!(project.manager.status().await.unwrap().events_since_checkpoint, 0);
}

#[tokio::test]
async fn test_interval_triggers_automatic_checkpoint() {
    let project = setup_with(
        TidemarkConfig::default().with_checkpoint_interval(Duration::from_secs(60)),
    )
    .await;
    project.edit("a.txt", "1", 0).await;
    assert!(project.manager.list_checkpoints().await.is_empty());

    project.clock.set(60_001);
    project.write("a.txt", "2");
    let outcome = project
        .manager
        .record_change(ChangeEvent::new("a.txt", 0, "2", ChangeAction::Modified, 60_001))
        .await
        .unwrap();
    assert!(outcome.checkpoint.is_some());

    // Nothing pending: the interval alone does not build
    project.clock.set(10 * 60_000);
    assert!(project.manager.check_triggers().await.unwrap().is_none());
}

#[tokio::test]
async fn test_read_at_and_restore() {
    let project = setup_test_project().await;
    project.edit("a.txt", "v2", 2).await;
    project.manager.flush_file("a.txt").await.unwrap();
    project.edit("a.txt", "v10", 10).await;
    project.manager.flush_file("a.txt").await.unwrap();

    assert_eq!(project.manager.read_at("a.txt", 5).await.unwrap(), "v2");
    assert_eq!(project.manager.read_at("a.txt", 10).await.unwrap(), "v10");
    assert!(project.manager.read_at("a.txt", 1).await.unwrap_err().is_not_found());

    let preview = project.manager.preview_restore("a.txt", 5).await.unwrap();
    assert!(preview.changes_file());
    assert_eq!(project.read("a.txt"), "v10");

    let restored = project.manager.restore("a.txt", 5).await.unwrap();
    assert_eq!(restored, "v2");
    assert_eq!(project.read("a.txt"), "v2");

    let status = project.manager.status().await.unwrap();
    assert_eq!(status.open_batches, vec!["a.txt".to_string()]);

    let checkpoint = project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, None)
        .await
        .unwrap()
        .unwrap();
    let changes = &checkpoint.files["a.txt"].changes;
    assert_eq!(changes.last().unwrap().action, ChangeAction::Restored);
    assert_eq!(changes.last().unwrap().timestamp, 10);
}

#[tokio::test]
async fn test_restore_before_first_snapshot_writes_nothing() {
    let project = setup_test_project().await;
    project.edit("a.txt", "v2", 2).await;
    project.manager.flush_file("a.txt").await.unwrap();
    project.write("a.txt", "live");

    let err = project.manager.restore("a.txt", 1).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(project.read("a.txt"), "live");
}

#[tokio::test]
async fn test_restore_checkpoint() {
    let project = setup_test_project().await;
    project.edit("a.txt", "saved a", 0).await;
    project.edit("dir/b.txt", "saved b", 0).await;
    let checkpoint = project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, None)
        .await
        .unwrap()
        .unwrap();

    project.write("a.txt", "changed");
    std::fs::remove_file(project.temp_dir.path().join("dir/b.txt")).unwrap();

    let dry = project
        .manager
        .restore_checkpoint(&checkpoint.id, RestoreOptions::dry_run())
        .await
        .unwrap();
    assert!(dry.was_dry_run);
    assert_eq!(dry.restored_count(), 2);
    assert_eq!(project.read("a.txt"), "changed");

    let result = project
        .manager
        .restore_checkpoint(&checkpoint.id, RestoreOptions::all())
        .await
        .unwrap();
    assert!(result.is_success());
    assert_eq!(project.read("a.txt"), "saved a");
    assert_eq!(project.read("dir/b.txt"), "saved b");
}

#[tokio::test]
async fn test_restore_checkpoint_reports_missing_files() {
    let project = setup_test_project().await;
    project.edit("a.txt", "a", 0).await;
    let checkpoint = project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, None)
        .await
        .unwrap()
        .unwrap();

    let result = project
        .manager
        .restore_checkpoint(
            &checkpoint.id,
            RestoreOptions::all().with_files(["a.txt", "nope.txt"]),
        )
        .await
        .unwrap();
    assert_eq!(result.restored_files, vec!["a.txt".to_string()]);
    assert_eq!(
        result.failed_files,
        vec![("nope.txt".to_string(), RestoreFailure::MissingContent)]
    );

    let err = project
        .manager
        .restore_checkpoint(&CheckpointId::from_string("checkpoint_404"), RestoreOptions::all())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_checkpoint() {
    let project = setup_test_project().await;
    project.edit("a.txt", "1", 0).await;
    let first = project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, None)
        .await
        .unwrap()
        .unwrap();
    project.edit("a.txt", "2", 1).await;
    let second = project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, None)
        .await
        .unwrap()
        .unwrap();

    let err = project.manager.delete_checkpoint(&first.id).await.unwrap_err();
    assert!(err.is_invalid_input());

    project.manager.delete_checkpoint(&second.id).await.unwrap();
    assert_eq!(project.manager.list_checkpoints().await.len(), 1);
    assert!(!project.storage_dir().join("changes").join(second.id.as_str()).exists());

    let err = project.manager.delete_checkpoint(&second.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_ensure_initial_state() {
    let project = setup_test_project().await;
    project.write("src/main.rs", "fn main() {}");
    project.write("node_modules/pkg/index.js", "module.exports = 1;");
    project.write(".git/HEAD", "ref: refs/heads/main");

    let initial = project.manager.ensure_initial_state().await.unwrap().unwrap();
    assert!(initial.id.is_initial_state());
    assert!(initial.metadata.is_initial_state);
    assert_eq!(initial.files.keys().collect::<Vec<_>>(), vec!["src/main.rs"]);
    assert_eq!(initial.files["src/main.rs"].snapshot, "fn main() {}");

    assert!(project.manager.ensure_initial_state().await.unwrap().is_none());

    // Later checkpoints are regular ones
    project.clock.set(100);
    project.edit("src/main.rs", "fn main() { run() }", 100).await;
    let next = project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, None)
        .await
        .unwrap()
        .unwrap();
    assert!(!next.metadata.is_initial_state);

    let err = project
        .manager
        .delete_checkpoint(&CheckpointId::initial_state())
        .await
        .unwrap_err();
    assert!(err.is_invalid_input());
}

#[tokio::test]
async fn test_unreadable_file_is_skipped_in_build() {
    let project = setup_test_project().await;
    project.edit("a.txt", "a", 0).await;
    project.edit("b.txt", "b", 0).await;
    std::fs::remove_file(project.temp_dir.path().join("b.txt")).unwrap();

    let checkpoint = project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(checkpoint.files.keys().collect::<Vec<_>>(), vec!["a.txt"]);
}

#[tokio::test]
async fn test_failed_save_keeps_pending_changes() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("a.txt"), "a").unwrap();

    let mut storage = MockCheckpointStorage::new();
    storage.expect_load_history().returning(|| Ok(Vec::new()));
    storage.expect_stored_ids().returning(|| Ok(Vec::new()));
    storage
        .expect_save()
        .returning(|_| Err(TidemarkError::storage("disk full")));

    let manager = CheckpointManager::with_storage(
        CheckpointManagerConfig::new(temp_dir.path()),
        Arc::new(storage),
        Arc::new(FsHost::new(temp_dir.path())),
        Arc::new(ManualClock::new(0)),
    )
    .await
    .unwrap();

    manager
        .record_change(ChangeEvent::new("a.txt", 0, "a", ChangeAction::Added, 0))
        .await
        .unwrap();
    let err = manager
        .build_checkpoint(CheckpointTrigger::Manual, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "TIDEMARK_STORAGE");

    let status = manager.status().await.unwrap();
    assert_eq!(status.pending_files, vec!["a.txt".to_string()]);
    assert_eq!(status.checkpoints, 0);
}

#[tokio::test]
async fn test_memory_storage_backend() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
    let storage = Arc::new(MemoryCheckpointStorage::new());

    let manager = CheckpointManager::with_storage(
        CheckpointManagerConfig::new(temp_dir.path()),
        storage.clone(),
        Arc::new(FsHost::new(temp_dir.path())),
        Arc::new(ManualClock::new(0)),
    )
    .await
    .unwrap();
    manager
        .record_change(ChangeEvent::new("a.txt", 0, "a", ChangeAction::Added, 0))
        .await
        .unwrap();
    let checkpoint = manager
        .build_checkpoint(CheckpointTrigger::Manual, None)
        .await
        .unwrap()
        .unwrap();

    assert!(storage.exists(&checkpoint.id).await.unwrap());
    assert_eq!(storage.load_history().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_orphaned_checkpoint_removed_on_open() {
    let temp_dir = TempDir::new().unwrap();
    let config = CheckpointManagerConfig::new(temp_dir.path());
    let storage = FileCheckpointStorage::new(&config.storage_path);
    let orphan = Checkpoint::new(5, CheckpointTrigger::Manual, None);
    storage.save(&orphan).await.unwrap();
    assert!(storage.checkpoint_dir(&orphan.id).exists());

    let _manager = CheckpointManager::with_host(
        config,
        Arc::new(FsHost::new(temp_dir.path())),
        Arc::new(ManualClock::new(0)),
    )
    .await
    .unwrap();
    assert!(!storage.checkpoint_dir(&orphan.id).exists());
}

#[tokio::test]
async fn test_history_survives_reopen() {
    let project = setup_test_project().await;
    project.edit("a.txt", "a", 0).await;
    let checkpoint = project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, None)
        .await
        .unwrap()
        .unwrap();

    let reopened = CheckpointManager::with_host(
        project.manager.config().clone(),
        Arc::new(FsHost::new(project.temp_dir.path())),
        Arc::new(ManualClock::new(0)),
    )
    .await
    .unwrap();
    let history = reopened.list_checkpoints().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, checkpoint.id);
    assert_eq!(
        reopened.latest_checkpoint().await.unwrap().unwrap().id,
        checkpoint.id
    );
}

#[tokio::test]
async fn test_cleanup_snapshots_downsamples_closed_buckets() {
    let project = setup_test_project().await;
    for (i, ts) in [1_000, 300_000, 300_500, 600_000, 700_000].iter().enumerate() {
        project
            .manager
            .timelines
            .append_snapshot("a.txt", *ts, &format!("v{}", i))
            .await
            .unwrap();
    }

    project.clock.set(HOUR / 2);
    assert_eq!(project.manager.cleanup_snapshots("a.txt").await.unwrap(), 0);

    project.clock.set(2 * HOUR);
    assert_eq!(project.manager.cleanup_all().await.unwrap(), 1);
    assert_eq!(
        project.manager.timelines.list_timestamps("a.txt").await.unwrap(),
        vec![1_000, 300_000, 600_000, 700_000]
    );
}

#[tokio::test]
async fn test_file_history_and_reconstruction() {
    let project = setup_test_project().await;
    project.edit("a.txt", "one", 10).await;
    project.manager.flush_file("a.txt").await.unwrap();
    project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, Some("first".to_string()))
        .await
        .unwrap();

    project.clock.set(100);
    project.edit("a.txt", "two", 20).await;
    project.manager.flush_file("a.txt").await.unwrap();
    project.edit("b.txt", "b", 25).await;
    project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, Some("second".to_string()))
        .await
        .unwrap();

    project.edit("a.txt", "three", 30).await;
    project.manager.flush_file("a.txt").await.unwrap();

    let history = project.manager.file_history("a.txt").await.unwrap();
    let descriptions: Vec<_> = history.iter().map(|e| e.description.as_str()).collect();
    assert_eq!(descriptions, vec!["first", "second"]);
    assert_eq!(history[1].snapshot, "two");

    let range = project
        .manager
        .reconstruct_history("a.txt", 15, 30)
        .await
        .unwrap();
    assert_eq!(range.initial_content.as_deref(), Some("one"));
    assert_eq!(range.steps.timestamps(), vec![20, 30]);
    assert_eq!(range.final_content.as_deref(), Some("three"));

    let err = project
        .manager
        .reconstruct_history("a.txt", 30, 15)
        .await
        .unwrap_err();
    assert!(err.is_invalid_input());
}

#[tokio::test]
async fn test_paths_are_normalized() {
    let project = setup_test_project().await;
    project.write("src/a.rs", "x");
    project
        .manager
        .record_change(ChangeEvent::new("./src/a.rs", 0, "x", ChangeAction::Added, 0))
        .await
        .unwrap();
    project.manager.flush_file("src\\a.rs").await.unwrap();

    assert_eq!(project.manager.read_at("src/a.rs", 0).await.unwrap(), "x");
}

#[tokio::test]
async fn test_record_file_change_reads_whole_file() {
    let project = setup_test_project().await;
    project.write("a.txt", "full content\n");

    project.manager.record_file_change("a.txt").await.unwrap();
    std::fs::remove_file(project.temp_dir.path().join("a.txt")).unwrap();
    project.manager.record_file_change("a.txt").await.unwrap();

    project.manager.flush_file("a.txt").await.unwrap();
    let timeline = project.manager.get_timeline("a.txt").await.unwrap().unwrap();
    let actions: Vec<_> = timeline.changes.iter().map(|c| c.action).collect();
    assert_eq!(actions, vec![ChangeAction::Modified, ChangeAction::Deleted]);
    assert_eq!(timeline.changes[0].content, "full content\n");
}

#[tokio::test]
async fn test_sync_workspace_detects_changes_against_initial_state() {
    let project = setup_test_project().await;
    project.write("keep.txt", "same");
    project.write("edit.txt", "before");
    project.write("gone.txt", "bye");
    project.manager.ensure_initial_state().await.unwrap();

    project.write("edit.txt", "after");
    project.write("new.txt", "hello");
    std::fs::remove_file(project.temp_dir.path().join("gone.txt")).unwrap();

    let recorded = project.manager.sync_workspace().await.unwrap();
    assert_eq!(recorded, vec!["edit.txt", "gone.txt", "new.txt"]);

    project.clock.set(10);
    let checkpoint = project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        checkpoint.files.keys().collect::<Vec<_>>(),
        vec!["edit.txt", "new.txt"]
    );

    // Everything is now known, including the deletion
    assert!(project.manager.sync_workspace().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_workspace_does_not_build_automatic_checkpoints() {
    let project = setup_test_project().await;
    for i in 0..12 {
        project.write(&format!("file{:02}.txt", i), &format!("content {}", i));
    }

    let recorded = project.manager.sync_workspace().await.unwrap();
    assert_eq!(recorded.len(), 12);
    assert!(project.manager.list_checkpoints().await.is_empty());

    let checkpoint = project
        .manager
        .build_checkpoint(CheckpointTrigger::Manual, Some("all at once".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(checkpoint.file_count(), 12);
    assert_eq!(checkpoint.metadata.description, "all at once");
    assert_eq!(project.manager.list_checkpoints().await.len(), 1);

    // Streamed edits still fire the edit threshold
    let outcomes = project
        .manager
        .record_changes((0..10).map(|i| {
            ChangeEvent::new("file00.txt", 0, format!("edit {}", i), ChangeAction::Modified, 1)
        }))
        .await
        .unwrap();
    assert!(outcomes.last().unwrap().checkpoint.is_some());
}

#[tokio::test]
async fn test_file_locks_are_released() {
    let project = setup_test_project().await;
    project.edit("a.txt", "a", 0).await;
    project.edit("b.txt", "b", 0).await;
    project.manager.flush_file("a.txt").await.unwrap();
    project.manager.record_file_change("b.txt").await.unwrap();
    project.manager.restore("a.txt", 0).await.unwrap();

    assert_eq!(project.manager.active_file_locks(), 0);
}
