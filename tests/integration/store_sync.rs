//! Integration tests for the task store over HTTP.
//!
//! Drives `TaskStore<HttpTaskApi, _>` against a real `taskdash-server`
//! and checks that local state, server state, and the file snapshot agree.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use taskdash::api::http::HttpTaskApi;
use taskdash::snapshot::{DisabledSnapshot, FileStorage, LocalSnapshot, Snapshot};
use taskdash::tasks::{StoreError, TaskStore};
use taskdash_proto::{NewTask, StatusFilter, Task, TaskFilters, TaskId, TaskPatch, User};
use taskdash_server::api::{AppState, start_server_with_state};
use taskdash_server::store::RecordStore;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn seed_tasks() -> Vec<Task> {
    vec![Task::new(1, 1, "A", false), Task::new(2, 1, "B", true)]
}

fn seed_users() -> Vec<User> {
    vec![User::new(1, "Leanne Graham", "leanne@example.com")]
}

/// Starts a seeded server; returns its state (for server-side checks),
/// base URL, and task handle.
async fn server() -> (Arc<AppState>, String, tokio::task::JoinHandle<()>) {
    let state = Arc::new(AppState::with_records(RecordStore::with_records(
        seed_tasks(),
        seed_users(),
    )));
    let (addr, handle) = start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .expect("server should bind");
    (state, format!("http://{addr}"), handle)
}

fn http(base_url: &str) -> HttpTaskApi {
    HttpTaskApi::new(base_url, Some(Duration::from_secs(5))).expect("client should build")
}

// --- lifecycle tests ---

#[tokio::test]
async fn initialize_then_mutate_round_trip() {
    let (state, url, handle) = server().await;
    let store = TaskStore::with_api(http(&url), DisabledSnapshot);

    store.initialize().await;
    assert!(store.is_initialized());
    assert_eq!(store.tasks(), seed_tasks());

    let created = store.create_task(&NewTask::new("C", 1)).await.unwrap();
    assert_eq!(created.id, TaskId::new(3));

    store
        .update_task(TaskId::new(1), &TaskPatch::completed(true))
        .await
        .unwrap();
    store.delete_task(TaskId::new(2)).await.unwrap();

    let local = store.tasks();
    let remote = state.records.list_tasks().await;
    assert_eq!(local, remote);
    assert_eq!(
        local,
        vec![Task::new(3, 1, "C", false), Task::new(1, 1, "A", true)]
    );

    handle.abort();
}

#[tokio::test]
async fn unreachable_server_surfaces_error_and_retry_recovers() {
    let (_state, url, handle) = server().await;
    // Bind-then-drop gives a port that refuses connections.
    let dead = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_url = format!("http://{}", dead.local_addr().unwrap());
    drop(dead);

    let offline = TaskStore::with_api(http(&dead_url), DisabledSnapshot);
    offline.initialize().await;
    assert!(!offline.is_initialized());
    assert!(
        offline
            .error()
            .is_some_and(|e| e.starts_with("Failed to fetch"))
    );

    let online = TaskStore::with_api(http(&url), DisabledSnapshot);
    online.retry().await;
    assert!(online.is_initialized());
    assert_eq!(online.error(), None);

    handle.abort();
}

// --- revert tests ---

#[tokio::test]
async fn update_rejected_by_server_is_reverted() {
    let (state, url, handle) = server().await;
    let store = TaskStore::with_api(http(&url), DisabledSnapshot);
    store.initialize().await;

    // Delete on the server behind the store's back.
    state.records.delete_task(TaskId::new(1)).await.unwrap();

    let before = store.tasks();
    let err = store
        .update_task(TaskId::new(1), &TaskPatch::completed(true))
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::Rejected("Task not found".to_string()));
    assert_eq!(store.tasks(), before);
    assert_eq!(store.error().as_deref(), Some("Task not found"));

    handle.abort();
}

#[tokio::test]
async fn delete_rejected_by_server_restores_position() {
    let (state, url, handle) = server().await;
    let store = TaskStore::with_api(http(&url), DisabledSnapshot);
    store.initialize().await;

    state.records.delete_task(TaskId::new(2)).await.unwrap();

    let err = store.delete_task(TaskId::new(2)).await.unwrap_err();
    assert!(matches!(err, StoreError::Rejected(_)));
    assert_eq!(store.tasks(), seed_tasks());
    assert_eq!(store.tasks()[1].id, TaskId::new(2));

    handle.abort();
}

#[tokio::test]
async fn create_validation_failure_keeps_list() {
    let (_state, url, handle) = server().await;
    let store = TaskStore::with_api(http(&url), DisabledSnapshot);
    store.initialize().await;

    let err = store.create_task(&NewTask::new("", 1)).await.unwrap_err();
    assert_eq!(err, StoreError::Rejected("Title is required".to_string()));
    assert_eq!(store.tasks(), seed_tasks());

    handle.abort();
}

// --- snapshot tests ---

#[tokio::test]
async fn file_snapshot_warm_starts_next_session() {
    let (_state, url, handle) = server().await;
    let dir = tempfile::tempdir().unwrap();

    {
        let store = TaskStore::with_api(
            http(&url),
            LocalSnapshot::new(FileStorage::new(dir.path())),
        );
        store.initialize().await;
        store.set_filters(TaskFilters::with_status(StatusFilter::Completed));
        store
            .update_task(TaskId::new(1), &TaskPatch::title("A, renamed"))
            .await
            .unwrap();
    }

    let snapshot = LocalSnapshot::new(FileStorage::new(dir.path()));
    assert_eq!(snapshot.load_tasks()[0].title, "A, renamed");

    let next = TaskStore::with_api(http(&url), snapshot);
    assert!(!next.is_initialized());
    assert_eq!(
        next.filters(),
        TaskFilters::with_status(StatusFilter::Completed)
    );
    assert_eq!(next.filtered_tasks(), vec![Task::new(2, 1, "B", true)]);

    next.initialize().await;
    assert!(next.is_initialized());
    assert_eq!(next.tasks()[0].title, "A, renamed");

    handle.abort();
}
