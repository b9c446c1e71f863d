//! Integration tests for the HTTP data access client.
//!
//! Each test starts a real `taskdash-server` on an ephemeral port and
//! talks to it through `HttpTaskApi`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use taskdash::api::http::HttpTaskApi;
use taskdash::api::{ApiError, TaskApi};
use taskdash_proto::{NewTask, Task, TaskId, TaskPatch, User, UserId};
use taskdash_server::api::{AppState, start_server_with_state};
use taskdash_server::store::RecordStore;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn seed_tasks() -> Vec<Task> {
    vec![
        Task::new(2, 1, "Write report", true),
        Task::new(1, 2, "Review pull request", false),
    ]
}

fn seed_users() -> Vec<User> {
    vec![
        User::new(1, "Leanne Graham", "leanne@example.com"),
        User::new(2, "Ervin Howell", "ervin@example.com"),
    ]
}

/// Starts a seeded server and returns a client pointed at it.
async fn client() -> (HttpTaskApi, tokio::task::JoinHandle<()>) {
    let state = Arc::new(AppState::with_records(RecordStore::with_records(
        seed_tasks(),
        seed_users(),
    )));
    let (addr, handle) = start_server_with_state("127.0.0.1:0", state)
        .await
        .expect("server should bind");
    let api = HttpTaskApi::new(&format!("http://{addr}"), Some(Duration::from_secs(5)))
        .expect("client should build");
    (api, handle)
}

// --- read tests ---

#[tokio::test]
async fn fetches_tasks_and_users() {
    let (api, server) = client().await;

    assert_eq!(api.fetch_tasks().await.unwrap(), seed_tasks());
    assert_eq!(api.fetch_users().await.unwrap(), seed_users());

    let bundle = api.fetch_tasks_with_users().await.unwrap();
    assert_eq!(bundle.tasks.len(), 2);
    assert_eq!(bundle.users.len(), 2);

    server.abort();
}

#[tokio::test]
async fn fetches_single_records() {
    let (api, server) = client().await;

    let task = api.fetch_task(TaskId::new(1)).await.unwrap();
    assert_eq!(task.title, "Review pull request");
    let user = api.fetch_user(UserId::new(2)).await.unwrap();
    assert_eq!(user.name, "Ervin Howell");

    server.abort();
}

#[tokio::test]
async fn unknown_task_is_not_found_with_server_message() {
    let (api, server) = client().await;

    let err = api.fetch_task(TaskId::new(404)).await.unwrap_err();
    assert_eq!(err, ApiError::NotFound("Task not found".to_string()));
    assert_eq!(err.status(), Some(404));

    server.abort();
}

// --- mutation tests ---

#[tokio::test]
async fn create_assigns_next_id_and_prepends() {
    let (api, server) = client().await;

    let created = api
        .create_task(&NewTask::new("Plan sprint", 1))
        .await
        .unwrap();
    assert_eq!(created.id, TaskId::new(3));
    assert!(!created.completed);

    let tasks = api.fetch_tasks().await.unwrap();
    assert_eq!(tasks[0], created);
    assert_eq!(tasks.len(), 3);

    server.abort();
}

#[tokio::test]
async fn create_with_blank_title_is_validation_error() {
    let (api, server) = client().await;

    let err = api.create_task(&NewTask::new("   ", 1)).await.unwrap_err();
    assert_eq!(err, ApiError::Validation("Title is required".to_string()));

    server.abort();
}

#[tokio::test]
async fn update_merges_partial_fields() {
    let (api, server) = client().await;

    let updated = api
        .update_task(TaskId::new(1), &TaskPatch::completed(true))
        .await
        .unwrap();
    assert_eq!(updated, Task::new(1, 2, "Review pull request", true));

    let renamed = api
        .update_task(TaskId::new(1), &TaskPatch::title("Review PR #12"))
        .await
        .unwrap();
    assert!(renamed.completed);
    assert_eq!(renamed.title, "Review PR #12");

    server.abort();
}

#[tokio::test]
async fn update_unknown_task_is_not_found() {
    let (api, server) = client().await;

    let err = api
        .update_task(TaskId::new(99), &TaskPatch::completed(true))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    server.abort();
}

#[tokio::test]
async fn delete_removes_and_second_delete_is_not_found() {
    let (api, server) = client().await;

    api.delete_task(TaskId::new(2)).await.unwrap();
    assert_eq!(api.fetch_tasks().await.unwrap().len(), 1);

    let err = api.delete_task(TaskId::new(2)).await.unwrap_err();
    assert_eq!(err, ApiError::NotFound("Task not found".to_string()));

    server.abort();
}

// --- failure mapping tests ---

#[tokio::test]
async fn storage_failure_maps_to_fetch_error() {
    // A data dir that is later replaced by a file makes every write fail.
    let tmp = tempfile::tempdir().unwrap();
    let data_dir = tmp.path().join("data");
    let records = RecordStore::open(&data_dir).unwrap();
    std::fs::remove_dir_all(&data_dir).unwrap();
    std::fs::write(&data_dir, "not a directory").unwrap();

    let state = Arc::new(AppState::with_records(records));
    let (addr, server) = start_server_with_state("127.0.0.1:0", state)
        .await
        .unwrap();
    let api = HttpTaskApi::new(&format!("http://{addr}"), None).unwrap();

    let err = api
        .create_task(&NewTask::new("cannot persist", 1))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::Fetch {
            message: "Failed to create task".to_string(),
            status: 500,
        }
    );

    server.abort();
}

#[tokio::test]
async fn stopped_server_is_unexpected_error() {
    let (api, server) = client().await;
    server.abort();
    let _ = server.await;

    let err = api.fetch_users().await.unwrap_err();
    assert!(matches!(err, ApiError::Unexpected(_)));
}
