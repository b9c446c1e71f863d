//! Record store backing the REST API.
//!
//! The [`RecordStore`] holds the task and user collections in memory. When
//! opened on a data directory it also mirrors each collection to a JSON
//! file (`tasks.json`, `users.json`) after every mutation, and reads those
//! files back at startup.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use taskdash_proto::{NewTask, NewUser, Task, TaskId, TaskPatch, User, UserId};

const TASKS_FILE: &str = "tasks.json";
const USERS_FILE: &str = "users.json";

/// Errors from record store operations.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// No task with the requested id.
    #[error("Task not found")]
    TaskNotFound(TaskId),

    /// No user with the requested id.
    #[error("User not found")]
    UserNotFound(UserId),

    /// The highest existing id leaves no room for another record.
    #[error("no ids left after {0}")]
    IdsExhausted(i64),

    /// Reading or writing a data file failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// File that was accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A data file contained invalid JSON.
    #[error("corrupt data file {path}: {source}")]
    Corrupt {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

/// In-memory task and user records with optional JSON-file persistence.
///
/// Thread-safe via [`RwLock`]. Every mutation persists the new collection
/// before it becomes visible, so a failed write leaves the store unchanged.
pub struct RecordStore {
    tasks: RwLock<Vec<Task>>,
    users: RwLock<Vec<User>>,
    data_dir: Option<PathBuf>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    /// Creates an empty, memory-only store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_records(Vec::new(), Vec::new())
    }

    /// Creates a memory-only store pre-populated with records.
    #[must_use]
    pub fn with_records(tasks: Vec<Task>, users: Vec<User>) -> Self {
        Self {
            tasks: RwLock::new(tasks),
            users: RwLock::new(users),
            data_dir: None,
        }
    }

    /// Opens a file-backed store rooted at `data_dir`.
    ///
    /// The directory is created if needed. Missing data files mean empty
    /// collections.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the directory cannot be created or a data
    /// file exists but cannot be read or parsed.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, RecordError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(|source| RecordError::Io {
            path: data_dir.clone(),
            source,
        })?;
        let tasks: Vec<Task> = read_records(&data_dir.join(TASKS_FILE))?;
        let users: Vec<User> = read_records(&data_dir.join(USERS_FILE))?;
        tracing::info!(
            dir = %data_dir.display(),
            tasks = tasks.len(),
            users = users.len(),
            "opened record store"
        );
        Ok(Self {
            tasks: RwLock::new(tasks),
            users: RwLock::new(users),
            data_dir: Some(data_dir),
        })
    }

    /// Returns all tasks, newest first.
    pub async fn list_tasks(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    /// Looks up a task by id.
    pub async fn get_task(&self, id: TaskId) -> Option<Task> {
        self.tasks.read().await.iter().find(|t| t.id == id).cloned()
    }

    /// Creates a task with id `max(existing) + 1` and prepends it.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if persisting the collection fails.
    pub async fn create_task(&self, data: NewTask) -> Result<Task, RecordError> {
        let mut tasks = self.tasks.write().await;
        let next_id = next_id(tasks.iter().map(|t| t.id.get()))?;
        let task = Task {
            id: TaskId::new(next_id),
            user_id: data.user_id,
            title: data.title,
            completed: data.completed,
        };
        let mut updated = Vec::with_capacity(tasks.len() + 1);
        updated.push(task.clone());
        updated.extend(tasks.iter().cloned());
        self.persist(TASKS_FILE, &updated)?;
        *tasks = updated;
        drop(tasks);
        Ok(task)
    }

    /// Applies a partial update to a task.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::TaskNotFound`] if the id is unknown, or an
    /// I/O error if persisting fails.
    pub async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, RecordError> {
        let mut tasks = self.tasks.write().await;
        let index = tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(RecordError::TaskNotFound(id))?;
        let merged = patch.apply(&tasks[index]);
        let mut updated = tasks.clone();
        updated[index] = merged.clone();
        self.persist(TASKS_FILE, &updated)?;
        *tasks = updated;
        drop(tasks);
        Ok(merged)
    }

    /// Removes a task.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::TaskNotFound`] if the id is unknown, or an
    /// I/O error if persisting fails.
    pub async fn delete_task(&self, id: TaskId) -> Result<(), RecordError> {
        let mut tasks = self.tasks.write().await;
        let updated: Vec<Task> = tasks.iter().filter(|t| t.id != id).cloned().collect();
        if updated.len() == tasks.len() {
            return Err(RecordError::TaskNotFound(id));
        }
        self.persist(TASKS_FILE, &updated)?;
        *tasks = updated;
        Ok(())
    }

    /// Returns all users in insertion order.
    pub async fn list_users(&self) -> Vec<User> {
        self.users.read().await.clone()
    }

    /// Looks up a user by id.
    pub async fn get_user(&self, id: UserId) -> Option<User> {
        self.users.read().await.iter().find(|u| u.id == id).cloned()
    }

    /// Creates a user with id `max(existing) + 1` and appends it.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if persisting the collection fails.
    pub async fn create_user(&self, data: NewUser) -> Result<User, RecordError> {
        let mut users = self.users.write().await;
        let next_id = next_id(users.iter().map(|u| u.id.get()))?;
        let user = data.into_user(UserId::new(next_id));
        let mut updated = users.clone();
        updated.push(user.clone());
        self.persist(USERS_FILE, &updated)?;
        *users = updated;
        drop(users);
        Ok(user)
    }

    /// Writes a collection to its data file when file-backed.
    fn persist<T: Serialize>(&self, file: &str, records: &[T]) -> Result<(), RecordError> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };
        let path = dir.join(file);
        let json = serde_json::to_string_pretty(records).map_err(|source| RecordError::Corrupt {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| RecordError::Io { path, source })
    }
}

/// One past the highest of `ids`, or 1 when there are none.
fn next_id(ids: impl Iterator<Item = i64>) -> Result<i64, RecordError> {
    let max = ids.max().unwrap_or(0);
    max.checked_add(1).ok_or(RecordError::IdsExhausted(max))
}

/// Reads a JSON array from `path`; a missing file is an empty collection.
fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, RecordError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).map_err(|source| RecordError::Corrupt {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(RecordError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
