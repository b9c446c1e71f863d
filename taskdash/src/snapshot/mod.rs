//! Local snapshot cache for warm starts.
//!
//! A snapshot is a best-effort copy of the task list and the filter state,
//! written after each change and read once when the store is built. It is
//! a hint, never a source of truth: every failure (I/O, corrupt JSON) is
//! logged with `tracing::warn!` and treated as "no snapshot".
//!
//! - [`Snapshot`] is the narrow interface the store depends on.
//! - [`LocalSnapshot`] stores JSON strings through a [`SnapshotStorage`].
//! - [`DisabledSnapshot`] discards writes and loads nothing.

pub mod storage;

use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;

use taskdash_proto::{Task, TaskFilters};

pub use storage::{FileStorage, MemoryStorage, SnapshotStorage};

/// Key holding the JSON task array.
pub const TASKS_KEY: &str = "task-management:tasks";

/// Key holding the JSON filter object.
pub const FILTERS_KEY: &str = "task-management:filters";

/// Errors from snapshot storage. These never reach the store.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Reading or writing a snapshot file failed.
    #[error("snapshot i/o error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A snapshot could not be encoded or decoded.
    #[error("snapshot {key} is not valid JSON: {source}")]
    Json {
        /// Storage key.
        key: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The backend refused the operation.
    #[error("snapshot storage unavailable: {0}")]
    Unavailable(String),
}

/// Best-effort persistence of tasks and filters.
pub trait Snapshot: Send + Sync {
    /// Records the current task list.
    fn save_tasks(&self, tasks: &[Task]);

    /// Returns the last saved task list, or empty.
    fn load_tasks(&self) -> Vec<Task>;

    /// Records the current filters.
    fn save_filters(&self, filters: &TaskFilters);

    /// Returns the last saved filters, or the default (unconstrained).
    fn load_filters(&self) -> TaskFilters;
}

/// JSON snapshots over a key/value [`SnapshotStorage`].
#[derive(Debug, Default)]
pub struct LocalSnapshot<S> {
    storage: S,
}

impl<S: SnapshotStorage> LocalSnapshot<S> {
    /// Wraps `storage`.
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    /// The underlying storage.
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(|source| SnapshotError::Json {
                key: key.to_string(),
                source,
            })
            .and_then(|json| self.storage.write(key, &json));
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "snapshot write failed; continuing without it");
        }
    }

    fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let raw = match self.storage.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                tracing::warn!(key, error = %e, "snapshot read failed; ignoring it");
                return T::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(source) => {
                let e = SnapshotError::Json {
                    key: key.to_string(),
                    source,
                };
                tracing::warn!(key, error = %e, "discarding corrupt snapshot");
                T::default()
            }
        }
    }
}

impl<S: SnapshotStorage> Snapshot for LocalSnapshot<S> {
    fn save_tasks(&self, tasks: &[Task]) {
        self.save(TASKS_KEY, tasks);
    }

    fn load_tasks(&self) -> Vec<Task> {
        self.load(TASKS_KEY)
    }

    fn save_filters(&self, filters: &TaskFilters) {
        self.save(FILTERS_KEY, filters);
    }

    fn load_filters(&self) -> TaskFilters {
        self.load(FILTERS_KEY)
    }
}

/// A snapshot that remembers nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSnapshot;

impl Snapshot for DisabledSnapshot {
    fn save_tasks(&self, _tasks: &[Task]) {}

    fn load_tasks(&self) -> Vec<Task> {
        Vec::new()
    }

    fn save_filters(&self, _filters: &TaskFilters) {}

    fn load_filters(&self) -> TaskFilters {
        TaskFilters::default()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use taskdash_proto::StatusFilter;

    use super::*;

    /// Storage that fails while `failing` is set.
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        failing: AtomicBool,
    }

    impl SnapshotStorage for FlakyStorage {
        fn read(&self, key: &str) -> Result<Option<String>, SnapshotError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(SnapshotError::Unavailable("disk gone".into()));
            }
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<(), SnapshotError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(SnapshotError::Unavailable("disk full".into()));
            }
            self.inner.write(key, value)
        }
    }

    #[test]
    fn tasks_and_filters_round_trip() {
        let snapshot = LocalSnapshot::new(MemoryStorage::new());
        let tasks = vec![Task::new(1, 1, "A", false), Task::new(2, 3, "B", true)];
        let filters = TaskFilters::with_status(StatusFilter::Pending);

        snapshot.save_tasks(&tasks);
        snapshot.save_filters(&filters);

        assert_eq!(snapshot.load_tasks(), tasks);
        assert_eq!(snapshot.load_filters(), filters);
    }

    #[test]
    fn stored_json_uses_wire_field_names() {
        let snapshot = LocalSnapshot::new(MemoryStorage::new());
        snapshot.save_tasks(&[Task::new(1, 7, "A", false)]);
        let raw = snapshot.storage().get(TASKS_KEY).unwrap();
        assert_eq!(
            raw,
            r#"[{"id":1,"userId":7,"title":"A","completed":false}]"#
        );
    }

    #[test]
    fn missing_snapshot_loads_defaults() {
        let snapshot = LocalSnapshot::new(MemoryStorage::new());
        assert!(snapshot.load_tasks().is_empty());
        assert_eq!(snapshot.load_filters(), TaskFilters::default());
    }

    #[test]
    fn corrupt_snapshot_is_ignored() {
        let storage = MemoryStorage::new();
        storage.write(TASKS_KEY, "{not json").unwrap();
        storage.write(FILTERS_KEY, r#"{"status":"sideways"}"#).unwrap();
        let snapshot = LocalSnapshot::new(storage);

        assert!(snapshot.load_tasks().is_empty());
        assert_eq!(snapshot.load_filters(), TaskFilters::default());
    }

    #[test]
    fn storage_failures_are_swallowed() {
        let snapshot = LocalSnapshot::new(FlakyStorage::default());
        snapshot.save_tasks(&[Task::new(1, 1, "kept", false)]);

        snapshot.storage().failing.store(true, Ordering::SeqCst);
        snapshot.save_tasks(&[]);
        assert!(snapshot.load_tasks().is_empty());

        snapshot.storage().failing.store(false, Ordering::SeqCst);
        assert_eq!(snapshot.load_tasks(), vec![Task::new(1, 1, "kept", false)]);
    }

    #[test]
    fn file_snapshot_survives_new_instance() {
        let tmp = tempfile::tempdir().unwrap();
        LocalSnapshot::new(FileStorage::new(tmp.path()))
            .save_filters(&TaskFilters::with_search("report"));

        let reopened = LocalSnapshot::new(FileStorage::new(tmp.path()));
        assert_eq!(reopened.load_filters(), TaskFilters::with_search("report"));
    }

    #[test]
    fn disabled_snapshot_remembers_nothing() {
        let snapshot = DisabledSnapshot;
        snapshot.save_tasks(&[Task::new(1, 1, "A", false)]);
        assert!(snapshot.load_tasks().is_empty());
    }
}
