//! Client-side task state: the store, its filtered view, and summary stats.
//!
//! [`TaskStore`] owns the task and user collections fetched from the API,
//! applies updates and deletes optimistically, and reverts them when the
//! server rejects the change. The filtered view is re-derived from the
//! task list and the filters after every change.

pub mod filter;
pub mod stats;
pub mod store;

pub use filter::{FilterStep, apply_filters, apply_filters_in_order};
pub use stats::TaskStats;
pub use store::{PendingMutation, TaskStore};

use taskdash_proto::TaskId;
use thiserror::Error;

/// Errors returned by store mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No task with this id is in the store.
    #[error("Task not found")]
    TaskNotFound(TaskId),
    /// Another change to this task has not been confirmed yet.
    #[error("task {0} has a change still pending")]
    MutationInFlight(TaskId),
    /// The server rejected the change; local state was reverted.
    #[error("{0}")]
    Rejected(String),
}
