//! Data access layer for the task/user API.
//!
//! Defines the [`TaskApi`] trait that every backend must satisfy.
//! Concrete implementations:
//! - [`http::HttpTaskApi`]: REST client over `reqwest`
//! - [`memory::InMemoryApi`]: in-process backend with failure injection

pub mod http;
pub mod memory;

use std::future::Future;

use taskdash_proto::{NewTask, Task, TaskId, TaskPatch, User, UserId};

/// Errors returned by data access calls.
///
/// Each variant's `Display` is the human-readable message the store
/// surfaces in its `error` field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-success status other than 400/404.
    #[error("{message}")]
    Fetch {
        /// Human-readable description, e.g. "Failed to fetch tasks".
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The server rejected the request payload (`400`).
    #[error("{0}")]
    Validation(String),

    /// The requested record does not exist (`404`).
    #[error("{0}")]
    NotFound(String),

    /// Network, decoding, or other unexpected failure.
    #[error("{0}")]
    Unexpected(String),
}

impl ApiError {
    /// Returns the HTTP status behind this error, when there was one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Fetch { status, .. } => Some(*status),
            Self::Validation(_) => Some(400),
            Self::NotFound(_) => Some(404),
            Self::Unexpected(_) => None,
        }
    }
}

/// Tasks and users fetched together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskBundle {
    /// All tasks, in server order.
    pub tasks: Vec<Task>,
    /// All users.
    pub users: Vec<User>,
}

/// Async access to the task/user API.
///
/// Implementations perform no retries: every failure is returned to the
/// caller immediately.
pub trait TaskApi: Send + Sync {
    /// `GET /api/tasks`.
    fn fetch_tasks(&self) -> impl Future<Output = Result<Vec<Task>, ApiError>> + Send;

    /// `GET /api/users`.
    fn fetch_users(&self) -> impl Future<Output = Result<Vec<User>, ApiError>> + Send;

    /// `GET /api/tasks/{id}`.
    fn fetch_task(&self, id: TaskId) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `GET /api/users/{id}`.
    fn fetch_user(&self, id: UserId) -> impl Future<Output = Result<User, ApiError>> + Send;

    /// `POST /api/tasks`, returning the created task with its new id.
    fn create_task(&self, data: &NewTask)
    -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `PATCH /api/tasks/{id}`, returning the updated task.
    fn update_task(
        &self,
        id: TaskId,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `DELETE /api/tasks/{id}`.
    fn delete_task(&self, id: TaskId) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Fetches tasks and users concurrently; fails if either fails.
    fn fetch_tasks_with_users(&self) -> impl Future<Output = Result<TaskBundle, ApiError>> + Send {
        async move {
            let (tasks, users) = tokio::try_join!(self.fetch_tasks(), self.fetch_users())?;
            Ok(TaskBundle { tasks, users })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_plain_message() {
        let err = ApiError::Fetch {
            message: "Failed to fetch tasks".to_string(),
            status: 500,
        };
        assert_eq!(err.to_string(), "Failed to fetch tasks");
        assert_eq!(err.status(), Some(500));
        assert_eq!(ApiError::NotFound("Task not found".into()).status(), Some(404));
        assert_eq!(ApiError::Unexpected("boom".into()).status(), None);
    }
}
