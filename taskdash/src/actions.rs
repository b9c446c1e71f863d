//! Mutation actions: create, update, and delete against a [`TaskApi`].
//!
//! Actions never return `Err`. A failed call becomes an
//! [`ActionOutcome`] with `success == false` and the error message; a
//! successful call publishes [`Invalidation`]s so that anything caching
//! API responses knows which entries are stale.

use tokio::sync::broadcast;

use taskdash_proto::{NewTask, Task, TaskId, TaskPatch};

use crate::api::TaskApi;

/// Capacity of the invalidation channel. Lagging receivers skip ahead.
const INVALIDATION_CAPACITY: usize = 64;

/// A cache entry made stale by a successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Invalidation {
    /// The task list as a whole.
    TaskList,
    /// A single task.
    Task(TaskId),
}

/// Result of a mutation action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome<T> {
    /// Whether the server accepted the mutation.
    pub success: bool,
    /// The server's result, when `success`.
    pub value: Option<T>,
    /// Failure message, when not `success`.
    pub error: Option<String>,
}

impl<T> ActionOutcome<T> {
    /// A successful outcome.
    pub const fn ok(value: T) -> Self {
        Self {
            success: true,
            value: Some(value),
            error: None,
        }
    }

    /// A failed outcome carrying `message`.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            value: None,
            error: Some(message.into()),
        }
    }

    /// Converts into a `Result`, using `fallback` when a failed outcome
    /// carries no message.
    ///
    /// # Errors
    ///
    /// Returns the failure message if the outcome was not successful.
    pub fn into_result(self, fallback: &str) -> Result<T, String> {
        match (self.success, self.value) {
            (true, Some(value)) => Ok(value),
            _ => Err(self.error.unwrap_or_else(|| fallback.to_string())),
        }
    }
}

/// Mutation operations over a [`TaskApi`], with cache invalidation.
pub struct MutationActions<A> {
    api: A,
    invalidations: broadcast::Sender<Invalidation>,
}

impl<A: TaskApi> MutationActions<A> {
    /// Wraps `api`.
    pub fn new(api: A) -> Self {
        let (invalidations, _) = broadcast::channel(INVALIDATION_CAPACITY);
        Self { api, invalidations }
    }

    /// The underlying data access client.
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Subscribes to cache invalidations.
    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.invalidations.subscribe()
    }

    /// Creates a task on the server.
    pub async fn create_task_action(&self, data: &NewTask) -> ActionOutcome<Task> {
        match self.api.create_task(data).await {
            Ok(task) => {
                self.invalidate(&[Invalidation::TaskList, Invalidation::Task(task.id)]);
                ActionOutcome::ok(task)
            }
            Err(e) => {
                tracing::error!(error = %e, title = %data.title, "error creating task");
                ActionOutcome::failed(e.to_string())
            }
        }
    }

    /// Applies `patch` to task `id` on the server.
    pub async fn update_task_action(&self, id: TaskId, patch: &TaskPatch) -> ActionOutcome<Task> {
        match self.api.update_task(id, patch).await {
            Ok(task) => {
                self.invalidate(&[Invalidation::TaskList, Invalidation::Task(id)]);
                ActionOutcome::ok(task)
            }
            Err(e) => {
                tracing::error!(error = %e, task_id = %id, "error updating task");
                ActionOutcome::failed(e.to_string())
            }
        }
    }

    /// Deletes task `id` on the server.
    pub async fn delete_task_action(&self, id: TaskId) -> ActionOutcome<()> {
        match self.api.delete_task(id).await {
            Ok(()) => {
                self.invalidate(&[Invalidation::TaskList, Invalidation::Task(id)]);
                ActionOutcome::ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, task_id = %id, "error deleting task");
                ActionOutcome::failed(e.to_string())
            }
        }
    }

    fn invalidate(&self, entries: &[Invalidation]) {
        for entry in entries {
            // No receivers is fine.
            let _ = self.invalidations.send(*entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::api::memory::{ApiOp, InMemoryApi};

    fn actions() -> MutationActions<InMemoryApi> {
        MutationActions::new(InMemoryApi::with_records(
            vec![Task::new(1, 1, "A", false)],
            Vec::new(),
        ))
    }

    // --- outcome tests ---

    #[test]
    fn outcome_into_result() {
        assert_eq!(ActionOutcome::ok(5).into_result("x"), Ok(5));
        assert_eq!(
            ActionOutcome::<u8>::failed("boom").into_result("x"),
            Err("boom".to_string())
        );
        let empty = ActionOutcome::<u8> {
            success: false,
            value: None,
            error: None,
        };
        assert_eq!(empty.into_result("fallback"), Err("fallback".to_string()));
    }

    // --- action tests ---

    #[tokio::test]
    async fn create_success_invalidates_list_and_new_task() {
        let actions = actions();
        let mut rx = actions.subscribe();

        let outcome = actions.create_task_action(&NewTask::new("B", 1)).await;
        assert!(outcome.success);
        let task = outcome.value.unwrap();
        assert_eq!(task.id, TaskId::new(2));

        assert_eq!(rx.try_recv().unwrap(), Invalidation::TaskList);
        assert_eq!(rx.try_recv().unwrap(), Invalidation::Task(task.id));
    }

    #[tokio::test]
    async fn update_failure_is_outcome_not_error() {
        let actions = actions();
        let mut rx = actions.subscribe();
        actions.api().fail(
            ApiOp::UpdateTask,
            ApiError::Fetch {
                message: "Failed to update task".to_string(),
                status: 500,
            },
        );

        let outcome = actions
            .update_task_action(TaskId::new(1), &TaskPatch::completed(true))
            .await;
        assert!(!outcome.success);
        assert!(outcome.value.is_none());
        assert_eq!(outcome.error.as_deref(), Some("Failed to update task"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn delete_invalidates_task_entry() {
        let actions = actions();
        let mut rx = actions.subscribe();
        let outcome = actions.delete_task_action(TaskId::new(1)).await;
        assert!(outcome.success);
        assert_eq!(rx.try_recv().unwrap(), Invalidation::TaskList);
        assert_eq!(rx.try_recv().unwrap(), Invalidation::Task(TaskId::new(1)));
    }

    #[tokio::test]
    async fn delete_unknown_carries_server_message() {
        let actions = actions();
        let outcome = actions.delete_task_action(TaskId::new(42)).await;
        assert_eq!(outcome.error.as_deref(), Some("Task not found"));
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_fine() {
        let actions = actions();
        let outcome = actions
            .update_task_action(TaskId::new(1), &TaskPatch::title("renamed"))
            .await;
        assert_eq!(outcome.value.unwrap().title, "renamed");
    }
}
