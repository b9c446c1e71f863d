//! In-process [`TaskApi`] backend.
//!
//! [`InMemoryApi`] keeps tasks and users in memory and follows the same
//! rules as the REST server (ids are `max + 1`, new tasks are prepended).
//! It also lets a caller inject failures per operation, count calls, and
//! hold calls in flight until released, which is what the store tests
//! need to observe optimistic state mid-request.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;

use taskdash_proto::{NewTask, Task, TaskId, TaskPatch, User, UserId};

use super::{ApiError, TaskApi};

/// One of the calls exposed by [`TaskApi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOp {
    /// `fetch_tasks`
    FetchTasks,
    /// `fetch_users`
    FetchUsers,
    /// `fetch_task`
    FetchTask,
    /// `fetch_user`
    FetchUser,
    /// `create_task`
    CreateTask,
    /// `update_task`
    UpdateTask,
    /// `delete_task`
    DeleteTask,
}

#[derive(Default)]
struct Records {
    tasks: Vec<Task>,
    users: Vec<User>,
}

/// In-memory task/user backend with failure injection.
#[derive(Default)]
pub struct InMemoryApi {
    records: Mutex<Records>,
    failures: Mutex<HashMap<ApiOp, ApiError>>,
    calls: Mutex<HashMap<ApiOp, usize>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl InMemoryApi {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-populated with records.
    #[must_use]
    pub fn with_records(tasks: Vec<Task>, users: Vec<User>) -> Self {
        Self {
            records: Mutex::new(Records { tasks, users }),
            ..Self::default()
        }
    }

    /// Makes every subsequent `op` call fail with `error` until
    /// [`succeed`](Self::succeed) is called.
    pub fn fail(&self, op: ApiOp, error: ApiError) {
        self.failures.lock().insert(op, error);
    }

    /// Clears an injected failure for `op`.
    pub fn succeed(&self, op: ApiOp) {
        self.failures.lock().remove(&op);
    }

    /// Number of times `op` has been called.
    #[must_use]
    pub fn calls(&self, op: ApiOp) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    /// Total number of calls across all operations.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Holds every subsequent call after it is counted and before it
    /// resolves, until permits are handed out with [`release`](Self::release).
    pub fn hold(&self) {
        *self.gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Lets `n` held calls proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = self.gate.lock().as_ref() {
            gate.add_permits(n);
        }
    }

    /// Stops holding new calls. Calls already waiting still need
    /// [`release`](Self::release).
    pub fn open(&self) {
        self.gate.lock().take();
    }

    /// Current task records, in server order.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.records.lock().tasks.clone()
    }

    /// Counts the call, waits at the gate, then returns the injected
    /// failure for `op` if any.
    async fn enter(&self, op: ApiOp) -> Result<(), ApiError> {
        *self.calls.lock().entry(op).or_insert(0) += 1;

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            match gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(ApiError::Unexpected("gate closed".to_string())),
            }
        }

        match self.failures.lock().get(&op) {
            Some(error) => {
                tracing::debug!(?op, %error, "injected failure");
                Err(error.clone())
            }
            None => Ok(()),
        }
    }
}

impl TaskApi for InMemoryApi {
    async fn fetch_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.enter(ApiOp::FetchTasks).await?;
        Ok(self.records.lock().tasks.clone())
    }

    async fn fetch_users(&self) -> Result<Vec<User>, ApiError> {
        self.enter(ApiOp::FetchUsers).await?;
        Ok(self.records.lock().users.clone())
    }

    async fn fetch_task(&self, id: TaskId) -> Result<Task, ApiError> {
        self.enter(ApiOp::FetchTask).await?;
        self.records
            .lock()
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
    }

    async fn fetch_user(&self, id: UserId) -> Result<User, ApiError> {
        self.enter(ApiOp::FetchUser).await?;
        self.records
            .lock()
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    async fn create_task(&self, data: &NewTask) -> Result<Task, ApiError> {
        self.enter(ApiOp::CreateTask).await?;
        data.validate()
            .map_err(|e| ApiError::Validation(e.to_string()))?;

        let mut records = self.records.lock();
        let next_id = records.tasks.iter().map(|t| t.id.get()).max().unwrap_or(0) + 1;
        let task = Task {
            id: TaskId::new(next_id),
            user_id: data.user_id,
            title: data.title.clone(),
            completed: data.completed,
        };
        records.tasks.insert(0, task.clone());
        drop(records);
        Ok(task)
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, ApiError> {
        self.enter(ApiOp::UpdateTask).await?;
        let mut records = self.records.lock();
        let slot = records
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
        *slot = patch.apply(slot);
        Ok(slot.clone())
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), ApiError> {
        self.enter(ApiOp::DeleteTask).await?;
        let mut records = self.records.lock();
        let before = records.tasks.len();
        records.tasks.retain(|t| t.id != id);
        if records.tasks.len() == before {
            return Err(ApiError::NotFound("Task not found".to_string()));
        }
        Ok(())
    }
}
