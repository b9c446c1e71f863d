//! The task store: fetched state, optimistic mutations, and reverts.
//!
//! State lives behind a [`parking_lot::Mutex`] that is only held between
//! suspension points, never across a network call. Two store calls can
//! therefore interleave while one of them waits on the server, which is
//! why each optimistic mutation leaves a [`PendingMutation`] behind: it
//! carries what is needed to undo the change and blocks a second change to
//! the same task until the first one settles.
//!
//! Once a mutation's request is issued, the request and the step that
//! settles its outcome run on a spawned task. Dropping the caller's future
//! only stops the caller from waiting; the store still confirms or reverts.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use taskdash_proto::{NewTask, Task, TaskFilters, TaskId, TaskPatch, User, UserId};

use super::StoreError;
use super::filter::apply_filters;
use super::stats::TaskStats;
use crate::actions::MutationActions;
use crate::api::TaskApi;
use crate::snapshot::Snapshot;

/// An optimistic change the server has not confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingMutation {
    /// A task was replaced by its patched value.
    Update {
        /// Task being updated.
        task_id: TaskId,
        /// Value before the patch.
        prior: Task,
    },
    /// A task was removed from the list.
    Delete {
        /// Task being deleted.
        task_id: TaskId,
        /// The removed task.
        prior: Task,
        /// Its position in the list at removal time.
        index: usize,
    },
}

impl PendingMutation {
    /// The task this mutation applies to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        match self {
            Self::Update { task_id, .. } | Self::Delete { task_id, .. } => *task_id,
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    tasks: Vec<Task>,
    users: Vec<User>,
    filters: TaskFilters,
    filtered: Vec<Task>,
    loading: bool,
    error: Option<String>,
    initialized: bool,
    pending: Vec<PendingMutation>,
}

impl StoreState {
    fn recompute(&mut self) {
        self.filtered = apply_filters(&self.tasks, &self.filters);
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn is_pending(&self, id: TaskId) -> bool {
        self.pending.iter().any(|p| p.task_id() == id)
    }

    fn take_pending(&mut self, id: TaskId) -> Option<PendingMutation> {
        let index = self.pending.iter().position(|p| p.task_id() == id)?;
        Some(self.pending.remove(index))
    }

    /// Undoes the pending mutation for `id`, if any.
    fn revert(&mut self, id: TaskId) {
        match self.take_pending(id) {
            Some(PendingMutation::Update { prior, .. }) => {
                if let Some(index) = self.position(id) {
                    self.tasks[index] = prior;
                }
            }
            Some(PendingMutation::Delete { prior, index, .. }) => {
                if self.position(id).is_none() {
                    let index = index.min(self.tasks.len());
                    self.tasks.insert(index, prior);
                }
            }
            None => {}
        }
        self.recompute();
    }
}

/// Everything a spawned resolution needs to settle a mutation.
struct Shared<A, S> {
    actions: MutationActions<A>,
    snapshot: S,
    state: Mutex<StoreState>,
    revision: watch::Sender<u64>,
}

impl<A: TaskApi, S: Snapshot> Shared<A, S> {
    /// Runs `f` on the state, then bumps the revision.
    fn mutate<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let result = {
            let mut state = self.state.lock();
            f(&mut *state)
        };
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
        result
    }

    fn finish_create(&self, result: Result<Task, String>) -> Result<Task, StoreError> {
        match result {
            Ok(task) => {
                let tasks = self.mutate(|s| {
                    s.tasks.retain(|t| t.id != task.id);
                    s.tasks.insert(0, task.clone());
                    s.loading = false;
                    s.recompute();
                    s.tasks.clone()
                });
                self.snapshot.save_tasks(&tasks);
                tracing::info!(task_id = %task.id, total = tasks.len(), "task created");
                Ok(task)
            }
            Err(message) => {
                self.mutate(|s| {
                    s.error = Some(message.clone());
                    s.loading = false;
                });
                Err(StoreError::Rejected(message))
            }
        }
    }

    /// Drops the pending record on success, reverts on failure.
    fn settle(&self, id: TaskId, result: Result<(), String>) -> Result<(), StoreError> {
        match result {
            Ok(()) => {
                self.mutate(|s| s.take_pending(id));
                tracing::debug!(task_id = %id, "mutation confirmed");
                Ok(())
            }
            Err(message) => {
                let tasks = self.mutate(|s| {
                    s.revert(id);
                    s.error = Some(message.clone());
                    s.tasks.clone()
                });
                self.snapshot.save_tasks(&tasks);
                tracing::warn!(task_id = %id, error = %message, "mutation rejected, reverted");
                Err(StoreError::Rejected(message))
            }
        }
    }
}

/// Waits for a spawned resolution.
async fn join<T>(handle: JoinHandle<Result<T, StoreError>>) -> Result<T, StoreError> {
    handle
        .await
        .unwrap_or_else(|e| Err(StoreError::Rejected(e.to_string())))
}

/// Client-side task state synchronized with a [`TaskApi`].
///
/// Construct one per session with its data access client and snapshot
/// cache. Read accessors return owned copies; [`subscribe`](Self::subscribe)
/// gives a revision counter that changes whenever state does.
///
/// Mutations spawn onto the current tokio runtime.
pub struct TaskStore<A, S> {
    shared: Arc<Shared<A, S>>,
}

impl<A: TaskApi + 'static, S: Snapshot + 'static> TaskStore<A, S> {
    /// Builds a store, warm-started from `snapshot`.
    ///
    /// Snapshot tasks and filters are visible immediately, but the store
    /// stays uninitialized so [`initialize`](Self::initialize) still
    /// fetches from the server.
    pub fn new(actions: MutationActions<A>, snapshot: S) -> Self {
        let mut tasks = snapshot.load_tasks();
        let mut seen = std::collections::HashSet::new();
        tasks.retain(|t| seen.insert(t.id));

        let mut state = StoreState {
            tasks,
            filters: snapshot.load_filters(),
            ..StoreState::default()
        };
        state.recompute();
        if !state.tasks.is_empty() {
            tracing::debug!(tasks = state.tasks.len(), "warm start from snapshot");
        }

        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                actions,
                snapshot,
                state: Mutex::new(state),
                revision,
            }),
        }
    }

    /// Shorthand for `TaskStore::new(MutationActions::new(api), snapshot)`.
    pub fn with_api(api: A, snapshot: S) -> Self {
        Self::new(MutationActions::new(api), snapshot)
    }

    /// The mutation actions (and through them, the API client).
    #[must_use]
    pub fn actions(&self) -> &MutationActions<A> {
        &self.shared.actions
    }

    /// The snapshot cache.
    #[must_use]
    pub fn snapshot(&self) -> &S {
        &self.shared.snapshot
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        self.shared.mutate(f)
    }

    // --- loading ---

    /// Fetches tasks and users unless already initialized with tasks.
    ///
    /// Failures are recorded in [`error`](Self::error); this never fails.
    pub async fn initialize(&self) {
        {
            let state = self.shared.state.lock();
            if state.initialized && !state.tasks.is_empty() {
                tracing::debug!("store already initialized, skipping fetch");
                return;
            }
        }

        self.mutate(|s| {
            s.loading = true;
            s.error = None;
        });

        match self.shared.actions.api().fetch_tasks_with_users().await {
            Ok(bundle) => {
                let filters = self.shared.snapshot.load_filters();
                let (tasks, users) = (bundle.tasks.len(), bundle.users.len());
                self.mutate(|s| {
                    s.tasks = bundle.tasks;
                    s.users = bundle.users;
                    s.filters = filters;
                    s.initialized = true;
                    s.loading = false;
                    s.recompute();
                });
                tracing::info!(tasks, users, "store initialized");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to initialize store");
                self.mutate(|s| {
                    s.error = Some(e.to_string());
                    s.loading = false;
                    s.initialized = false;
                });
            }
        }
    }

    /// Forces a fresh fetch, e.g. after a failed [`initialize`](Self::initialize).
    pub async fn retry(&self) {
        self.mutate(|s| s.initialized = false);
        self.initialize().await;
    }

    // --- mutations ---

    /// Creates a task on the server, then prepends it locally.
    ///
    /// Local tasks are untouched until the server answers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Rejected`] with the failure message if the
    /// server rejects the task.
    pub async fn create_task(&self, data: &NewTask) -> Result<Task, StoreError> {
        self.mutate(|s| {
            s.loading = true;
            s.error = None;
        });

        let shared = Arc::clone(&self.shared);
        let data = data.clone();
        join(tokio::spawn(async move {
            let outcome = shared.actions.create_task_action(&data).await;
            shared.finish_create(outcome.into_result("Failed to create task"))
        }))
        .await
    }

    /// Applies `patch` locally, then confirms it with the server.
    ///
    /// Returns the patched task as applied locally.
    ///
    /// # Errors
    ///
    /// - [`StoreError::TaskNotFound`] if `id` is not in the store (no request is made).
    /// - [`StoreError::MutationInFlight`] if another change to `id` is pending.
    /// - [`StoreError::Rejected`] if the server refuses; the prior value is restored.
    pub async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, StoreError> {
        let (merged, tasks) = {
            let mut state = self.shared.state.lock();
            let index = state.position(id).ok_or(StoreError::TaskNotFound(id))?;
            if state.is_pending(id) {
                return Err(StoreError::MutationInFlight(id));
            }
            let prior = state.tasks[index].clone();
            let merged = patch.apply(&prior);
            state.pending.push(PendingMutation::Update { task_id: id, prior });
            state.tasks[index] = merged.clone();
            state.recompute();
            (merged, state.tasks.clone())
        };
        self.shared.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
        self.shared.snapshot.save_tasks(&tasks);
        tracing::debug!(task_id = %id, "optimistic update applied");

        let shared = Arc::clone(&self.shared);
        let patch = patch.clone();
        join(tokio::spawn(async move {
            let outcome = shared.actions.update_task_action(id, &patch).await;
            shared.settle(id, outcome.into_result("Failed to update task").map(drop))
        }))
        .await?;
        Ok(merged)
    }

    /// Removes a task locally, then confirms the delete with the server.
    ///
    /// # Errors
    ///
    /// - [`StoreError::TaskNotFound`] if `id` is not in the store (no request is made).
    /// - [`StoreError::MutationInFlight`] if another change to `id` is pending.
    /// - [`StoreError::Rejected`] if the server refuses; the task is put back
    ///   at its original position.
    pub async fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        let tasks = {
            let mut state = self.shared.state.lock();
            let index = state.position(id).ok_or(StoreError::TaskNotFound(id))?;
            if state.is_pending(id) {
                return Err(StoreError::MutationInFlight(id));
            }
            let prior = state.tasks.remove(index);
            state.pending.push(PendingMutation::Delete {
                task_id: id,
                prior,
                index,
            });
            state.recompute();
            state.tasks.clone()
        };
        self.shared.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
        self.shared.snapshot.save_tasks(&tasks);
        tracing::debug!(task_id = %id, "optimistic delete applied");

        let shared = Arc::clone(&self.shared);
        join(tokio::spawn(async move {
            let outcome = shared.actions.delete_task_action(id).await;
            shared.settle(id, outcome.into_result("Failed to delete task"))
        }))
        .await
    }

    // --- filters ---

    /// Replaces the filters, persists them, and re-derives the view.
    pub fn set_filters(&self, filters: TaskFilters) {
        self.shared.snapshot.save_filters(&filters);
        self.mutate(|s| {
            s.filters = filters;
            s.recompute();
        });
    }

    /// Re-derives the filtered view from the current tasks and filters.
    pub fn apply_filters(&self) {
        self.mutate(StoreState::recompute);
    }

    // --- reads ---

    /// Looks up a task by id.
    #[must_use]
    pub fn get_task(&self, id: TaskId) -> Option<Task> {
        self.shared.state.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    /// All tasks, newest first.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.shared.state.lock().tasks.clone()
    }

    /// All users.
    #[must_use]
    pub fn users(&self) -> Vec<User> {
        self.shared.state.lock().users.clone()
    }

    /// Looks up a user by id.
    #[must_use]
    pub fn user(&self, id: UserId) -> Option<User> {
        self.shared.state.lock().users.iter().find(|u| u.id == id).cloned()
    }

    /// Current filters.
    #[must_use]
    pub fn filters(&self) -> TaskFilters {
        self.shared.state.lock().filters.clone()
    }

    /// Tasks passing the current filters.
    #[must_use]
    pub fn filtered_tasks(&self) -> Vec<Task> {
        self.shared.state.lock().filtered.clone()
    }

    /// Whether a fetch or create is in progress.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.shared.state.lock().loading
    }

    /// Message from the last failed operation, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.shared.state.lock().error.clone()
    }

    /// Whether the initial fetch has succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.shared.state.lock().initialized
    }

    /// Unconfirmed optimistic changes, oldest first.
    #[must_use]
    pub fn pending_mutations(&self) -> Vec<PendingMutation> {
        self.shared.state.lock().pending.clone()
    }

    /// Totals over the current tasks and users.
    #[must_use]
    pub fn stats(&self) -> TaskStats {
        let state = self.shared.state.lock();
        TaskStats::compute(&state.tasks, &state.users)
    }

    /// Clears the error message.
    pub fn clear_error(&self) {
        self.mutate(|s| s.error = None);
    }

    /// Revision counter, bumped on every state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }
}
