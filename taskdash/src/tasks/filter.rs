//! Filtered view derivation.
//!
//! The filtered view is a pure function of the task list and the filter
//! state. Each dimension is an independent predicate; they compose by
//! logical AND, so the order they run in never changes the result.

use taskdash_proto::{StatusFilter, Task, TaskFilters};

/// One filter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterStep {
    /// Case-insensitive title substring.
    Search,
    /// Completion status.
    Status,
    /// Owning user.
    Users,
}

impl FilterStep {
    /// The order used by [`apply_filters`].
    pub const DEFAULT_ORDER: [Self; 3] = [Self::Search, Self::Status, Self::Users];

    /// Returns `true` if `task` passes this dimension of `filters`.
    #[must_use]
    pub fn matches(self, task: &Task, filters: &TaskFilters) -> bool {
        match self {
            Self::Search => matches_search(task, filters.search.as_deref()),
            Self::Status => matches_status(task, filters.status),
            Self::Users => matches_users(task, filters),
        }
    }
}

/// Derives the filtered view of `tasks`, preserving their order.
#[must_use]
pub fn apply_filters(tasks: &[Task], filters: &TaskFilters) -> Vec<Task> {
    apply_filters_in_order(tasks, filters, &FilterStep::DEFAULT_ORDER)
}

/// Like [`apply_filters`], running the dimensions in `order`.
///
/// A dimension missing from `order` is not applied.
#[must_use]
pub fn apply_filters_in_order(
    tasks: &[Task],
    filters: &TaskFilters,
    order: &[FilterStep],
) -> Vec<Task> {
    let mut view: Vec<Task> = tasks.to_vec();
    for step in order {
        view.retain(|task| step.matches(task, filters));
    }
    view
}

/// Title contains `search`, ignoring case. Empty or absent matches all.
#[must_use]
pub fn matches_search(task: &Task, search: Option<&str>) -> bool {
    match search {
        None | Some("") => true,
        Some(needle) => task
            .title
            .to_lowercase()
            .contains(&needle.to_lowercase()),
    }
}

/// `completed` agrees with `status`. Absent or `all` matches all.
#[must_use]
pub fn matches_status(task: &Task, status: Option<StatusFilter>) -> bool {
    match status {
        None | Some(StatusFilter::All) => true,
        Some(StatusFilter::Completed) => task.completed,
        Some(StatusFilter::Pending) => !task.completed,
    }
}

/// Owner is in `filters.user_ids`. Absent or empty matches all.
#[must_use]
pub fn matches_users(task: &Task, filters: &TaskFilters) -> bool {
    filters
        .user_ids
        .as_ref()
        .is_none_or(|ids| ids.is_empty() || ids.contains(&task.user_id))
}
