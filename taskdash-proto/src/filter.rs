//! Filter state for the task list view.
//!
//! An absent field means "no constraint from this dimension". The JSON
//! shape (`userIds`, `status`, `search`) is what the snapshot cache stores.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// Completion-status dimension of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    /// No constraint.
    #[default]
    All,
    /// Only completed tasks.
    Completed,
    /// Only tasks not yet completed.
    Pending,
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Completed => write!(f, "completed"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "completed" | "done" => Ok(Self::Completed),
            "pending" | "open" => Ok(Self::Pending),
            other => Err(format!("unknown status filter: {other}")),
        }
    }
}

/// Filters applied to the task list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilters {
    /// Only tasks owned by one of these users; empty means any user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<BTreeSet<UserId>>,
    /// Completion status constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusFilter>,
    /// Case-insensitive title substring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl TaskFilters {
    /// Filters on status only.
    #[must_use]
    pub const fn with_status(status: StatusFilter) -> Self {
        Self {
            user_ids: None,
            status: Some(status),
            search: None,
        }
    }

    /// Filters on a title search only.
    pub fn with_search(search: impl Into<String>) -> Self {
        Self {
            search: Some(search.into()),
            ..Self::default()
        }
    }

    /// Filters on owning users only.
    pub fn with_users(user_ids: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            user_ids: Some(user_ids.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Returns `true` if no dimension constrains the list.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.user_ids.as_ref().is_none_or(BTreeSet::is_empty)
            && self.status.is_none_or(|s| s == StatusFilter::All)
            && self.search.as_deref().is_none_or(str::is_empty)
    }
}
