//! Task records and the payloads used to create and update them.
//!
//! A [`Task`] is an immutable snapshot: changing a task means building a
//! new value with [`TaskPatch::apply`], never editing one in place.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::user::UserId;

/// Server-assigned task identifier, immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    /// Wraps a raw integer id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// A task assigned to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique, server-assigned id.
    pub id: TaskId,
    /// The user this task belongs to.
    pub user_id: UserId,
    /// Non-empty title.
    pub title: String,
    /// Whether the task is done.
    pub completed: bool,
}

impl Task {
    /// Builds a task value from its parts.
    pub fn new(id: i64, user_id: i64, title: impl Into<String>, completed: bool) -> Self {
        Self {
            id: TaskId::new(id),
            user_id: UserId::new(user_id),
            title: title.into(),
            completed,
        }
    }
}

/// Payload for `POST /api/tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    /// Task title (must not be blank).
    pub title: String,
    /// Owning user.
    pub user_id: UserId,
    /// Initial completion state.
    #[serde(default)]
    pub completed: bool,
}

impl NewTask {
    /// Creates a pending (not completed) task payload.
    pub fn new(title: impl Into<String>, user_id: i64) -> Self {
        Self {
            title: title.into(),
            user_id: UserId::new(user_id),
            completed: false,
        }
    }

    /// Checks the payload locally before it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TitleRequired`] if the title is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::TitleRequired);
        }
        Ok(())
    }

    /// Parses and validates an untyped JSON request body.
    ///
    /// `completed` defaults to `false` when absent or `null`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the body is not an object, the title
    /// is missing or blank, `userId` is not an integer, or `completed` is
    /// not a boolean.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let obj = value.as_object().ok_or(ValidationError::NotAnObject)?;
        let title = obj
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .ok_or(ValidationError::TitleRequired)?;
        let user_id = obj
            .get("userId")
            .and_then(Value::as_i64)
            .ok_or(ValidationError::UserIdRequired)?;
        let completed = match obj.get("completed") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => return Err(ValidationError::InvalidField("completed".to_string())),
        };
        Ok(Self {
            title: title.to_string(),
            user_id: UserId::new(user_id),
            completed,
        })
    }
}

/// Partial update for `PATCH /api/tasks/{id}`; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// New completion state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskPatch {
    /// A patch that only sets `completed`.
    #[must_use]
    pub const fn completed(completed: bool) -> Self {
        Self {
            title: None,
            user_id: None,
            completed: Some(completed),
        }
    }

    /// A patch that only sets the title.
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.user_id.is_none() && self.completed.is_none()
    }

    /// Returns a new task with the present fields overriding `task`'s.
    ///
    /// The id is never changed.
    #[must_use]
    pub fn apply(&self, task: &Task) -> Task {
        Task {
            id: task.id,
            user_id: self.user_id.unwrap_or(task.user_id),
            title: self.title.clone().unwrap_or_else(|| task.title.clone()),
            completed: self.completed.unwrap_or(task.completed),
        }
    }

    /// Parses and validates an untyped JSON request body.
    ///
    /// Unknown keys (including `id`) are ignored; `null` counts as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the body is not an object or a present
    /// field has the wrong type. A present title must not be blank.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let obj = value.as_object().ok_or(ValidationError::NotAnObject)?;
        let title = match obj.get("title") {
            None | Some(Value::Null) => None,
            Some(Value::String(t)) if !t.trim().is_empty() => Some(t.clone()),
            Some(_) => return Err(ValidationError::TitleRequired),
        };
        let user_id = match obj.get("userId") {
            None | Some(Value::Null) => None,
            Some(v) => Some(UserId::new(
                v.as_i64().ok_or(ValidationError::UserIdRequired)?,
            )),
        };
        let completed = match obj.get("completed") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(b)) => Some(*b),
            Some(_) => return Err(ValidationError::InvalidField("completed".to_string())),
        };
        Ok(Self {
            title,
            user_id,
            completed,
        })
    }
}
