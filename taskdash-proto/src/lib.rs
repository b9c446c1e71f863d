//! Shared record types for the `Taskdash` REST API and client store.
//!
//! Everything here is a plain value object: tasks, users, filter state,
//! and the create/update payloads, with JSON shapes matching the HTTP API.

pub mod error;
pub mod filter;
pub mod task;
pub mod user;

pub use error::{ErrorBody, ValidationError};
pub use filter::{StatusFilter, TaskFilters};
pub use task::{NewTask, Task, TaskId, TaskPatch};
pub use user::{Address, Company, Geo, NewUser, User, UserId, UserProfile};
