//! Client library for the `Taskdash` task management dashboard.

pub mod actions;
pub mod api;
pub mod config;
pub mod snapshot;
pub mod tasks;
