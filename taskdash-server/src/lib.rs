//! `Taskdash` API server library.
//!
//! Exposes the REST API for use in tests and embedding. The server serves
//! task and user records over JSON and validates every request body.

pub mod api;
pub mod config;
pub mod store;
