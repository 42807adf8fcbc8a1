//! HTTP adapters - REST API implementations.

pub mod tasks;

pub use tasks::{task_routes, TaskAppState};
