//! Application services.
//!
//! The orchestrator (per-user state store), the server tool executor,
//! and the execution engine that drives each user's DAG to completion.
//! All are constructor-initialized and shared by reference from the
//! composition root; there are no module-level singletons.

mod engine;
mod executor;
mod orchestrator;

pub use engine::{DriverHandle, ExecutionEngine};
pub use executor::{ServerToolExecutor, ToolAdapter};
pub use orchestrator::{TaskBatch, TaskOrchestrator};
