//! HTTP DTOs for task orchestration endpoints.
//!
//! These types decouple the HTTP API from domain types, allowing independent evolution.

use serde::{Deserialize, Serialize};

use crate::domain::task::{ExecutionSummary, Task, TaskRecord};

// ============================================
// Request DTOs
// ============================================

/// A planner batch submitted for one user.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterTasksRequest {
    pub tasks: Vec<Task>,
}

// ============================================
// Response DTOs
// ============================================

/// Response after registering a batch and starting the driver.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterTasksResponse {
    pub registered: usize,
    pub driver_id: String,
}

/// Full state snapshot for one user.
#[derive(Debug, Clone, Serialize)]
pub struct TaskListResponse {
    pub user_id: String,
    pub updated_at: String,
    pub tasks: Vec<TaskRecord>,
}

/// Execution summary for one user.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub driver_running: bool,
    pub client_connected: bool,
}

impl SummaryResponse {
    pub fn from_summary(
        summary: ExecutionSummary,
        driver_running: bool,
        client_connected: bool,
    ) -> Self {
        Self {
            total: summary.total,
            pending: summary.pending,
            running: summary.running,
            completed: summary.completed,
            failed: summary.failed,
            success_rate: summary.success_rate(),
            driver_running,
            client_connected,
        }
    }
}

/// Error envelope for all task endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
