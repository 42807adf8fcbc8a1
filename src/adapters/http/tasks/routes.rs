//! HTTP routes for task orchestration endpoints.

use axum::{routing::get, routing::post, Router};

use super::handlers::{get_summary, get_tasks, health, register_tasks, teardown, TaskAppState};

/// Creates the task router with all endpoints.
pub fn task_routes(state: TaskAppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/users/:user_id/tasks",
            post(register_tasks).get(get_tasks).delete(teardown),
        )
        .route("/api/users/:user_id/tasks/summary", get(get_summary))
        .with_state(state)
}
