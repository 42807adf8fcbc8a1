//! HTTP handlers for task orchestration endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::adapters::websocket::ConnectionManager;
use crate::application::{ExecutionEngine, TaskOrchestrator};
use crate::domain::foundation::UserId;

use super::dto::{
    ErrorResponse, RegisterTasksRequest, RegisterTasksResponse, SummaryResponse, TaskListResponse,
};

/// Shared state for the task endpoints.
#[derive(Clone)]
pub struct TaskAppState {
    pub orchestrator: Arc<TaskOrchestrator>,
    pub engine: Arc<ExecutionEngine>,
    pub connections: Arc<ConnectionManager>,
}

fn parse_user_id(raw: String) -> Result<UserId, Response> {
    UserId::new(raw).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("INVALID_USER_ID", e.to_string())),
        )
            .into_response()
    })
}

/// `POST /api/users/:user_id/tasks` - register a planner batch and start
/// the user's driver.
pub async fn register_tasks(
    State(state): State<TaskAppState>,
    Path(user_id): Path<String>,
    Json(request): Json<RegisterTasksRequest>,
) -> Response {
    let user_id = match parse_user_id(user_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let count = request.tasks.len();
    if let Err(e) = state.orchestrator.register(&user_id, request.tasks).await {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::new("INVALID_BATCH", e.to_string())),
        )
            .into_response();
    }

    if count == 0 {
        return (
            StatusCode::ACCEPTED,
            Json(RegisterTasksResponse {
                registered: 0,
                driver_id: String::new(),
            }),
        )
            .into_response();
    }

    let handle = state.engine.start(user_id.clone()).await;
    info!(user_id = %user_id, registered = count, driver_id = %handle.id(), "batch accepted");

    (
        StatusCode::ACCEPTED,
        Json(RegisterTasksResponse {
            registered: count,
            driver_id: handle.id().to_string(),
        }),
    )
        .into_response()
}

/// `GET /api/users/:user_id/tasks` - full state snapshot.
pub async fn get_tasks(
    State(state): State<TaskAppState>,
    Path(user_id): Path<String>,
) -> Response {
    let user_id = match parse_user_id(user_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.orchestrator.state_snapshot(&user_id).await {
        Some(snapshot) => Json(TaskListResponse {
            user_id: snapshot.user_id.to_string(),
            updated_at: snapshot.updated_at.as_datetime().to_rfc3339(),
            tasks: snapshot.records().to_vec(),
        })
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "STATE_NOT_FOUND",
                format!("no execution state for user '{}'", user_id),
            )),
        )
            .into_response(),
    }
}

/// `GET /api/users/:user_id/tasks/summary` - counts by status.
pub async fn get_summary(
    State(state): State<TaskAppState>,
    Path(user_id): Path<String>,
) -> Response {
    let user_id = match parse_user_id(user_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let summary = state.orchestrator.summary(&user_id).await;
    let driver_running = state.engine.is_running(&user_id).await;
    let client_connected = state.connections.is_connected(&user_id).await;

    Json(SummaryResponse::from_summary(
        summary,
        driver_running,
        client_connected,
    ))
    .into_response()
}

/// `DELETE /api/users/:user_id/tasks` - explicit teardown: stop the
/// driver and drop the state.
pub async fn teardown(
    State(state): State<TaskAppState>,
    Path(user_id): Path<String>,
) -> Response {
    let user_id = match parse_user_id(user_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    state.engine.stop(&user_id).await;
    state.orchestrator.cleanup_user(&user_id).await;
    StatusCode::NO_CONTENT.into_response()
}

/// `GET /health` - liveness probe.
pub async fn health() -> Response {
    Json(serde_json::json!({"status": "ok"})).into_response()
}
