//! HTTP adapter for task orchestration endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{
    ErrorResponse, RegisterTasksRequest, RegisterTasksResponse, SummaryResponse, TaskListResponse,
};
pub use handlers::TaskAppState;
pub use routes::task_routes;
