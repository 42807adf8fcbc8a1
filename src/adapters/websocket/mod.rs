//! WebSocket adapters for client task dispatch.
//!
//! This is the real transport behind the TaskEmitter port: the engine
//! hands tasks to [`WebSocketTaskEmitter`], which routes them through the
//! per-user channels in [`ConnectionManager`]; the axum handler forwards
//! them to the socket and feeds acknowledgments back to the orchestrator.
//!
//! ```text
//! ExecutionEngine ──▶ WebSocketTaskEmitter ──▶ ConnectionManager
//!                                                   │ broadcast
//!                                                   ▼
//!                                     ws handler ──▶ client socket
//!                                          ▲
//!                                          └── task:result / task:batch_results
//!                                                → Orchestrator.handle_client_ack
//! ```

pub mod connections;
pub mod emitter;
pub mod handler;
pub mod messages;

pub use connections::{ClientId, ConnectionManager};
pub use emitter::WebSocketTaskEmitter;
pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use messages::{ClientMessage, ConnectedMessage, PongMessage, ServerMessage, TaskResultItem};
