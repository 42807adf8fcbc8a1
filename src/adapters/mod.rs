//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the engine core to external systems:
//! - `emitter` - In-process task emitter (tests, client simulator)
//! - `http` - HTTP/REST API implementations
//! - `registry` - Static tool catalog
//! - `tools` - Server-side tool adapters
//! - `websocket` - WebSocket client transport

pub mod emitter;
pub mod http;
pub mod registry;
pub mod tools;
pub mod websocket;

pub use emitter::{InProcessTaskEmitter, TaskDeliveryCallback};
pub use http::{task_routes, TaskAppState};
pub use registry::StaticToolIndex;
pub use tools::WebSearchAdapter;
pub use websocket::{ConnectionManager, WebSocketTaskEmitter};
