//! In-process task emitter - direct-call transport for tests and local
//! development.

mod in_process;

pub use in_process::{InProcessTaskEmitter, TaskDeliveryCallback};
