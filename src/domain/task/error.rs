//! Task-level error type with a tagged kind for each failure class.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure class, recorded alongside the error message so callers can
/// discriminate without parsing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown tool or malformed batch, caught at registration.
    Validation,
    /// Reference expression could not be materialized at dispatch time.
    Binding,
    /// A server-side tool adapter failed.
    Execution,
    /// Server execution exceeded `control.timeout_ms`.
    Timeout,
    /// Client session unavailable or emission failed.
    Transport,
    /// Client acknowledgment carried `success = false`.
    ClientReported,
}

/// Error attached to a failing task's record.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("tool '{tool}' not found")]
    UnknownTool { tool: String },

    #[error("binding for parameter '{param}' failed: {reason}")]
    Binding { param: String, reason: String },

    #[error("{0}")]
    Execution(String),

    #[error("task timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("client transport unavailable: {0}")]
    Transport(String),

    #[error("client reported failure: {0}")]
    ClientReported(String),
}

impl TaskError {
    pub fn unknown_tool(tool: impl Into<String>) -> Self {
        Self::UnknownTool { tool: tool.into() }
    }

    pub fn binding(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Binding {
            param: param.into(),
            reason: reason.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn client_reported(message: impl Into<String>) -> Self {
        Self::ClientReported(message.into())
    }

    /// The failure class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaskError::UnknownTool { .. } => ErrorKind::Validation,
            TaskError::Binding { .. } => ErrorKind::Binding,
            TaskError::Execution(_) => ErrorKind::Execution,
            TaskError::Timeout { .. } => ErrorKind::Timeout,
            TaskError::Transport(_) => ErrorKind::Transport,
            TaskError::ClientReported(_) => ErrorKind::ClientReported,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_message_names_the_tool() {
        let err = TaskError::unknown_tool("quantum_search");
        assert_eq!(format!("{}", err), "tool 'quantum_search' not found");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn binding_error_names_parameter_and_reason() {
        let err = TaskError::binding("content", "source task 'search0' is pending, not completed");
        assert!(format!("{}", err).contains("'content'"));
        assert_eq!(err.kind(), ErrorKind::Binding);
    }

    #[test]
    fn timeout_error_carries_the_bound() {
        let err = TaskError::timeout(50);
        assert_eq!(format!("{}", err), "task timed out after 50ms");
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn error_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::ClientReported).unwrap(),
            "\"client_reported\""
        );
    }

    #[test]
    fn each_variant_maps_to_its_kind() {
        assert_eq!(TaskError::execution("boom").kind(), ErrorKind::Execution);
        assert_eq!(TaskError::transport("no session").kind(), ErrorKind::Transport);
        assert_eq!(
            TaskError::client_reported("permission denied").kind(),
            ErrorKind::ClientReported
        );
    }
}
