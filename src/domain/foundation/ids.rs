//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// User identifier (typically from the auth/transport layer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new UserId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::empty_field("user_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Planner-assigned task identifier, unique within one registered batch.
///
/// Task ids come from the upstream planner as plain strings ("search0",
/// "create_folder"), so unlike connection ids they are not UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a new TaskId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::empty_field("task_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_accepts_non_empty_string() {
        let id = UserId::new("user-123").unwrap();
        assert_eq!(id.as_str(), "user-123");
    }

    #[test]
    fn user_id_rejects_empty_string() {
        let result = UserId::new("");
        assert!(result.is_err());
        match result {
            Err(ValidationError::EmptyField { field }) => assert_eq!(field, "user_id"),
            _ => panic!("Expected EmptyField error"),
        }
    }

    #[test]
    fn user_id_displays_correctly() {
        let id = UserId::new("user-456").unwrap();
        assert_eq!(format!("{}", id), "user-456");
    }

    #[test]
    fn user_id_serializes_transparently() {
        let id = UserId::new("user-789").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"user-789\"");
    }

    #[test]
    fn task_id_accepts_non_empty_string() {
        let id = TaskId::new("search0").unwrap();
        assert_eq!(id.as_str(), "search0");
    }

    #[test]
    fn task_id_rejects_empty_string() {
        let result = TaskId::new("");
        assert!(result.is_err());
    }

    #[test]
    fn task_id_orders_lexicographically() {
        let a = TaskId::new("task_a").unwrap();
        let b = TaskId::new("task_b").unwrap();
        assert!(a < b);
    }

    #[test]
    fn task_id_deserializes_from_plain_string() {
        let id: TaskId = serde_json::from_str("\"create_folder\"").unwrap();
        assert_eq!(id.as_str(), "create_folder");
    }
}
