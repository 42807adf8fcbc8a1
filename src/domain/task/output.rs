//! TaskOutput - structured result of one task execution.

use serde::{Deserialize, Serialize};

use super::JsonMap;

/// Result payload produced by a tool adapter or a client acknowledgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub success: bool,

    #[serde(default)]
    pub data: JsonMap,

    #[serde(default)]
    pub error: Option<String>,
}

impl TaskOutput {
    /// A successful output carrying structured data.
    pub fn success(data: JsonMap) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    /// A failed output with no data and a populated error.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: JsonMap::new(),
            error: Some(error.into()),
        }
    }
}
