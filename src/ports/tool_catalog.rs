//! ToolCatalog port - Interface for tool name validation and schemas.
//!
//! The orchestrator consults the catalog exactly once per task at
//! registration; an unknown tool fails the task before it can ever be
//! dispatched. Schemas are carried for the planner and the client, not
//! enforced by the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::task::ExecutionTarget;

/// Catalog entry for one tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,

    /// Where implementations of this tool run.
    pub execution_target: ExecutionTarget,

    pub description: String,

    /// JSON Schema for the tool's parameters.
    #[serde(default)]
    pub parameters_schema: Value,

    /// JSON Schema for the `output.data` shape the tool produces.
    #[serde(default)]
    pub output_schema: Value,
}

impl ToolSpec {
    /// Creates a spec with empty schemas.
    pub fn new(
        name: impl Into<String>,
        execution_target: ExecutionTarget,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            execution_target,
            description: description.into(),
            parameters_schema: Value::Null,
            output_schema: Value::Null,
        }
    }

    /// Sets the parameter schema.
    pub fn with_parameters_schema(mut self, schema: Value) -> Self {
        self.parameters_schema = schema;
        self
    }

    /// Sets the output schema.
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = schema;
        self
    }
}

/// Port answering "is tool X known?" and exposing tool schemas.
pub trait ToolCatalog: Send + Sync {
    /// Whether a tool name is registered.
    fn is_known(&self, name: &str) -> bool;

    /// The catalog entry for a tool, if registered.
    fn definition(&self, name: &str) -> Option<ToolSpec>;

    /// All registered tool names.
    fn tool_names(&self) -> Vec<String>;
}
