//! StaticToolIndex - the built-in tool catalog.
//!
//! Tools are indexed at startup; the orchestrator consults the index once
//! per task at registration. The built-in entries cover the server-side
//! search tool and the client-side system tools the planner can target.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::json;

use crate::domain::task::ExecutionTarget;
use crate::ports::{ToolCatalog, ToolSpec};

static BUILTIN_TOOLS: Lazy<Vec<ToolSpec>> = Lazy::new(|| {
    vec![
        ToolSpec::new(
            "web_search",
            ExecutionTarget::Server,
            "Search the web and return ranked results",
        )
        .with_parameters_schema(json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "max_results": {"type": "integer", "default": 10}
            },
            "required": ["query"]
        }))
        .with_output_schema(json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "results": {"type": "array"},
                "total_results": {"type": "integer"},
                "search_time_ms": {"type": "number"},
                "formatted_results": {"type": "string"}
            }
        })),
        ToolSpec::new(
            "open_app",
            ExecutionTarget::Client,
            "Open an application on the user's device",
        )
        .with_parameters_schema(json!({
            "type": "object",
            "properties": {"target": {"type": "string"}},
            "required": ["target"]
        })),
        ToolSpec::new(
            "close_app",
            ExecutionTarget::Client,
            "Close an application on the user's device",
        )
        .with_parameters_schema(json!({
            "type": "object",
            "properties": {"target": {"type": "string"}},
            "required": ["target"]
        })),
        ToolSpec::new(
            "folder_create",
            ExecutionTarget::Client,
            "Create a folder on the user's device",
        )
        .with_parameters_schema(json!({
            "type": "object",
            "properties": {"path": {"type": "string"}},
            "required": ["path"]
        }))
        .with_output_schema(json!({
            "type": "object",
            "properties": {"folder_path": {"type": "string"}}
        })),
        ToolSpec::new(
            "file_create",
            ExecutionTarget::Client,
            "Create a file with content on the user's device",
        )
        .with_parameters_schema(json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "content": {"type": "string"}
            },
            "required": ["path"]
        }))
        .with_output_schema(json!({
            "type": "object",
            "properties": {"path": {"type": "string"}, "size_bytes": {"type": "integer"}}
        })),
        ToolSpec::new(
            "file_search",
            ExecutionTarget::Client,
            "Search files on the user's device",
        )
        .with_parameters_schema(json!({
            "type": "object",
            "properties": {"query": {"type": "string"}},
            "required": ["query"]
        })),
    ]
});

/// Tool catalog backed by an in-memory table.
pub struct StaticToolIndex {
    tools: HashMap<String, ToolSpec>,
}

impl StaticToolIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// The index with all built-in tools registered.
    pub fn with_builtins() -> Self {
        let mut index = Self::new();
        for spec in BUILTIN_TOOLS.iter() {
            index.register(spec.clone());
        }
        index
    }

    /// Registers (or replaces) a tool entry.
    pub fn register(&mut self, spec: ToolSpec) {
        self.tools.insert(spec.name.clone(), spec);
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for StaticToolIndex {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ToolCatalog for StaticToolIndex {
    fn is_known(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    fn definition(&self, name: &str) -> Option<ToolSpec> {
        self.tools.get(name).cloned()
    }

    fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}
