//! Execution engine configuration

use std::time::Duration;

use serde::Deserialize;

use super::error::ValidationError;

/// Driver-loop tuning for the execution engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Safety bound on driver iterations per planning cycle.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Consecutive empty polls before the driver gives up on tasks that
    /// are permanently blocked by failed dependencies.
    #[serde(default = "default_max_idle")]
    pub max_idle: u32,

    /// Sleep between polls that found no runnable work.
    #[serde(default = "default_idle_sleep_ms")]
    pub idle_sleep_ms: u64,

    /// Sleep after a dispatching iteration, before re-polling.
    #[serde(default = "default_poll_sleep_ms")]
    pub poll_sleep_ms: u64,
}

impl EngineConfig {
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }

    pub fn poll_sleep(&self) -> Duration {
        Duration::from_millis(self.poll_sleep_ms)
    }

    /// Validate engine configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_iterations == 0 {
            return Err(ValidationError::InvalidEngineBound("max_iterations"));
        }
        if self.max_idle == 0 {
            return Err(ValidationError::InvalidEngineBound("max_idle"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_idle: default_max_idle(),
            idle_sleep_ms: default_idle_sleep_ms(),
            poll_sleep_ms: default_poll_sleep_ms(),
        }
    }
}

fn default_max_iterations() -> u32 {
    100
}

fn default_max_idle() -> u32 {
    5
}

fn default_idle_sleep_ms() -> u64 {
    500
}

fn default_poll_sleep_ms() -> u64 {
    300
}
