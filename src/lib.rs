//! Task Conductor - Per-user task orchestration engine
//!
//! An upstream planner emits a DAG of tasks per user utterance; this crate
//! registers, schedules, dispatches, and reconciles those tasks across the
//! server-side tool executor and connected client devices.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
