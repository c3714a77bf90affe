//! Command implementations for the CLI
//!
//! - logs: list, delete and clear log records
//! - config: configuration display and validation

pub mod config;
pub mod logs;
