//! Persistent sink
//!
//! Log tables in a relational store reached through sqlx's `Any` driver:
//!
//! ```text
//! facade ──(channel)──▶ writer task ──▶ PersistentSink ──▶ AnyPool
//!                                        │
//!                                        └─ Dialect (DDL, truncation, errors)
//! ```
//!
//! Tables are created lazily, re-created once when a write reports them
//! missing, and never dropped. Named tables can be capped, in which case they
//! behave as ring buffers that overwrite their oldest row.

pub mod dialect;
pub mod sink;
pub mod writer;

pub use dialect::{Dialect, MySql, Sqlite, StoreKind};
pub use sink::PersistentSink;
pub use writer::PersistWriter;

use crate::color::LogColor;
use crate::error::{StoreError, StoreResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Text layout of `created_at` as written and read back
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const MAX_TABLE_NAME_LEN: usize = 64;

/// A row of a log table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Assigned by the store; `None` until persisted
    pub id: Option<i64>,
    /// ANSI colour code, see [`LogColor::code`]
    pub color: i64,
    pub message: String,
    /// `file.rs:LINE` of the log call
    pub origin: String,
    /// Write time; `None` is replaced with the current time on insert
    pub created_at: Option<NaiveDateTime>,
}

impl LogRecord {
    pub fn new(color: LogColor, message: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            id: None,
            color: color.code(),
            message: message.into(),
            origin: origin.into(),
            created_at: None,
        }
    }

    pub fn at(mut self, created_at: NaiveDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn log_color(&self) -> Option<LogColor> {
        LogColor::from_code(self.color)
    }
}

/// One page of a table, newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogPage {
    pub records: Vec<LogRecord>,
    /// Row count of the whole table, ignoring any origin filter
    pub total: i64,
}

/// Table names are spliced into SQL, so only plain identifiers are accepted
pub fn check_table_name(name: &str) -> StoreResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                && name.len() <= MAX_TABLE_NAME_LEN
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTable(name.to_string()))
    }
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_PARSE_FORMAT).ok()
}
