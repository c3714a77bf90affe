//! SQL dialects
//!
//! The two supported stores differ only in auto-increment DDL, truncation
//! and the error they raise for a missing table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which dialect a store speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[serde(alias = "mariadb")]
    MySql,
    Sqlite,
}

impl StoreKind {
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            StoreKind::MySql => &MySql,
            StoreKind::Sqlite => &Sqlite,
        }
    }

    /// Guess from a connection URL scheme
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?.to_ascii_lowercase();
        match scheme.as_str() {
            "mysql" | "mariadb" => Some(StoreKind::MySql),
            "sqlite" => Some(StoreKind::Sqlite),
            _ => None,
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dialect().name())
    }
}

pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Idempotent `CREATE TABLE IF NOT EXISTS` for a log table
    fn create_table_sql(&self, table: &str) -> String;

    /// Statements emptying a table and restarting its identity at 1
    fn truncate_statements(&self, table: &str) -> Vec<String>;

    /// Select expression rendering `created_at` as text
    fn created_at_column(&self) -> &'static str;

    /// Does `err` say the table does not exist?
    fn is_missing_table(&self, err: &sqlx::Error) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn create_table_sql(&self, table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message TEXT NOT NULL,
                origin VARCHAR(255) NOT NULL,
                color INTEGER,
                created_at TEXT DEFAULT (STRFTIME('%Y-%m-%d %H:%M:%f', 'now', 'localtime'))
            )"
        )
    }

    fn truncate_statements(&self, table: &str) -> Vec<String> {
        vec![
            format!("DELETE FROM {table}"),
            format!("DELETE FROM sqlite_sequence WHERE name = '{table}'"),
        ]
    }

    fn created_at_column(&self) -> &'static str {
        "created_at"
    }

    fn is_missing_table(&self, err: &sqlx::Error) -> bool {
        err.as_database_error()
            .map(|db| db.message().contains("no such table"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn create_table_sql(&self, table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                message TEXT NOT NULL,
                origin VARCHAR(255) NOT NULL,
                color INT,
                created_at TIMESTAMP(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
                INDEX idx_created_at (created_at)
            )"
        )
    }

    fn truncate_statements(&self, table: &str) -> Vec<String> {
        vec![format!("TRUNCATE TABLE {table}")]
    }

    fn created_at_column(&self) -> &'static str {
        "DATE_FORMAT(created_at, '%Y-%m-%d %H:%i:%s.%f')"
    }

    fn is_missing_table(&self, err: &sqlx::Error) -> bool {
        // ER_NO_SUCH_TABLE (1146), SQLSTATE 42S02
        err.as_database_error()
            .map(|db| {
                db.code().as_deref() == Some("42S02")
                    || db.message().contains("1146")
                    || db.message().contains("doesn't exist")
            })
            .unwrap_or(false)
    }
}
