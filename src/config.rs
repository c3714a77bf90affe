use crate::store::{check_table_name, StoreKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_TABLE: &str = "sitelog";
pub const DEFAULT_MAX_ROWS: i64 = 1000;
pub const DEFAULT_BATCH_LIMIT: usize = 100;

/// Process-wide sink configuration
///
/// Read on every log call through an `ArcSwap` snapshot; replaced wholesale
/// by [`crate::Logger::configure`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LogSettings {
    /// Table used by entry points without an explicit destination
    pub default_table: String,
    /// Write log lines to the attached store
    pub persist: bool,
    /// Write log lines to the console
    pub console: bool,
    /// Row cap for named tables; negative means unbounded
    pub max_rows: i64,
    /// Records accepted by one batch insert call
    pub batch_limit: usize,
    /// Substrings suppressing a message, installed at startup
    pub ignore: Vec<String>,
    pub store: Option<StoreSettings>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            default_table: DEFAULT_TABLE.to_string(),
            persist: false,
            console: true,
            max_rows: DEFAULT_MAX_ROWS,
            batch_limit: DEFAULT_BATCH_LIMIT,
            ignore: Vec::new(),
            store: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StoreSettings {
    pub kind: StoreKind,
    /// sqlx connection URL, e.g. `sqlite://./data/log.db?mode=rwc`
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl StoreSettings {
    pub fn sqlite_memory() -> Self {
        Self {
            kind: StoreKind::Sqlite,
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }
}

/// Load settings from an optional TOML file plus `SITELOG__*` environment
/// overrides (e.g. `SITELOG__STORE__URL`).
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<LogSettings> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(false));
    }
    let config = builder
        .add_source(
            config::Environment::with_prefix("SITELOG")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings: LogSettings = config.try_deserialize()?;
    validate_settings(&settings)?;

    Ok(settings)
}

pub fn validate_settings(settings: &LogSettings) -> anyhow::Result<()> {
    check_table_name(&settings.default_table)?;

    if settings.batch_limit == 0 {
        anyhow::bail!("batch_limit must be at least 1");
    }

    if let Some(store) = &settings.store {
        if store.url.trim().is_empty() {
            anyhow::bail!("store.url cannot be empty");
        }
        if store.max_connections == 0 {
            anyhow::bail!("store.max_connections must be at least 1");
        }
    }

    Ok(())
}
