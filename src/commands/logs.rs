//! Log table commands
//!
//! List, delete and clear records of a log table through the persistent sink.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use sitelog::color::paint_code;
use sitelog::config::{self, LogSettings};
use sitelog::store::format_timestamp;
use sitelog::{ConsoleSink, LogPage, LogRecord, PersistentSink};
use std::path::Path;

/// List log records
#[derive(Debug, Clone, Parser)]
pub struct ListArgs {
    /// Table to read (default: the configured default table)
    #[arg(short, long)]
    pub table: Option<String>,

    /// Page number, 0 is the most recent
    #[arg(short, long, default_value = "0")]
    pub page: u32,

    /// Records per page
    #[arg(short, long, default_value = "20")]
    pub size: u32,

    /// Only records whose origin starts with this prefix
    #[arg(short, long, default_value = "")]
    pub origin: String,

    /// Output format (text, json)
    #[arg(short = 'f', long, default_value = "text")]
    pub format: String,
}

impl Default for ListArgs {
    fn default() -> Self {
        Self {
            table: None,
            page: 0,
            size: 20,
            origin: String::new(),
            format: "text".to_string(),
        }
    }
}

/// Delete records by id range
#[derive(Debug, Clone, Parser)]
pub struct DeleteArgs {
    #[arg(short, long)]
    pub table: Option<String>,

    /// First id to delete
    #[arg(long)]
    pub start: i64,

    /// Last id to delete (inclusive)
    #[arg(long)]
    pub stop: i64,
}

/// Remove every record of a table
#[derive(Debug, Clone, Parser)]
pub struct ClearArgs {
    #[arg(short, long)]
    pub table: Option<String>,

    /// Confirm the table should be emptied
    #[arg(long)]
    pub yes: bool,
}

/// Execute the list command
pub async fn list(config_path: &Path, args: ListArgs) -> Result<()> {
    let (settings, sink) = open_store(config_path).await?;
    let table = args.table.unwrap_or(settings.default_table);

    let page = sink.query(&table, args.page, args.size, &args.origin).await;

    match args.format.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&page)?;
            println!("{}", json);
        }
        _ => display_page_text(&table, &page, args.page),
    }

    Ok(())
}

/// Execute the delete command
pub async fn delete(config_path: &Path, args: DeleteArgs) -> Result<()> {
    let (settings, sink) = open_store(config_path).await?;
    let table = args.table.unwrap_or(settings.default_table);

    let deleted = sink.delete_range(&table, args.start, args.stop).await;
    println!(
        "{}",
        format!("Deleted {} records from {} (ids {}..={})", deleted, table, args.start, args.stop)
            .green()
    );

    Ok(())
}

/// Execute the clear command
pub async fn clear(config_path: &Path, args: ClearArgs) -> Result<()> {
    let (settings, sink) = open_store(config_path).await?;
    let table = args.table.unwrap_or(settings.default_table);

    if !args.yes {
        eprintln!("{}", format!("This removes every record in {}.", table).yellow());
        eprintln!("Re-run with --yes to confirm.");
        return Ok(());
    }

    if sink.clear(&table).await {
        println!("{}", format!("Cleared {}", table).green());
    }

    Ok(())
}

async fn open_store(config_path: &Path) -> Result<(LogSettings, PersistentSink)> {
    let settings = config::load_settings(Some(config_path))?;

    let Some(store) = settings.store.clone() else {
        anyhow::bail!(
            "No [store] section in {}; nothing to read logs from",
            config_path.display()
        );
    };

    let sink = PersistentSink::connect(&store, ConsoleSink::stdout()).await?;
    Ok((settings, sink))
}

/// Display a page in human-friendly text format
fn display_page_text(table: &str, page: &LogPage, page_no: u32) {
    if page.records.is_empty() {
        println!("{}", format!("No records in {} (page {})", table, page_no).yellow());
        return;
    }

    println!(
        "{}",
        format!(
            "{}: {} of {} records (page {})",
            table,
            page.records.len(),
            page.total,
            page_no
        )
        .bold()
    );
    println!();

    for record in &page.records {
        println!("{}", format_record(record));
    }
}

fn format_record(record: &LogRecord) -> String {
    let id = record.id.map(|id| format!("#{}", id)).unwrap_or_default();
    let created = record
        .created_at
        .as_ref()
        .map(format_timestamp)
        .unwrap_or_default();

    format!(
        "{} {:>6} {} {}",
        created.dimmed(),
        id,
        record.origin.cyan(),
        paint_code(record.color, &record.message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitelog::LogColor;

    #[test]
    fn test_list_args_parsing() {
        let args = ListArgs::parse_from(["list", "--table", "device_1", "--size", "5"]);
        assert_eq!(args.table.as_deref(), Some("device_1"));
        assert_eq!(args.size, 5);
        assert_eq!(args.page, 0);
        assert_eq!(args.format, "text");
    }

    #[test]
    fn test_list_defaults_match_parser() {
        let parsed = ListArgs::parse_from(["list"]);
        let default = ListArgs::default();
        assert_eq!(parsed.page, default.page);
        assert_eq!(parsed.size, default.size);
        assert_eq!(parsed.origin, default.origin);
        assert_eq!(parsed.format, default.format);
    }

    #[test]
    fn test_format_record_paints_message() {
        let mut record = LogRecord::new(LogColor::Red, "disk full", "io.rs:7");
        record.id = Some(12);

        let line = format_record(&record);
        assert!(line.contains("#12"));
        assert!(line.contains("io.rs:7"));
        assert!(line.contains("\x1b[0;31mdisk full\x1b[0m"));
    }

    #[tokio::test]
    async fn test_open_store_requires_store_section() {
        let path = std::env::temp_dir().join(format!("sitelog-cli-{}.toml", std::process::id()));
        std::fs::write(&path, "default_table = \"app_log\"\n").unwrap();

        let result = open_store(&path).await;
        std::fs::remove_file(&path).ok();

        let err = result.err().unwrap();
        assert!(err.to_string().contains("No [store] section"));
    }
}
