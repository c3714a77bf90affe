use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sitelog", version, about = "Inspect and maintain sitelog tables")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "sitelog.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List log records, newest first (default)
    List(crate::commands::logs::ListArgs),

    /// Delete records by id range (inclusive)
    Delete(crate::commands::logs::DeleteArgs),

    /// Remove every record and restart ids at 1
    Clear(crate::commands::logs::ClearArgs),

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display effective configuration (with credentials masked)
    Show,

    /// Validate configuration file
    Validate,
}

impl Cli {
    /// Get the command to execute, defaulting to List if none provided
    pub fn get_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::List(Default::default()))
    }
}
