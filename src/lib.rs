//! Call-site aware, multi-sink diagnostic logger
//!
//! Each message is attributed to the `file.rs:LINE` that logged it, filtered
//! against an ignore set, printed as a coloured timestamped console line and
//! optionally persisted into auto-provisioned, size-bounded tables.

#[macro_use]
mod macros;

pub mod color;
pub mod config;
pub mod console;
pub mod error;
pub mod filter;
pub mod logger;
pub mod store;
pub mod tracer;

pub use color::LogColor;
pub use config::{load_settings, LogSettings, StoreSettings};
pub use console::{BufferConsole, ConsoleSink, ConsoleWriter, StdoutConsole};
pub use error::{StoreError, StoreResult};
pub use filter::IgnoreSet;
pub use logger::{Destination, Logger};
pub use store::{LogPage, LogRecord, PersistentSink, StoreKind};

use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static GLOBAL: OnceLock<Logger> = OnceLock::new();

/// Initialize tracing for the crate's own diagnostics
///
/// Note: This function can only be called once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

/// Install the process-wide logger used by the `log_*!` macros.
///
/// Fails, handing the logger back, if one is already installed or
/// [`global`] was already called.
pub fn install(logger: Logger) -> Result<(), Logger> {
    GLOBAL.set(logger)
}

/// The process-wide logger; a console-only default unless [`install`] ran first
pub fn global() -> &'static Logger {
    GLOBAL.get_or_init(Logger::default)
}
