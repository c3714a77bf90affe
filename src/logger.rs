//! Logging facade
//!
//! Every entry point funnels into [`Logger::dispatch`]:
//!
//! ```text
//! format ─▶ tracer (origin) ─▶ ignore set ─┬─▶ console sink
//!                                          └─▶ writer ─▶ persistent sink
//! ```
//!
//! Entry points are `#[track_caller]`; the caller's location is threaded
//! through as the tracer's anchor together with an explicit
//! `frames_to_skip`, so the reported origin never depends on how many
//! internal calls sit between the entry point and the tracer.

use crate::color::LogColor;
use crate::config::{validate_settings, LogSettings};
use crate::console::ConsoleSink;
use crate::error::StoreError;
use crate::filter::IgnoreSet;
use crate::store::{LogPage, LogRecord, PersistWriter, PersistentSink};
use crate::tracer;
use arc_swap::{ArcSwap, ArcSwapOption};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Where a persisted line goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination<'a> {
    /// `default_table`, appended without a cap
    Default,
    /// A named table, capped at `max_rows`
    Table(&'a str),
}

impl<'a> From<Option<&'a str>> for Destination<'a> {
    fn from(table: Option<&'a str>) -> Self {
        match table {
            Some(table) => Destination::Table(table),
            None => Destination::Default,
        }
    }
}

struct AttachedStore {
    sink: Arc<PersistentSink>,
    writer: PersistWriter,
}

/// Call-site aware, multi-sink logger
pub struct Logger {
    settings: ArcSwap<LogSettings>,
    ignore: ArcSwap<IgnoreSet>,
    console: ConsoleSink,
    store: ArcSwapOption<AttachedStore>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(ConsoleSink::stdout())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("settings", &self.settings.load_full())
            .field("ignore", &self.ignore.load_full())
            .field("store_attached", &self.store.load().is_some())
            .finish()
    }
}

impl Logger {
    /// Console-only logger with default settings
    pub fn new(console: ConsoleSink) -> Self {
        Self::with_settings(LogSettings::default(), console)
    }

    /// Logger seeded from `settings` (including its ignore list). No store is
    /// attached; see [`connect`](Self::connect).
    pub fn with_settings(settings: LogSettings, console: ConsoleSink) -> Self {
        let logger = Self {
            settings: ArcSwap::from_pointee(LogSettings::default()),
            ignore: ArcSwap::from_pointee(IgnoreSet::new()),
            console,
            store: ArcSwapOption::empty(),
        };
        logger.configure(settings);
        logger
    }

    /// Logger with the store described by `settings.store` attached.
    ///
    /// A store that cannot be reached is reported on the console and the
    /// logger runs console-only.
    pub async fn connect(settings: LogSettings, console: ConsoleSink) -> Self {
        let store_settings = settings.store.clone();
        let logger = Self::with_settings(LogSettings { persist: false, ..settings.clone() }, console);

        if let Some(store_settings) = store_settings {
            match PersistentSink::connect(&store_settings, logger.console.clone()).await {
                Ok(sink) => {
                    logger.attach_store(sink);
                }
                Err(e) => logger.internal_error(&e),
            }
        }

        logger.configure(settings);
        logger
    }

    pub fn console(&self) -> &ConsoleSink {
        &self.console
    }

    // ---- administration -------------------------------------------------

    /// Current settings snapshot
    pub fn settings(&self) -> Arc<LogSettings> {
        self.settings.load_full()
    }

    /// Replace the settings. The ignore set is replaced by `settings.ignore`.
    ///
    /// Invalid settings are reported and rejected, and persistence is switched
    /// off until a valid configuration arrives. Asking for persistence without
    /// an attached store is reported; lines then go to the console only.
    pub fn configure(&self, settings: LogSettings) -> bool {
        if let Err(e) = validate_settings(&settings) {
            self.internal_message(&e.to_string());
            self.settings.rcu(|current| LogSettings {
                persist: false,
                ..LogSettings::clone(current)
            });
            return false;
        }

        if let Some(attached) = self.store.load().as_ref() {
            attached.sink.set_batch_limit(settings.batch_limit);
            if settings.persist {
                attached.writer.ensure(settings.default_table.clone());
            }
        } else if settings.persist {
            self.internal_error(&StoreError::NotConfigured);
        }

        tracing::debug!(
            default_table = %settings.default_table,
            persist = settings.persist,
            console = settings.console,
            max_rows = settings.max_rows,
            "Logger configured"
        );
        self.ignore
            .store(Arc::new(settings.ignore.iter().cloned().collect()));
        self.settings.store(Arc::new(settings));
        true
    }

    /// Hand the store to this logger and start its writer task.
    ///
    /// Must be called inside a tokio runtime; returns `false` otherwise.
    pub fn attach_store(&self, sink: PersistentSink) -> bool {
        let sink = Arc::new(sink);
        let Some(writer) = PersistWriter::spawn(sink.clone()) else {
            self.internal_message("log store needs a tokio runtime");
            return false;
        };

        let settings = self.settings.load();
        sink.set_batch_limit(settings.batch_limit);
        writer.ensure(settings.default_table.clone());

        self.store.store(Some(Arc::new(AttachedStore { sink, writer })));
        true
    }

    /// Detach the store; queued writes still drain in the background
    pub fn detach_store(&self) -> Option<Arc<PersistentSink>> {
        self.store.swap(None).map(|attached| attached.sink.clone())
    }

    pub fn store(&self) -> Option<Arc<PersistentSink>> {
        self.store.load().as_ref().map(|attached| attached.sink.clone())
    }

    /// Persistence is on and has somewhere to go
    pub fn persisting(&self) -> bool {
        self.settings.load().persist && self.store.load().is_some()
    }

    pub fn ignored(&self) -> Arc<IgnoreSet> {
        self.ignore.load_full()
    }

    /// Drop every message containing `needle`
    pub fn ignore(&self, needle: &str) {
        self.ignore.rcu(|set| set.with(needle));
    }

    pub fn unignore(&self, needle: &str) {
        self.ignore.rcu(|set| set.without(needle));
    }

    pub fn set_ignored<I, S>(&self, needles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.store(Arc::new(needles.into_iter().collect()));
    }

    // ---- entry points ---------------------------------------------------

    /// Log to the default table
    #[track_caller]
    pub fn log(&self, color: LogColor, message: impl fmt::Display) {
        self.dispatch(color, Destination::Default, Location::caller(), 0, format_args!("{message}"));
    }

    /// Log to a named table
    #[track_caller]
    pub fn log_to(&self, table: &str, color: LogColor, message: impl fmt::Display) {
        self.dispatch(color, Destination::Table(table), Location::caller(), 0, format_args!("{message}"));
    }

    /// Formatted variant, used by the `log_*!` macros
    #[track_caller]
    pub fn log_fmt(&self, color: LogColor, args: fmt::Arguments<'_>) {
        self.dispatch(color, Destination::Default, Location::caller(), 0, args);
    }

    #[track_caller]
    pub fn log_fmt_to(&self, table: &str, color: LogColor, args: fmt::Arguments<'_>) {
        self.dispatch(color, Destination::Table(table), Location::caller(), 0, args);
    }

    /// Attribute the line to an ancestor of the caller: `depth = 0` is the
    /// caller itself, 1 its caller, and so on. For helpers that log on behalf
    /// of whoever called them.
    #[track_caller]
    pub fn trace(&self, color: LogColor, depth: usize, message: impl fmt::Display) {
        self.dispatch(color, Destination::Default, Location::caller(), depth, format_args!("{message}"));
    }

    #[track_caller]
    pub fn trace_fmt(&self, color: LogColor, depth: usize, args: fmt::Arguments<'_>) {
        self.dispatch(color, Destination::Default, Location::caller(), depth, args);
    }

    /// Log `err` in red if present and report whether it was.
    ///
    /// ```ignore
    /// if logger.check_error(file.sync_all().err()) {
    ///     return;
    /// }
    /// ```
    #[track_caller]
    pub fn check_error<E: fmt::Display>(&self, err: Option<E>) -> bool {
        self.check_error_at(err, 0)
    }

    /// Like [`check_error`](Self::check_error), attributed `depth` frames up
    #[track_caller]
    pub fn check_error_at<E: fmt::Display>(&self, err: Option<E>, depth: usize) -> bool {
        match err {
            Some(err) => {
                self.dispatch(LogColor::Red, Destination::Default, Location::caller(), depth, format_args!("{err}"));
                true
            }
            None => false,
        }
    }

    #[track_caller]
    pub fn check_result<T, E: fmt::Display>(&self, result: &Result<T, E>) -> bool {
        self.check_error_at(result.as_ref().err(), 0)
    }

    /// Timestamped coloured console line, with no origin, filter or store
    pub fn output(&self, color: LogColor, message: impl fmt::Display) {
        self.console.plain(&message.to_string(), color);
    }

    fn dispatch(
        &self,
        color: LogColor,
        destination: Destination<'_>,
        anchor: &Location<'_>,
        frames_to_skip: usize,
        args: fmt::Arguments<'_>,
    ) {
        let message = match args.as_str() {
            Some(text) => text.to_string(),
            None => fmt::format(args),
        };
        let origin = tracer::capture_origin(anchor, frames_to_skip);

        if self.ignore.load().should_drop(&message) {
            return;
        }

        let settings = self.settings.load();

        if settings.console {
            self.console.emit(&message, &origin, color);
        }

        if settings.persist {
            if let Some(attached) = self.store.load().as_ref() {
                let (table, max_rows) = match destination {
                    Destination::Default => (settings.default_table.clone(), None),
                    Destination::Table(table) => (table.to_string(), Some(settings.max_rows)),
                };
                if !attached.writer.write(table, LogRecord::new(color, message, origin), max_rows) {
                    self.internal_message("log writer stopped");
                }
            }
        }
    }

    // ---- retrieval surface ---------------------------------------------

    /// Page of `table` (default table when `None`), newest first
    pub async fn list_logs(
        &self,
        table: Option<&str>,
        page: u32,
        page_size: u32,
        origin_prefix: &str,
    ) -> LogPage {
        let table = self.table_name(table);
        match self.store() {
            Some(sink) => sink.query(&table, page, page_size, origin_prefix).await,
            None => {
                self.internal_error(&StoreError::NotConfigured);
                LogPage::default()
            }
        }
    }

    /// Delete ids in `[id_start, id_stop]`
    pub async fn delete_logs(&self, table: Option<&str>, id_start: i64, id_stop: i64) -> u64 {
        let table = self.table_name(table);
        match self.store() {
            Some(sink) => sink.delete_range(&table, id_start, id_stop).await,
            None => {
                self.internal_error(&StoreError::NotConfigured);
                0
            }
        }
    }

    pub async fn clear_logs(&self, table: Option<&str>) -> bool {
        let table = self.table_name(table);
        match self.store() {
            Some(sink) => sink.clear(&table).await,
            None => {
                self.internal_error(&StoreError::NotConfigured);
                false
            }
        }
    }

    /// Insert prepared records in one transaction, bypassing the console and
    /// the ignore set. Returns how many were written; re-invoke with the rest
    /// when the batch limit cut it short.
    pub async fn save_batch(&self, table: Option<&str>, records: &[LogRecord]) -> usize {
        let table = self.table_name(table);
        match self.store() {
            Some(sink) => sink.insert_batch(&table, records).await,
            None => {
                self.internal_error(&StoreError::NotConfigured);
                0
            }
        }
    }

    /// Wait for queued persistent writes
    pub async fn flush(&self) {
        let writer = self.store.load().as_ref().map(|attached| attached.writer.clone());
        if let Some(writer) = writer {
            writer.flush().await;
        }
    }

    fn table_name(&self, table: Option<&str>) -> String {
        match table {
            Some(table) => table.to_string(),
            None => self.settings.load().default_table.clone(),
        }
    }

    /// Console-only diagnostic about the logger itself, never persisted
    #[track_caller]
    fn internal_error(&self, err: &StoreError) {
        tracing::warn!(kind = err.kind(), error = %err, "Logger fault");
        self.internal_message(&err.to_string());
    }

    #[track_caller]
    fn internal_message(&self, message: &str) {
        let origin = tracer::origin_of(Location::caller());
        self.console.emit(message, &origin, LogColor::Red);
    }
}

/// Per-colour shorthands: `red(msg)` logs to the default table, `red_to(table, msg)`
/// to a named one.
macro_rules! colour_entry_points {
    ($($color:ident => $plain:ident, $to:ident;)*) => {
        impl Logger {
            $(
                #[track_caller]
                pub fn $plain(&self, message: impl fmt::Display) {
                    self.dispatch(
                        LogColor::$color,
                        Destination::Default,
                        Location::caller(),
                        0,
                        format_args!("{message}"),
                    );
                }

                #[track_caller]
                pub fn $to(&self, table: &str, message: impl fmt::Display) {
                    self.dispatch(
                        LogColor::$color,
                        Destination::Table(table),
                        Location::caller(),
                        0,
                        format_args!("{message}"),
                    );
                }
            )*
        }
    };
}

colour_entry_points! {
    Black => black, black_to;
    Red => red, red_to;
    Green => green, green_to;
    Yellow => yellow, yellow_to;
    Blue => blue, blue_to;
    Magenta => magenta, magenta_to;
    Cyan => cyan, cyan_to;
    White => white, white_to;
}
