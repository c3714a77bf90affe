//! Log tables in a relational store
//!
//! Every public operation is infallible from the caller's point of view:
//! faults are reported on the console sink (and as `tracing` events) and the
//! operation yields `false`, zero or an empty page.

use super::dialect::{Dialect, StoreKind};
use super::{check_table_name, format_timestamp, parse_timestamp, LogPage, LogRecord};
use crate::color::LogColor;
use crate::config::{StoreSettings, DEFAULT_BATCH_LIMIT};
use crate::console::ConsoleSink;
use crate::error::{StoreError, StoreResult};
use crate::tracer;
use chrono::{DateTime, NaiveDateTime};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use std::panic::Location;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

/// Owner of the store handle and sole reader/writer of log tables
pub struct PersistentSink {
    pool: AnyPool,
    kind: StoreKind,
    console: ConsoleSink,
    batch_limit: AtomicUsize,
    /// Last issued write stamp, microseconds
    last_stamp: AtomicI64,
}

impl PersistentSink {
    /// Open a connection pool for `settings`
    pub async fn connect(settings: &StoreSettings, console: ConsoleSink) -> StoreResult<Self> {
        sqlx::any::install_default_drivers();

        let in_memory = settings.url.contains(":memory:") || settings.url.contains("mode=memory");
        let options = if in_memory {
            // Each connection to an in-memory database is its own database
            AnyPoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            AnyPoolOptions::new().max_connections(settings.max_connections)
        };

        let pool = options.connect(&settings.url).await?;

        tracing::info!(kind = %settings.kind, "Log store connected");

        Ok(Self::from_pool(pool, settings.kind, console))
    }

    pub fn from_pool(pool: AnyPool, kind: StoreKind, console: ConsoleSink) -> Self {
        Self {
            pool,
            kind,
            console,
            batch_limit: AtomicUsize::new(DEFAULT_BATCH_LIMIT),
            last_stamp: AtomicI64::new(i64::MIN),
        }
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    pub fn dialect(&self) -> &'static dyn Dialect {
        self.kind.dialect()
    }

    /// Get the underlying connection pool (for advanced usage)
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn batch_limit(&self) -> usize {
        self.batch_limit.load(Ordering::Relaxed)
    }

    /// Records accepted per [`insert_batch`](Self::insert_batch) call (min 1)
    pub fn set_batch_limit(&self, limit: usize) {
        self.batch_limit.store(limit.max(1), Ordering::Relaxed);
    }

    /// Create `table` if absent. Safe to race: the DDL is idempotent.
    pub async fn ensure_table(&self, table: &str) -> bool {
        match self.create_table(table).await {
            Ok(()) => true,
            Err(e) => {
                self.report("ensure_table", table, &e);
                false
            }
        }
    }

    /// Append one record
    pub async fn insert(&self, table: &str, record: &LogRecord) -> bool {
        let result = match self.try_insert(table, record).await {
            Err(StoreError::Database(e)) if self.dialect().is_missing_table(&e) => {
                self.recreate_and_retry(table, || self.try_insert(table, record)).await
            }
            other => other,
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                self.report("insert", table, &e);
                false
            }
        }
    }

    /// Append while the table's highest id is below `max_rows`, otherwise
    /// overwrite the oldest row in place. Negative `max_rows` is unbounded.
    ///
    /// Capacity follows the highest id, not the row count: rows removed by
    /// [`delete_range`](Self::delete_range) are not refilled, so the ring
    /// stays smaller until [`clear`](Self::clear) restarts ids.
    pub async fn insert_bounded(&self, table: &str, record: &LogRecord, max_rows: i64) -> bool {
        let result = match self.try_insert_bounded(table, record, max_rows).await {
            Err(StoreError::Database(e)) if self.dialect().is_missing_table(&e) => {
                self.recreate_and_retry(table, || self.try_insert_bounded(table, record, max_rows))
                    .await
            }
            other => other,
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                self.report("insert_bounded", table, &e);
                false
            }
        }
    }

    /// Insert up to [`batch_limit`](Self::batch_limit) records in one
    /// transaction and return how many were written.
    ///
    /// The first failure ends the batch; rows written before it are
    /// committed. A missing table is created for the next call, the
    /// remainder of this one is not retried.
    pub async fn insert_batch(&self, table: &str, records: &[LogRecord]) -> usize {
        if records.is_empty() {
            return 0;
        }
        if let Err(e) = check_table_name(table) {
            self.report("insert_batch", table, &e);
            return 0;
        }

        let mut tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                self.report("insert_batch", table, &StoreError::from(e));
                return 0;
            }
        };

        let sql = insert_sql(table);
        let mut written = 0;
        let mut missing_table = false;

        for record in records.iter().take(self.batch_limit()) {
            let stamp = record.created_at.unwrap_or_else(|| self.next_stamp());
            let result = sqlx::query(&sql)
                .bind(record.message.as_str())
                .bind(record.origin.as_str())
                .bind(record.color)
                .bind(format_timestamp(&stamp))
                .execute(&mut *tx)
                .await;

            match result {
                Ok(_) => written += 1,
                Err(e) => {
                    if self.dialect().is_missing_table(&e) {
                        missing_table = true;
                    } else {
                        self.report("insert_batch", table, &StoreError::from(e));
                    }
                    break;
                }
            }
        }

        if let Err(e) = tx.commit().await {
            self.report("insert_batch", table, &StoreError::from(e));
            return 0;
        }

        if missing_table {
            tracing::debug!(table = %table, "Batch hit a missing log table, creating it");
            self.ensure_table(table).await;
        }

        tracing::debug!(table = %table, count = written, "Flushed log batch");
        written
    }

    /// Delete ids in `[id_start, id_stop]`, returning the number removed
    pub async fn delete_range(&self, table: &str, id_start: i64, id_stop: i64) -> u64 {
        match self.try_delete_range(table, id_start, id_stop).await {
            Ok(count) => count,
            Err(e) => {
                self.report("delete_range", table, &e);
                0
            }
        }
    }

    /// Remove every row, keeping the table
    pub async fn clear(&self, table: &str) -> bool {
        match self.try_clear(table).await {
            Ok(()) => true,
            Err(e) => {
                self.report("clear", table, &e);
                false
            }
        }
    }

    /// Page `page` (0 = newest) of `page_size` records, newest first,
    /// optionally limited to origins starting with `origin_prefix`.
    pub async fn query(
        &self,
        table: &str,
        page: u32,
        page_size: u32,
        origin_prefix: &str,
    ) -> LogPage {
        match self.try_query(table, page, page_size, origin_prefix).await {
            Ok(page) => page,
            Err(e) => {
                self.report("query", table, &e);
                LogPage::default()
            }
        }
    }

    /// Current row count, 0 on error
    pub async fn count(&self, table: &str) -> i64 {
        match self.try_count(table).await {
            Ok(n) => n,
            Err(e) => {
                self.report("count", table, &e);
                0
            }
        }
    }

    async fn create_table(&self, table: &str) -> StoreResult<()> {
        check_table_name(table)?;
        sqlx::query(&self.dialect().create_table_sql(table))
            .execute(&self.pool)
            .await?;

        tracing::debug!(table = %table, "Log table ready");
        Ok(())
    }

    async fn recreate_and_retry<F, Fut>(&self, table: &str, retry: F) -> StoreResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = StoreResult<()>>,
    {
        tracing::info!(table = %table, "Log table missing, creating it");
        self.create_table(table).await?;
        match retry().await {
            Err(StoreError::Database(e)) if self.dialect().is_missing_table(&e) => {
                Err(StoreError::MissingTable(table.to_string()))
            }
            other => other,
        }
    }

    async fn try_insert(&self, table: &str, record: &LogRecord) -> StoreResult<()> {
        check_table_name(table)?;
        let stamp = record.created_at.unwrap_or_else(|| self.next_stamp());

        sqlx::query(&insert_sql(table))
            .bind(record.message.as_str())
            .bind(record.origin.as_str())
            .bind(record.color)
            .bind(format_timestamp(&stamp))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn try_insert_bounded(
        &self,
        table: &str,
        record: &LogRecord,
        max_rows: i64,
    ) -> StoreResult<()> {
        check_table_name(table)?;

        let max_id: Option<i64> = sqlx::query_scalar(&format!("SELECT MAX(id) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;

        if max_rows < 0 || max_id.unwrap_or(0) < max_rows {
            return self.try_insert(table, record).await;
        }

        // Oldest write first; equal stamps fall back to the lowest id
        let oldest: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT id FROM {table} ORDER BY created_at ASC, id ASC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        let Some(id) = oldest else {
            // Capacity 0 on an empty table: nothing may be kept
            return Ok(());
        };

        let stamp = record.created_at.unwrap_or_else(|| self.next_stamp());
        sqlx::query(&format!(
            "UPDATE {table} SET message = ?, origin = ?, color = ?, created_at = ? WHERE id = ?"
        ))
        .bind(record.message.as_str())
        .bind(record.origin.as_str())
        .bind(record.color)
        .bind(format_timestamp(&stamp))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn try_delete_range(&self, table: &str, id_start: i64, id_stop: i64) -> StoreResult<u64> {
        check_table_name(table)?;
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id >= ? AND id <= ?"))
            .bind(id_start)
            .bind(id_stop)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn try_clear(&self, table: &str) -> StoreResult<()> {
        check_table_name(table)?;
        for statement in self.dialect().truncate_statements(table) {
            sqlx::query(&statement).execute(&self.pool).await?;
        }

        tracing::info!(table = %table, "Log table cleared");
        Ok(())
    }

    async fn try_count(&self, table: &str) -> StoreResult<i64> {
        check_table_name(table)?;
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn try_query(
        &self,
        table: &str,
        page: u32,
        page_size: u32,
        origin_prefix: &str,
    ) -> StoreResult<LogPage> {
        check_table_name(table)?;

        let mut sql = format!(
            "SELECT id, message, origin, color, {} AS created_at FROM {table}",
            self.dialect().created_at_column()
        );
        if !origin_prefix.is_empty() {
            sql.push_str(" WHERE origin LIKE ? ESCAPE '!'");
        }
        sql.push_str(" ORDER BY id DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if !origin_prefix.is_empty() {
            query = query.bind(format!("{}%", escape_like(origin_prefix)));
        }
        let offset = i64::from(page) * i64::from(page_size);
        let rows = query
            .bind(i64::from(page_size))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let records = rows.iter().map(record_from_row).collect::<StoreResult<Vec<_>>>()?;
        let total = self.try_count(table).await?;

        Ok(LogPage { records, total })
    }

    /// Strictly increasing write stamps, so ring-buffer eviction follows
    /// write order even when the clock does not advance between writes
    fn next_stamp(&self) -> NaiveDateTime {
        let now = chrono::Local::now().naive_local();
        let now_micros = now.and_utc().timestamp_micros();

        let prev = self
            .last_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                Some(now_micros.max(prev.saturating_add(1)))
            })
            .unwrap_or(now_micros);
        let issued = now_micros.max(prev.saturating_add(1));

        DateTime::from_timestamp_micros(issued)
            .map(|dt| dt.naive_utc())
            .unwrap_or(now)
    }

    #[track_caller]
    fn report(&self, operation: &str, table: &str, err: &StoreError) {
        tracing::warn!(
            operation = operation,
            table = %table,
            kind = err.kind(),
            error = %err,
            "Log store operation failed"
        );
        let origin = tracer::origin_of(Location::caller());
        self.console.emit(&format!("{operation} {table}: {err}"), &origin, LogColor::Red);
    }
}

impl std::fmt::Debug for PersistentSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentSink")
            .field("kind", &self.kind)
            .field("batch_limit", &self.batch_limit())
            .finish_non_exhaustive()
    }
}

fn insert_sql(table: &str) -> String {
    format!("INSERT INTO {table} (message, origin, color, created_at) VALUES (?, ?, ?, ?)")
}

/// Escape LIKE wildcards with `!`, matching the `ESCAPE '!'` clause
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '!') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped
}

fn record_from_row(row: &AnyRow) -> StoreResult<LogRecord> {
    let created_at: Option<String> = row.try_get("created_at")?;
    Ok(LogRecord {
        id: Some(row.try_get("id")?),
        color: row.try_get::<Option<i64>, _>("color")?.unwrap_or(0),
        message: row.try_get("message")?,
        origin: row.try_get("origin")?,
        created_at: created_at.as_deref().and_then(parse_timestamp),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferConsole;
    use std::sync::Arc;

    async fn memory_sink() -> (PersistentSink, BufferConsole) {
        let buffer = BufferConsole::new();
        let console = ConsoleSink::new(Arc::new(buffer.clone()));
        let sink = PersistentSink::connect(&StoreSettings::sqlite_memory(), console)
            .await
            .unwrap();
        (sink, buffer)
    }

    fn record(message: &str) -> LogRecord {
        LogRecord::new(LogColor::Green, message, "sink.rs:1")
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("main.rs"), "main.rs");
        assert_eq!(escape_like("a_b%c!"), "a!_b!%c!!");
    }

    #[tokio::test]
    async fn test_ensure_table_is_idempotent() {
        let (sink, console) = memory_sink().await;
        assert!(sink.ensure_table("sitelog").await);
        assert!(sink.ensure_table("sitelog").await);
        assert_eq!(sink.count("sitelog").await, 0);
        assert!(console.is_empty());
    }

    #[tokio::test]
    async fn test_insert_creates_missing_table() {
        let (sink, console) = memory_sink().await;

        assert!(sink.insert("device_7", &record("boot")).await);

        let page = sink.query("device_7", 0, 10, "").await;
        assert_eq!(page.total, 1);
        assert_eq!(page.records[0].message, "boot");
        assert_eq!(page.records[0].id, Some(1));
        assert!(page.records[0].created_at.is_some());
        assert!(console.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_table_is_reported_not_raised() {
        let (sink, console) = memory_sink().await;

        assert!(!sink.insert("bad name", &record("x")).await);
        assert_eq!(sink.delete_range("bad name", 1, 2).await, 0);

        let lines = console.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("invalid log table name"));
        assert!(lines[0].starts_with("\x1b[0;31m"));
    }

    #[tokio::test]
    async fn test_query_missing_table_reports_and_is_empty() {
        let (sink, console) = memory_sink().await;

        let page = sink.query("never_created", 0, 10, "").await;
        assert_eq!(page, LogPage::default());
        assert_eq!(console.len(), 1);
        assert!(console.lines()[0].contains("no such table"));
    }

    #[tokio::test]
    async fn test_stamps_strictly_increase() {
        let (sink, _) = memory_sink().await;
        let mut prev = sink.next_stamp();
        for _ in 0..1000 {
            let next = sink.next_stamp();
            assert!(next > prev);
            prev = next;
        }
    }

    #[tokio::test]
    async fn test_explicit_timestamp_is_kept() {
        let (sink, _) = memory_sink().await;
        let at = parse_timestamp("2020-01-02 03:04:05.000006").unwrap();

        assert!(sink.insert("sitelog", &record("old").at(at)).await);

        let page = sink.query("sitelog", 0, 1, "").await;
        assert_eq!(page.records[0].created_at, Some(at));
    }
}
