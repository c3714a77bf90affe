//! Background writer feeding the persistent sink
//!
//! The logging facade is synchronous and must never wait on the store, so
//! each persisted line is sent over an unbounded channel to one task that
//! applies writes in arrival order.

use super::sink::PersistentSink;
use super::LogRecord;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug)]
enum WriterMessage {
    /// Create a table ahead of its first write
    Ensure(String),
    /// `max_rows: None` appends unconditionally
    Insert {
        table: String,
        record: LogRecord,
        max_rows: Option<i64>,
    },
    Flush(oneshot::Sender<()>),
}

/// Writer handle
///
/// Cloning shares the same background task. The task ends once every
/// handle is dropped and the queue is drained.
#[derive(Debug, Clone)]
pub struct PersistWriter {
    sender: mpsc::UnboundedSender<WriterMessage>,
}

impl PersistWriter {
    /// Spawn the writer task on the current tokio runtime.
    ///
    /// Returns `None` when called outside a runtime.
    pub fn spawn(sink: Arc<PersistentSink>) -> Option<Self> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let (tx, rx) = mpsc::unbounded_channel();

        handle.spawn(async move {
            writer_task(sink, rx).await;
        });

        Some(Self { sender: tx })
    }

    /// Queue a record (non-blocking). `false` if the task is gone.
    pub fn write(&self, table: impl Into<String>, record: LogRecord, max_rows: Option<i64>) -> bool {
        self.sender
            .send(WriterMessage::Insert {
                table: table.into(),
                record,
                max_rows,
            })
            .is_ok()
    }

    pub fn ensure(&self, table: impl Into<String>) -> bool {
        self.sender.send(WriterMessage::Ensure(table.into())).is_ok()
    }

    /// Wait until everything queued before this call has been applied
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(WriterMessage::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

async fn writer_task(sink: Arc<PersistentSink>, mut rx: mpsc::UnboundedReceiver<WriterMessage>) {
    while let Some(msg) = rx.recv().await {
        match msg {
            WriterMessage::Ensure(table) => {
                sink.ensure_table(&table).await;
            }
            WriterMessage::Insert {
                table,
                record,
                max_rows: Some(max_rows),
            } => {
                sink.insert_bounded(&table, &record, max_rows).await;
            }
            WriterMessage::Insert {
                table,
                record,
                max_rows: None,
            } => {
                sink.insert(&table, &record).await;
            }
            WriterMessage::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    tracing::debug!("Log writer task shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::LogColor;
    use crate::config::StoreSettings;
    use crate::console::{BufferConsole, ConsoleSink};

    async fn create_test_sink() -> Arc<PersistentSink> {
        let console = ConsoleSink::new(Arc::new(BufferConsole::new()));
        let sink = PersistentSink::connect(&StoreSettings::sqlite_memory(), console)
            .await
            .unwrap();
        Arc::new(sink)
    }

    #[test]
    fn test_spawn_outside_runtime_is_none() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let sink = runtime.block_on(create_test_sink());
        assert!(PersistWriter::spawn(sink).is_none());
    }

    #[tokio::test]
    async fn test_writes_apply_in_order() {
        let sink = create_test_sink().await;
        let writer = PersistWriter::spawn(sink.clone()).unwrap();

        writer.ensure("sitelog");
        for i in 0..5 {
            let record = LogRecord::new(LogColor::Blue, format!("Message {}", i), "writer.rs:1");
            assert!(writer.write("sitelog", record, None));
        }
        writer.flush().await;

        let page = sink.query("sitelog", 0, 10, "").await;
        assert_eq!(page.total, 5);
        assert_eq!(page.records[0].message, "Message 4");
        assert_eq!(page.records[4].message, "Message 0");
    }

    #[tokio::test]
    async fn test_bounded_writes_respect_cap() {
        let sink = create_test_sink().await;
        let writer = PersistWriter::spawn(sink.clone()).unwrap();

        for i in 0..7 {
            let record = LogRecord::new(LogColor::Blue, format!("tick {}", i), "writer.rs:1");
            writer.write("device_1", record, Some(3));
        }
        writer.flush().await;

        assert_eq!(sink.count("device_1").await, 3);
    }
}
