/// Integration tests for the logging facade: origins, filtering, sinks
use sitelog::{
    BufferConsole, ConsoleSink, LogColor, LogSettings, Logger, StoreSettings,
};
use std::sync::Arc;

fn console_logger() -> (Logger, BufferConsole) {
    let buffer = BufferConsole::new();
    let logger = Logger::new(ConsoleSink::new(Arc::new(buffer.clone())));
    (logger, buffer)
}

async fn persisting_logger(settings: LogSettings) -> (Logger, BufferConsole) {
    let buffer = BufferConsole::new();
    let settings = LogSettings {
        persist: true,
        store: Some(StoreSettings::sqlite_memory()),
        ..settings
    };
    let logger = Logger::connect(settings, ConsoleSink::new(Arc::new(buffer.clone()))).await;
    (logger, buffer)
}

fn here(line: u32) -> String {
    format!("facade_tests.rs:{}", line)
}

#[test]
fn test_colour_shorthand_reports_caller_line() {
    let (logger, buffer) = console_logger();

    let line = line!() + 1;
    logger.green("server started");

    let lines = buffer.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("\x1b[0;32m"));
    assert!(lines[0].contains(&format!(" {} server started", here(line))));
}

#[test]
fn test_every_entry_point_reports_caller_line() {
    let (logger, buffer) = console_logger();

    let first = line!() + 1;
    logger.log(LogColor::White, "a");
    logger.log_to("device_1", LogColor::White, "b");
    logger.log_fmt(LogColor::White, format_args!("{}", "c"));
    logger.log_fmt_to("device_1", LogColor::White, format_args!("{}", "d"));
    logger.trace(LogColor::White, 0, "e");
    logger.yellow_to("device_1", "f");
    logger.check_error(Some("g"));
    logger.check_result(&Err::<(), _>("h"));

    let lines = buffer.lines();
    assert_eq!(lines.len(), 8);
    for (offset, line) in lines.iter().enumerate() {
        assert!(
            line.contains(&here(first + offset as u32)),
            "line {} has wrong origin: {:?}",
            offset,
            line
        );
    }
}

#[inline(never)]
fn audit(logger: &Logger, message: &str) {
    logger.trace(LogColor::Yellow, 1, message);
}

#[test]
fn test_trace_attributes_to_ancestor() {
    let (logger, buffer) = console_logger();

    let line = line!() + 1;
    audit(&logger, "token refreshed");

    let lines = buffer.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains(&format!(" {} token refreshed", here(line))));
}

#[test]
fn test_trace_beyond_stack_still_logs() {
    let (logger, buffer) = console_logger();

    logger.trace(LogColor::Blue, 100_000, "deep");

    let lines = buffer.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains(" deep"));
}

#[test]
fn test_ignored_substring_suppresses_message() {
    let (logger, buffer) = console_logger();
    logger.ignore("healthcheck");

    logger.green("GET /healthcheck 200");
    assert!(buffer.is_empty());

    logger.green("GET /users 200");
    assert_eq!(buffer.len(), 1);

    logger.unignore("healthcheck");
    logger.green("GET /healthcheck 200");
    assert_eq!(buffer.len(), 2);
}

#[test]
fn test_check_error_reports_in_red() {
    let (logger, buffer) = console_logger();
    let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");

    let line = line!() + 1;
    assert!(logger.check_error(Some(err)));

    let lines = buffer.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("\x1b[0;31m"));
    assert!(lines[0].contains(&format!(" {} disk full", here(line))));
}

#[test]
fn test_check_error_without_error_is_silent() {
    let (logger, buffer) = console_logger();

    assert!(!logger.check_error(None::<std::io::Error>));
    assert!(!logger.check_result(&Ok::<u8, String>(1)));
    assert!(buffer.is_empty());
}

#[tokio::test]
async fn test_default_table_persists_through_writer() {
    let (logger, buffer) = persisting_logger(LogSettings::default()).await;
    assert!(logger.persisting());

    let line = line!() + 1;
    logger.blue("user 42 signed in");
    logger.flush().await;

    let page = logger.list_logs(None, 0, 10, "").await;
    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].message, "user 42 signed in");
    assert_eq!(page.records[0].origin, here(line));
    assert_eq!(page.records[0].log_color(), Some(LogColor::Blue));
    assert_eq!(buffer.len(), 1);
}

#[tokio::test]
async fn test_named_tables_are_capped() {
    let settings = LogSettings {
        max_rows: 2,
        ..LogSettings::default()
    };
    let (logger, _buffer) = persisting_logger(settings).await;

    for i in 0..5 {
        logger.cyan_to("device_7", format!("reading {}", i));
    }
    for i in 0..5 {
        logger.cyan(format!("event {}", i));
    }
    logger.flush().await;

    let device = logger.list_logs(Some("device_7"), 0, 10, "").await;
    assert_eq!(device.total, 2);
    let default = logger.list_logs(None, 0, 10, "").await;
    assert_eq!(default.total, 5);
}

#[tokio::test]
async fn test_console_off_still_persists() {
    let settings = LogSettings {
        console: false,
        ..LogSettings::default()
    };
    let (logger, buffer) = persisting_logger(settings).await;

    logger.magenta("quiet");
    logger.flush().await;

    assert!(buffer.is_empty());
    assert_eq!(logger.list_logs(None, 0, 10, "").await.total, 1);
}

#[tokio::test]
async fn test_ignored_messages_are_not_persisted() {
    let settings = LogSettings {
        ignore: vec!["heartbeat".to_string()],
        ..LogSettings::default()
    };
    let (logger, buffer) = persisting_logger(settings).await;

    logger.white("heartbeat ok");
    logger.white("job done");
    logger.flush().await;

    assert_eq!(buffer.len(), 1);
    let page = logger.list_logs(None, 0, 10, "").await;
    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].message, "job done");
}

#[tokio::test]
async fn test_maintenance_through_facade() {
    let (logger, _buffer) = persisting_logger(LogSettings::default()).await;
    // default table is created by the writer
    logger.flush().await;

    let records: Vec<_> = (0..4)
        .map(|i| sitelog::LogRecord::new(LogColor::Green, format!("m{}", i), "import.rs:3"))
        .collect();
    assert_eq!(logger.save_batch(None, &records).await, 4);

    assert_eq!(logger.delete_logs(None, 2, 3).await, 2);
    assert_eq!(logger.list_logs(None, 0, 10, "").await.total, 2);

    assert!(logger.clear_logs(None).await);
    assert_eq!(logger.list_logs(None, 0, 10, "").await.total, 0);
}

#[tokio::test]
async fn test_maintenance_without_store_is_reported() {
    let (logger, buffer) = console_logger();

    let page = logger.list_logs(None, 0, 10, "").await;
    assert!(page.records.is_empty());
    assert_eq!(logger.delete_logs(None, 1, 2).await, 0);
    assert!(!logger.clear_logs(None).await);

    let lines = buffer.lines();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|l| l.contains("log database not set")));
}

#[tokio::test]
async fn test_unreachable_store_falls_back_to_console() {
    let buffer = BufferConsole::new();
    let settings = LogSettings {
        persist: true,
        store: Some(StoreSettings {
            kind: sitelog::StoreKind::Sqlite,
            url: "sqlite:///definitely/not/a/dir/log.db".to_string(),
            max_connections: 1,
        }),
        ..LogSettings::default()
    };

    let logger = Logger::connect(settings, ConsoleSink::new(Arc::new(buffer.clone()))).await;
    assert!(!logger.persisting());
    assert!(!buffer.is_empty());

    buffer.clear();
    logger.green("still logging");
    assert_eq!(buffer.len(), 1);
}

#[tokio::test]
async fn test_detach_store_stops_persistence() {
    let (logger, _buffer) = persisting_logger(LogSettings::default()).await;

    logger.green("kept");
    logger.flush().await;

    let sink = logger.detach_store().unwrap();
    assert!(!logger.persisting());
    logger.green("console only");

    assert_eq!(sink.count("sitelog").await, 1);
}

#[test]
fn test_logging_from_many_threads() {
    let (logger, buffer) = console_logger();
    let logger = Arc::new(logger);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let logger = logger.clone();
            std::thread::spawn(move || {
                for i in 0..50 {
                    logger.blue(format!("thread {} line {}", t, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let lines = buffer.lines();
    assert_eq!(lines.len(), 400);
    assert!(lines.iter().all(|l| l.starts_with("\x1b[0;34m") && l.ends_with("\x1b[0m")));
}
