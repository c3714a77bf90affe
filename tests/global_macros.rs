/// Integration tests for the process-wide logger and its macros
use sitelog::{BufferConsole, ConsoleSink, LogColor, Logger};
use std::sync::Arc;

#[inline(never)]
fn report_for_caller(message: &str) {
    sitelog::log_trace!(LogColor::Yellow, 1, "{}", message);
}

// One test: the global logger is shared by every test in this binary
#[test]
fn test_macros_route_through_installed_logger() {
    let buffer = BufferConsole::new();
    let logger = Logger::new(ConsoleSink::new(Arc::new(buffer.clone())));
    assert!(sitelog::install(logger).is_ok());
    assert!(sitelog::install(Logger::default()).is_err());

    let line = line!() + 1;
    sitelog::log_green!("listening on {}", "0.0.0.0:8080");
    sitelog::log_red!("plain text");
    sitelog::log_to!("device_3", LogColor::Cyan, "battery at {}%", 81);
    sitelog::log_color!(LogColor::Magenta, "custom");

    let lines = buffer.lines();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("\x1b[0;32m"));
    assert!(lines[0].contains(&format!("global_macros.rs:{} listening on 0.0.0.0:8080", line)));
    assert!(lines[1].contains(&format!("global_macros.rs:{} plain text", line + 1)));
    assert!(lines[2].contains("battery at 81%"));
    assert!(lines[3].starts_with("\x1b[0;35m"));

    buffer.clear();
    let line = line!() + 1;
    report_for_caller("renewed lease");
    assert!(buffer.lines()[0].contains(&format!("global_macros.rs:{} renewed lease", line)));

    buffer.clear();
    let failed: Result<(), String> = Err("connection reset".to_string());
    assert!(sitelog::check_err!(failed.as_ref().err()));
    assert!(!sitelog::check_err!(None::<String>));
    assert_eq!(buffer.len(), 1);
    assert!(buffer.lines()[0].contains("connection reset"));

    sitelog::global().ignore("noise");
    sitelog::log_white!("noise floor");
    assert_eq!(buffer.len(), 1);
}
