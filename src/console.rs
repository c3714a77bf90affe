//! Console sink
//!
//! Formats `HH:MM:SS <origin> <message>`, paints it with the record colour
//! and hands it to a [`ConsoleWriter`] as a single line.

use crate::color::LogColor;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Line-oriented output stream.
///
/// Implementations must emit each line with one underlying write so that
/// concurrent callers interleave at line granularity only.
pub trait ConsoleWriter: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl ConsoleWriter for StdoutConsole {
    fn write_line(&self, line: &str) {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        // Nothing sensible to do if stdout is gone
        let _ = handle.write_all(buf.as_bytes());
        let _ = handle.flush();
    }
}

/// In-memory console, for hosts that relay lines elsewhere and for tests
#[derive(Debug, Default, Clone)]
pub struct BufferConsole {
    lines: Arc<Mutex<Vec<String>>>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.clear();
        }
    }
}

impl ConsoleWriter for BufferConsole {
    fn write_line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// Console sink shared by the facade and the persistent sink
#[derive(Clone)]
pub struct ConsoleSink {
    writer: Arc<dyn ConsoleWriter>,
}

impl ConsoleSink {
    pub fn new(writer: Arc<dyn ConsoleWriter>) -> Self {
        Self { writer }
    }

    pub fn stdout() -> Self {
        Self::new(Arc::new(StdoutConsole))
    }

    /// Emit one log line
    pub fn emit(&self, message: &str, origin: &str, color: LogColor) {
        self.writer.write_line(&format_line(&timestamp(), origin, message, color));
    }

    /// Emit a line without origin
    pub fn plain(&self, message: &str, color: LogColor) {
        let line = format!("{} {}", timestamp(), message);
        self.writer.write_line(&color.paint(&line));
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl std::fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSink").finish_non_exhaustive()
    }
}

pub(crate) fn format_line(time: &str, origin: &str, message: &str, color: LogColor) -> String {
    color.paint(&format!("{} {} {}", time, origin, message))
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
