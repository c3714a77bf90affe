//! Call-site tracer
//!
//! Resolves the origin (`file.rs:LINE`) of a log call. The facade's entry
//! points are `#[track_caller]`, so the immediate caller is known exactly
//! from [`Location::caller`]. Attributing a line to an ancestor further up
//! (`depth > 0`) needs the real call stack: we capture a
//! [`Backtrace`], parse its text rendering, find the frame matching the
//! caller location and walk `depth` frames outward from it.
//!
//! Stack introspection never fails a log call. A short stack resolves to the
//! outermost frame available, and a stack without usable debug info resolves
//! to the immediate caller.

use std::backtrace::Backtrace;
use std::panic::Location;

/// One logical frame of a rendered backtrace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub symbol: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl Frame {
    fn origin(&self) -> Option<String> {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => Some(format_origin(file, line)),
            _ => None,
        }
    }

    fn matches(&self, anchor: &Location<'_>) -> bool {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => {
                line == anchor.line() && file_name(file) == file_name(anchor.file())
            }
            _ => false,
        }
    }
}

/// Render a source location as `file.rs:LINE` (directory and column dropped)
pub fn format_origin(file: &str, line: u32) -> String {
    format!("{}:{}", file_name(file), line)
}

/// Origin of a `#[track_caller]` location
pub fn origin_of(location: &Location<'_>) -> String {
    format_origin(location.file(), location.line())
}

/// Origin of the frame `depth` hops above `anchor`.
///
/// `anchor` is the facade caller's location; `depth == 0` returns it
/// directly without touching the stack.
pub fn capture_origin(anchor: &Location<'_>, depth: usize) -> String {
    if depth == 0 {
        return origin_of(anchor);
    }

    let rendered = Backtrace::force_capture().to_string();
    let frames = parse_frames(&rendered);
    resolve(&frames, anchor, depth).unwrap_or_else(|| origin_of(anchor))
}

/// Walk outward from the innermost frame matching `anchor`.
///
/// Frames without a source location (no debug info, runtime shims) are
/// skipped and do not count as hops.
pub fn resolve(frames: &[Frame], anchor: &Location<'_>, depth: usize) -> Option<String> {
    let start = frames.iter().position(|f| f.matches(anchor))?;

    let mut located = frames[start + 1..].iter().filter_map(Frame::origin);
    let mut found = None;
    for _ in 0..depth {
        match located.next() {
            Some(origin) => found = Some(origin),
            None => break,
        }
    }
    found
}

/// Split a rendered backtrace into frames.
///
/// The text alternates symbol lines (`  12: crate::module::function`, or an
/// indented symbol without index for inlined calls) with location lines
/// (`at ./src/file.rs:120:9`). A symbol without a following location line
/// yields a frame with no file.
pub fn parse_frames(rendered: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();

    for raw in rendered.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                if frame.file.is_none() {
                    let (file, line_no) = split_location(location);
                    frame.file = Some(file.to_string());
                    frame.line = line_no;
                }
            }
            continue;
        }

        frames.push(Frame {
            symbol: strip_frame_index(line).to_string(),
            file: None,
            line: None,
        });
    }

    frames
}

fn strip_frame_index(line: &str) -> &str {
    match line.split_once(": ") {
        Some((index, rest)) if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) => {
            rest.trim()
        }
        _ => line,
    }
}

/// `path/to/file.rs:120:9` -> (`path/to/file.rs`, Some(120)).
/// The trailing column is optional.
fn split_location(location: &str) -> (&str, Option<u32>) {
    let location = location.trim();
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next();
    let middle = parts.next();
    let rest = parts.next();

    match (rest, middle, last) {
        (Some(file), Some(line), Some(col))
            if line.parse::<u32>().is_ok() && col.parse::<u32>().is_ok() =>
        {
            (file, line.parse().ok())
        }
        (_, Some(_), Some(line)) if line.parse::<u32>().is_ok() => {
            let file = &location[..location.len() - line.len() - 1];
            (file, line.parse().ok())
        }
        _ => (location, None),
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
