//! Console palette
//!
//! Eight foreground colours, stored in log tables by their ANSI SGR code
//! (30..=37) so that rows written by older tools stay readable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity/colour tag attached to every log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogColor {
    Black = 30,
    Red = 31,
    Green = 32,
    Yellow = 33,
    Blue = 34,
    Magenta = 35,
    Cyan = 36,
    White = 37,
}

impl LogColor {
    pub const ALL: [LogColor; 8] = [
        LogColor::Black,
        LogColor::Red,
        LogColor::Green,
        LogColor::Yellow,
        LogColor::Blue,
        LogColor::Magenta,
        LogColor::Cyan,
        LogColor::White,
    ];

    /// Code persisted in the `color` column
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Decode a persisted colour; unknown codes yield `None`
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            LogColor::Black => "black",
            LogColor::Red => "red",
            LogColor::Green => "green",
            LogColor::Yellow => "yellow",
            LogColor::Blue => "blue",
            LogColor::Magenta => "magenta",
            LogColor::Cyan => "cyan",
            LogColor::White => "white",
        }
    }

    /// Matching `colored` palette entry, used by the CLI renderer
    pub fn to_colored(self) -> colored::Color {
        match self {
            LogColor::Black => colored::Color::Black,
            LogColor::Red => colored::Color::Red,
            LogColor::Green => colored::Color::Green,
            LogColor::Yellow => colored::Color::Yellow,
            LogColor::Blue => colored::Color::Blue,
            LogColor::Magenta => colored::Color::Magenta,
            LogColor::Cyan => colored::Color::Cyan,
            LogColor::White => colored::Color::White,
        }
    }

    /// Wrap `text` in this colour's escape sequence.
    ///
    /// Unlike `colored::Colorize` this ignores TTY detection and always
    /// emits the sequence.
    pub fn paint(self, text: &str) -> String {
        format!("\x1b[0;{}m{}\x1b[0m", self.to_colored().to_fg_str(), text)
    }
}

/// Paint by stored colour code; unknown codes pass the text through unchanged
pub fn paint_code(code: i64, text: &str) -> String {
    match LogColor::from_code(code) {
        Some(color) => color.paint(text),
        None => text.to_string(),
    }
}

impl fmt::Display for LogColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.name() == lower)
            .ok_or_else(|| format!("unknown colour: {}", s))
    }
}
