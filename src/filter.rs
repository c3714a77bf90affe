//! Ignore set applied before any sink sees a message

use std::collections::BTreeSet;

/// Substrings that suppress a message entirely
///
/// Held by the logger behind an `ArcSwap`, so the hot path only loads a
/// snapshot and mutations replace the whole set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet {
    entries: BTreeSet<String>,
}

impl IgnoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `message` contains any configured substring
    pub fn should_drop(&self, message: &str) -> bool {
        self.entries
            .iter()
            .any(|needle| message.contains(needle.as_str()))
    }

    /// Copy of this set with `needle` added. Empty needles are ignored,
    /// since they would match every message.
    pub fn with(&self, needle: &str) -> Self {
        let mut next = self.clone();
        if !needle.is_empty() {
            next.entries.insert(needle.to_string());
        }
        next
    }

    pub fn without(&self, needle: &str) -> Self {
        let mut next = self.clone();
        next.entries.remove(needle);
        next
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.contains(needle)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for IgnoreSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }
}
