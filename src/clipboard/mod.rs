//! Clipboard memory for ListenOS
//!
//! A single slot holding the last text copied from the screen, so that a
//! later "paste this" or "send it to ..." request can use it.

pub mod workflow;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use workflow::{ClipboardAction, ClipboardOutcome, ClipboardWorkflow};

/// Characters shown in status previews
pub const PREVIEW_CHARS: usize = 200;

/// Source recorded for text captured from the focused window
pub const SCREEN_SOURCE: &str = "screen";

pub const NO_TEXT_IN_MEMORY: &str = "No text in memory. Please copy text first.";

/// First `max_chars` characters of `text`
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardMemory {
    text: String,
    timestamp: Option<DateTime<Utc>>,
    source: Option<String>,
}

impl ClipboardMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot with `text`
    pub fn store(&mut self, text: impl Into<String>, source: &str) {
        self.text = text.into();
        self.timestamp = Some(Utc::now());
        self.source = Some(source.to_string());
    }

    /// The remembered text, if any
    pub fn text(&self) -> Option<&str> {
        if self.text.is_empty() {
            None
        } else {
            Some(&self.text)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn status(&self) -> ClipboardStatus {
        ClipboardStatus {
            has_text: !self.text.is_empty(),
            text_length: self.text.chars().count(),
            preview: preview(&self.text, PREVIEW_CHARS),
            timestamp: self.timestamp,
            source: self.source.clone(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardStatus {
    pub has_text: bool,
    pub text_length: usize,
    pub preview: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub source: Option<String>,
}
