use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    Error,
    Critical,
}

impl AlertLevel {
    pub fn label(&self) -> &'static str {
        match self {
            AlertLevel::Error => "ERROR",
            AlertLevel::Critical => "CRITICAL",
        }
    }
}

/// Accumulates alert lines and releases them once per window.
///
/// The window opens with the first message pushed into an empty buffer and
/// closes `window` later; [`take_due`](AlertBuffer::take_due) then returns
/// everything collected as one text and the next message opens a new window.
#[derive(Clone, Debug)]
pub struct AlertBuffer {
    window: Duration,
    pending: Vec<String>,
    opened_at: Option<DateTime<Utc>>,
}

impl AlertBuffer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Vec::new(),
            opened_at: None,
        }
    }

    /// Queue `text` as `"<LEVEL>: [dd.mm.YYYY HH:MM:SS] <text>"`.
    pub fn push(&mut self, level: AlertLevel, text: impl AsRef<str>, now: DateTime<Utc>) {
        self.pending.push(format!(
            "{}: [{}] {}",
            level.label(),
            now.format("%d.%m.%Y %H:%M:%S"),
            text.as_ref()
        ));
        self.opened_at.get_or_insert(now);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Combined text when the window has elapsed, else `None`.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Option<String> {
        let opened_at = self.opened_at?;
        let elapsed = now.signed_duration_since(opened_at).to_std().unwrap_or_default();
        if elapsed < self.window {
            return None;
        }
        self.take_all()
    }

    /// Everything pending regardless of the window (shutdown).
    pub fn take_all(&mut self) -> Option<String> {
        self.opened_at = None;
        if self.pending.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.pending).join("\n"))
    }
}
