//! In-memory log shown by the log widget.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Severity of a log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Error => "errn",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "dbug",
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug | log::Level::Trace => Self::Debug,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLine {
    pub level: LogLevel,
    pub text: String,
}

impl std::fmt::Display for LogLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level.tag(), self.text)
    }
}

#[derive(Debug, Default)]
struct Inner {
    lines: VecDeque<LogLine>,
    /// Set when lines were added since the widget last scrolled.
    scroll_to_bottom: bool,
}

/// Shared, bounded log buffer.
#[derive(Clone, Debug)]
pub struct LogBuffer {
    inner: Arc<Mutex<Inner>>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::with_capacity(4096)
    }
}

impl LogBuffer {
    /// Keeps at most `capacity` lines, dropping the oldest first.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, level: LogLevel, text: impl Into<String>) {
        let mut inner = self.lock();
        if inner.lines.len() == self.capacity {
            inner.lines.pop_front();
        }
        inner.lines.push_back(LogLine {
            level,
            text: text.into(),
        });
        inner.scroll_to_bottom = true;
    }

    pub fn info(&self, text: impl Into<String>) {
        self.push(LogLevel::Info, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.push(LogLevel::Error, text);
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.lines.clear();
        inner.scroll_to_bottom = false;
    }

    pub fn len(&self) -> usize {
        self.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().lines.is_empty()
    }

    /// Formatted lines containing `filter` (case-insensitive). An empty
    /// filter matches everything.
    pub fn lines(&self, filter: &str) -> Vec<String> {
        let filter = filter.to_lowercase();
        self.lock()
            .lines
            .iter()
            .map(ToString::to_string)
            .filter(|line| filter.is_empty() || line.to_lowercase().contains(&filter))
            .collect()
    }

    /// All lines joined for the clipboard.
    pub fn to_text(&self, filter: &str) -> String {
        let mut text = self.lines(filter).join("\n");
        text.push('\n');
        text
    }

    /// Returns and resets the scroll request.
    pub fn take_scroll_request(&self) -> bool {
        std::mem::take(&mut self.lock().scroll_to_bottom)
    }
}
