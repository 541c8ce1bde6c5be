//! Destination for human-readable provider messages.
//!
//! The provider formats every message as `MM/DD/YYYY HH:MM:SS - text` in
//! local time before handing it to an [`OutputSink`]; sinks only decide
//! where the line goes.

use std::sync::Mutex;

use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month]/[day]/[year] [hour]:[minute]:[second]");

/// Receives pre-formatted, timestamped message lines.
pub trait OutputSink {
    /// Delivers one message. The text may span several lines.
    fn emit(&self, line: &str);
}

impl<S: OutputSink + ?Sized> OutputSink for &S {
    fn emit(&self, line: &str) {
        (**self).emit(line);
    }
}

/// Sink that keeps messages in memory until the host collects them.
#[derive(Debug, Default)]
pub struct BufferedSink {
    lines: Mutex<Vec<String>>,
}

impl BufferedSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the messages received so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Removes and returns the messages received so far.
    #[must_use]
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.lines
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl OutputSink for BufferedSink {
    fn emit(&self, line: &str) {
        self.lock().push(line.to_owned());
    }
}

/// Sink that discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&self, _line: &str) {}
}

/// Current wall-clock time in the local offset.
///
/// Falls back to UTC when the local offset cannot be determined, which the
/// `time` crate reports for multi-threaded processes on some platforms.
#[must_use]
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Prefixes `text` with `at` in `MM/DD/YYYY HH:MM:SS - ` form.
///
/// Trailing newlines are dropped; the sink owns line termination.
#[must_use]
pub fn timestamped(at: OffsetDateTime, text: &str) -> String {
    let body = text.trim_end_matches(['\r', '\n']);
    match at.format(TIMESTAMP_FORMAT) {
        Ok(stamp) => format!("{stamp} - {body}"),
        Err(_) => body.to_owned(),
    }
}
