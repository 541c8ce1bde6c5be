//! Short-lived memoisation of "is this file checked out" queries.
//!
//! Hosts often ask for the status of the same file several times within one
//! user gesture. [`CheckoutStatusCache`] answers repeats from memory for
//! [`STATUS_TTL`] and drops the diagnostic transcript on hits, so the same
//! fact is not logged over and over.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Maximum age of a cached status.
pub const STATUS_TTL: Duration = Duration::from_millis(1000);

/// Answer to a checked-out query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLookup {
    checked_out: bool,
    stdout: String,
    stderr: String,
    transcript: Option<String>,
}

impl StatusLookup {
    /// Result of a real client round trip.
    #[must_use]
    pub fn computed(
        checked_out: bool,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        transcript: impl Into<String>,
    ) -> Self {
        Self {
            checked_out,
            stdout: stdout.into(),
            stderr: stderr.into(),
            transcript: Some(transcript.into()),
        }
    }

    /// Result decided locally, without a client call.
    #[must_use]
    pub const fn assumed(checked_out: bool) -> Self {
        Self {
            checked_out,
            stdout: String::new(),
            stderr: String::new(),
            transcript: None,
        }
    }

    /// Whether the file is opened for edit or add.
    #[must_use]
    pub const fn is_checked_out(&self) -> bool {
        self.checked_out
    }

    /// Stdout of the query that produced the answer.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Stderr of the query that produced the answer.
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Diagnostic transcript; `None` for cache hits and local decisions.
    #[must_use]
    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }
}

#[derive(Debug)]
struct CacheEntry {
    path: PathBuf,
    captured_at: Instant,
    checked_out: bool,
    stdout: String,
    stderr: String,
}

impl CacheEntry {
    fn lookup(&self) -> StatusLookup {
        StatusLookup {
            checked_out: self.checked_out,
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
            transcript: None,
        }
    }
}

/// Thread-safe TTL cache of checked-out status, keyed by file path.
///
/// Entries are kept in insertion order and never updated in place: a fresh
/// computation removes the old entry for the path and appends a new one.
/// The lock is released while `compute` runs, so concurrent queries for
/// different files do not serialise behind one slow client call.
///
/// Each path carries a generation that [`Self::invalidate`] bumps. A
/// computation that was already running when its path was invalidated
/// returns its answer to its own caller but is not stored.
#[derive(Debug, Default)]
pub struct CheckoutStatusCache {
    state: Mutex<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: Vec<CacheEntry>,
    generations: HashMap<PathBuf, u64>,
}

impl CacheState {
    fn generation(&self, path: &Path) -> u64 {
        self.generations.get(path).copied().unwrap_or(0)
    }
}

impl CheckoutStatusCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached status for `path`, or computes and stores it.
    ///
    /// Expired entries are evicted before the lookup. A computed entry is
    /// stamped when `compute` returns, so a slow round trip still yields a
    /// full [`STATUS_TTL`] of reuse.
    pub fn get_or_compute<F>(&self, path: &Path, compute: F) -> StatusLookup
    where
        F: FnOnce() -> StatusLookup,
    {
        self.get_or_compute_with(path, Instant::now, compute)
    }

    /// As [`Self::get_or_compute`], reading time from `clock`.
    ///
    /// The clock is read once before the lookup and once after `compute`.
    pub(crate) fn get_or_compute_with<C, F>(&self, path: &Path, clock: C, compute: F) -> StatusLookup
    where
        C: Fn() -> Instant,
        F: FnOnce() -> StatusLookup,
    {
        let generation = {
            let mut state = self.lock();
            let now = clock();
            state
                .entries
                .retain(|entry| now.saturating_duration_since(entry.captured_at) <= STATUS_TTL);
            if let Some(entry) = state.entries.iter().find(|entry| entry.path == path) {
                return entry.lookup();
            }
            state.generation(path)
        };

        let fresh = compute();
        let captured_at = clock();
        let mut state = self.lock();
        if state.generation(path) != generation {
            return fresh;
        }
        state.entries.retain(|entry| entry.path != path);
        state.entries.push(CacheEntry {
            path: path.to_path_buf(),
            captured_at,
            checked_out: fresh.checked_out,
            stdout: fresh.stdout.clone(),
            stderr: fresh.stderr.clone(),
        });
        fresh
    }

    /// Drops any cached status for `path` and discards computations for it
    /// that are still in flight.
    pub fn invalidate(&self, path: &Path) {
        let mut state = self.lock();
        state.entries.retain(|entry| entry.path != path);
        let generation = state.generations.entry(path.to_path_buf()).or_insert(0);
        *generation = generation.wrapping_add(1);
    }

    /// Number of stored entries, expired ones included until the next lookup.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

#[cfg(test)]
mod tests;
