use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tracing::info;

use crate::filter;

/// One accepted posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobEntry {
    pub category: String,
    pub url: String,
}

/// A posting turned away by the country filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub category: String,
    pub url: String,
    pub term: &'static str,
}

/// Append-only set of accepted postings, shared by all category scans.
///
/// Appends are serialized through a mutex so concurrent scanners never lose
/// entries. Duplicates across categories are kept.
#[derive(Debug, Default)]
pub struct JobRegistry {
    entries: Mutex<Vec<JobEntry>>,
    rejected: Mutex<Vec<Rejection>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `url` through the country filter; admitted postings are appended.
    /// Returns whether the posting was admitted.
    pub fn offer(&self, category: &str, url: &str) -> bool {
        if let Some(term) = filter::blocked_term(url) {
            info!("Skipping job post from country: {} | url: {}", term, url);
            lock(&self.rejected).push(Rejection {
                category: category.to_string(),
                url: url.to_string(),
                term,
            });
            return false;
        }

        info!("Adding job | category: {} | url: {}", category, url);
        lock(&self.entries).push(JobEntry {
            category: category.to_string(),
            url: url.to_string(),
        });
        true
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rejected(&self) -> Vec<Rejection> {
        lock(&self.rejected).clone()
    }

    /// Freeze the registry. Nothing can be appended afterwards.
    pub fn into_entries(self) -> Vec<JobEntry> {
        self.entries
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// A panicking appender cannot leave a Vec half-pushed, so poison is ignored.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Tests ──
