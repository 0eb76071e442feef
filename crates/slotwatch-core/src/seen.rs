//! Memory of session ids already announced, keyed by session date.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

/// Upstream session dates look like `18-10-2026`.
pub const SESSION_DATE_FORMAT: &str = "%d-%m-%Y";

/// Decides which date keys survive an eviction pass.
pub trait EvictionPolicy: Send + Sync {
    fn retain(&self, date_key: &str, today: NaiveDate) -> bool;
}

/// Never forget anything. Memory grows for the lifetime of the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetainAll;

impl EvictionPolicy for RetainAll {
    fn retain(&self, _date_key: &str, _today: NaiveDate) -> bool {
        true
    }
}

/// Forget dates strictly before `today`. Keys that are not `dd-mm-yyyy` are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropPastDates;

impl EvictionPolicy for DropPastDates {
    fn retain(&self, date_key: &str, today: NaiveDate) -> bool {
        match NaiveDate::parse_from_str(date_key, SESSION_DATE_FORMAT) {
            Ok(date) => date >= today,
            Err(_) => true,
        }
    }
}

pub struct SeenSessionStore {
    by_date: HashMap<String, HashSet<String>>,
    policy: Box<dyn EvictionPolicy>,
}

impl Default for SeenSessionStore {
    fn default() -> Self {
        Self::new(Box::new(RetainAll))
    }
}

impl SeenSessionStore {
    pub fn new(policy: Box<dyn EvictionPolicy>) -> Self {
        Self {
            by_date: HashMap::new(),
            policy,
        }
    }

    pub fn contains(&self, date: &str, session_id: &str) -> bool {
        self.by_date
            .get(date)
            .is_some_and(|ids| ids.contains(session_id))
    }

    /// Remember a session. Returns `false` if it was already known.
    pub fn record(&mut self, date: &str, session_id: &str) -> bool {
        self.by_date
            .entry(date.to_string())
            .or_default()
            .insert(session_id.to_string())
    }

    /// Apply the eviction policy. Returns the number of date keys dropped.
    pub fn evict(&mut self, today: NaiveDate) -> usize {
        let before = self.by_date.len();
        let policy = &self.policy;
        self.by_date.retain(|date, _| policy.retain(date, today));
        let dropped = before - self.by_date.len();
        if dropped > 0 {
            debug!(dropped, remaining = self.by_date.len(), "evicted seen-session dates");
        }
        dropped
    }

    /// Total number of remembered session ids across all dates.
    pub fn len(&self) -> usize {
        self.by_date.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.by_date.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for SeenSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeenSessionStore")
            .field("dates", &self.by_date.len())
            .field("sessions", &self.len())
            .finish()
    }
}
