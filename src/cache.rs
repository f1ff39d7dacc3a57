//! # Per-Day Tide Response Cache
//!
//! Successful WorldTides responses are kept in memory for the lifetime of the
//! process, keyed by the calendar day they were requested for.
//!
//! ## Caching Strategy
//! - **Scope**: one cache object, built at startup and injected into the
//!   [`TideDataFetcher`](crate::tide_data::TideDataFetcher); tests build their own
//! - **Eviction**: none. Callers only ever ask for today or a week ahead and the
//!   service restarts at least daily
//! - **Failures**: never cached, so a failed day is retried on the next request
//! - **Sharing**: entries are `Arc<DayTideReport>` and are never replaced once
//!   inserted, so a cache hit can be held for as long as the caller needs it
//!
//! Reads take a shared lock and do not block each other; a write holds the
//! exclusive lock for a single insertion.

use crate::DayTideReport;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Thread-safe map from calendar day to a previously fetched report.
#[derive(Debug, Default)]
pub struct TideDataCache {
    entries: RwLock<HashMap<NaiveDate, Arc<DayTideReport>>>,
}

impl TideDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached report for `day`, if one has been stored.
    pub fn read(&self, day: NaiveDate) -> Option<Arc<DayTideReport>> {
        // A panicking writer cannot leave a half-inserted entry behind
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&day).cloned()
    }

    /// Store the report for `day` and return the entry now held by the cache.
    ///
    /// The first report stored for a day wins: when two concurrent fetches for
    /// the same day both succeed, the later one gets the earlier report back and
    /// the cached entry is left untouched.
    pub fn write(&self, day: NaiveDate, report: Arc<DayTideReport>) -> Arc<DayTideReport> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(day).or_insert(report))
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
