//! # Concurrent Multi-Day Retrieval
//!
//! Fetches any number of days at once: one spawned task per requested day, each
//! going through the shared [`TideDataFetcher`] (and therefore its cache).
//!
//! Every task runs to completion and owns exactly one result slot; there is no
//! shared result list and no early exit when one day fails. Once every slot is
//! filled the results are sorted by day, because network completion order says
//! nothing about the order recipients should read the reports in.

use crate::tide_data::{TideDataFetcher, TideError};
use crate::DayTideReport;
use chrono::NaiveDate;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// The outcome of retrieving one requested day.
#[derive(Debug)]
pub struct DayTides {
    pub day: NaiveDate,
    pub outcome: Result<Arc<DayTideReport>, TideError>,
}

/// Fans a set of days out over concurrent fetches.
#[derive(Clone)]
pub struct MultiDayRetriever {
    fetcher: Arc<TideDataFetcher>,
}

impl MultiDayRetriever {
    pub fn new(fetcher: Arc<TideDataFetcher>) -> Self {
        Self { fetcher }
    }

    /// Retrieve every day in `days`, returning one entry per requested day in
    /// ascending day order.
    ///
    /// Days are not de-duplicated: a day given twice yields two entries (the
    /// second normally served from the cache). An empty request returns
    /// immediately without spawning anything.
    pub async fn retrieve_many(&self, days: &[NaiveDate]) -> Vec<DayTides> {
        if days.is_empty() {
            return Vec::new();
        }

        debug!(days = days.len(), "retrieving tide extremes concurrently");

        let handles = days.iter().map(|&day| {
            let fetcher = Arc::clone(&self.fetcher);
            tokio::spawn(async move { fetcher.fetch(day).await })
        });
        let joined = join_all(handles).await;

        let mut results: Vec<DayTides> = days
            .iter()
            .zip(joined)
            .map(|(&day, joined)| {
                let outcome = joined.unwrap_or_else(|e| Err(TideError::Task(e.to_string())));
                if let Err(err) = &outcome {
                    warn!(%day, error = %err, "failed to fetch tide extremes");
                }
                DayTides { day, outcome }
            })
            .collect();

        results.sort_by_key(|result| result.day);
        results
    }
}
