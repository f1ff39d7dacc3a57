//! # WorldTides Data Fetching and Caching
//!
//! This module handles all network operations for fetching tidal extremes from
//! the WorldTides v3 API, and the cache-first [`TideDataFetcher`] the rest of the
//! crate goes through.
//!
//! ## Data Source
//!
//! ### WorldTides v3
//! - **URL**: https://www.worldtides.info/api/v3 (configurable for testing)
//! - **Location**: one fixed coordinate per deployment
//! - **Datum**: one fixed vertical datum per deployment (e.g. `MLS`, `CD`)
//! - **Data**: the high/low extremes of a single day
//!
//! The API reports failures inside the JSON body (`status` / `error`), so the
//! body is always parsed and the `status` field decides whether the day succeeded.
//!
//! ## Data Processing Pipeline
//! 1. **Cache**: return the stored report if the day was already fetched
//! 2. **Fetch**: one HTTP GET for the day
//! 3. **Validate**: reject any response whose `status` is not 200
//! 4. **Store**: insert the report into the cache and hand it back
//!
//! ## Error Handling
//! All failure modes surface as a single [`TideError`] for that day. Nothing is
//! retried here; the next request for the same day simply reaches the source again.

use crate::cache::TideDataCache;
use crate::{Coordinate, DayTideReport, TidalExtremeEvent};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Default WorldTides API endpoint
pub const WORLDTIDES_API_URL: &str = "https://www.worldtides.info/api/v3";

/// Status code the API puts in the body of a successful response
const STATUS_OK: u16 = 200;

/// Errors that can occur while fetching one day of tide data.
#[derive(Error, Debug)]
pub enum TideError {
    /// HTTP request failed (network, timeout, or protocol error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON
    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The API answered but flagged the request as failed
    #[error("WorldTides API error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    /// The fetch task for a day did not run to completion
    #[error("fetch task failed: {0}")]
    Task(String),
}

/// Raw WorldTides response, as far as this crate reads it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TidesResponse {
    pub status: u16,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub extremes: Vec<TidalExtremeEvent>,
    #[serde(default)]
    pub response_datum: Option<String>,
    #[serde(default)]
    pub station: Option<String>,
    #[serde(default)]
    pub call_count: Option<u32>,
    #[serde(default)]
    pub copyright: Option<String>,
}

impl TidesResponse {
    /// Successful response carrying the given extremes.
    pub fn ok(extremes: Vec<TidalExtremeEvent>) -> Self {
        Self {
            status: STATUS_OK,
            error: None,
            extremes,
            response_datum: None,
            station: None,
            call_count: None,
            copyright: None,
        }
    }

    /// Turn the response into a report, rejecting a non-success status.
    fn into_report(self) -> Result<DayTideReport, TideError> {
        if self.status != STATUS_OK {
            return Err(TideError::Upstream {
                status: self.status,
                message: self.error.unwrap_or_default(),
            });
        }

        Ok(DayTideReport {
            events: self.extremes,
            datum: self.response_datum,
            station: self.station,
        })
    }
}

/// A remote source of tidal extremes for one day.
#[async_trait]
pub trait TideSource: Send + Sync {
    async fn fetch_day(
        &self,
        day: NaiveDate,
        coordinate: Coordinate,
        datum: &str,
    ) -> Result<TidesResponse, TideError>;
}

/// HTTP client for the WorldTides v3 API.
pub struct WorldTidesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WorldTidesClient {
    /// Build a client whose every request is bounded by `timeout`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TideError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl TideSource for WorldTidesClient {
    async fn fetch_day(
        &self,
        day: NaiveDate,
        coordinate: Coordinate,
        datum: &str,
    ) -> Result<TidesResponse, TideError> {
        let date = day.format("%Y-%m-%d").to_string();
        debug!(%date, datum, "requesting tide extremes from WorldTides");

        // Flag parameters (extremes, localtime) are sent with an empty value
        let params = [
            ("key", self.api_key.clone()),
            ("lat", coordinate.latitude.to_string()),
            ("lon", coordinate.longitude.to_string()),
            ("date", date),
            ("days", "1".to_string()),
            ("extremes", String::new()),
            ("datum", datum.to_string()),
            ("localtime", String::new()),
        ];

        let response = self.http.get(&self.base_url).query(&params).send().await?;
        let http_status = response.status();
        let body = response.bytes().await?;

        debug!(
            http_status = http_status.as_u16(),
            body_len = body.len(),
            "WorldTides response received"
        );

        Ok(serde_json::from_slice(&body)?)
    }
}

/// Cache-first access to one day of tide data.
///
/// The coordinate and datum are fixed for the whole process, so callers only
/// name the day.
pub struct TideDataFetcher {
    source: Arc<dyn TideSource>,
    cache: Arc<TideDataCache>,
    coordinate: Coordinate,
    datum: String,
}

impl TideDataFetcher {
    pub fn new(
        source: Arc<dyn TideSource>,
        cache: Arc<TideDataCache>,
        coordinate: Coordinate,
        datum: impl Into<String>,
    ) -> Self {
        Self {
            source,
            cache,
            coordinate,
            datum: datum.into(),
        }
    }

    /// Fetch the report for `day`, from the cache when possible.
    ///
    /// # Returns
    /// - `Ok(report)`: cached or freshly fetched (and now cached) report
    /// - `Err(TideError)`: transport failure, malformed body, or a non-success
    ///   status. The cache is left untouched.
    pub async fn fetch(&self, day: NaiveDate) -> Result<Arc<DayTideReport>, TideError> {
        if let Some(report) = self.cache.read(day) {
            debug!(%day, "cache hit for tide extremes");
            return Ok(report);
        }

        let response = self
            .source
            .fetch_day(day, self.coordinate, &self.datum)
            .await?;
        let report = response.into_report()?;

        info!(%day, extremes = report.events.len(), "fetched tide extremes");
        Ok(self.cache.write(day, Arc::new(report)))
    }

    pub fn cache(&self) -> &TideDataCache {
        &self.cache
    }
}
