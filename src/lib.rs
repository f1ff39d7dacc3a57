//! # Tide Bot Core Library
//!
//! This library delivers tidal-extreme reports (high and low tide times with
//! heights) to messaging subscribers. It is built around two pieces that do
//! real coordination work:
//!
//! - **Multi-day retrieval**: one concurrent task per requested day, each going
//!   through a shared per-day cache before calling the WorldTides API. Results are
//!   always handed back in ascending day order, whatever order the network
//!   finished in.
//! - **Notification fan-out**: a report (or an apology) for every enabled
//!   subscriber, where one recipient failing never stops the others and the job
//!   reports an aggregate count at the end.
//!
//! ## Data Flow
//! 1. **Ad-hoc**: inbound `tides ...` command → day tokens → [`retriever`] →
//!    [`renderer`] → one text message per day, in chronological order
//! 2. **Scheduled**: periodic job → single day fetch → template variables →
//!    one message per enabled recipient → aggregate outcome
//!
//! ## Core Types
//! - [`TidalExtremeEvent`]: a single high or low tide
//! - [`DayTideReport`]: the events of one calendar day, as the source ordered them
//! - [`Coordinate`]: the fixed location the service reports on

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Module declarations
pub mod bot;
pub mod cache;
pub mod command;
pub mod config;
pub mod days;
pub mod directory;
pub mod dispatcher;
pub mod renderer;
pub mod retriever;
pub mod tide_data;
pub mod transport;

#[cfg(test)]
mod tests;

/// Whether an extreme is a high or a low tide.
///
/// Deserialises from the `"High"` / `"Low"` strings used by WorldTides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TideKind {
    High,
    Low,
}

impl TideKind {
    /// Label used in rendered reports and template variables.
    pub fn label(self) -> &'static str {
        match self {
            TideKind::High => "High",
            TideKind::Low => "Low",
        }
    }
}

/// A single high or low tide occurrence.
///
/// The instant is absolute (UTC); conversion to the display timezone only
/// happens when rendering. Heights are metres relative to the configured datum
/// and may be negative.
///
/// On the wire the instant is the `dt` field (Unix seconds) and the kind is the
/// `type` field:
///
/// # Example
/// ```
/// use tide_bot_lib::{TidalExtremeEvent, TideKind};
///
/// let json = r#"{"dt": 1704088320, "date": "2024-01-01T05:52+0000", "height": 1.12, "type": "High"}"#;
/// let event: TidalExtremeEvent = serde_json::from_str(json).unwrap();
///
/// assert_eq!(event.kind, TideKind::High);
/// assert_eq!(event.time.timestamp(), 1704088320);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TidalExtremeEvent {
    /// When the extreme occurs
    #[serde(rename = "dt", with = "chrono::serde::ts_seconds")]
    pub time: DateTime<Utc>,
    /// High or low tide
    #[serde(rename = "type")]
    pub kind: TideKind,
    /// Height in metres relative to the datum
    pub height: f64,
}

/// All extreme events for one calendar day at the configured location.
///
/// Events keep the order the source returned them in; nothing in this crate
/// re-sorts them. Once fetched, a report is shared read-only through the cache.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DayTideReport {
    /// Extremes in source order
    pub events: Vec<TidalExtremeEvent>,
    /// Datum the source answered with, when reported
    pub datum: Option<String>,
    /// Reference station the source used, when reported
    pub station: Option<String>,
}

impl DayTideReport {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Geographic coordinate the tide source is queried for.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}
