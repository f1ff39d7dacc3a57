//! # End-to-End Tide Report Scenarios
//!
//! These tests drive the whole ad-hoc path (day tokens → concurrent retrieval →
//! rendering → transport) against stubbed collaborators.

use super::support::{
    date, dispatcher_with, sample_events, RecordingTransport, StubDirectory, StubSource,
};
use crate::days::resolve_days;
use crate::dispatcher::{Delivery, DispatchOutcome};
use crate::tide_data::{TideError, TidesResponse};
use chrono::Datelike;
use std::sync::Arc;
use std::time::Duration;

/// A source failing only for 2024-01-03.
fn source_failing_on_third() -> StubSource {
    let bad_day = date("2024-01-03");
    StubSource::new(move |day, _| {
        if day == bad_day {
            Err(TideError::Upstream {
                status: 500,
                message: "station offline".into(),
            })
        } else {
            Ok(TidesResponse::ok(sample_events(4)))
        }
    })
}

/// Mixed valid and invalid tokens with one failing day.
///
/// The bogus token produces no entry at all; the failing day keeps its slot.
#[tokio::test]
async fn bogus_token_dropped_and_failed_day_kept_in_order() {
    let source = Arc::new(source_failing_on_third());
    let directory = Arc::new(StubDirectory::with_recipients(0));
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = dispatcher_with(&source, &directory, &transport, Delivery::Template);

    let days = resolve_days(&["2024-01-01", "bogus", "2024-01-03"], date("2023-12-31"));
    let results = dispatcher.retriever().retrieve_many(&days).await;

    assert_eq!(results.len(), 2, "bogus token should produce no entry");
    assert_eq!(results[0].day, date("2024-01-01"));
    assert!(results[0].outcome.is_ok());
    assert_eq!(results[1].day, date("2024-01-03"));
    assert!(results[1].outcome.is_err());
}

/// The requester gets the report and the apology in chronological order.
#[tokio::test]
async fn ad_hoc_sends_reports_and_apologies_in_day_order() {
    // Earlier days finish last
    let source = Arc::new(source_failing_on_third().with_delay(|day| {
        Duration::from_millis(50 - u64::from(day.day()) * 10)
    }));
    let directory = Arc::new(StubDirectory::with_recipients(0));
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = dispatcher_with(&source, &directory, &transport, Delivery::Template);

    let days = resolve_days(&["2024-01-03", "2024-01-02", "2024-01-01"], date("2023-12-31"));
    let summary = dispatcher.dispatch_ad_hoc("+34600000001", &days).await;

    assert_eq!(
        summary,
        DispatchOutcome {
            total: 3,
            succeeded: 2,
            failed: 1
        }
    );

    let bodies: Vec<_> = transport.messages().into_iter().map(|m| m.body).collect();
    assert_eq!(bodies.len(), 3);
    assert!(bodies[0].starts_with("🌊 *Tides for Monday, 2024-01-01*"));
    assert!(bodies[1].starts_with("🌊 *Tides for Tuesday, 2024-01-02*"));
    assert_eq!(
        bodies[2],
        "❌ Sorry, I couldn't fetch tide data for 2024-01-03. Please try again later."
    );
}

/// Result count and order hold for any number of requested days.
#[tokio::test]
async fn retrieve_many_returns_one_sorted_entry_per_day() {
    for n in 0..=7u32 {
        let source = Arc::new(StubSource::always_ok(4).with_delay(|day| {
            // Reverse-ish completion order
            Duration::from_millis(u64::from(31 - day.day()))
        }));
        let directory = Arc::new(StubDirectory::with_recipients(0));
        let transport = Arc::new(RecordingTransport::new());
        let dispatcher = dispatcher_with(&source, &directory, &transport, Delivery::Template);

        // Requested newest first
        let days: Vec<_> = (1..=n)
            .rev()
            .map(|d| date(&format!("2024-01-{d:02}")))
            .collect();
        let results = dispatcher.retriever().retrieve_many(&days).await;

        assert_eq!(results.len(), n as usize);
        for (index, result) in results.iter().enumerate() {
            assert_eq!(result.day.day(), index as u32 + 1);
            assert!(result.outcome.is_ok());
        }
    }
}

/// A second request for the same days is served from the cache.
#[tokio::test]
async fn repeated_week_request_hits_cache() {
    let source = Arc::new(StubSource::always_ok(4));
    let directory = Arc::new(StubDirectory::with_recipients(0));
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = dispatcher_with(&source, &directory, &transport, Delivery::Template);

    let days = resolve_days(&["week"], date("2024-01-01"));
    dispatcher.dispatch_ad_hoc("+34600000001", &days).await;
    dispatcher.dispatch_ad_hoc("+34600000002", &days).await;

    assert_eq!(source.calls(), 7);
    assert_eq!(transport.messages().len(), 14);
}
