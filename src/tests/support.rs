//! Test doubles for the external collaborators.
//!
//! Every stub counts its calls so tests can check what was attempted, not just
//! the aggregate result.

use crate::cache::TideDataCache;
use crate::directory::{DirectoryError, Recipient, RecipientDirectory, RecipientId};
use crate::dispatcher::{Delivery, NotificationDispatcher};
use crate::renderer::ReportRenderer;
use crate::tide_data::{TideDataFetcher, TideError, TideSource, TidesResponse};
use crate::transport::{MessageTransport, TransportError};
use crate::{Coordinate, TidalExtremeEvent, TideKind};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const COORDINATE: Coordinate = Coordinate {
    latitude: 28.11,
    longitude: -14.26,
};

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("test date should be YYYY-MM-DD")
}

pub fn event(rfc3339: &str, kind: TideKind, height: f64) -> TidalExtremeEvent {
    TidalExtremeEvent {
        time: DateTime::parse_from_rfc3339(rfc3339)
            .expect("test instant should be RFC 3339")
            .with_timezone(&Utc),
        kind,
        height,
    }
}

/// `n` alternating high/low extremes, 6h12m apart from 03:00 UTC on 2024-01-01.
pub fn sample_events(n: usize) -> Vec<TidalExtremeEvent> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap();
    (0..n)
        .map(|i| TidalExtremeEvent {
            time: start + ChronoDuration::minutes(372 * i as i64),
            kind: if i % 2 == 0 { TideKind::High } else { TideKind::Low },
            height: if i % 2 == 0 { 1.25 } else { -1.1 },
        })
        .collect()
}

type Responder = dyn Fn(NaiveDate, usize) -> Result<TidesResponse, TideError> + Send + Sync;
type Delay = dyn Fn(NaiveDate) -> Duration + Send + Sync;

/// Tide source answering from a closure of `(day, call index)`.
pub struct StubSource {
    responder: Box<Responder>,
    delay: Option<Box<Delay>>,
    calls: AtomicUsize,
}

impl StubSource {
    pub fn new(
        responder: impl Fn(NaiveDate, usize) -> Result<TidesResponse, TideError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every day succeeds with `n` extremes.
    pub fn always_ok(n: usize) -> Self {
        Self::new(move |_, _| Ok(TidesResponse::ok(sample_events(n))))
    }

    /// Hold each response back by a per-day delay, to shuffle completion order.
    pub fn with_delay(mut self, delay: impl Fn(NaiveDate) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TideSource for StubSource {
    async fn fetch_day(
        &self,
        day: NaiveDate,
        _coordinate: Coordinate,
        _datum: &str,
    ) -> Result<TidesResponse, TideError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(day)).await;
        }
        (self.responder)(day, call)
    }
}

/// Directory listing every recipient as subscribed; some ids can be made
/// unresolvable.
pub struct StubDirectory {
    recipients: Vec<Recipient>,
    missing: HashSet<RecipientId>,
    lookups: AtomicUsize,
}

impl StubDirectory {
    pub fn from_recipients(recipients: Vec<Recipient>) -> Self {
        Self {
            recipients,
            missing: HashSet::new(),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Recipients 1..=n, addressed `+34600000001` and so on, named `User n`.
    pub fn with_recipients(n: u64) -> Self {
        Self::from_recipients(
            (1..=n)
                .map(|id| Recipient {
                    id,
                    address: format!("+34600000{id:03}"),
                    name: Some(format!("User {id}")),
                })
                .collect(),
        )
    }

    /// Keep `id` subscribed but fail to resolve it.
    pub fn missing(mut self, id: RecipientId) -> Self {
        self.missing.insert(id);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipientDirectory for StubDirectory {
    async fn enabled_subscribers(&self) -> Result<Vec<RecipientId>, DirectoryError> {
        Ok(self.recipients.iter().map(|r| r.id).collect())
    }

    async fn recipient(&self, id: RecipientId) -> Result<Recipient, DirectoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.missing.contains(&id) {
            return Err(DirectoryError::NotFound(id));
        }
        self.recipients
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(DirectoryError::NotFound(id))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SentMessage {
    pub address: String,
    pub body: String,
    pub template_id: Option<String>,
    pub variables: Vec<String>,
}

/// Transport recording every delivered message; sends to selected addresses fail.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentMessage>>,
    failing: HashSet<String>,
    attempts: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, address: &str) -> Self {
        self.failing.insert(address.to_string());
        self
    }

    /// Delivered messages, in send order.
    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Every send call, delivered or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn record(&self, message: SentMessage) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&message.address) {
            return Err(TransportError {
                address: message.address,
                reason: "stubbed failure".into(),
            });
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn send_text(&self, address: &str, body: &str) -> Result<(), TransportError> {
        self.record(SentMessage {
            address: address.to_string(),
            body: body.to_string(),
            template_id: None,
            variables: Vec::new(),
        })
    }

    async fn send_template(
        &self,
        address: &str,
        template_id: &str,
        variables: &[String],
    ) -> Result<(), TransportError> {
        self.record(SentMessage {
            address: address.to_string(),
            body: String::new(),
            template_id: Some(template_id.to_string()),
            variables: variables.to_vec(),
        })
    }
}

/// Dispatcher over the given stubs with a fresh cache, UTC display time and
/// template id `daily`.
pub fn dispatcher_with(
    source: &Arc<StubSource>,
    directory: &Arc<StubDirectory>,
    transport: &Arc<RecordingTransport>,
    delivery: Delivery,
) -> NotificationDispatcher {
    let fetcher = TideDataFetcher::new(
        Arc::clone(source) as Arc<dyn TideSource>,
        Arc::new(TideDataCache::new()),
        COORDINATE,
        "MLS",
    );

    NotificationDispatcher::new(
        Arc::new(fetcher),
        Arc::clone(directory) as Arc<dyn RecipientDirectory>,
        Arc::clone(transport) as Arc<dyn MessageTransport>,
        ReportRenderer::new(chrono_tz::Tz::UTC, "Risco del Paso"),
        delivery,
        "daily",
    )
}
