//! # Notification Dispatch
//!
//! Two ways tide reports leave the service:
//!
//! - **Ad-hoc**: someone asked for one or more days. Every day is retrieved
//!   concurrently, then one message per day goes to the requester in ascending
//!   day order: the report, or an apology naming the day that failed.
//! - **Scheduled**: the daily job. Today's report is fetched once, then every
//!   enabled subscriber gets a personalised notification.
//!
//! ## Failure Isolation
//! The unit of work is one send to one recipient (or one day, ad-hoc). A failure
//! there is logged and counted and the loop carries on; successes are never
//! rolled back and failures are never retried. The job result is the aggregate
//! [`DispatchOutcome`], turned into [`DispatchError::Partial`] when anything failed.

use crate::directory::{DirectoryError, RecipientDirectory, RecipientId};
use crate::renderer::{InsufficientData, ReportRenderer};
use crate::retriever::{DayTides, MultiDayRetriever};
use crate::tide_data::{TideDataFetcher, TideError};
use crate::transport::{MessageTransport, TransportError};
use crate::DayTideReport;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// How the scheduled notification is delivered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// Provider-side template filled with the notification variables
    #[default]
    Template,
    /// The same content rendered as a plain text message
    Text,
}

/// Why a single recipient could not be notified.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error(transparent)]
    InsufficientData(#[from] InsufficientData),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Why a dispatch job did not fully succeed.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The day's report could not be fetched; nothing was sent
    #[error("failed to fetch tide extremes for {day}: {source}")]
    Fetch { day: NaiveDate, source: TideError },

    /// The subscriber list could not be read; nothing was sent
    #[error("failed to get enabled subscriptions: {0}")]
    Subscriptions(#[source] DirectoryError),

    /// Some recipients failed; every other recipient was still notified
    #[error("daily notifications job completed with {failed} errors out of {total} subscribed users")]
    Partial {
        succeeded: usize,
        failed: usize,
        total: usize,
    },
}

/// Per-job tally of attempted sends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl DispatchOutcome {
    fn record_success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    fn record_failure(&mut self) {
        self.total += 1;
        self.failed += 1;
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

pub struct NotificationDispatcher {
    fetcher: Arc<TideDataFetcher>,
    retriever: MultiDayRetriever,
    directory: Arc<dyn RecipientDirectory>,
    transport: Arc<dyn MessageTransport>,
    renderer: ReportRenderer,
    delivery: Delivery,
    template_id: String,
}

impl NotificationDispatcher {
    pub fn new(
        fetcher: Arc<TideDataFetcher>,
        directory: Arc<dyn RecipientDirectory>,
        transport: Arc<dyn MessageTransport>,
        renderer: ReportRenderer,
        delivery: Delivery,
        template_id: impl Into<String>,
    ) -> Self {
        Self {
            retriever: MultiDayRetriever::new(Arc::clone(&fetcher)),
            fetcher,
            directory,
            transport,
            renderer,
            delivery,
            template_id: template_id.into(),
        }
    }

    pub fn retriever(&self) -> &MultiDayRetriever {
        &self.retriever
    }

    /// Send one message per requested day to `address`, in ascending day order.
    ///
    /// A day that failed to fetch gets an apology naming it; it never holds back
    /// the other days. An empty `days` sends nothing.
    pub async fn dispatch_ad_hoc(&self, address: &str, days: &[NaiveDate]) -> DispatchOutcome {
        let mut summary = DispatchOutcome::default();
        if days.is_empty() {
            debug!(address, "no valid days requested, nothing to send");
            return summary;
        }

        info!(address, days = days.len(), "sending tide reports");

        for DayTides { day, outcome } in self.retriever.retrieve_many(days).await {
            let body = match &outcome {
                Ok(report) => self.renderer.format_day(report, day),
                Err(_) => self.renderer.format_failure(day),
            };

            match self.transport.send_text(address, &body).await {
                Ok(()) if outcome.is_ok() => summary.record_success(),
                Ok(()) => summary.record_failure(),
                Err(err) => {
                    warn!(%day, error = %err, "failed to send tide report");
                    summary.record_failure();
                }
            }
        }

        summary
    }

    /// Notify every enabled subscriber about `today`'s tides.
    ///
    /// # Returns
    /// - `Ok(n)`: all `n` subscribers were notified
    /// - `Err(DispatchError::Partial { .. })`: at least one recipient failed;
    ///   the rest were still attempted and the successful sends stand
    /// - any other `Err`: the job could not start, nothing was sent
    pub async fn dispatch_scheduled(&self, today: NaiveDate) -> Result<usize, DispatchError> {
        info!(%today, "starting job: send daily tide notifications");

        let report = self
            .fetcher
            .fetch(today)
            .await
            .map_err(|source| DispatchError::Fetch { day: today, source })?;
        debug!(%today, extremes = report.events.len(), "received tide extremes");

        let subscribers = self
            .directory
            .enabled_subscribers()
            .await
            .map_err(DispatchError::Subscriptions)?;
        info!(
            count = subscribers.len(),
            "found users with enabled subscriptions to send daily notifications"
        );

        let mut summary = DispatchOutcome::default();
        for id in subscribers {
            match self.notify_recipient(id, &report, today).await {
                Ok(()) => {
                    debug!(recipient = id, "sent daily notification");
                    summary.record_success();
                }
                Err(err) => {
                    error!(recipient = id, error = %err, "failed to send daily notification");
                    summary.record_failure();
                }
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            total = summary.total,
            "daily notifications job completed"
        );

        if summary.is_clean() {
            Ok(summary.succeeded)
        } else {
            Err(DispatchError::Partial {
                succeeded: summary.succeeded,
                failed: summary.failed,
                total: summary.total,
            })
        }
    }

    async fn notify_recipient(
        &self,
        id: RecipientId,
        report: &DayTideReport,
        today: NaiveDate,
    ) -> Result<(), NotifyError> {
        let recipient = self.directory.recipient(id).await?;
        let variables =
            self.renderer
                .notification_variables(recipient.greeting_name(), report, today)?;

        match self.delivery {
            Delivery::Template => {
                self.transport
                    .send_template(&recipient.address, &self.template_id, &variables)
                    .await?
            }
            Delivery::Text => {
                let body = self.renderer.format_notification_text(&variables);
                self.transport.send_text(&recipient.address, &body).await?
            }
        }

        Ok(())
    }
}
