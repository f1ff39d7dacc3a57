//! # Tide Report Rendering
//!
//! Turns a [`DayTideReport`] into the text a recipient reads. Everything here is
//! a pure function of the report, the day and the display settings: no network,
//! no storage, no clock.
//!
//! Times are shown in one fixed display timezone (the timezone of the single
//! location the service reports on). Heights are shown in metres to two decimals.

use crate::{DayTideReport, TidalExtremeEvent, TideKind};
use chrono::NaiveDate;
use chrono_tz::Tz;
use thiserror::Error;
use tracing::warn;

/// Extremes the daily notification template has slots for
pub const TEMPLATE_EXTREMES: usize = 4;

/// Variables the daily notification template expects: kind and details for
/// each extreme, then the recipient's name
pub const TEMPLATE_VARIABLES: usize = TEMPLATE_EXTREMES * 2 + 1;

/// The report has too few extremes to fill the daily notification template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("insufficient tide extremes: need {need}, got {got}")]
pub struct InsufficientData {
    pub need: usize,
    pub got: usize,
}

/// Resolve an IANA timezone name, falling back to UTC when it is unknown.
///
/// The fallback is logged but never an error: a report in UTC beats no report.
pub fn resolve_timezone(name: &str) -> Tz {
    name.parse::<Tz>().unwrap_or_else(|err| {
        warn!(timezone = name, error = %err, "failed to load display timezone, falling back to UTC");
        Tz::UTC
    })
}

/// Renders tide reports for one location.
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    timezone: Tz,
    location_name: String,
}

impl ReportRenderer {
    pub fn new(timezone: Tz, location_name: impl Into<String>) -> Self {
        Self {
            timezone,
            location_name: location_name.into(),
        }
    }

    /// Full text report for `day`, one line per extreme in source order.
    ///
    /// ```
    /// use tide_bot_lib::renderer::ReportRenderer;
    /// use tide_bot_lib::DayTideReport;
    /// use chrono::NaiveDate;
    ///
    /// let renderer = ReportRenderer::new(chrono_tz::Tz::UTC, "Risco del Paso");
    /// let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    /// let text = renderer.format_day(&DayTideReport::default(), day);
    ///
    /// assert!(text.contains("No tide data available"));
    /// ```
    pub fn format_day(&self, report: &DayTideReport, day: NaiveDate) -> String {
        let header = format!("🌊 *Tides for {}*\n\n", day.format("%A, %Y-%m-%d"));

        if report.is_empty() {
            return format!("{header}No tide data available for this day.");
        }

        let mut message = header;
        for event in &report.events {
            let (arrow, spacer) = match event.kind {
                TideKind::High => ("⬆️", "\n"),
                TideKind::Low => ("⬇️", ""),
            };
            message.push_str(&format!(
                "{arrow} *{} Tide*: {} ({:.2}m){spacer}\n",
                event.kind.label(),
                self.local_time(event),
                event.height
            ));
        }

        message.push_str(&format!("\n📍 {}", self.location_name));
        message
    }

    /// Apology sent in place of a report when `day` could not be fetched.
    pub fn format_failure(&self, day: NaiveDate) -> String {
        format!(
            "❌ Sorry, I couldn't fetch tide data for {}. Please try again later.",
            day.format("%Y-%m-%d")
        )
    }

    /// Variables for the daily notification template.
    ///
    /// The first [`TEMPLATE_EXTREMES`] extremes fill pairs of variables (kind,
    /// then `HH:MM (h.hhm)`); an extreme falling on a later local date than `day`
    /// is marked `(+1 day)`. The last variable is the recipient's name.
    pub fn notification_variables(
        &self,
        recipient_name: &str,
        report: &DayTideReport,
        day: NaiveDate,
    ) -> Result<Vec<String>, InsufficientData> {
        if report.events.len() < TEMPLATE_EXTREMES {
            return Err(InsufficientData {
                need: TEMPLATE_EXTREMES,
                got: report.events.len(),
            });
        }

        let mut variables = Vec::with_capacity(TEMPLATE_VARIABLES);
        for event in report.events.iter().take(TEMPLATE_EXTREMES) {
            let local = event.time.with_timezone(&self.timezone);
            let suffix = if local.date_naive() != day {
                " (+1 day)"
            } else {
                ""
            };

            variables.push(event.kind.label().to_string());
            variables.push(format!(
                "{}{suffix} ({:.2}m)",
                local.format("%H:%M"),
                event.height
            ));
        }
        variables.push(recipient_name.to_string());

        Ok(variables)
    }

    /// Plain-text rendering of the daily notification, for deployments that
    /// send text instead of the provider template.
    pub fn format_notification_text(&self, variables: &[String]) -> String {
        let name = variables.last().map(String::as_str).unwrap_or_default();
        let mut message = format!("Hi {name}!\n\nHere is your daily tide report:\n\n");

        for (index, pair) in variables
            .chunks_exact(2)
            .take(TEMPLATE_EXTREMES)
            .enumerate()
        {
            message.push_str(&format!("  {}. {} tide: {}\n", index + 1, pair[0], pair[1]));
        }

        message.push_str(&format!("\nLocation: {}\n\n", self.location_name));
        message.push_str(
            "If you don't want to receive those notifications anymore, reply 'stop' to this message. Have a great day on the water!",
        );
        message
    }

    fn local_time(&self, event: &TidalExtremeEvent) -> String {
        event
            .time
            .with_timezone(&self.timezone)
            .format("%H:%M")
            .to_string()
    }
}
