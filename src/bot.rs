//! Inbound message handling.
//!
//! Routes a decoded message (body, sender address, optional display name) to the
//! right flow: `tides` goes to ad-hoc dispatch, `start` / `stop` flip the
//! sender's subscription, anything else saves the sender on first contact and
//! gets the welcome text.

use crate::command::Command;
use crate::days::resolve_days;
use crate::directory::SubscriptionStore;
use crate::dispatcher::{DispatchOutcome, NotificationDispatcher};
use crate::transport::MessageTransport;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{error, info};

const AVAILABLE_COMMANDS: &str = "*Available commands:*
📱 Send *tides* - Get today's tide info
   Examples: _tides tomorrow_, _tides week_, _tides today tomorrow_, _tides today 24/12/2025_
🔔 Send *start* - Enable daily notifications
🔕 Send *stop* - Disable notifications";

const GENERIC_APOLOGY: &str = "❌ Sorry, there was an error. Please try again later.";

const NOTHING_TO_STOP: &str = "🤷 You don't have any active notifications to stop.

Send *start* to enable tide notifications!";

pub struct TideBot {
    dispatcher: Arc<NotificationDispatcher>,
    subscriptions: Arc<dyn SubscriptionStore>,
    transport: Arc<dyn MessageTransport>,
    location_name: String,
}

impl TideBot {
    pub fn new(
        dispatcher: Arc<NotificationDispatcher>,
        subscriptions: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn MessageTransport>,
        location_name: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            subscriptions,
            transport,
            location_name: location_name.into(),
        }
    }

    /// Handle one inbound message. `today` is the current day at the
    /// service's location.
    ///
    /// For `tides` the returned outcome counts the day reports sent; the other
    /// commands send a single reply and report it as one attempt.
    pub async fn handle_message(
        &self,
        body: &str,
        from: &str,
        display_name: Option<&str>,
        today: NaiveDate,
    ) -> DispatchOutcome {
        match Command::parse(body) {
            Command::Tides(tokens) => {
                info!(from, ?tokens, "handling tides command");
                let days = resolve_days(tokens.as_slice(), today);
                self.dispatcher.dispatch_ad_hoc(from, &days).await
            }
            Command::Start => self.reply(from, self.start(from, display_name).await).await,
            Command::Stop => self.reply(from, self.stop(from).await).await,
            Command::Other => {
                let welcome = self.greet(from, display_name).await;
                self.reply(from, welcome).await
            }
        }
    }

    async fn start(&self, from: &str, display_name: Option<&str>) -> String {
        info!(from, "handling start command");

        match self.subscriptions.subscribe(from, display_name).await {
            Ok(_) => format!(
                "🔔 *Notifications Enabled!*

You'll now receive daily tide reports for *{}* every morning.

📱 Send *tides* anytime for current tide info
🔕 Send *stop* to disable notifications

Welcome aboard! 🌊",
                self.location_name
            ),
            Err(err) => {
                error!(from, error = %err, "failed to create subscription");
                "❌ Sorry, there was an error enabling notifications. Please try again later."
                    .to_string()
            }
        }
    }

    async fn stop(&self, from: &str) -> String {
        info!(from, "handling stop command");

        match self.subscriptions.unsubscribe(from).await {
            Ok(true) => "🔕 *Notifications Disabled*

You'll no longer receive daily tide reports.

📱 Send *tides* anytime for current tide info
🔔 Send *start* to re-enable notifications

Thanks for using TideBot! 🌊"
                .to_string(),
            Ok(false) => NOTHING_TO_STOP.to_string(),
            Err(err) => {
                error!(from, error = %err, "failed to disable subscription");
                GENERIC_APOLOGY.to_string()
            }
        }
    }

    /// Save the sender on first contact and build the welcome text. A sender
    /// that could not be saved is still welcomed, as if new.
    async fn greet(&self, from: &str, display_name: Option<&str>) -> String {
        info!(from, "received message, saving user");

        let is_new = match self.subscriptions.register(from, display_name).await {
            Ok((_, created)) => created,
            Err(err) => {
                error!(from, error = %err, "failed to save user");
                true
            }
        };

        self.welcome(display_name, is_new)
    }

    fn welcome(&self, display_name: Option<&str>, is_new: bool) -> String {
        let greeting = match display_name {
            Some(name) if !name.is_empty() => format!("Hi {name}!"),
            _ => "Hi!".to_string(),
        };
        let intro = if is_new { " Welcome to TideBot!" } else { "" };

        format!(
            "🌊 *{greeting}{intro}*

Tide reports for *{}*.

Your tide reports include high and low tide times with precise heights 🏄

{AVAILABLE_COMMANDS}",
            self.location_name
        )
    }

    async fn reply(&self, to: &str, body: String) -> DispatchOutcome {
        match self.transport.send_text(to, &body).await {
            Ok(()) => DispatchOutcome {
                total: 1,
                succeeded: 1,
                failed: 0,
            },
            Err(err) => {
                error!(to, error = %err, "failed to send reply");
                DispatchOutcome {
                    total: 1,
                    succeeded: 0,
                    failed: 1,
                }
            }
        }
    }
}
