//! Outbound messaging transport.
//!
//! Each call sends one message to one address and is treated as best effort:
//! the transport owns its own timeout and wire format, and a failed call is
//! reported back but never retried by this crate.

use async_trait::async_trait;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to send message to {address}: {reason}")]
pub struct TransportError {
    pub address: String,
    pub reason: String,
}

#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Send a free-form text message.
    async fn send_text(&self, address: &str, body: &str) -> Result<(), TransportError>;

    /// Send a provider-side template, filling its numbered placeholders with
    /// `variables` in order. The template must expect exactly that many.
    async fn send_template(
        &self,
        address: &str,
        template_id: &str,
        variables: &[String],
    ) -> Result<(), TransportError>;
}

/// Transport that writes every message to stdout.
///
/// Used for local runs of the CLI; template sends are printed as their
/// numbered variables.
#[derive(Debug, Default)]
pub struct ConsoleTransport;

impl ConsoleTransport {
    pub fn new() -> Self {
        Self
    }

    fn print(&self, text: &str) -> Result<(), String> {
        // One locked write per message so concurrent sends don't interleave
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{text}").map_err(|e| e.to_string())
    }
}

#[async_trait]
impl MessageTransport for ConsoleTransport {
    async fn send_text(&self, address: &str, body: &str) -> Result<(), TransportError> {
        self.print(&format!("── to {address} ──\n{body}\n"))
            .map_err(|reason| TransportError {
                address: address.to_string(),
                reason,
            })
    }

    async fn send_template(
        &self,
        address: &str,
        template_id: &str,
        variables: &[String],
    ) -> Result<(), TransportError> {
        let mut text = format!("── to {address} (template {template_id}) ──\n");
        for (index, variable) in variables.iter().enumerate() {
            text.push_str(&format!("{{{{{}}}}} = {variable}\n", index + 1));
        }

        self.print(&text).map_err(|reason| TransportError {
            address: address.to_string(),
            reason,
        })
    }
}
