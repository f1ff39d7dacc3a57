//! Inbound message commands.

/// What an inbound message asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `tides [day tokens..]`
    Tides(Vec<String>),
    /// `start`: enable daily notifications
    Start,
    /// `stop`: disable daily notifications
    Stop,
    /// Anything else, including an empty message
    Other,
}

impl Command {
    /// Parse a message body. The first word picks the command (case-insensitive);
    /// the remaining words are its arguments, lower-cased.
    pub fn parse(body: &str) -> Self {
        let lowered = body.trim().to_lowercase();
        let mut words = lowered.split_whitespace();

        match words.next() {
            Some("tides") => Command::Tides(words.map(str::to_string).collect()),
            Some("start") => Command::Start,
            Some("stop") => Command::Stop,
            _ => Command::Other,
        }
    }
}
