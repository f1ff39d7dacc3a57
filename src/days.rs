//! Day-token translation for the `tides` command.
//!
//! Users can name days as `today`, `tomorrow`, `week`, or a literal date in one
//! of the common written formats. Tokens that cannot be read are dropped rather
//! than failing the whole request.

use chrono::{Days, NaiveDate};
use thiserror::Error;

/// Number of days the `week` token expands to, starting today
pub const WEEK_LENGTH: u64 = 7;

/// Literal date formats, tried in order. Numeric fields accept values without
/// leading zeros, so `1/2/2024` is matched by the `%m/%d/%Y` entry. Month names
/// match in any case.
///
/// The formats containing spaces only work for callers passing a whole token
/// to [`parse_day`]; message arguments are split on whitespace first, so they
/// never arrive in one piece.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", // 2023-12-25
    "%m/%d/%Y", // 12/25/2023
    "%d/%m/%Y", // 25/12/2023
    "%b %d, %Y", // Dec 25, 2023
    "%B %d, %Y", // December 25, 2023
    "%d %b %Y", // 25 Dec 2023
    "%d %B %Y", // 25 December 2023
    "%Y/%m/%d", // 2023/12/25
    "%d-%b-%Y", // 25-Dec-2023
    "%Y.%m.%d", // 2023.12.25
    "%d.%m.%Y", // 25.12.2023
];

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unable to parse date: {0}")]
pub struct DayParseError(pub String);

/// Read a single day token relative to `today`.
pub fn parse_day(token: &str, today: NaiveDate) -> Result<NaiveDate, DayParseError> {
    let token = token.trim();

    match token.to_lowercase().as_str() {
        "today" => Ok(today),
        "tomorrow" => today
            .succ_opt()
            .ok_or_else(|| DayParseError(token.to_string())),
        _ => DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(token, format).ok())
            .ok_or_else(|| DayParseError(token.to_string())),
    }
}

/// Seven consecutive days starting at `today`.
pub fn week_from(today: NaiveDate) -> Vec<NaiveDate> {
    (0..WEEK_LENGTH)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .collect()
}

/// Translate the arguments of a `tides` command into the days to report on.
///
/// - no tokens at all means today
/// - `week` anywhere overrides every other token
/// - unreadable tokens are skipped; if none are readable the result is empty
pub fn resolve_days<S: AsRef<str>>(tokens: &[S], today: NaiveDate) -> Vec<NaiveDate> {
    if tokens.is_empty() {
        return vec![today];
    }

    if tokens
        .iter()
        .any(|token| token.as_ref().trim().eq_ignore_ascii_case("week"))
    {
        return week_from(today);
    }

    tokens
        .iter()
        .filter_map(|token| parse_day(token.as_ref(), today).ok())
        .collect()
}
