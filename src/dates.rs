//! German date normalization.
//!
//! The poll table prints publication dates as `DD.MM.YYYY`, with one or two
//! digit day and month fields. This module reformats them textually into
//! ISO `YYYY-MM-DD`. No calendar validation is performed: `31.02.2024`
//! becomes `2024-02-31`.

use once_cell::sync::Lazy;
use regex::Regex;

// ASCII digits only; `\d` would also accept full-width and Arabic-Indic digits.
static GERMAN_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{1,2})\.([0-9]{1,2})\.([0-9]{4})").expect("valid date regex")
});

/// Normalize a `day.month.year` date found anywhere in `raw` into `YYYY-MM-DD`.
///
/// Returns `None` when the text holds no such date. A missing match is an
/// expected outcome for sparse table cells, not an error.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(parse_german_date("3.1.2024").as_deref(), Some("2024-01-03"));
/// assert_eq!(parse_german_date("–"), None);
/// ```
pub fn parse_german_date(raw: &str) -> Option<String> {
    let caps = GERMAN_DATE.captures(raw.trim())?;
    let (day, month, year) = (&caps[1], &caps[2], &caps[3]);
    Some(format!("{year}-{month:0>2}-{day:0>2}"))
}
