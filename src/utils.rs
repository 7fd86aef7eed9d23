//! Small helpers shared across the scraper.
//!
//! - Lenient decimal parsing for German-formatted table cells
//! - String truncation for log previews
//! - File system validation for output directories

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
        .expect("valid number regex")
});

/// Parse the leading number of a table cell.
///
/// The first comma is treated as the decimal separator, then the longest
/// leading decimal literal is parsed. Trailing text such as a `%` sign is
/// ignored. Returns `None` when the cell does not start with a number.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(parse_decimal("30,5 %"), Some(30.5));
/// assert_eq!(parse_decimal("–"), None);
/// ```
pub fn parse_decimal(text: &str) -> Option<f64> {
    let normalized = text.trim().replacen(',', ".", 1);
    let m = LEADING_NUMBER.find(&normalized)?;
    m.as_str().parse::<f64>().ok()
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to roughly `max` bytes (never splitting a
/// character) with an ellipsis and byte count indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a marker file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    let check_path = format!("{}/.poll_watch_write_check", path.trim_end_matches('/'));
    match stdfs::File::create(&check_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&check_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
