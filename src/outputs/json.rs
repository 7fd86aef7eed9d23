//! JSON report of the polls a run found new or changed.
//!
//! Reports are grouped by local date. A later run on the same day replaces
//! that day's report.

use crate::config::ExtractionMode;
use crate::models::PollRecord;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::error::Error;
use tokio::fs;
use tracing::{error, info, instrument};

/// The changed polls of one run, stamped with local date and time.
#[derive(Debug, Deserialize, Serialize)]
pub struct ChangeReport {
    /// Date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    /// Local time of the run.
    pub local_time: String,
    pub mode: ExtractionMode,
    pub changed: Vec<PollRecord>,
}

impl ChangeReport {
    pub fn now(mode: ExtractionMode, changed: Vec<PollRecord>) -> Self {
        let now = Local::now();
        Self {
            local_date: now.date_naive().to_string(),
            local_time: now.time().format("%H:%M:%S").to_string(),
            mode,
            changed,
        }
    }
}

/// Write a [`ChangeReport`] to `{json_output_dir}/{local_date}/changes.json`.
///
/// # Returns
///
/// The path of the written file, or an error if directory creation or
/// file writing fails.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_report(
    report: &ChangeReport,
    json_output_dir: &str,
) -> Result<String, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;

    let full_json_dir = format!(
        "{}/{}",
        json_output_dir.trim_end_matches('/'),
        report.local_date
    );
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(%full_json_dir, error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let output_json_filename = format!("{full_json_dir}/changes.json");
    fs::write(&output_json_filename, json).await?;
    info!(path = %output_json_filename, changed = report.changed.len(), "Wrote change report");

    Ok(output_json_filename)
}
