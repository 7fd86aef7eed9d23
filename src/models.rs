//! Data models for scraped poll tables and the persisted poll history.
//!
//! - [`PollRecord`]: one poll by one institute, the unit that is stored and compared
//! - [`PollState`]: the full persisted dataset, keyed by record key
//! - [`InstituteHeader`], [`DateCell`]: per-scrape views of the table's header and date rows
//! - [`PartyRow`]: a tracked table row and the party label it maps to
//!
//! The persisted field names (`institute`, `link`, `published`, `results`)
//! are kept stable so previously written state documents stay readable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Party label → percentage.
pub type PollResults = BTreeMap<String, f64>;

/// The whole persisted dataset: record key → record.
pub type PollState = BTreeMap<String, PollRecord>;

/// A single poll published by one institute.
///
/// `results` is only ever merged into for a given key: new party values are
/// added or overwritten, parties already present are kept.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PollRecord {
    /// Canonical institute name, e.g. `"INSA"`.
    #[serde(rename = "institute")]
    pub institute_name: String,
    /// Absolute URL of the institute's poll page.
    #[serde(rename = "link")]
    pub source_link: String,
    /// Publication date in `YYYY-MM-DD` format.
    #[serde(rename = "published")]
    pub published_date: String,
    /// Party label → percentage in `[0, 100]`.
    #[serde(default)]
    pub results: PollResults,
}

impl PollRecord {
    pub fn new(institute_name: &str, source_link: &str, published_date: &str) -> Self {
        Self {
            institute_name: institute_name.to_string(),
            source_link: source_link.to_string(),
            published_date: published_date.to_string(),
            results: PollResults::new(),
        }
    }

    /// Key used by the full history: `"{institute}_{date}"`.
    pub fn history_key(&self) -> String {
        history_key(&self.institute_name, &self.published_date)
    }
}

/// Build the history record key for an institute and ISO date.
pub fn history_key(institute_name: &str, published_date: &str) -> String {
    format!("{institute_name}_{published_date}")
}

/// One institute column of the table header.
///
/// The column index is the join key to both the date row and the party rows.
#[derive(Debug, Clone, PartialEq)]
pub struct InstituteHeader {
    /// First word of the header text.
    pub name: String,
    /// Relative link found in the header cell.
    pub link: Option<String>,
}

/// One cell of the date row.
#[derive(Debug, Clone, PartialEq)]
pub struct DateCell {
    pub raw: String,
    /// ISO date, `None` if the cell did not hold a German date.
    pub parsed: Option<String>,
}

/// Institute identity after combining header and cell signals.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInstitute {
    pub name: String,
    pub link: Option<String>,
}

/// A tracked party row: the row's `id` in the table and its canonical label.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PartyRow {
    pub code: String,
    pub label: String,
}

impl PartyRow {
    pub fn new(code: &str, label: &str) -> Self {
        Self {
            code: code.to_string(),
            label: label.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_key() {
        let record = PollRecord::new(
            "INSA",
            "https://www.wahlrecht.de/umfragen/insa.htm",
            "2024-03-01",
        );
        assert_eq!(record.history_key(), "INSA_2024-03-01");
    }

    #[test]
    fn test_record_serializes_with_stable_field_names() {
        let mut record = PollRecord::new("Forsa", "https://example.com/forsa.htm", "2024-03-02");
        record.results.insert("CDU".to_string(), 29.0);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["institute"], "Forsa");
        assert_eq!(json["link"], "https://example.com/forsa.htm");
        assert_eq!(json["published"], "2024-03-02");
        assert_eq!(json["results"]["CDU"], 29.0);
    }

    #[test]
    fn test_state_deserialization_accepts_integer_values() {
        let json = r#"{
            "INSA_2024-03-01": {
                "institute": "INSA",
                "link": "https://www.wahlrecht.de/umfragen/insa.htm",
                "published": "2024-03-01",
                "results": { "CDU": 30, "SPD": 15.5 }
            }
        }"#;

        let state: PollState = serde_json::from_str(json).unwrap();
        let record = &state["INSA_2024-03-01"];
        assert_eq!(record.results["CDU"], 30.0);
        assert_eq!(record.results["SPD"], 15.5);
    }

    #[test]
    fn test_results_equality_ignores_insertion_order() {
        let mut a = PollResults::new();
        a.insert("CDU".to_string(), 30.0);
        a.insert("SPD".to_string(), 20.0);
        let mut b = PollResults::new();
        b.insert("SPD".to_string(), 20.0);
        b.insert("CDU".to_string(), 30.0);
        assert_eq!(a, b);
    }
}
