//! wahlrecht.de poll table extractor.
//!
//! The overview page holds a single `table.wilko`:
//!
//! - `thead tr th.in`: one header cell per institute, linking to its page
//! - `tbody tr#datum td`: publication date of each institute's latest poll
//! - `tr#cdu td`, `tr#spd td`, ...: one row per party, one cell per institute
//!
//! Columns line up by position: the n-th `td` of any body row belongs to the
//! n-th institute header. Cells are sparse and irregular, so unusable cells
//! are skipped rather than treated as errors.
//!
//! Extraction happens in two steps. [`parse_poll_table`] reads the markup into
//! a plain [`PollTable`]; [`extract_polls`] folds that table into the poll state
//! according to the configured [`ExtractionMode`].

use crate::config::{ExtractionMode, ScrapeConfig};
use crate::dates::parse_german_date;
use crate::institutes::resolve_institute;
use crate::models::{
    history_key, DateCell, InstituteHeader, PartyRow, PollRecord, PollResults, PollState,
};
use crate::utils::parse_decimal;
use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::error::Error;
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

/// Id of the table row holding publication dates.
const DATE_ROW_ID: &str = "datum";

/// A body cell: its text and the first hyperlink inside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCell {
    pub text: String,
    pub link: Option<String>,
}

impl TableCell {
    #[cfg(test)]
    fn new(text: &str, link: Option<&str>) -> Self {
        Self {
            text: text.to_string(),
            link: link.map(str::to_string),
        }
    }
}

/// The parts of the poll table the extractor needs, detached from the DOM.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollTable {
    pub headers: Vec<InstituteHeader>,
    pub dates: Vec<DateCell>,
    /// Row id → data cells, for every body row carrying an id.
    pub rows: HashMap<String, Vec<TableCell>>,
}

impl PollTable {
    fn cell(&self, row_id: &str, col: usize) -> Option<&TableCell> {
        self.rows.get(row_id).and_then(|cells| cells.get(col))
    }
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_href(el: &ElementRef, anchor: &Selector) -> Option<String> {
    el.select(anchor)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

/// Parse the poll table out of a page.
///
/// A page without a matching table yields an empty [`PollTable`].
///
/// # Errors
///
/// Returns an error only if `table_selector` is not a valid CSS selector.
#[instrument(level = "debug", skip_all, fields(%table_selector))]
pub fn parse_poll_table(html: &str, table_selector: &str) -> Result<PollTable, Box<dyn Error>> {
    let table_sel = Selector::parse(table_selector)
        .map_err(|e| format!("invalid table selector {table_selector:?}: {e:?}"))?;
    let header_sel = Selector::parse("thead tr th.in").unwrap();
    let row_sel = Selector::parse("tr").unwrap();
    let cell_sel = Selector::parse("td").unwrap();
    let anchor_sel = Selector::parse("a[href]").unwrap();

    let document = Html::parse_document(html);
    let Some(table) = document.select(&table_sel).next() else {
        warn!("Poll table not found in page");
        return Ok(PollTable::default());
    };

    let headers = table
        .select(&header_sel)
        .map(|th| InstituteHeader {
            name: element_text(&th)
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string(),
            link: first_href(&th, &anchor_sel),
        })
        .collect::<Vec<_>>();

    let mut dates = Vec::new();
    let mut rows: HashMap<String, Vec<TableCell>> = HashMap::new();
    for tr in table.select(&row_sel) {
        let Some(id) = tr.value().id() else { continue };
        if id == DATE_ROW_ID {
            if dates.is_empty() {
                dates = tr
                    .select(&cell_sel)
                    .map(|td| {
                        let raw = element_text(&td);
                        let parsed = parse_german_date(&raw);
                        DateCell { raw, parsed }
                    })
                    .collect();
            }
            continue;
        }
        rows.entry(id.to_string()).or_insert_with(|| {
            tr.select(&cell_sel)
                .map(|td| TableCell {
                    text: element_text(&td),
                    link: first_href(&td, &anchor_sel),
                })
                .collect()
        });
    }

    debug!(
        headers = headers.len(),
        dates = dates.len(),
        rows = rows.len(),
        "Parsed poll table"
    );
    Ok(PollTable {
        headers,
        dates,
        rows,
    })
}

/// Resolve an institute link against the page base, falling back to the base.
fn source_link(base: &Url, link: Option<&str>) -> String {
    link.and_then(|l| base.join(l).ok())
        .unwrap_or_else(|| base.clone())
        .to_string()
}

/// Numeric value of a cell, if it holds a percentage.
fn cell_value(cell: &TableCell) -> Option<f64> {
    parse_decimal(&cell.text).filter(|v| (0.0..=100.0).contains(v))
}

/// Fold a parsed table into `state` and return the touched record keys in
/// first-touch order.
///
/// # Errors
///
/// Returns an error if `config.link_base` is not an absolute URL.
#[instrument(level = "info", skip_all, fields(mode = %config.mode))]
pub fn extract_polls(
    table: &PollTable,
    config: &ScrapeConfig,
    state: &mut PollState,
) -> Result<Vec<String>, Box<dyn Error>> {
    let base = Url::parse(&config.link_base)?;
    let touched = match config.mode {
        ExtractionMode::History => extract_history(table, &config.party_rows, &base, state),
        ExtractionMode::Latest => extract_latest(table, &config.party_rows, &base, state),
    };
    info!(records = touched.len(), "Extracted poll records");
    Ok(touched)
}

/// Walk party rows then columns, merging each value into the record keyed by
/// institute and publication date.
fn extract_history(
    table: &PollTable,
    party_rows: &[PartyRow],
    base: &Url,
    state: &mut PollState,
) -> Vec<String> {
    let mut touched = Vec::new();

    for party in party_rows {
        let Some(cells) = table.rows.get(&party.code) else {
            debug!(row = %party.code, "Party row missing from table");
            continue;
        };

        for (col, cell) in cells.iter().enumerate() {
            let Some(header) = table.headers.get(col) else {
                trace!(row = %party.code, col, "No institute header for column");
                continue;
            };
            let institute =
                resolve_institute(&header.name, header.link.as_deref(), cell.link.as_deref());

            let Some(published) = table.dates.get(col).and_then(|d| d.parsed.as_deref()) else {
                trace!(row = %party.code, col, "No parseable date for column");
                continue;
            };
            let Some(value) = cell_value(cell) else {
                trace!(row = %party.code, col, text = %cell.text, "Skipping non-numeric cell");
                continue;
            };

            let key = history_key(&institute.name, published);
            let record = state.entry(key.clone()).or_insert_with(|| {
                PollRecord::new(
                    &institute.name,
                    &source_link(base, institute.link.as_deref()),
                    published,
                )
            });
            record.results.insert(party.label.clone(), value);
            touched.push(key);
        }
    }

    touched.into_iter().unique().collect()
}

/// Walk the date row, building one record per institute from its column and
/// replacing whatever was stored for that institute.
fn extract_latest(
    table: &PollTable,
    party_rows: &[PartyRow],
    base: &Url,
    state: &mut PollState,
) -> Vec<String> {
    let mut touched = Vec::new();

    for (col, date) in table.dates.iter().enumerate() {
        let Some(header) = table.headers.get(col) else {
            trace!(col, "No institute header for date column");
            continue;
        };
        let Some(published) = date.parsed.as_deref() else {
            trace!(col, raw = %date.raw, "Skipping unparseable date");
            continue;
        };

        let results: PollResults = party_rows
            .iter()
            .filter_map(|party| {
                table
                    .cell(&party.code, col)
                    .and_then(cell_value)
                    .map(|v| (party.label.clone(), v))
            })
            .collect();
        if results.is_empty() {
            trace!(col, institute = %header.name, "Column holds no values");
            continue;
        }

        let mut record = PollRecord::new(
            &header.name,
            &source_link(base, header.link.as_deref()),
            published,
        );
        record.results = results;
        state.insert(header.name.clone(), record);
        touched.push(header.name.clone());
    }

    touched.into_iter().unique().collect()
}
