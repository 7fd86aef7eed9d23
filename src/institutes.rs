//! Polling institute identification.
//!
//! The column header names an institute, but the table is not consistent
//! about it: for some institutes the only reliable identity is a link buried
//! inside a data cell. [`resolve_institute`] combines both signals.

use crate::models::ResolvedInstitute;

/// Known URL fragments and the institute they identify, most specific first.
///
/// Evaluated top to bottom; the first fragment contained in the lower-cased
/// link wins.
pub const INSTITUTE_URL_FRAGMENTS: &[(&str, &str)] = &[
    ("insa", "INSA"),
    ("yougov", "YouGov"),
    ("forsa", "Forsa"),
    ("kantar", "Kantar"),
    ("allensbach", "Allensbach"),
    ("dimap", "Infratest dimap"),
    ("gms", "GMS"),
    ("verian", "Verian (Emnid)"),
    ("emnid", "Verian (Emnid)"),
];

/// Classify a lower-cased link by the institute fragment it contains.
pub fn institute_for_link(link: &str) -> Option<&'static str> {
    INSTITUTE_URL_FRAGMENTS
        .iter()
        .find(|(fragment, _)| link.contains(fragment))
        .map(|(_, name)| *name)
}

/// Resolve the institute behind one data cell.
///
/// Starts from the header-derived name and link. If the cell carries its own
/// hyperlink, that link (lower-cased) replaces the header link, and the name
/// is replaced when the link matches a known institute fragment.
///
/// # Arguments
///
/// * `header_name` - First word of the column header
/// * `header_link` - Link found in the column header, if any
/// * `cell_link` - Link found inside the data cell, if any
pub fn resolve_institute(
    header_name: &str,
    header_link: Option<&str>,
    cell_link: Option<&str>,
) -> ResolvedInstitute {
    match cell_link {
        Some(href) => {
            let link = href.to_lowercase();
            let name = institute_for_link(&link).unwrap_or(header_name).to_string();
            ResolvedInstitute {
                name,
                link: Some(link),
            }
        }
        None => ResolvedInstitute {
            name: header_name.to_string(),
            link: header_link.map(str::to_string),
        },
    }
}
