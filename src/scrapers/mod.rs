//! Poll table scrapers.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | wahlrecht.de | [`wahlrecht`] | HTML table scraping | Federal and state tables share a layout |
//!
//! Each scraper turns fetched markup into poll records folded into the
//! in-memory [`PollState`](crate::models::PollState); fetching and
//! persistence live elsewhere.

pub mod wahlrecht;
