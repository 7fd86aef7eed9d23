//! Opinion-poll table scraping with change detection.
//!
//! [`pipeline::scrape_polls`] is the entry point: it fetches the poll page
//! through a [`fetch::Fetch`] implementation, folds the table into the state
//! held by a [`store::StateStore`], and returns the new or changed
//! [`models::PollRecord`]s in extraction order.

pub mod cli;
pub mod config;
pub mod dates;
pub mod fetch;
pub mod institutes;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod reconcile;
pub mod scrapers;
pub mod store;
pub mod utils;
