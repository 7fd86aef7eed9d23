//! Change detection against previously persisted poll state.

use crate::config::ExtractionMode;
use crate::models::{PollRecord, PollState};
use crate::store::StateStore;
use std::error::Error;
use tracing::{debug, info, instrument};

/// Outcome of one reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// New or changed records, in extraction order.
    pub changed: Vec<PollRecord>,
    /// Number of records in the merged state.
    pub stored: usize,
    /// Whether the merged state was written to the store.
    pub persisted: bool,
}

/// Classify the touched records of `state` against `prior`.
///
/// A record is changed when `prior` has no record under its key or when the
/// stored results differ. Comparison is structural, so key order in the
/// results map does not matter.
pub fn detect_changes(state: &PollState, touched: &[String], prior: &PollState) -> Vec<PollRecord> {
    touched
        .iter()
        .filter_map(|key| state.get(key).map(|record| (key, record)))
        .filter(|(key, record)| match prior.get(*key) {
            Some(old) => old.results != record.results,
            None => true,
        })
        .map(|(_, record)| record.clone())
        .collect()
}

/// Whether the merged state should be written back.
pub fn should_persist(mode: ExtractionMode, stored: usize, changed: usize) -> bool {
    match mode {
        ExtractionMode::History => stored > 0,
        ExtractionMode::Latest => stored > 0 && changed > 0,
    }
}

/// Reload prior state from `store`, detect changes, and persist the merged
/// state when the mode's persistence rule allows it.
///
/// Prior state is read again here rather than reused from the start of the
/// run, so the comparison sees what is actually stored right now.
///
/// # Errors
///
/// Only a failed write is an error; an unreadable store counts as empty.
#[instrument(level = "info", skip_all, fields(%mode, touched = touched.len()))]
pub async fn reconcile<S: StateStore>(
    store: &S,
    state: &PollState,
    touched: &[String],
    mode: ExtractionMode,
) -> Result<Reconciliation, Box<dyn Error>> {
    let prior = store.load().await.into_state();
    debug!(prior = prior.len(), "Reloaded prior poll state");

    let changed = detect_changes(state, touched, &prior);
    let stored = state.len();
    let persisted = should_persist(mode, stored, changed.len());
    if persisted {
        store.save(state).await?;
    }

    info!(changed = changed.len(), stored, persisted, "Reconciled poll state");
    Ok(Reconciliation {
        changed,
        stored,
        persisted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, ReadOnlyStore};

    fn record(institute: &str, date: &str, results: &[(&str, f64)]) -> PollRecord {
        let mut r = PollRecord::new(institute, "https://www.wahlrecht.de/umfragen/", date);
        for (party, value) in results {
            r.results.insert(party.to_string(), *value);
        }
        r
    }

    fn state_of(records: &[PollRecord]) -> PollState {
        records.iter().map(|r| (r.history_key(), r.clone())).collect()
    }

    fn latest_state_of(records: &[PollRecord]) -> PollState {
        records.iter().map(|r| (r.institute_name.clone(), r.clone())).collect()
    }

    #[test]
    fn test_new_record_is_changed() {
        let state = state_of(&[record("INSA", "2024-03-01", &[("CDU", 30.0)])]);
        let touched = ["INSA_2024-03-01".to_string()];
        let changed = detect_changes(&state, &touched, &PollState::new());
        assert_eq!(changed.len(), 1);
    }

    #[test]
    fn test_result_order_does_not_matter() {
        let prior = state_of(&[record("INSA", "2024-03-01", &[("CDU", 30.0), ("SPD", 20.0)])]);
        let state = state_of(&[record("INSA", "2024-03-01", &[("SPD", 20.0), ("CDU", 30.0)])]);
        let changed = detect_changes(&state, &["INSA_2024-03-01".to_string()], &prior);
        assert!(changed.is_empty());
    }

    #[test]
    fn test_changed_value_and_added_party() {
        let prior = state_of(&[
            record("INSA", "2024-03-01", &[("CDU", 30.0)]),
            record("Forsa", "2024-03-02", &[("CDU", 29.0)]),
        ]);
        let state = state_of(&[
            record("INSA", "2024-03-01", &[("CDU", 31.0)]),
            record("Forsa", "2024-03-02", &[("CDU", 29.0), ("SPD", 15.0)]),
        ]);
        let touched = ["Forsa_2024-03-02".to_string(), "INSA_2024-03-01".to_string()];
        let changed = detect_changes(&state, &touched, &prior);

        let keys: Vec<String> = changed.iter().map(PollRecord::history_key).collect();
        assert_eq!(keys, ["Forsa_2024-03-02", "INSA_2024-03-01"]);
    }

    #[test]
    fn test_untouched_records_are_not_reported() {
        let state = state_of(&[record("GMS", "2023-12-01", &[("CDU", 32.0)])]);
        assert!(detect_changes(&state, &[], &PollState::new()).is_empty());
    }

    #[test]
    fn test_persistence_rules() {
        assert!(should_persist(ExtractionMode::History, 3, 0));
        assert!(!should_persist(ExtractionMode::History, 0, 0));
        assert!(should_persist(ExtractionMode::Latest, 3, 1));
        assert!(!should_persist(ExtractionMode::Latest, 3, 0));
    }

    #[tokio::test]
    async fn test_reconcile_persists_merged_state() {
        let store = MemoryStore::default();
        let state = state_of(&[record("INSA", "2024-03-01", &[("CDU", 30.0)])]);
        let touched = vec!["INSA_2024-03-01".to_string()];

        let first = reconcile(&store, &state, &touched, ExtractionMode::History).await.unwrap();
        assert_eq!(first.changed.len(), 1);
        assert!(first.persisted);

        let second = reconcile(&store, &state, &touched, ExtractionMode::History).await.unwrap();
        assert!(second.changed.is_empty());
        assert!(second.persisted);
        assert_eq!(store.saves(), 2);
        assert_eq!(store.load().await.into_state(), state);
    }

    #[tokio::test]
    async fn test_reconcile_latest_skips_save_without_changes() {
        let state = latest_state_of(&[record("INSA", "2024-03-01", &[("CDU", 30.0)])]);
        let store = MemoryStore::with_state(&state);

        let outcome = reconcile(&store, &state, &["INSA".to_string()], ExtractionMode::Latest)
            .await
            .unwrap();
        assert!(outcome.changed.is_empty());
        assert!(!outcome.persisted);
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_corrupt_store_counts_as_empty() {
        let store = MemoryStore::with_document("{ definitely not json");
        let state = state_of(&[record("INSA", "2024-03-01", &[("CDU", 30.0)])]);

        let touched = ["INSA_2024-03-01".to_string()];
        let outcome = reconcile(&store, &state, &touched, ExtractionMode::History)
            .await
            .unwrap();
        assert_eq!(outcome.changed.len(), 1);
        assert_eq!(store.load().await.into_state(), state);
    }

    #[tokio::test]
    async fn test_reconcile_write_failure_is_fatal() {
        let store = ReadOnlyStore::default();
        let state = state_of(&[record("INSA", "2024-03-01", &[("CDU", 30.0)])]);
        let touched = ["INSA_2024-03-01".to_string()];

        let result = reconcile(&store, &state, &touched, ExtractionMode::History).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn test_reconcile_latest_without_changes_never_writes() {
        let state = latest_state_of(&[record("INSA", "2024-03-01", &[("CDU", 30.0)])]);
        let store = ReadOnlyStore::with_state(&state);

        let outcome = reconcile(&store, &state, &["INSA".to_string()], ExtractionMode::Latest)
            .await
            .unwrap();
        assert!(!outcome.persisted);
    }
}
