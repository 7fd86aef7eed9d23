//! Durable storage of the poll history.
//!
//! The store is an explicitly constructed handle passed into the pipeline,
//! so tests can substitute [`MemoryStore`] for the [`JsonFileStore`] used in
//! production.
//!
//! # Persisted format
//!
//! A pretty-printed UTF-8 JSON object mapping record key to poll record:
//!
//! ```text
//! {
//!   "INSA_2024-03-01": {
//!     "institute": "INSA",
//!     "link": "https://www.wahlrecht.de/umfragen/insa.htm",
//!     "published": "2024-03-01",
//!     "results": { "CDU": 30.5 }
//!   }
//! }
//! ```

use crate::models::PollState;
use std::error::Error;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Result of reading prior state.
///
/// Callers treat [`LoadOutcome::Missing`] and [`LoadOutcome::Corrupt`] the
/// same way (no prior state); the distinction is kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(PollState),
    /// No state has been saved yet.
    Missing,
    /// State exists but could not be read or parsed.
    Corrupt(String),
}

impl LoadOutcome {
    /// Collapse into a state, treating missing or corrupt state as empty.
    pub fn into_state(self) -> PollState {
        match self {
            LoadOutcome::Loaded(state) => state,
            LoadOutcome::Missing => PollState::new(),
            LoadOutcome::Corrupt(reason) => {
                warn!(%reason, "Prior poll state is unreadable; starting from empty state");
                PollState::new()
            }
        }
    }
}

/// Key-value persistence of the full record set.
#[allow(async_fn_in_trait)]
pub trait StateStore {
    /// Read the stored state. Never fails the caller.
    async fn load(&self) -> LoadOutcome;

    /// Replace the stored state with `state`.
    async fn save(&self, state: &PollState) -> Result<(), Box<dyn Error>>;
}

/// Decode a persisted state document.
pub fn decode_state(text: &str) -> LoadOutcome {
    match serde_json::from_str::<PollState>(text) {
        Ok(state) => LoadOutcome::Loaded(state),
        Err(e) => LoadOutcome::Corrupt(e.to_string()),
    }
}

/// Encode state as the pretty-printed persisted document.
pub fn encode_state(state: &PollState) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(state)
}

/// State kept in a single JSON file on local disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for JsonFileStore {
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    async fn load(&self) -> LoadOutcome {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No poll state file yet");
                return LoadOutcome::Missing;
            }
            Err(e) => return LoadOutcome::Corrupt(e.to_string()),
        };
        let outcome = decode_state(&text);
        if let LoadOutcome::Loaded(state) = &outcome {
            debug!(records = state.len(), "Loaded poll state");
        }
        outcome
    }

    #[instrument(
        level = "info",
        skip_all,
        fields(path = %self.path.display(), records = state.len())
    )]
    async fn save(&self, state: &PollState) -> Result<(), Box<dyn Error>> {
        let json = encode_state(state)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(&self.path, json).await?;
        info!("Wrote poll state");
        Ok(())
    }
}

/// In-memory store holding the serialized document, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: std::sync::Mutex<Option<String>>,
    saves: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with_document(text: &str) -> Self {
        Self {
            document: std::sync::Mutex::new(Some(text.to_string())),
            ..Self::default()
        }
    }

    pub fn with_state(state: &PollState) -> Self {
        Self::with_document(&encode_state(state).unwrap())
    }

    pub fn document(&self) -> Option<String> {
        self.document.lock().unwrap().clone()
    }

    pub fn saves(&self) -> usize {
        self.saves.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl StateStore for MemoryStore {
    async fn load(&self) -> LoadOutcome {
        match self.document() {
            Some(text) => decode_state(&text),
            None => LoadOutcome::Missing,
        }
    }

    async fn save(&self, state: &PollState) -> Result<(), Box<dyn Error>> {
        *self.document.lock().unwrap() = Some(encode_state(state)?);
        self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

/// Store whose writes always fail, for tests of the fatal write path.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ReadOnlyStore {
    prior: MemoryStore,
}

#[cfg(test)]
impl ReadOnlyStore {
    pub fn with_state(state: &PollState) -> Self {
        Self {
            prior: MemoryStore::with_state(state),
        }
    }
}

#[cfg(test)]
impl StateStore for ReadOnlyStore {
    async fn load(&self) -> LoadOutcome {
        self.prior.load().await
    }

    async fn save(&self, _state: &PollState) -> Result<(), Box<dyn Error>> {
        Err("disk full".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PollRecord;

    fn sample_state() -> PollState {
        let mut record = PollRecord::new(
            "INSA",
            "https://www.wahlrecht.de/umfragen/insa.htm",
            "2024-03-01",
        );
        record.results.insert("CDU".to_string(), 30.5);
        let mut state = PollState::new();
        state.insert(record.history_key(), record);
        state
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("poll_watch_store_{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_decode_corrupt_document() {
        assert!(matches!(decode_state("{ not json"), LoadOutcome::Corrupt(_)));
        assert!(matches!(decode_state("[1, 2]"), LoadOutcome::Corrupt(_)));
    }

    #[test]
    fn test_missing_and_corrupt_collapse_to_empty() {
        assert!(LoadOutcome::Missing.into_state().is_empty());
        assert!(LoadOutcome::Corrupt("bad".to_string()).into_state().is_empty());
    }

    #[test]
    fn test_encoded_state_is_pretty_printed() {
        let json = encode_state(&sample_state()).unwrap();
        assert!(json.contains("\n  \"INSA_2024-03-01\": {"));
    }

    #[tokio::test]
    async fn test_file_store_missing_file() {
        let store = JsonFileStore::new(temp_path("does_not_exist.json"));
        assert_eq!(store.load().await, LoadOutcome::Missing);
    }

    #[tokio::test]
    async fn test_file_store_save_then_load() {
        let path = temp_path("roundtrip/state.json");
        let store = JsonFileStore::new(&path);
        store.save(&sample_state()).await.unwrap();

        assert_eq!(store.load().await, LoadOutcome::Loaded(sample_state()));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file() {
        let path = temp_path("corrupt.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{\"truncated\": ").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load().await, LoadOutcome::Corrupt(_)));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_memory_store_counts_saves() {
        let store = MemoryStore::default();
        assert_eq!(store.load().await, LoadOutcome::Missing);
        store.save(&sample_state()).await.unwrap();
        assert_eq!(store.saves(), 1);
        assert_eq!(store.load().await.into_state(), sample_state());
    }
}
