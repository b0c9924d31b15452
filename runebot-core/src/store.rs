//! Session-scoped persistence.
//!
//! One [`SessionStore`] per game session: a directory keyed by the
//! sanitized session name, holding one pretty-JSON document per
//! subsystem. Saves are blocking write-throughs performed immediately
//! after each mutation; loads of missing or corrupt documents fall back
//! to the subsystem's default state so a long-running agent never fails
//! to start.
//!
//! The store has no locking. Concurrent writers to the same session are
//! unsafe; callers must keep a single writer per session.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Current document format version.
const STORE_VERSION: u32 = 1;

/// Document name for the bounded action-outcome history.
pub const OUTCOMES_DOC: &str = "outcomes";

/// Document name for the resilience tracker (death log, avoid list,
/// decision outcomes, success chains, confidence scores).
pub const RESILIENCE_DOC: &str = "resilience";

/// Document name for goals and quest goals.
pub const GOALS_DOC: &str = "goals";

/// Document name for tutorial progress state.
pub const TUTORIAL_DOC: &str = "tutorial";

/// Document name for session metadata.
pub const META_DOC: &str = "meta";

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Versioned envelope wrapped around every persisted document.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    data: T,
}

/// A per-session document store.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Open (creating if needed) the store directory for a session.
    pub fn open(root: impl AsRef<Path>, session_name: &str) -> Result<Self, StoreError> {
        let dir = root.as_ref().join(sanitize_name(session_name));
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The on-disk directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load a document, or return `T::default()` when it is missing,
    /// corrupt, or from a different format version.
    pub fn load_or_default<T: DeserializeOwned + Default>(&self, doc: &str) -> T {
        self.load_optional(doc).unwrap_or_default()
    }

    /// Load a document if it exists and parses at the current version.
    pub fn load_optional<T: DeserializeOwned>(&self, doc: &str) -> Option<T> {
        let path = self.doc_path(doc);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(doc, error = %err, "failed to read document, using defaults");
                return None;
            }
        };

        match serde_json::from_str::<Envelope<T>>(&content) {
            Ok(envelope) if envelope.version == STORE_VERSION => Some(envelope.data),
            Ok(envelope) => {
                warn!(
                    doc,
                    found = envelope.version,
                    expected = STORE_VERSION,
                    "document version mismatch, using defaults"
                );
                None
            }
            Err(err) => {
                warn!(doc, error = %err, "corrupt document, using defaults");
                None
            }
        }
    }

    /// Write a document through to disk immediately.
    pub fn save<T: Serialize>(&self, doc: &str, value: &T) -> Result<(), StoreError> {
        let envelope = Envelope {
            version: STORE_VERSION,
            data: value,
        };
        let content = serde_json::to_string_pretty(&envelope)?;
        std::fs::write(self.doc_path(doc), content)?;
        Ok(())
    }

    fn doc_path(&self, doc: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_name(doc)))
    }
}

/// Replace anything non-alphanumeric with underscores so session names
/// make safe path components.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Current unix timestamp in seconds.
pub(crate) fn unix_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::open(temp.path(), "Test Session").unwrap();

        let mut doc = BTreeMap::new();
        doc.insert("fishing".to_string(), 25u32);
        store.save("skills", &doc).unwrap();

        let loaded: BTreeMap<String, u32> = store.load_or_default("skills");
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_missing_document_defaults() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::open(temp.path(), "fresh").unwrap();

        let loaded: Vec<String> = store.load_or_default("nothing_here");
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_corrupt_document_defaults() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::open(temp.path(), "corrupt").unwrap();

        std::fs::write(store.dir().join("bad.json"), "{ not json").unwrap();
        let loaded: Vec<String> = store.load_or_default("bad");
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_sanitized_session_dir() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::open(temp.path(), "Bob's Agent!").unwrap();
        let dir = store.dir().to_string_lossy().to_string();
        assert!(dir.contains("Bob_s_Agent_"));
    }

    #[test]
    fn test_version_mismatch_defaults() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::open(temp.path(), "versioned").unwrap();

        std::fs::write(
            store.dir().join("doc.json"),
            r#"{"version": 999, "data": ["stale"]}"#,
        )
        .unwrap();
        let loaded: Vec<String> = store.load_or_default("doc");
        assert!(loaded.is_empty());
    }
}
