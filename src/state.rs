//! Persisted application state: the remote vector store id, the indexed filenames, and the
//! time of the last successful indexing run.
//!
//! The record lives in a small pretty-printed JSON file. Loading never fails: a missing or
//! corrupt file yields [`AppState::default`], and a field of the wrong type falls back to its
//! own default without discarding the others. Saving overwrites the whole file. There is no
//! file locking, so two processes sharing one state file race and the last writer wins.

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while persisting the state record.
#[derive(Debug, Error)]
pub enum StateError {
    /// The state file could not be written.
    #[error("Failed to write state file {path}: {source}")]
    Io {
        /// Location of the state file.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// The state could not be serialized.
    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable record of what has been pushed to the remote index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    /// Identifier of the remote vector store, once created.
    #[serde(rename = "vector_store_id", default, deserialize_with = "lenient")]
    pub remote_index_id: Option<String>,
    /// Filenames included in the last successful indexing run.
    #[serde(default, deserialize_with = "lenient")]
    pub indexed_files: BTreeSet<String>,
    /// Epoch seconds of the last successful indexing run.
    #[serde(rename = "last_index_time", default, deserialize_with = "lenient")]
    pub last_index_timestamp: Option<i64>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Ignoring malformed state field");
        T::default()
    }))
}

/// Reads and writes [`AppState`] at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state, falling back to defaults on any read or parse failure.
    pub fn load(&self) -> AppState {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No state file; using defaults");
                return AppState::default();
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "Unreadable state file; using defaults");
                return AppState::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "Corrupt state file; using defaults");
                AppState::default()
            }
        }
    }

    /// Serialize `state` and overwrite the backing file.
    pub fn save(&self, state: &AppState) -> Result<(), StateError> {
        let mut body = serde_json::to_string_pretty(state)?;
        body.push('\n');
        std::fs::write(&self.path, body).map_err(|source| StateError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(
            path = %self.path.display(),
            remote_index_id = ?state.remote_index_id,
            indexed_files = state.indexed_files.len(),
            "State saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> StateStore {
        StateStore::new(dir.path().join("app_state.json"))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(store_in(&dir).load(), AppState::default());
    }

    #[test]
    fn malformed_files_yield_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        for body in ["", "{", "not json", "[1, 2]", r#"{"indexed_files": "a.pdf"}"#] {
            std::fs::write(store.path(), body).expect("write");
            assert_eq!(store.load(), AppState::default(), "body: {body:?}");
        }

        std::fs::write(store.path(), [0xff, 0xfe, 0x00]).expect("write bytes");
        assert_eq!(store.load(), AppState::default());
    }

    #[test]
    fn mistyped_fields_keep_the_index_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            r#"{"vector_store_id": "vs_keep", "indexed_files": null, "last_index_time": "yesterday"}"#,
        )
        .expect("write");

        let state = store.load();
        assert_eq!(state.remote_index_id.as_deref(), Some("vs_keep"));
        assert!(state.indexed_files.is_empty());
        assert_eq!(state.last_index_timestamp, None);

        std::fs::write(store.path(), r#"{"vector_store_id": 42, "indexed_files": ["a.pdf", 7]}"#)
            .expect("write");
        assert_eq!(store.load(), AppState::default());
    }

    #[test]
    fn reads_the_documented_field_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            r#"{"vector_store_id": "vs_1", "indexed_files": ["b.pdf", "a.pdf"], "last_index_time": 1700000000}"#,
        )
        .expect("write");

        let state = store.load();
        assert_eq!(state.remote_index_id.as_deref(), Some("vs_1"));
        assert_eq!(
            state.indexed_files.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["a.pdf", "b.pdf"]
        );
        assert_eq!(state.last_index_timestamp, Some(1_700_000_000));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            r#"{"vector_store_id": null, "indexed_files": ["paper1.pdf"], "last_index_time": null}"#,
        )
        .expect("write");

        let loaded = store.load();
        store.save(&loaded).expect("save");
        assert_eq!(store.load(), loaded);

        let raw = std::fs::read_to_string(store.path()).expect("read back");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert!(value["vector_store_id"].is_null());
        assert_eq!(value["indexed_files"], serde_json::json!(["paper1.pdf"]));
        assert!(value["last_index_time"].is_null());
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::new(dir.path().join("missing").join("state.json"));
        let error = store.save(&AppState::default()).expect_err("no parent dir");
        assert!(matches!(error, StateError::Io { .. }));
    }
}
