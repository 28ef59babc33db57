//! Remote index lifecycle: create the vector store once, then push documents into it.

use crate::documents::DocumentRef;
use crate::openai::{BackendError, RetrievalBackend, UploadFile};
use crate::state::{AppState, StateError, StateStore};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while creating the index or uploading documents.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A document could not be opened for upload.
    #[error("Failed to open {file_name}: {source}")]
    Open {
        /// Name of the document that failed to open.
        file_name: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The remote service rejected or failed the request.
    #[error("Indexing request failed: {0}")]
    Backend(#[from] BackendError),
    /// The updated state could not be persisted.
    #[error("Failed to persist state: {0}")]
    State(#[from] StateError),
}

/// Outcome of an indexing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    /// Nothing was uploaded because the document list was empty.
    NoDocuments,
    /// Terminal status reported by the service for the upload batch.
    Reported(String),
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDocuments => f.write_str("no_pdfs"),
            Self::Reported(status) => f.write_str(status),
        }
    }
}

/// Creates the remote index on demand and uploads documents into it.
pub struct IndexManager {
    backend: Arc<dyn RetrievalBackend>,
    store: StateStore,
    vector_store_name: String,
}

impl IndexManager {
    /// Build a manager that persists index metadata through `store`.
    pub fn new(
        backend: Arc<dyn RetrievalBackend>,
        store: StateStore,
        vector_store_name: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            store,
            vector_store_name: vector_store_name.into(),
        }
    }

    /// Return the remote index id, creating and persisting it when `state` has none yet.
    pub async fn ensure_index(&self, state: &mut AppState) -> Result<String, IndexError> {
        if let Some(id) = &state.remote_index_id {
            return Ok(id.clone());
        }

        tracing::info!(name = %self.vector_store_name, "Creating remote index");
        let id = self
            .backend
            .create_vector_store(&self.vector_store_name)
            .await?;
        state.remote_index_id = Some(id.clone());
        self.store.save(state)?;
        Ok(id)
    }

    /// Upload `documents` into the index and block until the service finishes processing them.
    ///
    /// An empty list returns [`BatchStatus::NoDocuments`] without contacting the service. Every
    /// opened handle is owned by the upload and released whether it succeeds or fails. Partial
    /// uploads are not rolled back.
    pub async fn index_documents(
        &self,
        index_id: &str,
        documents: &[DocumentRef],
    ) -> Result<BatchStatus, IndexError> {
        if documents.is_empty() {
            tracing::debug!(index_id, "No documents to index");
            return Ok(BatchStatus::NoDocuments);
        }

        let mut files = Vec::with_capacity(documents.len());
        for document in documents {
            let file = tokio::fs::File::open(document.path())
                .await
                .map_err(|source| IndexError::Open {
                    file_name: document.file_name().to_string(),
                    source,
                })?;
            files.push(UploadFile {
                file_name: document.file_name().to_string(),
                file,
            });
        }

        tracing::info!(index_id, files = files.len(), "Uploading documents");
        let status = self.backend.upload_and_poll(index_id, files).await?;
        Ok(BatchStatus::Reported(status))
    }

    /// Record a successful indexing run of `documents` at `now` (epoch seconds) and persist it.
    pub fn record_indexed(
        &self,
        state: &mut AppState,
        documents: &[DocumentRef],
        now: i64,
    ) -> Result<(), IndexError> {
        state.indexed_files = file_names(documents);
        state.last_index_timestamp = Some(now);
        self.store.save(state)?;
        Ok(())
    }
}

/// Whether `documents` differ from what `state` last indexed.
///
/// Only filenames are compared, so a document edited in place is not detected.
pub fn needs_indexing(state: &AppState, documents: &[DocumentRef]) -> bool {
    !documents.is_empty() && state.indexed_files != file_names(documents)
}

fn file_names(documents: &[DocumentRef]) -> BTreeSet<String> {
    documents
        .iter()
        .map(|document| document.file_name().to_string())
        .collect()
}
