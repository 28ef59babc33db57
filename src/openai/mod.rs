//! Hosted retrieval service integration.
//!
//! [`RetrievalBackend`] is the seam between the orchestration core and the remote service. The
//! production implementation is [`OpenAiClient`]; tests substitute their own.

pub mod client;
pub mod types;

use async_trait::async_trait;

pub use client::OpenAiClient;
pub use types::{BackendError, GroundedQuery, UploadFile};

/// Operations the core issues against the hosted retrieval service.
#[async_trait]
pub trait RetrievalBackend: Send + Sync {
    /// Create a named vector store and return its identifier.
    async fn create_vector_store(&self, name: &str) -> Result<String, BackendError>;

    /// Upload `files` into the vector store as one batch and wait until the service finishes
    /// processing it, returning the terminal batch status.
    async fn upload_and_poll(
        &self,
        vector_store_id: &str,
        files: Vec<UploadFile>,
    ) -> Result<String, BackendError>;

    /// Answer `query` using retrieval restricted to its vector store, returning the raw text.
    async fn respond(&self, query: &GroundedQuery) -> Result<String, BackendError>;
}
