//! Shared types used by the hosted retrieval client and its callers.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors returned while interacting with the hosted retrieval service.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service responded with an unexpected status code.
    #[error("Unexpected API response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// A successful response did not have the expected shape.
    #[error("Malformed API response: {0}")]
    InvalidResponse(String),
    /// A document stream could not be read before upload.
    #[error("Failed to read {file_name}: {source}")]
    Read {
        /// Name of the document being uploaded.
        file_name: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// An open document handed to the service for upload.
///
/// The file handle is released when the value is dropped, on every exit path of the upload.
#[derive(Debug)]
pub struct UploadFile {
    /// Filename reported to the service.
    pub file_name: String,
    /// Open handle on the document contents.
    pub file: tokio::fs::File,
}

/// Grounded question sent to the hosted completion operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundedQuery {
    /// Model identifier.
    pub model: String,
    /// System instruction constraining the answer.
    pub instructions: String,
    /// The user's question.
    pub question: String,
    /// The only vector store the model may retrieve from.
    pub vector_store_id: String,
}

/// Batch status meaning the service is still processing files.
pub const BATCH_IN_PROGRESS: &str = "in_progress";

#[derive(Deserialize)]
pub(crate) struct VectorStoreObject {
    pub(crate) id: String,
}

#[derive(Deserialize)]
pub(crate) struct FileObject {
    pub(crate) id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileBatchObject {
    pub(crate) id: String,
    pub(crate) status: String,
    #[serde(default)]
    pub(crate) file_counts: Option<FileCounts>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FileCounts {
    #[serde(default)]
    pub(crate) completed: u64,
    #[serde(default)]
    pub(crate) failed: u64,
    #[serde(default)]
    pub(crate) in_progress: u64,
}

#[derive(Deserialize)]
pub(crate) struct ResponseObject {
    #[serde(default)]
    pub(crate) output: Vec<OutputItem>,
    #[serde(default)]
    pub(crate) error: Option<ResponseErrorBody>,
}

#[derive(Deserialize)]
pub(crate) struct OutputItem {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) content: Vec<ContentPart>,
}

#[derive(Deserialize)]
pub(crate) struct ContentPart {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) text: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ResponseErrorBody {
    #[serde(default)]
    pub(crate) code: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
}

impl ResponseObject {
    /// Concatenate the `output_text` parts of every assistant message.
    pub(crate) fn output_text(&self) -> String {
        self.output
            .iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content.iter())
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}
