//! HTTP client wrapper for the hosted vector store and responses APIs.

use crate::config::Config;
use crate::openai::RetrievalBackend;
use crate::openai::types::{
    BATCH_IN_PROGRESS, BackendError, FileBatchObject, FileObject, GroundedQuery, ResponseObject,
    UploadFile, VectorStoreObject,
};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt, stream};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tokio::io::AsyncReadExt;

const MAX_CONCURRENT_UPLOADS: usize = 5;
const UPLOAD_PURPOSE: &str = "assistants";

/// Lightweight HTTP client for the hosted retrieval service.
pub struct OpenAiClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) poll_interval: Duration,
}

impl OpenAiClient {
    /// Construct a new client from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, BackendError> {
        let client = Client::builder().user_agent("pdf-rag/0.1").build()?;
        let base_url =
            normalize_base_url(&config.openai_base_url).map_err(BackendError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            poll_interval_ms = config.poll_interval.as_millis() as u64,
            "Initialized API client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.openai_api_key.clone(),
            poll_interval: config.poll_interval,
        })
    }

    async fn upload_file(&self, upload: UploadFile) -> Result<String, BackendError> {
        let UploadFile {
            file_name,
            mut file,
        } = upload;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .await
            .map_err(|source| BackendError::Read {
                file_name: file_name.clone(),
                source,
            })?;
        drop(file);

        let size = contents.len();
        let part = Part::bytes(contents)
            .file_name(file_name.clone())
            .mime_str("application/pdf")?;
        let form = Form::new().text("purpose", UPLOAD_PURPOSE).part("file", part);

        let response = self
            .request(Method::POST, "files")
            .multipart(form)
            .send()
            .await?;
        let uploaded: FileObject = self.parse(response, "upload file").await?;
        tracing::debug!(file = %file_name, file_id = %uploaded.id, bytes = size, "File uploaded");
        Ok(uploaded.id)
    }

    async fn create_file_batch(
        &self,
        vector_store_id: &str,
        file_ids: &[String],
    ) -> Result<FileBatchObject, BackendError> {
        let response = self
            .request(
                Method::POST,
                &format!("vector_stores/{vector_store_id}/file_batches"),
            )
            .json(&json!({ "file_ids": file_ids }))
            .send()
            .await?;
        self.parse(response, "create file batch").await
    }

    async fn retrieve_file_batch(
        &self,
        vector_store_id: &str,
        batch_id: &str,
    ) -> Result<FileBatchObject, BackendError> {
        let response = self
            .request(
                Method::GET,
                &format!("vector_stores/{vector_store_id}/file_batches/{batch_id}"),
            )
            .send()
            .await?;
        self.parse(response, "retrieve file batch").await
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        self.client.request(method, url).bearer_auth(&self.api_key)
    }

    async fn parse<T>(&self, response: reqwest::Response, operation: &str) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = BackendError::UnexpectedStatus { status, body };
            tracing::error!(operation, error = %error, "API request failed");
            return Err(error);
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| {
            tracing::error!(operation, error = %err, "Failed to decode API response");
            BackendError::InvalidResponse(format!("{operation}: {err}"))
        })
    }
}

#[async_trait]
impl RetrievalBackend for OpenAiClient {
    async fn create_vector_store(&self, name: &str) -> Result<String, BackendError> {
        let response = self
            .request(Method::POST, "vector_stores")
            .json(&json!({ "name": name }))
            .send()
            .await?;
        let store: VectorStoreObject = self.parse(response, "create vector store").await?;
        tracing::info!(name, vector_store_id = %store.id, "Vector store created");
        Ok(store.id)
    }

    async fn upload_and_poll(
        &self,
        vector_store_id: &str,
        files: Vec<UploadFile>,
    ) -> Result<String, BackendError> {
        let file_count = files.len();
        let file_ids: Vec<String> = stream::iter(files)
            .map(|upload| self.upload_file(upload))
            .buffer_unordered(MAX_CONCURRENT_UPLOADS)
            .try_collect()
            .await?;

        let mut batch = self.create_file_batch(vector_store_id, &file_ids).await?;
        tracing::debug!(
            vector_store_id,
            batch_id = %batch.id,
            files = file_count,
            status = %batch.status,
            "File batch created"
        );

        while batch.status == BATCH_IN_PROGRESS {
            tokio::time::sleep(self.poll_interval).await;
            batch = self.retrieve_file_batch(vector_store_id, &batch.id).await?;
            let counts = batch.file_counts.take().unwrap_or_default();
            tracing::debug!(
                batch_id = %batch.id,
                status = %batch.status,
                completed = counts.completed,
                failed = counts.failed,
                in_progress = counts.in_progress,
                "Polled file batch"
            );
        }

        tracing::info!(vector_store_id, batch_id = %batch.id, status = %batch.status, "File batch finished");
        Ok(batch.status)
    }

    async fn respond(&self, query: &GroundedQuery) -> Result<String, BackendError> {
        let body = json!({
            "model": query.model,
            "input": [
                { "role": "system", "content": query.instructions },
                { "role": "user", "content": query.question },
            ],
            "tools": [
                {
                    "type": "file_search",
                    "vector_store_ids": [query.vector_store_id],
                }
            ],
        });

        let response = self
            .request(Method::POST, "responses")
            .json(&body)
            .send()
            .await?;
        let parsed: ResponseObject = self.parse(response, "create response").await?;

        if let Some(error) = &parsed.error {
            let message = format!(
                "{}: {}",
                error.code.as_deref().unwrap_or("error"),
                error.message.as_deref().unwrap_or("response failed")
            );
            tracing::error!(model = %query.model, %message, "Response reported an error");
            return Err(BackendError::InvalidResponse(message));
        }

        Ok(parsed.output_text())
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
