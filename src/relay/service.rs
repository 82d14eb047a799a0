//! Relay service coordinating staging, remote calls, and normalization.

use crate::{
    config::get_config,
    gemini::GeminiClient,
    metrics::{MetricsSnapshot, RelayMetrics},
    relay::{
        answer::normalize_answer,
        ingest::{PollSettings, await_file_active, is_allowed_file, mime_type_for, stage_upload},
        types::{
            ImportOutcome, ImportStatus, IngestError, QueryError, QueryOutcome, StoreSummary,
            UploadedFile, qualify_file_name, qualify_store_name,
        },
    },
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Coordinates the relay pipeline: upload staging, remote store and file
/// operations, grounded generation, and normalization of what comes back.
///
/// The service owns the remote client and metrics registry so every surface
/// shares the same credential slot and counters. Construct it once near
/// process start and share it through an `Arc`.
pub struct RelayService {
    client: GeminiClient,
    metrics: Arc<RelayMetrics>,
    poll: PollSettings,
}

/// Abstraction over the relay pipeline used by the HTTP surface.
///
/// Remote failures never escape as errors from the listing and deletion
/// calls; they collapse to empty or `false` results so the front end keeps
/// rendering.
#[async_trait]
pub trait RelayApi: Send + Sync {
    /// Probe a candidate credential and install it only when the remote
    /// service accepts it.
    async fn configure_credential(&self, candidate: &str) -> bool;

    /// Create a file-search store, returning its normalized summary.
    async fn create_store(&self, display_name: &str) -> Option<StoreSummary>;

    /// List every store visible to the credential.
    async fn list_stores(&self) -> Vec<StoreSummary>;

    /// Fetch a single store by bare or qualified identifier.
    async fn get_store(&self, store_id: &str) -> Option<StoreSummary>;

    /// Delete a store by bare or qualified identifier.
    async fn delete_store(&self, store_id: &str) -> bool;

    /// Validate, stage, upload, and wait out remote processing for a file.
    async fn ingest_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        chunking_config: Option<&str>,
    ) -> Result<UploadedFile, IngestError>;

    /// List every uploaded file visible to the credential.
    async fn list_files(&self) -> Vec<UploadedFile>;

    /// Delete an uploaded file by bare or qualified identifier.
    async fn delete_file(&self, file_id: &str) -> bool;

    /// Start a store import for an already-uploaded file.
    async fn import_file(
        &self,
        store_id: &str,
        file_uri: &str,
        chunking_config: Option<Value>,
    ) -> ImportOutcome;

    /// Answer a query grounded in the selected stores.
    async fn query(&self, text: &str, store_ids: &[String]) -> Result<QueryOutcome, QueryError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl RelayService {
    /// Build the relay service from the global configuration.
    pub fn new() -> Self {
        let config = get_config();
        let client = GeminiClient::new().expect("Failed to initialize Gemini client");
        Self {
            client,
            metrics: Arc::new(RelayMetrics::default()),
            poll: PollSettings::from_config(config),
        }
    }

    /// Probe a candidate credential; it is installed only on success, so a
    /// bad candidate never clobbers a working key.
    pub async fn configure_credential(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return false;
        }
        match self.client.probe_credential(candidate).await {
            Ok(()) => {
                self.client.install_credential(candidate.to_string());
                tracing::info!("API key configured");
                true
            }
            Err(error) => {
                tracing::warn!(error = %error, "API key validation failed");
                false
            }
        }
    }

    /// Create a store, collapsing remote failures to `None`.
    pub async fn create_store(&self, display_name: &str) -> Option<StoreSummary> {
        match self.client.create_store(display_name).await {
            Ok(store) => {
                tracing::info!(store = %store.name, display_name, "Store created");
                Some(store.into())
            }
            Err(error) => {
                tracing::error!(error = %error, display_name, "Failed to create store");
                None
            }
        }
    }

    /// List stores, collapsing remote failures to an empty list.
    pub async fn list_stores(&self) -> Vec<StoreSummary> {
        match self.client.list_stores().await {
            Ok(stores) => stores.into_iter().map(StoreSummary::from).collect(),
            Err(error) => {
                tracing::error!(error = %error, "Failed to list stores");
                Vec::new()
            }
        }
    }

    /// Fetch one store, collapsing remote failures to `None`.
    pub async fn get_store(&self, store_id: &str) -> Option<StoreSummary> {
        let store_name = qualify_store_name(store_id);
        match self.client.get_store(&store_name).await {
            Ok(store) => Some(store.into()),
            Err(error) => {
                tracing::error!(error = %error, store = %store_name, "Failed to fetch store");
                None
            }
        }
    }

    /// Delete a store, reporting plain success.
    pub async fn delete_store(&self, store_id: &str) -> bool {
        let store_name = qualify_store_name(store_id);
        match self.client.delete_store(&store_name).await {
            Ok(()) => {
                tracing::info!(store = %store_name, "Store deleted");
                true
            }
            Err(error) => {
                tracing::error!(error = %error, store = %store_name, "Failed to delete store");
                false
            }
        }
    }

    /// Run the full upload pipeline: allow-list check, chunking-config
    /// validation, scratch staging, remote upload, and the processing wait.
    pub async fn ingest_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        chunking_config: Option<&str>,
    ) -> Result<UploadedFile, IngestError> {
        if !is_allowed_file(file_name) {
            return Err(IngestError::UnsupportedFileType {
                file_name: file_name.to_string(),
            });
        }
        if let Some(raw) = chunking_config {
            // Uploads carry no chunking themselves; the field is validated
            // here and takes effect when the file is imported into a store.
            let parsed: Value =
                serde_json::from_str(raw).map_err(IngestError::InvalidChunkingConfig)?;
            tracing::debug!(config = %parsed, "Chunking configuration received with upload");
        }

        let staged = stage_upload(file_name, &bytes).await?;
        let staged_bytes = tokio::fs::read(&staged).await?;
        let mime_type = mime_type_for(file_name);
        let uploaded = self
            .client
            .upload_file(staged_bytes, file_name, mime_type)
            .await?;
        tracing::info!(
            file = %uploaded.name,
            state = %uploaded.state,
            size = bytes.len(),
            "File uploaded; waiting for processing"
        );

        let settled = await_file_active(&self.client, uploaded, self.poll).await?;
        self.metrics.record_upload();
        tracing::info!(file = %settled.name, "File processing settled");
        Ok(settled.into())
    }

    /// List uploaded files, collapsing remote failures to an empty list.
    pub async fn list_files(&self) -> Vec<UploadedFile> {
        match self.client.list_files().await {
            Ok(files) => files.into_iter().map(UploadedFile::from).collect(),
            Err(error) => {
                tracing::error!(error = %error, "Failed to list files");
                Vec::new()
            }
        }
    }

    /// Delete an uploaded file, reporting plain success.
    pub async fn delete_file(&self, file_id: &str) -> bool {
        let file_name = qualify_file_name(file_id);
        match self.client.delete_file(&file_name).await {
            Ok(()) => {
                tracing::info!(file = %file_name, "File deleted");
                true
            }
            Err(error) => {
                tracing::error!(error = %error, file = %file_name, "Failed to delete file");
                false
            }
        }
    }

    /// Hand an import off to the remote service. The remote side finishes
    /// asynchronously; the outcome carries the operation handle.
    pub async fn import_file(
        &self,
        store_id: &str,
        file_uri: &str,
        chunking_config: Option<Value>,
    ) -> ImportOutcome {
        let store_name = qualify_store_name(store_id);
        let file_name = qualify_file_name(file_uri);
        match self
            .client
            .import_file(&store_name, &file_name, chunking_config)
            .await
        {
            Ok(operation) => {
                self.metrics.record_import();
                tracing::info!(
                    operation = %operation.name,
                    store = %store_name,
                    file = %file_name,
                    done = operation.done,
                    "Import started"
                );
                ImportOutcome {
                    operation_name: operation.name,
                    status: ImportStatus::ImportStarted,
                    error: None,
                }
            }
            Err(error) => {
                tracing::error!(
                    error = %error,
                    store = %store_name,
                    file = %file_name,
                    "Failed to import file"
                );
                ImportOutcome {
                    operation_name: String::new(),
                    status: ImportStatus::Failed,
                    error: Some(error.to_string()),
                }
            }
        }
    }

    /// Answer a query grounded in the selected stores.
    pub async fn query(
        &self,
        text: &str,
        store_ids: &[String],
    ) -> Result<QueryOutcome, QueryError> {
        if text.trim().is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        let store_names: Vec<String> = store_ids
            .iter()
            .map(|store_id| qualify_store_name(store_id))
            .collect();

        let response = self.client.generate_grounded(text, &store_names).await?;
        self.metrics.record_query();
        let outcome = normalize_answer(text, response);
        tracing::info!(
            stores = store_names.len(),
            citations = outcome.citations.len(),
            "Query answered"
        );
        Ok(outcome)
    }

    /// Return the current relay metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl RelayApi for RelayService {
    async fn configure_credential(&self, candidate: &str) -> bool {
        RelayService::configure_credential(self, candidate).await
    }

    async fn create_store(&self, display_name: &str) -> Option<StoreSummary> {
        RelayService::create_store(self, display_name).await
    }

    async fn list_stores(&self) -> Vec<StoreSummary> {
        RelayService::list_stores(self).await
    }

    async fn get_store(&self, store_id: &str) -> Option<StoreSummary> {
        RelayService::get_store(self, store_id).await
    }

    async fn delete_store(&self, store_id: &str) -> bool {
        RelayService::delete_store(self, store_id).await
    }

    async fn ingest_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        chunking_config: Option<&str>,
    ) -> Result<UploadedFile, IngestError> {
        RelayService::ingest_file(self, file_name, bytes, chunking_config).await
    }

    async fn list_files(&self) -> Vec<UploadedFile> {
        RelayService::list_files(self).await
    }

    async fn delete_file(&self, file_id: &str) -> bool {
        RelayService::delete_file(self, file_id).await
    }

    async fn import_file(
        &self,
        store_id: &str,
        file_uri: &str,
        chunking_config: Option<Value>,
    ) -> ImportOutcome {
        RelayService::import_file(self, store_id, file_uri, chunking_config).await
    }

    async fn query(&self, text: &str, store_ids: &[String]) -> Result<QueryOutcome, QueryError> {
        RelayService::query(self, text, store_ids).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        RelayService::metrics_snapshot(self)
    }
}
