//! Domain types and error taxonomy for the relay surface.

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::gemini::{FileState, GeminiError, RemoteFile, RemoteStore};

/// Failures along the upload and import pipeline.
///
/// Display strings double as the client-facing `error` bodies, so they stay
/// short and stable.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The multipart payload carried no file part at all.
    #[error("No file part in request")]
    MissingFile,
    /// A file part arrived without a filename.
    #[error("No file selected")]
    UnnamedFile,
    /// The multipart payload exceeded the upload size limit.
    #[error("File exceeds the upload size limit")]
    TooLarge,
    /// Extension missing or outside the allow-list.
    #[error("File type not allowed")]
    UnsupportedFileType {
        /// Name of the rejected upload.
        file_name: String,
    },
    /// The chunking configuration form field was not valid JSON.
    #[error("Invalid chunking configuration")]
    InvalidChunkingConfig(#[source] serde_json::Error),
    /// Staging the upload to scratch space failed.
    #[error("Failed to stage upload: {0}")]
    Staging(#[from] std::io::Error),
    /// The remote service ended processing in a failure state.
    #[error("File processing failed: {state}")]
    ProcessingFailed {
        /// Remote name of the file.
        file_name: String,
        /// Terminal state reported by the remote service.
        state: FileState,
    },
    /// The file never left `PROCESSING` before the deadline.
    #[error("Timed out waiting for file processing: {file_name}")]
    ProcessingTimeout {
        /// Remote name of the file.
        file_name: String,
    },
    /// A remote call failed.
    #[error(transparent)]
    Remote(#[from] GeminiError),
}

/// Failures while answering a grounded query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The query text was empty.
    #[error("Query is required")]
    EmptyQuery,
    /// A remote call failed.
    #[error(transparent)]
    Remote(#[from] GeminiError),
}

/// Normalized view of an uploaded file, with optional remote fields
/// collapsed to empty strings.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    /// Remote identifier, e.g. `files/abc123`.
    pub name: String,
    /// Human-readable name supplied at upload time.
    pub display_name: String,
    /// MIME type recorded by the remote service.
    pub mime_type: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Current processing state.
    pub state: FileState,
    /// Creation timestamp, or empty when unreported.
    pub create_time: String,
    /// Last update timestamp, or empty when unreported.
    pub update_time: String,
    /// Expiration timestamp, or empty when unreported.
    pub expiration_time: String,
}

impl From<RemoteFile> for UploadedFile {
    fn from(file: RemoteFile) -> Self {
        Self {
            name: file.name,
            display_name: file.display_name.unwrap_or_default(),
            mime_type: file.mime_type.unwrap_or_default(),
            size_bytes: file.size_bytes,
            state: file.state,
            create_time: file.create_time.unwrap_or_default(),
            update_time: file.update_time.unwrap_or_default(),
            expiration_time: file.expiration_time.unwrap_or_default(),
        }
    }
}

/// Normalized view of a file-search store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSummary {
    /// Remote identifier, e.g. `fileSearchStores/xyz`.
    pub name: String,
    /// Human-readable store name.
    pub display_name: String,
    /// Documents fully indexed and searchable.
    pub active_documents_count: u64,
    /// Documents still being indexed.
    pub pending_documents_count: u64,
    /// Documents the remote service failed to index.
    pub failed_documents_count: u64,
    /// Total indexed size in bytes.
    pub size_bytes: u64,
    /// Creation timestamp, or empty when unreported.
    pub create_time: String,
    /// Last update timestamp, or empty when unreported.
    pub update_time: String,
}

impl From<RemoteStore> for StoreSummary {
    fn from(store: RemoteStore) -> Self {
        Self {
            name: store.name,
            display_name: store.display_name.unwrap_or_default(),
            active_documents_count: store.active_documents_count,
            pending_documents_count: store.pending_documents_count,
            failed_documents_count: store.failed_documents_count,
            size_bytes: store.size_bytes,
            create_time: store.create_time.unwrap_or_default(),
            update_time: store.update_time.unwrap_or_default(),
        }
    }
}

/// Outcome label for a store import request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    /// The remote service accepted the import and works on it asynchronously.
    ImportStarted,
    /// The import request was rejected.
    Failed,
}

/// Result of handing an import off to the remote service.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    /// Remote operation name, empty when the import failed.
    pub operation_name: String,
    /// Whether the import started.
    pub status: ImportStatus,
    /// Error text when the import failed.
    pub error: Option<String>,
}

/// One citation extracted from grounding metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    /// Excerpt text backing the answer.
    pub text: String,
    /// Source document title, `Unknown` when unreported.
    pub source: String,
    /// Page label such as `Page 3, 7`, or empty when no markers were found.
    pub page: String,
}

/// Token accounting for a grounded answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    /// Total tokens billed for the call.
    pub total_token_count: u64,
    /// Tokens consumed by the prompt.
    pub prompt_token_count: u64,
    /// Tokens produced across candidates.
    pub candidates_token_count: u64,
}

/// Normalized grounded-generation result.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    /// The query text as received.
    pub query: String,
    /// Generated answer, or the fallback sentence when the model produced
    /// no text.
    pub response: String,
    /// Citations in grounding order.
    pub citations: Vec<Citation>,
    /// Token usage; serializes as an empty object when unreported.
    #[serde(serialize_with = "usage_or_empty")]
    pub usage: Option<UsageStats>,
}

fn usage_or_empty<S>(usage: &Option<UsageStats>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match usage {
        Some(stats) => stats.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}

/// Ensure the `files/` prefix remote file endpoints expect. Idempotent.
pub fn qualify_file_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("files/") {
        trimmed.to_string()
    } else {
        format!("files/{trimmed}")
    }
}

/// Ensure the `fileSearchStores/` prefix remote store endpoints expect.
/// Idempotent.
pub fn qualify_store_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("fileSearchStores/") {
        trimmed.to_string()
    } else {
        format!("fileSearchStores/{trimmed}")
    }
}
