//! Shared types used by the Gemini client, decoded defensively.
//!
//! The remote API is inconsistent about field casing and numeric types
//! across endpoint versions, so everything here tolerates camelCase and
//! snake_case spellings, counts as strings or numbers, and states as plain
//! strings or nested objects.

use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors returned while interacting with the Gemini API.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Gemini base URL: {0}")]
    InvalidUrl(String),
    /// No credential is installed, so the request was never sent.
    #[error("API key not configured")]
    MissingCredential,
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The API responded with an unexpected status code.
    #[error("Unexpected Gemini response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the API.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Processing lifecycle of an uploaded file on the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    /// Queued but not yet picked up.
    Pending,
    /// The remote service is still extracting content.
    Processing,
    /// Ready for import and grounding.
    Active,
    /// The remote service gave up on the file.
    Failed,
    /// Anything the relay does not recognize.
    #[default]
    Unknown,
}

impl FileState {
    /// Canonical wire spelling of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Active => "ACTIVE",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        }
    }

    fn from_wire(raw: &str) -> Self {
        match raw {
            "PENDING" => Self::Pending,
            "PROCESSING" => Self::Processing,
            "ACTIVE" => Self::Active,
            "FAILED" => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FileState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawState {
            Name(String),
            Tagged { name: String },
            Other(Value),
        }

        Ok(match RawState::deserialize(deserializer)? {
            RawState::Name(name) | RawState::Tagged { name } => FileState::from_wire(&name),
            RawState::Other(_) => FileState::Unknown,
        })
    }
}

/// Accepts a count encoded as a JSON number, a numeric string, or anything
/// else (which collapses to zero).
pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCount {
        Number(u64),
        Text(String),
        Other(Value),
    }

    Ok(match RawCount::deserialize(deserializer)? {
        RawCount::Number(value) => value,
        RawCount::Text(text) => text.trim().parse().unwrap_or(0),
        RawCount::Other(_) => 0,
    })
}

/// File record returned by the File API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Fully qualified resource name, e.g. `files/abc123`.
    #[serde(default)]
    pub name: String,
    /// Human-readable name supplied at upload time.
    #[serde(default, alias = "display_name")]
    pub display_name: Option<String>,
    /// MIME type the remote service recorded for the file.
    #[serde(default, alias = "mime_type")]
    pub mime_type: Option<String>,
    /// Size in bytes as reported by the remote service.
    #[serde(default, alias = "size_bytes", deserialize_with = "lenient_u64")]
    pub size_bytes: u64,
    /// Current processing state.
    #[serde(default)]
    pub state: FileState,
    /// Creation timestamp in RFC3339.
    #[serde(default, alias = "create_time")]
    pub create_time: Option<String>,
    /// Last update timestamp in RFC3339.
    #[serde(default, alias = "update_time")]
    pub update_time: Option<String>,
    /// Expiration timestamp in RFC3339.
    #[serde(default, alias = "expiration_time")]
    pub expiration_time: Option<String>,
    /// Download URI, when the remote service exposes one.
    #[serde(default)]
    pub uri: Option<String>,
}

/// File-search store record returned by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStore {
    /// Fully qualified resource name, e.g. `fileSearchStores/xyz`.
    #[serde(default)]
    pub name: String,
    /// Human-readable store name.
    #[serde(default, alias = "display_name")]
    pub display_name: Option<String>,
    /// Documents fully indexed and searchable.
    #[serde(
        default,
        alias = "active_documents_count",
        deserialize_with = "lenient_u64"
    )]
    pub active_documents_count: u64,
    /// Documents still being indexed.
    #[serde(
        default,
        alias = "pending_documents_count",
        deserialize_with = "lenient_u64"
    )]
    pub pending_documents_count: u64,
    /// Documents the remote service failed to index.
    #[serde(
        default,
        alias = "failed_documents_count",
        deserialize_with = "lenient_u64"
    )]
    pub failed_documents_count: u64,
    /// Total size of the indexed documents in bytes.
    #[serde(default, alias = "size_bytes", deserialize_with = "lenient_u64")]
    pub size_bytes: u64,
    /// Creation timestamp in RFC3339.
    #[serde(default, alias = "create_time")]
    pub create_time: Option<String>,
    /// Last update timestamp in RFC3339.
    #[serde(default, alias = "update_time")]
    pub update_time: Option<String>,
}

/// Long-running operation handle returned by store imports.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteOperation {
    /// Operation resource name, usable for later status checks.
    #[serde(default)]
    pub name: String,
    /// Whether the operation already finished.
    #[serde(default)]
    pub done: bool,
}

/// Response payload of a `generateContent` call.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Generated candidates, usually exactly one.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Token accounting for the call, when the API reports it.
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

/// A single generated candidate.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content parts.
    #[serde(default)]
    pub content: Option<CandidateContent>,
    /// Grounding attribution attached by the file-search tool.
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

/// Content block inside a candidate.
#[derive(Debug, Default, Deserialize)]
pub struct CandidateContent {
    /// Ordered content parts.
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

/// One part of the generated content.
#[derive(Debug, Default, Deserialize)]
pub struct ContentPart {
    /// Text payload, absent for non-text parts.
    #[serde(default)]
    pub text: Option<String>,
}

/// Grounding attribution for a candidate.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    /// Source chunks the answer was grounded in.
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

/// One grounding source, in either of the two shapes the API emits.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingChunk {
    /// Document-retrieval shape with text and title.
    #[serde(default)]
    pub retrieved_context: Option<RetrievedContext>,
    /// Flat-shape content, an arbitrary JSON value.
    #[serde(default)]
    pub content: Option<Value>,
    /// Flat-shape source label.
    #[serde(default)]
    pub source: Option<String>,
}

/// Retrieved document excerpt backing a grounding chunk.
#[derive(Debug, Default, Deserialize)]
pub struct RetrievedContext {
    /// Excerpt text, including any page markers.
    #[serde(default)]
    pub text: Option<String>,
    /// Title of the source document.
    #[serde(default)]
    pub title: Option<String>,
}

/// Token accounting reported by the generation endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Total tokens billed for the call.
    #[serde(default)]
    pub total_token_count: u64,
    /// Tokens consumed by the prompt.
    #[serde(default)]
    pub prompt_token_count: u64,
    /// Tokens produced across candidates.
    #[serde(default)]
    pub candidates_token_count: u64,
}

#[derive(Deserialize)]
pub(crate) struct ListStoresEnvelope {
    #[serde(rename = "fileSearchStores", default)]
    pub(crate) file_search_stores: Vec<RemoteStore>,
}

#[derive(Deserialize)]
pub(crate) struct ListFilesEnvelope {
    #[serde(default)]
    pub(crate) files: Vec<RemoteFile>,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum UploadResponse {
    Wrapped { file: RemoteFile },
    Bare(RemoteFile),
}

impl UploadResponse {
    pub(crate) fn into_file(self) -> RemoteFile {
        match self {
            Self::Wrapped { file } | Self::Bare(file) => file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_state_decodes_plain_and_nested_shapes() {
        let plain: FileState = serde_json::from_value(json!("ACTIVE")).unwrap();
        assert_eq!(plain, FileState::Active);

        let nested: FileState = serde_json::from_value(json!({ "name": "PROCESSING" })).unwrap();
        assert_eq!(nested, FileState::Processing);

        let unrecognized: FileState = serde_json::from_value(json!("SOMETHING_NEW")).unwrap();
        assert_eq!(unrecognized, FileState::Unknown);

        let garbage: FileState = serde_json::from_value(json!(17)).unwrap();
        assert_eq!(garbage, FileState::Unknown);
    }

    #[test]
    fn remote_file_tolerates_mixed_casing_and_missing_fields() {
        let file: RemoteFile = serde_json::from_value(json!({
            "name": "files/abc",
            "display_name": "notes.md",
            "sizeBytes": "2048",
            "state": "ACTIVE"
        }))
        .unwrap();
        assert_eq!(file.display_name.as_deref(), Some("notes.md"));
        assert_eq!(file.size_bytes, 2048);
        assert_eq!(file.state, FileState::Active);
        assert!(file.uri.is_none());

        let bare: RemoteFile = serde_json::from_value(json!({})).unwrap();
        assert_eq!(bare.state, FileState::Unknown);
        assert_eq!(bare.size_bytes, 0);
    }

    #[test]
    fn store_counts_accept_strings_numbers_and_junk() {
        let store: RemoteStore = serde_json::from_value(json!({
            "name": "fileSearchStores/demo",
            "displayName": "Demo",
            "activeDocumentsCount": "12",
            "pendingDocumentsCount": 3,
            "failedDocumentsCount": null,
            "sizeBytes": "oops"
        }))
        .unwrap();
        assert_eq!(store.display_name.as_deref(), Some("Demo"));
        assert_eq!(store.active_documents_count, 12);
        assert_eq!(store.pending_documents_count, 3);
        assert_eq!(store.failed_documents_count, 0);
        assert_eq!(store.size_bytes, 0);
    }

    #[test]
    fn upload_response_unwraps_both_envelopes() {
        let wrapped: UploadResponse = serde_json::from_value(json!({
            "file": { "name": "files/a", "state": "PROCESSING" }
        }))
        .unwrap();
        assert_eq!(wrapped.into_file().name, "files/a");

        let bare: UploadResponse = serde_json::from_value(json!({
            "name": "files/b",
            "state": "ACTIVE"
        }))
        .unwrap();
        assert_eq!(bare.into_file().name, "files/b");
    }

    #[test]
    fn generation_response_decodes_grounding_tree() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Answer." }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "retrievedContext": { "text": "excerpt", "title": "notes.md" } },
                        { "content": "raw chunk", "source": "other.txt" }
                    ]
                }
            }],
            "usageMetadata": { "totalTokenCount": 42, "promptTokenCount": 30 }
        }))
        .unwrap();

        let candidate = &response.candidates[0];
        let parts = &candidate.content.as_ref().unwrap().parts;
        assert_eq!(parts[0].text.as_deref(), Some("Answer."));

        let chunks = &candidate.grounding_metadata.as_ref().unwrap().grounding_chunks;
        assert_eq!(chunks.len(), 2);
        assert_eq!(
            chunks[0].retrieved_context.as_ref().unwrap().title.as_deref(),
            Some("notes.md")
        );
        assert_eq!(chunks[1].source.as_deref(), Some("other.txt"));

        let usage = response.usage_metadata.unwrap();
        assert_eq!(usage.total_token_count, 42);
        assert_eq!(usage.candidates_token_count, 0);
    }
}
