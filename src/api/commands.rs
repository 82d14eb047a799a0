//! Discovery catalog and metrics handlers.

use crate::metrics::MetricsSnapshot;
use crate::relay::RelayApi;
use axum::{Json, extract::State};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
pub(crate) struct CommandDescriptor {
    /// Stable command identifier.
    pub(crate) name: &'static str,
    /// HTTP method the command uses.
    pub(crate) method: &'static str,
    /// Route path, with `{placeholders}` for path parameters.
    pub(crate) path: &'static str,
    /// Human-readable summary.
    pub(crate) description: &'static str,
    /// Example request body, when the command takes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) request_example: Option<serde_json::Value>,
}

/// Response body for `GET /api/commands`.
#[derive(Serialize)]
pub(crate) struct CommandsResponse {
    pub(crate) commands: Vec<CommandDescriptor>,
}

/// Enumerate the supported HTTP commands for discovery by hosts and tools.
pub(crate) async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "configure_api_key",
                method: "POST",
                path: "/api/configure-api-key",
                description: "Probe a Gemini API key and install it for subsequent requests.",
                request_example: Some(json!({ "api_key": "AIza..." })),
            },
            CommandDescriptor {
                name: "list_stores",
                method: "GET",
                path: "/api/stores",
                description: "Return every file-search store with document counters.",
                request_example: None,
            },
            CommandDescriptor {
                name: "create_store",
                method: "POST",
                path: "/api/stores",
                description: "Create a file-search store with the given display name.",
                request_example: Some(json!({ "display_name": "Quarterly Briefs" })),
            },
            CommandDescriptor {
                name: "get_store",
                method: "GET",
                path: "/api/stores/{store_name}",
                description: "Fetch one store by bare or qualified identifier.",
                request_example: None,
            },
            CommandDescriptor {
                name: "delete_store",
                method: "DELETE",
                path: "/api/stores/{store_name}",
                description: "Delete a store by bare or qualified identifier.",
                request_example: None,
            },
            CommandDescriptor {
                name: "import_file",
                method: "POST",
                path: "/api/stores/{store_name}/import-file",
                description: "Import an already uploaded file into a store.",
                request_example: Some(json!({
                    "file_uri": "files/abc123",
                    "chunking_config": {
                        "whiteSpaceConfig": {
                            "maxTokensPerChunk": 200,
                            "maxOverlapTokens": 20
                        }
                    }
                })),
            },
            CommandDescriptor {
                name: "upload_to_store",
                method: "POST",
                path: "/api/upload-to-store",
                description: "Multipart upload; the file is staged, relayed, and polled until processing settles.",
                request_example: None,
            },
            CommandDescriptor {
                name: "import_files",
                method: "POST",
                path: "/api/import-files",
                description: "Bulk-flow twin of upload_to_store; responds with an imported status label.",
                request_example: None,
            },
            CommandDescriptor {
                name: "list_files",
                method: "GET",
                path: "/api/files",
                description: "Return every uploaded file with its processing state.",
                request_example: None,
            },
            CommandDescriptor {
                name: "delete_file",
                method: "DELETE",
                path: "/api/files/{file_uri}",
                description: "Delete an uploaded file by bare or qualified identifier.",
                request_example: None,
            },
            CommandDescriptor {
                name: "chat",
                method: "POST",
                path: "/api/chat",
                description: "Answer a query grounded in the selected stores, with citations and usage.",
                request_example: Some(json!({
                    "query": "What changed last quarter?",
                    "store_names": ["briefs"]
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/api/metrics",
                description: "Return relay counters for uploads, imports, and answered queries.",
                request_example: None,
            },
        ],
    })
}

/// Return the relay counters.
pub(crate) async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: RelayApi,
{
    Json(service.metrics_snapshot())
}
