//! Store management handlers.

use crate::api::failure;
use crate::relay::{ImportStatus, RelayApi, StoreSummary};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// Request body for `POST /api/stores`.
#[derive(Deserialize)]
pub(crate) struct CreateStoreRequest {
    /// Display name for the new store.
    #[serde(default = "default_display_name")]
    display_name: String,
}

fn default_display_name() -> String {
    "Default Store".to_string()
}

/// Request body for `POST /api/stores/{store_name}/import-file`.
#[derive(Deserialize)]
pub(crate) struct ImportFileRequest {
    /// Identifier of an uploaded file, bare or `files/`-qualified.
    #[serde(default)]
    file_uri: String,
    /// Optional chunking configuration forwarded verbatim to the backend.
    #[serde(default)]
    chunking_config: Option<Value>,
}

/// List every file-search store.
pub(crate) async fn list_stores<S>(State(service): State<Arc<S>>) -> Json<Vec<StoreSummary>>
where
    S: RelayApi,
{
    Json(service.list_stores().await)
}

/// Create a store with the requested display name.
pub(crate) async fn create_store<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<CreateStoreRequest>,
) -> Json<Value>
where
    S: RelayApi,
{
    match service.create_store(&request.display_name).await {
        Some(store) => Json(json!({
            "success": true,
            "name": store.name,
            "display_name": store.display_name,
            "active_documents_count": store.active_documents_count,
            "pending_documents_count": store.pending_documents_count,
            "failed_documents_count": store.failed_documents_count,
            "size_bytes": store.size_bytes,
        })),
        None => failure("Could not create store"),
    }
}

/// Fetch one store by bare or qualified identifier.
pub(crate) async fn get_store<S>(
    State(service): State<Arc<S>>,
    Path(store_name): Path<String>,
) -> Json<Value>
where
    S: RelayApi,
{
    match service.get_store(&store_name).await {
        Some(store) => Json(json!(store)),
        None => Json(json!({ "error": "Store not found" })),
    }
}

/// Delete a store by bare or qualified identifier.
pub(crate) async fn delete_store<S>(
    State(service): State<Arc<S>>,
    Path(store_name): Path<String>,
) -> Json<Value>
where
    S: RelayApi,
{
    if service.delete_store(&store_name).await {
        Json(json!({ "success": true }))
    } else {
        failure("Could not delete store")
    }
}

/// Import an already uploaded file into a store.
pub(crate) async fn import_file<S>(
    State(service): State<Arc<S>>,
    Path(store_name): Path<String>,
    Json(request): Json<ImportFileRequest>,
) -> Json<Value>
where
    S: RelayApi,
{
    if request.file_uri.trim().is_empty() {
        return failure("File URI is required");
    }
    let outcome = service
        .import_file(&store_name, &request.file_uri, request.chunking_config)
        .await;
    match outcome.status {
        ImportStatus::ImportStarted => Json(json!({
            "success": true,
            "operation_name": outcome.operation_name,
            "status": outcome.status,
        })),
        ImportStatus::Failed => failure(
            outcome
                .error
                .unwrap_or_else(|| "Could not import file".to_string()),
        ),
    }
}
