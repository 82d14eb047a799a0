//! Upload pipeline and uploaded-file handlers.

use crate::api::failure;
use crate::relay::{IngestError, RelayApi, UploadedFile};
use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
};
use serde_json::{Value, json};
use std::sync::Arc;

/// Fields the upload endpoints pull out of a multipart payload.
struct UploadPayload {
    file_name: String,
    bytes: Vec<u8>,
    store_name: Option<String>,
    chunking_config: Option<String>,
}

/// Multipart upload relayed to the File API; responds with `status: "uploaded"`.
pub(crate) async fn upload_to_store<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Json<Value>
where
    S: RelayApi,
{
    handle_upload(service, multipart, "uploaded").await
}

/// Same pipeline as [`upload_to_store`], labelled `status: "imported"` for
/// the front end's bulk flow.
pub(crate) async fn import_files<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Json<Value>
where
    S: RelayApi,
{
    handle_upload(service, multipart, "imported").await
}

/// List uploaded files known to the remote service.
pub(crate) async fn list_files<S>(State(service): State<Arc<S>>) -> Json<Vec<UploadedFile>>
where
    S: RelayApi,
{
    Json(service.list_files().await)
}

/// Delete an uploaded file by bare or qualified identifier.
pub(crate) async fn delete_file<S>(
    State(service): State<Arc<S>>,
    Path(file_uri): Path<String>,
) -> Json<Value>
where
    S: RelayApi,
{
    if service.delete_file(&file_uri).await {
        Json(json!({ "success": true }))
    } else {
        failure("Could not delete file")
    }
}

async fn handle_upload<S>(
    service: Arc<S>,
    multipart: Multipart,
    status_label: &'static str,
) -> Json<Value>
where
    S: RelayApi,
{
    let payload = match read_upload(multipart).await {
        Ok(payload) => payload,
        Err(error) => return failure(error.to_string()),
    };
    if let Some(store_name) = &payload.store_name {
        tracing::debug!(
            store = %store_name,
            file = %payload.file_name,
            "Upload tagged with a target store"
        );
    }

    match service
        .ingest_file(
            &payload.file_name,
            payload.bytes,
            payload.chunking_config.as_deref(),
        )
        .await
    {
        Ok(file) => Json(json!({
            "success": true,
            "file_name": payload.file_name,
            "file_uri": file.name,
            "status": status_label,
        })),
        Err(error) => {
            tracing::error!(error = %error, file = %payload.file_name, "Upload failed");
            failure(error.to_string())
        }
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadPayload, IngestError> {
    let mut file_part: Option<(String, Vec<u8>)> = None;
    let mut store_name = None;
    let mut chunking_config = None;

    while let Some(field) = multipart.next_field().await.map_err(|error| {
        if exceeds_body_limit(&error) {
            IngestError::TooLarge
        } else {
            IngestError::MissingFile
        }
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|error| {
                    if exceeds_body_limit(&error) {
                        IngestError::TooLarge
                    } else {
                        IngestError::Staging(std::io::Error::other(error))
                    }
                })?;
                file_part = Some((file_name, bytes.to_vec()));
            }
            Some("store_name") => {
                store_name = field
                    .text()
                    .await
                    .ok()
                    .filter(|text| !text.trim().is_empty());
            }
            Some("chunking_config") => {
                chunking_config = field
                    .text()
                    .await
                    .ok()
                    .filter(|text| !text.trim().is_empty());
            }
            _ => {}
        }
    }

    let (file_name, bytes) = file_part.ok_or(IngestError::MissingFile)?;
    if file_name.is_empty() {
        return Err(IngestError::UnnamedFile);
    }
    Ok(UploadPayload {
        file_name,
        bytes,
        store_name,
        chunking_config,
    })
}

/// Axum reports body-limit trips through the multipart error's status code.
fn exceeds_body_limit(error: &MultipartError) -> bool {
    error.status() == StatusCode::PAYLOAD_TOO_LARGE
}
