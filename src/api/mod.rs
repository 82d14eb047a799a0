//! HTTP surface for the relay.
//!
//! A compact Axum router mirroring what the front end expects:
//!
//! - `POST /api/configure-api-key` – Probe and install a credential at runtime.
//! - `GET/POST /api/stores` – List or create file-search stores.
//! - `GET/DELETE /api/stores/{store}` – Inspect or delete one store.
//! - `POST /api/stores/{store}/import-file` – Import an uploaded file into a store.
//! - `POST /api/upload-to-store` – Multipart upload relayed to the File API.
//! - `POST /api/import-files` – Same pipeline with an `imported` status label.
//! - `GET /api/files` – List uploaded files.
//! - `DELETE /api/files/{file}` – Delete an uploaded file.
//! - `POST /api/chat` – Grounded generation over selected stores.
//! - `GET /api/commands` – Machine-readable catalog of the routes above.
//! - `GET /api/metrics` – Relay counters.
//!
//! Handlers reply `200 OK` with a body-level `success`/`error` contract;
//! remote failures surface as empty lists or `success: false` so the front
//! end keeps rendering. Path identifiers may be bare (`my-store`) or fully
//! qualified (`fileSearchStores/my-store`, percent-encoded).

mod chat;
mod commands;
mod files;
mod keys;
mod stores;

use crate::relay::RelayApi;
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;

/// Uploads larger than this fail while the multipart stream is read.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Build the HTTP router exposing the relay API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: RelayApi + 'static,
{
    Router::new()
        .route(
            "/api/configure-api-key",
            post(keys::configure_api_key::<S>),
        )
        .route(
            "/api/stores",
            get(stores::list_stores::<S>).post(stores::create_store::<S>),
        )
        .route(
            "/api/stores/:store_name",
            get(stores::get_store::<S>).delete(stores::delete_store::<S>),
        )
        .route(
            "/api/stores/:store_name/import-file",
            post(stores::import_file::<S>),
        )
        .route(
            "/api/upload-to-store",
            post(files::upload_to_store::<S>).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/import-files",
            post(files::import_files::<S>).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/files", get(files::list_files::<S>))
        .route("/api/files/:file_uri", delete(files::delete_file::<S>))
        .route("/api/chat", post(chat::chat::<S>))
        .route("/api/commands", get(commands::get_commands))
        .route("/api/metrics", get(commands::get_metrics::<S>))
        .with_state(service)
}

/// Standard failure body shared by the mutating endpoints.
pub(crate) fn failure(message: impl Into<String>) -> Json<Value> {
    Json(json!({ "success": false, "error": message.into() }))
}
