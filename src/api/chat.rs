//! Grounded chat handler.

use crate::relay::RelayApi;
use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// Request body for `POST /api/chat`.
#[derive(Deserialize)]
pub(crate) struct ChatRequest {
    /// Natural-language question to answer.
    #[serde(default)]
    query: String,
    /// Stores to ground in, bare or qualified. Empty means no grounding.
    #[serde(default)]
    store_names: Vec<String>,
}

/// Answer a query grounded in the selected stores.
///
/// Failures keep the `200` status and surface as an `error` body so the
/// chat panel can render them inline.
pub(crate) async fn chat<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<ChatRequest>,
) -> Json<Value>
where
    S: RelayApi,
{
    match service.query(&request.query, &request.store_names).await {
        Ok(outcome) => Json(json!(outcome)),
        Err(error) => Json(json!({ "error": error.to_string() })),
    }
}
