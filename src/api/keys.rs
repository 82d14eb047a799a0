//! Runtime credential configuration.

use crate::relay::RelayApi;
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request body for `POST /api/configure-api-key`.
#[derive(Deserialize)]
pub(crate) struct ConfigureKeyRequest {
    /// Candidate credential to probe and install.
    #[serde(default)]
    api_key: String,
}

/// Response body for `POST /api/configure-api-key`.
#[derive(Serialize)]
pub(crate) struct ConfigureKeyResponse {
    success: bool,
    message: String,
}

/// Probe a candidate credential and install it when the remote service
/// accepts it. A rejected candidate leaves the previous key untouched.
pub(crate) async fn configure_api_key<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<ConfigureKeyRequest>,
) -> Json<ConfigureKeyResponse>
where
    S: RelayApi,
{
    let accepted = service.configure_credential(&request.api_key).await;
    let message = if accepted {
        "API key configured successfully"
    } else {
        "Invalid API key"
    };
    Json(ConfigureKeyResponse {
        success: accepted,
        message: message.to_string(),
    })
}
