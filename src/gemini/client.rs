//! HTTP client wrapper for the Gemini File API and file-search stores.

use crate::config::get_config;
use crate::gemini::types::{
    GeminiError, GenerateContentResponse, ListFilesEnvelope, ListStoresEnvelope, RemoteFile,
    RemoteOperation, RemoteStore, UploadResponse,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use serde_json::{Value, json};
use std::sync::{PoisonError, RwLock};

const GENERATION_TEMPERATURE: f64 = 0.4;
const GENERATION_TOP_P: f64 = 1.0;
const GENERATION_TOP_K: u32 = 32;
const GENERATION_MAX_OUTPUT_TOKENS: u32 = 4096;
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Lightweight HTTP client for the Gemini endpoints the relay touches.
///
/// The credential lives in an interior slot so it can be replaced at runtime
/// through the configure endpoint without rebuilding the client.
pub struct GeminiClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) generation_model: String,
    pub(crate) api_key: RwLock<Option<String>>,
}

impl GeminiClient {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, GeminiError> {
        let config = get_config();
        let client = Client::builder().user_agent("docrelay/0.1").build()?;

        let base_url =
            normalize_base_url(&config.api_base_url).map_err(GeminiError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            model = %config.generation_model,
            has_api_key = config.gemini_api_key.is_some(),
            "Initialized Gemini HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            generation_model: config.generation_model.clone(),
            api_key: RwLock::new(config.gemini_api_key.clone()),
        })
    }

    /// Validate a candidate credential with a cheap read-only call.
    ///
    /// The candidate is not installed on success; that is the caller's call.
    pub async fn probe_credential(&self, candidate: &str) -> Result<(), GeminiError> {
        let url = format_endpoint(&self.base_url, "models");
        let response = self
            .client
            .get(url)
            .query(&[("key", candidate), ("pageSize", "1")])
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(GeminiError::UnexpectedStatus { status, body })
        }
    }

    /// Replace the credential used for subsequent requests.
    pub(crate) fn install_credential(&self, key: String) {
        let mut slot = self
            .api_key
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(key);
    }

    /// Create a file-search store with the given display name.
    pub async fn create_store(&self, display_name: &str) -> Result<RemoteStore, GeminiError> {
        let body = json!({ "displayName": display_name });
        let response = self
            .request(Method::POST, "fileSearchStores")?
            .json(&body)
            .send()
            .await?;
        let response = self.ensure_success(response, "create store").await?;
        Ok(response.json().await?)
    }

    /// List every file-search store in the project.
    pub async fn list_stores(&self) -> Result<Vec<RemoteStore>, GeminiError> {
        let response = self.request(Method::GET, "fileSearchStores")?.send().await?;
        let response = self.ensure_success(response, "list stores").await?;
        let envelope: ListStoresEnvelope = response.json().await?;
        Ok(envelope.file_search_stores)
    }

    /// Fetch a single store by its fully qualified name.
    pub async fn get_store(&self, store_name: &str) -> Result<RemoteStore, GeminiError> {
        let response = self.request(Method::GET, store_name)?.send().await?;
        let response = self.ensure_success(response, "get store").await?;
        Ok(response.json().await?)
    }

    /// Delete a store by its fully qualified name.
    pub async fn delete_store(&self, store_name: &str) -> Result<(), GeminiError> {
        let response = self.request(Method::DELETE, store_name)?.send().await?;
        self.ensure_success(response, "delete store").await?;
        Ok(())
    }

    /// Upload file content through the multipart upload protocol.
    ///
    /// Returns the remote record, whose state is usually still `PROCESSING`.
    pub async fn upload_file(
        &self,
        bytes: Vec<u8>,
        display_name: &str,
        mime_type: &str,
    ) -> Result<RemoteFile, GeminiError> {
        let key = self.credential()?;
        let metadata = json!({ "file": { "displayName": display_name } });
        let metadata_part = Part::text(metadata.to_string()).mime_str("application/json")?;
        let file_part = Part::bytes(bytes)
            .file_name(display_name.to_string())
            .mime_str(mime_type)?;
        let form = Form::new()
            .part("metadata", metadata_part)
            .part("file", file_part);

        let response = self
            .client
            .post(format_upload_endpoint(&self.base_url))
            .query(&[("key", key.as_str())])
            .header("X-Goog-Upload-Protocol", "multipart")
            .multipart(form)
            .send()
            .await?;
        let response = self.ensure_success(response, "upload file").await?;
        let envelope: UploadResponse = response.json().await?;
        Ok(envelope.into_file())
    }

    /// Fetch a single file record by its fully qualified name.
    pub async fn get_file(&self, file_name: &str) -> Result<RemoteFile, GeminiError> {
        let response = self.request(Method::GET, file_name)?.send().await?;
        let response = self.ensure_success(response, "get file").await?;
        Ok(response.json().await?)
    }

    /// List every uploaded file visible to the credential.
    pub async fn list_files(&self) -> Result<Vec<RemoteFile>, GeminiError> {
        let response = self.request(Method::GET, "files")?.send().await?;
        let response = self.ensure_success(response, "list files").await?;
        let envelope: ListFilesEnvelope = response.json().await?;
        Ok(envelope.files)
    }

    /// Delete an uploaded file by its fully qualified name.
    pub async fn delete_file(&self, file_name: &str) -> Result<(), GeminiError> {
        let response = self.request(Method::DELETE, file_name)?.send().await?;
        self.ensure_success(response, "delete file").await?;
        Ok(())
    }

    /// Start importing an uploaded file into a store.
    ///
    /// The remote side finishes the import asynchronously; the returned
    /// operation handle is not polled here.
    pub async fn import_file(
        &self,
        store_name: &str,
        file_name: &str,
        chunking_config: Option<Value>,
    ) -> Result<RemoteOperation, GeminiError> {
        let mut body = json!({ "fileName": file_name });
        if let Some(config) = chunking_config {
            body.as_object_mut()
                .expect("import body should remain an object")
                .insert("chunkingConfig".into(), config);
        }

        let response = self
            .request(Method::POST, &format!("{store_name}:importFile"))?
            .json(&body)
            .send()
            .await?;
        let response = self.ensure_success(response, "import file").await?;
        Ok(response.json().await?)
    }

    /// Run grounded generation for a query over the given stores.
    pub async fn generate_grounded(
        &self,
        query: &str,
        store_names: &[String],
    ) -> Result<GenerateContentResponse, GeminiError> {
        let body = build_generation_request(query, store_names);
        let path = format!("models/{}:generateContent", self.generation_model);
        let response = self
            .request(Method::POST, &path)?
            .json(&body)
            .send()
            .await?;
        let response = self.ensure_success(response, "generate content").await?;
        Ok(response.json().await?)
    }

    fn credential(&self) -> Result<String, GeminiError> {
        let slot = self.api_key.read().unwrap_or_else(PoisonError::into_inner);
        slot.clone().ok_or(GeminiError::MissingCredential)
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, GeminiError> {
        let key = self.credential()?;
        let url = format_endpoint(&self.base_url, path);
        Ok(self
            .client
            .request(method, url)
            .query(&[("key", key.as_str())]))
    }

    async fn ensure_success(
        &self,
        response: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response, GeminiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = GeminiError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, context, "Gemini request failed");
            Err(error)
        }
    }
}

/// Assemble the generation request body, attaching the file-search tool only
/// when at least one store is selected.
pub(crate) fn build_generation_request(query: &str, store_names: &[String]) -> Value {
    let safety_settings: Vec<Value> = SAFETY_CATEGORIES
        .iter()
        .map(|category| json!({ "category": category, "threshold": SAFETY_THRESHOLD }))
        .collect();

    let mut body = json!({
        "contents": [{ "parts": [{ "text": query }] }],
        "generationConfig": {
            "temperature": GENERATION_TEMPERATURE,
            "topP": GENERATION_TOP_P,
            "topK": GENERATION_TOP_K,
            "maxOutputTokens": GENERATION_MAX_OUTPUT_TOKENS,
        },
        "safetySettings": safety_settings,
    });

    if !store_names.is_empty() {
        body.as_object_mut()
            .expect("generation body should remain an object")
            .insert(
                "tools".into(),
                json!([{ "fileSearch": { "fileSearchStoreNames": store_names } }]),
            );
    }

    body
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
    format!("{base}/v1beta/{path}")
}

fn format_upload_endpoint(base: &str) -> String {
    format!("{}/upload/v1beta/files", base.trim_end_matches('/'))
}
