use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{self, Request, StatusCode};
use docrelay::api::create_router;
use docrelay::relay::RelayService;
use docrelay::{config, logging};
use httpmock::{Method::DELETE, Method::GET, Method::POST, Mock, MockServer};
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tower::ServiceExt;

static INIT: OnceCell<()> = OnceCell::const_new();
static MOCK_SERVER: OnceCell<&'static MockServer> = OnceCell::const_new();

fn set_env(key: &str, value: &str) {
    // SAFETY: Tests run in a single process and establish deterministic configuration upfront.
    unsafe { std::env::set_var(key, value) }
}

/// Start the shared mock backend and point the process configuration at it.
///
/// Tests run concurrently against one backend, so each test that talks to
/// the remote service installs its own credential and scopes its mocks with
/// a `key` query parameter match.
async fn setup() -> &'static MockServer {
    INIT.get_or_init(|| async {
        let mock_server = Box::leak(Box::new(MockServer::start_async().await));
        set_env("GEMINI_API_KEY", "test-key");
        set_env("GEMINI_API_BASE_URL", &mock_server.base_url());
        set_env("GENERATION_MODEL", "gemini-2.5-flash");
        set_env("FILE_POLL_INTERVAL_MS", "10");
        set_env("FILE_POLL_TIMEOUT_SECS", "2");
        MOCK_SERVER.set(mock_server).ok();

        config::init_config();
        logging::init_tracing();
    })
    .await;
    MOCK_SERVER.get().expect("mock server initialized")
}

async fn mock_probe<'a>(server: &'a MockServer, key: &'static str) -> Mock<'a> {
    server
        .mock_async(move |when, then| {
            when.method(GET)
                .path("/v1beta/models")
                .query_param("key", key)
                .query_param("pageSize", "1");
            then.status(200).json_body(json!({ "models": [] }));
        })
        .await
}

/// Build a relay whose remote calls carry `key` so mocks stay test-local.
async fn configured_service(server: &MockServer, key: &'static str) -> RelayService {
    let service = RelayService::new();
    let probe = mock_probe(server, key).await;
    assert!(
        service.configure_credential(key).await,
        "probe for {key} should pass"
    );
    probe.assert_async().await;
    service
}

async fn request(app: Router, method: http::Method, uri: &str, body: Option<Value>) -> Value {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

async fn get_api(app: Router, uri: &str) -> Value {
    request(app, http::Method::GET, uri, None).await
}

async fn post_api(app: Router, uri: &str, body: Value) -> Value {
    request(app, http::Method::POST, uri, Some(body)).await
}

async fn delete_api(app: Router, uri: &str) -> Value {
    request(app, http::Method::DELETE, uri, None).await
}

/// POST a `multipart/form-data` upload with the given file part and extras.
async fn upload_api(app: Router, uri: &str, file_name: &str, content: &str) -> Value {
    let boundary = "docrelay-it-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n{content}\r\n"
    );
    body.push_str(&format!("--{boundary}--\r\n"));
    let request = Request::builder()
        .method(http::Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request");
    let response = app.oneshot(request).await.expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn upload_endpoint_stages_relays_and_polls_to_active() {
    let server = setup().await;
    let service = configured_service(server, "upload-key").await;
    let app = create_router(Arc::new(service));

    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/upload/v1beta/files")
                .query_param("key", "upload-key")
                .header("x-goog-upload-protocol", "multipart")
                .body_contains("notes.md");
            then.status(200).json_body(json!({
                "file": {
                    "name": "files/up-1",
                    "displayName": "notes.md",
                    "mimeType": "text/markdown",
                    "sizeBytes": "7",
                    "state": "PROCESSING"
                }
            }));
        })
        .await;
    let poll = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1beta/files/up-1")
                .query_param("key", "upload-key");
            then.status(200).json_body(json!({
                "name": "files/up-1",
                "displayName": "notes.md",
                "mimeType": "text/markdown",
                "sizeBytes": "7",
                "state": "ACTIVE",
                "uri": "https://example.test/files/up-1"
            }));
        })
        .await;

    let body = upload_api(app, "/api/upload-to-store", "notes.md", "# notes").await;

    assert_eq!(body["success"], json!(true));
    assert_eq!(body["file_name"], json!("notes.md"));
    assert_eq!(body["file_uri"], json!("files/up-1"));
    assert_eq!(body["status"], json!("uploaded"));
    upload.assert_async().await;
    poll.assert_async().await;
}

#[tokio::test]
async fn import_files_endpoint_uses_the_imported_label() {
    let server = setup().await;
    let service = configured_service(server, "bulk-key").await;
    let app = create_router(Arc::new(service));

    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/upload/v1beta/files")
                .query_param("key", "bulk-key");
            then.status(200).json_body(json!({
                "file": {
                    "name": "files/bulk-1",
                    "displayName": "plan.txt",
                    "state": "ACTIVE"
                }
            }));
        })
        .await;

    let body = upload_api(app, "/api/import-files", "plan.txt", "q3 plan").await;

    assert_eq!(body["success"], json!(true));
    assert_eq!(body["file_uri"], json!("files/bulk-1"));
    assert_eq!(body["status"], json!("imported"));
    upload.assert_async().await;
}

#[tokio::test]
async fn upload_endpoint_rejects_disallowed_extensions_locally() {
    let _server = setup().await;
    let service = RelayService::new();
    let app = create_router(Arc::new(service));

    let body = upload_api(app, "/api/upload-to-store", "tool.exe", "MZ").await;

    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("File type not allowed"));
}

#[tokio::test]
async fn chat_endpoint_returns_a_grounded_answer() {
    let server = setup().await;
    let service = configured_service(server, "chat-key").await;
    let app = create_router(Arc::new(service));

    let generate = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-flash:generateContent")
                .query_param("key", "chat-key")
                .body_contains("How did revenue develop?")
                .body_contains("fileSearchStores/briefs");
            then.status(200).json_body(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "Revenue grew 12 percent." }] },
                    "groundingMetadata": {
                        "groundingChunks": [{
                            "retrievedContext": {
                                "title": "briefs.pdf",
                                "text": "--- PAGE 3 ---\nRevenue table\n--- PAGE 7 ---\nOutlook"
                            }
                        }]
                    }
                }],
                "usageMetadata": {
                    "totalTokenCount": 321,
                    "promptTokenCount": 300,
                    "candidatesTokenCount": 21
                }
            }));
        })
        .await;

    let body = post_api(
        app,
        "/api/chat",
        json!({ "query": "How did revenue develop?", "store_names": ["briefs"] }),
    )
    .await;

    assert_eq!(body["query"], json!("How did revenue develop?"));
    assert_eq!(body["response"], json!("Revenue grew 12 percent."));
    assert_eq!(body["citations"][0]["source"], json!("briefs.pdf"));
    assert_eq!(body["citations"][0]["page"], json!("Page 3, 7"));
    assert_eq!(body["usage"]["total_token_count"], json!(321));
    generate.assert_async().await;
}

#[tokio::test]
async fn chat_endpoint_falls_back_when_the_model_says_nothing() {
    let server = setup().await;
    let service = configured_service(server, "fallback-key").await;
    let app = create_router(Arc::new(service));

    let generate = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-flash:generateContent")
                .query_param("key", "fallback-key");
            then.status(200).json_body(json!({}));
        })
        .await;

    let body = post_api(app, "/api/chat", json!({ "query": "Anything at all?" })).await;

    assert_eq!(
        body["response"],
        json!(
            "Could not generate response. The model may not have found relevant information in the documents."
        )
    );
    assert_eq!(body["citations"], json!([]));
    assert_eq!(body["usage"], json!({}));
    generate.assert_async().await;
}

#[tokio::test]
async fn store_listing_fails_soft_on_remote_errors() {
    let server = setup().await;
    let service = configured_service(server, "broken-key").await;
    let app = create_router(Arc::new(service));

    let listing = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1beta/fileSearchStores")
                .query_param("key", "broken-key");
            then.status(500).body("backend exploded");
        })
        .await;

    let body = get_api(app, "/api/stores").await;

    assert_eq!(body, json!([]));
    listing.assert_async().await;
}

#[tokio::test]
async fn rejected_credential_leaves_the_previous_key_working() {
    let server = setup().await;
    let service = RelayService::new();
    let app = create_router(Arc::new(service));

    let probe = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1beta/models")
                .query_param("key", "rejected-key")
                .query_param("pageSize", "1");
            then.status(400)
                .json_body(json!({ "error": { "message": "API key not valid" } }));
        })
        .await;
    let listing = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1beta/fileSearchStores")
                .query_param("key", "test-key");
            then.status(200).json_body(json!({
                "fileSearchStores": [{ "name": "fileSearchStores/briefs", "displayName": "Briefs" }]
            }));
        })
        .await;

    let body = post_api(
        app.clone(),
        "/api/configure-api-key",
        json!({ "api_key": "rejected-key" }),
    )
    .await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Invalid API key"));
    probe.assert_async().await;

    let body = get_api(app, "/api/stores").await;
    assert_eq!(body[0]["name"], json!("fileSearchStores/briefs"));
    listing.assert_async().await;
}

#[tokio::test]
async fn store_create_and_get_roundtrip() {
    let server = setup().await;
    let service = configured_service(server, "create-key").await;
    let app = create_router(Arc::new(service));

    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/fileSearchStores")
                .query_param("key", "create-key")
                .body_contains("Quarterly");
            then.status(200).json_body(json!({
                "name": "fileSearchStores/q1",
                "displayName": "Quarterly",
                "activeDocumentsCount": 0
            }));
        })
        .await;
    let fetch = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1beta/fileSearchStores/q1")
                .query_param("key", "create-key");
            then.status(200).json_body(json!({
                "name": "fileSearchStores/q1",
                "displayName": "Quarterly",
                "activeDocumentsCount": 4,
                "sizeBytes": "1024"
            }));
        })
        .await;

    let body = post_api(app.clone(), "/api/stores", json!({ "display_name": "Quarterly" })).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["name"], json!("fileSearchStores/q1"));
    create.assert_async().await;

    let body = get_api(app, "/api/stores/fileSearchStores%2Fq1").await;
    assert_eq!(body["name"], json!("fileSearchStores/q1"));
    assert_eq!(body["active_documents_count"], json!(4));
    assert_eq!(body["size_bytes"], json!(1024));
    fetch.assert_async().await;
}

#[tokio::test]
async fn store_delete_reports_both_outcomes() {
    let server = setup().await;
    let service = configured_service(server, "delete-key").await;
    let app = create_router(Arc::new(service));

    let accepted = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/v1beta/fileSearchStores/old-briefs")
                .query_param("key", "delete-key");
            then.status(200).json_body(json!({}));
        })
        .await;
    let missing = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/v1beta/fileSearchStores/ghost")
                .query_param("key", "delete-key");
            then.status(404)
                .json_body(json!({ "error": { "message": "not found" } }));
        })
        .await;

    let body = delete_api(app.clone(), "/api/stores/old-briefs").await;
    assert_eq!(body, json!({ "success": true }));
    accepted.assert_async().await;

    let body = delete_api(app, "/api/stores/ghost").await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Could not delete store"));
    missing.assert_async().await;
}

#[tokio::test]
async fn file_delete_normalizes_bare_and_qualified_identifiers() {
    let server = setup().await;
    let service = configured_service(server, "file-del-key").await;
    let app = create_router(Arc::new(service));

    let remote = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/v1beta/files/doc-1")
                .query_param("key", "file-del-key");
            then.status(200).json_body(json!({}));
        })
        .await;

    let body = delete_api(app.clone(), "/api/files/doc-1").await;
    assert_eq!(body, json!({ "success": true }));

    let body = delete_api(app, "/api/files/files%2Fdoc-1").await;
    assert_eq!(body, json!({ "success": true }));

    remote.assert_hits_async(2).await;
}

#[tokio::test]
async fn import_endpoint_forwards_chunking_configuration() {
    let server = setup().await;
    let service = configured_service(server, "import-key").await;
    let app = create_router(Arc::new(service));

    let import = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/fileSearchStores/briefs:importFile")
                .query_param("key", "import-key")
                .body_contains("files/doc-9")
                .body_contains("maxTokensPerChunk");
            then.status(200)
                .json_body(json!({ "name": "operations/op-1", "done": false }));
        })
        .await;

    let body = post_api(
        app,
        "/api/stores/briefs/import-file",
        json!({
            "file_uri": "doc-9",
            "chunking_config": { "whiteSpaceConfig": { "maxTokensPerChunk": 200 } }
        }),
    )
    .await;

    assert_eq!(body["success"], json!(true));
    assert_eq!(body["operation_name"], json!("operations/op-1"));
    assert_eq!(body["status"], json!("import_started"));
    import.assert_async().await;
}

#[tokio::test]
async fn metrics_endpoint_counts_completed_uploads() {
    let server = setup().await;
    let service = configured_service(server, "metrics-key").await;
    let app = create_router(Arc::new(service));

    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/upload/v1beta/files")
                .query_param("key", "metrics-key");
            then.status(200).json_body(json!({
                "file": { "name": "files/m-1", "state": "ACTIVE" }
            }));
        })
        .await;

    let body = upload_api(app.clone(), "/api/upload-to-store", "stats.csv", "a,b").await;
    assert_eq!(body["success"], json!(true));
    upload.assert_async().await;

    let body = get_api(app, "/api/metrics").await;
    assert_eq!(
        body,
        json!({
            "files_uploaded": 1,
            "imports_started": 0,
            "queries_answered": 0
        })
    );
}
