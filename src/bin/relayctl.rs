use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::{Value, json};

#[derive(Parser)]
#[command(name = "relayctl", about = "Command-line client for a running docrelay server")]
struct Cli {
    /// Base URL of the relay.
    #[arg(long, default_value = "http://127.0.0.1:5100")]
    relay_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe an API key and install it on the relay.
    ConfigureKey {
        #[arg(long)]
        api_key: String,
    },
    /// Manage file-search stores.
    Stores {
        #[command(subcommand)]
        command: StoreCommand,
    },
    /// Manage uploaded files.
    Files {
        #[command(subcommand)]
        command: FileCommand,
    },
    /// Ask a question grounded in the given stores.
    Ask {
        query: String,
        /// Store to ground in; repeatable.
        #[arg(long = "store")]
        stores: Vec<String>,
    },
    /// Fetch relay counters.
    Metrics,
}

#[derive(Subcommand)]
enum StoreCommand {
    /// List every store.
    List,
    /// Create a store.
    Create {
        #[arg(long, default_value = "Default Store")]
        display_name: String,
    },
    /// Delete a store.
    Delete { store: String },
    /// Import an uploaded file into a store.
    Import {
        store: String,
        #[arg(long)]
        file_uri: String,
        /// Chunking configuration as raw JSON.
        #[arg(long)]
        chunking_config: Option<String>,
    },
}

#[derive(Subcommand)]
enum FileCommand {
    /// List every uploaded file.
    List,
    /// Upload a local file through the relay.
    Upload {
        path: PathBuf,
        /// Target store name, recorded alongside the upload.
        #[arg(long)]
        store: Option<String>,
        /// Chunking configuration as raw JSON.
        #[arg(long)]
        chunking_config: Option<String>,
    },
    /// Delete an uploaded file.
    Delete { file: String },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base = cli.relay_url.trim_end_matches('/').to_string();

    let body = match cli.command {
        Command::ConfigureKey { api_key } => {
            post_json(
                &client,
                &format!("{base}/api/configure-api-key"),
                json!({ "api_key": api_key }),
            )
            .await?
        }
        Command::Stores { command } => match command {
            StoreCommand::List => get_json(&client, &format!("{base}/api/stores")).await?,
            StoreCommand::Create { display_name } => {
                post_json(
                    &client,
                    &format!("{base}/api/stores"),
                    json!({ "display_name": display_name }),
                )
                .await?
            }
            StoreCommand::Delete { store } => {
                delete_json(
                    &client,
                    &format!("{base}/api/stores/{}", encode_segment(&store)),
                )
                .await?
            }
            StoreCommand::Import {
                store,
                file_uri,
                chunking_config,
            } => {
                let mut payload = json!({ "file_uri": file_uri });
                if let Some(raw) = chunking_config {
                    let parsed: Value = serde_json::from_str(&raw)
                        .context("--chunking-config is not valid JSON")?;
                    payload["chunking_config"] = parsed;
                }
                post_json(
                    &client,
                    &format!("{base}/api/stores/{}/import-file", encode_segment(&store)),
                    payload,
                )
                .await?
            }
        },
        Command::Files { command } => match command {
            FileCommand::List => get_json(&client, &format!("{base}/api/files")).await?,
            FileCommand::Upload {
                path,
                store,
                chunking_config,
            } => {
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let file_name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .context("path has no usable file name")?
                    .to_string();
                let mut form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
                if let Some(store) = store {
                    form = form.text("store_name", store);
                }
                if let Some(chunking) = chunking_config {
                    form = form.text("chunking_config", chunking);
                }
                let response = client
                    .post(format!("{base}/api/upload-to-store"))
                    .multipart(form)
                    .send()
                    .await
                    .context("upload request failed")?;
                parse_body(response).await?
            }
            FileCommand::Delete { file } => {
                delete_json(
                    &client,
                    &format!("{base}/api/files/{}", encode_segment(&file)),
                )
                .await?
            }
        },
        Command::Ask { query, stores } => {
            post_json(
                &client,
                &format!("{base}/api/chat"),
                json!({ "query": query, "store_names": stores }),
            )
            .await?
        }
        Command::Metrics => get_json(&client, &format!("{base}/api/metrics")).await?,
    };

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

/// Escape `/` so qualified identifiers survive as a single path segment.
fn encode_segment(raw: &str) -> String {
    raw.replace('/', "%2F")
}

async fn get_json(client: &Client, url: &str) -> Result<Value> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?;
    parse_body(response).await
}

async fn post_json(client: &Client, url: &str, payload: Value) -> Result<Value> {
    let response = client
        .post(url)
        .json(&payload)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?;
    parse_body(response).await
}

async fn delete_json(client: &Client, url: &str) -> Result<Value> {
    let response = client
        .delete(url)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?;
    parse_body(response).await
}

async fn parse_body(response: Response) -> Result<Value> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .context("relay response was not JSON")?;
    if !status.is_success() {
        bail!("relay returned {status}: {body}");
    }
    Ok(body)
}
