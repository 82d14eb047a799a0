//! Upload validation, scratch staging, and processing-state polling.

use std::time::Duration;

use tempfile::TempPath;
use tokio::time::Instant;

use crate::config::Config;
use crate::gemini::{FileState, GeminiClient, RemoteFile};
use crate::relay::types::IngestError;

/// Extensions the relay accepts for upload.
pub(crate) const ALLOWED_EXTENSIONS: [&str; 31] = [
    "txt", "pdf", "csv", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "html", "htm", "md", "json",
    "xml", "py", "js", "ts", "jsx", "tsx", "css", "sql", "c", "cpp", "java", "go", "rs", "swift",
    "php", "rb", "yml", "yaml",
];

/// Lowercased extension of the filename, when it has one.
pub(crate) fn file_extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
}

/// True when the filename carries an allow-listed extension.
pub(crate) fn is_allowed_file(file_name: &str) -> bool {
    file_extension(file_name)
        .map(|extension| ALLOWED_EXTENSIONS.contains(&extension.as_str()))
        .unwrap_or(false)
}

/// Best-effort MIME type from the extension. The remote service treats most
/// code and plain-text formats the same way, so the table stays coarse.
pub(crate) fn mime_type_for(file_name: &str) -> &'static str {
    match file_extension(file_name).as_deref() {
        Some("txt") => "text/plain",
        Some("pdf") => "application/pdf",
        Some("csv") => "text/csv",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("ppt") => "application/vnd.ms-powerpoint",
        Some("pptx") => {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        }
        Some("html" | "htm") => "text/html",
        Some("md") => "text/markdown",
        Some("json") => "application/json",
        Some("xml") => "text/xml",
        Some("js" | "jsx" | "ts" | "tsx") => "text/javascript",
        Some("css") => "text/css",
        Some("yml" | "yaml") => "text/yaml",
        Some("py" | "sql" | "c" | "cpp" | "java" | "go" | "rs" | "swift" | "php" | "rb") => {
            "text/plain"
        }
        _ => "application/octet-stream",
    }
}

/// Poll cadence and deadline for remote file processing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PollSettings {
    pub(crate) interval: Duration,
    pub(crate) deadline: Duration,
}

impl PollSettings {
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            interval: Duration::from_millis(config.file_poll_interval_ms),
            deadline: Duration::from_secs(config.file_poll_timeout_secs),
        }
    }
}

/// Write upload bytes to a scratch file that is removed when the returned
/// path is dropped. The original extension is preserved as the suffix.
pub(crate) async fn stage_upload(file_name: &str, bytes: &[u8]) -> Result<TempPath, IngestError> {
    let suffix = file_extension(file_name)
        .map(|extension| format!(".{extension}"))
        .unwrap_or_default();
    let staged = tempfile::Builder::new()
        .prefix("docrelay-upload-")
        .suffix(&suffix)
        .tempfile()?
        .into_temp_path();
    tokio::fs::write(&staged, bytes).await?;
    Ok(staged)
}

/// Poll the remote record until it leaves `PROCESSING`, then demand success.
///
/// The deadline bounds the whole wait so a stuck remote file cannot pin the
/// request forever.
pub(crate) async fn await_file_active(
    client: &GeminiClient,
    uploaded: RemoteFile,
    poll: PollSettings,
) -> Result<RemoteFile, IngestError> {
    let started = Instant::now();
    let mut file = uploaded;

    while file.state == FileState::Processing {
        if started.elapsed() >= poll.deadline {
            return Err(IngestError::ProcessingTimeout {
                file_name: file.name,
            });
        }
        tokio::time::sleep(poll.interval).await;
        file = client.get_file(&file.name).await?;
        tracing::debug!(file = %file.name, state = %file.state, "Polled file state");
    }

    if file.state == FileState::Failed {
        return Err(IngestError::ProcessingFailed {
            file_name: file.name,
            state: FileState::Failed,
        });
    }

    Ok(file)
}
