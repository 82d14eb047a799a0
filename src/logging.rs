//! Tracing setup: compact stdout logs plus a non-blocking file mirror.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the global tracing subscriber.
///
/// Events go to stdout in compact form, filtered by `RUST_LOG` (default
/// `info`), and are mirrored to `DOCRELAY_LOG_FILE` (default
/// `logs/docrelay.log`) through a non-blocking appender whose worker lives
/// for the rest of the process.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    if let Some(writer) = configure_file_writer(&resolve_log_path()) {
        let file_layer = fmt::layer().with_writer(writer).with_ansi(false);
        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

/// Build a non-blocking writer for the file mirror.
///
/// Returns `None` when the log directory cannot be created or when a writer
/// guard is already installed.
fn configure_file_writer(path: &Path) -> Option<NonBlocking> {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .map(OsStr::to_os_string)
        .unwrap_or_else(|| OsString::from("docrelay.log"));
    if let Err(error) = fs::create_dir_all(&directory) {
        eprintln!(
            "Failed to create log directory {}: {error}",
            directory.display()
        );
        return None;
    }
    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    if LOG_GUARD.set(guard).is_err() {
        return None;
    }
    Some(writer)
}

fn resolve_log_path() -> PathBuf {
    match std::env::var("DOCRELAY_LOG_FILE") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => PathBuf::from("logs/docrelay.log"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // SAFETY: This is the only test in the binary that touches
    // DOCRELAY_LOG_FILE, so no concurrent reader observes the mutation.
    fn set_env(value: Option<&str>) {
        match value {
            Some(value) => unsafe { std::env::set_var("DOCRELAY_LOG_FILE", value) },
            None => unsafe { std::env::remove_var("DOCRELAY_LOG_FILE") },
        }
    }

    #[test]
    fn log_path_defaults_and_honors_the_override() {
        set_env(None);
        assert_eq!(resolve_log_path(), PathBuf::from("logs/docrelay.log"));

        set_env(Some("   "));
        assert_eq!(resolve_log_path(), PathBuf::from("logs/docrelay.log"));

        set_env(Some("/var/log/relay/out.log"));
        assert_eq!(resolve_log_path(), PathBuf::from("/var/log/relay/out.log"));

        set_env(None);
    }
}
