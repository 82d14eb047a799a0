//! Relay pipeline: upload validation, staging, remote orchestration, and
//! response normalization.

mod answer;
mod ingest;
mod service;
pub mod types;

pub use service::{RelayApi, RelayService};
pub use types::{
    Citation, ImportOutcome, ImportStatus, IngestError, QueryError, QueryOutcome, StoreSummary,
    UploadedFile, UsageStats, qualify_file_name, qualify_store_name,
};
