//! Gemini File API and file-search store integration.

pub mod client;
pub mod types;

pub use client::GeminiClient;
pub use types::{
    Candidate, CandidateContent, ContentPart, FileState, GeminiError, GenerateContentResponse,
    GroundingChunk, GroundingMetadata, RemoteFile, RemoteOperation, RemoteStore, RetrievedContext,
    UsageMetadata,
};
