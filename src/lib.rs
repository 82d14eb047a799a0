#![deny(missing_docs)]

//! Core library for the docrelay document search relay.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Gemini File Search API client and wire types.
pub mod gemini;
/// Structured logging and tracing setup.
pub mod logging;
/// Relay counters.
pub mod metrics;
/// Upload, store, and grounded-answer orchestration.
pub mod relay;
