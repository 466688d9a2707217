#![deny(missing_docs)]

//! Core library for the PDF question-answering server.

/// HTTP routing and form handlers.
pub mod api;
/// Environment-driven configuration.
pub mod config;
/// Uploads, temporary files, and PDF text extraction.
pub mod document;
/// Embedding client abstraction and adapters.
pub mod embedding;
mod http;
/// Summary and vector indexes built per request.
pub mod index;
/// Completion client abstraction and adapters.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Request counters.
pub mod metrics;
/// Chunking and the end-to-end question-answering service.
pub mod processing;
/// Capability selection and dispatch.
pub mod router;
