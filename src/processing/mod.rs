//! Question-answering pipeline: chunking and the service that drives a request end to end.

pub mod chunking;
mod service;
pub mod types;

pub use service::{QaApi, QaService};
pub use types::{Chunk, ChunkingError, InitError, PipelineError};
