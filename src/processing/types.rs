//! Core data types and error definitions for the question-answering pipeline.

use crate::document::LoaderError;
use crate::embedding::EmbeddingClientError;
use crate::llm::LlmClientError;
use crate::router::RouterError;
use thiserror::Error;

/// Errors produced while turning document text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Configured an impossible token budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Errors emitted by [`crate::processing::QaService::ask`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The question was blank.
    #[error("question must not be empty")]
    EmptyQuestion,
    /// The upload could not be written to its temporary file.
    #[error("Failed to store upload: {0}")]
    Upload(#[source] std::io::Error),
    /// The PDF could not be read.
    #[error(transparent)]
    Load(#[from] LoaderError),
    /// Chunking produced nothing to index.
    #[error("'{0}' produced no chunks to index")]
    NoChunks(String),
    /// Embedding the chunks for the vector index failed.
    #[error("Failed to build vector index: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Selection or the selected query failed.
    #[error(transparent)]
    Routing(#[from] RouterError),
    /// The blocking load-and-chunk task was cancelled or panicked.
    #[error("Document loading task failed: {0}")]
    Task(String),
}

/// Errors raised while constructing [`crate::processing::QaService`].
#[derive(Debug, Error)]
pub enum InitError {
    /// The completion client could not be created.
    #[error("Failed to initialize LLM client: {0}")]
    Llm(#[from] LlmClientError),
    /// The embedding client could not be created.
    #[error("Failed to initialize embedding client: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// The chunker rejected its settings.
    #[error("Failed to initialize chunker: {0}")]
    Chunking(#[from] ChunkingError),
}

/// A contiguous, token-bounded slice of one page of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in document order, starting at zero.
    pub index: usize,
    /// Source filename.
    pub filename: String,
    /// 1-based page the text came from.
    pub page: usize,
    /// Chunk text.
    pub text: String,
}

impl Chunk {
    /// Chunk text prefixed with its metadata, as shown to the LLM.
    pub fn render_for_prompt(&self) -> String {
        format!(
            "page_label: {}\nfile_name: {}\n\n{}",
            self.page,
            self.filename,
            self.text.trim()
        )
    }
}
