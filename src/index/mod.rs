//! The two retrieval structures built over one request's chunks.
//!
//! Both indexes hold the same `Arc<[Chunk]>`, so the router's choice changes how context is
//! gathered, never which text is available.

mod prompts;
mod summary;
mod vector;

pub use summary::SummaryIndex;
pub use vector::{VectorIndex, cosine_similarity};

use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::llm::{LlmClient, LlmClientError};
use crate::processing::chunking::TokenCounter;
use crate::processing::types::Chunk;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while answering a question from an index.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The completion call failed.
    #[error(transparent)]
    Llm(#[from] LlmClientError),
    /// Embedding the question failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// The index holds no chunks.
    #[error("index contains no chunks")]
    EmptyIndex,
    /// The question embedding does not match the chunk embeddings.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the indexed chunk vectors.
        expected: usize,
        /// Dimension of the question vector.
        actual: usize,
    },
}

/// Tunables for index construction and querying.
#[derive(Debug, Clone, Copy)]
pub struct IndexSettings {
    /// Number of chunks the vector path hands to the LLM.
    pub similarity_top_k: usize,
    /// Token budget for one packed group in tree summarization.
    pub summary_context_tokens: usize,
}

/// Summary and vector index over the identical chunk sequence.
pub struct Indexes {
    /// Summarization-oriented index.
    pub summary: SummaryIndex,
    /// Similarity-oriented index.
    pub vector: VectorIndex,
}

impl Indexes {
    /// Build both indexes; only the vector index makes an outbound call (chunk embeddings).
    pub async fn build(
        chunks: Vec<Chunk>,
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn EmbeddingClient>,
        counter: TokenCounter,
        settings: IndexSettings,
    ) -> Result<Self, EmbeddingClientError> {
        let chunks: Arc<[Chunk]> = chunks.into();
        let summary = SummaryIndex::new(
            chunks.clone(),
            llm.clone(),
            counter,
            settings.summary_context_tokens,
        );
        let vector = VectorIndex::build(chunks, embedder, llm, settings.similarity_top_k).await?;
        tracing::debug!(chunks = summary.chunks().len(), "Built summary and vector indexes");
        Ok(Self { summary, vector })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbeddingClient;
    use crate::processing::chunking::whitespace_token_counter;
    use async_trait::async_trait;

    struct SilentLlm;

    #[async_trait]
    impl LlmClient for SilentLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmClientError> {
            Ok(String::new())
        }

        fn model(&self) -> &str {
            "silent"
        }
    }

    fn chunk(index: usize, page: usize, text: &str) -> Chunk {
        Chunk {
            index,
            filename: "doc.pdf".into(),
            page,
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn both_indexes_share_one_chunk_sequence() {
        let indexes = Indexes::build(
            vec![chunk(0, 1, "alpha"), chunk(1, 2, "beta")],
            Arc::new(SilentLlm),
            Arc::new(HashEmbeddingClient::new(8)),
            whitespace_token_counter(),
            IndexSettings {
                similarity_top_k: 2,
                summary_context_tokens: 100,
            },
        )
        .await
        .expect("indexes");

        assert!(Arc::ptr_eq(indexes.summary.chunks(), indexes.vector.chunks()));
        assert_eq!(indexes.summary.chunks().len(), 2);
    }
}
