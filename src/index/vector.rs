//! Similarity retrieval over chunk embeddings.

use super::{QueryError, prompts};
use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::llm::LlmClient;
use crate::processing::types::Chunk;
use crate::router::QueryEngine;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;

/// Index that answers from the chunks most similar to the question.
pub struct VectorIndex {
    chunks: Arc<[Chunk]>,
    embeddings: Vec<Vec<f32>>,
    embedder: Arc<dyn EmbeddingClient>,
    llm: Arc<dyn LlmClient>,
    top_k: usize,
}

impl VectorIndex {
    /// Embed every chunk and keep the vectors alongside the chunks.
    pub async fn build(
        chunks: Arc<[Chunk]>,
        embedder: Arc<dyn EmbeddingClient>,
        llm: Arc<dyn LlmClient>,
        top_k: usize,
    ) -> Result<Self, EmbeddingClientError> {
        let embeddings = if chunks.is_empty() {
            Vec::new()
        } else {
            let texts = chunks.iter().map(Chunk::render_for_prompt).collect();
            embedder.generate_embeddings(texts).await?
        };
        if embeddings.len() != chunks.len() {
            return Err(EmbeddingClientError::InvalidResponse(format!(
                "expected {} chunk embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }
        tracing::debug!(chunks = chunks.len(), top_k, "Embedded chunks for vector index");

        Ok(Self {
            chunks,
            embeddings,
            embedder,
            llm,
            top_k: top_k.max(1),
        })
    }

    /// Chunks held by this index.
    pub fn chunks(&self) -> &Arc<[Chunk]> {
        &self.chunks
    }

    /// Return the top-k chunks for `query`, in document order, with their scores.
    pub fn retrieve(&self, query: &[f32]) -> Result<Vec<(&Chunk, f32)>, QueryError> {
        if let Some(expected) = self.embeddings.first().map(Vec::len) {
            if expected != query.len() {
                return Err(QueryError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }
        Ok(rank(query, &self.embeddings, self.top_k)
            .into_iter()
            .map(|(index, score)| (&self.chunks[index], score))
            .collect())
    }
}

#[async_trait]
impl QueryEngine for VectorIndex {
    async fn query(&self, question: &str) -> Result<String, QueryError> {
        if self.chunks.is_empty() {
            return Err(QueryError::EmptyIndex);
        }

        let mut vectors = self
            .embedder
            .generate_embeddings(vec![question.to_string()])
            .await?;
        let query_vector = vectors.pop().ok_or_else(|| {
            EmbeddingClientError::InvalidResponse("no vector returned for the question".into())
        })?;

        let hits = self.retrieve(&query_vector)?;
        for (chunk, score) in &hits {
            tracing::debug!(index = chunk.index, page = chunk.page, score, "Retrieved chunk");
        }
        let context = hits
            .iter()
            .map(|(chunk, _)| chunk.render_for_prompt())
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(self.llm.complete(&prompts::qa_prompt(question, &context)).await?)
    }
}

/// Cosine similarity; zero when either vector has no magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Indexes and scores of the `top_k` best matches, returned in ascending index order.
/// Equal scores prefer the earlier chunk.
fn rank(query: &[f32], embeddings: &[Vec<f32>], top_k: usize) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = embeddings
        .iter()
        .enumerate()
        .map(|(index, vector)| (index, cosine_similarity(query, vector)))
        .collect();
    scored.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);
    scored.sort_by_key(|(index, _)| *index);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmClientError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Maps known texts to fixed vectors; anything else is the zero vector.
    struct TableEmbedder {
        table: HashMap<String, Vec<f32>>,
    }

    #[async_trait]
    impl EmbeddingClient for TableEmbedder {
        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            Ok(texts
                .iter()
                .map(|text| {
                    self.table
                        .iter()
                        .find(|(key, _)| text.contains(key.as_str()))
                        .map(|(_, vector)| vector.clone())
                        .unwrap_or_else(|| vec![0.0, 0.0, 0.0])
                })
                .collect())
        }
    }

    struct RecordingLlm {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for RecordingLlm {
        async fn complete(&self, prompt: &str) -> Result<String, LlmClientError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("The value is 42.".into())
        }

        fn model(&self) -> &str {
            "recording"
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

    #[test]
    fn cosine_handles_degenerate_vectors() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn rank_returns_top_k_in_document_order() {
        let embeddings = vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![0.5, 0.5],
        ];
        let ranked = rank(&[1.0, 0.0], &embeddings, 2);
        let indexes: Vec<usize> = ranked.iter().map(|(index, _)| *index).collect();
        assert_eq!(indexes, vec![1, 2]);
    }

    #[test]
    fn rank_breaks_ties_by_position() {
        let embeddings = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]];
        let ranked = rank(&[1.0, 0.0], &embeddings, 2);
        let indexes: Vec<usize> = ranked.iter().map(|(index, _)| *index).collect();
        assert_eq!(indexes, vec![0, 1]);
    }

    #[tokio::test]
    async fn query_uses_most_similar_chunks_as_context() {
        let table = HashMap::from([
            ("revenue".to_string(), vec![1.0, 0.0, 0.0]),
            ("weather".to_string(), vec![0.0, 1.0, 0.0]),
            ("value".to_string(), vec![0.9, 0.0, 0.1]),
        ]);
        let embedder = Arc::new(TableEmbedder { table });
        let llm = Arc::new(RecordingLlm {
            prompts: Mutex::new(Vec::new()),
        });
        let chunks: Arc<[Chunk]> = vec![
            chunk(0, 1, "The weather was mild."),
            chunk(1, 3, "Total revenue on this page: 42."),
        ]
        .into();

        let index = VectorIndex::build(chunks, embedder, llm.clone(), 1)
            .await
            .expect("index");
        let answer = index.query("What is the value?").await.expect("answer");

        assert_eq!(answer, "The value is 42.");
        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Total revenue on this page: 42."));
        assert!(prompts[0].contains("page_label: 3"));
        assert!(!prompts[0].contains("weather"));
    }

    #[tokio::test]
    async fn dimension_mismatch_is_reported() {
        let embedder = Arc::new(TableEmbedder {
            table: HashMap::new(),
        });
        let llm = Arc::new(RecordingLlm {
            prompts: Mutex::new(Vec::new()),
        });
        let chunks: Arc<[Chunk]> = vec![chunk(0, 1, "text")].into();
        let index = VectorIndex::build(chunks, embedder, llm, 2)
            .await
            .expect("index");

        let error = index.retrieve(&[1.0]).expect_err("mismatch");
        assert!(matches!(
            error,
            QueryError::DimensionMismatch {
                expected: 3,
                actual: 1
            }
        ));
    }
}
