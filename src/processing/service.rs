//! Question-answering service: upload → text → chunks → indexes → routed answer.

use crate::{
    config::Config,
    document::{TempUpload, Upload, load_pdf},
    embedding::{EmbeddingClient, build_embedding_client},
    index::{IndexSettings, Indexes},
    llm::{LlmClient, build_llm_client},
    metrics::{MetricsSnapshot, QaMetrics},
    processing::{
        chunking::DocumentChunker,
        types::{ChunkingError, InitError, PipelineError},
    },
    router::{LlmSelector, QueryRouter, RoutedAnswer, Selector},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Runs the full pipeline for one upload/question pair.
///
/// The service holds only long-lived clients and counters. Every call to [`QaApi::ask`] builds
/// its own document, chunks and indexes and drops them before returning, so requests never see
/// each other's data.
pub struct QaService {
    config: Arc<Config>,
    llm: Arc<dyn LlmClient>,
    embedder: Arc<dyn EmbeddingClient>,
    selector: Arc<dyn Selector>,
    chunker: DocumentChunker,
    metrics: QaMetrics,
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait QaApi: Send + Sync {
    /// Answer `question` about the uploaded PDF.
    async fn ask(&self, upload: Upload, question: &str) -> Result<RoutedAnswer, PipelineError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl QaService {
    /// Build the service with clients selected by `config`.
    pub fn new(config: Arc<Config>) -> Result<Self, InitError> {
        tracing::info!("Initializing LLM and embedding clients");
        let llm = build_llm_client(&config)?;
        let embedder = build_embedding_client(&config)?;
        let selector: Arc<dyn Selector> = Arc::new(LlmSelector::new(llm.clone()));
        Ok(Self::with_components(config, llm, embedder, selector)?)
    }

    /// Build the service around explicit collaborators.
    pub fn with_components(
        config: Arc<Config>,
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn EmbeddingClient>,
        selector: Arc<dyn Selector>,
    ) -> Result<Self, ChunkingError> {
        let chunker = DocumentChunker::new(config.chunk_size, config.chunk_overlap)?;
        Ok(Self {
            config,
            llm,
            embedder,
            selector,
            chunker,
            metrics: QaMetrics::new(),
        })
    }

    fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            similarity_top_k: self.config.similarity_top_k,
            summary_context_tokens: self.config.summary_context_tokens,
        }
    }

    async fn run(
        &self,
        upload: &Upload,
        question: &str,
    ) -> Result<(RoutedAnswer, usize), PipelineError> {
        let temp = TempUpload::persist(upload, self.config.upload_dir.as_deref())
            .map_err(PipelineError::Upload)?;

        let path = temp.path_buf();
        let filename = temp.filename().to_string();
        let chunker = self.chunker.clone();
        let chunks = tokio::task::spawn_blocking(move || {
            let document = load_pdf(&path, &filename)?;
            let chunks = chunker.chunk_document(&document);
            if chunks.is_empty() {
                return Err(PipelineError::NoChunks(filename));
            }
            Ok(chunks)
        })
        .await
        .map_err(|error| PipelineError::Task(error.to_string()))??;
        let chunk_count = chunks.len();

        let indexes = Indexes::build(
            chunks,
            self.llm.clone(),
            self.embedder.clone(),
            self.chunker.token_counter(),
            self.index_settings(),
        )
        .await?;

        let router = QueryRouter::new(self.selector.as_ref(), &indexes.summary, &indexes.vector);
        let routed = router.route(question).await?;

        drop(temp);
        Ok((routed, chunk_count))
    }
}

#[async_trait]
impl QaApi for QaService {
    async fn ask(&self, upload: Upload, question: &str) -> Result<RoutedAnswer, PipelineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }
        tracing::info!(
            filename = %upload.filename,
            bytes = upload.bytes.len(),
            question_chars = question.chars().count(),
            "Answering question"
        );

        match self.run(&upload, question).await {
            Ok((routed, chunk_count)) => {
                self.metrics
                    .record_answer(routed.selection.capability, chunk_count as u64);
                tracing::info!(
                    filename = %upload.filename,
                    chunks = chunk_count,
                    tool = routed.selection.capability.tool_name(),
                    answer_chars = routed.answer.chars().count(),
                    "Question answered"
                );
                Ok(routed)
            }
            Err(error) => {
                self.metrics.record_failure();
                tracing::error!(filename = %upload.filename, error = %error, "Question failed");
                Err(error)
            }
        }
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
