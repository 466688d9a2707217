//! Tree summarization over every chunk.
//!
//! Chunks are packed greedily into groups that fit the context budget. One group is answered
//! directly; several groups are answered concurrently, at most `MAX_CONCURRENT_CALLS` at a
//! time, and the answers become the input of the next level. A level that cannot be packed
//! tighter is merged in pairs, so the number of texts strictly shrinks and the loop always ends.

use super::{QueryError, prompts};
use crate::llm::LlmClient;
use crate::processing::chunking::TokenCounter;
use crate::processing::types::Chunk;
use crate::router::QueryEngine;
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;

const GROUP_SEPARATOR: &str = "\n\n";

/// Upper bound on in-flight completion calls within one summarization level.
pub(crate) const MAX_CONCURRENT_CALLS: usize = 4;

/// Index that answers by summarizing the whole document.
pub struct SummaryIndex {
    chunks: Arc<[Chunk]>,
    llm: Arc<dyn LlmClient>,
    counter: TokenCounter,
    context_tokens: usize,
}

impl SummaryIndex {
    /// Create the index; no outbound calls are made until [`QueryEngine::query`].
    pub fn new(
        chunks: Arc<[Chunk]>,
        llm: Arc<dyn LlmClient>,
        counter: TokenCounter,
        context_tokens: usize,
    ) -> Self {
        Self {
            chunks,
            llm,
            counter,
            context_tokens,
        }
    }

    /// Chunks held by this index.
    pub fn chunks(&self) -> &Arc<[Chunk]> {
        &self.chunks
    }

    fn context_budget(&self, question: &str) -> usize {
        let overhead = self.counter.as_ref()(&prompts::summary_prompt(question, ""));
        self.context_tokens.saturating_sub(overhead).max(1)
    }
}

#[async_trait]
impl QueryEngine for SummaryIndex {
    async fn query(&self, question: &str) -> Result<String, QueryError> {
        if self.chunks.is_empty() {
            return Err(QueryError::EmptyIndex);
        }

        let budget = self.context_budget(question);
        let mut texts: Vec<String> = self.chunks.iter().map(Chunk::render_for_prompt).collect();
        let mut level = 0usize;

        loop {
            let groups = pack_groups(&texts, budget, &self.counter);
            tracing::debug!(level, inputs = texts.len(), groups = groups.len(), "Tree summarize level");

            if let [single] = groups.as_slice() {
                let prompt = prompts::summary_prompt(question, single);
                return Ok(self.llm.complete(&prompt).await?);
            }

            let llm = &self.llm;
            let group_prompts: Vec<String> = groups
                .iter()
                .map(|group| prompts::summary_prompt(question, group))
                .collect();
            let calls = group_prompts
                .into_iter()
                .map(|prompt| async move { llm.complete(&prompt).await });
            texts = stream::iter(calls)
                .buffered(MAX_CONCURRENT_CALLS)
                .try_collect()
                .await?;
            level += 1;
        }
    }
}

/// Pack `texts` into as few groups as fit `budget`, falling back to pairs when packing would
/// not reduce the count.
pub(crate) fn pack_groups(texts: &[String], budget: usize, counter: &TokenCounter) -> Vec<String> {
    let mut groups: Vec<String> = Vec::new();
    let mut current = String::new();

    for text in texts {
        if current.is_empty() {
            current.push_str(text);
            continue;
        }
        let candidate = format!("{current}{GROUP_SEPARATOR}{text}");
        if counter.as_ref()(&candidate) <= budget {
            current = candidate;
        } else {
            groups.push(std::mem::replace(&mut current, text.clone()));
        }
    }
    if !current.is_empty() || groups.is_empty() {
        groups.push(current);
    }

    if groups.len() > 1 && groups.len() >= texts.len() {
        return texts
            .chunks(2)
            .map(|pair| pair.join(GROUP_SEPARATOR))
            .collect();
    }
    groups
}
