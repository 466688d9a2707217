//! Per-question routing between the summary and vector query engines.
//!
//! A [`Selector`] looks at the question and the capability descriptions and picks exactly one
//! [`Capability`]; [`QueryRouter::route`] then runs only that engine and hands back its text
//! unchanged. Selection is a single shot: no retry, no second opinion, no fallback engine.

mod selector;

pub use selector::LlmSelector;

use crate::index::QueryError;
use crate::llm::LlmClientError;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// The two ways a question can be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Tree summarization over every chunk.
    Summary,
    /// Top-k similarity retrieval followed by a grounded answer.
    Vector,
}

impl Capability {
    /// Both capabilities, in the order they are offered to the selector.
    pub const ALL: [Capability; 2] = [Capability::Summary, Capability::Vector];

    /// Stable tool name used in logs and responses.
    pub const fn tool_name(self) -> &'static str {
        match self {
            Self::Summary => "summary_tool",
            Self::Vector => "vector_tool",
        }
    }

    /// Description the selector reads to decide when this capability applies.
    pub const fn description(self) -> &'static str {
        match self {
            Self::Summary => "Use this for summarizing documents or getting an overview",
            Self::Vector => {
                "Use this for specific fact retrieval, semantic search or keyword-based questions"
            }
        }
    }
}

/// Outcome of a selector call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// The chosen capability.
    pub capability: Capability,
    /// Free-text justification supplied by the selector (may be empty).
    pub reason: String,
}

/// Routed result: which engine ran and what it said.
#[derive(Debug, Clone)]
pub struct RoutedAnswer {
    /// Selector decision.
    pub selection: Selection,
    /// Answer text exactly as produced by the selected engine.
    pub answer: String,
}

/// Errors raised while selecting or running a capability.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Routing requires a question.
    #[error("question must not be empty")]
    EmptyQuestion,
    /// The selection call itself failed.
    #[error("Selector call failed: {0}")]
    Selection(#[from] LlmClientError),
    /// The selector answered with something that does not name a choice.
    #[error("Selector returned an unparseable choice: {0}")]
    MalformedSelection(String),
    /// The selector named a choice that was not offered.
    #[error("Selector chose option {choice}, but only {available} were offered")]
    ChoiceOutOfRange {
        /// 1-based choice returned by the selector.
        choice: u64,
        /// Number of choices offered.
        available: usize,
    },
    /// The selected engine failed.
    #[error("{tool} failed: {source}")]
    Query {
        /// Tool name of the engine that failed.
        tool: &'static str,
        /// Underlying engine error.
        #[source]
        source: QueryError,
    },
}

/// Picks one capability for a question.
#[async_trait]
pub trait Selector: Send + Sync {
    /// Choose exactly one of `choices` for `question`.
    async fn select(
        &self,
        question: &str,
        choices: &[Capability],
    ) -> Result<Selection, RouterError>;
}

/// Something that answers a question in free text.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Answer `question`.
    async fn query(&self, question: &str) -> Result<String, QueryError>;
}

/// Binds a selector to one engine per capability.
pub struct QueryRouter<'a> {
    selector: &'a dyn Selector,
    summary: &'a dyn QueryEngine,
    vector: &'a dyn QueryEngine,
}

impl<'a> QueryRouter<'a> {
    /// Create a router over the given engines.
    pub fn new(
        selector: &'a dyn Selector,
        summary: &'a dyn QueryEngine,
        vector: &'a dyn QueryEngine,
    ) -> Self {
        Self {
            selector,
            summary,
            vector,
        }
    }

    fn engine(&self, capability: Capability) -> &'a dyn QueryEngine {
        match capability {
            Capability::Summary => self.summary,
            Capability::Vector => self.vector,
        }
    }

    /// Select a capability for `question`, run it, and return its answer verbatim.
    pub async fn route(&self, question: &str) -> Result<RoutedAnswer, RouterError> {
        if question.trim().is_empty() {
            return Err(RouterError::EmptyQuestion);
        }

        let selection = self.selector.select(question, &Capability::ALL).await?;
        let tool = selection.capability.tool_name();
        tracing::info!(tool, reason = %selection.reason, "Selecting query engine");

        let answer = self
            .engine(selection.capability)
            .query(question)
            .await
            .map_err(|source| RouterError::Query { tool, source })?;

        Ok(RoutedAnswer { selection, answer })
    }
}
