//! Prompt templates for the two answering strategies.

const DIVIDER: &str = "---------------------";

/// Prompt used at every level of tree summarization.
pub(crate) fn summary_prompt(question: &str, context: &str) -> String {
    format!(
        "Context information from multiple sources is below.\n{DIVIDER}\n{context}\n{DIVIDER}\n\
         Given the information from multiple sources and not prior knowledge, answer the query.\n\
         Query: {question}\nAnswer: "
    )
}

/// Prompt used by the vector path over the retrieved chunks.
pub(crate) fn qa_prompt(question: &str, context: &str) -> String {
    format!(
        "Context information is below.\n{DIVIDER}\n{context}\n{DIVIDER}\n\
         Given the context information and not prior knowledge, answer the query.\n\
         Query: {question}\nAnswer: "
    )
}
