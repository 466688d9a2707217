//! Token-bounded chunking of extracted documents.
//!
//! - Each page is split on its own so every chunk belongs to exactly one page.
//! - `semchunk-rs` picks the split points (paragraphs, then lines, then sentences, then words).
//! - Split points are chosen against `chunk_size - overlap`, and any piece that still exceeds
//!   that budget is cut at word boundaries, so every body leaves room for the overlap.
//! - The tail of the previous chunk of the same page (at most `overlap` tokens) is prepended to
//!   each following chunk. The result never exceeds `chunk_size`.
//! - Tokens are counted with tiktoken's `cl100k_base`; if the encoding cannot be loaded the
//!   counter falls back to whitespace-separated words.

use crate::document::Document;
use semchunk_rs::Chunker;
use std::sync::Arc;

use super::types::{Chunk, ChunkingError};

/// Shared token counting function.
pub type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Splits documents into overlapping, token-bounded chunks.
#[derive(Clone)]
pub struct DocumentChunker {
    chunk_size: usize,
    overlap: usize,
    counter: TokenCounter,
}

impl DocumentChunker {
    /// Build a chunker using the `cl100k_base` tokenizer.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        Self::with_counter(chunk_size, overlap, build_token_counter())
    }

    /// Build a chunker around an explicit token counter.
    pub fn with_counter(
        chunk_size: usize,
        overlap: usize,
        counter: TokenCounter,
    ) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        Ok(Self {
            chunk_size,
            overlap,
            counter,
        })
    }

    /// Handle to the token counter, for callers that pack text against a budget.
    pub fn token_counter(&self) -> TokenCounter {
        self.counter.clone()
    }

    /// Chunk every page of `document`, preserving document order.
    ///
    /// Whitespace-only pages contribute nothing.
    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in document.pages() {
            for text in self.chunk_text(&page.text) {
                if text.trim().is_empty() {
                    continue;
                }
                chunks.push(Chunk {
                    index: chunks.len(),
                    filename: document.filename().to_string(),
                    page: page.number,
                    text,
                });
            }
        }
        tracing::debug!(
            filename = document.filename(),
            chunks = chunks.len(),
            chunk_size = self.chunk_size,
            overlap = self.overlap,
            "Chunked document"
        );
        chunks
    }

    /// Chunk a single string.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let overlap = self.effective_overlap();
        let body_budget = self.chunk_size - overlap;
        let counter = self.counter.clone();
        let chunker = Chunker::new(
            body_budget,
            Box::new(move |segment: &str| counter.as_ref()(segment)),
        );
        let bodies: Vec<String> = chunker
            .chunk(text)
            .iter()
            .flat_map(|body| split_to_budget(body, body_budget, &self.counter))
            .collect();
        apply_overlap(bodies, self.chunk_size, overlap, &self.counter)
    }

    /// Overlap actually applied; at least one token is always left for new text.
    fn effective_overlap(&self) -> usize {
        self.overlap.min(self.chunk_size - 1)
    }
}

/// Token counter backed by tiktoken's `cl100k_base`, or whitespace words when unavailable.
pub fn build_token_counter() -> TokenCounter {
    match tiktoken_rs::cl100k_base() {
        Ok(encoding) => {
            let encoding = Arc::new(encoding);
            Arc::new(move |segment: &str| encoding.encode_ordinary(segment).len())
        }
        Err(error) => {
            tracing::warn!(
                error = %error,
                "cl100k_base tokenizer unavailable; falling back to whitespace counter"
            );
            whitespace_token_counter()
        }
    }
}

/// Counts whitespace-separated words; a non-empty string always counts as at least one.
pub fn whitespace_token_counter() -> TokenCounter {
    Arc::new(|segment: &str| {
        let tokens = segment.split_whitespace().count();
        if tokens == 0 && !segment.is_empty() {
            1
        } else {
            tokens
        }
    })
}

fn apply_overlap(
    bodies: Vec<String>,
    chunk_size: usize,
    overlap: usize,
    counter: &TokenCounter,
) -> Vec<String> {
    if overlap == 0 || bodies.len() < 2 {
        return bodies;
    }

    let mut overlapped = Vec::with_capacity(bodies.len());
    let mut previous: Option<&str> = None;
    for body in &bodies {
        let next = match previous {
            None => body.clone(),
            Some(prev) => {
                let tail = suffix_within_budget(prev, overlap, counter);
                join_within_budget(tail, body, chunk_size, counter)
            }
        };
        overlapped.push(next);
        previous = Some(body);
    }
    overlapped
}

/// Prepend as much of `tail` as fits; `body` alone must already fit `budget`.
fn join_within_budget(tail: &str, body: &str, budget: usize, counter: &TokenCounter) -> String {
    let starts = word_starts(tail);
    let first_fit = starts
        .partition_point(|&start| counter.as_ref()(&join_with_space(&tail[start..], body)) > budget)
        .min(starts.len() - 1);
    join_with_space(&tail[starts[first_fit]..], body)
}

fn join_with_space(head: &str, tail: &str) -> String {
    let mut combined = String::with_capacity(head.len() + tail.len() + 1);
    combined.push_str(head);
    let needs_space = !head.is_empty()
        && !head.ends_with(char::is_whitespace)
        && !tail.starts_with(char::is_whitespace);
    if needs_space {
        combined.push(' ');
    }
    combined.push_str(tail);
    combined
}

/// Cut `text` into consecutive pieces of at most `budget` tokens, at word boundaries when
/// possible.
fn split_to_budget(text: &str, budget: usize, counter: &TokenCounter) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = text.trim();
    while !rest.is_empty() {
        if counter.as_ref()(rest) <= budget {
            pieces.push(rest.to_string());
            break;
        }
        let end = prefix_end_within_budget(rest, budget, counter);
        pieces.push(rest[..end].trim_end().to_string());
        rest = rest[end..].trim_start();
    }
    pieces
}

/// Byte offset ending the longest prefix of `text` within `budget`; always at least one char.
fn prefix_end_within_budget(text: &str, budget: usize, counter: &TokenCounter) -> usize {
    let fits = |end: &usize| counter.as_ref()(&text[..*end]) <= budget;

    let ends = word_ends(text);
    let mut fitting = ends.partition_point(fits);
    while fitting > 0 && !fits(&ends[fitting - 1]) {
        fitting -= 1;
    }
    if fitting > 0 {
        return ends[fitting - 1];
    }

    // A single word is over budget: fall back to char boundaries.
    let ends: Vec<usize> = text
        .char_indices()
        .map(|(offset, ch)| offset + ch.len_utf8())
        .collect();
    let mut fitting = ends.partition_point(fits);
    while fitting > 1 && !fits(&ends[fitting - 1]) {
        fitting -= 1;
    }
    ends[fitting.saturating_sub(1)]
}

/// Longest suffix of `text`, starting at a word, whose token count fits `budget`.
fn suffix_within_budget<'a>(text: &'a str, budget: usize, counter: &TokenCounter) -> &'a str {
    let starts = word_starts(text);
    let first_fit = starts
        .partition_point(|&start| counter.as_ref()(&text[start..]) > budget)
        .min(starts.len() - 1);
    &text[starts[first_fit]..]
}

/// Offsets where a word begins, followed by `text.len()`.
fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut in_word = false;
    for (offset, ch) in text.char_indices() {
        if ch.is_whitespace() {
            in_word = false;
        } else if !in_word {
            starts.push(offset);
            in_word = true;
        }
    }
    starts.push(text.len());
    starts
}

/// Offsets just past the last char of each word.
fn word_ends(text: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut word_end = None;
    for (offset, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(end) = word_end.take() {
                ends.push(end);
            }
        } else {
            word_end = Some(offset + ch.len_utf8());
        }
    }
    ends.extend(word_end);
    ends
}
