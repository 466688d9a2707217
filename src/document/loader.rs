//! PDF text extraction.
//!
//! `pdf-extract` does the heavy lifting; when it errors or panics on an unusual file, `lopdf`
//! reads the content streams directly. Both produce one entry per page so chunks can carry
//! their page number.

use super::{Document, PageText};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use thiserror::Error;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Errors raised while turning an uploaded file into a [`Document`].
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The temporary file could not be read.
    #[error("Failed to read uploaded file: {0}")]
    Io(#[from] std::io::Error),
    /// The upload does not carry a PDF header.
    #[error("'{0}' is not a PDF file")]
    NotPdf(String),
    /// Both extraction strategies failed.
    #[error("Failed to extract text from '{filename}': {reason}")]
    Extraction {
        /// Upload filename.
        filename: String,
        /// Error reported by the last extractor tried.
        reason: String,
    },
    /// Extraction succeeded but produced no text (image-only or encrypted PDF).
    #[error("'{0}' contains no extractable text")]
    EmptyDocument(String),
}

/// Load the PDF at `path`, labelling the result with the user-facing `filename`.
///
/// Blocking; call from `spawn_blocking` inside async code.
pub fn load_pdf(path: &Path, filename: &str) -> Result<Document, LoaderError> {
    let bytes = std::fs::read(path)?;
    if !has_pdf_header(&bytes) {
        return Err(LoaderError::NotPdf(filename.to_string()));
    }

    let pages = match extract_with_pdf_extract(&bytes) {
        Ok(pages) => pages,
        Err(reason) => {
            tracing::warn!(filename, %reason, "pdf-extract failed; trying lopdf fallback");
            extract_with_lopdf(&bytes).map_err(|reason| LoaderError::Extraction {
                filename: filename.to_string(),
                reason,
            })?
        }
    };

    let document = Document::new(filename, pages);
    if document.is_blank() {
        return Err(LoaderError::EmptyDocument(filename.to_string()));
    }
    tracing::info!(
        filename,
        pages = document.pages().len(),
        characters = document.text().len(),
        "Loaded PDF"
    );
    Ok(document)
}

/// Readers accept the header anywhere in the first 1024 bytes.
fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(1024)];
    window
        .windows(PDF_MAGIC.len())
        .any(|candidate| candidate == PDF_MAGIC)
}

fn extract_with_pdf_extract(bytes: &[u8]) -> Result<Vec<PageText>, String> {
    let result = catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }));
    match result {
        Ok(Ok(pages)) => Ok(number_pages(pages)),
        Ok(Err(error)) => Err(error.to_string()),
        Err(_) => Err("pdf-extract panicked while reading the file".to_string()),
    }
}

fn extract_with_lopdf(bytes: &[u8]) -> Result<Vec<PageText>, String> {
    let document = lopdf::Document::load_mem(bytes).map_err(|error| error.to_string())?;
    let mut pages = Vec::new();
    for number in document.get_pages().into_keys() {
        match document.extract_text(&[number]) {
            Ok(text) => pages.push(PageText {
                number: number as usize,
                text: normalize(&text),
            }),
            Err(error) => {
                tracing::debug!(page = number, %error, "Could not extract page text");
            }
        }
    }
    if pages.is_empty() {
        return Err("no readable pages".to_string());
    }
    Ok(pages)
}

fn number_pages(pages: Vec<String>) -> Vec<PageText> {
    pages
        .into_iter()
        .enumerate()
        .map(|(index, text)| PageText {
            number: index + 1,
            text: normalize(&text),
        })
        .collect()
}

/// Strip trailing whitespace per line and drop leading/trailing blank lines.
fn normalize(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}
