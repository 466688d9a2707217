//! Uploaded files and the documents extracted from them.

mod loader;

pub use loader::{LoaderError, load_pdf};

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A file received from the upload form.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied filename, used only as metadata.
    pub filename: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Bundle a filename with its bytes.
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Browsers submit an empty part when no file was chosen.
    pub fn is_empty(&self) -> bool {
        self.filename.trim().is_empty() || self.bytes.is_empty()
    }
}

/// The upload written to a named temporary `.pdf` file for the lifetime of one request.
///
/// The file is removed when this guard drops, whether the request succeeded or failed.
pub struct TempUpload {
    file: NamedTempFile,
    filename: String,
}

impl TempUpload {
    /// Write `upload` into a fresh temporary file under `dir` (or the OS temp dir).
    pub fn persist(upload: &Upload, dir: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("askpdf-").suffix(".pdf");
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(&upload.bytes)?;
        file.flush()?;
        tracing::debug!(
            filename = %upload.filename,
            path = %file.path().display(),
            bytes = upload.bytes.len(),
            "Stored upload in temporary file"
        );
        Ok(Self {
            file,
            filename: upload.filename.clone(),
        })
    }

    /// Original filename of the upload.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Location of the temporary file on disk.
    pub fn path_buf(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }
}

/// Text of a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number.
    pub number: usize,
    /// Extracted text.
    pub text: String,
}

/// Text extracted from one uploaded PDF, in page order.
#[derive(Debug, Clone)]
pub struct Document {
    filename: String,
    pages: Vec<PageText>,
}

impl Document {
    /// Build a document from already extracted pages.
    pub fn new(filename: impl Into<String>, pages: Vec<PageText>) -> Self {
        Self {
            filename: filename.into(),
            pages,
        }
    }

    /// Source filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Pages in document order.
    pub fn pages(&self) -> &[PageText] {
        &self.pages
    }

    /// Full text with pages separated by blank lines.
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// True when no page carries any non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.text.trim().is_empty())
    }
}
