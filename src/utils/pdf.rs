// PDF text extraction for the summarization pipeline.
// The parser itself is `pdf-extract`; this module only orders and joins its output.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a PDF file")]
    NotPdf { path: PathBuf },

    #[error("failed to extract text from {path}: {message}")]
    Extraction { path: PathBuf, message: String },
}

/// Source of plain document text, keyed by file path.
///
/// The pipeline only depends on this trait so tests can swap in fakes
/// that never touch the filesystem.
pub trait DocumentTextSource: Send + Sync {
    fn extract_text(&self, path: &Path) -> Result<String, PdfError>;
}

/// [`DocumentTextSource`] backed by the `pdf-extract` crate.
#[derive(Debug, Default)]
pub struct PdfExtractSource;

impl PdfExtractSource {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentTextSource for PdfExtractSource {
    fn extract_text(&self, path: &Path) -> Result<String, PdfError> {
        let bytes = std::fs::read(path).map_err(|source| PdfError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if !is_pdf(&bytes) {
            return Err(PdfError::NotPdf {
                path: path.to_path_buf(),
            });
        }

        // pdf-extract panics on some malformed inputs instead of returning an error.
        let pages = catch_parser_panic(|| pdf_extract::extract_text_from_mem_by_pages(&bytes))
            .map_err(|_| PdfError::Extraction {
                path: path.to_path_buf(),
                message: "PDF parser panicked".to_string(),
            })?
            .map_err(|e| PdfError::Extraction {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        info!("Extracted {} page(s) from {}", pages.len(), path.display());

        let text = join_pages(&pages);
        debug!("Extracted text length: {} characters", text.chars().count());
        Ok(text)
    }
}

/// Runs `f`, turning a panic into `Err` with the default hook swapped out so
/// the panic message goes to the debug log instead of stderr.
fn catch_parser_panic<T>(f: impl FnOnce() -> T) -> std::thread::Result<T> {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(|info| debug!("PDF parser panicked: {}", info)));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    panic::set_hook(previous);
    result
}

/// Joins per-page text in page order with a newline and trims the result.
/// Empty pages are kept so page boundaries are never collapsed.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|page| page.as_ref())
        .collect::<Vec<&str>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Returns true if the bytes start with the `%PDF-` signature.
pub fn is_pdf(head: &[u8]) -> bool {
    head.starts_with(PDF_MAGIC)
}
