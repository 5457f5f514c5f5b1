use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("failed to render page {page}: {message}")]
    RenderError { page: usize, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Geometry of one sampled PDF page, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PageLayout {
    /// 0-based page index.
    pub index: usize,
    pub page_area: f32,
    /// Union-free sum of text block bounding boxes, clipped to the page.
    pub text_area: f32,
    /// Sum of image block bounding boxes, clipped to the page.
    pub image_area: f32,
    pub char_count: usize,
}

/// Trait for PDF backends.
///
/// Implementors provide the low-level document access; the routing decision
/// (text-based vs scanned) and the OCR fallback live in `biodata_ingest`.
pub trait PdfBackend: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, path: &Path) -> Result<usize, BackendError>;

    /// Layout of the first `max_pages` pages (fewer if the document is shorter).
    fn sample_layout(&self, path: &Path, max_pages: usize) -> Result<Vec<PageLayout>, BackendError>;

    /// Selectable text of every page, in page order. Pages without a text
    /// layer yield empty strings.
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, BackendError>;

    /// Rasterize every page to a PNG inside `out_dir` and return the image
    /// paths in page order.
    fn render_pages(
        &self,
        path: &Path,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, BackendError>;
}

#[derive(Error, Debug)]
pub enum OcrError {
    /// The engine is not installed or cannot be started.
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),
    #[error("OCR timed out after {0:?}")]
    TimedOut(Duration),
    /// The engine ran but rejected the input (unreadable image, bad language pack, ...).
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    /// Whether this error invalidates the whole page set rather than one page.
    pub fn is_fatal(&self) -> bool {
        matches!(self, OcrError::Unavailable(_) | OcrError::TimedOut(_))
    }
}

/// Parameters for one recognition call.
#[derive(Debug, Clone, Copy)]
pub struct OcrRequest<'a> {
    pub language: &'a str,
    /// Remaining wall-clock budget for this call.
    pub timeout: Duration,
}

/// Trait for optical character recognition engines.
pub trait OcrEngine: Send + Sync {
    /// Human-readable engine name for logs.
    fn name(&self) -> &str;

    /// Check that the engine can run at all. Called once before a page set.
    fn probe(&self) -> Result<(), OcrError>;

    /// Recognize the text in a single image file.
    fn recognize(&self, image: &Path, request: &OcrRequest<'_>) -> Result<String, OcrError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_and_timeout_are_fatal() {
        assert!(OcrError::Unavailable("missing".into()).is_fatal());
        assert!(OcrError::TimedOut(Duration::from_secs(1)).is_fatal());
        assert!(!OcrError::Engine("bad image".into()).is_fatal());
        let io = std::io::Error::other("disk");
        assert!(!OcrError::Io(io).is_fatal());
    }
}
