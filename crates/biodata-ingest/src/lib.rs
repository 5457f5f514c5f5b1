use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use indexmap::IndexMap;
use thiserror::Error;

pub mod classify;
pub mod density;
pub mod mock;
pub mod ocr;
pub mod router;

// Re-export domain types for convenience
pub use biodata_core::{Config, DocumentKind, DocumentRef, is_supported_path};
pub use density::{is_text_based, text_coverage};
pub use router::{DocumentRouter, PdfRoute};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("file not found or unreadable: {}", .0.display())]
    NotFound(PathBuf),
    #[error("file is {size} bytes, over the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("PDF error: {0}")]
    Pdf(#[from] biodata_core::BackendError),
    #[error("OCR error: {0}")]
    Ocr(#[from] biodata_core::OcrError),
    #[error("document has no pages to recognize")]
    NoPages,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "pdf")]
pub(crate) fn default_pdf_backend() -> Box<dyn biodata_core::PdfBackend> {
    Box::new(biodata_pdf_mupdf::MupdfBackend::new())
}

#[cfg(not(feature = "pdf"))]
pub(crate) fn default_pdf_backend() -> Box<dyn biodata_core::PdfBackend> {
    Box::new(unsupported::NoPdfSupport)
}

#[cfg(feature = "ocr")]
pub(crate) fn default_ocr_engine(config: &Config) -> Box<dyn biodata_core::OcrEngine> {
    Box::new(biodata_ocr::TesseractEngine::from_settings(&config.ocr))
}

#[cfg(not(feature = "ocr"))]
pub(crate) fn default_ocr_engine(_config: &Config) -> Box<dyn biodata_core::OcrEngine> {
    Box::new(unsupported::NoOcrSupport)
}

#[cfg(not(all(feature = "pdf", feature = "ocr")))]
mod unsupported {
    use std::path::{Path, PathBuf};

    use biodata_core::{BackendError, OcrEngine, OcrError, OcrRequest, PageLayout, PdfBackend};

    #[allow(dead_code)]
    pub struct NoPdfSupport;

    fn no_pdf() -> BackendError {
        BackendError::OpenError(
            "PDF support not compiled in (enable the `pdf` feature of biodata-ingest)".into(),
        )
    }

    impl PdfBackend for NoPdfSupport {
        fn page_count(&self, _path: &Path) -> Result<usize, BackendError> {
            Err(no_pdf())
        }
        fn sample_layout(&self, _path: &Path, _max_pages: usize) -> Result<Vec<PageLayout>, BackendError> {
            Err(no_pdf())
        }
        fn extract_pages(&self, _path: &Path) -> Result<Vec<String>, BackendError> {
            Err(no_pdf())
        }
        fn render_pages(&self, _path: &Path, _dpi: u32, _out_dir: &Path) -> Result<Vec<PathBuf>, BackendError> {
            Err(no_pdf())
        }
    }

    #[allow(dead_code)]
    pub struct NoOcrSupport;

    impl OcrEngine for NoOcrSupport {
        fn name(&self) -> &str {
            "none"
        }
        fn probe(&self) -> Result<(), OcrError> {
            Err(OcrError::Unavailable(
                "OCR support not compiled in (enable the `ocr` feature of biodata-ingest)".into(),
            ))
        }
        fn recognize(&self, _image: &Path, _request: &OcrRequest<'_>) -> Result<String, OcrError> {
            self.probe().map(|_| String::new())
        }
    }
}

/// Process-wide router built from default configuration on first use.
fn default_router() -> &'static DocumentRouter {
    static ROUTER: OnceLock<DocumentRouter> = OnceLock::new();
    ROUTER.get_or_init(|| DocumentRouter::from_config(Config::default()))
}

/// Extract text from a supported document with the default configuration.
///
/// Dispatches on file extension:
/// - `.txt` → direct read
/// - `.pdf` → direct extraction or OCR, by text-layer density
/// - `.png`, `.jpg`, `.jpeg`, `.bmp`, `.tiff` → OCR
///
/// Returns `None` on any failure (logged), `Some("")` for documents without text.
pub fn extract_text(path: &Path) -> Option<String> {
    default_router().extract_text(path)
}

/// [`extract_text`] over many paths; see [`DocumentRouter::extract_batch`].
pub fn extract_batch<P: AsRef<Path>>(paths: &[P]) -> IndexMap<PathBuf, Option<String>> {
    default_router().extract_batch(paths)
}

/// Validate and describe a document with the default configuration.
pub fn classify(path: &Path) -> Result<DocumentRef, IngestError> {
    default_router().classify(path)
}
