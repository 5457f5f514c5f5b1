use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use biodata_core::{
    Config, DocumentKind, DocumentRef, OcrEngine, PdfBackend, decode_text, join_pages,
    sanitize_text,
};

use crate::classify::{check_preconditions, document_ref};
use crate::density::{is_text_based, text_coverage};
use crate::ocr::{log_quality, recognize_pages};
use crate::IngestError;

/// How a PDF was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfRoute {
    Direct,
    Ocr,
}

/// Document Classifier & Router.
///
/// Owns the read-only configuration and the two backends. Holds no mutable
/// state, so one router can serve concurrent calls (wrap it in an `Arc`).
pub struct DocumentRouter {
    config: Config,
    pdf: Box<dyn PdfBackend>,
    ocr: Box<dyn OcrEngine>,
}

impl DocumentRouter {
    pub fn new(config: Config, pdf: Box<dyn PdfBackend>, ocr: Box<dyn OcrEngine>) -> Self {
        Self { config, pdf, ocr }
    }

    /// Router with the backends compiled into this build.
    pub fn from_config(config: Config) -> Self {
        let pdf = crate::default_pdf_backend();
        let ocr = crate::default_ocr_engine(&config);
        Self::new(config, pdf, ocr)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validate `path` and describe it. PDFs also get a page count.
    pub fn classify(&self, path: &Path) -> Result<DocumentRef, IngestError> {
        let (kind, size) = check_preconditions(path, self.config.max_file_size)?;
        let mut doc = document_ref(path, kind, size);
        if kind == DocumentKind::Pdf {
            doc.page_count = Some(self.pdf.page_count(path)?);
        }
        Ok(doc)
    }

    /// Decide between direct extraction and OCR for a PDF.
    pub fn route_pdf(&self, path: &Path) -> Result<PdfRoute, IngestError> {
        let layouts = self.pdf.sample_layout(path, self.config.pdf.sample_pages)?;
        let coverage = text_coverage(&layouts);
        let text_based = is_text_based(coverage, self.config.pdf.min_text_coverage);
        tracing::info!(
            path = %path.display(),
            sampled_pages = layouts.len(),
            coverage,
            threshold = self.config.pdf.min_text_coverage,
            text_based,
            "PDF type detected"
        );
        Ok(if text_based {
            PdfRoute::Direct
        } else {
            PdfRoute::Ocr
        })
    }

    /// Extract text, surfacing the reason for any failure.
    ///
    /// `Ok("")` means the document was read but held no recoverable text.
    pub fn try_extract_text(&self, path: &Path) -> Result<String, IngestError> {
        let (kind, _size) = check_preconditions(path, self.config.max_file_size)?;
        tracing::debug!(path = %path.display(), kind = %kind, "routing document");

        let raw = match kind {
            DocumentKind::Text => self.read_text_file(path)?,
            DocumentKind::Pdf => match self.route_pdf(path)? {
                PdfRoute::Direct => {
                    let pages = self.pdf.extract_pages(path)?;
                    join_pages(&pages)
                }
                PdfRoute::Ocr => self.ocr_pdf(path)?,
            },
            DocumentKind::Image => self.ocr_image(path)?,
        };

        Ok(sanitize_text(&raw))
    }

    /// Single-document entry point: text, empty string, or `None` on failure.
    /// Failures are logged, never raised.
    pub fn extract_text(&self, path: &Path) -> Option<String> {
        match self.try_extract_text(path) {
            Ok(text) if text.is_empty() => {
                tracing::warn!(path = %path.display(), "document contains no recoverable text");
                Some(text)
            }
            Ok(text) => {
                tracing::info!(path = %path.display(), chars = text.chars().count(), "extraction succeeded");
                Some(text)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "extraction failed");
                None
            }
        }
    }

    /// Extract every path independently. One entry per distinct path, in
    /// first-seen order; a failure never affects the other entries.
    pub fn extract_batch<P: AsRef<Path>>(&self, paths: &[P]) -> IndexMap<PathBuf, Option<String>> {
        let mut results = IndexMap::with_capacity(paths.len());
        for (i, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            if results.contains_key(path) {
                continue;
            }
            tracing::info!(file = i + 1, total = paths.len(), path = %path.display(), "processing");
            results.insert(path.to_path_buf(), self.extract_text(path));
        }

        let succeeded = results.values().filter(|r| r.is_some()).count();
        tracing::info!(succeeded, total = results.len(), "batch extraction complete");
        results
    }

    fn read_text_file(&self, path: &Path) -> Result<String, IngestError> {
        let bytes = std::fs::read(path)?;
        let (text, fell_back) = decode_text(&bytes);
        if fell_back {
            tracing::warn!(path = %path.display(), "file is not valid UTF-8, decoded as Latin-1");
        }
        Ok(text)
    }

    fn ocr_image(&self, path: &Path) -> Result<String, IngestError> {
        let result = recognize_pages(self.ocr.as_ref(), &[path.to_path_buf()], &self.config.ocr)?;
        let text = result.pages.concat();
        log_quality(&text, &self.config.ocr, path);
        Ok(text)
    }

    fn ocr_pdf(&self, path: &Path) -> Result<String, IngestError> {
        // Page images live only as long as this call.
        let scratch = tempfile::Builder::new().prefix("biodata-ocr-").tempdir()?;
        let images = self.pdf.render_pages(path, self.config.ocr.dpi, scratch.path())?;
        tracing::info!(path = %path.display(), pages = images.len(), "running OCR on scanned PDF");

        let result = recognize_pages(self.ocr.as_ref(), &images, &self.config.ocr)?;
        if result.failed_pages > 0 {
            tracing::warn!(path = %path.display(), failed_pages = result.failed_pages, "some pages could not be recognized");
        }
        let text = join_pages(&result.pages);
        log_quality(&text, &self.config.ocr, path);
        Ok(text)
    }
}
