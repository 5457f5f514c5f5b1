//! OCR over a set of page images under one shared deadline.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use biodata_core::{OcrEngine, OcrError, OcrRequest, OcrSettings, ocr_quality_score};

use crate::IngestError;

/// Recognized text of one page set, in page order.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrPages {
    pub pages: Vec<String>,
    /// Pages the engine rejected; they contribute empty text.
    pub failed_pages: usize,
}

/// Run `engine` over `images` in order.
///
/// The engine is probed once up front. Every page draws from the same
/// `settings.timeout` budget, so the whole set finishes within it. An
/// unavailable engine or an exhausted budget fails the set; any other
/// per-page error drops that page, unless every page fails.
pub fn recognize_pages(
    engine: &dyn OcrEngine,
    images: &[PathBuf],
    settings: &OcrSettings,
) -> Result<OcrPages, IngestError> {
    if images.is_empty() {
        return Err(IngestError::NoPages);
    }

    engine.probe()?;

    let deadline = Instant::now() + settings.timeout;
    let mut pages = Vec::with_capacity(images.len());
    let mut failed_pages = 0;
    let mut last_error = None;

    for (i, image) in images.iter().enumerate() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining == Duration::ZERO {
            return Err(OcrError::TimedOut(settings.timeout).into());
        }

        let request = OcrRequest {
            language: &settings.language,
            timeout: remaining,
        };
        match engine.recognize(image, &request) {
            Ok(text) => pages.push(text),
            Err(OcrError::TimedOut(_)) => {
                // Report the budget for the set, not what was left for this page.
                return Err(OcrError::TimedOut(settings.timeout).into());
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(page = i + 1, engine = engine.name(), error = %e, "OCR failed on page, skipping");
                failed_pages += 1;
                pages.push(String::new());
                last_error = Some(e);
            }
        }
    }

    if failed_pages == images.len() {
        if let Some(e) = last_error {
            return Err(e.into());
        }
    }

    Ok(OcrPages {
        pages,
        failed_pages,
    })
}

/// Log OCR output scoring below the quality threshold. Never fails.
pub fn log_quality(text: &str, settings: &OcrSettings, source: &std::path::Path) {
    if text.trim().is_empty() {
        return;
    }
    let score = ocr_quality_score(text);
    if score < settings.quality_threshold {
        tracing::warn!(
            path = %source.display(),
            score,
            threshold = settings.quality_threshold,
            "low-confidence OCR output"
        );
    } else {
        tracing::debug!(path = %source.display(), score, "OCR quality");
    }
}
