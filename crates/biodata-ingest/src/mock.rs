//! Hand-rolled PDF and OCR backends for tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use biodata_core::{BackendError, OcrEngine, OcrError, OcrRequest, PageLayout, PdfBackend};

/// One scripted [`MockOcr`] outcome.
#[derive(Clone, Debug)]
pub enum OcrStep {
    Text(String),
    /// Non-fatal engine error for this image.
    Error(String),
    TimedOut,
}

/// A mock implementing [`OcrEngine`].
///
/// Supports a fixed outcome or a sequence (last one repeated), an optional
/// per-call delay, and records the timeout passed to every call.
pub struct MockOcr {
    available: bool,
    steps: Mutex<Vec<OcrStep>>,
    fallback: OcrStep,
    delay: Option<Duration>,
    call_count: AtomicUsize,
    timeouts: Mutex<Vec<Duration>>,
}

impl MockOcr {
    /// Every call yields `step`.
    pub fn always(step: OcrStep) -> Self {
        Self {
            available: true,
            steps: Mutex::new(Vec::new()),
            fallback: step,
            delay: None,
            call_count: AtomicUsize::new(0),
            timeouts: Mutex::new(Vec::new()),
        }
    }

    /// Calls yield `steps` in order, then repeat the last one.
    pub fn with_sequence(mut steps: Vec<OcrStep>) -> Self {
        steps.reverse();
        let fallback = steps
            .first()
            .cloned()
            .unwrap_or(OcrStep::Text(String::new()));
        Self {
            steps: Mutex::new(steps),
            ..Self::always(fallback)
        }
    }

    /// An engine whose probe fails, as when tesseract is not installed.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::always(OcrStep::Text(String::new()))
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times `recognize()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Timeouts handed to each `recognize()` call, in call order.
    pub fn timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn next_step(&self) -> OcrStep {
        match self.steps.lock() {
            Ok(mut seq) => seq.pop().unwrap_or_else(|| self.fallback.clone()),
            Err(_) => self.fallback.clone(),
        }
    }
}

impl OcrEngine for MockOcr {
    fn name(&self) -> &str {
        "mock-ocr"
    }

    fn probe(&self) -> Result<(), OcrError> {
        if self.available {
            Ok(())
        } else {
            Err(OcrError::Unavailable("mock engine not installed".into()))
        }
    }

    fn recognize(&self, _image: &Path, request: &OcrRequest<'_>) -> Result<String, OcrError> {
        if !self.available {
            return Err(OcrError::Unavailable("mock engine not installed".into()));
        }
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut t) = self.timeouts.lock() {
            t.push(request.timeout);
        }
        if let Some(d) = self.delay {
            std::thread::sleep(d);
        }
        match self.next_step() {
            OcrStep::Text(text) => Ok(text),
            OcrStep::Error(msg) => Err(OcrError::Engine(msg)),
            OcrStep::TimedOut => Err(OcrError::TimedOut(request.timeout)),
        }
    }
}

/// One page of a [`MockPdf`].
#[derive(Clone, Debug)]
pub struct MockPage {
    /// Fraction of the page covered by text blocks.
    pub coverage: f32,
    pub text: String,
}

impl MockPage {
    pub fn text(text: &str) -> Self {
        Self {
            coverage: 0.6,
            text: text.to_string(),
        }
    }

    pub fn scanned() -> Self {
        Self {
            coverage: 0.0,
            text: String::new(),
        }
    }

    pub fn with_coverage(coverage: f32, text: &str) -> Self {
        Self {
            coverage,
            text: text.to_string(),
        }
    }
}

/// Unit page, so a page's text area equals its coverage exactly.
const MOCK_PAGE_AREA: f32 = 1.0;

/// A mock implementing [`PdfBackend`] for an in-memory document.
///
/// `render_pages` writes one small placeholder file per page into the output
/// directory so callers can verify cleanup.
pub struct MockPdf {
    pages: Vec<MockPage>,
    broken: bool,
    extract_calls: AtomicUsize,
    render_calls: AtomicUsize,
    rendered_to: Mutex<Option<PathBuf>>,
}

impl MockPdf {
    pub fn new(pages: Vec<MockPage>) -> Self {
        Self {
            pages,
            broken: false,
            extract_calls: AtomicUsize::new(0),
            render_calls: AtomicUsize::new(0),
            rendered_to: Mutex::new(None),
        }
    }

    /// A backend that fails to open every document.
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn render_calls(&self) -> usize {
        self.render_calls.load(Ordering::SeqCst)
    }

    /// Directory of the most recent `render_pages` call.
    pub fn rendered_to(&self) -> Option<PathBuf> {
        self.rendered_to.lock().ok().and_then(|d| d.clone())
    }

    fn check_open(&self) -> Result<(), BackendError> {
        if self.broken {
            Err(BackendError::OpenError("mock: not a PDF".into()))
        } else {
            Ok(())
        }
    }
}

impl PdfBackend for MockPdf {
    fn page_count(&self, _path: &Path) -> Result<usize, BackendError> {
        self.check_open()?;
        Ok(self.pages.len())
    }

    fn sample_layout(&self, _path: &Path, max_pages: usize) -> Result<Vec<PageLayout>, BackendError> {
        self.check_open()?;
        Ok(self
            .pages
            .iter()
            .take(max_pages)
            .enumerate()
            .map(|(index, page)| PageLayout {
                index,
                page_area: MOCK_PAGE_AREA,
                text_area: MOCK_PAGE_AREA * page.coverage,
                image_area: MOCK_PAGE_AREA * (1.0 - page.coverage),
                char_count: page.text.chars().count(),
            })
            .collect())
    }

    fn extract_pages(&self, _path: &Path) -> Result<Vec<String>, BackendError> {
        self.check_open()?;
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pages.iter().map(|p| p.text.clone()).collect())
    }

    fn render_pages(&self, _path: &Path, _dpi: u32, out_dir: &Path) -> Result<Vec<PathBuf>, BackendError> {
        self.check_open()?;
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut dir) = self.rendered_to.lock() {
            *dir = Some(out_dir.to_path_buf());
        }
        let mut images = Vec::with_capacity(self.pages.len());
        for i in 0..self.pages.len() {
            let image = out_dir.join(format!("page-{:04}.png", i + 1));
            std::fs::write(&image, b"\x89PNG mock")?;
            images.push(image);
        }
        Ok(images)
    }
}
