use std::path::{Path, PathBuf};

use mupdf::{Colorspace, Document, ImageFormat, Matrix, Page, Rect, TextBlockType, TextPageFlags};

use biodata_core::{BackendError, PageLayout, PdfBackend};

/// PDF user space is 72 points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate is the sole AGPL island: it isolates the mupdf dependency
/// (AGPL-3.0) so that the text and image code paths do not transitively
/// depend on it.
#[derive(Debug, Clone, Default)]
pub struct MupdfBackend {
    _private: (),
}

impl MupdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&self, path: &Path) -> Result<Document, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;
        Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))
    }
}

fn extraction_err(e: mupdf::Error) -> BackendError {
    BackendError::ExtractionError(e.to_string())
}

fn rect_area(r: &Rect) -> f32 {
    (r.x1 - r.x0).max(0.0) * (r.y1 - r.y0).max(0.0)
}

/// Area of `r` inside `page`.
fn clipped_area(r: &Rect, page: &Rect) -> f32 {
    let clipped = Rect {
        x0: r.x0.max(page.x0),
        y0: r.y0.max(page.y0),
        x1: r.x1.min(page.x1),
        y1: r.y1.min(page.y1),
    };
    rect_area(&clipped)
}

fn page_layout(index: usize, page: &Page) -> Result<PageLayout, BackendError> {
    let bounds = page.bounds().map_err(extraction_err)?;
    let text_page = page
        .to_text_page(TextPageFlags::PRESERVE_IMAGES)
        .map_err(extraction_err)?;

    let mut layout = PageLayout {
        index,
        page_area: rect_area(&bounds),
        ..Default::default()
    };

    for block in text_page.blocks() {
        let area = clipped_area(&block.bounds(), &bounds);
        match block.r#type() {
            TextBlockType::Text => {
                let chars: usize = block
                    .lines()
                    .map(|line| line.chars().filter(|c| c.char().is_some_and(|ch| !ch.is_whitespace())).count())
                    .sum();
                // Blocks holding only whitespace are layout noise, not a text layer.
                if chars > 0 {
                    layout.text_area += area;
                    layout.char_count += chars;
                }
            }
            TextBlockType::Image => layout.image_area += area,
            _ => {}
        }
    }

    Ok(layout)
}

fn page_text(page: &Page) -> Result<String, BackendError> {
    let text_page = page
        .to_text_page(TextPageFlags::empty())
        .map_err(extraction_err)?;

    let mut text = String::new();
    for block in text_page.blocks() {
        for line in block.lines() {
            let line_text: String = line
                .chars()
                .map(|c| c.char().unwrap_or('\u{FFFD}'))
                .collect();
            text.push_str(&line_text);
            text.push('\n');
        }
        text.push('\n');
    }
    Ok(text)
}

impl PdfBackend for MupdfBackend {
    fn page_count(&self, path: &Path) -> Result<usize, BackendError> {
        let document = self.open(path)?;
        let count = document.page_count().map_err(extraction_err)?;
        Ok(count.max(0) as usize)
    }

    fn sample_layout(&self, path: &Path, max_pages: usize) -> Result<Vec<PageLayout>, BackendError> {
        let document = self.open(path)?;
        let count = document.page_count().map_err(extraction_err)?.max(0) as usize;

        let mut layouts = Vec::with_capacity(count.min(max_pages));
        for index in 0..count.min(max_pages) {
            let page = document.load_page(index as i32).map_err(extraction_err)?;
            layouts.push(page_layout(index, &page)?);
        }
        Ok(layouts)
    }

    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        let document = self.open(path)?;

        let mut pages = Vec::new();
        for (index, page_result) in document.pages().map_err(extraction_err)?.enumerate() {
            // A single broken page must not sink the document.
            let text = page_result
                .map_err(extraction_err)
                .and_then(|page| page_text(&page));
            match text {
                Ok(text) => pages.push(text),
                Err(e) => {
                    tracing::warn!(page = index + 1, error = %e, "skipping unreadable PDF page");
                    pages.push(String::new());
                }
            }
        }
        Ok(pages)
    }

    fn render_pages(
        &self,
        path: &Path,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, BackendError> {
        let document = self.open(path)?;
        let scale = dpi.max(1) as f32 / POINTS_PER_INCH;
        let matrix = Matrix::new_scale(scale, scale);
        let colorspace = Colorspace::device_rgb();

        let mut images = Vec::new();
        for (index, page_result) in document.pages().map_err(extraction_err)?.enumerate() {
            let render_err = |e: mupdf::Error| BackendError::RenderError {
                page: index + 1,
                message: e.to_string(),
            };
            let page = page_result.map_err(render_err)?;
            let pixmap = page
                .to_pixmap(&matrix, &colorspace, false, true)
                .map_err(render_err)?;

            let image_path = out_dir.join(format!("page-{:04}.png", index + 1));
            let image_str = image_path.to_str().ok_or_else(|| BackendError::RenderError {
                page: index + 1,
                message: "invalid output path encoding".into(),
            })?;
            pixmap
                .save_as(image_str, ImageFormat::PNG)
                .map_err(render_err)?;
            images.push(image_path);
        }

        tracing::debug!(path = %path.display(), pages = images.len(), dpi, "rendered PDF pages");
        Ok(images)
    }
}
