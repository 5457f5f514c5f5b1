use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub mod backend;
pub mod config_file;
pub mod record;
pub mod text_utils;

// Re-export for convenience
pub use backend::{BackendError, OcrEngine, OcrError, OcrRequest, PageLayout, PdfBackend};
pub use record::{BiodataRecord, Field, Gender, MaritalStatus};
pub use text_utils::{decode_text, join_pages, ocr_quality_score, sanitize_text};

/// Default ceiling on input file size: 100 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Category a document is routed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Text,
    Pdf,
    Image,
}

impl DocumentKind {
    /// Extensions (lowercase, without dot) accepted for each kind.
    pub const TEXT_EXTENSIONS: &'static [&'static str] = &["txt"];
    pub const PDF_EXTENSIONS: &'static [&'static str] = &["pdf"];
    pub const IMAGE_EXTENSIONS: &'static [&'static str] = &["png", "jpg", "jpeg", "bmp", "tiff"];

    /// Classify by file extension (case-insensitive). `None` means unsupported.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        if Self::TEXT_EXTENSIONS.contains(&ext.as_str()) {
            Some(DocumentKind::Text)
        } else if Self::PDF_EXTENSIONS.contains(&ext.as_str()) {
            Some(DocumentKind::Pdf)
        } else if Self::IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(DocumentKind::Image)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Text => "text",
            DocumentKind::Pdf => "pdf",
            DocumentKind::Image => "image",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if the path has an extension the router can handle.
pub fn is_supported_path(path: &Path) -> bool {
    DocumentKind::from_path(path).is_some()
}

/// A classified input document. Built once per extraction call and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub path: PathBuf,
    pub kind: DocumentKind,
    pub size_bytes: u64,
    /// Only populated for PDFs.
    pub page_count: Option<usize>,
}

/// Which completion API the structured extractor talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// OpenAI chat completions, or any server speaking the same protocol.
    #[default]
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "open-ai" | "openai-compatible" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// OCR settings.
#[derive(Debug, Clone)]
pub struct OcrSettings {
    /// Tesseract language code, e.g. `eng` or `eng+hin`.
    pub language: String,
    /// Wall-clock budget for a whole image or page set.
    pub timeout: Duration,
    /// Output scoring below this is logged as low-confidence (0.0–1.0).
    pub quality_threshold: f32,
    /// Rasterization resolution for scanned PDF pages.
    pub dpi: u32,
    /// Explicit tesseract binary; `None` resolves `tesseract` from `PATH`.
    pub tesseract_cmd: Option<PathBuf>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            timeout: Duration::from_secs(60),
            quality_threshold: 0.3,
            dpi: 300,
            tesseract_cmd: None,
        }
    }
}

/// PDF routing settings.
#[derive(Debug, Clone)]
pub struct PdfSettings {
    /// Number of leading pages sampled for the text-density test.
    pub sample_pages: usize,
    /// Minimum fraction of sampled page area covered by text blocks for a PDF
    /// to be treated as text-based. Inclusive.
    pub min_text_coverage: f32,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            sample_pages: 5,
            min_text_coverage: 0.1,
        }
    }
}

/// Language-model settings for the structured extractor.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub model: String,
    /// Override for the provider's API root (proxies, local OpenAI-compatible servers).
    pub base_url: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Maximum characters of record text sent in one completion.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: "gpt-4o".to_string(),
            base_url: None,
            temperature: 0.1,
            top_p: 0.9,
            max_tokens: 1024,
            timeout: Duration::from_secs(60),
            chunk_size: 3000,
            chunk_overlap: 300,
        }
    }
}

/// Process-wide extraction configuration.
///
/// Built once at startup (defaults, then config file, then environment, then CLI
/// flags) and shared read-only between concurrent extraction calls.
#[derive(Clone)]
pub struct Config {
    pub max_file_size: u64,
    pub ocr: OcrSettings,
    pub pdf: PdfSettings,
    pub llm: LlmSettings,
    /// Credential sourced from the config file. Explicit arguments and
    /// environment variables take precedence over it.
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            ocr: OcrSettings::default(),
            pdf: PdfSettings::default(),
            llm: LlmSettings::default(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("max_file_size", &self.max_file_size)
            .field("ocr", &self.ocr)
            .field("pdf", &self.pdf)
            .field("llm", &self.llm)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}
