use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Config, ProviderKind};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api_keys: Option<ApiKeysConfig>,
    pub limits: Option<LimitsConfig>,
    pub ocr: Option<OcrConfig>,
    pub pdf: Option<PdfConfig>,
    pub llm: Option<LlmConfig>,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    pub openai_key: Option<String>,
    pub anthropic_key: Option<String>,
}

impl std::fmt::Debug for ApiKeysConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeysConfig")
            .field("openai_key", &self.openai_key.as_ref().map(|_| "***"))
            .field("anthropic_key", &self.anthropic_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ApiKeysConfig {
    /// The key stored for `provider`, if any.
    pub fn for_provider(&self, provider: ProviderKind) -> Option<String> {
        match provider {
            ProviderKind::OpenAi => self.openai_key.clone(),
            ProviderKind::Anthropic => self.anthropic_key.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_file_size_mb: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrConfig {
    pub language: Option<String>,
    pub timeout_secs: Option<u64>,
    pub quality_threshold: Option<f32>,
    pub dpi: Option<u32>,
    pub tesseract_cmd: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfConfig {
    pub sample_pages: Option<usize>,
    pub min_text_coverage: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
}

/// Platform config directory path: `<config_dir>/biodata/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("biodata").join("config.toml"))
}

/// Load config by cascading CWD `.biodata.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".biodata.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// Overlay value if set, base value otherwise.
fn pick<S, T>(base: &Option<S>, overlay: &Option<S>, get: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&get)
        .or_else(|| base.as_ref().and_then(&get))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (b, o) = (&base, &overlay);
    ConfigFile {
        api_keys: Some(ApiKeysConfig {
            openai_key: pick(&b.api_keys, &o.api_keys, |a| a.openai_key.clone()),
            anthropic_key: pick(&b.api_keys, &o.api_keys, |a| a.anthropic_key.clone()),
        }),
        limits: Some(LimitsConfig {
            max_file_size_mb: pick(&b.limits, &o.limits, |l| l.max_file_size_mb),
        }),
        ocr: Some(OcrConfig {
            language: pick(&b.ocr, &o.ocr, |c| c.language.clone()),
            timeout_secs: pick(&b.ocr, &o.ocr, |c| c.timeout_secs),
            quality_threshold: pick(&b.ocr, &o.ocr, |c| c.quality_threshold),
            dpi: pick(&b.ocr, &o.ocr, |c| c.dpi),
            tesseract_cmd: pick(&b.ocr, &o.ocr, |c| c.tesseract_cmd.clone()),
        }),
        pdf: Some(PdfConfig {
            sample_pages: pick(&b.pdf, &o.pdf, |p| p.sample_pages),
            min_text_coverage: pick(&b.pdf, &o.pdf, |p| p.min_text_coverage),
        }),
        llm: Some(LlmConfig {
            provider: pick(&b.llm, &o.llm, |l| l.provider.clone()),
            model: pick(&b.llm, &o.llm, |l| l.model.clone()),
            base_url: pick(&b.llm, &o.llm, |l| l.base_url.clone()),
            temperature: pick(&b.llm, &o.llm, |l| l.temperature),
            top_p: pick(&b.llm, &o.llm, |l| l.top_p),
            max_tokens: pick(&b.llm, &o.llm, |l| l.max_tokens),
            timeout_secs: pick(&b.llm, &o.llm, |l| l.timeout_secs),
            chunk_size: pick(&b.llm, &o.llm, |l| l.chunk_size),
            chunk_overlap: pick(&b.llm, &o.llm, |l| l.chunk_overlap),
        }),
    }
}

impl ConfigFile {
    /// Key from `[api_keys]` for `provider`.
    pub fn api_key_for(&self, provider: ProviderKind) -> Option<String> {
        self.api_keys.as_ref().and_then(|k| k.for_provider(provider))
    }

    /// Apply the file's values on top of `config`. Unset fields keep the
    /// incoming value.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(mb) = self.limits.as_ref().and_then(|l| l.max_file_size_mb) {
            config.max_file_size = mb.saturating_mul(1024 * 1024);
        }

        if let Some(ocr) = &self.ocr {
            if let Some(lang) = &ocr.language {
                config.ocr.language = lang.clone();
            }
            if let Some(secs) = ocr.timeout_secs {
                config.ocr.timeout = Duration::from_secs(secs);
            }
            if let Some(t) = ocr.quality_threshold {
                config.ocr.quality_threshold = t.clamp(0.0, 1.0);
            }
            if let Some(dpi) = ocr.dpi {
                config.ocr.dpi = dpi;
            }
            if let Some(cmd) = &ocr.tesseract_cmd {
                config.ocr.tesseract_cmd = Some(PathBuf::from(cmd));
            }
        }

        if let Some(pdf) = &self.pdf {
            if let Some(n) = pdf.sample_pages {
                config.pdf.sample_pages = n.max(1);
            }
            if let Some(c) = pdf.min_text_coverage {
                config.pdf.min_text_coverage = c.clamp(0.0, 1.0);
            }
        }

        if let Some(llm) = &self.llm {
            if let Some(provider) = &llm.provider {
                match provider.parse::<ProviderKind>() {
                    Ok(kind) => config.llm.provider = kind,
                    Err(e) => tracing::warn!(error = %e, "ignoring llm.provider from config file"),
                }
            }
            if let Some(model) = &llm.model {
                config.llm.model = model.clone();
            }
            if let Some(url) = &llm.base_url {
                config.llm.base_url = Some(url.clone());
            }
            if let Some(t) = llm.temperature {
                config.llm.temperature = t;
            }
            if let Some(p) = llm.top_p {
                config.llm.top_p = p;
            }
            if let Some(n) = llm.max_tokens {
                config.llm.max_tokens = n;
            }
            if let Some(secs) = llm.timeout_secs {
                config.llm.timeout = Duration::from_secs(secs);
            }
            if let Some(n) = llm.chunk_size {
                config.llm.chunk_size = n.max(1);
            }
            if let Some(n) = llm.chunk_overlap {
                config.llm.chunk_overlap = n;
            }
        }

        // Key choice follows the (possibly just updated) provider.
        if let Some(key) = self.api_key_for(config.llm.provider) {
            config.api_key = Some(key);
        }

        config
    }
}
