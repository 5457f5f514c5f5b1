use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use biodata_core::config_file::{self, ConfigFile};
use biodata_core::{Config, ProviderKind};

const MIB: u64 = 1024 * 1024;

/// Resolve configuration: CLI flags > env vars > config file > defaults.
pub fn resolve(config_path: Option<&Path>, provider: Option<&str>) -> anyhow::Result<Config> {
    let file = match config_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            config_file::load_from_path(path)
                .with_context(|| format!("Cannot parse config file {}", path.display()))?
        }
        None => config_file::load_config(),
    };
    resolve_with(&file, provider, |name| std::env::var(name).ok())
}

pub fn resolve_with(
    file: &ConfigFile,
    provider: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Config> {
    let mut config = apply_env(file.apply(Config::default()), &env);

    if let Some(name) = provider {
        config.llm.provider = name
            .parse::<ProviderKind>()
            .map_err(|e| anyhow::anyhow!("--provider: {e}"))?;
    }

    // The provider may have changed after the file was applied.
    config.api_key = file.api_key_for(config.llm.provider);

    tracing::debug!(config = ?config, "Resolved configuration");
    Ok(config)
}

fn parse_env<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = env(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}

fn apply_env(mut config: Config, env: &impl Fn(&str) -> Option<String>) -> Config {
    if let Some(mb) = parse_env::<u64>(env, "BIODATA_MAX_FILE_SIZE_MB") {
        config.max_file_size = mb.saturating_mul(MIB);
    }
    if let Some(lang) = env("BIODATA_OCR_LANG").filter(|v| !v.trim().is_empty()) {
        config.ocr.language = lang.trim().to_string();
    }
    if let Some(secs) = parse_env::<u64>(env, "BIODATA_OCR_TIMEOUT") {
        config.ocr.timeout = Duration::from_secs(secs);
    }
    if let Some(model) = env("BIODATA_LLM_MODEL").filter(|v| !v.trim().is_empty()) {
        config.llm.model = model.trim().to_string();
    }
    if let Some(provider) = parse_env::<ProviderKind>(env, "BIODATA_LLM_PROVIDER") {
        config.llm.provider = provider;
    }
    if let Some(url) = env("BIODATA_LLM_BASE_URL").filter(|v| !v.trim().is_empty()) {
        config.llm.base_url = Some(url.trim().to_string());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| pairs.iter().find(|(k, _)| *k == name).map(|(_, v)| v.to_string())
    }

    fn file(toml_str: &str) -> ConfigFile {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let config = resolve_with(&ConfigFile::default(), None, |_| None).unwrap();
        assert_eq!(config.max_file_size, biodata_core::DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.llm.provider, ProviderKind::OpenAi);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn env_overrides_file() {
        let file = file("[ocr]\nlanguage = \"hin\"\ntimeout_secs = 10\n[limits]\nmax_file_size_mb = 5\n");
        let config = resolve_with(
            &file,
            None,
            env_of(&[("BIODATA_OCR_LANG", "eng+hin"), ("BIODATA_OCR_TIMEOUT", "oops")]),
        )
        .unwrap();
        assert_eq!(config.ocr.language, "eng+hin");
        assert_eq!(config.ocr.timeout, Duration::from_secs(10));
        assert_eq!(config.max_file_size, 5 * MIB);
    }

    #[test]
    fn flag_overrides_env_and_picks_matching_key() {
        let file = file("[api_keys]\nopenai_key = \"sk-file\"\nanthropic_key = \"sk-ant-file\"\n");
        let config = resolve_with(
            &file,
            Some("anthropic"),
            env_of(&[("BIODATA_LLM_PROVIDER", "openai")]),
        )
        .unwrap();
        assert_eq!(config.llm.provider, ProviderKind::Anthropic);
        assert_eq!(config.api_key.as_deref(), Some("sk-ant-file"));
    }

    #[test]
    fn unknown_provider_flag_is_an_error() {
        assert!(resolve_with(&ConfigFile::default(), Some("palm"), |_| None).is_err());
    }
}
