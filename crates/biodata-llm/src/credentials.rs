//! API key resolution: explicit argument, then environment, then config file.

use biodata_core::ProviderKind;

/// Where a resolved key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Explicit,
    Environment(&'static str),
    ConfigFile,
}

#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    source: CredentialSource,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("source", &self.source)
            .finish()
    }
}

/// Environment variables consulted for each provider, in order.
pub fn env_vars(provider: ProviderKind) -> &'static [&'static str] {
    match provider {
        ProviderKind::OpenAi => &["OPENAI_API_KEY", "LLM_API_KEY"],
        ProviderKind::Anthropic => &["ANTHROPIC_API_KEY"],
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

impl Credentials {
    /// Resolve from the process environment.
    pub fn resolve(explicit: Option<&str>, provider: ProviderKind, config_key: Option<&str>) -> Option<Self> {
        Self::resolve_with(explicit, provider, config_key, |name| std::env::var(name).ok())
    }

    /// Resolve with a custom environment lookup. Blank values count as absent.
    pub fn resolve_with(
        explicit: Option<&str>,
        provider: ProviderKind,
        config_key: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<Self> {
        if let Some(key) = non_empty(explicit) {
            return Some(Self::new(key, CredentialSource::Explicit));
        }
        for &name in env_vars(provider) {
            if let Some(value) = env(name) {
                if let Some(key) = non_empty(Some(value.as_str())) {
                    return Some(Self::new(key, CredentialSource::Environment(name)));
                }
            }
        }
        non_empty(config_key).map(|key| Self::new(key, CredentialSource::ConfigFile))
    }

    fn new(key: &str, source: CredentialSource) -> Self {
        Self {
            api_key: key.to_string(),
            source,
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}
