//! Concrete [`CompletionProvider`] implementations and the factory that picks one.

pub mod anthropic;
pub mod mock;
pub mod openai;

use std::sync::Arc;

use biodata_core::{LlmSettings, ProviderKind};

use crate::credentials::{Credentials, env_vars};
use crate::provider::{CompletionError, CompletionProvider};

pub use anthropic::AnthropicProvider;
pub use mock::MockProvider;
pub use openai::OpenAiProvider;

/// Build the provider named in `settings`.
///
/// OpenAI-compatible servers reached through a custom `base_url` may run
/// without a key; every other combination requires one.
pub fn from_config(
    settings: &LlmSettings,
    credentials: Option<Credentials>,
) -> Result<Arc<dyn CompletionProvider>, CompletionError> {
    let key = credentials.map(|c| c.api_key().to_string());
    let missing = || {
        CompletionError::MissingCredentials(format!(
            "no API key for {} (set {})",
            settings.provider.as_str(),
            env_vars(settings.provider).join(" or ")
        ))
    };

    match settings.provider {
        ProviderKind::OpenAi => {
            if key.is_none() && settings.base_url.is_none() {
                return Err(missing());
            }
            let mut provider = OpenAiProvider::new(key, settings.timeout)?;
            if let Some(url) = &settings.base_url {
                provider = provider.with_base_url(url.as_str());
            }
            Ok(Arc::new(provider))
        }
        ProviderKind::Anthropic => {
            let key = key.ok_or_else(missing)?;
            let mut provider = AnthropicProvider::new(key, settings.timeout)?;
            if let Some(url) = &settings.base_url {
                provider = provider.with_base_url(url.as_str());
            }
            Ok(Arc::new(provider))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(key: &str) -> Option<Credentials> {
        Credentials::resolve_with(Some(key), ProviderKind::OpenAi, None, |_| None)
    }

    #[test]
    fn openai_without_key_is_rejected() {
        let err = from_config(&LlmSettings::default(), None).err().unwrap();
        assert!(matches!(err, CompletionError::MissingCredentials(msg) if msg.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn local_server_needs_no_key() {
        let settings = LlmSettings {
            base_url: Some("http://localhost:11434/v1".into()),
            ..Default::default()
        };
        let provider = from_config(&settings, None).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn anthropic_always_needs_key() {
        let settings = LlmSettings {
            provider: ProviderKind::Anthropic,
            base_url: Some("http://localhost:9000".into()),
            ..Default::default()
        };
        assert!(from_config(&settings, None).is_err());
        let provider = from_config(&settings, creds("sk-ant")).unwrap();
        assert_eq!(provider.name(), "anthropic");
    }
}
