use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// Errors from a completion call.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// No API key from any source.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// Connection failed before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The provider answered, but not in its documented shape.
    #[error("unexpected response shape: {0}")]
    Parse(String),
}

/// Provider-agnostic completion parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

/// Boxed future returned by [`CompletionProvider::complete`].
pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<String, CompletionError>> + Send + 'a>>;

/// A language-model completion capability.
///
/// Implementations are interchangeable; which one runs is decided by
/// configuration (see [`crate::providers::from_config`]).
pub trait CompletionProvider: Send + Sync {
    /// Human-readable provider name for logs.
    fn name(&self) -> &str;

    /// Send one prompt and return the completion text.
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a>;
}

/// Map a reqwest failure onto [`CompletionError`].
pub(crate) fn transport_error(e: reqwest::Error, timeout: Duration) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout(timeout)
    } else {
        CompletionError::Network(e.to_string())
    }
}

/// Cap error bodies echoed into logs.
pub(crate) fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 500;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "é".repeat(600);
        let cut = truncate_body(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 503);
        assert_eq!(truncate_body("short"), "short");
    }
}
