use std::sync::Arc;
use std::time::Instant;

use biodata_core::{BiodataRecord, Config, LlmSettings};
use thiserror::Error;

use crate::credentials::Credentials;
use crate::prompt::{system_prompt, user_prompt};
use crate::provider::{CompletionError, CompletionProvider, CompletionRequest};
use crate::records::{chunk_text, pick_most_complete, split_records};
use crate::response::parse_response;
use crate::summary::SummaryWriter;
use crate::validate::validate_record;

/// Why a structured extraction produced no record.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("model call failed: {0}")]
    Completion(#[from] CompletionError),
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

/// Progress of a single completion call. Calls are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStage {
    Pending,
    PromptBuilt,
    ResponseReceived,
    CallFailed,
    Validated,
}

impl CallStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStage::Pending => "pending",
            CallStage::PromptBuilt => "prompt-built",
            CallStage::ResponseReceived => "response-received",
            CallStage::CallFailed => "call-failed",
            CallStage::Validated => "validated",
        }
    }
}

impl std::fmt::Display for CallStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured Extractor: text in, [`BiodataRecord`] out.
///
/// Stateless apart from its read-only settings, so one extractor can be
/// shared across concurrent calls.
#[derive(Clone)]
pub struct ProfileExtractor {
    provider: Arc<dyn CompletionProvider>,
    settings: LlmSettings,
}

impl std::fmt::Debug for ProfileExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileExtractor")
            .field("provider", &self.provider.name())
            .field("model", &self.settings.model)
            .finish()
    }
}

impl ProfileExtractor {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: LlmSettings) -> Self {
        Self { provider, settings }
    }

    /// Build the configured provider. `credentials` and `model` override the
    /// environment and `config` respectively.
    pub fn from_config(
        config: &Config,
        credentials: Option<&str>,
        model: Option<&str>,
    ) -> Result<Self, CompletionError> {
        let mut settings = config.llm.clone();
        if let Some(model) = model.map(str::trim).filter(|m| !m.is_empty()) {
            settings.model = model.to_string();
        }
        let creds = Credentials::resolve(credentials, settings.provider, config.api_key.as_deref());
        if let Some(creds) = &creds {
            tracing::debug!(source = ?creds.source(), provider = settings.provider.as_str(), "Resolved API key");
        }
        let provider = crate::providers::from_config(&settings, creds)?;
        Ok(Self::new(provider, settings))
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// A summary writer on the same provider and model.
    pub fn summary_writer(&self) -> SummaryWriter {
        SummaryWriter::new(Arc::clone(&self.provider), &self.settings)
    }

    fn request(&self, text: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.model.clone(),
            system: system_prompt().to_string(),
            prompt: user_prompt(text),
            temperature: self.settings.temperature,
            top_p: self.settings.top_p,
            max_tokens: self.settings.max_tokens,
        }
    }

    /// One completion call over `text`, validated into a record.
    pub async fn try_extract_chunk(&self, text: &str) -> Result<BiodataRecord, ProfileError> {
        let mut stage = CallStage::Pending;
        let start = Instant::now();

        let request = self.request(text);
        stage = advance(stage, CallStage::PromptBuilt);

        let outcome = tokio::time::timeout(self.settings.timeout, self.provider.complete(&request))
            .await
            .unwrap_or(Err(CompletionError::Timeout(self.settings.timeout)));
        let response = match outcome {
            Ok(response) => {
                stage = advance(stage, CallStage::ResponseReceived);
                response
            }
            Err(e) => {
                advance(stage, CallStage::CallFailed);
                return Err(e.into());
            }
        };

        let Some(map) = parse_response(&response) else {
            let preview: String = response.chars().take(120).collect();
            return Err(ProfileError::MalformedResponse(preview));
        };
        let record = validate_record(&map);
        advance(stage, CallStage::Validated);

        tracing::debug!(
            provider = self.provider.name(),
            model = %self.settings.model,
            filled = record.filled_count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Extracted record chunk"
        );
        Ok(record)
    }

    /// Extract one record, chunking long text.
    ///
    /// Empty text yields the all-null record without calling the model. If
    /// every chunk fails, the last error is returned.
    pub async fn try_extract_record(&self, text: &str) -> Result<BiodataRecord, ProfileError> {
        let chunks = chunk_text(text.trim(), self.settings.chunk_size, self.settings.chunk_overlap);
        if chunks.is_empty() {
            tracing::debug!("Empty text, skipping model call");
            return Ok(BiodataRecord::empty());
        }

        let total = chunks.len();
        let mut results = Vec::with_capacity(total);
        let mut last_error = None;
        for (i, chunk) in chunks.into_iter().enumerate() {
            match self.try_extract_chunk(chunk).await {
                Ok(record) => results.push(record),
                Err(e) => {
                    tracing::warn!(chunk = i + 1, total, error = %e, "Chunk extraction failed");
                    last_error = Some(e);
                }
            }
        }

        match (pick_most_complete(results), last_error) {
            (Some(best), _) => Ok(best),
            (None, Some(e)) => Err(e),
            (None, None) => Ok(BiodataRecord::empty()),
        }
    }

    /// [`Self::try_extract_record`], collapsing failures to the all-null record.
    pub async fn extract_record(&self, text: &str) -> BiodataRecord {
        match self.try_extract_record(text).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(error = %e, "Structured extraction failed, returning empty record");
                BiodataRecord::empty()
            }
        }
    }

    /// Extract every record of a multi-record document.
    ///
    /// Records with no non-null field are dropped; if none remain, a single
    /// all-null record is returned.
    pub async fn extract_all(&self, text: &str) -> Vec<BiodataRecord> {
        let segments = split_records(text);
        let total = segments.len();
        let mut records = Vec::new();
        for segment in segments {
            let record = self.extract_record(segment).await;
            if !record.is_empty() {
                records.push(record);
            }
        }
        tracing::info!(segments = total, records = records.len(), "Extracted profiles");
        if records.is_empty() {
            records.push(BiodataRecord::empty());
        }
        records
    }
}

fn advance(from: CallStage, to: CallStage) -> CallStage {
    tracing::trace!(from = %from, to = %to, "Completion call stage");
    to
}
