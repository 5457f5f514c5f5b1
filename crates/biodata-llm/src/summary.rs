//! First-person "About Yourself" summaries written from an extracted profile.

use std::sync::Arc;
use std::time::Duration;

use biodata_core::{BiodataRecord, LlmSettings};

use crate::provider::{CompletionError, CompletionProvider, CompletionRequest};

pub const SUMMARY_TEMPERATURE: f32 = 0.5;
pub const SUMMARY_MAX_TOKENS: u32 = 500;

const SYSTEM_PROMPT: &str = "You are a matrimonial profile writer. Write a natural, professional \
summary of a person's profile from the information provided. Write in the first person and \
highlight key characteristics, family background, education, occupation and other relevant \
personal details. Keep it concise: at most four short paragraphs, in a warm and personal tone. \
Never invent details that are not in the information provided.";

pub fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// `Label: value` lines for every non-null field. Empty for the all-null record.
pub fn profile_text(record: &BiodataRecord) -> String {
    let mut lines = Vec::new();
    let mut push = |label: &str, value: Option<String>| {
        if let Some(value) = value {
            lines.push(format!("{label}: {value}"));
        }
    };

    push("Name", record.full_name.clone());
    push("Gender", record.gender.map(|g| format!("{g:?}")));
    push("Date of Birth", record.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()));
    push("Age", record.age.map(|a| a.to_string()));
    push("Height", record.height.clone());
    push("Religion", record.religion.clone());
    push("Caste", record.caste.clone());
    push("Marital Status", record.marital_status.map(|m| m.as_str().to_string()));
    push("Education", record.education.clone());
    push("Occupation", record.profession.clone());
    push("Location", record.location.clone());

    lines.join("\n")
}

pub fn user_prompt(profile_text: &str) -> String {
    format!(
        "Based on this matrimonial profile information, write a summary for the \
\"About Yourself\" section:\n\n{profile_text}\n\n\
Include personal details, family background, education, occupation and anything else \
that helps paint a complete picture of this person."
    )
}

/// Writes profile summaries through a completion provider.
#[derive(Clone)]
pub struct SummaryWriter {
    provider: Arc<dyn CompletionProvider>,
    model: String,
    top_p: f32,
    timeout: Duration,
}

impl std::fmt::Debug for SummaryWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryWriter")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .finish()
    }
}

impl SummaryWriter {
    /// Uses the model, `top_p` and timeout from `settings`; temperature and
    /// token budget are fixed for summaries.
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: &LlmSettings) -> Self {
        Self {
            provider,
            model: settings.model.clone(),
            top_p: settings.top_p,
            timeout: settings.timeout,
        }
    }

    fn request(&self, profile_text: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            prompt: user_prompt(profile_text),
            temperature: SUMMARY_TEMPERATURE,
            top_p: self.top_p,
            max_tokens: SUMMARY_MAX_TOKENS,
        }
    }

    /// `Ok(None)` when the record has nothing to summarize or the model
    /// answers with blank text.
    pub async fn try_summarize(&self, record: &BiodataRecord) -> Result<Option<String>, CompletionError> {
        let text = profile_text(record);
        if text.is_empty() {
            return Ok(None);
        }
        let request = self.request(&text);
        let response = tokio::time::timeout(self.timeout, self.provider.complete(&request))
            .await
            .unwrap_or(Err(CompletionError::Timeout(self.timeout)))?;
        let summary = response.trim();
        Ok((!summary.is_empty()).then(|| summary.to_string()))
    }

    /// [`Self::try_summarize`], logging failures as warnings.
    pub async fn summarize(&self, record: &BiodataRecord) -> Option<String> {
        let name = record.full_name.as_deref().unwrap_or("Unknown");
        match self.try_summarize(record).await {
            Ok(Some(summary)) => {
                tracing::info!(name, chars = summary.chars().count(), "Generated profile summary");
                Some(summary)
            }
            Ok(None) => {
                tracing::warn!(name, "No profile summary generated");
                None
            }
            Err(e) => {
                tracing::warn!(name, error = %e, "Profile summary failed");
                None
            }
        }
    }
}
