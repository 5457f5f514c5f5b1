//! Structured Extractor: maps raw document text onto the fixed biodata schema
//! through a language-model completion.

pub mod credentials;
pub mod extractor;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod records;
pub mod response;
pub mod summary;
pub mod validate;

// Re-export commonly used types
pub use biodata_core::{BiodataRecord, Config, Field};
pub use credentials::{CredentialSource, Credentials};
pub use extractor::{CallStage, ProfileError, ProfileExtractor};
pub use provider::{CompletionError, CompletionFuture, CompletionProvider, CompletionRequest};
pub use summary::SummaryWriter;

fn build_extractor(config: &Config, credentials: Option<&str>, model: Option<&str>) -> Option<ProfileExtractor> {
    match ProfileExtractor::from_config(config, credentials, model) {
        Ok(extractor) => Some(extractor),
        Err(e) => {
            tracing::error!(error = %e, "Cannot build the language-model provider");
            None
        }
    }
}

/// Extract a biodata profile from `text`.
///
/// `credentials` overrides any key from the environment or config file and
/// `model` overrides `config.llm.model`. Always returns all eleven fields;
/// any failure along the way yields the all-null record (logged as an error).
pub async fn extract_profile(
    text: &str,
    credentials: Option<&str>,
    model: Option<&str>,
    config: &Config,
) -> BiodataRecord {
    match build_extractor(config, credentials, model) {
        Some(extractor) => extractor.extract_record(text).await,
        None => BiodataRecord::empty(),
    }
}

/// Like [`extract_profile`], but splits multi-record documents first.
///
/// Never empty: if no record yields a value, one all-null record is returned.
pub async fn extract_profiles(
    text: &str,
    credentials: Option<&str>,
    model: Option<&str>,
    config: &Config,
) -> Vec<BiodataRecord> {
    match build_extractor(config, credentials, model) {
        Some(extractor) => extractor.extract_all(text).await,
        None => vec![BiodataRecord::empty()],
    }
}

/// Write an "About Yourself" summary for an extracted record.
///
/// `None` when the record is all-null or the model call fails (logged as a
/// warning).
pub async fn summarize_profile(
    record: &BiodataRecord,
    credentials: Option<&str>,
    model: Option<&str>,
    config: &Config,
) -> Option<String> {
    let extractor = build_extractor(config, credentials, model)?;
    extractor.summary_writer().summarize(record).await
}
