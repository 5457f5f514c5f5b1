//! Directory pipeline: document → text → profiles, a bounded number of files at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use biodata_core::{BiodataRecord, is_supported_path};
use biodata_ingest::DocumentRouter;
use biodata_llm::{ProfileExtractor, SummaryWriter};
use futures_util::StreamExt;
use indicatif::ProgressBar;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// One extracted profile and the file it came from.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedRecord {
    pub file: String,
    #[serde(flatten)]
    pub record: BiodataRecord,
    /// Only present when summaries were requested and one was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about_yourself_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub processed: Vec<ProcessedRecord>,
    pub failed: Vec<FailedFile>,
    /// Files never started because the run was cancelled.
    #[serde(skip)]
    pub cancelled: usize,
}

enum Outcome {
    Done(Vec<(BiodataRecord, Option<String>)>),
    Failed(String),
    Cancelled,
}

/// Supported files directly inside `dir`, sorted by name.
pub fn collect_inputs(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Invalid input directory: {}", dir.display());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Cannot read {}", dir.display()))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if is_supported_path(&path) {
            files.push(path);
        } else {
            tracing::info!(path = %path.display(), "Skipping unsupported file");
        }
    }
    files.sort();
    Ok(files)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

async fn process_file(
    path: PathBuf,
    router: Arc<DocumentRouter>,
    extractor: ProfileExtractor,
    summaries: Option<SummaryWriter>,
    cancel: CancellationToken,
) -> Outcome {
    // Units already running finish; only pending ones observe cancellation.
    if cancel.is_cancelled() {
        return Outcome::Cancelled;
    }
    tracing::info!(path = %path.display(), "Processing file");

    let text = {
        let path = path.clone();
        tokio::task::spawn_blocking(move || router.try_extract_text(&path)).await
    };
    let text = match text {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => return Outcome::Failed(e.to_string()),
        Err(e) => return Outcome::Failed(format!("extraction task failed: {e}")),
    };
    if text.trim().is_empty() {
        return Outcome::Failed("No text extracted from document".into());
    }

    let records: Vec<BiodataRecord> = extractor
        .extract_all(&text)
        .await
        .into_iter()
        .filter(|r| !r.is_empty())
        .collect();
    if records.is_empty() {
        return Outcome::Failed("No profile fields extracted".into());
    }

    let mut profiles = Vec::with_capacity(records.len());
    for record in records {
        let summary = match &summaries {
            Some(writer) => writer.summarize(&record).await,
            None => None,
        };
        profiles.push((record, summary));
    }
    Outcome::Done(profiles)
}

/// Run every file through extraction with at most `workers` in flight.
///
/// A failing file is recorded in [`RunReport::failed`] and never stops its
/// siblings. Output order follows input order. With `summaries`, every
/// extracted profile also gets an "About Yourself" summary; a failed summary
/// leaves the profile without one.
pub async fn run(
    files: Vec<PathBuf>,
    router: Arc<DocumentRouter>,
    extractor: ProfileExtractor,
    summaries: Option<SummaryWriter>,
    workers: usize,
    cancel: CancellationToken,
    progress: Option<ProgressBar>,
) -> RunReport {
    let units = files.into_iter().enumerate().map(|(index, path)| {
        let router = Arc::clone(&router);
        let extractor = extractor.clone();
        let summaries = summaries.clone();
        let cancel = cancel.clone();
        let progress = progress.clone();
        async move {
            let outcome = process_file(path.clone(), router, extractor, summaries, cancel).await;
            if let Some(bar) = &progress {
                bar.inc(1);
            }
            (index, path, outcome)
        }
    });

    let mut results: Vec<(usize, PathBuf, Outcome)> = futures_util::stream::iter(units)
        .buffer_unordered(workers.max(1))
        .collect()
        .await;
    results.sort_by_key(|(index, _, _)| *index);

    let mut report = RunReport::default();
    for (_, path, outcome) in results {
        let file = display_name(&path);
        match outcome {
            Outcome::Done(profiles) => {
                tracing::info!(file = %file, records = profiles.len(), "Successfully processed");
                report
                    .processed
                    .extend(profiles.into_iter().map(|(record, about_yourself_summary)| ProcessedRecord {
                        file: file.clone(),
                        record,
                        about_yourself_summary,
                    }));
            }
            Outcome::Failed(error) => {
                tracing::error!(file = %file, error = %error, "Failed to process");
                report.failed.push(FailedFile { file, error });
            }
            Outcome::Cancelled => report.cancelled += 1,
        }
    }

    if let Some(bar) = &progress {
        bar.finish_and_clear();
    }
    tracing::info!(
        processed = report.processed.len(),
        failed = report.failed.len(),
        cancelled = report.cancelled,
        "Pipeline finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use biodata_core::{Config, LlmSettings};
    use biodata_ingest::mock::{MockOcr, MockPdf};
    use biodata_llm::providers::MockProvider;

    fn router() -> Arc<DocumentRouter> {
        Arc::new(DocumentRouter::new(
            Config::default(),
            Box::new(MockPdf::new(Vec::new())),
            Box::new(MockOcr::unavailable()),
        ))
    }

    fn extractor() -> ProfileExtractor {
        let provider = MockProvider::responding(|req| {
            let body = if req.prompt.contains("Asha") {
                r#"{"full_name": "Asha Patel", "age": 28}"#
            } else if req.prompt.contains("Ravi") {
                r#"{"full_name": "Ravi Kumar"}"#
            } else {
                "{}"
            };
            Ok(body.to_string())
        });
        ProfileExtractor::new(Arc::new(provider), LlmSettings::default())
    }

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn collects_supported_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.txt", "x");
        write(dir.path(), "a.pdf", "x");
        write(dir.path(), "notes.docx", "x");
        std::fs::create_dir(dir.path().join("nested.txt")).unwrap();

        let files = collect_inputs(dir.path()).unwrap();
        let names: Vec<String> = files.iter().map(|p| display_name(p)).collect();
        assert_eq!(names, vec!["a.pdf", "b.txt"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(collect_inputs(Path::new("/definitely/not/here")).is_err());
    }

    #[tokio::test]
    async fn failures_do_not_stop_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write(dir.path(), "1.txt", "Name: Asha Patel\nAge: 28"),
            write(dir.path(), "2.txt", ""),
            write(dir.path(), "3.png", "not really an image"),
            write(dir.path(), "4.txt", "Name: Ravi Kumar"),
            write(dir.path(), "5.txt", "Hobbies: chess"),
        ];

        let report = run(files, router(), extractor(), None, 2, CancellationToken::new(), None).await;

        let processed: Vec<(&str, Option<&str>)> = report
            .processed
            .iter()
            .map(|p| (p.file.as_str(), p.record.full_name.as_deref()))
            .collect();
        assert_eq!(
            processed,
            vec![("1.txt", Some("Asha Patel")), ("4.txt", Some("Ravi Kumar"))]
        );

        let failed: Vec<&str> = report.failed.iter().map(|f| f.file.as_str()).collect();
        assert_eq!(failed, vec!["2.txt", "3.png", "5.txt"]);
        assert_eq!(report.failed[0].error, "No text extracted from document");
        assert!(report.failed[1].error.contains("OCR"));
        assert_eq!(report.cancelled, 0);
    }

    #[tokio::test]
    async fn cancelled_run_skips_pending_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write(dir.path(), "1.txt", "Name: Asha Patel"),
            write(dir.path(), "2.txt", "Name: Ravi Kumar"),
        ];
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = run(files, router(), extractor(), None, 4, cancel, None).await;
        assert!(report.processed.is_empty());
        assert!(report.failed.is_empty());
        assert_eq!(report.cancelled, 2);
    }

    #[test]
    fn report_serializes_flat_records() {
        let report = RunReport {
            processed: vec![ProcessedRecord {
                file: "a.txt".into(),
                record: BiodataRecord {
                    age: Some(28),
                    ..Default::default()
                },
                about_yourself_summary: None,
            }],
            failed: vec![FailedFile {
                file: "b.txt".into(),
                error: "boom".into(),
            }],
            cancelled: 0,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["processed"][0]["file"], "a.txt");
        assert_eq!(json["processed"][0]["age"], 28);
        assert!(json["processed"][0]["caste"].is_null());
        assert_eq!(json["failed"][0]["error"], "boom");
        assert!(json.get("cancelled").is_none());
        assert!(json["processed"][0].get("about_yourself_summary").is_none());
    }

    #[tokio::test]
    async fn summaries_attach_to_profiles_and_failures_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write(dir.path(), "1.txt", "Name: Asha Patel\nAge: 28"),
            write(dir.path(), "2.txt", "Name: Ravi Kumar"),
        ];
        let writer = MockProvider::responding(|req| {
            if req.prompt.contains("Asha") {
                Ok("I am Asha, a 28 year old engineer.".to_string())
            } else {
                Err(biodata_llm::CompletionError::Network("connection reset".into()))
            }
        });
        let summaries = SummaryWriter::new(Arc::new(writer), &LlmSettings::default());

        let report = run(files, router(), extractor(), Some(summaries), 2, CancellationToken::new(), None).await;

        assert_eq!(report.processed.len(), 2);
        assert!(report.failed.is_empty());
        assert_eq!(
            report.processed[0].about_yourself_summary.as_deref(),
            Some("I am Asha, a 28 year old engineer.")
        );
        assert_eq!(report.processed[1].record.full_name.as_deref(), Some("Ravi Kumar"));
        assert_eq!(report.processed[1].about_yourself_summary, None);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["processed"][0]["about_yourself_summary"], "I am Asha, a 28 year old engineer.");
        assert_eq!(json["processed"][0]["full_name"], "Asha Patel");
        assert!(json["processed"][1].get("about_yourself_summary").is_none());
    }
}
