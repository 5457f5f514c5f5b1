use std::io::Write;
use std::path::Path;

use biodata_core::{BiodataRecord, Field};
use owo_colors::OwoColorize;

use crate::pipeline::RunReport;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the text extracted from one document, or why there is none.
pub fn print_text_result(
    w: &mut dyn Write,
    path: &Path,
    text: Option<&str>,
    color: ColorMode,
) -> std::io::Result<()> {
    let name = path.display().to_string();
    if color.enabled() {
        writeln!(w, "{}", format!("==> {name} <==").bold().cyan())?;
    } else {
        writeln!(w, "==> {name} <==")?;
    }

    match text {
        Some(t) if !t.is_empty() => writeln!(w, "{t}")?,
        Some(_) => {
            if color.enabled() {
                writeln!(w, "{}", "(no text found)".yellow())?;
            } else {
                writeln!(w, "(no text found)")?;
            }
        }
        None => {
            if color.enabled() {
                writeln!(w, "{}", "EXTRACTION FAILED (see log)".red())?;
            } else {
                writeln!(w, "EXTRACTION FAILED (see log)")?;
            }
        }
    }
    writeln!(w)?;
    Ok(())
}

/// Human-readable listing of a record's fields.
pub fn print_record(
    w: &mut dyn Write,
    index: usize,
    total: usize,
    record: &BiodataRecord,
    color: ColorMode,
) -> std::io::Result<()> {
    if total > 1 {
        if color.enabled() {
            writeln!(w, "{}", format!("[{}/{}]", index + 1, total).bold().yellow())?;
        } else {
            writeln!(w, "[{}/{}]", index + 1, total)?;
        }
    }

    let json = record.to_json();
    for field in Field::ALL {
        let value = match &json[field.key()] {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        };
        let label = format!("{:<16}", field.key());
        match value {
            Some(v) => writeln!(w, "  {label}{v}")?,
            None if color.enabled() => writeln!(w, "  {label}{}", "-".dimmed())?,
            None => writeln!(w, "  {label}-")?,
        }
    }
    writeln!(w)?;
    Ok(())
}

/// Final counts after a directory run.
pub fn print_run_summary(w: &mut dyn Write, report: &RunReport, color: ColorMode) -> std::io::Result<()> {
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", "=== PIPELINE SUMMARY ===".bold())?;
        writeln!(w, "Processed records: {}", report.processed.len().to_string().green())?;
        let failed = report.failed.len().to_string();
        if report.failed.is_empty() {
            writeln!(w, "Failed files:      {failed}")?;
        } else {
            writeln!(w, "Failed files:      {}", failed.red())?;
        }
    } else {
        writeln!(w, "=== PIPELINE SUMMARY ===")?;
        writeln!(w, "Processed records: {}", report.processed.len())?;
        writeln!(w, "Failed files:      {}", report.failed.len())?;
    }

    for failure in &report.failed {
        if color.enabled() {
            writeln!(w, "  {} {}", failure.file.bold(), failure.error.dimmed())?;
        } else {
            writeln!(w, "  {} {}", failure.file, failure.error)?;
        }
    }

    if report.cancelled > 0 {
        let msg = format!("Cancelled before start: {}", report.cancelled);
        if color.enabled() {
            writeln!(w, "{}", msg.yellow())?;
        } else {
            writeln!(w, "{msg}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FailedFile;

    fn render(f: impl FnOnce(&mut dyn Write) -> std::io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn text_result_variants() {
        let path = Path::new("a.txt");
        let ok = render(|w| print_text_result(w, path, Some("hello"), ColorMode(false)));
        assert!(ok.starts_with("==> a.txt <==\nhello\n"));
        let empty = render(|w| print_text_result(w, path, Some(""), ColorMode(false)));
        assert!(empty.contains("(no text found)"));
        let failed = render(|w| print_text_result(w, path, None, ColorMode(false)));
        assert!(failed.contains("EXTRACTION FAILED"));
    }

    #[test]
    fn record_lists_every_field() {
        let record = BiodataRecord {
            full_name: Some("Asha Patel".into()),
            age: Some(28),
            ..Default::default()
        };
        let out = render(|w| print_record(w, 0, 1, &record, ColorMode(false)));
        assert_eq!(out.lines().filter(|l| !l.is_empty()).count(), 11);
        assert!(out.contains("full_name       Asha Patel"));
        assert!(out.contains("age             28"));
        assert!(out.contains("caste           -"));
    }

    #[test]
    fn summary_lists_failures() {
        let report = RunReport {
            failed: vec![FailedFile {
                file: "scan.png".into(),
                error: "OCR error: tesseract not found".into(),
            }],
            cancelled: 3,
            ..Default::default()
        };
        let out = render(|w| print_run_summary(w, &report, ColorMode(false)));
        assert!(out.contains("Processed records: 0"));
        assert!(out.contains("Failed files:      1"));
        assert!(out.contains("scan.png OCR error"));
        assert!(out.contains("Cancelled before start: 3"));
    }
}
