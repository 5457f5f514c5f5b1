use once_cell::sync::Lazy;
use regex::Regex;

static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Clean extracted text before it leaves the router.
///
/// Normalizes line endings to `\n`, drops the byte-order mark and every control
/// character except newline and tab, collapses runs of blank lines, and trims.
pub fn sanitize_text(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let stripped: String = normalized
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !(c.is_control() || c == '\u{FEFF}'))
        .collect();
    EXCESS_NEWLINES
        .replace_all(&stripped, "\n\n")
        .trim()
        .to_string()
}

/// Decode file bytes as UTF-8, falling back to Latin-1.
///
/// Returns the decoded text and whether the fallback was used.
pub fn decode_text(bytes: &[u8]) -> (String, bool) {
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), false),
        // Latin-1 maps every byte to the code point of the same value.
        Err(_) => (bytes.iter().map(|&b| b as char).collect(), true),
    }
}

/// Fraction of non-whitespace characters that are alphanumeric.
///
/// Garbled OCR output is dominated by punctuation and stray symbols, so a low
/// ratio marks low-confidence text. Empty output scores 0.
pub fn ocr_quality_score(text: &str) -> f32 {
    let mut total = 0usize;
    let mut alnum = 0usize;
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if c.is_alphanumeric() {
            alnum += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    alnum as f32 / total as f32
}

/// Join per-page text with `--- Page N ---` markers (1-based), skipping blank pages.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .enumerate()
        .filter_map(|(i, page)| {
            let text = page.as_ref().trim();
            if text.is_empty() {
                None
            } else {
                Some(format!("--- Page {} ---\n{}", i + 1, text))
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
