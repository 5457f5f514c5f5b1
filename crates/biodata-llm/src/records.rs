//! Record splitting, chunking and chunk-result selection.

use biodata_core::BiodataRecord;
use once_cell::sync::Lazy;
use regex::Regex;

static RECORD_DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"={3,}\s*NEW DATA\s*:\s*\d+\s*={3,}").unwrap());

/// Split a document holding several profiles on `=====NEW DATA : n=====` lines.
///
/// Blank segments are dropped. Text without delimiters is returned as a single record.
pub fn split_records(text: &str) -> Vec<&str> {
    let records: Vec<&str> = RECORD_DELIMITER
        .split(text)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .collect();
    if records.is_empty() && !text.trim().is_empty() {
        return vec![text.trim()];
    }
    records
}

/// Split `text` into windows of at most `size` characters, consecutive windows
/// sharing `overlap` characters. Empty text yields no chunks.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<&str> {
    let size = size.max(1);
    let step = if overlap >= size { size } else { size - overlap };

    // Byte offset of every char boundary, plus the end.
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    bounds.push(text.len());
    let chars = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars {
        let end = (start + size).min(chars);
        chunks.push(&text[bounds[start]..bounds[end]]);
        if end == chars {
            break;
        }
        start += step;
    }
    chunks
}

/// The record with the most non-null fields. Ties go to the earliest.
pub fn pick_most_complete(records: Vec<BiodataRecord>) -> Option<BiodataRecord> {
    let mut best: Option<BiodataRecord> = None;
    for record in records {
        let better = match &best {
            Some(current) => record.filled_count() > current.filled_count(),
            None => true,
        };
        if better {
            best = Some(record);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_delimiters() {
        let text = "=============NEW DATA : 1=============\nName: Asha\n\
                    =============NEW DATA : 2=============\nName: Ravi\n\
                    =============NEW DATA : 3=============\n   \n";
        assert_eq!(split_records(text), vec!["Name: Asha", "Name: Ravi"]);
    }

    #[test]
    fn no_delimiter_means_one_record() {
        assert_eq!(split_records("  Name: Asha\nAge: 28 "), vec!["Name: Asha\nAge: 28"]);
        assert!(split_records("   ").is_empty());
    }

    #[test]
    fn chunks_overlap() {
        let chunks = chunk_text("abcdefghij", 4, 1);
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunk_text("hello", 3000, 300), vec!["hello"]);
        assert!(chunk_text("", 3000, 300).is_empty());
    }

    #[test]
    fn chunking_counts_chars_not_bytes() {
        let chunks = chunk_text("ééééé", 2, 0);
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn overlap_not_smaller_than_size_still_advances() {
        assert_eq!(chunk_text("abcdef", 2, 5), vec!["ab", "cd", "ef"]);
    }

    #[test]
    fn earliest_wins_ties() {
        let a = BiodataRecord {
            age: Some(30),
            ..Default::default()
        };
        let b = BiodataRecord {
            age: Some(31),
            ..Default::default()
        };
        let c = BiodataRecord {
            age: Some(32),
            religion: Some("Jain".into()),
            ..Default::default()
        };
        assert_eq!(pick_most_complete(vec![a.clone(), b.clone()]), Some(a));
        assert_eq!(pick_most_complete(vec![b, c.clone()]), Some(c));
        assert_eq!(pick_most_complete(Vec::new()), None);
    }
}
