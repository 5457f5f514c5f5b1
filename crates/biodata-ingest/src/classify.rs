//! Precondition checks and document classification.

use std::fs::File;
use std::path::Path;

use biodata_core::{DocumentKind, DocumentRef};

use crate::IngestError;

/// Check the preconditions every document must pass before extraction.
///
/// In order: the path opens as a regular file, its size is within
/// `max_file_size`, and its extension is supported. Returns the kind and size.
pub fn check_preconditions(path: &Path, max_file_size: u64) -> Result<(DocumentKind, u64), IngestError> {
    let metadata = File::open(path)
        .and_then(|f| f.metadata())
        .map_err(|_| IngestError::NotFound(path.to_path_buf()))?;
    if !metadata.is_file() {
        return Err(IngestError::NotFound(path.to_path_buf()));
    }

    let size = metadata.len();
    if size > max_file_size {
        return Err(IngestError::TooLarge {
            size,
            limit: max_file_size,
        });
    }

    let kind = DocumentKind::from_path(path).ok_or_else(|| {
        IngestError::UnsupportedFormat(
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{}", e.to_lowercase()))
                .unwrap_or_else(|| "(no extension)".to_string()),
        )
    })?;

    Ok((kind, size))
}

/// Build a [`DocumentRef`] without a page count.
pub(crate) fn document_ref(path: &Path, kind: DocumentKind, size_bytes: u64) -> DocumentRef {
    DocumentRef {
        path: path.to_path_buf(),
        kind,
        size_bytes,
        page_count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_preconditions(&dir.path().join("nope.txt"), 1024).unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));
    }

    #[test]
    fn directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("folder.txt");
        std::fs::create_dir(&sub).unwrap();
        let err = check_preconditions(&sub, 1024).unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));
    }

    #[test]
    fn size_is_checked_before_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.docx");
        std::fs::write(&path, vec![b'x'; 64]).unwrap();
        let err = check_preconditions(&path, 16).unwrap_err();
        assert!(matches!(err, IngestError::TooLarge { size: 64, limit: 16 }));
    }

    #[test]
    fn size_at_limit_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exact.txt");
        std::fs::write(&path, vec![b'x'; 16]).unwrap();
        assert_eq!(check_preconditions(&path, 16).unwrap(), (DocumentKind::Text, 16));
    }

    #[test]
    fn unsupported_extension_reports_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.DOCX");
        std::fs::write(&path, b"hello").unwrap();
        match check_preconditions(&path, 1024) {
            Err(IngestError::UnsupportedFormat(ext)) => assert_eq!(ext, ".docx"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }
}
