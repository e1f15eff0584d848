// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input file validation. Runs before any processing starts.

use crate::error::{OcrLayerError, Result};
use crate::types::DocumentType;

/// MIME types accepted as conversion input.
pub const SUPPORTED_MIME_TYPES: [&str; 4] =
    ["application/pdf", "image/jpeg", "image/png", "image/tiff"];

/// Check an input's declared type and size against the accepted set.
///
/// All violations are reported together so the user can fix them in one go.
/// Returns the parsed [`DocumentType`] on success.
pub fn validate_file(mime: &str, size: u64, max_size: u64) -> Result<DocumentType> {
    let mut reasons = Vec::new();

    let doc_type = DocumentType::from_mime(mime);
    if doc_type.is_none() {
        reasons.push(format!(
            "unsupported file type '{mime}'; accepted: PDF, JPEG, PNG, TIFF"
        ));
    }

    if size > max_size {
        reasons.push(format!(
            "file is {} bytes; the limit is {} MiB",
            size,
            max_size / (1024 * 1024)
        ));
    }
    if size == 0 {
        reasons.push("file is empty".to_string());
    }

    match doc_type {
        Some(doc_type) if reasons.is_empty() => Ok(doc_type),
        _ => Err(OcrLayerError::Validation { reasons }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_FILE_SIZE;

    #[test]
    fn accepts_supported_types() {
        for mime in SUPPORTED_MIME_TYPES {
            assert!(validate_file(mime, 1024, DEFAULT_MAX_FILE_SIZE).is_ok(), "{mime}");
        }
    }

    #[test]
    fn tiff_passes_file_validation() {
        assert_eq!(
            validate_file("image/tiff", 10, DEFAULT_MAX_FILE_SIZE).unwrap(),
            DocumentType::Tiff
        );
    }

    #[test]
    fn reports_type_and_size_together() {
        let err = validate_file("image/gif", DEFAULT_MAX_FILE_SIZE + 1, DEFAULT_MAX_FILE_SIZE)
            .unwrap_err();
        match err {
            OcrLayerError::Validation { reasons } => assert_eq!(reasons.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn exactly_at_limit_is_accepted() {
        assert!(
            validate_file("application/pdf", DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_FILE_SIZE).is_ok()
        );
    }

    #[test]
    fn empty_file_rejected() {
        assert!(validate_file("image/png", 0, DEFAULT_MAX_FILE_SIZE).is_err());
    }
}
