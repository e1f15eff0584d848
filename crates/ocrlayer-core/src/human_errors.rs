// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error is mapped to plain language with a clear suggestion.
// Messages about a specific page are prefixed with "Page N: ".

use crate::error::OcrLayerError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Temporary condition: running the job again may work.
    Transient,
    /// The user must change something (file, settings) first.
    ActionRequired,
    /// Cannot be fixed by retrying: the input itself is unusable.
    Permanent,
}

/// A human-readable error with plain message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether running the same job again could succeed.
    pub retriable: bool,
    pub severity: Severity,
}

impl std::fmt::Display for HumanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.message, self.suggestion)
    }
}

/// Convert an [`OcrLayerError`] into a [`HumanError`].
pub fn humanize_error(err: &OcrLayerError) -> HumanError {
    let mut human = match err {
        // -- Input --
        OcrLayerError::Validation { reasons } => HumanError {
            message: "This file can't be converted.".into(),
            suggestion: reasons.join("\n"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        OcrLayerError::UnsupportedImage { mime, .. } => HumanError {
            message: "This image format isn't supported.".into(),
            suggestion: format!("Save the image as PNG or JPEG and try again. (File type: {mime})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        OcrLayerError::Config(detail) => HumanError {
            message: "The conversion settings are invalid.".into(),
            suggestion: format!("Fix the settings and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Document --
        OcrLayerError::Load { .. } => HumanError {
            message: "The PDF file is damaged or can't be read.".into(),
            suggestion: "Open it in a PDF viewer to check it works, or export it again from the scanner.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        OcrLayerError::Image(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged. Try saving it again as PNG or JPEG.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- Recognition --
        OcrLayerError::Recognition { message, .. } => humanize_recognition(message),

        OcrLayerError::EngineUnavailable(detail) => HumanError {
            message: "The text recognition engine isn't available.".into(),
            suggestion: format!("Check the engine is installed or reachable, then try again. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Composition --
        OcrLayerError::PageOutOfRange { page_count, .. } => HumanError {
            message: "Text was produced for a page that doesn't exist.".into(),
            suggestion: format!("The document has {page_count} pages. Run the conversion again from the start."),
            retriable: true,
            severity: Severity::Transient,
        },

        OcrLayerError::Composition(_) => HumanError {
            message: "The searchable PDF couldn't be written.".into(),
            suggestion: "Try again. If this keeps happening, the original PDF may use features we can't modify.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        OcrLayerError::Font(_) => HumanError {
            message: "The text font couldn't be loaded.".into(),
            suggestion: "Check your internet connection. Non-Latin text may be missing from the result.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Transport / persistence --
        OcrLayerError::Http(detail) => HumanError {
            message: "A network request failed.".into(),
            suggestion: format!("Check your connection and try again. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        OcrLayerError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file couldn't be found.".into(),
                suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "There's no permission to access that file.".into(),
                suggestion: "Check the file permissions, or copy the file to a different location first.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        OcrLayerError::Serialization(_) => HumanError {
            message: "Some data couldn't be read.".into(),
            suggestion: "Check the configuration or report file is valid JSON.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    };

    if let Some(page) = err.page() {
        human.message = format!("Page {page}: {}", human.message);
    }
    human
}

/// Recognition failures carry the engine's own message; pick out the causes
/// the user can act on.
fn humanize_recognition(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("timeout") || lower.contains("timed out") {
        HumanError {
            message: "Text recognition took too long.".into(),
            suggestion: "The page may be very large. Try a lower resolution, or try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("out of memory") {
        HumanError {
            message: "Not enough memory to recognise this page.".into(),
            suggestion: "Make the file smaller (fewer pages or lower resolution) and try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "Text recognition failed.".into(),
            suggestion: format!("Try scanning the page again with clearer, straighter text. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}
