// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for ocrlayer.
//
// Every failure carries an explicit `ErrorKind` plus its payload (page number,
// reasons, underlying cause). Cancellation is not represented here: a cancelled
// job is a distinct outcome, not an error.

use thiserror::Error;

/// Coarse classification of an [`OcrLayerError`], used to decide how a failure
/// is surfaced and whether the job can continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input file (type, size, configuration). Raised before any work starts.
    Validation,
    /// Corrupt or unreadable document, or a page that cannot be rasterized.
    Load,
    /// The OCR engine failed for a page.
    Recognition,
    /// Building the output document failed.
    Composition,
    /// Filesystem, network transport, or (de)serialization failure.
    Io,
}

/// Top-level error type for all ocrlayer operations.
#[derive(Debug, Error)]
pub enum OcrLayerError {
    // -- Input --
    #[error("invalid input: {}", .reasons.join("; "))]
    Validation { reasons: Vec<String> },

    #[error("unsupported image format: {mime}{}", hint_suffix(.hint))]
    UnsupportedImage { mime: String, hint: Option<String> },

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Document --
    #[error("failed to load document{}: {message}", page_suffix(.page))]
    Load { page: Option<u32>, message: String },

    #[error("image processing failed: {0}")]
    Image(String),

    // -- Recognition --
    #[error("OCR failed for page {page}: {message}")]
    Recognition { page: u32, message: String },

    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    // -- Composition --
    #[error("page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("PDF composition failed: {0}")]
    Composition(String),

    #[error("font resolution failed: {0}")]
    Font(String),

    // -- Transport / persistence --
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn page_suffix(page: &Option<u32>) -> String {
    page.map(|p| format!(" (page {p})")).unwrap_or_default()
}

fn hint_suffix(hint: &Option<String>) -> String {
    hint.as_deref().map(|h| format!(" ({h})")).unwrap_or_default()
}

impl OcrLayerError {
    /// Build a `Validation` error from a single reason.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reasons: vec![reason.into()],
        }
    }

    /// Build a document-level `Load` error.
    pub fn load(message: impl Into<String>) -> Self {
        Self::Load {
            page: None,
            message: message.into(),
        }
    }

    /// Build a `Load` error attributed to a specific (1-based) page.
    pub fn load_page(page: u32, message: impl Into<String>) -> Self {
        Self::Load {
            page: Some(page),
            message: message.into(),
        }
    }

    /// Build a `Recognition` error for a (1-based) page.
    pub fn recognition(page: u32, message: impl Into<String>) -> Self {
        Self::Recognition {
            page,
            message: message.into(),
        }
    }

    /// The explicit kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::UnsupportedImage { .. } | Self::Config(_) => {
                ErrorKind::Validation
            }
            Self::Load { .. } | Self::Image(_) => ErrorKind::Load,
            Self::Recognition { .. } | Self::EngineUnavailable(_) => ErrorKind::Recognition,
            Self::PageOutOfRange { .. } | Self::Composition(_) | Self::Font(_) => {
                ErrorKind::Composition
            }
            Self::Http(_) | Self::Io(_) | Self::Serialization(_) => ErrorKind::Io,
        }
    }

    /// The 1-based page this error relates to, when known.
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Load { page, .. } => *page,
            Self::Recognition { page, .. } | Self::PageOutOfRange { page, .. } => Some(*page),
            _ => None,
        }
    }

    /// Attach page context to an error raised without it.
    ///
    /// Errors that already name a page are returned unchanged.
    pub fn with_page(self, page: u32) -> Self {
        match self {
            Self::Load {
                page: None,
                message,
            } => Self::Load {
                page: Some(page),
                message,
            },
            Self::EngineUnavailable(message) => Self::Recognition { page, message },
            Self::Http(message) => Self::Recognition { page, message },
            other => other,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OcrLayerError>;
