// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ocrlayer-pipeline: runs conversion jobs. Loads a document, recognises its
// pages in concurrent batches with one or more OCR engines, and composites
// the resulting text layers into the output PDF.

pub mod engine;
pub mod orchestrator;
pub mod source;
pub mod summary;

pub use engine::{RawRecognition, Recognizer, RemoteEngine, build_recognizers, filter_words};
pub use orchestrator::{ConversionResult, Converter, JobOutcome, PageReport, Progress};
pub use source::{DocumentLoader, DocumentSource, PdfLoader, default_loader};
pub use summary::{AccuracyTracker, EngineSummary};

#[cfg(feature = "ocr")]
pub use engine::EmbeddedEngine;
#[cfg(feature = "pdfium")]
pub use source::{PdfiumLoader, PdfiumSource};
