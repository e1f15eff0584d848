// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ocrlayer-document: Document processing for the OCR text-layer engine.
//
// Maps OCR boxes from pixel space to PDF point space, synthesizes invisible
// text layers, resolves the text-layer font, and composites layers into PDFs.
// Also reads page geometry and scanned page images, wraps images as PDFs, and
// preprocesses pages for recognition.

pub mod font;
pub mod geometry;
pub mod pdf;
pub mod scan;
pub mod textlayer;

// Re-export the primary items so callers can use `ocrlayer_document::PdfReader` etc.
pub use font::{FontResolver, FontSource, HttpFontSource, ResolvedFont};
pub use geometry::{FontSizing, MappedBox, calculate_font_size, map_box_to_pdf};
pub use pdf::{Composition, CompositionStats, Compositor, PdfReader, image_to_pdf};
pub use scan::enhance::{ScanEnhancer, prepare_for_ocr};
pub use textlayer::{build_page_layer, build_text_layer};

#[cfg(feature = "pdfium")]
pub use pdf::PdfiumRenderer;
#[cfg(feature = "ocr")]
pub use scan::ocr::OcrEngine;
