// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanned-page handling: preprocessing for OCR and the optional embedded
// OCR engine.

pub mod enhance;

#[cfg(feature = "ocr")]
pub mod ocr;

pub use enhance::{ScanEnhancer, prepare_for_ocr};

#[cfg(feature = "ocr")]
pub use ocr::OcrEngine;
