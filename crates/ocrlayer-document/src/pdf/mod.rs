// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: reading page structure, wrapping images as pages, and
// compositing text layers.

pub mod compose;
pub mod reader;
#[cfg(feature = "pdfium")]
pub mod render;
pub mod writer;

pub use compose::{Composition, CompositionStats, Compositor, compose_with_font};
pub use reader::PdfReader;
pub use writer::image_to_pdf;

#[cfg(feature = "pdfium")]
pub use render::PdfiumRenderer;
