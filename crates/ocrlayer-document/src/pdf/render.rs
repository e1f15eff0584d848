// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Full page rendering through pdfium (Chromium's PDF library).
//
// Renders vector, mixed and scanned pages alike, whatever the image encoding
// (CCITT, JBIG2, JPEG 2000). Requires the pdfium dynamic library at runtime.
//
// Rasters are returned in the page's unrotated user space, matching
// `PdfReader::page_geometry` and the space the text layer is drawn in.

use std::path::Path;

use image::{DynamicImage, RgbaImage, imageops::FilterType};
use ocrlayer_core::error::{OcrLayerError, Result};
use pdfium_render::prelude::*;
use tracing::{debug, info, instrument};

/// A bound pdfium library that renders pages of in-memory PDFs.
///
/// Binding happens once; the instance is shared across rendering threads.
pub struct PdfiumRenderer {
    pdfium: Pdfium,
}

impl PdfiumRenderer {
    /// Locate the pdfium library in `library_dir`, or next to the executable,
    /// the working directory and the system library paths when `None`.
    ///
    /// Fails with a `Config` error when the library cannot be bound.
    pub fn new(library_dir: Option<&Path>) -> Result<Self> {
        let pdfium = bind(library_dir)?;
        info!(library_dir = ?library_dir, "pdfium bound");
        Ok(Self { pdfium })
    }

    /// Render `page` (1-based) of `pdf` to `width` x `height` pixels.
    ///
    /// `rotation` is the page's clockwise display rotation; pdfium renders the
    /// page as displayed and the raster is turned back into user space.
    #[instrument(skip(self, pdf), fields(bytes_len = pdf.len()))]
    pub fn render_page(
        &self,
        pdf: &[u8],
        page: u32,
        width: u32,
        height: u32,
        rotation: u32,
    ) -> Result<DynamicImage> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|err| OcrLayerError::load(format!("pdfium could not open the document: {err}")))?;

        let index = page
            .checked_sub(1)
            .and_then(|index| u16::try_from(index).ok())
            .ok_or_else(|| OcrLayerError::load_page(page, "page index out of range for pdfium"))?;
        let pdf_page = document
            .pages()
            .get(index)
            .map_err(|err| OcrLayerError::load_page(page, format!("pdfium could not open page: {err}")))?;

        let quarter_turn = rotation == 90 || rotation == 270;
        let (target_width, target_height) = if quarter_turn {
            (height, width)
        } else {
            (width, height)
        };
        let config = PdfRenderConfig::new()
            .set_target_width(target_width as i32)
            .set_target_height(target_height as i32);

        let bitmap = pdf_page
            .render_with_config(&config)
            .map_err(|err| OcrLayerError::load_page(page, format!("pdfium render failed: {err}")))?;
        let (rendered_width, rendered_height) = (bitmap.width() as u32, bitmap.height() as u32);
        let rendered = RgbaImage::from_raw(rendered_width, rendered_height, bitmap.as_rgba_bytes().to_vec())
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| OcrLayerError::load_page(page, "pdfium returned a malformed bitmap"))?;

        let upright = match rotation {
            90 => rendered.rotate270(),
            180 => rendered.rotate180(),
            270 => rendered.rotate90(),
            _ => rendered,
        };
        debug!(
            page,
            rotation,
            rendered_width,
            rendered_height,
            width,
            height,
            "Page rendered"
        );

        if upright.width() == width && upright.height() == height {
            return Ok(upright);
        }
        Ok(upright.resize_exact(width, height, FilterType::Triangle))
    }
}

fn bind(library_dir: Option<&Path>) -> Result<Pdfium> {
    let unavailable =
        |err: PdfiumError| OcrLayerError::Config(format!("pdfium library unavailable: {err}"));

    if let Some(dir) = library_dir {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            .map_err(unavailable)?;
        return Ok(Pdfium::new(bindings));
    }

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(Path::to_path_buf));
    if let Some(dir) = exe_dir {
        if let Ok(bindings) = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir)) {
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(unavailable)?;
    Ok(Pdfium::new(bindings))
}
