// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: wraps a single raster image as a one-page PDF using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use image::ImageFormat;
use ocrlayer_core::DocumentType;
use ocrlayer_core::error::{OcrLayerError, Result};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

/// Image MIME types that can be wrapped as a PDF page.
pub const IMAGE_TO_PDF_MIME_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// Points per millimetre.
const PT_PER_MM: f32 = 72.0 / 25.4;

/// Create a one-page PDF holding `image_bytes`, sized so one pixel is one point.
///
/// Only JPEG and PNG are accepted. Anything else, TIFF included, fails before
/// the image is decoded.
#[instrument(skip(image_bytes), fields(bytes_len = image_bytes.len()))]
pub fn image_to_pdf(image_bytes: &[u8], mime_type: &str) -> Result<Vec<u8>> {
    let format = match DocumentType::from_mime(mime_type) {
        Some(DocumentType::Jpeg) => ImageFormat::Jpeg,
        Some(DocumentType::Png) => ImageFormat::Png,
        Some(DocumentType::Tiff) => {
            return Err(OcrLayerError::UnsupportedImage {
                mime: mime_type.to_string(),
                hint: Some(
                    "TIFF images cannot be embedded directly; convert to PNG or JPEG first".into(),
                ),
            });
        }
        _ => {
            return Err(OcrLayerError::UnsupportedImage {
                mime: mime_type.to_string(),
                hint: None,
            });
        }
    };

    // Decode the image to get its dimensions and pixel data.
    let dynamic_image = image::load_from_memory_with_format(image_bytes, format)
        .map_err(|err| OcrLayerError::Image(format!("failed to decode image for PDF: {err}")))?;

    let img_width = dynamic_image.width() as usize;
    let img_height = dynamic_image.height() as usize;
    info!(width = img_width, height = img_height, mime_type, "Wrapping image as PDF page");

    // Convert to RGB8 for printpdf.
    let rgb_image = dynamic_image.to_rgb8();
    let raw = RawImage {
        pixels: RawImageData::U8(rgb_image.into_raw()),
        width: img_width,
        height: img_height,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    };

    let mut doc = PdfDocument::new("Scanned image");
    let xobject_id = doc.add_image(&raw);

    // 1 px = 1 pt: at 72 dpi printpdf places the image at its pixel size.
    let page_w = Mm(img_width as f32 / PT_PER_MM);
    let page_h = Mm(img_height as f32 / PT_PER_MM);

    let ops = vec![Op::UseXobject {
        id: xobject_id,
        transform: XObjectTransform {
            translate_x: Some(Pt(0.0)),
            translate_y: Some(Pt(0.0)),
            scale_x: None,
            scale_y: None,
            dpi: Some(72.0),
            rotate: None,
        },
    }];

    doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        warn!(count = warnings.len(), "printpdf reported warnings while saving");
    }

    debug!(output_bytes = output.len(), "Image PDF created");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn encoded(format: ImageFormat) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 32, Rgb([200, 200, 200])));
        let mut out = std::io::Cursor::new(Vec::new());
        image.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn png_becomes_single_page_pdf() {
        let pdf = image_to_pdf(&encoded(ImageFormat::Png), "image/png").unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        let doc = lopdf::Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn jpeg_is_accepted() {
        let pdf = image_to_pdf(&encoded(ImageFormat::Jpeg), "image/jpeg").unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn tiff_is_rejected_with_hint() {
        let err = image_to_pdf(b"II*\0", "image/tiff").unwrap_err();
        match &err {
            OcrLayerError::UnsupportedImage { hint, .. } => {
                assert!(hint.as_deref().unwrap_or_default().contains("TIFF"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("TIFF"));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(matches!(
            image_to_pdf(b"GIF89a", "image/gif"),
            Err(OcrLayerError::UnsupportedImage { .. })
        ));
        assert!(matches!(
            image_to_pdf(b"%PDF-1.7", "application/pdf"),
            Err(OcrLayerError::UnsupportedImage { .. })
        ));
    }

    #[test]
    fn corrupt_png_is_an_image_error() {
        assert!(matches!(
            image_to_pdf(b"\x89PNG\r\n\x1a\nbroken", "image/png"),
            Err(OcrLayerError::Image(_))
        ));
    }
}
