// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document sources: page count, page geometry and page pixels.
//
// The orchestrator reads documents only through these traits. `PdfLoader`
// decodes scan images directly; with the `pdfium` feature, `PdfiumLoader`
// renders any page.

use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use ocrlayer_core::{ConversionConfig, PageGeometry};
use ocrlayer_core::error::{OcrLayerError, Result};
use ocrlayer_document::PdfReader;
#[cfg(feature = "pdfium")]
use ocrlayer_document::PdfiumRenderer;
use tracing::{instrument, warn};

/// A loaded document. Page numbers are 1-based.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    fn page_count(&self) -> u32;

    /// Authoritative page size in points.
    fn page_geometry(&self, page: u32) -> Result<PageGeometry>;

    /// Render `page` to pixels at `dpi`.
    async fn rasterize(&self, page: u32, dpi: u32) -> Result<DynamicImage>;
}

/// Parses document bytes into a [`DocumentSource`]. Fails with a `Load` error
/// on malformed input.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, bytes: &[u8]) -> Result<Arc<dyn DocumentSource>>;
}

/// Loads PDFs with [`PdfReader`]. Pages are rasterized from their embedded
/// scan images, which needs no native library.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    fn load(&self, bytes: &[u8]) -> Result<Arc<dyn DocumentSource>> {
        let reader = PdfReader::from_bytes(bytes)?;
        Ok(Arc::new(PdfSource {
            reader: Arc::new(reader),
        }))
    }
}

/// A PDF opened by [`PdfLoader`].
pub struct PdfSource {
    reader: Arc<PdfReader>,
}

#[async_trait]
impl DocumentSource for PdfSource {
    fn page_count(&self) -> u32 {
        self.reader.page_count()
    }

    fn page_geometry(&self, page: u32) -> Result<PageGeometry> {
        self.reader.page_geometry(page)
    }

    async fn rasterize(&self, page: u32, dpi: u32) -> Result<DynamicImage> {
        let reader = Arc::clone(&self.reader);
        tokio::task::spawn_blocking(move || reader.rasterize_page(page, dpi))
            .await
            .map_err(|err| OcrLayerError::load_page(page, format!("rasterization task failed: {err}")))?
    }
}

/// The loader for this build: pdfium when compiled in and bindable,
/// otherwise [`PdfLoader`].
pub fn default_loader(config: &ConversionConfig) -> Arc<dyn DocumentLoader> {
    #[cfg(feature = "pdfium")]
    {
        match PdfiumRenderer::new(config.pdfium_library_dir.as_deref()) {
            Ok(renderer) => return Arc::new(PdfiumLoader::new(renderer)),
            Err(err) => warn!(%err, "Rasterizing pages from their scan images instead"),
        }
    }
    #[cfg(not(feature = "pdfium"))]
    {
        if config.pdfium_library_dir.is_some() {
            warn!("pdfium_library_dir is ignored: built without the pdfium feature");
        }
    }
    Arc::new(PdfLoader)
}

/// Loads PDFs and renders every page with pdfium. Page count and geometry
/// still come from [`PdfReader`], the same view of the document the
/// compositor writes into.
#[cfg(feature = "pdfium")]
pub struct PdfiumLoader {
    renderer: Arc<PdfiumRenderer>,
}

#[cfg(feature = "pdfium")]
impl PdfiumLoader {
    pub fn new(renderer: PdfiumRenderer) -> Self {
        Self {
            renderer: Arc::new(renderer),
        }
    }
}

#[cfg(feature = "pdfium")]
impl DocumentLoader for PdfiumLoader {
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    fn load(&self, bytes: &[u8]) -> Result<Arc<dyn DocumentSource>> {
        let reader = PdfReader::from_bytes(bytes)?;
        Ok(Arc::new(PdfiumSource {
            reader,
            bytes: Arc::from(bytes),
            renderer: Arc::clone(&self.renderer),
        }))
    }
}

/// A PDF opened by [`PdfiumLoader`].
#[cfg(feature = "pdfium")]
pub struct PdfiumSource {
    reader: PdfReader,
    bytes: Arc<[u8]>,
    renderer: Arc<PdfiumRenderer>,
}

#[cfg(feature = "pdfium")]
#[async_trait]
impl DocumentSource for PdfiumSource {
    fn page_count(&self) -> u32 {
        self.reader.page_count()
    }

    fn page_geometry(&self, page: u32) -> Result<PageGeometry> {
        self.reader.page_geometry(page)
    }

    async fn rasterize(&self, page: u32, dpi: u32) -> Result<DynamicImage> {
        let (width, height) = self.reader.page_geometry(page)?.pixel_size(dpi);
        let rotation = self.reader.page_rotation(page)?;
        let renderer = Arc::clone(&self.renderer);
        let bytes = Arc::clone(&self.bytes);
        tokio::task::spawn_blocking(move || renderer.render_page(&bytes, page, width, height, rotation))
            .await
            .map_err(|err| OcrLayerError::load_page(page, format!("rendering task failed: {err}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use image::{GrayImage, ImageFormat, Luma};
    use ocrlayer_document::image_to_pdf;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([200u8])))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn pdf_loader_reads_wrapped_image() {
        let pdf = image_to_pdf(&png(120, 80), "image/png").unwrap();
        let source = PdfLoader.load(&pdf).unwrap();

        assert_eq!(source.page_count(), 1);
        let geometry = source.page_geometry(1).unwrap();
        assert!((geometry.width_pt - 120.0).abs() < 0.5);
        assert!((geometry.height_pt - 80.0).abs() < 0.5);

        let image = source.rasterize(1, 144).await.unwrap();
        assert_eq!((image.width(), image.height()), geometry.pixel_size(144));
    }

    #[tokio::test]
    async fn default_loader_reads_scanned_pages() {
        let loader = default_loader(&ConversionConfig::default());
        let pdf = image_to_pdf(&png(60, 40), "image/png").unwrap();
        let source = loader.load(&pdf).unwrap();
        let image = source.rasterize(1, 72).await.unwrap();
        assert_eq!((image.width(), image.height()), source.page_geometry(1).unwrap().pixel_size(72));
    }

    #[test]
    fn garbage_is_a_load_error() {
        let err = PdfLoader.load(b"definitely not a pdf").err().unwrap();
        assert!(matches!(err, OcrLayerError::Load { .. }));
    }

    #[cfg(feature = "pdfium")]
    #[tokio::test]
    async fn pdfium_loader_renders_in_page_geometry() {
        let dir = std::env::var_os("PDFIUM_DIR").map(std::path::PathBuf::from);
        let Ok(renderer) = PdfiumRenderer::new(dir.as_deref()) else {
            return;
        };
        let pdf = image_to_pdf(&png(120, 80), "image/png").unwrap();
        let source = PdfiumLoader::new(renderer).load(&pdf).unwrap();

        let geometry = source.page_geometry(1).unwrap();
        let image = source.rasterize(1, 144).await.unwrap();
        assert_eq!((image.width(), image.height()), geometry.pixel_size(144));
    }
}
