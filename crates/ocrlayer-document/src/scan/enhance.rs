// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page preprocessing before OCR: grayscale, light denoise, and adaptive
// binarization of rasterized pages.
//
// None of these steps change image dimensions, so word boxes reported on the
// processed image are valid on the original raster too.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, instrument};

/// Default neighbourhood radius for adaptive binarization.
pub const DEFAULT_BLOCK_RADIUS: u32 = 15;
/// Default offset subtracted from the local mean.
pub const DEFAULT_OFFSET: i32 = 10;
/// Default blur applied before thresholding.
pub const DEFAULT_DENOISE_SIGMA: f32 = 1.0;

/// Cleans up a rasterized page so text stands out for recognition.
pub struct ScanEnhancer {
    image: GrayImage,
}

impl ScanEnhancer {
    /// Start from any image; colour is dropped immediately.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self {
            image: image.to_luma8(),
        }
    }

    /// Gaussian blur to suppress scanner noise.
    pub fn denoise(self, sigma: f32) -> Self {
        if sigma <= 0.0 {
            return self;
        }
        Self {
            image: gaussian_blur_f32(&self.image, sigma),
        }
    }

    /// Apply adaptive thresholding to produce a black-and-white image.
    ///
    /// For each pixel, the threshold is the mean intensity within a
    /// `block_radius` neighbourhood, minus `c`. Pixels darker than the local
    /// threshold become black; others become white.
    pub fn binarize(self, block_radius: u32, c: i32) -> Self {
        let (width, height) = self.image.dimensions();
        let integral = compute_integral_image(&self.image);

        let mut output = GrayImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let local_mean = region_mean(&integral, width, height, x, y, block_radius);
                let threshold = (local_mean as i32 - c).clamp(0, 255) as u8;
                let pixel_val = self.image.get_pixel(x, y).0[0];
                let binary = if pixel_val < threshold { 0u8 } else { 255u8 };
                output.put_pixel(x, y, Luma([binary]));
            }
        }

        Self { image: output }
    }

    pub fn into_dynamic(self) -> DynamicImage {
        DynamicImage::ImageLuma8(self.image)
    }
}

/// The standard OCR preprocessing chain: grayscale, blur, binarize.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn prepare_for_ocr(image: &DynamicImage) -> DynamicImage {
    let prepared = ScanEnhancer::from_dynamic(image)
        .denoise(DEFAULT_DENOISE_SIGMA)
        .binarize(DEFAULT_BLOCK_RADIUS, DEFAULT_OFFSET)
        .into_dynamic();
    debug!("Page preprocessed for OCR");
    prepared
}

/// Summed-area table with a zero row and column prepended.
fn compute_integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

/// Mean pixel value of the square of `radius` around (cx, cy), clamped to the
/// image.
fn region_mean(
    integral: &[u64],
    img_width: u32,
    img_height: u32,
    cx: u32,
    cy: u32,
    radius: u32,
) -> f64 {
    let stride = (img_width + 1) as usize;

    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = ((cx + radius + 1) as usize).min(img_width as usize);
    let y2 = ((cy + radius + 1) as usize).min(img_height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }

    let sum = integral[y2 * stride + x2] as f64
        - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn integral_image_sums_region() {
        let img = GrayImage::from_pixel(4, 3, Luma([10u8]));
        let integral = compute_integral_image(&img);
        assert_eq!(integral[3 * 5 + 4], 120);
        assert!((region_mean(&integral, 4, 3, 1, 1, 1) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn preprocessing_keeps_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(37, 23, Rgb([90, 120, 200])));
        let out = prepare_for_ocr(&img);
        assert_eq!((out.width(), out.height()), (37, 23));
    }

    #[test]
    fn dark_text_on_light_page_becomes_black_on_white() {
        let mut img = GrayImage::from_pixel(60, 60, Luma([220u8]));
        for y in 28..32 {
            for x in 10..50 {
                img.put_pixel(x, y, Luma([30u8]));
            }
        }
        let out = ScanEnhancer::from_dynamic(&DynamicImage::ImageLuma8(img))
            .binarize(DEFAULT_BLOCK_RADIUS, DEFAULT_OFFSET)
            .into_dynamic()
            .to_luma8();

        assert_eq!(out.get_pixel(30, 30).0[0], 0);
        assert_eq!(out.get_pixel(5, 5).0[0], 255);
    }

    #[test]
    fn uniform_page_stays_white() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(20, 20, Luma([200u8])));
        let out = prepare_for_ocr(&img).to_luma8();
        assert!(out.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn zero_sigma_skips_blur() {
        let img = GrayImage::from_fn(8, 8, |x, _| Luma([(x * 30) as u8]));
        let out = ScanEnhancer::from_dynamic(&DynamicImage::ImageLuma8(img.clone()))
            .denoise(0.0)
            .into_dynamic()
            .to_luma8();
        assert_eq!(out, img);
    }
}
