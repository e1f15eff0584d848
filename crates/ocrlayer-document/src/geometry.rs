// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pixel-space to PDF-space coordinate mapping.
//
// Rasterized pages have their origin at the top-left with y growing downward.
// PDF user space has its origin at the bottom-left with y growing upward, in
// points. Nothing here clamps or rejects input: degenerate boxes map to
// degenerate rectangles and the caller decides what to do with them.

use ocrlayer_core::BoundingBox;
use serde::{Deserialize, Serialize};

/// Smallest font size ever emitted, in points.
pub const MIN_FONT_SIZE: f64 = 6.0;

/// Font size as a fraction of the mapped box height.
pub const FONT_SCALE: f64 = 0.9;

/// A bounding box after mapping into PDF point space.
///
/// `(x, y)` is the lower-left corner of the box on the page, which is also
/// the draw origin used for the text run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MappedBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Map one pixel-space box onto a PDF page.
///
/// `scale_y = pdf_height / image_height`. The horizontal scale uses the widths
/// when both are given, otherwise it reuses `scale_y`, which is only exact when
/// image and page share an aspect ratio.
pub fn map_box_to_pdf(
    bbox: &BoundingBox,
    image_height: f64,
    pdf_height: f64,
    image_width: Option<f64>,
    pdf_width: Option<f64>,
) -> MappedBox {
    let scale_y = pdf_height / image_height;
    let scale_x = match (image_width, pdf_width) {
        (Some(iw), Some(pw)) => pw / iw,
        _ => scale_y,
    };

    MappedBox {
        x: bbox.x1 * scale_x,
        y: pdf_height - bbox.y2 * scale_y,
        width: (bbox.x2 - bbox.x1) * scale_x,
        height: (bbox.y2 - bbox.y1) * scale_y,
    }
}

/// Font size for a mapped box height using the default sizing rule.
pub fn calculate_font_size(height: f64) -> f64 {
    FontSizing::default().font_size(height)
}

/// Font sizing rule: `max(min_size, height * scale)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSizing {
    pub min_size: f64,
    pub scale: f64,
}

impl Default for FontSizing {
    fn default() -> Self {
        Self {
            min_size: MIN_FONT_SIZE,
            scale: FONT_SCALE,
        }
    }
}

impl FontSizing {
    pub fn new(min_size: f64, scale: f64) -> Self {
        Self { min_size, scale }
    }

    /// Zero, negative, NaN or infinite heights resolve to `min_size`.
    pub fn font_size(&self, height: f64) -> f64 {
        if !height.is_finite() || height <= 0.0 {
            return self.min_size;
        }
        (height * self.scale).max(self.min_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn maps_with_uniform_scale() {
        let bbox = BoundingBox::new(100.0, 200.0, 150.0, 220.0);
        let mapped = map_box_to_pdf(&bbox, 1000.0, 792.0, None, None);

        assert!(approx(mapped.x, 79.2), "x = {}", mapped.x);
        assert!(approx(mapped.y, 617.76), "y = {}", mapped.y);
        assert!(approx(mapped.width, 39.6), "width = {}", mapped.width);
        assert!(approx(mapped.height, 15.84), "height = {}", mapped.height);
    }

    #[test]
    fn explicit_widths_scale_horizontally() {
        // 2550x3300 px at 300 dpi onto Letter.
        let bbox = BoundingBox::new(255.0, 0.0, 510.0, 33.0);
        let mapped = map_box_to_pdf(&bbox, 3300.0, 792.0, Some(2550.0), Some(612.0));
        assert!(approx(mapped.x, 61.2));
        assert!(approx(mapped.width, 61.2));
    }

    #[test]
    fn one_width_alone_falls_back_to_uniform() {
        let bbox = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
        let only_image = map_box_to_pdf(&bbox, 100.0, 50.0, Some(400.0), None);
        let uniform = map_box_to_pdf(&bbox, 100.0, 50.0, None, None);
        assert_eq!(only_image, uniform);
    }

    #[test]
    fn y_axis_is_flipped() {
        let top = BoundingBox::new(0.0, 0.0, 10.0, 0.0);
        assert!(approx(map_box_to_pdf(&top, 1000.0, 792.0, None, None).y, 792.0));

        let bottom = BoundingBox::new(0.0, 990.0, 10.0, 1000.0);
        assert!(approx(map_box_to_pdf(&bottom, 1000.0, 792.0, None, None).y, 0.0));
    }

    #[test]
    fn height_scales_with_page() {
        for (y1, y2) in [(0.0, 1.0), (10.0, 50.0), (400.0, 999.0)] {
            let bbox = BoundingBox::new(0.0, y1, 1.0, y2);
            let mapped = map_box_to_pdf(&bbox, 1000.0, 792.0, None, None);
            assert!(approx(mapped.height, (y2 - y1) * 0.792));
        }
    }

    #[test]
    fn zero_area_box_is_returned() {
        let bbox = BoundingBox::new(50.0, 50.0, 50.0, 50.0);
        let mapped = map_box_to_pdf(&bbox, 100.0, 100.0, None, None);
        assert_eq!(mapped.width, 0.0);
        assert_eq!(mapped.height, 0.0);
    }

    #[test]
    fn out_of_range_box_is_not_clamped() {
        let bbox = BoundingBox::new(0.0, 1100.0, 10.0, 1200.0);
        let mapped = map_box_to_pdf(&bbox, 1000.0, 1000.0, None, None);
        assert!(mapped.y < 0.0);
    }

    #[test]
    fn font_size_examples() {
        assert!(approx(calculate_font_size(20.0), 18.0));
        assert_eq!(calculate_font_size(0.0), MIN_FONT_SIZE);
        assert_eq!(calculate_font_size(-3.0), MIN_FONT_SIZE);
        assert_eq!(calculate_font_size(f64::NAN), MIN_FONT_SIZE);
        assert_eq!(calculate_font_size(2.0), MIN_FONT_SIZE);
    }

    #[test]
    fn font_size_is_monotonic() {
        let mut previous = calculate_font_size(0.0);
        for step in 1..500 {
            let size = calculate_font_size(step as f64 * 0.25);
            assert!(size >= previous);
            previous = size;
        }
    }
}
