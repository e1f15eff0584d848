// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text-layer synthesis: one OCR page result in, positioned text runs out.

use ocrlayer_core::{OcrPageResult, TextLayer, TextLayerItem};

use crate::geometry::{FontSizing, map_box_to_pdf};

/// Logical font identity carried by every synthesized item. The concrete font
/// is chosen when the layer is composited.
pub const PLACEHOLDER_FONT_NAME: &str = "HeiseiKakuGo-W5";

/// Build text-layer items for one page using the default font sizing.
///
/// Produces exactly one item per OCR word, in emission order. No filtering
/// happens here; empty text and low confidence are dealt with elsewhere.
pub fn build_text_layer(
    page: &OcrPageResult,
    pdf_page_height: f64,
    pdf_page_width: Option<f64>,
) -> Vec<TextLayerItem> {
    build_text_layer_with(page, pdf_page_height, pdf_page_width, &FontSizing::default())
}

/// [`build_text_layer`] with an explicit sizing rule.
pub fn build_text_layer_with(
    page: &OcrPageResult,
    pdf_page_height: f64,
    pdf_page_width: Option<f64>,
    sizing: &FontSizing,
) -> Vec<TextLayerItem> {
    let image_height = f64::from(page.image_height);
    let image_width = page.image_width.map(f64::from);

    page.items
        .iter()
        .map(|word| {
            let mapped = map_box_to_pdf(
                &word.bbox,
                image_height,
                pdf_page_height,
                image_width,
                pdf_page_width,
            );
            TextLayerItem {
                text: word.text.clone(),
                x: mapped.x,
                y: mapped.y,
                width: mapped.width,
                height: mapped.height,
                font_size: sizing.font_size(mapped.height),
                font_name: PLACEHOLDER_FONT_NAME.to_string(),
                confidence: word.confidence,
            }
        })
        .collect()
}

/// Convenience wrapper producing a page-tagged [`TextLayer`].
pub fn build_page_layer(
    page: &OcrPageResult,
    pdf_page_height: f64,
    pdf_page_width: Option<f64>,
    sizing: &FontSizing,
) -> TextLayer {
    TextLayer {
        page_number: page.page_number,
        items: build_text_layer_with(page, pdf_page_height, pdf_page_width, sizing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocrlayer_core::{BoundingBox, OcrWord};

    fn word(text: &str, bbox: BoundingBox, confidence: f64) -> OcrWord {
        OcrWord {
            text: text.to_string(),
            bbox,
            confidence,
        }
    }

    fn page(items: Vec<OcrWord>) -> OcrPageResult {
        OcrPageResult {
            page_number: 2,
            items,
            confidence: 0.9,
            image_height: 1000,
            image_width: None,
        }
    }

    #[test]
    fn one_item_per_word_in_order() {
        let result = page(vec![
            word("second", BoundingBox::new(0.0, 500.0, 10.0, 520.0), 0.7),
            word("first", BoundingBox::new(0.0, 0.0, 10.0, 20.0), 0.9),
            word("", BoundingBox::new(0.0, 0.0, 0.0, 0.0), 0.1),
        ]);
        let items = build_text_layer(&result, 792.0, None);

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].text, "second");
        assert_eq!(items[1].text, "first");
        assert_eq!(items[2].text, "");
    }

    #[test]
    fn carries_confidence_and_font_name() {
        let result = page(vec![word("x", BoundingBox::new(1.0, 1.0, 2.0, 2.0), 0.42)]);
        let items = build_text_layer(&result, 792.0, None);
        assert_eq!(items[0].confidence, 0.42);
        assert_eq!(items[0].font_name, PLACEHOLDER_FONT_NAME);
    }

    #[test]
    fn degenerate_box_gets_minimum_font() {
        let result = page(vec![word("dot", BoundingBox::new(5.0, 5.0, 5.0, 5.0), 1.0)]);
        let items = build_text_layer(&result, 792.0, None);
        assert_eq!(items[0].font_size, 6.0);
        assert_eq!(items[0].height, 0.0);
    }

    #[test]
    fn uses_image_width_when_known() {
        let mut result = page(vec![word("w", BoundingBox::new(100.0, 0.0, 200.0, 10.0), 1.0)]);
        result.image_width = Some(500);
        let items = build_text_layer(&result, 1000.0, Some(1000.0));
        // scale_x = 2, scale_y = 1
        assert!((items[0].x - 200.0).abs() < 1e-9);
        assert!((items[0].width - 200.0).abs() < 1e-9);
        assert!((items[0].height - 10.0).abs() < 1e-9);
    }

    #[test]
    fn page_layer_keeps_page_number() {
        let result = page(vec![]);
        let layer = build_page_layer(&result, 792.0, None, &FontSizing::default());
        assert_eq!(layer.page_number, 2);
        assert!(layer.items.is_empty());
    }
}
