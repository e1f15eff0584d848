// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Remote OCR engine reached over HTTP.
//
// The page is uploaded as a PNG in the multipart field `file`. The service
// answers with JSON:
//
// ```json
// { "words": [ { "text": "Hello", "bbox": {"x1": 10, "y1": 20, "x2": 80, "y2": 40}, "confidence": 0.93 } ],
//   "confidence": 0.91 }
// ```
//
// Boxes may also be Tesseract-style `{x0, y0, x1, y1}`, a flat `[x1, y1, x2, y2]`,
// or a four-point quad `[[x, y], ...]` as emitted by line detectors. Confidences
// above 1 are percentages.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use ocrlayer_core::error::{OcrLayerError, Result};
use ocrlayer_core::{BoundingBox, CancellationToken, OcrWord};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::{RawRecognition, Recognizer, average_confidence, normalize_confidence};

/// Longest slice of an error body quoted back in an error message.
const MAX_ERROR_BODY: usize = 200;

/// OCR service reached with a multipart POST.
pub struct RemoteEngine {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl RemoteEngine {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("ocrlayer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| OcrLayerError::Http(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            name: name.into(),
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl Recognizer for RemoteEngine {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, image, cancel), fields(engine = %self.name, url = %self.url))]
    async fn recognize(
        &self,
        image: &DynamicImage,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<RawRecognition> {
        if cancel.is_cancelled() {
            return Ok(RawRecognition::default());
        }

        let owned = image.clone();
        let png = tokio::task::spawn_blocking(move || encode_png(&owned))
            .await
            .map_err(|err| OcrLayerError::recognition(page, format!("PNG encoding task failed: {err}")))?
            .map_err(|err| err.with_page(page))?;
        debug!(bytes = png.len(), "Uploading page image");

        let part = Part::bytes(png)
            .file_name(format!("page-{page}.png"))
            .mime_str("image/png")
            .map_err(|err| OcrLayerError::recognition(page, format!("invalid multipart part: {err}")))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                OcrLayerError::recognition(page, format!("{} request failed: {err}", self.name))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(OcrLayerError::recognition(
                page,
                format!("{} returned HTTP {status}: {}", self.name, body.trim()),
            ));
        }

        let body = response.text().await.map_err(|err| {
            OcrLayerError::recognition(page, format!("failed to read {} response: {err}", self.name))
        })?;
        let recognition = parse_response(&body).map_err(|err| {
            OcrLayerError::recognition(page, format!("malformed {} response: {err}", self.name))
        })?;

        info!(
            page,
            words = recognition.words.len(),
            confidence = recognition.overall_confidence,
            "Remote OCR complete"
        );
        Ok(recognition)
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|err| OcrLayerError::Image(format!("PNG encoding failed: {err}")))?;
    Ok(png)
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RemoteResponse {
    #[serde(default, alias = "items", alias = "results")]
    words: Vec<RemoteWord>,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RemoteWord {
    text: String,
    #[serde(alias = "box")]
    bbox: RemoteBox,
    #[serde(default = "full_confidence")]
    confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RemoteBox {
    Rect { x1: f64, y1: f64, x2: f64, y2: f64 },
    Tesseract { x0: f64, y0: f64, x1: f64, y1: f64 },
    Flat([f64; 4]),
    Quad(Vec<[f64; 2]>),
}

impl RemoteBox {
    fn into_bbox(self) -> Option<BoundingBox> {
        match self {
            Self::Rect { x1, y1, x2, y2 } => Some(BoundingBox::new(x1, y1, x2, y2)),
            Self::Tesseract { x0, y0, x1, y1 } => Some(BoundingBox::new(x0, y0, x1, y1)),
            Self::Flat([x1, y1, x2, y2]) => Some(BoundingBox::new(x1, y1, x2, y2)),
            Self::Quad(points) => BoundingBox::from_points(&points),
        }
    }
}

/// Decode a service response into words with normalised confidences.
///
/// Words with an empty quad are dropped. Without a page-level confidence the
/// mean word confidence is used.
fn parse_response(body: &str) -> std::result::Result<RawRecognition, serde_json::Error> {
    let response: RemoteResponse = serde_json::from_str(body)?;

    let words: Vec<OcrWord> = response
        .words
        .into_iter()
        .filter_map(|word| {
            let bbox = word.bbox.into_bbox()?;
            Some(OcrWord {
                text: word.text,
                bbox,
                confidence: normalize_confidence(word.confidence),
            })
        })
        .collect();

    let overall_confidence = match response.confidence {
        Some(confidence) => normalize_confidence(confidence),
        None => average_confidence(&words).unwrap_or(0.0),
    };

    Ok(RawRecognition {
        words,
        overall_confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn parses_rect_boxes_and_page_confidence() {
        let body = r#"{
            "words": [
                { "text": "Hello", "bbox": {"x1": 10, "y1": 20, "x2": 80, "y2": 40}, "confidence": 0.93 },
                { "text": "world", "bbox": {"x1": 90, "y1": 20, "x2": 150, "y2": 40}, "confidence": 0.81 }
            ],
            "confidence": 0.9
        }"#;
        let recognition = parse_response(body).unwrap();
        assert_eq!(recognition.words.len(), 2);
        assert_eq!(recognition.words[0].bbox, BoundingBox::new(10.0, 20.0, 80.0, 40.0));
        assert_eq!(recognition.overall_confidence, 0.9);
    }

    #[test]
    fn parses_tesseract_boxes_with_percent_confidence() {
        let body = r#"{
            "items": [ { "text": "Scan", "bbox": {"x0": 5, "y0": 6, "x1": 50, "y1": 30}, "confidence": 88 } ],
            "confidence": 76
        }"#;
        let recognition = parse_response(body).unwrap();
        assert_eq!(recognition.words[0].bbox, BoundingBox::new(5.0, 6.0, 50.0, 30.0));
        assert!((recognition.words[0].confidence - 0.88).abs() < 1e-9);
        assert!((recognition.overall_confidence - 0.76).abs() < 1e-9);
    }

    #[test]
    fn quads_become_axis_aligned_bounds() {
        let body = r#"{
            "results": [
                { "text": "斜め", "box": [[10, 5], [50, 8], [48, 30], [8, 27]], "confidence": 0.7 },
                { "text": "flat", "bbox": [1, 2, 3, 4] },
                { "text": "nothing", "bbox": [] }
            ]
        }"#;
        let recognition = parse_response(body).unwrap();
        assert_eq!(recognition.words.len(), 2);
        assert_eq!(recognition.words[0].bbox, BoundingBox::new(8.0, 5.0, 50.0, 30.0));
        assert_eq!(recognition.words[1].bbox, BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(recognition.words[1].confidence, 1.0);
        // Mean of 0.7 and 1.0.
        assert!((recognition.overall_confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn empty_response_has_zero_confidence() {
        let recognition = parse_response("{}").unwrap();
        assert!(recognition.words.is_empty());
        assert_eq!(recognition.overall_confidence, 0.0);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_response("<html>502 Bad Gateway</html>").is_err());
        assert!(parse_response(r#"{"words": [{"text": "x"}]}"#).is_err());
    }

    #[tokio::test]
    async fn unreachable_service_is_a_recognition_error() {
        let engine =
            RemoteEngine::new("offline", "http://127.0.0.1:9/ocr", Duration::from_secs(2)).unwrap();
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([255u8])));

        let err = engine
            .recognize(&image, 3, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OcrLayerError::Recognition { page: 3, .. }));
        assert!(err.to_string().contains("offline"));
    }

    #[tokio::test]
    async fn cancelled_job_skips_the_request() {
        let engine =
            RemoteEngine::new("offline", "http://127.0.0.1:9/ocr", Duration::from_secs(2)).unwrap();
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([255u8])));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let recognition = engine.recognize(&image, 1, &cancel).await.unwrap();
        assert!(recognition.words.is_empty());
    }
}
