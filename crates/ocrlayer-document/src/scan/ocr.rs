// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Embedded OCR: word-level text and boxes from page images using the `ocrs`
// crate, a pure-Rust OCR engine backed by neural network models executed via
// `rten`.
//
// # Feature Gate
//
// This module is only available when the `ocr` feature is enabled:
//
// ```toml
// ocrlayer-document = { path = "crates/ocrlayer-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The engine requires two model files:
//
// - **Detection model** (`text-detection.rten`): locates words in the image.
// - **Recognition model** (`text-recognition.rten`): decodes characters from detected lines.
//
// Running the `ocrs-cli` tool once downloads them to `$XDG_CACHE_HOME/ocrs`
// (typically `~/.cache/ocrs`), which is the default location used here.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use ocrlayer_core::error::{OcrLayerError, Result};
use ocrlayer_core::{BoundingBox, OcrWord};
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams, TextItem};
use rten::Model;
use tracing::{debug, info, instrument};

/// Default directory for cached OCR model files.
///
/// Follows the XDG Base Directory specification: `$XDG_CACHE_HOME/ocrs`, falling
/// back to `~/.cache/ocrs` when `XDG_CACHE_HOME` is unset.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Where the engine's two model files live.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Expects `dir` to contain `text-detection.rten` and `text-recognition.rten`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<()> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(OcrLayerError::EngineUnavailable(format!(
                    "OCR model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// In-process OCR engine producing word boxes in image pixel space.
///
/// Model loading is the expensive step; build the engine once and reuse it
/// for every page.
pub struct OcrEngine {
    engine: OcrsEngine,
}

impl OcrEngine {
    /// Load the detection and recognition models named by `config`.
    ///
    /// **Important:** `ocrs` and `rten` must be compiled in release mode. Debug
    /// builds are 10-100x slower.
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: &OcrConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading OCR models");
        let load = |path: &Path| {
            Model::load_file(path).map_err(|err| {
                OcrLayerError::EngineUnavailable(format!(
                    "failed to load OCR model from {}: {}",
                    path.display(),
                    err
                ))
            })
        };
        let detection_model = load(&config.detection_model_path)?;
        let recognition_model = load(&config.recognition_model_path)?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| {
            OcrLayerError::EngineUnavailable(format!("failed to initialise OCR engine: {err}"))
        })?;

        info!("OCR engine initialised");
        Ok(Self { engine })
    }

    /// Load models from `dir`, or from the default cache when `None`.
    pub fn from_model_dir(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => Self::new(&OcrConfig::from_dir(dir)),
            None => Self::new(&OcrConfig::default()),
        }
    }

    /// Recognise every word on a page image, in reading-line order as the
    /// engine emits it.
    ///
    /// `ocrs` reports no per-word confidence, so every word gets 1.0.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn recognize_words(&self, image: &DynamicImage, page: u32) -> Result<Vec<OcrWord>> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            OcrLayerError::recognition(
                page,
                format!("failed to create image source ({width}x{height}): {err}"),
            )
        })?;

        let input = self.engine.prepare_input(source).map_err(|err| {
            OcrLayerError::recognition(page, format!("OCR preprocessing failed: {err}"))
        })?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|err| OcrLayerError::recognition(page, format!("word detection failed: {err}")))?;
        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        debug!(words = word_rects.len(), lines = line_rects.len(), "Text detected");

        let lines = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| OcrLayerError::recognition(page, format!("line recognition failed: {err}")))?;

        let mut words = Vec::new();
        for line in lines.iter().flatten() {
            for word in line.words() {
                let text = word.to_string();
                if text.trim().is_empty() {
                    continue;
                }
                let rect = word.bounding_rect();
                words.push(OcrWord {
                    text,
                    bbox: BoundingBox::new(
                        rect.left() as f64,
                        rect.top() as f64,
                        rect.right() as f64,
                        rect.bottom() as f64,
                    ),
                    confidence: 1.0,
                });
            }
        }

        info!(page, words = words.len(), "Embedded OCR complete");
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_to_cache_dir() {
        let config = OcrConfig::default();
        assert!(
            config
                .detection_model_path
                .to_string_lossy()
                .ends_with(DETECTION_MODEL_FILENAME)
        );
        assert!(
            config
                .recognition_model_path
                .to_string_lossy()
                .ends_with(RECOGNITION_MODEL_FILENAME)
        );
    }

    #[test]
    fn config_from_dir() {
        let config = OcrConfig::from_dir("/tmp/my-models");
        assert_eq!(
            config.detection_model_path,
            PathBuf::from("/tmp/my-models/text-detection.rten")
        );
    }

    #[test]
    fn missing_models_mean_engine_unavailable() {
        let err = OcrEngine::from_model_dir(Some(Path::new("/nonexistent/ocr-models")))
            .err()
            .unwrap();
        assert!(matches!(err, OcrLayerError::EngineUnavailable(_)));
    }
}
