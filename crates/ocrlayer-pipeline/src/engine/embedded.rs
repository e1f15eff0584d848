// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process OCR engine backed by `ocrs`. Recognition is CPU-bound and runs on
// the blocking pool.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use ocrlayer_core::error::{OcrLayerError, Result};
use ocrlayer_core::CancellationToken;
use ocrlayer_document::OcrEngine;
use tracing::instrument;

use super::{RawRecognition, Recognizer};

pub struct EmbeddedEngine {
    name: String,
    engine: Arc<OcrEngine>,
}

impl EmbeddedEngine {
    /// Load the detection and recognition models from `model_dir`, or from the
    /// ocrs model cache when `None`.
    pub fn load(name: impl Into<String>, model_dir: Option<&Path>) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            engine: Arc::new(OcrEngine::from_model_dir(model_dir)?),
        })
    }
}

#[async_trait]
impl Recognizer for EmbeddedEngine {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, image, cancel), fields(engine = %self.name))]
    async fn recognize(
        &self,
        image: &DynamicImage,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<RawRecognition> {
        if cancel.is_cancelled() {
            return Ok(RawRecognition::default());
        }

        let engine = Arc::clone(&self.engine);
        let image = image.clone();
        let words = tokio::task::spawn_blocking(move || engine.recognize_words(&image, page))
            .await
            .map_err(|err| OcrLayerError::recognition(page, format!("OCR task failed: {err}")))??;

        // ocrs reports no confidences; every word it emits counts as certain.
        let overall_confidence = if words.is_empty() { 0.0 } else { 1.0 };
        Ok(RawRecognition {
            words,
            overall_confidence,
        })
    }
}
