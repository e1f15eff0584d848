// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR engines: the recognition seam of the pipeline.
//
// The orchestrator only sees `Recognizer`; whether words come from an HTTP
// service or from models running in-process is decided by configuration.

pub mod remote;

#[cfg(feature = "ocr")]
pub mod embedded;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use ocrlayer_core::error::{OcrLayerError, Result};
use ocrlayer_core::{CancellationToken, ConversionConfig, EngineConfig, OcrWord};

pub use remote::RemoteEngine;

#[cfg(feature = "ocr")]
pub use embedded::EmbeddedEngine;

/// Words and page-level confidence as reported by an engine, before filtering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecognition {
    pub words: Vec<OcrWord>,
    /// Overall page confidence in `[0, 1]`.
    pub overall_confidence: f64,
}

/// An OCR engine.
///
/// Implementations must be cheap to share between concurrently processed
/// pages. An engine that observes cancellation may return early with an empty
/// recognition: results of a cancelled job are discarded by the caller.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Name used in logs, page reports and the accuracy summary.
    fn name(&self) -> &str;

    /// Recognise the words on one page image. Boxes are in the image's pixel
    /// space, origin top-left.
    async fn recognize(
        &self,
        image: &DynamicImage,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<RawRecognition>;
}

/// Outcome of [`filter_words`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredWords {
    pub words: Vec<OcrWord>,
    pub dropped_empty: usize,
    pub dropped_low_confidence: usize,
}

/// Drop words that carry no text or fall below `threshold`.
///
/// A word with a non-finite confidence counts as below threshold.
pub fn filter_words(words: Vec<OcrWord>, threshold: f64) -> FilteredWords {
    let mut filtered = FilteredWords::default();
    for word in words {
        if word.text.trim().is_empty() {
            filtered.dropped_empty += 1;
        } else if word.confidence.is_nan() || word.confidence < threshold {
            filtered.dropped_low_confidence += 1;
        } else {
            filtered.words.push(word);
        }
    }
    filtered
}

/// Mean confidence of `words`, or `None` when there are none.
pub fn average_confidence(words: &[OcrWord]) -> Option<f64> {
    if words.is_empty() {
        return None;
    }
    Some(words.iter().map(|w| w.confidence).sum::<f64>() / words.len() as f64)
}

/// Map an engine-reported confidence into `[0, 1]`.
///
/// Values above 1 are percentages.
pub fn normalize_confidence(raw: f64) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    let value = if raw > 1.0 { raw / 100.0 } else { raw };
    value.clamp(0.0, 1.0)
}

/// Instantiate every engine named in `config`, in configuration order.
pub fn build_recognizers(config: &ConversionConfig) -> Result<Vec<Arc<dyn Recognizer>>> {
    if config.engines.is_empty() {
        return Err(OcrLayerError::Config(
            "no OCR engine configured; add a remote engine URL or an embedded engine".into(),
        ));
    }

    config
        .engines
        .iter()
        .map(|engine| -> Result<Arc<dyn Recognizer>> {
            match engine {
                EngineConfig::Remote {
                    name,
                    url,
                    timeout_secs,
                } => Ok(Arc::new(RemoteEngine::new(
                    name.clone(),
                    url.clone(),
                    Duration::from_secs(*timeout_secs),
                )?)),
                EngineConfig::Embedded { name, model_dir } => embedded_engine(name, model_dir.as_deref()),
            }
        })
        .collect()
}

#[cfg(feature = "ocr")]
fn embedded_engine(name: &str, model_dir: Option<&std::path::Path>) -> Result<Arc<dyn Recognizer>> {
    Ok(Arc::new(EmbeddedEngine::load(name, model_dir)?))
}

#[cfg(not(feature = "ocr"))]
fn embedded_engine(name: &str, _model_dir: Option<&std::path::Path>) -> Result<Arc<dyn Recognizer>> {
    Err(OcrLayerError::EngineUnavailable(format!(
        "engine '{name}' needs the embedded OCR engine, but this build lacks the `ocr` feature"
    )))
}
