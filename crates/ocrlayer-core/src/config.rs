// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OcrLayerError, Result};

/// Glyph-complete CJK font fetched for the text layer.
pub const DEFAULT_FONT_URL: &str =
    "https://cdn.jsdelivr.net/gh/googlefonts/noto-cjk@main/Sans/OTF/Japanese/NotoSansCJKjp-Regular.otf";

/// Largest accepted input file (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default directory for downloaded fonts.
///
/// `$XDG_CACHE_HOME/ocrlayer/fonts`, falling back to `~/.cache/ocrlayer/fonts`.
pub fn default_font_cache_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrlayer").join("fonts")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home)
            .join(".cache")
            .join("ocrlayer")
            .join("fonts")
    } else {
        PathBuf::from("ocrlayer-fonts")
    }
}

/// One OCR engine participating in a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineConfig {
    /// An OCR service reached over HTTP with a multipart upload.
    Remote {
        name: String,
        url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// The in-process `ocrs` engine (requires the `ocr` feature).
    Embedded {
        name: String,
        /// Directory holding `text-detection.rten` and `text-recognition.rten`.
        /// Defaults to the ocrs model cache when absent.
        model_dir: Option<PathBuf>,
    },
}

fn default_timeout_secs() -> u64 {
    120
}

impl EngineConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Remote { name, .. } | Self::Embedded { name, .. } => name,
        }
    }
}

/// Settings for a conversion job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Rasterization resolution used for OCR.
    pub dpi: u32,
    /// Words below this confidence are dropped before synthesis.
    pub confidence_threshold: f64,
    /// Number of pages processed concurrently.
    pub batch_size: usize,
    /// Smallest font size emitted for a text-layer item, in points.
    pub min_font_size: f64,
    /// Font size as a fraction of the mapped box height.
    pub font_scale: f64,
    /// Largest accepted input file in bytes.
    pub max_file_size: u64,
    /// Where the glyph-complete font is downloaded from.
    pub font_url: String,
    /// Disk cache for downloaded fonts.
    pub font_cache_dir: PathBuf,
    /// Continue past a page whose recognition failed, leaving it without text.
    pub skip_failed_pages: bool,
    /// Denoise and binarize pages before OCR.
    pub preprocess: bool,
    /// Engines to run. With more than one, the most confident result per page wins.
    pub engines: Vec<EngineConfig>,
    /// Directory holding the pdfium library, for builds with the `pdfium`
    /// feature. Searched for next to the executable and on the system paths
    /// when absent.
    pub pdfium_library_dir: Option<PathBuf>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            confidence_threshold: 0.5,
            batch_size: 4,
            min_font_size: 6.0,
            font_scale: 0.9,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            font_url: DEFAULT_FONT_URL.to_string(),
            font_cache_dir: default_font_cache_dir(),
            skip_failed_pages: false,
            preprocess: true,
            engines: Vec::new(),
            pdfium_library_dir: None,
        }
    }
}

impl ConversionConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a job meaningless.
    pub fn validate(&self) -> Result<()> {
        let mut reasons = Vec::new();

        if self.dpi == 0 {
            reasons.push("dpi must be greater than zero".to_string());
        }
        if self.batch_size == 0 {
            reasons.push("batch_size must be greater than zero".to_string());
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            reasons.push(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            ));
        }
        if !(self.min_font_size > 0.0) {
            reasons.push("min_font_size must be positive".to_string());
        }
        if !(self.font_scale > 0.0) {
            reasons.push("font_scale must be positive".to_string());
        }

        let mut names = std::collections::HashSet::new();
        for engine in &self.engines {
            if !names.insert(engine.name()) {
                reasons.push(format!("duplicate engine name '{}'", engine.name()));
            }
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(OcrLayerError::Config(reasons.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ConversionConfig::default();
        assert_eq!(config.dpi, 300);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.confidence_threshold, 0.5);
        assert_eq!(config.min_font_size, 6.0);
        assert_eq!(config.font_scale, 0.9);
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{
            "dpi": 200,
            "engines": [
                { "type": "remote", "name": "paddle", "url": "http://localhost:5000/ocr" },
                { "type": "embedded", "name": "ocrs", "model_dir": null }
            ]
        }"#;
        let config: ConversionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.dpi, 200);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.engines.len(), 2);
        assert_eq!(config.engines[0].name(), "paddle");
        assert!(matches!(
            config.engines[0],
            EngineConfig::Remote { timeout_secs: 120, .. }
        ));
    }

    #[test]
    fn validate_collects_every_problem() {
        let config = ConversionConfig {
            dpi: 0,
            batch_size: 0,
            confidence_threshold: 1.5,
            ..Default::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("dpi"));
        assert!(err.contains("batch_size"));
        assert!(err.contains("confidence_threshold"));
    }

    #[test]
    fn duplicate_engine_names_rejected() {
        let engine = EngineConfig::Embedded {
            name: "ocrs".into(),
            model_dir: None,
        };
        let config = ConversionConfig {
            engines: vec![engine.clone(), engine],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn font_cache_dir_ends_in_fonts() {
        assert!(default_font_cache_dir().ends_with("fonts"));
    }
}
