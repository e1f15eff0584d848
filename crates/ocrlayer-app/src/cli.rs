// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments and their translation into a conversion config.

use std::path::{Path, PathBuf};

use clap::Parser;
use ocrlayer_core::error::{OcrLayerError, Result};
use ocrlayer_core::{ConversionConfig, DocumentType, EngineConfig};

/// Timeout applied to engines given with `--engine-url`.
const REMOTE_TIMEOUT_SECS: u64 = 120;

/// Add an invisible, searchable OCR text layer to a scanned PDF or image.
#[derive(Parser, Debug)]
#[command(name = "ocrlayer", version)]
pub struct Args {
    /// Scanned PDF, JPEG or PNG to convert
    pub input: PathBuf,

    /// Where to write the searchable PDF
    pub output: PathBuf,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Rasterization resolution for OCR
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Minimum word confidence, 0 to 1
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Remote OCR service accepting a multipart PNG upload (repeatable)
    #[arg(long = "engine-url", value_name = "URL")]
    pub engine_urls: Vec<String>,

    /// Directory holding the embedded engine's models
    #[arg(long, value_name = "DIR")]
    pub model_dir: Option<PathBuf>,

    /// Directory holding the pdfium library (builds with the `pdfium` feature)
    #[arg(long, value_name = "DIR")]
    pub pdfium_dir: Option<PathBuf>,

    /// Leave pages whose recognition failed without text instead of failing
    #[arg(long)]
    pub skip_failed_pages: bool,

    /// Skip denoising and binarization before OCR
    #[arg(long)]
    pub no_preprocess: bool,

    /// Write a JSON report of the job to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

impl Args {
    /// Merge the config file (if any) with command-line overrides.
    ///
    /// With no engine configured anywhere, the embedded engine is used when
    /// this build has it.
    pub fn conversion_config(&self) -> Result<ConversionConfig> {
        let mut config = match &self.config {
            Some(path) => ConversionConfig::from_file(path)?,
            None => ConversionConfig::default(),
        };

        if let Some(dpi) = self.dpi {
            config.dpi = dpi;
        }
        if let Some(confidence) = self.confidence {
            config.confidence_threshold = confidence;
        }
        if self.skip_failed_pages {
            config.skip_failed_pages = true;
        }
        if self.no_preprocess {
            config.preprocess = false;
        }
        if let Some(dir) = &self.pdfium_dir {
            config.pdfium_library_dir = Some(dir.clone());
        }

        let single = self.engine_urls.len() == 1;
        for (i, url) in self.engine_urls.iter().enumerate() {
            let name = if single {
                "remote".to_string()
            } else {
                format!("remote-{}", i + 1)
            };
            config.engines.push(EngineConfig::Remote {
                name,
                url: url.clone(),
                timeout_secs: REMOTE_TIMEOUT_SECS,
            });
        }
        let configured_embedded = config.engines.iter_mut().find_map(|engine| match engine {
            EngineConfig::Embedded { model_dir, .. } => Some(model_dir),
            EngineConfig::Remote { .. } => None,
        });
        match (configured_embedded, &self.model_dir) {
            // --model-dir points the configured embedded engine at new models.
            (Some(model_dir), Some(dir)) => *model_dir = Some(dir.clone()),
            (Some(_), None) => {}
            (None, dir) => {
                if dir.is_some() || (config.engines.is_empty() && cfg!(feature = "ocr")) {
                    config.engines.push(EngineConfig::Embedded {
                        name: "ocrs".into(),
                        model_dir: dir.clone(),
                    });
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

/// Infer the input type from its extension.
pub fn document_type(path: &Path) -> Result<DocumentType> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(DocumentType::from_extension)
        .ok_or_else(|| {
            OcrLayerError::validation(format!(
                "cannot tell the file type of '{}'; use a .pdf, .jpg, .png or .tiff file",
                path.display()
            ))
        })
}
