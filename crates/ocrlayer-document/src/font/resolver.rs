// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font acquisition and process-lifetime memoization.
//
// The first successful resolution is cached for the lifetime of the resolver.
// Concurrent callers wait on the same in-flight fetch. A failed resolution is
// not cached, so a later job may still obtain the real font.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ocrlayer_core::ConversionConfig;
use ocrlayer_core::error::{OcrLayerError, Result};
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use super::{EmbeddedFont, ResolvedFont};

/// Where font bytes come from.
#[async_trait]
pub trait FontSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Downloads a font over HTTP, keeping a copy on disk.
///
/// Cache files are named by the SHA-256 of the URL, so changing the URL never
/// serves a stale font. Only bytes that parse as a font are cached or served
/// from the cache.
pub struct HttpFontSource {
    url: String,
    cache_dir: Option<PathBuf>,
    client: reqwest::Client,
}

impl HttpFontSource {
    pub fn new(url: impl Into<String>, cache_dir: Option<PathBuf>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            url: url.into(),
            cache_dir,
            client,
        }
    }

    /// Path of the cached copy of this source's font, if caching is enabled.
    pub fn cache_path(&self) -> Option<PathBuf> {
        let digest = Sha256::digest(self.url.as_bytes());
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.font", hex::encode(digest))))
    }

    async fn download(&self) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| OcrLayerError::Http(format!("font download failed: {err}")))?
            .error_for_status()
            .map_err(|err| OcrLayerError::Http(format!("font download failed: {err}")))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|err| OcrLayerError::Http(format!("font download interrupted: {err}")))?;
        Ok(bytes.to_vec())
    }

    async fn store(&self, path: &std::path::Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write-then-rename so a concurrent reader never sees a partial file.
        let partial = path.with_extension("partial");
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, path).await?;
        Ok(())
    }
}

#[async_trait]
impl FontSource for HttpFontSource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Vec<u8>> {
        let cache_path = self.cache_path();

        if let Some(path) = &cache_path {
            match tokio::fs::read(path).await {
                Ok(bytes) if is_font(&bytes) => {
                    debug!(path = %path.display(), bytes = bytes.len(), "Font served from disk cache");
                    return Ok(bytes);
                }
                Ok(_) => {
                    warn!(path = %path.display(), "Discarding cached file that is not a font");
                    if let Err(err) = tokio::fs::remove_file(path).await {
                        warn!(path = %path.display(), %err, "Could not remove cached font");
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!(path = %path.display(), %err, "Could not read cached font"),
            }
        }

        info!("Downloading text-layer font");
        let bytes = self.download().await?;
        if !is_font(&bytes) {
            return Err(OcrLayerError::Font(format!(
                "downloaded {} bytes that are not a font",
                bytes.len()
            )));
        }
        info!(bytes = bytes.len(), "Font downloaded");

        if let Some(path) = &cache_path {
            if let Err(err) = self.store(path, &bytes).await {
                warn!(path = %path.display(), %err, "Could not cache font on disk");
            }
        }
        Ok(bytes)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

fn is_font(bytes: &[u8]) -> bool {
    ttf_parser::Face::parse(bytes, 0).is_ok()
}

/// Resolves the text-layer font once and hands out the cached result.
///
/// Owned by the converter and shared by every job it runs.
pub struct FontResolver {
    source: Option<Arc<dyn FontSource>>,
    font: OnceCell<Arc<EmbeddedFont>>,
}

impl FontResolver {
    pub fn new(source: Arc<dyn FontSource>) -> Self {
        Self {
            source: Some(source),
            font: OnceCell::new(),
        }
    }

    /// A resolver using the configured font URL and disk cache.
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(Arc::new(HttpFontSource::new(
            config.font_url.clone(),
            Some(config.font_cache_dir.clone()),
        )))
    }

    /// A resolver that always yields the fallback font.
    pub fn fallback_only() -> Self {
        Self {
            source: None,
            font: OnceCell::new(),
        }
    }

    /// Resolve the glyph-complete font, degrading to the fallback on failure.
    ///
    /// Never fails: a fallback is a warning, not an error.
    pub async fn resolve(&self) -> ResolvedFont {
        let Some(source) = &self.source else {
            return ResolvedFont::Fallback;
        };

        let result = self
            .font
            .get_or_try_init(|| async {
                let bytes = source.fetch().await?;
                let font = EmbeddedFont::from_bytes(bytes)?;
                info!(
                    font = font.postscript_name(),
                    cff = font.is_cff(),
                    "Text-layer font resolved"
                );
                Ok::<_, OcrLayerError>(Arc::new(font))
            })
            .await;

        match result {
            Ok(font) => ResolvedFont::Embedded(Arc::clone(font)),
            Err(err) => {
                warn!(
                    source = %source.describe(),
                    %err,
                    "Glyph-complete font unavailable; falling back to {}",
                    super::FALLBACK_FONT_NAME
                );
                ResolvedFont::Fallback
            }
        }
    }

    /// The cached font, if a resolution has already succeeded.
    pub fn cached(&self) -> Option<ResolvedFont> {
        self.font
            .get()
            .map(|font| ResolvedFont::Embedded(Arc::clone(font)))
    }
}
