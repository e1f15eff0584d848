// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-batch orchestrator.
//
// A job loads the document once, then walks its pages in fixed-size batches:
// every page of a batch is rasterized, then recognised, concurrently, and the
// results are synthesized into text layers in page order. One composition
// pass at the end writes all layers into the original document.
//
//   Idle -> Loading -> (Rasterizing -> Recognizing -> Synthesizing)* -> Composing -> Done
//
// Any in-progress state can end in Aborted (cancellation) or Failed (error).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use image::DynamicImage;
use ocrlayer_core::error::{OcrLayerError, Result};
use ocrlayer_core::validate::validate_file;
use ocrlayer_core::{
    CancellationToken, ConversionConfig, DocumentType, JobId, JobInfo, JobState, OcrPageResult,
    TextLayer,
};
use ocrlayer_document::geometry::FontSizing;
use ocrlayer_document::{
    CompositionStats, Compositor, FontResolver, build_page_layer, image_to_pdf, prepare_for_ocr,
};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::engine::{Recognizer, average_confidence, build_recognizers, filter_words};
use crate::source::{DocumentLoader, DocumentSource, default_loader};
use crate::summary::{AccuracyTracker, EngineSummary};

/// Reported after each batch completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub processed_pages: u32,
    pub total_pages: u32,
}

impl Progress {
    /// Completion in percent, `0.0..=100.0`.
    pub fn percent(&self) -> f64 {
        if self.total_pages == 0 {
            return 100.0;
        }
        f64::from(self.processed_pages) / f64::from(self.total_pages) * 100.0
    }
}

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageReport {
    pub page_number: u32,
    /// Engine whose words were used. `None` when the page was skipped.
    pub engine: Option<String>,
    pub word_count: usize,
    /// Page confidence reported by the chosen engine.
    pub confidence: f64,
    pub dropped_empty: usize,
    pub dropped_low_confidence: usize,
    /// Engines that failed on this page.
    pub engine_errors: BTreeMap<String, String>,
    /// Why the page was left without text.
    pub error: Option<String>,
}

impl PageReport {
    fn skipped(page_number: u32, error: String, engine_errors: BTreeMap<String, String>) -> Self {
        Self {
            page_number,
            engine: None,
            word_count: 0,
            confidence: 0.0,
            dropped_empty: 0,
            dropped_low_confidence: 0,
            engine_errors,
            error: Some(error),
        }
    }
}

/// Output of a completed job.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub job: JobInfo,
    pub pdf_bytes: Vec<u8>,
    pub pages_processed: u32,
    /// One per page, in page order.
    pub page_reports: Vec<PageReport>,
    /// One per page, in page order.
    pub text_layers: Vec<TextLayer>,
    pub composition: CompositionStats,
    pub used_fallback_font: bool,
    pub accuracy_summary: BTreeMap<String, EngineSummary>,
}

/// How a job ended, when it did not fail.
#[derive(Debug)]
pub enum JobOutcome {
    Completed(ConversionResult),
    /// Cancelled before completion. No document was produced.
    Cancelled,
}

impl JobOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn into_result(self) -> Option<ConversionResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Cancelled => None,
        }
    }
}

enum EngineAttempt {
    Recognized {
        engine: String,
        avg_confidence: Option<f64>,
        kept: usize,
    },
    Failed {
        engine: String,
        error: String,
    },
}

struct Recognized {
    engine: String,
    result: OcrPageResult,
    dropped_empty: usize,
    dropped_low_confidence: usize,
}

struct PageOutcome {
    page: u32,
    attempts: Vec<EngineAttempt>,
    recognition: Result<Recognized>,
}

/// Runs conversion jobs, one at a time.
///
/// Owns the font resolver, so a font fetched for one job is reused by every
/// later job. Starting a job cancels the one in flight.
pub struct Converter {
    config: ConversionConfig,
    loader: Arc<dyn DocumentLoader>,
    engines: Vec<Arc<dyn Recognizer>>,
    compositor: Compositor,
    state: watch::Sender<JobState>,
    current: Mutex<Option<(JobId, CancellationToken)>>,
}

impl Converter {
    pub fn new(
        config: ConversionConfig,
        loader: Arc<dyn DocumentLoader>,
        engines: Vec<Arc<dyn Recognizer>>,
        fonts: Arc<FontResolver>,
    ) -> Result<Self> {
        config.validate()?;
        if engines.is_empty() {
            return Err(OcrLayerError::Config(
                "at least one OCR engine is required".into(),
            ));
        }

        let (state, _) = watch::channel(JobState::Idle);
        Ok(Self {
            config,
            loader,
            engines,
            compositor: Compositor::new(fonts),
            state,
            current: Mutex::new(None),
        })
    }

    /// A converter reading PDFs with [`default_loader`], the engines named in
    /// `config`, and the configured font URL and cache.
    pub fn from_config(config: ConversionConfig) -> Result<Self> {
        let engines = build_recognizers(&config)?;
        let fonts = Arc::new(FontResolver::from_config(&config));
        let loader = default_loader(&config);
        Self::new(config, loader, engines, fonts)
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn state(&self) -> JobState {
        *self.state.borrow()
    }

    /// Watch job state transitions.
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state.subscribe()
    }

    pub fn is_processing(&self) -> bool {
        self.state().is_active()
    }

    /// Ask the running job, if any, to stop.
    pub fn cancel(&self) {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((job, token)) = current.as_ref() {
            info!(job_id = %job, "Cancellation requested");
            token.cancel();
        }
    }

    /// Validate an input file, wrap images as a one-page PDF, and process it.
    ///
    /// Validation failures are returned before a job starts.
    pub async fn convert_file<F>(
        &self,
        bytes: &[u8],
        document_type: DocumentType,
        progress: F,
    ) -> Result<JobOutcome>
    where
        F: Fn(Progress) + Send + Sync,
    {
        validate_file(
            document_type.mime_type(),
            bytes.len() as u64,
            self.config.max_file_size,
        )?;

        if !document_type.is_image() {
            return self.process_document(bytes, progress).await;
        }

        let mime = document_type.mime_type();
        let owned = bytes.to_vec();
        let pdf = tokio::task::spawn_blocking(move || image_to_pdf(&owned, mime))
            .await
            .map_err(|err| OcrLayerError::Image(format!("image wrapping task failed: {err}")))??;
        debug!(mime, pdf_bytes = pdf.len(), "Image wrapped as PDF");

        self.process_document(&pdf, progress).await
    }

    /// Add an invisible text layer to every page of `pdf`.
    ///
    /// `progress` is called after each batch. Returns
    /// [`JobOutcome::Cancelled`] if the job was cancelled, either through
    /// [`Converter::cancel`] or by a newer job.
    #[instrument(skip_all, fields(bytes_len = pdf.len()))]
    pub async fn process_document<F>(&self, pdf: &[u8], progress: F) -> Result<JobOutcome>
    where
        F: Fn(Progress) + Send + Sync,
    {
        let (job, cancel) = self.begin_job();
        let job_id = job.id;

        let outcome = self.run_job(job, &cancel, pdf, &progress).await;
        let terminal = match &outcome {
            Ok(JobOutcome::Completed(_)) => JobState::Done,
            Ok(JobOutcome::Cancelled) => {
                info!(job_id = %job_id, "Job cancelled; no output produced");
                JobState::Aborted
            }
            Err(err) => {
                warn!(job_id = %job_id, %err, "Job failed");
                JobState::Failed
            }
        };
        self.finish_job(job_id, terminal);
        outcome
    }

    async fn run_job<F>(
        &self,
        mut job: JobInfo,
        cancel: &CancellationToken,
        pdf: &[u8],
        progress: &F,
    ) -> Result<JobOutcome>
    where
        F: Fn(Progress) + Send + Sync,
    {
        let loader = Arc::clone(&self.loader);
        let owned = pdf.to_vec();
        let source = tokio::task::spawn_blocking(move || loader.load(&owned))
            .await
            .map_err(|err| OcrLayerError::load(format!("document loading task failed: {err}")))??;

        let page_count = source.page_count();
        job.page_count = page_count;
        let geometries = (1..=page_count)
            .map(|page| source.page_geometry(page))
            .collect::<Result<Vec<_>>>()?;
        info!(
            job_id = %job.id,
            pages = page_count,
            batch_size = self.config.batch_size,
            engines = self.engines.len(),
            "Document loaded"
        );

        let sizing = FontSizing::new(self.config.min_font_size, self.config.font_scale);
        let mut tracker = AccuracyTracker::new(self.engines.iter().map(|engine| engine.name()));
        let mut text_layers = Vec::with_capacity(page_count as usize);
        let mut page_reports = Vec::with_capacity(page_count as usize);
        let mut processed = 0u32;

        let pages: Vec<u32> = (1..=page_count).collect();
        for batch in pages.chunks(self.config.batch_size) {
            if cancel.is_cancelled() {
                return Ok(JobOutcome::Cancelled);
            }

            self.set_state(job.id, JobState::Rasterizing);
            let images = join_all(
                batch
                    .iter()
                    .map(|&page| self.rasterize_page(source.as_ref(), page)),
            )
            .await;
            if cancel.is_cancelled() {
                return Ok(JobOutcome::Cancelled);
            }
            let images = images.into_iter().collect::<Result<Vec<_>>>()?;

            self.set_state(job.id, JobState::Recognizing);
            let outcomes = join_all(
                batch
                    .iter()
                    .zip(&images)
                    .map(|(&page, image)| self.recognize_page(image, page, cancel)),
            )
            .await;
            drop(images);
            if cancel.is_cancelled() {
                debug!(job_id = %job.id, "Discarding results of in-flight batch");
                return Ok(JobOutcome::Cancelled);
            }

            self.set_state(job.id, JobState::Synthesizing);
            for outcome in outcomes {
                let page = outcome.page;
                let mut engine_errors = BTreeMap::new();
                for attempt in outcome.attempts {
                    match attempt {
                        EngineAttempt::Recognized {
                            engine,
                            avg_confidence,
                            kept,
                        } => tracker.record_page(&engine, avg_confidence, kept),
                        EngineAttempt::Failed { engine, error } => {
                            tracker.record_error(&engine, error.clone());
                            engine_errors.insert(engine, error);
                        }
                    }
                }

                match outcome.recognition {
                    Ok(recognized) => {
                        let geometry = geometries[(page - 1) as usize];
                        let layer = build_page_layer(
                            &recognized.result,
                            geometry.height_pt,
                            Some(geometry.width_pt),
                            &sizing,
                        );
                        page_reports.push(PageReport {
                            page_number: page,
                            engine: Some(recognized.engine),
                            word_count: layer.items.len(),
                            confidence: recognized.result.confidence,
                            dropped_empty: recognized.dropped_empty,
                            dropped_low_confidence: recognized.dropped_low_confidence,
                            engine_errors,
                            error: None,
                        });
                        text_layers.push(layer);
                    }
                    Err(err) if self.config.skip_failed_pages => {
                        warn!(page, %err, "Recognition failed; page left without text");
                        page_reports.push(PageReport::skipped(page, err.to_string(), engine_errors));
                        text_layers.push(TextLayer {
                            page_number: page,
                            items: Vec::new(),
                        });
                    }
                    Err(err) => return Err(err),
                }
            }

            processed += batch.len() as u32;
            let report = Progress {
                processed_pages: processed,
                total_pages: page_count,
            };
            debug!(
                processed,
                total = page_count,
                percent = report.percent(),
                "Batch complete"
            );
            progress(report);
        }

        if cancel.is_cancelled() {
            return Ok(JobOutcome::Cancelled);
        }

        self.set_state(job.id, JobState::Composing);
        let composition = self.compositor.compose(pdf, &text_layers).await?;
        if cancel.is_cancelled() {
            return Ok(JobOutcome::Cancelled);
        }

        info!(
            job_id = %job.id,
            pages = page_count,
            added = composition.stats.added_items,
            skipped = composition.stats.skipped_items,
            fallback_font = composition.used_fallback_font,
            "Conversion complete"
        );

        Ok(JobOutcome::Completed(ConversionResult {
            job,
            pdf_bytes: composition.pdf_bytes,
            pages_processed: processed,
            page_reports,
            text_layers,
            composition: composition.stats,
            used_fallback_font: composition.used_fallback_font,
            accuracy_summary: tracker.finish(),
        }))
    }

    async fn rasterize_page(&self, source: &dyn DocumentSource, page: u32) -> Result<DynamicImage> {
        let image = source
            .rasterize(page, self.config.dpi)
            .await
            .map_err(|err| err.with_page(page))?;
        if !self.config.preprocess {
            return Ok(image);
        }

        tokio::task::spawn_blocking(move || prepare_for_ocr(&image))
            .await
            .map_err(|err| OcrLayerError::load_page(page, format!("preprocessing task failed: {err}")))
    }

    /// Run every engine on one page and keep the most confident result.
    ///
    /// Ties go to the engine configured first. The page fails only when every
    /// engine failed.
    async fn recognize_page(
        &self,
        image: &DynamicImage,
        page: u32,
        cancel: &CancellationToken,
    ) -> PageOutcome {
        let runs = join_all(self.engines.iter().map(|engine| async move {
            (engine.name(), engine.recognize(image, page, cancel).await)
        }))
        .await;

        let mut attempts = Vec::with_capacity(runs.len());
        let mut best: Option<(f64, Recognized)> = None;
        let mut first_error = None;

        for (engine, run) in runs {
            match run {
                Ok(raw) => {
                    let filtered = filter_words(raw.words, self.config.confidence_threshold);
                    let avg_confidence = average_confidence(&filtered.words);
                    debug!(
                        page,
                        engine,
                        kept = filtered.words.len(),
                        dropped_empty = filtered.dropped_empty,
                        dropped_low_confidence = filtered.dropped_low_confidence,
                        "Words filtered"
                    );
                    attempts.push(EngineAttempt::Recognized {
                        engine: engine.to_string(),
                        avg_confidence,
                        kept: filtered.words.len(),
                    });

                    let score = avg_confidence.unwrap_or(0.0);
                    let better = match &best {
                        Some((best_score, _)) => score > *best_score,
                        None => true,
                    };
                    if better {
                        best = Some((
                            score,
                            Recognized {
                                engine: engine.to_string(),
                                result: OcrPageResult {
                                    page_number: page,
                                    items: filtered.words,
                                    confidence: raw.overall_confidence,
                                    image_height: image.height(),
                                    image_width: Some(image.width()),
                                },
                                dropped_empty: filtered.dropped_empty,
                                dropped_low_confidence: filtered.dropped_low_confidence,
                            },
                        ));
                    }
                }
                Err(err) => {
                    warn!(page, engine, %err, "OCR engine failed");
                    attempts.push(EngineAttempt::Failed {
                        engine: engine.to_string(),
                        error: err.to_string(),
                    });
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        let recognition = match (best, first_error) {
            (Some((_, recognized)), _) => Ok(recognized),
            (None, Some(err)) => Err(err.with_page(page)),
            (None, None) => Err(OcrLayerError::recognition(page, "no OCR engine ran")),
        };

        PageOutcome {
            page,
            attempts,
            recognition,
        }
    }

    fn begin_job(&self) -> (JobInfo, CancellationToken) {
        let job = JobInfo::new(0);
        let token = CancellationToken::new();

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((previous, previous_token)) = current.replace((job.id, token.clone())) {
            info!(previous = %previous, job_id = %job.id, "Cancelling previous job");
            previous_token.cancel();
        }
        self.state.send_replace(JobState::Loading);
        info!(job_id = %job.id, started_at = %job.started_at, "Job started");

        (job, token)
    }

    /// Publish `state` if `job` is still the current job.
    fn set_state(&self, job: JobId, state: JobState) {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|(id, _)| *id == job) {
            self.state.send_replace(state);
        }
    }

    fn finish_job(&self, job: JobId, state: JobState) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|(id, _)| *id == job) {
            *current = None;
            self.state.send_replace(state);
        }
    }
}
