// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ocrlayer: turns scanned PDFs and images into searchable PDFs.
//
// Entry point. Initialises logging, runs one conversion job, and reports the
// result. Ctrl-C cancels the job; nothing is written in that case.

mod cli;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ocrlayer_core::JobInfo;
use ocrlayer_core::error::Result;
use ocrlayer_core::human_errors::humanize_error;
use ocrlayer_document::CompositionStats;
use ocrlayer_pipeline::{ConversionResult, Converter, EngineSummary, JobOutcome, PageReport};
use serde::Serialize;
use tracing::{info, warn};

use cli::Args;

/// Exit status for a job stopped by Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!(input = %args.input.display(), "ocrlayer starting");

    match run(&args).await {
        Ok(code) => code,
        Err(err) => {
            let human = humanize_error(&err);
            eprintln!("error: {}", human.message);
            eprintln!("{}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<ExitCode> {
    let config = args.conversion_config()?;
    let document_type = cli::document_type(&args.input)?;
    let bytes = tokio::fs::read(&args.input).await?;

    let converter = Arc::new(Converter::from_config(config)?);

    let watcher = Arc::clone(&converter);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling job");
            watcher.cancel();
        }
    });

    let outcome = converter
        .convert_file(&bytes, document_type, |progress| {
            info!(
                processed = progress.processed_pages,
                total = progress.total_pages,
                "{:.0}% done",
                progress.percent()
            );
        })
        .await?;

    let result = match outcome {
        JobOutcome::Completed(result) => result,
        JobOutcome::Cancelled => {
            eprintln!("Cancelled. No output was written.");
            return Ok(ExitCode::from(EXIT_CANCELLED));
        }
    };

    tokio::fs::write(&args.output, &result.pdf_bytes).await?;
    print_summary(args, &result);

    if let Some(path) = &args.report {
        let report = Report::new(args, &result);
        tokio::fs::write(path, serde_json::to_vec_pretty(&report)?).await?;
        info!(report = %path.display(), "Report written");
    }

    Ok(ExitCode::SUCCESS)
}

fn print_summary(args: &Args, result: &ConversionResult) {
    println!(
        "Wrote {} ({} pages, {} words added, {} skipped)",
        args.output.display(),
        result.pages_processed,
        result.composition.added_items,
        result.composition.skipped_items
    );
    if result.used_fallback_font {
        println!("Note: the text-layer font could not be loaded; non-Latin text was left out.");
    }
    for (engine, summary) in &result.accuracy_summary {
        match summary {
            EngineSummary::Stats {
                avg_confidence,
                total_text_count,
                pages_processed,
            } => println!(
                "  {engine}: {:.1}% average confidence, {total_text_count} words over {pages_processed} pages",
                avg_confidence * 100.0
            ),
            EngineSummary::Failed { error } => println!("  {engine}: failed ({error})"),
        }
    }
    for page in result.page_reports.iter().filter(|p| p.error.is_some()) {
        println!("  page {} has no text layer", page.page_number);
    }
}

/// JSON report written with `--report`.
#[derive(Serialize)]
struct Report<'a> {
    job: &'a JobInfo,
    input: &'a PathBuf,
    output: &'a PathBuf,
    pages_processed: u32,
    used_fallback_font: bool,
    composition: CompositionStats,
    accuracy_summary: &'a BTreeMap<String, EngineSummary>,
    pages: &'a [PageReport],
}

impl<'a> Report<'a> {
    fn new(args: &'a Args, result: &'a ConversionResult) -> Self {
        Self {
            job: &result.job,
            input: &args.input,
            output: &args.output,
            pages_processed: result.pages_processed,
            used_fallback_font: result.used_fallback_font,
            composition: result.composition,
            accuracy_summary: &result.accuracy_summary,
            pages: &result.page_reports,
        }
    }
}
