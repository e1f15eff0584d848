// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the per-page bookkeeping in ocrlayer-pipeline:
// confidence filtering and the accuracy summary.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use ocrlayer_core::{BoundingBox, OcrWord};
use ocrlayer_pipeline::{AccuracyTracker, filter_words};

/// A dense page where every seventh word is blank and every fifth is faint.
fn noisy_words(count: usize) -> Vec<OcrWord> {
    (0..count)
        .map(|i| OcrWord {
            text: if i % 7 == 0 { " ".into() } else { format!("w{i}") },
            bbox: BoundingBox::new(i as f64, 0.0, i as f64 + 10.0, 12.0),
            confidence: if i % 5 == 0 { 0.2 } else { 0.93 },
        })
        .collect()
}

fn bench_filter(c: &mut Criterion) {
    let words = noisy_words(2000);
    c.bench_function("filter_words (2000 words)", |b| {
        b.iter(|| black_box(filter_words(black_box(words.clone()), 0.5)));
    });
}

fn bench_summary(c: &mut Criterion) {
    c.bench_function("accuracy summary (3 engines x 500 pages)", |b| {
        b.iter(|| {
            let mut tracker = AccuracyTracker::new(["paddle", "surya", "ocrs"]);
            for page in 0..500u32 {
                tracker.record_page("paddle", Some(0.9), 120);
                tracker.record_page("surya", Some(0.8), 118);
                if page % 50 == 0 {
                    tracker.record_error("ocrs", "timed out");
                } else {
                    tracker.record_page("ocrs", Some(1.0), 110);
                }
            }
            black_box(tracker.finish())
        });
    });
}

criterion_group!(benches, bench_filter, bench_summary);
criterion_main!(benches);
