// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-engine accuracy summary for a job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How one engine fared across a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EngineSummary {
    Stats {
        /// Mean of the per-page average confidences, over pages where the
        /// engine kept at least one word.
        avg_confidence: f64,
        total_text_count: usize,
        pages_processed: u32,
    },
    /// The engine never produced a usable result.
    Failed { error: String },
}

#[derive(Debug, Default)]
struct EngineTally {
    confidence_sum: f64,
    text_count: usize,
    pages: u32,
    first_error: Option<String>,
}

/// Collects per-page engine outcomes and folds them into [`EngineSummary`]s.
#[derive(Debug, Default)]
pub struct AccuracyTracker {
    order: Vec<String>,
    tallies: BTreeMap<String, EngineTally>,
}

impl AccuracyTracker {
    /// Track `engines`, reported in the given order.
    pub fn new<I, S>(engines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tracker = Self::default();
        for name in engines {
            let name = name.into();
            tracker.tallies.entry(name.clone()).or_default();
            tracker.order.push(name);
        }
        tracker
    }

    /// Record a page the engine recognised. Pages without kept words do not
    /// count towards the average.
    pub fn record_page(&mut self, engine: &str, avg_confidence: Option<f64>, text_count: usize) {
        let Some(avg) = avg_confidence else {
            return;
        };
        let tally = self.tally(engine);
        tally.confidence_sum += avg;
        tally.text_count += text_count;
        tally.pages += 1;
    }

    /// Record a failed page. Only the first error per engine is kept.
    pub fn record_error(&mut self, engine: &str, error: impl Into<String>) {
        let tally = self.tally(engine);
        if tally.first_error.is_none() {
            tally.first_error = Some(error.into());
        }
    }

    pub fn finish(self) -> BTreeMap<String, EngineSummary> {
        let mut tallies = self.tallies;
        self.order
            .into_iter()
            .filter_map(|name| {
                let tally = tallies.remove(&name)?;
                let summary = match (tally.pages, tally.first_error) {
                    (0, Some(error)) => EngineSummary::Failed { error },
                    (pages, _) => EngineSummary::Stats {
                        avg_confidence: if pages == 0 {
                            0.0
                        } else {
                            tally.confidence_sum / f64::from(pages)
                        },
                        total_text_count: tally.text_count,
                        pages_processed: pages,
                    },
                };
                Some((name, summary))
            })
            .collect()
    }

    fn tally(&mut self, engine: &str) -> &mut EngineTally {
        if !self.tallies.contains_key(engine) {
            self.order.push(engine.to_string());
        }
        self.tallies.entry(engine.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_over_pages_with_text() {
        let mut tracker = AccuracyTracker::new(["paddle", "surya"]);
        tracker.record_page("paddle", Some(0.9), 10);
        tracker.record_page("paddle", Some(0.7), 4);
        tracker.record_page("paddle", None, 0);
        tracker.record_page("surya", Some(0.6), 3);

        let summary = tracker.finish();
        match &summary["paddle"] {
            EngineSummary::Stats {
                avg_confidence,
                total_text_count,
                pages_processed,
            } => {
                assert!((avg_confidence - 0.8).abs() < 1e-9);
                assert_eq!(*total_text_count, 14);
                assert_eq!(*pages_processed, 2);
            }
            other => panic!("unexpected summary: {other:?}"),
        }
        assert!(matches!(summary["surya"], EngineSummary::Stats { pages_processed: 1, .. }));
    }

    #[test]
    fn engine_that_always_failed_reports_its_error() {
        let mut tracker = AccuracyTracker::new(["remote"]);
        tracker.record_error("remote", "connection refused");
        tracker.record_error("remote", "timed out");

        let summary = tracker.finish();
        assert_eq!(
            summary["remote"],
            EngineSummary::Failed {
                error: "connection refused".into()
            }
        );
    }

    #[test]
    fn occasional_failure_still_reports_stats() {
        let mut tracker = AccuracyTracker::new(["remote"]);
        tracker.record_error("remote", "timed out");
        tracker.record_page("remote", Some(0.5), 2);
        assert!(matches!(
            tracker.finish()["remote"],
            EngineSummary::Stats { pages_processed: 1, .. }
        ));
    }

    #[test]
    fn serializes_as_plain_objects() {
        let mut tracker = AccuracyTracker::new(["a", "b"]);
        tracker.record_page("a", Some(1.0), 1);
        tracker.record_error("b", "boom");

        let json = serde_json::to_value(tracker.finish()).unwrap();
        assert_eq!(json["a"]["total_text_count"], 1);
        assert_eq!(json["b"]["error"], "boom");
    }
}
