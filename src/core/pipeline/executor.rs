//! Pipeline execution implementation.

use super::config::ReconcileConfig;
use crate::core::cache::{CacheSource, MetadataCache, ReadThroughCache};
use crate::core::index::SourceIndex;
use crate::core::matcher::{MatchResult, MatchTier, Matcher, MetadataContext};
use crate::core::metadata::{MetadataExtractor, MetadataSummary};
use crate::core::relocate::{RelocationReport, Relocator};
use crate::core::scanner::{ExtensionFilter, TreeWalker};
use crate::core::scheduler::{run_chunked, CancellationToken};
use crate::error::Result;
use crate::events::{null_sender, Event, EventSender, PipelineEvent, PipelinePhase, Severity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

/// How many derivatives each tier resolved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub exact: usize,
    pub suffix_stripped: usize,
    pub canonical: usize,
}

impl TierCounts {
    fn count(&mut self, tier: MatchTier) {
        match tier {
            MatchTier::Exact => self.exact += 1,
            MatchTier::SuffixStripped => self.suffix_stripped += 1,
            MatchTier::Canonical => self.canonical += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.exact + self.suffix_stripped + self.canonical
    }
}

/// Result of a reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub run_id: Uuid,
    pub total_sources: usize,
    pub total_derivatives: usize,
    /// One result per derivative that reached the match phase
    pub matches: Vec<MatchResult>,
    pub matched_by_tier: TierCounts,
    pub unmatched: usize,
    pub relocation: RelocationReport,
    /// Where source metadata came from, when metadata comparison ran
    pub metadata_source: Option<CacheSource>,
    pub cancelled: bool,
    pub dry_run: bool,
    /// Non-fatal problems (unreadable entries and the like)
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl ReconcileReport {
    /// One-line summary for the completion signal
    pub fn summary_message(&self) -> String {
        if self.cancelled {
            return format!(
                "Cancelled after matching {} of {} derivatives; nothing was moved",
                self.matches.len(),
                self.total_derivatives
            );
        }
        let verb = if self.dry_run { "Would move" } else { "Moved" };
        format!(
            "{} {} of {} derivatives ({} unmatched, {} failed)",
            verb,
            self.relocation.moved,
            self.total_derivatives,
            self.unmatched,
            self.relocation.failed
        )
    }
}

/// Builder for a reconciler
pub struct ReconcilerBuilder {
    config: ReconcileConfig,
}

impl ReconcilerBuilder {
    pub fn new() -> Self {
        Self {
            config: ReconcileConfig::default(),
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    pub fn source_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source_root = path.into();
        self
    }

    pub fn derivative_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.derivative_root = path.into();
        self
    }

    pub fn output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_root = path.into();
        self
    }

    /// Enable the suffix-stripped tier with `suffix`
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.use_suffix = true;
        self.config.suffix_text = suffix.into();
        self
    }

    pub fn check_without_suffix(mut self, check: bool) -> Self {
        self.config.check_without_suffix = check;
        self
    }

    pub fn compare_metadata(mut self, compare: bool) -> Self {
        self.config.compare_metadata = compare;
        self
    }

    pub fn max_workers(mut self, workers: usize) -> Self {
        self.config.max_workers = workers;
        self
    }

    pub fn retries(mut self, max_retries: u32, delay_seconds: f64) -> Self {
        self.config.max_retries = max_retries;
        self.config.retry_delay_seconds = delay_seconds;
        self
    }

    pub fn source_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.source_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn match_chunk_size(mut self, size: usize) -> Self {
        self.config.match_chunk_size = size;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.config.dry_run = dry_run;
        self
    }

    pub fn build(self) -> Reconciler {
        Reconciler {
            config: self.config,
        }
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The derivative-to-source reconciliation pipeline
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn builder() -> ReconcilerBuilder {
        ReconcilerBuilder::new()
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Run without events or cancellation
    pub fn run(&self) -> Result<ReconcileReport> {
        self.run_with_events(&null_sender(), &CancellationToken::new())
    }

    /// Run with event reporting and cooperative cancellation.
    ///
    /// Only configuration errors are returned as `Err`; they are detected
    /// before anything is read or written.
    pub fn run_with_events(
        &self,
        events: &EventSender,
        token: &CancellationToken,
    ) -> Result<ReconcileReport> {
        let start_time = Instant::now();
        let config = &self.config;

        if let Err(e) = config.validate() {
            events.log(Severity::Error, e.to_string());
            events.send(Event::Pipeline(PipelineEvent::Completed {
                success: false,
                summary: e.to_string(),
            }));
            return Err(e.into());
        }

        events.send(Event::Pipeline(PipelineEvent::Started));
        let mut report = ReconcileReport {
            run_id: Uuid::new_v4(),
            total_sources: 0,
            total_derivatives: 0,
            matches: Vec::new(),
            matched_by_tier: TierCounts::default(),
            unmatched: 0,
            relocation: RelocationReport::default(),
            metadata_source: None,
            cancelled: false,
            dry_run: config.dry_run,
            errors: Vec::new(),
            duration_ms: 0,
        };

        // Phase 1: Scanning
        enter_phase(events, PipelinePhase::Scanning);
        let source_walker = TreeWalker::new(
            ExtensionFilter::new(&config.source_extensions).with_hidden(config.include_hidden),
        );
        let derivative_walker = TreeWalker::new(
            ExtensionFilter::new(&config.derivative_extensions)
                .with_hidden(config.include_hidden),
        );

        let source_scan = source_walker.scan_sources(&config.source_root)?;
        let derivative_scan = derivative_walker.scan_derivatives(&config.derivative_root)?;
        for error in source_scan.errors.iter().chain(derivative_scan.errors.iter()) {
            events.warn(error.to_string());
            report.errors.push(error.to_string());
        }

        let sources = source_scan.records;
        let derivatives = derivative_scan.records;
        report.total_sources = sources.len();
        report.total_derivatives = derivatives.len();
        events.info(format!(
            "Found {} source files and {} derivatives",
            sources.len(),
            derivatives.len()
        ));
        events.progress(PipelinePhase::Scanning, 1, 1);

        // Phase 2: Indexing
        enter_phase(events, PipelinePhase::Indexing);
        let index = SourceIndex::build(sources.iter().cloned());
        tracing::debug!(
            "indexed {} sources under {} base names",
            index.len(),
            index.distinct_names()
        );
        events.progress(PipelinePhase::Indexing, 1, 1);

        if token.is_cancelled() {
            return Ok(self.finish_cancelled(report, events, start_time));
        }

        let extractor = MetadataExtractor::new(config.retry_policy(), events.clone());

        // Phase 3: Metadata (only when it can change the outcome)
        let source_metadata: Option<HashMap<PathBuf, MetadataSummary>> = if config.compare_metadata {
            enter_phase(events, PipelinePhase::ExtractingMetadata);
            let cache = MetadataCache::new(&config.source_root, &config.output_root);
            let load = cache.get(
                &sources,
                &extractor,
                config.extraction_plan(),
                token,
                events,
            )?;
            report.metadata_source = Some(load.source);
            if load.source == CacheSource::Partial {
                return Ok(self.finish_cancelled(report, events, start_time));
            }
            Some(load.summaries)
        } else {
            None
        };

        // Phase 4: Matching
        enter_phase(events, PipelinePhase::Matching);
        let derivative_cache = ReadThroughCache::new();
        let matcher = match source_metadata {
            Some(ref summaries) => Matcher::with_metadata(
                &index,
                config.match_options(),
                MetadataContext {
                    sources: summaries,
                    derivatives: &derivative_cache,
                    extractor: &extractor,
                },
            ),
            None => Matcher::new(&index, config.match_options()),
        };

        let run = run_chunked(
            &derivatives,
            config.match_plan(),
            token,
            |processed, total| events.progress(PipelinePhase::Matching, processed, total),
            |derivative, _| matcher.resolve(derivative),
        )?;

        for result in &run.results {
            match result.tier_used {
                Some(tier) => report.matched_by_tier.count(tier),
                None => {
                    report.unmatched += 1;
                    events.info(format!("No source found for {}", result.derivative.file_name));
                }
            }
        }
        report.matches = run.results;

        if run.cancelled {
            return Ok(self.finish_cancelled(report, events, start_time));
        }

        // Phase 5: Relocating
        enter_phase(events, PipelinePhase::Relocating);
        report.relocation = Relocator::new(&config.source_root, &config.output_root)
            .dry_run(config.dry_run)
            .relocate(&report.matches, events);

        report.duration_ms = start_time.elapsed().as_millis() as u64;
        let summary = report.summary_message();
        events.info(summary.clone());
        events.send(Event::Pipeline(PipelineEvent::Completed {
            success: true,
            summary,
        }));

        Ok(report)
    }

    fn finish_cancelled(
        &self,
        mut report: ReconcileReport,
        events: &EventSender,
        start_time: Instant,
    ) -> ReconcileReport {
        report.cancelled = true;
        report.duration_ms = start_time.elapsed().as_millis() as u64;
        events.send(Event::Pipeline(PipelineEvent::Cancelled));
        events.send(Event::Pipeline(PipelineEvent::Completed {
            success: false,
            summary: report.summary_message(),
        }));
        report
    }
}

fn enter_phase(events: &EventSender, phase: PipelinePhase) {
    events.send(Event::Pipeline(PipelineEvent::PhaseChanged { phase }));
    events.progress(phase, 0, 1);
}
