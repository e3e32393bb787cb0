//! # Matcher Module
//!
//! Resolves a derivative to at most one source through ranked tiers:
//!
//! 1. **Exact** - the derivative's base name as-is
//! 2. **Suffix stripped** - base name minus the configured export suffix
//! 3. **Canonical** - base name minus a duplicate marker (`-1`, `_3`, ...),
//!    only with metadata comparison on, since it is the weakest signal
//!
//! A tier succeeds when it has candidates and, with metadata comparison
//! on, one of them shares the derivative's `DateTimeOriginal`. The first
//! acceptable candidate wins; there is no scoring. A source may be the
//! target of several derivatives.

mod canonical;

pub use canonical::canonical_name;

use crate::core::cache::ReadThroughCache;
use crate::core::index::SourceIndex;
use crate::core::metadata::{MetadataExtractor, MetadataSummary};
use crate::core::scanner::{DerivativeRecord, SourceRecord};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::HashMap;
use std::path::PathBuf;

/// Which tier produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    SuffixStripped,
    Canonical,
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchTier::Exact => write!(f, "exact name"),
            MatchTier::SuffixStripped => write!(f, "suffix stripped"),
            MatchTier::Canonical => write!(f, "canonical name"),
        }
    }
}

/// Outcome of resolving one derivative
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub derivative: DerivativeRecord,
    pub matched_source: Option<SourceRecord>,
    pub tier_used: Option<MatchTier>,
}

impl MatchResult {
    pub fn unmatched(derivative: DerivativeRecord) -> Self {
        Self {
            derivative,
            matched_source: None,
            tier_used: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.matched_source.is_some()
    }
}

/// The naming options that shape the tier plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOptions {
    pub use_suffix: bool,
    pub suffix_text: String,
    pub check_without_suffix: bool,
    pub compare_metadata: bool,
}

impl MatchOptions {
    /// Ordered `(tier, lookup key)` pairs to try for `base_name`
    pub fn tier_plan(&self, base_name: &str) -> Vec<(MatchTier, String)> {
        let stripped = self.strip_suffix(base_name);
        let mut plan = Vec::with_capacity(4);

        if stripped.is_none() || self.check_without_suffix {
            plan.push((MatchTier::Exact, base_name.to_string()));
        }
        if let Some(stem) = stripped {
            plan.push((MatchTier::SuffixStripped, stem.to_string()));
        }

        if self.compare_metadata {
            for name in std::iter::once(base_name).chain(stripped) {
                if let Some(stem) = canonical_name(name) {
                    if !plan.iter().any(|(_, key)| key == stem) {
                        plan.push((MatchTier::Canonical, stem.to_string()));
                    }
                }
            }
        }

        plan
    }

    fn strip_suffix<'a>(&self, base_name: &'a str) -> Option<&'a str> {
        if !self.use_suffix || self.suffix_text.is_empty() {
            return None;
        }
        base_name
            .strip_suffix(self.suffix_text.as_str())
            .filter(|stem| !stem.is_empty())
    }
}

/// Metadata available to the matcher when comparison is on
pub struct MetadataContext<'a> {
    /// Immutable snapshot of source summaries
    pub sources: &'a HashMap<PathBuf, MetadataSummary>,
    /// Memoised derivative summaries, shared by workers
    pub derivatives: &'a ReadThroughCache,
    pub extractor: &'a MetadataExtractor,
}

/// Resolves derivatives against a read-only index
pub struct Matcher<'a> {
    index: &'a SourceIndex,
    options: MatchOptions,
    metadata: Option<MetadataContext<'a>>,
}

impl<'a> Matcher<'a> {
    /// Name-only matcher. Metadata comparison is forced off.
    pub fn new(index: &'a SourceIndex, options: MatchOptions) -> Self {
        Self {
            index,
            options: MatchOptions {
                compare_metadata: false,
                ..options
            },
            metadata: None,
        }
    }

    /// Matcher that confirms candidates by capture time
    pub fn with_metadata(
        index: &'a SourceIndex,
        options: MatchOptions,
        metadata: MetadataContext<'a>,
    ) -> Self {
        Self {
            index,
            options: MatchOptions {
                compare_metadata: true,
                ..options
            },
            metadata: Some(metadata),
        }
    }

    /// Resolve one derivative
    pub fn resolve(&self, derivative: &DerivativeRecord) -> MatchResult {
        let derivative_summary = OnceCell::new();

        for (tier, key) in self.options.tier_plan(&derivative.base_name) {
            let candidates = self.index.candidates(&key);
            if candidates.is_empty() {
                continue;
            }

            let chosen = match self.metadata {
                None => candidates.first(),
                Some(ref context) => {
                    let own = derivative_summary.get_or_init(|| {
                        context
                            .derivatives
                            .get_or_extract(&derivative.path, context.extractor)
                    });
                    candidates.iter().find(|candidate| {
                        context
                            .sources
                            .get(&candidate.path)
                            .is_some_and(|summary| summary.same_capture_time(own))
                    })
                }
            };

            if let Some(source) = chosen {
                tracing::debug!(
                    "{} -> {} ({})",
                    derivative.file_name,
                    source.relative_path.display(),
                    tier
                );
                return MatchResult {
                    derivative: derivative.clone(),
                    matched_source: Some(source.clone()),
                    tier_used: Some(tier),
                };
            }
        }

        MatchResult::unmatched(derivative.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::{MetadataTag, RetryPolicy};
    use crate::events::null_sender;
    use std::path::Path;
    use std::time::SystemTime;

    fn source(relative: &str) -> SourceRecord {
        let root = Path::new("/src");
        SourceRecord::new(root, &root.join(relative), SystemTime::UNIX_EPOCH).unwrap()
    }

    fn derivative(name: &str) -> DerivativeRecord {
        DerivativeRecord::new(&Path::new("/exports").join(name)).unwrap()
    }

    fn dated(value: &str) -> MetadataSummary {
        let mut summary = MetadataSummary::default();
        summary.record(MetadataTag::DateTimeOriginal, value.as_bytes());
        summary
    }

    fn suffix_options(suffix: &str) -> MatchOptions {
        MatchOptions {
            use_suffix: true,
            suffix_text: suffix.to_string(),
            check_without_suffix: true,
            compare_metadata: false,
        }
    }

    #[test]
    fn exact_match_takes_first_candidate() {
        let index = SourceIndex::build(vec![source("A/IMG_1.CR2"), source("B/IMG_1.JPG")]);
        let matcher = Matcher::new(&index, MatchOptions::default());

        let result = matcher.resolve(&derivative("IMG_1.jpg"));

        assert_eq!(result.tier_used, Some(MatchTier::Exact));
        assert_eq!(
            result.matched_source.unwrap().relative_path,
            PathBuf::from("A/IMG_1.CR2")
        );
    }

    #[test]
    fn suffix_tier_resolves_when_exact_fails() {
        let index = SourceIndex::build(vec![source("IMG_001.CR2")]);
        let matcher = Matcher::new(&index, suffix_options("_export"));

        let result = matcher.resolve(&derivative("IMG_001_export.jpg"));

        assert_eq!(result.tier_used, Some(MatchTier::SuffixStripped));
        assert!(result.is_matched());
    }

    #[test]
    fn suffix_is_ignored_when_disabled() {
        let index = SourceIndex::build(vec![source("IMG_001.CR2")]);
        let options = MatchOptions {
            use_suffix: false,
            ..suffix_options("_export")
        };
        let matcher = Matcher::new(&index, options);

        assert!(!matcher.resolve(&derivative("IMG_001_export.jpg")).is_matched());
    }

    #[test]
    fn tier_plan_respects_check_without_suffix() {
        let mut options = suffix_options("_edit");
        let tiers: Vec<_> = options
            .tier_plan("IMG_1_edit")
            .into_iter()
            .map(|(tier, _)| tier)
            .collect();
        assert_eq!(tiers, vec![MatchTier::Exact, MatchTier::SuffixStripped]);

        options.check_without_suffix = false;
        let plan = options.tier_plan("IMG_1_edit");
        assert_eq!(plan, vec![(MatchTier::SuffixStripped, "IMG_1".to_string())]);

        // Names without the suffix always try the exact tier
        assert_eq!(
            options.tier_plan("IMG_1"),
            vec![(MatchTier::Exact, "IMG_1".to_string())]
        );
    }

    #[test]
    fn canonical_tier_needs_metadata_comparison() {
        let options = MatchOptions::default();
        assert!(options
            .tier_plan("IMG_002-1")
            .iter()
            .all(|(tier, _)| *tier != MatchTier::Canonical));

        let index = SourceIndex::build(vec![source("IMG_002.CR2")]);
        let matcher = Matcher::new(&index, options);
        assert!(!matcher.resolve(&derivative("IMG_002-1.jpg")).is_matched());
    }

    fn metadata_matcher_result(
        source_time: &str,
        derivative_time: &str,
        name: &str,
    ) -> MatchResult {
        let src = source("IMG_002.CR2");
        let index = SourceIndex::build(vec![src.clone()]);
        let sources = HashMap::from([(src.path.clone(), dated(source_time))]);
        let derivative = derivative(name);
        let derivatives = ReadThroughCache::new();
        derivatives.insert(derivative.path.clone(), dated(derivative_time));
        let extractor = MetadataExtractor::new(RetryPolicy::default(), null_sender());

        let matcher = Matcher::with_metadata(
            &index,
            MatchOptions::default(),
            MetadataContext {
                sources: &sources,
                derivatives: &derivatives,
                extractor: &extractor,
            },
        );
        matcher.resolve(&derivative)
    }

    #[test]
    fn canonical_tier_resolves_with_matching_capture_time() {
        let result =
            metadata_matcher_result("2024:01:01 10:00:00", "2024:01:01 10:00:00", "IMG_002-1.jpg");
        assert_eq!(result.tier_used, Some(MatchTier::Canonical));
        assert!(result.is_matched());
    }

    #[test]
    fn mismatched_capture_time_fails_every_tier() {
        let result =
            metadata_matcher_result("2024:01:01 10:00:00", "2024:01:01 10:00:01", "IMG_002-1.jpg");
        assert!(!result.is_matched());
        assert_eq!(result.tier_used, None);
    }

    #[test]
    fn metadata_picks_the_confirmed_candidate() {
        let first = source("A/IMG_5.CR2");
        let second = source("B/IMG_5.CR2");
        let index = SourceIndex::build(vec![first.clone(), second.clone()]);
        let sources = HashMap::from([
            (first.path.clone(), dated("2020:01:01 00:00:00")),
            (second.path.clone(), dated("2021:06:01 12:00:00")),
        ]);
        let derivative = derivative("IMG_5.jpg");
        let derivatives = ReadThroughCache::new();
        derivatives.insert(derivative.path.clone(), dated("2021:06:01 12:00:00"));
        let extractor = MetadataExtractor::new(RetryPolicy::default(), null_sender());

        let matcher = Matcher::with_metadata(
            &index,
            MatchOptions::default(),
            MetadataContext {
                sources: &sources,
                derivatives: &derivatives,
                extractor: &extractor,
            },
        );
        let result = matcher.resolve(&derivative);

        assert_eq!(result.matched_source, Some(second));
        assert_eq!(result.tier_used, Some(MatchTier::Exact));
    }

    #[test]
    fn many_derivatives_may_share_one_source() {
        let index = SourceIndex::build(vec![source("IMG_9.CR2")]);
        let matcher = Matcher::new(&index, suffix_options("_bw"));

        let color = matcher.resolve(&derivative("IMG_9.jpg"));
        let mono = matcher.resolve(&derivative("IMG_9_bw.jpg"));

        assert_eq!(color.matched_source, mono.matched_source);
        assert!(color.is_matched());
    }
}
