//! # Cache Module
//!
//! Persists source metadata between runs.
//!
//! ## Freshness
//! The cache file for a source tree is reused only when it is at least as
//! new as every source file, carries the current schema version and
//! fingerprint, and covers every source path. Anything else (stale,
//! unreadable, foreign, partial) triggers a full rebuild.
//!
//! ## Backends
//! - `SqliteStore` - the persisted per-tree cache file
//! - `ReadThroughCache` - in-memory memo for derivative summaries

mod memory;
mod sqlite;

pub use memory::ReadThroughCache;
pub use sqlite::SqliteStore;

use crate::core::metadata::{MetadataExtractor, MetadataSummary};
use crate::core::scanner::SourceRecord;
use crate::core::scheduler::{run_chunked, CancellationToken, ChunkPlan};
use crate::error::Result;
use crate::events::{EventSender, PipelinePhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use xxhash_rust::xxh3::xxh3_64;

/// Bumped whenever the on-disk layout changes
pub const SCHEMA_VERSION: u32 = 1;

/// Directory under the output root holding cache files
pub const CACHE_DIR_NAME: &str = ".photo-reconciler";

/// Everything persisted for one source tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataCacheEntry {
    pub fingerprint: String,
    pub summaries: HashMap<PathBuf, MetadataSummary>,
    pub built_at: DateTime<Utc>,
}

/// Identifier of a source tree, derived from its root path
pub fn fingerprint(source_root: &Path) -> String {
    format!("{:016x}", xxh3_64(source_root.to_string_lossy().as_bytes()))
}

/// Deterministic cache file location for `source_root` under `output_root`
pub fn cache_file_path(output_root: &Path, source_root: &Path) -> PathBuf {
    output_root
        .join(CACHE_DIR_NAME)
        .join(format!("metadata-{}.db", fingerprint(source_root)))
}

/// Where the summaries handed back by `MetadataCache::get` came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
    /// Loaded from a fresh cache file
    Disk,
    /// Extracted in this run and persisted
    Rebuilt,
    /// Extraction was cancelled; the map is partial and was not persisted
    Partial,
}

/// Summaries for a set of sources, and how they were obtained
#[derive(Debug)]
pub struct CacheLoad {
    pub summaries: HashMap<PathBuf, MetadataSummary>,
    pub source: CacheSource,
}

/// The per-source-tree metadata cache
pub struct MetadataCache {
    fingerprint: String,
    store: SqliteStore,
}

impl MetadataCache {
    pub fn new(source_root: &Path, output_root: &Path) -> Self {
        Self {
            fingerprint: fingerprint(source_root),
            store: SqliteStore::new(cache_file_path(output_root, source_root)),
        }
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Cache file is at least as new as the newest source
    pub fn is_fresh(&self, sources: &[SourceRecord]) -> bool {
        let Ok(cache_modified) = fs::metadata(self.path()).and_then(|m| m.modified()) else {
            return false;
        };
        let newest_source = sources
            .iter()
            .map(|s| s.modified)
            .max()
            .unwrap_or(SystemTime::UNIX_EPOCH);
        cache_modified >= newest_source
    }

    /// Load a fresh, complete entry. Every failure reads as "absent".
    pub fn load(&self, sources: &[SourceRecord]) -> Option<MetadataCacheEntry> {
        if !self.is_fresh(sources) {
            tracing::debug!("metadata cache {} missing or stale", self.path().display());
            return None;
        }

        match self.store.load(&self.fingerprint) {
            Ok(entry) if sources.iter().all(|s| entry.summaries.contains_key(&s.path)) => {
                Some(entry)
            }
            Ok(_) => {
                tracing::debug!("metadata cache {} does not cover every source", self.path().display());
                None
            }
            Err(e) => {
                tracing::debug!("ignoring metadata cache {}: {}", self.path().display(), e);
                None
            }
        }
    }

    /// Summaries for `sources`, from disk when fresh, otherwise extracted
    /// through the scheduler and persisted (best effort).
    pub fn get(
        &self,
        sources: &[SourceRecord],
        extractor: &MetadataExtractor,
        plan: ChunkPlan,
        token: &CancellationToken,
        events: &EventSender,
    ) -> Result<CacheLoad> {
        if let Some(entry) = self.load(sources) {
            events.info(format!(
                "Loaded metadata for {} files from cache (built {})",
                entry.summaries.len(),
                entry.built_at.format("%Y-%m-%d %H:%M")
            ));
            events.progress(PipelinePhase::ExtractingMetadata, 1, 1);
            return Ok(CacheLoad {
                summaries: entry.summaries,
                source: CacheSource::Disk,
            });
        }

        events.info(format!("Reading metadata from {} source files", sources.len()));
        let run = run_chunked(
            sources,
            plan,
            token,
            |processed, total| events.progress(PipelinePhase::ExtractingMetadata, processed, total),
            |source, _| (source.path.clone(), extractor.extract(&source.path)),
        )?;

        let summaries: HashMap<_, _> = run.results.into_iter().collect();
        if run.cancelled {
            return Ok(CacheLoad {
                summaries,
                source: CacheSource::Partial,
            });
        }

        let entry = MetadataCacheEntry {
            fingerprint: self.fingerprint.clone(),
            summaries,
            built_at: Utc::now(),
        };
        if let Err(e) = self.store.save(&entry) {
            events.warn(format!("Could not save metadata cache: {}", e));
        }

        Ok(CacheLoad {
            summaries: entry.summaries,
            source: CacheSource::Rebuilt,
        })
    }

    /// Remove the persisted file for this source tree
    pub fn clear(&self) -> Result<bool> {
        Ok(self.store.remove()?)
    }
}
