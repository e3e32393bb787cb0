//! In-memory read-through cache shared by match workers.

use crate::core::metadata::{MetadataExtractor, MetadataSummary};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Memoises summaries by path behind a single mutex.
///
/// Extraction itself runs outside the lock, so two workers asking for
/// the same path at the same moment may both read it; the first insert
/// wins and both get the same value back.
pub struct ReadThroughCache {
    entries: Mutex<HashMap<PathBuf, MetadataSummary>>,
}

impl ReadThroughCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MetadataSummary>> {
        // A panicking worker cannot leave a half-written summary behind
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, path: &Path) -> Option<MetadataSummary> {
        self.lock().get(path).cloned()
    }

    pub fn insert(&self, path: PathBuf, summary: MetadataSummary) {
        self.lock().insert(path, summary);
    }

    /// Cached summary for `path`, extracting it on first use
    pub fn get_or_extract(&self, path: &Path, extractor: &MetadataExtractor) -> MetadataSummary {
        if let Some(summary) = self.get(path) {
            return summary;
        }
        let summary = extractor.extract(path);
        self.lock()
            .entry(path.to_path_buf())
            .or_insert(summary)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReadThroughCache {
    fn default() -> Self {
        Self::new()
    }
}
