//! # Source Index
//!
//! Groups source records by base name. Several files may share a stem
//! (`IMG_1.CR2` + `IMG_1.JPG`, or the same frame number from two shoots);
//! each group keeps discovery order so the first-found source wins ties.

use crate::core::scanner::SourceRecord;
use std::collections::HashMap;

/// Multi-map from base name to the sources sharing it
#[derive(Debug, Default)]
pub struct SourceIndex {
    by_base_name: HashMap<String, Vec<SourceRecord>>,
    total: usize,
}

impl SourceIndex {
    /// Build the index. Never fails; empty input gives an empty index.
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = SourceRecord>,
    {
        let mut index = SourceIndex::default();
        for record in records {
            index
                .by_base_name
                .entry(record.base_name.clone())
                .or_default()
                .push(record);
            index.total += 1;
        }
        index
    }

    /// Candidates for `base_name`, in discovery order
    pub fn candidates(&self, base_name: &str) -> &[SourceRecord] {
        self.by_base_name
            .get(base_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of indexed records
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of distinct base names
    pub fn distinct_names(&self) -> usize {
        self.by_base_name.len()
    }
}
