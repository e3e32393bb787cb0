//! Directory walking implementation using walkdir.

use super::filter::{is_hidden, ExtensionFilter};
use super::{DerivativeRecord, SourceRecord};
use crate::error::ScanError;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

/// Result of walking the source tree
#[derive(Debug, Default)]
pub struct SourceScan {
    /// Records in discovery order
    pub records: Vec<SourceRecord>,
    /// Entries that could not be read (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Result of walking the derivative tree
#[derive(Debug, Default)]
pub struct DerivativeScan {
    /// Records in discovery order
    pub records: Vec<DerivativeRecord>,
    /// Entries that could not be read (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Sorted, filtered walk over one directory tree
pub struct TreeWalker {
    filter: ExtensionFilter,
}

impl TreeWalker {
    pub fn new(filter: ExtensionFilter) -> Self {
        Self { filter }
    }

    /// Walk the source tree and build one `SourceRecord` per accepted file
    pub fn scan_sources(&self, root: &Path) -> Result<SourceScan, ScanError> {
        let mut scan = SourceScan::default();
        self.walk(root, &mut scan.errors, |path, modified| {
            if let Some(record) = SourceRecord::new(root, path, modified) {
                scan.records.push(record);
            }
        })?;
        Ok(scan)
    }

    /// Walk the derivative tree and build one `DerivativeRecord` per accepted file
    pub fn scan_derivatives(&self, root: &Path) -> Result<DerivativeScan, ScanError> {
        let mut scan = DerivativeScan::default();
        self.walk(root, &mut scan.errors, |path, _| {
            if let Some(record) = DerivativeRecord::new(path) {
                scan.records.push(record);
            }
        })?;
        Ok(scan)
    }

    fn walk<F>(
        &self,
        root: &Path,
        errors: &mut Vec<ScanError>,
        mut on_file: F,
    ) -> Result<(), ScanError>
    where
        F: FnMut(&Path, SystemTime),
    {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        let include_hidden = self.filter.includes_hidden();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| keep_entry(entry, include_hidden));

        for entry_result in walker {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    errors.push(walk_error(e));
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.filter.should_include(entry.path()) {
                continue;
            }

            match entry.metadata() {
                Ok(metadata) => {
                    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                    on_file(entry.path(), modified);
                }
                Err(e) => errors.push(walk_error(e)),
            }
        }

        Ok(())
    }
}

fn keep_entry(entry: &DirEntry, include_hidden: bool) -> bool {
    // The root itself is always walked even if it is a dot-directory
    include_hidden || entry.depth() == 0 || !is_hidden(entry.path())
}

fn walk_error(e: walkdir::Error) -> ScanError {
    let path = e.path().map(Path::to_path_buf).unwrap_or_else(PathBuf::new);
    if e.io_error().map(|io| io.kind()) == Some(std::io::ErrorKind::PermissionDenied) {
        ScanError::PermissionDenied { path }
    } else {
        ScanError::ReadDirectory {
            path,
            source: std::io::Error::other(e.to_string()),
        }
    }
}
