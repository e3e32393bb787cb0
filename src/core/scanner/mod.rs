//! # Scanner Module
//!
//! Walks the source (camera originals) and derivative (exports) trees.
//!
//! ## Ordering
//! Entries are visited sorted by file name within each directory, so the
//! discovery order of sources, and with it "first found wins" matching,
//! is reproducible for a fixed tree.
//!
//! ## Example
//! ```rust,ignore
//! use photo_reconciler::core::scanner::{ExtensionFilter, TreeWalker};
//!
//! let walker = TreeWalker::new(ExtensionFilter::raw_and_jpeg());
//! let scan = walker.scan_sources(Path::new("/photos/originals"))?;
//! ```

mod filter;
mod walker;

pub use filter::{is_raw_extension, ExtensionFilter, EXPORT_EXTENSIONS, RAW_EXTENSIONS};
pub use walker::{DerivativeScan, SourceScan, TreeWalker};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// An original file from the source tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Full path to the file
    pub path: PathBuf,
    /// File name including extension
    pub file_name: String,
    /// File name without its extension
    pub base_name: String,
    /// Path relative to the source root
    pub relative_path: PathBuf,
    /// Last modified time, used for cache freshness
    pub modified: SystemTime,
}

impl SourceRecord {
    /// Build a record for `path` found under `root`.
    ///
    /// Returns `None` when the path has no usable UTF-8 file name or does
    /// not live under `root`.
    pub fn new(root: &Path, path: &Path, modified: SystemTime) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let relative_path = path.strip_prefix(root).ok()?.to_path_buf();
        Some(Self {
            path: path.to_path_buf(),
            base_name: base_name(path)?,
            file_name,
            relative_path,
            modified,
        })
    }

    /// Lower-cased extension, if any
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.path)
    }
}

/// An exported file from the derivative tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivativeRecord {
    /// Full path to the file
    pub path: PathBuf,
    /// File name including extension
    pub file_name: String,
    /// File name without its extension
    pub base_name: String,
}

impl DerivativeRecord {
    pub fn new(path: &Path) -> Option<Self> {
        Some(Self {
            path: path.to_path_buf(),
            file_name: path.file_name()?.to_str()?.to_string(),
            base_name: base_name(path)?,
        })
    }
}

/// A file's name with its extension removed
pub fn base_name(path: &Path) -> Option<String> {
    path.file_stem()?.to_str().map(str::to_string)
}

/// Lower-cased extension of a path
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_drops_only_the_last_extension() {
        assert_eq!(base_name(Path::new("/a/IMG_001.CR2")).unwrap(), "IMG_001");
        assert_eq!(
            base_name(Path::new("/a/IMG_001.edit.jpg")).unwrap(),
            "IMG_001.edit"
        );
        assert_eq!(base_name(Path::new("/a/noext")).unwrap(), "noext");
    }

    #[test]
    fn source_record_keeps_relative_path() {
        let record = SourceRecord::new(
            Path::new("/shoots"),
            Path::new("/shoots/2024/trip/IMG_9.NEF"),
            SystemTime::UNIX_EPOCH,
        )
        .unwrap();

        assert_eq!(record.file_name, "IMG_9.NEF");
        assert_eq!(record.base_name, "IMG_9");
        assert_eq!(record.relative_path, PathBuf::from("2024/trip/IMG_9.NEF"));
        assert_eq!(record.extension().as_deref(), Some("nef"));
    }

    #[test]
    fn source_record_outside_root_is_rejected() {
        assert!(SourceRecord::new(
            Path::new("/shoots"),
            Path::new("/elsewhere/IMG_9.NEF"),
            SystemTime::UNIX_EPOCH,
        )
        .is_none());
    }

    #[test]
    fn derivative_record_splits_name() {
        let record = DerivativeRecord::new(Path::new("/exports/IMG_1_export.jpg")).unwrap();
        assert_eq!(record.file_name, "IMG_1_export.jpg");
        assert_eq!(record.base_name, "IMG_1_export");
    }
}
