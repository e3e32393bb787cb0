//! File filtering logic for the walker.

use std::collections::HashSet;
use std::path::Path;

/// Camera RAW extensions recognised by default on the source side
pub const RAW_EXTENSIONS: &[&str] = &[
    "cr2", "cr3", "crw", "nef", "nrw", "arw", "srf", "sr2", "raf", "orf", "rw2", "pef", "dng",
    "srw", "x3f", "3fr", "iiq", "erf", "mef", "mos", "kdc", "dcr", "rwl",
];

/// Raster formats editors usually export
pub const EXPORT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tif", "tiff", "heic", "heif", "webp",
];

/// Whether an extension (any case) belongs to the RAW family
pub fn is_raw_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    RAW_EXTENSIONS.contains(&ext.as_str())
}

/// Case-insensitive extension allow-list
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    extensions: HashSet<String>,
    include_hidden: bool,
}

impl ExtensionFilter {
    /// Accept exactly the given extensions (leading dots are ignored)
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            include_hidden: false,
        }
    }

    /// RAW formats plus JPEG, the usual contents of a camera card
    pub fn raw_and_jpeg() -> Self {
        Self::new(RAW_EXTENSIONS.iter().chain(["jpg", "jpeg"].iter()))
    }

    /// Common export formats
    pub fn exports() -> Self {
        Self::new(EXPORT_EXTENSIONS)
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn includes_hidden(&self) -> bool {
        self.include_hidden
    }

    /// Check if a file should be included
    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden && is_hidden(path) {
            return false;
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.extensions.contains(&ext.to_ascii_lowercase()),
            None => false,
        }
    }
}

pub(super) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_is_case_insensitive() {
        let filter = ExtensionFilter::new(["CR2", ".jpg"]);
        assert!(filter.should_include(Path::new("/shoot/IMG_1.cr2")));
        assert!(filter.should_include(Path::new("/shoot/IMG_1.CR2")));
        assert!(filter.should_include(Path::new("/shoot/IMG_1.JPG")));
        assert!(!filter.should_include(Path::new("/shoot/IMG_1.xmp")));
    }

    #[test]
    fn filter_excludes_hidden_by_default() {
        let filter = ExtensionFilter::raw_and_jpeg();
        assert!(!filter.should_include(Path::new("/shoot/._IMG_1.CR2")));
        assert!(filter
            .clone()
            .with_hidden(true)
            .should_include(Path::new("/shoot/._IMG_1.CR2")));
    }

    #[test]
    fn filter_handles_no_extension() {
        let filter = ExtensionFilter::exports();
        assert!(!filter.should_include(Path::new("/exports/README")));
    }

    #[test]
    fn raw_family_detection() {
        assert!(is_raw_extension("NEF"));
        assert!(is_raw_extension("dng"));
        assert!(!is_raw_extension("jpg"));
    }
}
