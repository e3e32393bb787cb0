//! Run configuration.

use crate::core::matcher::MatchOptions;
use crate::core::metadata::RetryPolicy;
use crate::core::scanner::{EXPORT_EXTENSIONS, RAW_EXTENSIONS};
use crate::core::scheduler::ChunkPlan;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a reconciliation run needs, as supplied by the front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Tree of camera originals
    pub source_root: PathBuf,
    /// Tree of exported derivatives
    pub derivative_root: PathBuf,
    /// Where relocated derivatives (and the cache) go
    pub output_root: PathBuf,

    /// Enable the suffix-stripped tier
    pub use_suffix: bool,
    /// Suffix editors add to exports, e.g. `_export`
    pub suffix_text: String,
    /// With suffix handling on, try the full name before stripping
    pub check_without_suffix: bool,
    /// Confirm candidates by `DateTimeOriginal`; enables the canonical tier
    pub compare_metadata: bool,

    /// Worker cap for the match phase
    pub max_workers: usize,
    /// Attempts per metadata read
    pub max_retries: u32,
    /// Initial backoff between attempts, doubled each time
    pub retry_delay_seconds: f64,

    /// Case-insensitive allow-list for the source walk
    pub source_extensions: BTreeSet<String>,
    /// Case-insensitive allow-list for the derivative walk
    pub derivative_extensions: BTreeSet<String>,
    pub include_hidden: bool,

    pub extraction_chunk_size: usize,
    /// Kept low to avoid disk contention
    pub extraction_workers: usize,
    pub match_chunk_size: usize,

    /// Match and report, but move nothing
    pub dry_run: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::new(),
            derivative_root: PathBuf::new(),
            output_root: PathBuf::new(),
            use_suffix: false,
            suffix_text: String::new(),
            check_without_suffix: true,
            compare_metadata: false,
            max_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            max_retries: 3,
            retry_delay_seconds: 0.1,
            source_extensions: RAW_EXTENSIONS
                .iter()
                .chain(["jpg", "jpeg"].iter())
                .map(|e| e.to_string())
                .collect(),
            derivative_extensions: EXPORT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            include_hidden: false,
            extraction_chunk_size: 64,
            extraction_workers: 2,
            match_chunk_size: 256,
            dry_run: false,
        }
    }
}

impl ReconcileConfig {
    /// Config for three roots with everything else at defaults
    pub fn new(
        source_root: impl Into<PathBuf>,
        derivative_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            derivative_root: derivative_root.into(),
            output_root: output_root.into(),
            ..Default::default()
        }
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let unreadable = |reason: String| ConfigError::Unreadable {
            path: path.to_path_buf(),
            reason,
        };
        let raw = fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| unreadable(e.to_string()))
    }

    /// Check everything that would otherwise fail halfway through a run.
    ///
    /// Touches nothing on disk.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, path) in [
            ("source_root", &self.source_root),
            ("derivative_root", &self.derivative_root),
            ("output_root", &self.output_root),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::MissingPath { field });
            }
        }

        for (field, path) in [
            ("source_root", &self.source_root),
            ("derivative_root", &self.derivative_root),
        ] {
            if !path.is_dir() {
                return Err(ConfigError::NotADirectory {
                    field,
                    path: path.clone(),
                });
            }
        }
        if self.output_root.exists() && !self.output_root.is_dir() {
            return Err(ConfigError::NotADirectory {
                field: "output_root",
                path: self.output_root.clone(),
            });
        }

        let output = resolve_path(&self.output_root);
        for (field, root) in [
            ("source_root", &self.source_root),
            ("derivative_root", &self.derivative_root),
        ] {
            if output.starts_with(resolve_path(root)) {
                return Err(ConfigError::NestedOutput {
                    field,
                    path: self.output_root.clone(),
                });
            }
        }

        if self.use_suffix && self.suffix_text.is_empty() {
            return Err(ConfigError::EmptySuffix);
        }

        for (field, value) in [
            ("max_workers", self.max_workers),
            ("extraction_workers", self.extraction_workers),
            ("extraction_chunk_size", self.extraction_chunk_size),
            ("match_chunk_size", self.match_chunk_size),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be at least 1".to_string(),
                });
            }
        }

        if !self.retry_delay_seconds.is_finite() || self.retry_delay_seconds < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "retry_delay_seconds",
                reason: format!("{} is not a non-negative number", self.retry_delay_seconds),
            });
        }

        if self.source_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "source_extensions",
                reason: "at least one extension is required".to_string(),
            });
        }

        Ok(())
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            use_suffix: self.use_suffix,
            suffix_text: self.suffix_text.clone(),
            check_without_suffix: self.check_without_suffix,
            compare_metadata: self.compare_metadata,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_secs_f64(self.max_retries, self.retry_delay_seconds)
    }

    pub fn extraction_plan(&self) -> ChunkPlan {
        ChunkPlan::new(self.extraction_chunk_size, self.extraction_workers)
    }

    pub fn match_plan(&self) -> ChunkPlan {
        ChunkPlan::new(self.match_chunk_size, self.max_workers)
    }
}

/// Canonical form of `path`, resolving through the nearest existing ancestor
/// so a not-yet-created output root compares correctly.
fn resolve_path(path: &Path) -> PathBuf {
    let mut missing = Vec::new();
    let mut existing = path;
    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            return missing.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid(temp: &TempDir) -> ReconcileConfig {
        let source = temp.path().join("src");
        let exports = temp.path().join("exports");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&exports).unwrap();
        ReconcileConfig::new(source, exports, temp.path().join("out"))
    }

    #[test]
    fn defaults_are_sensible() {
        let config = ReconcileConfig::default();
        assert!(config.check_without_suffix);
        assert!(!config.compare_metadata);
        assert_eq!(config.extraction_workers, 2);
        assert!(config.max_workers >= 1);
        assert!(config.source_extensions.contains("cr2"));
        assert!(config.derivative_extensions.contains("jpg"));
    }

    #[test]
    fn valid_config_passes() {
        let temp = TempDir::new().unwrap();
        assert!(valid(&temp).validate().is_ok());
    }

    #[test]
    fn missing_path_is_reported_first() {
        let config = ReconcileConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingPath { field: "source_root" })
        ));
    }

    #[test]
    fn nonexistent_source_root_is_rejected() {
        let temp = TempDir::new().unwrap();
        let config = ReconcileConfig {
            source_root: temp.path().join("nope"),
            ..valid(&temp)
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotADirectory { field: "source_root", .. })
        ));
    }

    #[test]
    fn output_inside_an_input_tree_is_rejected() {
        let temp = TempDir::new().unwrap();
        let base = valid(&temp);

        let inside_exports = ReconcileConfig {
            output_root: base.derivative_root.join("sorted"),
            ..base.clone()
        };
        assert!(matches!(
            inside_exports.validate(),
            Err(ConfigError::NestedOutput { field: "derivative_root", .. })
        ));

        let inside_sources = ReconcileConfig {
            output_root: base.source_root.join("nested/deeper"),
            ..base.clone()
        };
        assert!(matches!(
            inside_sources.validate(),
            Err(ConfigError::NestedOutput { field: "source_root", .. })
        ));

        let same_as_exports = ReconcileConfig {
            output_root: base.derivative_root.clone(),
            ..base
        };
        assert!(same_as_exports.validate().is_err());
    }

    #[test]
    fn sibling_output_with_shared_prefix_is_accepted() {
        let temp = TempDir::new().unwrap();
        let config = ReconcileConfig {
            output_root: temp.path().join("exports-sorted"),
            ..valid(&temp)
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn resolve_path_handles_missing_tail() {
        let temp = TempDir::new().unwrap();
        let resolved = resolve_path(&temp.path().join("a/b"));
        assert_eq!(resolved, fs::canonicalize(temp.path()).unwrap().join("a/b"));
    }

    #[test]
    fn suffix_without_text_is_rejected() {
        let temp = TempDir::new().unwrap();
        let config = ReconcileConfig {
            use_suffix: true,
            ..valid(&temp)
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptySuffix)));
    }

    #[test]
    fn bad_tuning_is_rejected() {
        let temp = TempDir::new().unwrap();
        let zero_workers = ReconcileConfig {
            max_workers: 0,
            ..valid(&temp)
        };
        assert!(zero_workers.validate().is_err());

        let negative_delay = ReconcileConfig {
            retry_delay_seconds: -1.0,
            ..valid(&temp)
        };
        assert!(negative_delay.validate().is_err());
    }

    #[test]
    fn partial_json_takes_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(
            &path,
            r#"{"source_root": "/a", "derivative_root": "/b", "output_root": "/c",
                "use_suffix": true, "suffix_text": "_export"}"#,
        )
        .unwrap();

        let config = ReconcileConfig::from_json_file(&path).unwrap();
        assert_eq!(config.suffix_text, "_export");
        assert_eq!(config.max_retries, 3);
        assert!(config.check_without_suffix);
    }

    #[test]
    fn broken_json_is_a_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ReconcileConfig::from_json_file(&path),
            Err(ConfigError::Unreadable { .. })
        ));
    }
}
