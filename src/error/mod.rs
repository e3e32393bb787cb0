//! # Error Module
//!
//! Error types for the photo reconciler.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Degrade per item** - only configuration errors stop a run

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Relocation error: {0}")]
    Relocate(#[from] RelocateError),

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(String),
}

/// Problems with the run configuration, reported before any work starts
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Required path `{field}` is empty")]
    MissingPath { field: &'static str },

    #[error("{field} is not a directory: {path}")]
    NotADirectory { field: &'static str, path: PathBuf },

    #[error("output_root {path} lies inside {field}; relocated files would be rescanned")]
    NestedOutput { field: &'static str, path: PathBuf },

    #[error("Suffix matching is enabled but no suffix text was given")]
    EmptySuffix,

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Failed to read config file {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

/// Errors that occur while walking the source and derivative trees
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while extracting capture-time metadata
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse metadata in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("No metadata segment present in {path}")]
    NoMetadataSegment { path: PathBuf },
}

impl MetadataError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// A file without a metadata segment will not grow one between attempts.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, MetadataError::NoMetadataSegment { .. })
    }
}

/// Errors that occur with the persisted metadata cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to open cache database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Cache schema version {found} does not match expected {expected}")]
    SchemaMismatch { found: String, expected: u32 },

    #[error("Cache at {path} belongs to a different source tree")]
    FingerprintMismatch { path: PathBuf },
}

impl From<rusqlite::Error> for CacheError {
    fn from(error: rusqlite::Error) -> Self {
        CacheError::QueryFailed(error.to_string())
    }
}

/// Errors that occur while moving a derivative into the output tree
#[derive(Error, Debug)]
pub enum RelocateError {
    #[error("Derivative not found: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Target already exists: {path}")]
    TargetExists { path: PathBuf },

    #[error("Source {path} is outside the source root")]
    OutsideRoot { path: PathBuf },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, ReconcileError>;
