//! # Core Module
//!
//! The UI-agnostic reconciliation engine.
//!
//! ## Modules
//! - `scanner` - Walks source and derivative trees
//! - `index` - Source lookup by base name
//! - `metadata` - Bounded EXIF reads with retry
//! - `cache` - Persists source metadata between runs
//! - `matcher` - Tiered name matching with optional capture-time check
//! - `scheduler` - Chunked, capped, cancellable parallel work
//! - `relocate` - Moves matches into the output tree
//! - `pipeline` - Orchestrates the full workflow

pub mod cache;
pub mod index;
pub mod matcher;
pub mod metadata;
pub mod pipeline;
pub mod relocate;
pub mod scanner;
pub mod scheduler;

// Re-export commonly used types
pub use matcher::{MatchResult, MatchTier};
pub use metadata::MetadataSummary;
pub use pipeline::{ReconcileConfig, ReconcileReport, Reconciler};
pub use relocate::RelocationReport;
pub use scanner::{DerivativeRecord, SourceRecord};
pub use scheduler::CancellationToken;
