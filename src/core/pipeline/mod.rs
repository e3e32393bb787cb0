//! # Pipeline Module
//!
//! Orchestrates a reconciliation run.
//!
//! ## Pipeline Stages
//! 1. **Scan** - Walk the source and derivative trees
//! 2. **Index** - Group sources by base name
//! 3. **Metadata** - Load or rebuild the source capture-time cache (optional)
//! 4. **Match** - Resolve each derivative through the name tiers
//! 5. **Relocate** - Move matches into the mirrored output tree
//!
//! ## Parallelism
//! Extraction and matching run in chunks on bounded rayon pools;
//! relocation is sequential.

mod config;
mod executor;

pub use crate::core::scheduler::CancellationToken;
pub use config::ReconcileConfig;
pub use executor::{ReconcileReport, Reconciler, ReconcilerBuilder, TierCounts};
