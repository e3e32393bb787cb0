//! # Photo Reconciler
//!
//! Puts exported photos back next to the camera originals they came from.
//!
//! Given a tree of originals (RAW files and camera JPEGs) and a flat or
//! arbitrary tree of derivatives, each derivative is matched to its source
//! by name, optionally confirmed by EXIF capture time, and moved into an
//! output tree that mirrors the source layout.
//!
//! ## Core Philosophy
//! - **Never overwrite** - An existing target is a failure, not a replacement
//! - **Idempotent** - Running twice moves nothing the second time
//! - **Degrade per file** - One bad file never stops the batch
//!
//! ## Architecture
//! - `core` - The reconciliation engine
//! - `events` - Event-driven progress reporting (UI-ready)
//! - `error` - User-friendly error types

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{ReconcileError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
