//! # photo-reconcile CLI
//!
//! Command-line interface for the photo reconciler.
//!
//! ## Usage
//! ```bash
//! photo-reconcile run ~/Pictures/Originals ~/Desktop/Exports ~/Pictures/Sorted --suffix _export
//! photo-reconcile run-config reconcile.json --output json
//! ```

mod cli;

use photo_reconciler::Result;

fn main() -> Result<()> {
    photo_reconciler::init_tracing();
    cli::run()
}
