//! # Scheduler Module
//!
//! Chunked, bounded-parallel execution with cooperative cancellation.
//!
//! Items are split into fixed-size chunks that run one after another.
//! Inside a chunk up to `worker_cap` items run at once on a dedicated
//! rayon pool. After every chunk the caller gets a progress callback and
//! the cancellation token is polled; a task that is already running is
//! always allowed to finish.
//!
//! Chunk results are appended only once the whole chunk is done, so a
//! cancelled run holds exactly the results of the chunks it completed.

use crate::error::{ReconcileError, Result};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Token for cooperative cancellation.
///
/// Clone is cheap and shares state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Chunk size and per-chunk parallelism for one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub chunk_size: usize,
    pub worker_cap: usize,
}

impl ChunkPlan {
    /// Both values are clamped to at least one
    pub fn new(chunk_size: usize, worker_cap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            worker_cap: worker_cap.max(1),
        }
    }
}

/// What a chunked run produced
#[derive(Debug)]
pub struct ChunkedRun<R> {
    /// Results in item order, for completed chunks only
    pub results: Vec<R>,
    /// Items whose chunk completed
    pub processed: usize,
    pub total: usize,
    /// Whether the run stopped early on the token
    pub cancelled: bool,
}

/// Run `task` over `items` chunk by chunk.
///
/// `on_progress(processed, total)` fires after each completed chunk.
pub fn run_chunked<T, R, F, P>(
    items: &[T],
    plan: ChunkPlan,
    token: &CancellationToken,
    mut on_progress: P,
    task: F,
) -> Result<ChunkedRun<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T, &CancellationToken) -> R + Sync,
    P: FnMut(usize, usize),
{
    let plan = ChunkPlan::new(plan.chunk_size, plan.worker_cap);
    let total = items.len();
    let mut run = ChunkedRun {
        results: Vec::with_capacity(total),
        processed: 0,
        total,
        cancelled: false,
    };

    if total == 0 {
        return Ok(run);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(plan.worker_cap)
        .thread_name(|i| format!("reconcile-worker-{}", i))
        .build()
        .map_err(|e| ReconcileError::WorkerPool(e.to_string()))?;

    for chunk in items.chunks(plan.chunk_size) {
        if token.is_cancelled() {
            run.cancelled = true;
            break;
        }

        let chunk_results: Vec<R> =
            pool.install(|| chunk.par_iter().map(|item| task(item, token)).collect());

        run.results.extend(chunk_results);
        run.processed += chunk.len();
        on_progress(run.processed, total);
    }

    Ok(run)
}
