// SPDX-License-Identifier: AGPL-3.0-only

//! Process-wide parallel execution context.
//!
//! A `ParallelContext` owns a rayon thread pool. It is created explicitly with
//! [`ParallelContext::init`], shared by `Arc` with every operator that needs
//! it, and torn down when the last handle drops. Field kernels never touch the
//! rayon global pool.

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::error::ParallelError;

/// Owned worker pool injected into operators.
#[derive(Debug)]
pub struct ParallelContext {
    pool: ThreadPool,
}

impl ParallelContext {
    /// Build a pool with `threads` workers (0 = one per logical CPU).
    pub fn init(threads: usize) -> Result<Arc<Self>, ParallelError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("hotspring-lattice-{i}"))
            .build()?;
        debug!(threads = pool.current_num_threads(), "parallel context initialised");
        Ok(Arc::new(Self { pool }))
    }

    /// Single-worker context, useful for reference runs.
    pub fn serial() -> Result<Arc<Self>, ParallelError> {
        Self::init(1)
    }

    /// Number of worker threads.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` inside the pool; nested calls from a worker run inline.
    pub fn install<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        self.pool.install(op)
    }
}

impl Drop for ParallelContext {
    fn drop(&mut self) {
        debug!(threads = self.pool.current_num_threads(), "parallel context torn down");
    }
}
