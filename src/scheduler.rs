//! Bulk-job scheduling over one thread or a rayon worker pool.
//!
//! The scheduler's core invariant is determinism: `map_reduce` partitions its
//! input in order, maps each partition, and folds the partial results left to
//! right in partition order, never in completion order. Because the partition
//! boundaries are also identical in both modes, call sites observe the same
//! result whether execution is sequential or parallel.

use crate::config::ParallelConfig;
use crate::core::errors::{Error, Result};
use rayon::prelude::*;

pub struct Scheduler {
    parallel: bool,
    batch_size: usize,
    pool: Option<rayon::ThreadPool>,
}

impl Scheduler {
    /// Build a scheduler from parallelism settings. A dedicated worker pool
    /// is only created when a concurrency cap is configured; otherwise the
    /// global rayon pool is used.
    pub fn new(config: &ParallelConfig) -> Result<Self> {
        let pool = if config.enabled && config.max_concurrency.is_some() {
            let threads = config.effective_concurrency();
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|err| {
                    Error::configuration(format!("failed to build worker pool: {err}"))
                })?;
            Some(pool)
        } else {
            None
        };
        Ok(Self {
            parallel: config.enabled,
            batch_size: config.effective_batch_size(),
            pool,
        })
    }

    /// Single-threaded scheduler with default partitioning.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            batch_size: ParallelConfig::default().effective_batch_size(),
            pool: None,
        }
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Apply `job` to partitions of `items` for side effects only. No
    /// ordering is guaranteed across partitions; `iter` returns once every
    /// partition has completed, so it doubles as a synchronization barrier.
    pub fn iter<T, F>(&self, items: &[T], job: F)
    where
        T: Sync,
        F: Fn(&[T]) + Sync,
    {
        if items.is_empty() {
            return;
        }
        if !self.parallel {
            for chunk in items.chunks(self.batch_size) {
                job(chunk);
            }
            return;
        }
        self.run(|| items.par_chunks(self.batch_size).for_each(|chunk| job(chunk)));
    }

    /// Partition `items`, map each partition to a partial result, then fold
    /// the partials into `init` strictly left to right in partition order.
    /// The fold order is fixed by input position, not completion order, so
    /// `reduce` need not be commutative or associative.
    pub fn map_reduce<T, A, M, R>(&self, items: &[T], init: A, map: M, reduce: R) -> A
    where
        T: Sync,
        A: Send,
        M: Fn(&[T]) -> A + Sync,
        R: Fn(A, A) -> A,
    {
        if items.is_empty() {
            return init;
        }
        if !self.parallel {
            return items
                .chunks(self.batch_size)
                .fold(init, |acc, chunk| reduce(acc, map(chunk)));
        }
        let partials: Vec<A> =
            self.run(|| items.par_chunks(self.batch_size).map(|chunk| map(chunk)).collect());
        partials
            .into_iter()
            .fold(init, |acc, partial| reduce(acc, partial))
    }

    fn run<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}
