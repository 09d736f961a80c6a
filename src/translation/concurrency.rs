/*!
 * Bounded execution of independent async work.
 *
 * Work items are processed in fixed-size chunks: up to `limit` futures run
 * together, the whole chunk is awaited, then the next chunk starts. Sequential
 * mode collapses every level (files, languages, units, rows) to one item at a
 * time. Failures are values, so one failing item never cancels its siblings.
 */

use std::future::Future;

use futures::future::join_all;

/// Default number of items in flight
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Concurrency settings shared by every level of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyPolicy {
    /// Maximum items in flight at once
    pub limit: usize,
    /// Force one item at a time everywhere
    pub sequential: bool,
}

impl Default for ConcurrencyPolicy {
    fn default() -> Self {
        Self {
            limit: DEFAULT_CONCURRENCY,
            sequential: false,
        }
    }
}

impl ConcurrencyPolicy {
    pub fn new(limit: usize, sequential: bool) -> Self {
        Self { limit, sequential }
    }

    pub fn sequential() -> Self {
        Self::new(1, true)
    }

    /// Same sequential toggle with a different limit
    pub fn with_limit(&self, limit: usize) -> Self {
        Self::new(limit, self.sequential)
    }

    /// Effective limit, never below one
    pub fn effective_limit(&self) -> usize {
        if self.sequential { 1 } else { self.limit.max(1) }
    }

    /// Run `task` for every item, at most `effective_limit` at a time
    ///
    /// Results are returned in item order.
    pub async fn run_bounded<T, F, Fut, R>(&self, items: Vec<T>, task: F) -> Vec<R>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = R>,
    {
        let limit = self.effective_limit();
        let mut results = Vec::with_capacity(items.len());
        let mut items = items.into_iter().peekable();

        while items.peek().is_some() {
            let chunk: Vec<Fut> = items.by_ref().take(limit).map(&task).collect();
            results.extend(join_all(chunk).await);
        }
        results
    }
}
