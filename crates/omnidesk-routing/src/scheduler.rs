// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delayed capacity rechecks keyed by agent id.

use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::AbortHandle;

/// Runs one delayed task per key.
///
/// Scheduling a key that already has a pending task aborts the pending one,
/// so at most one recheck per agent is ever outstanding and the latest
/// trigger wins. Tasks must re-validate their preconditions when they fire.
#[derive(Debug)]
pub struct RecheckScheduler {
    delay: Duration,
    pending: DashMap<String, AbortHandle>,
}

impl RecheckScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: DashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `task` after the settle delay, superseding any pending task for `key`.
    pub fn schedule<F>(&self, key: &str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        if let Some(previous) = self.pending.insert(key.to_string(), handle.abort_handle()) {
            previous.abort();
        }
    }

    pub fn cancel(&self, key: &str) {
        if let Some((_, handle)) = self.pending.remove(key) {
            handle.abort();
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.get(key).is_some_and(|h| !h.is_finished())
    }

    /// Aborts every pending task.
    pub fn cancel_all(&self) {
        self.pending.retain(|_, handle| {
            handle.abort();
            false
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_task(counter: Arc<AtomicUsize>, amount: usize) -> impl Future<Output = ()> {
        async move {
            counter.fetch_add(amount, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let scheduler = RecheckScheduler::new(Duration::from_secs(5));
        let fired = Arc::new(AtomicUsize::new(0));
        scheduler.schedule("101", counter_task(fired.clone(), 1));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(scheduler.is_pending("101"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending("101"));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_schedule_supersedes_pending() {
        let scheduler = RecheckScheduler::new(Duration::from_secs(5));
        let fired = Arc::new(AtomicUsize::new(0));
        scheduler.schedule("101", counter_task(fired.clone(), 1));
        tokio::time::sleep(Duration::from_secs(3)).await;
        scheduler.schedule("101", counter_task(fired.clone(), 10));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent_and_cancellable() {
        let scheduler = RecheckScheduler::new(Duration::from_secs(1));
        let fired = Arc::new(AtomicUsize::new(0));
        scheduler.schedule("101", counter_task(fired.clone(), 1));
        scheduler.schedule("102", counter_task(fired.clone(), 100));
        scheduler.cancel("102");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
