use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use super::reuse_pool::InternalReusePool;
use super::{lock, Reusable};
use crate::logger::{debug, error};

/// Released resources waiting for the cleanup worker.
///
/// The condition variable is shared by three wake-ups: an item was queued,
/// shutdown began, and the worker finished draining.
pub(super) struct CleanupQueue<T> {
    pending : Mutex<Vec<T>>,
    signal : Condvar,
    drained : AtomicBool,
    max_pending : usize,
}

impl<T> CleanupQueue<T> {
    pub(super) fn new(max_pending : usize) -> Self {
        CleanupQueue {
            pending : Mutex::new(Vec::new()),
            signal : Condvar::new(),
            drained : AtomicBool::new(false),
            max_pending
        }
    }

    /// Hands the item back when the queue is full.
    pub(super) fn try_push(&self, item : T) -> Result<(), T> {
        let mut g = lock(&self.pending);
        if g.len() >= self.max_pending {
            return Err(item);
        }

        g.push(item);
        self.signal.notify_one();
        Ok(())
    }

    /// Waits up to `timeout` for work. Returns `None` on timeout or once
    /// `running` is cleared, leaving queued items in place.
    pub(super) fn wait_pop(&self, timeout : Duration, running : &'_ AtomicBool) -> Option<T> {
        let g = lock(&self.pending);
        let (mut g, _) = self.signal
            .wait_timeout_while(g, timeout, |p| p.is_empty() && running.load(Ordering::Acquire))
            .unwrap_or_else(PoisonError::into_inner);

        if !running.load(Ordering::Acquire) {
            return None;
        }
        g.pop()
    }

    pub(super) fn wake_all(&self) {
        let _g = lock(&self.pending);
        self.signal.notify_all();
    }

    pub(super) fn mark_drained(&self) {
        let _g = lock(&self.pending);
        self.drained.store(true, Ordering::Release);
        self.signal.notify_all();
    }

    pub(super) fn is_drained(&self) -> bool {
        self.drained.load(Ordering::Acquire)
    }

    /// Blocks until the worker has marked itself drained, re-checking every `poll`.
    pub(super) fn wait_drained(&self, poll : Duration) {
        let mut g = lock(&self.pending);
        while !self.drained.load(Ordering::Acquire) {
            g = match self.signal.wait_timeout(g, poll) {
                Ok((g, _)) => g,
                Err(e) => e.into_inner().0
            };
        }
    }

    pub(super) fn len(&self) -> usize {
        lock(&self.pending).len()
    }

    pub(super) fn max_size(&self) -> usize {
        self.max_pending
    }

    pub(super) fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *lock(&self.pending))
    }
}

pub(super) fn spawn_cleanup_worker<T : Reusable>(pool : Arc<InternalReusePool<T>>) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("reuse-cleanup:{}", pool.name()))
        .spawn(move || cleanup_loop(pool))
}

/// Marks the queue drained when the worker exits, including by a panicking `clean`.
struct DrainOnExit<'a, T> {
    queue : &'a CleanupQueue<T>,
    pool_name : &'a str,
}

impl<T> Drop for DrainOnExit<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("pool_name:{} - cleanup worker stopped by a panicking clean", self.pool_name);
        }
        self.queue.mark_drained();
    }
}

fn cleanup_loop<T : Reusable>(pool : Arc<InternalReusePool<T>>) {
    debug!("pool_name:{} - cleanup worker started", pool.name());
    let _drain = DrainOnExit { queue : pool.cleanup(), pool_name : pool.name() };

    while pool.is_running() {
        let Some(mut item) = pool.cleanup().wait_pop(pool.poll_interval(), pool.running_flag()) else {
            continue;
        };

        item.clean();
        pool.store_cleaned(item);
    }

    debug!("pool_name:{} - cleanup worker drained", pool.name());
}
