use std::error::Error;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use serde::Serialize;

use super::cleanup::{spawn_cleanup_worker, CleanupQueue};
use super::inventory::Inventory;
use super::scoped::{PoolCommander, ScopedBorrow};
use super::{lock, GenFn, Reusable, ThreadSafePool};
use crate::config::PoolConfig;
use crate::err::define::pool as define_err;
use crate::err::make_err_msg;
use crate::logger::{debug, error, info, trace};

/// Point-in-time view of pool accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub idle : usize,
    pub pending : usize,
    pub created : u64,
    pub reused : u64,
    pub evicted : u64,
    pub cleaned_in_background : u64,
}

#[derive(Default)]
struct PoolCounters {
    created : AtomicU64,
    reused : AtomicU64,
    evicted : AtomicU64,
    cleaned_in_background : AtomicU64,
}

pub(super) struct InternalReusePool<T> where T : Reusable {
    gen : Box<GenFn<T>>,
    inventory : Inventory<T>,
    cleanup : CleanupQueue<T>,
    running : AtomicBool,
    poll_interval : Duration,
    counters : PoolCounters,
    pool_name : String,
}

impl<T> InternalReusePool<T> where T : Reusable {
    fn new(gen : Box<GenFn<T>>, config : &'_ PoolConfig) -> Arc<Self> {
        Arc::new(InternalReusePool {
            gen,
            inventory : Inventory::new(config.max_inventory),
            cleanup : CleanupQueue::new(config.max_pending_cleanup),
            running : AtomicBool::new(true),
            poll_interval : config.poll_interval(),
            counters : PoolCounters::default(),
            pool_name : config.name.clone()
        })
    }

    pub(super) fn name(&self) -> &'_ str {
        &self.pool_name
    }

    pub(super) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(super) fn running_flag(&self) -> &'_ AtomicBool {
        &self.running
    }

    pub(super) fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub(super) fn cleanup(&self) -> &'_ CleanupQueue<T> {
        &self.cleanup
    }

    fn acquire(&self, key : &'_ str) -> Result<T, Box<dyn Error>> {
        if self.is_running() {
            if let Some(item) = self.inventory.take(key) {
                self.counters.reused.fetch_add(1, Ordering::Relaxed);
                return Ok(item);
            }
        }

        match (self.gen)(key) {
            Ok(item) => {
                self.counters.created.fetch_add(1, Ordering::Relaxed);
                Ok(item)
            },
            Err(e) => {
                error!("pool_name:{} key:{} - construct failed : {}", self.pool_name, key, e);
                Err(e)
            }
        }
    }

    fn release(&self, mut item : T) {
        if !self.is_running() {
            trace!("pool_name:{} - drop on release, pool is shut down", self.pool_name);
            return;
        }

        let stored = if item.clean_in_background() {
            self.cleanup.try_push(item)
        } else {
            item.clean();
            self.inventory.try_put(item)
        };

        match stored {
            Ok(()) => self.reclaim_if_stopped(),
            Err(rejected) => self.evict(rejected)
        }
    }

    /// A release that read `running` before shutdown may store after the
    /// final clear, so it drains again once the flag has dropped.
    fn reclaim_if_stopped(&self) {
        if self.is_running() {
            return;
        }

        let destroyed = self.clear();
        trace!("pool_name:{} - release raced shutdown, destroyed {} resources", self.pool_name, destroyed);
    }

    /// Worker side of a background release: the item is already clean.
    pub(super) fn store_cleaned(&self, item : T) {
        self.counters.cleaned_in_background.fetch_add(1, Ordering::Relaxed);
        if let Err(item) = self.inventory.try_put(item) {
            self.evict(item);
        }
    }

    fn evict(&self, item : T) {
        self.counters.evicted.fetch_add(1, Ordering::Relaxed);
        trace!("pool_name:{} key:{} - evicted over capacity", self.pool_name, item.key());
        drop(item);
    }

    fn clear(&self) -> usize {
        let idle = self.inventory.drain();
        let pending = self.cleanup.drain();
        idle.len() + pending.len()
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            idle : self.inventory.len(),
            pending : self.cleanup.len(),
            created : self.counters.created.load(Ordering::Relaxed),
            reused : self.counters.reused.load(Ordering::Relaxed),
            evicted : self.counters.evicted.load(Ordering::Relaxed),
            cleaned_in_background : self.counters.cleaned_in_background.load(Ordering::Relaxed),
        }
    }
}

impl<T> PoolCommander<T> for InternalReusePool<T> where T : Reusable {
    fn restoration(&self, item : T) {
        self.release(item);
    }

    fn dispose(&self, item : T) {
        trace!("pool_name:{} key:{} - disposed by borrower", self.pool_name, item.key());
        drop(item);
    }
}

/// Thread-safe pool of `T`, keyed by initializer string.
///
/// One background thread per pool cleans resources whose
/// [`Reusable::clean_in_background`] is true. Dropping the pool shuts it down
/// and destroys everything it still holds.
pub struct ReusePool<T> where T : Reusable {
    internal : Arc<InternalReusePool<T>>,
    worker : Mutex<Option<JoinHandle<()>>>,
}

impl<T> ReusePool<T> where T : Reusable {
    pub fn new(gen : Box<GenFn<T>>, max_inventory : usize, max_pending_cleanup : usize) -> Result<Self, Box<dyn Error>> {
        Self::with_config(gen, PoolConfig::new(max_inventory, max_pending_cleanup))
    }

    pub fn with_config(gen : Box<GenFn<T>>, config : PoolConfig) -> Result<Self, Box<dyn Error>> {
        config.validate()?;

        let internal = InternalReusePool::new(gen, &config);
        let worker = spawn_cleanup_worker(internal.clone()).map_err(|e| {
            define_err::WorkerSpawnError::chain(make_err_msg!("pool_name:{}", config.name), Box::new(e))
        })?;

        debug!("pool_name:{} - created max_inventory:{} max_pending_cleanup:{}",
            config.name, config.max_inventory, config.max_pending_cleanup);

        Ok(ReusePool {
            internal,
            worker : Mutex::new(Some(worker))
        })
    }

    /// Pops an idle resource for `key`, or constructs one on a miss or after shutdown.
    /// Constructor errors are returned as is.
    pub fn acquire(&self, key : &'_ str) -> Result<T, Box<dyn Error>> {
        self.internal.acquire(key)
    }

    /// Cleans and stores `item`, queues it for the worker, or drops it when a
    /// bound is reached or the pool is shut down. Never blocks on capacity.
    pub fn release(&self, item : T) {
        self.internal.release(item)
    }

    pub fn get_owned(&self, key : &'_ str) -> Result<ScopedBorrow<T>, Box<dyn Error>> {
        let item = self.internal.acquire(key)?;
        Ok(ScopedBorrow::new(item, self.internal.clone()))
    }

    /// Idle resources across all keys.
    pub fn size(&self) -> usize {
        self.internal.inventory.len()
    }

    pub fn pending_size(&self) -> usize {
        self.internal.cleanup.len()
    }

    pub fn max_size(&self) -> usize {
        self.internal.inventory.max_size()
    }

    pub fn max_pending_size(&self) -> usize {
        self.internal.cleanup.max_size()
    }

    pub fn stats(&self) -> PoolStats {
        self.internal.stats()
    }

    pub fn is_running(&self) -> bool {
        self.internal.is_running()
    }

    pub fn is_worker_running(&self) -> bool {
        !self.internal.cleanup.is_drained()
    }

    /// Destroys every idle and pending resource. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        self.internal.clear()
    }

    /// Stops pooling, waits for the cleanup worker, then destroys what is left.
    ///
    /// Later `acquire` calls construct fresh resources and later releases
    /// drop them. Calling this again is a no-op.
    pub fn shutdown(&self) {
        let Some(worker) = lock(&self.worker).take() else {
            return;
        };

        self.internal.running.store(false, Ordering::Release);
        self.internal.cleanup.wake_all();
        self.internal.cleanup.wait_drained(self.internal.poll_interval);

        if worker.join().is_err() {
            error!("pool_name:{} - cleanup worker panicked", self.internal.pool_name);
        }

        let destroyed = self.internal.clear();
        info!("pool_name:{} - shut down, destroyed {} resources", self.internal.pool_name, destroyed);
    }
}

impl<T> Drop for ReusePool<T> where T : Reusable {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<T> ThreadSafePool<T> for ReusePool<T> where T : Reusable {
    fn get_owned(&self, key : &'_ str) -> Result<ScopedBorrow<T>, Box<dyn Error>> {
        ReusePool::get_owned(self, key)
    }

    fn idle_size(&self) -> usize {
        self.size()
    }

    fn max_size(&self) -> usize {
        ReusePool::max_size(self)
    }

    fn stats(&self) -> PoolStats {
        ReusePool::stats(self)
    }
}
