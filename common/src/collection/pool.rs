//! Keyed object pool for expensive-to-construct resources.
//!
//! Idle resources are kept per key (the "initializer", e.g. a connection
//! string) in LIFO stacks. Released resources are either cleaned on the
//! releasing thread or handed to a single background worker, depending on
//! [`Reusable::clean_in_background`]. Capacity bounds are enforced by dropping
//! resources, never by blocking the caller.

mod cleanup;
mod inventory;
mod reuse_pool;
mod scoped;

use std::error::Error;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::PoolConfig;

pub use reuse_pool::{PoolStats, ReusePool};
pub use scoped::ScopedBorrow;

/// Contract every pooled type fulfils.
///
/// All resources in one pool share the same concrete type; the key only
/// splits them into independent buckets.
pub trait Reusable : Send + 'static {
    /// Key the resource was constructed with. The empty key is the default bucket.
    fn key(&self) -> &str;

    /// Restore the resource to a reusable baseline. Called once per release.
    fn clean(&mut self) {}

    /// Whether `clean` is costly enough to run on the cleanup worker.
    fn clean_in_background(&self) -> bool {
        false
    }
}

/// Builds a fresh resource for a key on an inventory miss.
pub type GenFn<T> = dyn Fn(&'_ str) -> Result<T, Box<dyn Error>> + Send + Sync;

pub trait ThreadSafePool<T> : Send + Sync where T : Reusable {
    fn get_owned(&self, key : &'_ str) -> Result<ScopedBorrow<T>, Box<dyn Error>>;
    fn idle_size(&self) -> usize;
    fn max_size(&self) -> usize;
    fn stats(&self) -> PoolStats;
}

pub fn get_thread_safe_pool<T : Reusable>(gen : Box<GenFn<T>>, config : PoolConfig) -> Result<Arc<dyn ThreadSafePool<T>>, Box<dyn Error>> {
    let pool = ReusePool::with_config(gen, config)?;
    Ok(Arc::new(pool))
}

/// The guarded stacks stay structurally valid across a panic, so poisoning is ignored.
pub(crate) fn lock<T>(m : &'_ Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
