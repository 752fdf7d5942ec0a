use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{lock, Reusable};

struct Buckets<T> {
    un_bucket : Vec<T>,
    init_buckets : HashMap<String, Vec<T>>,
}

/// Idle resources ready for reuse, one LIFO stack per key.
///
/// `idle` mirrors the total stack length and is only changed while `buckets`
/// is locked, so readers can check capacity without taking the lock.
pub(super) struct Inventory<T> {
    buckets : Mutex<Buckets<T>>,
    idle : AtomicUsize,
    max_inventory : usize,
}

impl<T> Inventory<T> where T : Reusable {
    pub(super) fn new(max_inventory : usize) -> Self {
        Inventory {
            buckets : Mutex::new(Buckets { un_bucket : Vec::new(), init_buckets : HashMap::new() }),
            idle : AtomicUsize::new(0),
            max_inventory
        }
    }

    pub(super) fn take(&self, key : &'_ str) -> Option<T> {
        let mut g = lock(&self.buckets);

        let item = if key.is_empty() {
            g.un_bucket.pop()
        } else {
            let bucket = g.init_buckets.get_mut(key)?;
            let item = bucket.pop();
            if bucket.is_empty() {
                g.init_buckets.remove(key);
            }
            item
        };

        if item.is_some() {
            self.idle.fetch_sub(1, Ordering::AcqRel);
        }
        item
    }

    /// Hands the item back when the inventory is full; the caller drops it outside the lock.
    pub(super) fn try_put(&self, item : T) -> Result<(), T> {
        let mut g = lock(&self.buckets);

        if self.idle.load(Ordering::Acquire) >= self.max_inventory {
            return Err(item);
        }

        if item.key().is_empty() {
            g.un_bucket.push(item);
        } else if let Some(bucket) = g.init_buckets.get_mut(item.key()) {
            bucket.push(item);
        } else {
            g.init_buckets.insert(item.key().to_owned(), vec![item]);
        }

        self.idle.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    pub(super) fn len(&self) -> usize {
        self.idle.load(Ordering::Acquire)
    }

    pub(super) fn max_size(&self) -> usize {
        self.max_inventory
    }

    #[cfg(test)]
    pub(super) fn bucket_len(&self, key : &'_ str) -> usize {
        let g = lock(&self.buckets);
        if key.is_empty() {
            g.un_bucket.len()
        } else {
            g.init_buckets.get(key).map_or(0, Vec::len)
        }
    }

    #[cfg(test)]
    pub(super) fn key_count(&self) -> usize {
        lock(&self.buckets).init_buckets.len()
    }

    pub(super) fn drain(&self) -> Vec<T> {
        let mut g = lock(&self.buckets);

        let mut ret = std::mem::take(&mut g.un_bucket);
        for (_, bucket) in g.init_buckets.drain() {
            ret.extend(bucket);
        }
        self.idle.store(0, Ordering::Release);
        ret
    }
}
