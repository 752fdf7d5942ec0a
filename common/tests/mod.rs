use std::collections::HashSet;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use common::collection::pool::{get_thread_safe_pool, Reusable, ReusePool, ThreadSafePool};
use common::config::PoolConfig;

#[derive(Default)]
struct Tally {
    next_id : AtomicUsize,
    live : AtomicUsize,
    destroyed : AtomicUsize,
    cleaned : AtomicUsize,
}

#[derive(Default)]
struct Gate {
    open : Mutex<bool>,
    cv : Condvar,
}

impl Gate {
    fn closed() -> Arc<Self> {
        Arc::new(Gate::default())
    }

    fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.cv.notify_all();
    }

    fn pass(&self) {
        let mut g = self.open.lock().unwrap();
        while !*g {
            g = self.cv.wait(g).unwrap();
        }
    }
}

struct TestClass {
    key : String,
    id : usize,
    data : String,
    background : bool,
    gate : Option<Arc<Gate>>,
    tally : Arc<Tally>,
}

impl TestClass {
    fn process(&mut self) {
        self.data = "914".to_string();
    }
}

impl Reusable for TestClass {
    fn key(&self) -> &str {
        &self.key
    }

    fn clean(&mut self) {
        if let Some(gate) = &self.gate {
            gate.pass();
        }
        self.data.clear();
        self.tally.cleaned.fetch_add(1, Ordering::SeqCst);
    }

    fn clean_in_background(&self) -> bool {
        self.background
    }
}

impl Drop for TestClass {
    fn drop(&mut self) {
        self.tally.live.fetch_sub(1, Ordering::SeqCst);
        self.tally.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

fn test_pool(config : PoolConfig, background : bool, gate : Option<Arc<Gate>>) -> Result<(ReusePool<TestClass>, Arc<Tally>), Box<dyn Error>> {
    let tally = Arc::new(Tally::default());
    let gen_tally = tally.clone();

    let pool = ReusePool::with_config(Box::new(move |key : &'_ str| -> Result<TestClass, Box<dyn Error>> {
        gen_tally.live.fetch_add(1, Ordering::SeqCst);
        Ok(TestClass {
            key : key.to_string(),
            id : gen_tally.next_id.fetch_add(1, Ordering::SeqCst),
            data : String::new(),
            background,
            gate : gate.clone(),
            tally : gen_tally.clone()
        })
    }), config)?;

    Ok((pool, tally))
}

fn wait_until(what : &'_ str, f : impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !f() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
pub fn test_sync_clean_reuses_same_instance() -> Result<(), Box<dyn Error>> {
    let (pool, _) = test_pool(PoolConfig::new(1, 1), false, None)?;

    let first_id = {
        let mut obj = pool.get_owned("init")?;
        assert_eq!("", obj.data);
        assert_eq!("init", obj.key());
        obj.process();
        assert_eq!("914", obj.data);
        obj.id
    };

    let obj = pool.get_owned("init")?;
    assert_eq!(first_id, obj.id, "expected the released instance back");
    assert_eq!("", obj.data);
    Ok(())
}

#[test]
pub fn test_background_clean_reuses_after_worker() -> Result<(), Box<dyn Error>> {
    let gate = Gate::closed();
    let (pool, tally) = test_pool(PoolConfig::new(1, 1), true, Some(gate.clone()))?;

    let first_id = {
        let mut obj = pool.get_owned("init")?;
        obj.process();
        obj.id
    };

    // first instance is parked in the worker's clean, so this one is new
    let mut second = pool.get_owned("init")?;
    assert_ne!(first_id, second.id);
    assert_eq!("", second.data);
    second.process();

    gate.open();
    wait_until("background clean", || pool.size() == 1);
    assert_eq!(1, tally.cleaned.load(Ordering::SeqCst));

    drop(second);
    let third = pool.get_owned("init")?;
    assert_eq!(first_id, third.id);
    assert_eq!("", third.data);
    Ok(())
}

#[test]
pub fn test_zero_inventory_never_pools() -> Result<(), Box<dyn Error>> {
    let (pool, tally) = test_pool(PoolConfig::new(0, 1), false, None)?;

    let mut ids = HashSet::new();
    for _ in 0..10 {
        let obj = pool.acquire("init")?;
        assert!(ids.insert(obj.id));
        pool.release(obj);
        assert_eq!(0, pool.size());
    }

    assert_eq!(10, tally.destroyed.load(Ordering::SeqCst));
    assert_eq!(0, tally.live.load(Ordering::SeqCst));
    assert_eq!(10, pool.stats().evicted);
    Ok(())
}

#[test]
pub fn test_shutdown_destroys_pending_cleanup() -> Result<(), Box<dyn Error>> {
    let gate = Gate::closed();
    let (pool, tally) = test_pool(PoolConfig::new(16, 8), true, Some(gate.clone()))?;
    let pool = Arc::new(pool);

    let held : Vec<TestClass> = (0..5).map(|_| pool.acquire("init")).collect::<Result<_, _>>()?;
    for obj in held {
        pool.release(obj);
    }
    wait_until("worker to pick one item", || pool.pending_size() == 4);

    let watcher = pool.clone();
    let opener = std::thread::spawn(move || {
        wait_until("shutdown to begin", || !watcher.is_running());
        gate.open();
    });

    let start = Instant::now();
    pool.shutdown();
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(opener.join().is_ok());

    assert!(!pool.is_worker_running());
    assert_eq!(0, pool.size());
    assert_eq!(0, pool.pending_size());
    assert_eq!(5, tally.destroyed.load(Ordering::SeqCst));
    assert_eq!(0, tally.live.load(Ordering::SeqCst));
    assert_eq!(1, tally.cleaned.load(Ordering::SeqCst));
    Ok(())
}

#[test]
pub fn test_drop_pool_frees_inventory() -> Result<(), Box<dyn Error>> {
    let (pool, tally) = test_pool(PoolConfig::new(8, 8), false, None)?;

    let held : Vec<TestClass> = (0..4)
        .map(|i| pool.acquire(if i % 2 == 0 { "a" } else { "" }))
        .collect::<Result<_, _>>()?;
    for obj in held {
        pool.release(obj);
    }
    assert_eq!(4, pool.size());

    drop(pool);
    assert_eq!(0, tally.live.load(Ordering::SeqCst));
    assert_eq!(4, tally.destroyed.load(Ordering::SeqCst));
    Ok(())
}

#[test]
pub fn test_keys_are_isolated() -> Result<(), Box<dyn Error>> {
    let (pool, _) = test_pool(PoolConfig::new(8, 8), false, None)?;

    let a = pool.acquire("A")?;
    let a_id = a.id;
    pool.release(a);

    let b = pool.acquire("B")?;
    assert_ne!(a_id, b.id);
    assert_eq!("B", b.key());

    let default = pool.acquire("")?;
    assert_ne!(a_id, default.id);

    let again = pool.acquire("A")?;
    assert_eq!(a_id, again.id);
    Ok(())
}

#[test]
pub fn test_inventory_bound_evicts_extra() -> Result<(), Box<dyn Error>> {
    let (pool, tally) = test_pool(PoolConfig::new(2, 8), false, None)?;

    let held : Vec<TestClass> = (0..5).map(|_| pool.acquire("k")).collect::<Result<_, _>>()?;
    for obj in held {
        pool.release(obj);
        assert!(pool.size() <= 2);
    }

    assert_eq!(2, pool.size());
    assert_eq!(3, tally.destroyed.load(Ordering::SeqCst));
    assert_eq!(3, pool.stats().evicted);
    Ok(())
}

#[test]
pub fn test_pending_bound_evicts_extra() -> Result<(), Box<dyn Error>> {
    let gate = Gate::closed();
    let (pool, tally) = test_pool(PoolConfig::new(8, 2), true, Some(gate.clone()))?;

    let first = pool.acquire("k")?;
    pool.release(first);
    wait_until("worker to pick the first item", || pool.pending_size() == 0);

    let held : Vec<TestClass> = (0..4).map(|_| pool.acquire("k")).collect::<Result<_, _>>()?;
    for obj in held {
        pool.release(obj);
        assert!(pool.pending_size() <= 2);
    }
    assert_eq!(2, pool.pending_size());
    assert_eq!(2, tally.destroyed.load(Ordering::SeqCst));

    gate.open();
    wait_until("queue to drain", || pool.size() == 3);
    Ok(())
}

#[test]
pub fn test_after_shutdown_bypasses_pool() -> Result<(), Box<dyn Error>> {
    let (pool, tally) = test_pool(PoolConfig::new(8, 8), false, None)?;

    let obj = pool.acquire("k")?;
    let old_id = obj.id;
    pool.release(obj);
    let guard = pool.get_owned("k")?;
    assert_eq!(old_id, guard.id);

    pool.shutdown();

    let fresh = pool.acquire("k")?;
    assert_ne!(old_id, fresh.id);
    pool.release(fresh);
    assert_eq!(0, pool.size());

    drop(guard);
    assert_eq!(0, pool.size());
    assert_eq!(0, tally.live.load(Ordering::SeqCst));
    Ok(())
}

#[test]
pub fn test_guard_outlives_pool() -> Result<(), Box<dyn Error>> {
    let (pool, tally) = test_pool(PoolConfig::new(8, 8), true, None)?;

    let mut guard = pool.get_owned("k")?;
    guard.process();
    drop(pool);

    assert_eq!(1, tally.live.load(Ordering::SeqCst));
    drop(guard);
    assert_eq!(0, tally.live.load(Ordering::SeqCst));
    assert_eq!(0, tally.cleaned.load(Ordering::SeqCst));
    Ok(())
}

#[test]
pub fn test_concurrent_borrows_are_unique_and_clean() -> Result<(), Box<dyn Error>> {
    const THREADS : usize = 8;
    const ROUNDS : usize = 200;
    const MAX_INVENTORY : usize = 6;
    const MAX_PENDING : usize = 3;

    let tally = Arc::new(Tally::default());
    let gen_tally = tally.clone();
    let pool : Arc<dyn ThreadSafePool<TestClass>> = get_thread_safe_pool(Box::new(move |key : &'_ str| -> Result<TestClass, Box<dyn Error>> {
        gen_tally.live.fetch_add(1, Ordering::SeqCst);
        let id = gen_tally.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(TestClass {
            key : key.to_string(),
            id,
            data : String::new(),
            background : id % 2 == 0,
            gate : None,
            tally : gen_tally.clone()
        })
    }), PoolConfig::new(MAX_INVENTORY, MAX_PENDING).with_name("stress"))?;
    assert_eq!(MAX_INVENTORY, pool.max_size());

    let in_use = Arc::new(Mutex::new(HashSet::new()));
    let keys = ["", "a", "b"];

    let workers : Vec<_> = (0..THREADS).map(|t| {
        let pool = pool.clone();
        let in_use = in_use.clone();
        std::thread::spawn(move || -> Result<(), String> {
            for r in 0..ROUNDS {
                let key = keys[(t + r) % keys.len()];
                let mut obj = pool.get_owned(key).map_err(|e| e.to_string())?;

                if !obj.data.is_empty() {
                    return Err(format!("dirty resource {} handed out", obj.id));
                }
                if obj.key() != key {
                    return Err(format!("resource for {} handed out for {}", obj.key(), key));
                }
                if !in_use.lock().unwrap().insert(obj.id) {
                    return Err(format!("resource {} borrowed twice", obj.id));
                }

                obj.process();
                if pool.idle_size() > MAX_INVENTORY {
                    return Err(format!("idle size {} over bound", pool.idle_size()));
                }
                if pool.stats().pending > MAX_PENDING {
                    return Err("pending size over bound".to_string());
                }

                in_use.lock().unwrap().remove(&obj.id);
            }
            Ok(())
        })
    }).collect();

    for w in workers {
        match w.join() {
            Ok(ret) => ret?,
            Err(_) => return Err("worker thread panicked".into())
        }
    }

    let stats = pool.stats();
    assert_eq!(stats.created as usize, tally.next_id.load(Ordering::SeqCst));
    assert_eq!((THREADS * ROUNDS) as u64, stats.created + stats.reused);

    drop(pool);
    assert_eq!(0, tally.live.load(Ordering::SeqCst));
    Ok(())
}

#[test]
pub fn test_clear_empties_pool() -> Result<(), Box<dyn Error>> {
    let (pool, tally) = test_pool(PoolConfig::new(8, 8), false, None)?;

    let held : Vec<TestClass> = (0..3).map(|_| pool.acquire("")).collect::<Result<_, _>>()?;
    for obj in held {
        pool.release(obj);
    }

    assert_eq!(3, pool.clear());
    assert_eq!(0, pool.size());
    assert_eq!(0, tally.live.load(Ordering::SeqCst));
    assert!(pool.is_running());

    pool.release(pool.acquire("")?);
    assert_eq!(1, pool.size());
    Ok(())
}

#[test]
pub fn test_full_inventory_drops_background_cleaned() -> Result<(), Box<dyn Error>> {
    let (pool, tally) = test_pool(PoolConfig::new(1, 8), true, None)?;

    let held : Vec<TestClass> = (0..3).map(|_| pool.acquire("k")).collect::<Result<_, _>>()?;
    for obj in held {
        pool.release(obj);
    }

    wait_until("worker to store or evict all three", || {
        let stats = pool.stats();
        stats.cleaned_in_background == 3 && stats.evicted == 2 && tally.destroyed.load(Ordering::SeqCst) == 2
    });

    let stats = pool.stats();
    assert_eq!(1, stats.idle);
    assert_eq!(0, stats.pending);
    assert_eq!(3, tally.cleaned.load(Ordering::SeqCst));
    assert_eq!(1, tally.live.load(Ordering::SeqCst));
    Ok(())
}

struct PanicOnClean {
    key : String,
}

impl Reusable for PanicOnClean {
    fn key(&self) -> &str {
        &self.key
    }

    fn clean(&mut self) {
        panic!("clean failed for {}", self.key);
    }

    fn clean_in_background(&self) -> bool {
        true
    }
}

#[test]
pub fn test_shutdown_returns_after_worker_panic() -> Result<(), Box<dyn Error>> {
    let pool = Arc::new(ReusePool::with_config(Box::new(|key : &'_ str| -> Result<PanicOnClean, Box<dyn Error>> {
        Ok(PanicOnClean { key : key.to_string() })
    }), PoolConfig::new(4, 4))?);

    pool.release(pool.acquire("k")?);
    wait_until("worker to stop", || !pool.is_worker_running());

    let (tx, rx) = mpsc::channel();
    let shutdown_pool = pool.clone();
    std::thread::spawn(move || {
        shutdown_pool.shutdown();
        let _ = tx.send(());
    });

    assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok(), "shutdown hung after the worker panicked");
    assert!(!pool.is_running());
    assert_eq!(0, pool.size());
    assert_eq!(0, pool.pending_size());
    Ok(())
}

#[test]
pub fn test_release_racing_shutdown_leaves_nothing() -> Result<(), Box<dyn Error>> {
    const THREADS : usize = 6;

    for background in [false, true] {
        let (pool, tally) = test_pool(PoolConfig::new(16, 16), background, None)?;
        let pool = Arc::new(pool);

        let workers : Vec<_> = (0..THREADS).map(|t| {
            let pool = pool.clone();
            std::thread::spawn(move || -> Result<(), String> {
                let key = format!("k{}", t % 3);
                for _ in 0..500 {
                    let obj = pool.acquire(&key).map_err(|e| e.to_string())?;
                    pool.release(obj);
                }
                Ok(())
            })
        }).collect();

        std::thread::sleep(Duration::from_millis(2));
        pool.shutdown();

        for w in workers {
            let joined = w.join().map_err(|_| "release thread panicked")?;
            joined?;
        }

        assert_eq!(0, pool.size());
        assert_eq!(0, pool.pending_size());
        assert_eq!(0, tally.live.load(Ordering::SeqCst));
    }
    Ok(())
}
