/*!
 * Mutex Tests
 * Mutual exclusion and starvation behaviour under contention
 */

use ai_os_sync::{Locker, Mutex, RawMutex};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_no_lost_updates() {
    const THREADS: usize = 8;
    const ITERATIONS: u64 = 10_000;

    let counter = Arc::new(Mutex::new(0u64));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..ITERATIONS {
                    let mut guard = counter.lock();
                    // Read-modify-write split in two steps on purpose
                    let current = *guard;
                    *guard = current + 1;
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(*counter.lock(), THREADS as u64 * ITERATIONS);
}

#[test]
fn test_raw_mutex_guards_plain_counter() {
    let lock = Arc::new(RawMutex::new());
    let inside = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let lock = lock.clone();
            let inside = inside.clone();
            let overlaps = overlaps.clone();
            thread::spawn(move || {
                for _ in 0..2_000 {
                    lock.lock();
                    if inside.fetch_add(1, Ordering::Relaxed) != 0 {
                        overlaps.fetch_add(1, Ordering::Relaxed);
                    }
                    inside.fetch_sub(1, Ordering::Relaxed);
                    lock.unlock();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(overlaps.load(Ordering::Relaxed), 0);
    assert!(!lock.is_locked());
}

#[test]
fn test_contended_waiters_all_progress() {
    const THREADS: usize = 4;
    let hold = Duration::from_micros(200);

    let lock = Arc::new(RawMutex::new());
    let stop = Arc::new(AtomicBool::new(false));
    let max_wait_us = Arc::new(AtomicU64::new(0));
    let acquisitions = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let lock = lock.clone();
            let stop = stop.clone();
            let max_wait_us = max_wait_us.clone();
            let acquisitions = acquisitions.clone();
            thread::spawn(move || {
                let mut mine = 0usize;
                while !stop.load(Ordering::Relaxed) {
                    let start = Instant::now();
                    lock.lock();
                    let waited = start.elapsed().as_micros() as u64;
                    max_wait_us.fetch_max(waited, Ordering::Relaxed);
                    thread::sleep(hold);
                    lock.unlock();
                    mine += 1;
                }
                acquisitions.fetch_add(mine, Ordering::Relaxed);
                mine
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(300));
    stop.store(true, Ordering::Relaxed);

    let per_thread: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    // Every contender got the lock, nobody was starved out entirely
    assert!(per_thread.iter().all(|&n| n > 0), "per thread: {:?}", per_thread);
    // Generous bound: far above (THREADS - 1) * hold, far below the run time
    assert!(
        max_wait_us.load(Ordering::Relaxed) < 250_000,
        "max wait {}us",
        max_wait_us.load(Ordering::Relaxed)
    );
    assert!(acquisitions.load(Ordering::Relaxed) >= THREADS);
}

#[test]
fn test_locker_through_arc() {
    let lock: Arc<RawMutex> = Arc::new(RawMutex::new());
    Locker::lock(&lock);
    assert!(lock.is_locked());
    assert!(!lock.try_lock());
    Locker::unlock(&lock);
    assert!(!lock.is_locked());
}

#[test]
#[should_panic(expected = "sync: unlock of unlocked mutex")]
fn test_double_unlock_is_fatal() {
    let lock = RawMutex::new();
    lock.lock();
    lock.unlock();
    lock.unlock();
}
