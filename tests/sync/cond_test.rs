/*!
 * Cond Tests
 * Predicate loops over a caller-supplied lock
 */

use ai_os_sync::{Cond, Locker, RawMutex, RawRwMutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Tokens guarded by the cond's lock; the atomic only keeps the test safe
struct Tokens {
    cond: Cond<RawMutex>,
    available: AtomicUsize,
    consumed: AtomicUsize,
}

impl Tokens {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            cond: Cond::new(RawMutex::new()),
            available: AtomicUsize::new(0),
            consumed: AtomicUsize::new(0),
        })
    }

    fn take(&self) {
        self.cond.locker().lock();
        while self.available.load(Ordering::Relaxed) == 0 {
            self.cond.wait();
        }
        self.available.fetch_sub(1, Ordering::Relaxed);
        self.consumed.fetch_add(1, Ordering::SeqCst);
        self.cond.locker().unlock();
    }

    fn give(&self, n: usize) {
        self.cond.locker().lock();
        self.available.fetch_add(n, Ordering::Relaxed);
        self.cond.locker().unlock();
    }
}

fn wait_for(counter: &AtomicUsize, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while counter.load(Ordering::SeqCst) < expected {
        assert!(Instant::now() < deadline, "timed out waiting for {}", expected);
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_signal_then_broadcast() {
    let tokens = Tokens::new();

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let tokens = tokens.clone();
            thread::spawn(move || tokens.take())
        })
        .collect();

    // Give threads time to park
    thread::sleep(Duration::from_millis(50));

    tokens.give(1);
    tokens.cond.signal();
    wait_for(&tokens.consumed, 1);

    thread::sleep(Duration::from_millis(20));
    assert_eq!(tokens.consumed.load(Ordering::SeqCst), 1);

    tokens.give(2);
    tokens.cond.broadcast();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(tokens.consumed.load(Ordering::SeqCst), 3);
}

#[test]
fn test_producer_consumer() {
    const ITEMS: usize = 500;
    let tokens = Tokens::new();

    let consumer = {
        let tokens = tokens.clone();
        thread::spawn(move || {
            for _ in 0..ITEMS {
                tokens.take();
            }
        })
    };

    for _ in 0..ITEMS {
        tokens.give(1);
        tokens.cond.signal();
    }

    consumer.join().unwrap();
    assert_eq!(tokens.consumed.load(Ordering::SeqCst), ITEMS);
}

#[test]
fn test_cond_over_read_lock() {
    let rw = RawRwMutex::new();
    let cond = Cond::new(rw.rlocker());
    let ready = AtomicUsize::new(0);

    thread::scope(|s| {
        s.spawn(|| {
            cond.locker().lock();
            while ready.load(Ordering::SeqCst) == 0 {
                cond.wait();
            }
            cond.locker().unlock();
        });

        thread::sleep(Duration::from_millis(20));
        // Writers are excluded while the waiter holds the read side, but the
        // waiter releases it while parked.
        rw.lock();
        ready.store(1, Ordering::SeqCst);
        rw.unlock();
        cond.broadcast();
    });

    assert!(rw.try_lock());
    rw.unlock();
}
