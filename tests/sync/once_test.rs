/*!
 * Once Tests
 */

use ai_os_sync::Once;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn test_hundred_callers_one_execution() {
    const CALLERS: usize = 100;
    let once = Arc::new(Once::new());
    let runs = Arc::new(AtomicUsize::new(0));
    let winner = Arc::new(AtomicUsize::new(usize::MAX));
    let finished = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|id| {
            let once = once.clone();
            let runs = runs.clone();
            let winner = winner.clone();
            let finished = finished.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                once.call_once(|| {
                    runs.fetch_add(1, Ordering::SeqCst);
                    winner.store(id, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    finished.store(true, Ordering::SeqCst);
                });
                // No caller returns before the winning closure completed
                assert!(finished.load(Ordering::SeqCst));
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(winner.load(Ordering::SeqCst) < CALLERS);
    assert!(once.is_completed());
}

#[test]
fn test_panicking_body_is_not_retried() {
    let once = Once::new();
    let attempts = AtomicUsize::new(0);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        once.call_once(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            panic!("initializer failed");
        })
    }));
    assert!(result.is_err());

    once.call_once(|| {
        attempts.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert!(once.is_completed());
}

#[test]
fn test_static_once() {
    static INIT: Once = Once::new();
    static VALUE: AtomicUsize = AtomicUsize::new(0);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            thread::spawn(|| {
                INIT.call_once(|| {
                    VALUE.fetch_add(42, Ordering::SeqCst);
                });
                VALUE.load(Ordering::SeqCst)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 42);
    }
}
