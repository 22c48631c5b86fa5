/*!
 * RWMutex Tests
 * Reader overlap and writer exclusivity
 */

use ai_os_sync::{RawRwMutex, RwMutex};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const SENTINEL: i64 = -1;

#[test]
fn test_readers_hold_lock_together() {
    const READERS: usize = 4;
    let rw = Arc::new(RawRwMutex::new());
    // Every reader waits inside its read section for all the others, which
    // can only complete if the read sections overlap.
    let barrier = Arc::new(Barrier::new(READERS));

    let handles: Vec<_> = (0..READERS)
        .map(|_| {
            let rw = rw.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                rw.rlock();
                barrier.wait();
                rw.runlock();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(rw.try_lock());
    rw.unlock();
}

#[test]
fn test_readers_never_see_writer_sentinel() {
    let rw = Arc::new(RawRwMutex::new());
    let value = Arc::new(AtomicI64::new(0));
    let stop = Arc::new(AtomicBool::new(false));
    let reads = Arc::new(AtomicUsize::new(0));

    let writers: Vec<_> = (0..2)
        .map(|_| {
            let rw = rw.clone();
            let value = value.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    rw.lock();
                    let previous = value.swap(SENTINEL, Ordering::Relaxed);
                    assert_ne!(previous, SENTINEL, "two writers inside");
                    thread::yield_now();
                    value.store(previous + 1, Ordering::Relaxed);
                    rw.unlock();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let rw = rw.clone();
            let value = value.clone();
            let stop = stop.clone();
            let reads = reads.clone();
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    rw.rlock();
                    assert_ne!(value.load(Ordering::Relaxed), SENTINEL);
                    reads.fetch_add(1, Ordering::Relaxed);
                    rw.runlock();
                }
            })
        })
        .collect();

    for handle in writers {
        handle.join().unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    for handle in readers {
        handle.join().unwrap();
    }

    assert_eq!(value.load(Ordering::Relaxed), 400);
    assert!(reads.load(Ordering::Relaxed) > 0);
}

#[test]
fn test_pending_writer_blocks_new_readers() {
    let rw = Arc::new(RawRwMutex::new());
    rw.rlock();

    let writer = {
        let rw = rw.clone();
        thread::spawn(move || {
            rw.lock();
            rw.unlock();
        })
    };

    while !rw.is_write_pending() {
        thread::sleep(Duration::from_millis(1));
    }
    // Writer preference: a new reader may not slip in ahead of the writer
    assert!(!rw.try_rlock());

    rw.runlock();
    writer.join().unwrap();
    assert!(rw.try_rlock());
    rw.runlock();
}

#[test]
fn test_typed_guards() {
    let table = Arc::new(RwMutex::new(Vec::<u32>::new()));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let table = table.clone();
            thread::spawn(move || {
                table.write().push(i);
                let _ = table.read().len();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    let mut values = table.read().clone();
    values.sort_unstable();
    assert_eq!(values, vec![0, 1, 2, 3]);
}
