//! Concurrent readers/writers stress tests

use datastore_rs::{Datastore, ResourceType};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Every byte of the word equals `b`, so a torn write shows up as mixed bytes
fn splat(b: u8) -> u32 {
    u32::from_le_bytes([b; 4])
}

#[test]
fn test_10_concurrent_readers_2_writers() {
    let store = Arc::new(Datastore::new());
    store
        .add_fixed_length_resource(0, ResourceType::Uint32, 16)
        .unwrap();
    store.add_string_resource(1, 4, 32).unwrap();

    let handles: Vec<_> = (0..12)
        .map(|thread_id| {
            let store = store.clone();
            std::thread::spawn(move || {
                if thread_id < 2 {
                    // Writer thread
                    for i in 0..2000u32 {
                        let instance = (i % 16) as i32;
                        let b = (i % 251) as u8;
                        store.set_uint32(0, instance, splat(b)).unwrap();
                        let text = format!("w{}-{}", thread_id, b);
                        store.set_string(1, (i % 4) as i32, &text).unwrap();
                    }
                } else {
                    // Reader thread
                    for _ in 0..2000 {
                        let instance = (rand::random::<u32>() % 16) as i32;
                        let value = store.get_uint32(0, instance).unwrap();
                        let bytes = value.to_le_bytes();
                        assert!(bytes.iter().all(|&b| b == bytes[0]), "torn read {:08x}", value);

                        let text = store.get_string(1, instance % 4).unwrap();
                        assert!(text.is_empty() || text.starts_with('w'), "torn string {:?}", text);
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}

#[test]
fn test_concurrent_registration_and_access() {
    let store = Arc::new(Datastore::new());

    // Each thread registers its own ids while others read and write theirs
    let handles: Vec<_> = (0..8)
        .map(|thread_id| {
            let store = store.clone();
            std::thread::spawn(move || {
                for round in 0..50 {
                    let id = thread_id + round * 8;
                    store
                        .add_fixed_length_resource(id, ResourceType::Int32, 2)
                        .unwrap();
                    store.set_int32(id, 1, id).unwrap();
                    assert_eq!(store.get_int32(id, 1).unwrap(), id);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.resource_count(), 400);
    assert_eq!(store.max_resource_id(), Some(399));
    for id in 0..400 {
        assert_eq!(store.get_int32(id, 0).unwrap(), 0);
        assert_eq!(store.get_int32(id, 1).unwrap(), id);
    }
}

#[test]
fn test_duplicate_registration_race_has_one_winner() {
    let store = Arc::new(Datastore::new());
    let winners = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = store.clone();
            let winners = winners.clone();
            std::thread::spawn(move || {
                if store
                    .add_fixed_length_resource(7, ResourceType::Uint8, 1)
                    .is_ok()
                {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    assert_eq!(store.resource_count(), 1);
}

#[test]
fn test_reentrant_callbacks_under_contention() {
    let store = Arc::new(Datastore::new());
    store
        .add_fixed_length_resource(0, ResourceType::Uint32, 4)
        .unwrap();
    store
        .add_fixed_length_resource(1, ResourceType::Uint32, 4)
        .unwrap();

    // Mirror every write of resource 0 into resource 1 from inside the callback
    store
        .add_set_callback(0, |store, id, instance| {
            let value = store.get_uint32(id, instance).unwrap();
            store.set_uint32(1, instance, value).unwrap();
        })
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|instance| {
            let store = store.clone();
            std::thread::spawn(move || {
                for value in 1..=500u32 {
                    store.set_uint32(0, instance, value).unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    for instance in 0..4 {
        assert_eq!(store.get_uint32(1, instance).unwrap(), 500);
    }
}

#[test]
fn test_concurrent_increments_never_exceed_total() {
    let store = Arc::new(Datastore::new());
    store
        .add_fixed_length_resource(0, ResourceType::Uint32, 1)
        .unwrap();
    let notified = Arc::new(AtomicUsize::new(0));
    let notified_clone = notified.clone();
    store
        .add_set_callback(0, move |_, _, _| {
            notified_clone.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..250 {
                    store.increment(0, 0).unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    // Increments are a get followed by a set, so overlapping ones may be lost
    let value = store.get_uint32(0, 0).unwrap();
    assert!((1..=1000).contains(&value), "value {}", value);
    assert_eq!(notified.load(Ordering::Relaxed), 1000);
}

#[test]
fn test_free_while_accessing() {
    let store = Arc::new(Datastore::new());
    store
        .add_fixed_length_resource(0, ResourceType::Uint8, 1)
        .unwrap();
    let errors = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            let errors = errors.clone();
            std::thread::spawn(move || {
                for i in 0..1000u32 {
                    if let Err(e) = store.set_uint8(0, 0, i as u8) {
                        errors.lock().push(e.status());
                    }
                }
            })
        })
        .collect();

    store.free();
    for h in handles {
        h.join().unwrap();
    }

    assert!(store.is_freed());
    assert!(errors
        .lock()
        .iter()
        .all(|&status| status == datastore_rs::Status::NullPointer));
}
