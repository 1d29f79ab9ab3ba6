//! Transactions from several threads on one object.

use parking_lot::Mutex;
use recordkit_testkit::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn second_transaction_waits_for_first() {
    init_tracing();
    let person = saved_person(NoopHooks, "Bob", 30);
    let first = person.begin_transaction().unwrap();
    person.set_property_in(&first, AGE, 31).unwrap();

    let waiter = {
        let person = person.clone();
        thread::spawn(move || {
            let txn = person.begin_transaction().unwrap();
            // Sees the first transaction's committed value.
            let age = person.get_property::<i64>(AGE).unwrap();
            person.set_property_in(&txn, AGE, age + 1).unwrap();
            person.end_transaction(&txn).unwrap();
        })
    };

    thread::sleep(Duration::from_millis(20));
    assert_eq!(person.active_transaction(), Some(first.id()));
    person.end_transaction(&first).unwrap();

    waiter.join().unwrap();
    assert_eq!(person.get_property::<i64>(AGE).unwrap(), 32);
}

#[test]
fn waiters_are_admitted_in_arrival_order() {
    let person = saved_person(NoopHooks, "Bob", 30);
    let holder = person.begin_transaction().unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut workers = Vec::new();
    for i in 0..4_i64 {
        let person = person.clone();
        let order = Arc::clone(&order);
        workers.push(thread::spawn(move || {
            let txn = person.begin_transaction().unwrap();
            order.lock().push(i);
            person.end_transaction(&txn).unwrap();
        }));
        // Let each worker queue before the next arrives.
        thread::sleep(Duration::from_millis(30));
    }

    person.end_transaction(&holder).unwrap();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
}

#[test]
fn completing_queued_transaction_unblocks_it() {
    let person = saved_person(NoopHooks, "Bob", 30);
    let holder = person.begin_transaction().unwrap();

    let queued = Transaction::new();
    let worker = {
        let person = person.clone();
        let queued = queued.clone();
        thread::spawn(move || person.enlist(&queued))
    };
    thread::sleep(Duration::from_millis(30));

    queued.abort();
    let result = worker.join().unwrap();
    assert!(matches!(result, Err(CoreError::TransactionCompleted { .. })));
    assert_eq!(person.active_transaction(), Some(holder.id()));

    person.end_transaction(&holder).unwrap();
    let next = person.begin_transaction().unwrap();
    person.end_transaction(&next).unwrap();
}

#[test]
fn aborting_holder_admits_next() {
    let person = saved_person(NoopHooks, "Bob", 30);
    let holder = person.begin_transaction().unwrap();
    person.set_property_in(&holder, AGE, 99).unwrap();

    let worker = {
        let person = person.clone();
        thread::spawn(move || {
            let txn = person.begin_transaction().unwrap();
            let age = person.get_property::<i64>(AGE).unwrap();
            person.end_transaction(&txn).unwrap();
            age
        })
    };
    thread::sleep(Duration::from_millis(20));

    holder.abort();
    assert_eq!(worker.join().unwrap(), 30);
    assert_eq!(person.active_transaction(), None);
}

#[test]
fn stress_keeps_admission_exclusive() {
    let person = saved_person(NoopHooks, "Bob", 30);
    person.set_property(COUNTER, 0).unwrap();
    person.save().unwrap();

    let config = StressConfig {
        threads: 6,
        rounds: 20,
        rollback_every: 4,
        ..StressConfig::default()
    };
    let result = stress_counter_transactions(&person, &config).unwrap();
    result.print_summary("counter transactions");

    assert!(result.is_exclusive());
    assert_eq!(result.admissions.len(), 120);
    assert_eq!(result.rolled_back, 30);
    assert_eq!(person.get_property::<i64>(COUNTER).unwrap(), 90);
}

#[test]
fn other_threads_cannot_persist_a_held_object() {
    let hooks = RecordingHooks::new();
    let person = saved_person(hooks.clone(), "Bob", 30);
    let txn = person.begin_transaction().unwrap();
    person.set_property_in(&txn, NAME, "Alice").unwrap();

    let outsider = {
        let person = person.clone();
        thread::spawn(move || {
            let save = person.save();
            let delete = person.delete();
            (save, delete)
        })
    };
    let (save, delete) = outsider.join().unwrap();
    assert!(matches!(save, Err(CoreError::InvalidOperation { .. })));
    assert!(matches!(delete, Err(CoreError::InvalidOperation { .. })));
    assert_eq!(hooks.calls(), vec![HookCall::Create]);

    person.rollback(&txn).unwrap();
    person.end_transaction(&txn).unwrap();
    assert_eq!(person.get_property::<String>(NAME).unwrap(), "Bob");
    assert_eq!(person.state(), ModificationState::Unmodified);
}
