//! Save, fetch and delete dispatch through persistence hooks.

use recordkit_testkit::prelude::*;

#[test]
fn new_object_creates_then_updates() {
    init_tracing();
    let hooks = RecordingHooks::new();
    let person = person(hooks.clone());
    person.set_property(NAME, "Bob").unwrap();
    assert_eq!(person.state(), ModificationState::New);

    person.save().unwrap();
    assert_eq!(person.state(), ModificationState::Unmodified);

    person.set_property(AGE, 31).unwrap();
    assert_eq!(person.state(), ModificationState::Modified);
    person.save().unwrap();

    // Nothing to save.
    person.save().unwrap();
    assert_eq!(hooks.calls(), vec![HookCall::Create, HookCall::Update]);
    assert_eq!(
        hooks.stored().unwrap().get(AGE),
        Some(&Value::Integer(31))
    );
}

#[test]
fn failed_update_keeps_modified() {
    let hooks = RecordingHooks::new();
    let person = saved_person(hooks.clone(), "Bob", 30);
    person.set_property(AGE, 31).unwrap();

    hooks.fail_on(HookCall::Update);
    let err = person.save().unwrap_err();
    assert!(matches!(err, CoreError::PersistenceFailed(_)));
    assert_eq!(person.state(), ModificationState::Modified);
    assert_eq!(person.get_property::<i64>(AGE).unwrap(), 31);

    hooks.heal();
    person.save().unwrap();
    assert_eq!(person.state(), ModificationState::Unmodified);
}

#[test]
fn fetch_replaces_data_and_clears_modified() {
    let hooks = RecordingHooks::new();
    let person = saved_person(hooks.clone(), "Bob", 30);
    person.set_property(NAME, "Robert").unwrap();
    person.set_property("Nick", "Bobby").unwrap();

    person.fetch().unwrap();
    assert_eq!(person.state(), ModificationState::Unmodified);
    assert_eq!(person.get_property::<String>(NAME).unwrap(), "Bob");
    assert_eq!(person.value("Nick"), None);
}

#[test]
fn fetch_sees_other_writers() {
    let hooks = RecordingHooks::new();
    let person = saved_person(hooks.clone(), "Bob", 30);

    let mut newer = person.data();
    newer.insert(AGE, 45);
    hooks.set_stored(newer);

    person.fetch().unwrap();
    assert_eq!(person.get_property::<i64>(AGE).unwrap(), 45);
}

#[test]
fn failed_fetch_leaves_object_alone() {
    let hooks = RecordingHooks::new();
    let person = saved_person(hooks.clone(), "Bob", 30);
    person.set_property(AGE, 31).unwrap();

    hooks.fail_on(HookCall::Fetch);
    assert!(person.fetch().is_err());
    assert_eq!(person.state(), ModificationState::Modified);
    assert_eq!(person.get_property::<i64>(AGE).unwrap(), 31);
}

#[test]
fn delete_calls_hook_once() {
    let hooks = RecordingHooks::new();
    let person = saved_person(hooks.clone(), "Bob", 30);
    let events = person.subscribe();

    person.delete().unwrap();
    assert_eq!(person.state(), ModificationState::Deleted);
    assert_eq!(events.try_recv().unwrap().kind, EventKind::Deleted);

    assert!(matches!(
        person.delete(),
        Err(CoreError::IllegalTransition { .. })
    ));
    assert!(matches!(
        person.set_property(NAME, "Ghost"),
        Err(CoreError::InvalidOperation { .. })
    ));
    assert_eq!(hooks.calls(), vec![HookCall::Create, HookCall::Delete]);
}

#[test]
fn deleting_never_saved_object_skips_hook() {
    let hooks = RecordingHooks::new();
    let person = person(hooks.clone());
    person.set_property(NAME, "Bob").unwrap();
    person.delete().unwrap();

    assert_eq!(person.state(), ModificationState::Deleted);
    assert!(hooks.calls().is_empty());

    // Saving a deleted object does nothing.
    person.save().unwrap();
    assert!(hooks.calls().is_empty());
}

#[test]
fn failed_delete_keeps_state() {
    let hooks = RecordingHooks::new();
    let person = saved_person(hooks.clone(), "Bob", 30);
    hooks.fail_on(HookCall::Delete);

    assert!(person.delete().is_err());
    assert_eq!(person.state(), ModificationState::Unmodified);
}

#[test]
fn events_carry_increasing_sequences() {
    let person = person(NoopHooks);
    let events = person.subscribe();
    person.set_property(NAME, "Bob").unwrap();
    person.set_property(AGE, 3).unwrap();
    person.save().unwrap();

    let received: Vec<_> = events.try_iter().collect();
    let sequences: Vec<u64> = received.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    assert!(received.iter().all(|e| e.object_id == person.id()));
    assert_eq!(person.poll_events(2, 10).len(), 1);
}

#[test]
fn subscriber_may_call_back_into_object() {
    let person = person(NoopHooks);
    let events = person.subscribe();
    let observer = {
        let person = person.clone();
        std::thread::spawn(move || {
            let event = events.recv().unwrap();
            // Events are emitted after the object lock is released.
            (event.kind, person.state())
        })
    };

    person.set_property(NAME, "Bob").unwrap();
    let (kind, state) = observer.join().unwrap();
    assert_eq!(
        kind,
        EventKind::PropertyChanged {
            name: NAME.to_string()
        }
    );
    assert_eq!(state, ModificationState::New);
}
