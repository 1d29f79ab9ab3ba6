//! Restore points.

use recordkit_testkit::prelude::*;

#[test]
fn revert_returns_values_and_state() {
    let person = saved_person(NoopHooks, "Bob", 30);
    person.set_restore_point();

    person.set_property(NAME, "Robert").unwrap();
    person.set_property(BIRTHDAY, date(1994, 2, 3)).unwrap();
    assert_eq!(person.state(), ModificationState::Modified);

    assert!(person.revert_to_restore_point().unwrap());
    assert_eq!(person.get_property::<String>(NAME).unwrap(), "Bob");
    assert_eq!(person.value(BIRTHDAY), None);
    assert_eq!(person.state(), ModificationState::Unmodified);
}

#[test]
fn second_revert_does_nothing() {
    let person = saved_person(NoopHooks, "Bob", 30);
    person.set_restore_point();
    person.set_property(AGE, 31).unwrap();
    assert!(person.revert_to_restore_point().unwrap());

    person.set_property(AGE, 32).unwrap();
    assert!(!person.revert_to_restore_point().unwrap());
    assert_eq!(person.get_property::<i64>(AGE).unwrap(), 32);
}

#[test]
fn revert_without_restore_point_is_noop() {
    let person = saved_person(NoopHooks, "Bob", 30);
    person.set_property(AGE, 31).unwrap();
    assert!(!person.revert_to_restore_point().unwrap());
    assert_eq!(person.get_property::<i64>(AGE).unwrap(), 31);
    assert_eq!(person.state(), ModificationState::Modified);
}

#[test]
fn revert_notifies_changed_properties_only() {
    let person = saved_person(NoopHooks, "Bob", 30);
    person.set_restore_point();
    person.set_property(NAME, "Robert").unwrap();
    person.set_property("Nick", "Rob").unwrap();

    let events = person.subscribe();
    person.revert_to_restore_point().unwrap();
    let mut changed: Vec<EventKind> = events.try_iter().map(|e| e.kind).collect();
    changed.sort_by_key(|kind| format!("{kind:?}"));
    assert_eq!(
        changed,
        vec![
            EventKind::PropertyChanged {
                name: NAME.to_string()
            },
            EventKind::PropertyChanged {
                name: "Nick".to_string()
            },
        ]
    );
}

#[test]
fn new_object_reverts_to_new() {
    let person = person(NoopHooks);
    person.set_restore_point();
    person.set_property(NAME, "Bob").unwrap();
    person.save().unwrap();
    assert_eq!(person.state(), ModificationState::Unmodified);

    person.revert_to_restore_point().unwrap();
    assert_eq!(person.state(), ModificationState::New);
    assert_eq!(person.value(NAME), None);
}

#[test]
fn fetch_discards_restore_point() {
    let person = saved_person(RecordingHooks::new(), "Bob", 30);
    person.set_restore_point();
    person.fetch().unwrap();
    assert!(!person.has_restore_point());
    assert!(!person.revert_to_restore_point().unwrap());
}
