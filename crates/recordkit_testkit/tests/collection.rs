//! Collections forwarding to their children.

use recordkit_testkit::prelude::*;

fn people(hooks: &RecordingHooks, names: &[&str]) -> PersistedCollection<RecordingHooks> {
    let people = PersistedCollection::new();
    for name in names {
        let person = person(hooks.clone());
        person.set_property(NAME, *name).unwrap();
        people.push(person);
    }
    people
}

fn names(people: &PersistedCollection<RecordingHooks>) -> Vec<String> {
    people
        .iter()
        .map(|p| p.get_property::<String>(NAME).unwrap())
        .collect()
}

#[test]
fn save_and_delete_forward_to_children() {
    let hooks = RecordingHooks::new();
    let people = people(&hooks, &["Ann", "Bob"]);

    people.save().unwrap();
    assert_eq!(hooks.calls(), vec![HookCall::Create, HookCall::Create]);

    let members: Vec<_> = people.iter().collect();
    people.delete().unwrap();
    assert!(people.is_empty());
    assert!(members
        .iter()
        .all(|p| p.state() == ModificationState::Deleted));
    assert_eq!(
        hooks.calls()[2..],
        [HookCall::Delete, HookCall::Delete]
    );
}

#[test]
fn save_stops_at_first_failure() {
    let hooks = RecordingHooks::new();
    let people = people(&hooks, &["Ann", "Bob"]);
    hooks.fail_on(HookCall::Create);

    assert!(people.save().is_err());
    assert_eq!(hooks.calls(), vec![HookCall::Create]);
    assert!(people
        .iter()
        .all(|p| p.state() == ModificationState::New));
}

#[test]
fn child_deleted_directly_leaves_collection() {
    let hooks = RecordingHooks::new();
    let people = people(&hooks, &["Ann", "Bob", "Cy"]);
    people.save().unwrap();

    let bob = people.get(1).unwrap();
    bob.delete().unwrap();
    assert_eq!(names(&people), vec!["Ann", "Cy"]);
    assert!(!people.contains(bob.id()));
}

#[test]
fn collection_transaction_rolls_back_children_and_membership() {
    init_tracing();
    let hooks = RecordingHooks::new();
    let people = people(&hooks, &["Ann", "Bob"]);
    people.save().unwrap();

    let txn = people.begin_transaction().unwrap();
    for person in people.iter() {
        person.set_property_in(&txn, AGE, 50).unwrap();
    }
    let extra = person(hooks.clone());
    extra.set_property(NAME, "Cy").unwrap();
    people.push(extra);
    assert_eq!(people.len(), 3);

    people.rollback(&txn).unwrap();
    assert_eq!(names(&people), vec!["Ann", "Bob"]);
    assert!(people.iter().all(|p| p.value(AGE).is_none()));
    people.end_transaction(&txn).unwrap();
}

#[test]
fn failure_in_one_child_is_visible_on_collection() {
    let hooks = RecordingHooks::new();
    let people = people(&hooks, &["Ann", "Bob"]);
    people.save().unwrap();

    let txn = people.begin_transaction().unwrap();
    let ann = people.get(0).unwrap();
    ann.set_property_in(&txn, AGE, 20).unwrap();
    assert!(ann.set_property_in(&txn, AGE, -5).is_err());

    assert!(people.has_transaction_failed());
    assert_eq!(
        people.transaction_errors(),
        vec!["Integer is smaller than minimum value of 0."]
    );
    people.end_transaction(&txn).unwrap();
    assert_eq!(ann.value(AGE), None);
}

#[test]
fn dropping_collection_transaction_aborts_it() {
    let hooks = RecordingHooks::new();
    let people = people(&hooks, &["Ann"]);
    people.save().unwrap();
    {
        let txn = people.begin_transaction().unwrap();
        people.get(0).unwrap().set_property_in(&txn, NAME, "Anne").unwrap();
        people.clear();
    }
    assert_eq!(names(&people), vec!["Ann"]);
    assert_eq!(people.active_transaction(), None);
}
