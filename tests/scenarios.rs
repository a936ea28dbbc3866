//! End-to-end scenarios run against hand-built rulebases (`tests/common`)
//! standing in for a rule DSL compiler's output.
mod common;

use common::*;
use rete_core::{Bindings, DelegatingListener, FactInput, RecordingListener, Session};
use std::sync::Arc;

#[test]
fn adults_query_tracks_insert_and_retract() {
    let session = Session::new(person_adult_rulebase());

    let (session, mut facts) = session
        .insert(vec![
            FactInput::new("Person", Person { name: "A".into(), age: 30 }),
            FactInput::new("Person", Person { name: "B".into(), age: 15 }),
        ])
        .unwrap();
    let session = session.fire_rules().unwrap();

    let adults = session.query("adults", &Bindings::new()).unwrap();
    assert_eq!(adults.len(), 1);
    assert_eq!(adults[0].get("?n"), Some(&"A".into()));

    // Retract "A": the query empties out, and the Adult fact the RHS
    // inserted while "A"'s token was active is cascade-retracted too,
    // via the insertion log.
    let a = facts.remove(0);
    let session = session.retract(vec![a]).unwrap();
    let adults = session.query("adults", &Bindings::new()).unwrap();
    assert!(adults.is_empty());
}

#[test]
fn unknown_query_is_an_error() {
    let session = Session::new(person_adult_rulebase());
    assert!(session.query("no-such-query", &Bindings::new()).is_err());
}

#[test]
fn negation_tracks_manager_presence() {
    let session = Session::new(employee_manager_rulebase());

    let (session, employee_facts) = session
        .insert(vec![FactInput::new("Employee", Employee { name: "E".into() })])
        .unwrap();
    let session = session.fire_rules().unwrap();
    let ics = session.query("ics", &Bindings::new()).unwrap();
    assert_eq!(ics.len(), 1);
    assert_eq!(ics[0].get("?e"), Some(&"E".into()));

    let (session, manager_facts) = session
        .insert(vec![FactInput::new("Manager", Manager { name: "E".into() })])
        .unwrap();
    let session = session.fire_rules().unwrap();
    assert!(session.query("ics", &Bindings::new()).unwrap().is_empty());

    // Retracting the Manager fact brings "E" back as an individual
    // contributor.
    let session = session.retract(manager_facts).unwrap();
    let session = session.fire_rules().unwrap();
    let ics = session.query("ics", &Bindings::new()).unwrap();
    assert_eq!(ics.len(), 1);
    assert_eq!(ics[0].get("?e"), Some(&"E".into()));

    drop(employee_facts);
}

#[test]
fn no_loop_flag_fires_exactly_once() {
    let session = Session::new(flag_no_loop_rulebase());
    let (session, _facts) = session.insert(vec![FactInput::new("Flag", Flag)]).unwrap();
    assert_eq!(session.memory().agenda_len(), 1);

    let session = session.fire_rules().unwrap();
    assert_eq!(session.memory().agenda_len(), 0);
}

#[test]
fn listener_sees_propagation_in_issue_order() {
    init_tracing();
    let recorder = RecordingListener::new();
    let listener: Arc<dyn rete_core::Listener> = Arc::new(DelegatingListener::new(vec![Arc::new(recorder.clone())]));
    let session = Session::with_listener(person_adult_rulebase(), listener);

    let (session, _facts) = session
        .insert(vec![FactInput::new("Person", Person { name: "A".into(), age: 30 })])
        .unwrap();
    let _session = session.fire_rules().unwrap();

    let events = recorder.events();
    assert_eq!(events[0], "insert-facts(1)");
    assert!(events.iter().any(|e| e.starts_with("right-activate")));
    assert!(events.iter().any(|e| e.starts_with("left-activate")));
    assert!(events.iter().any(|e| e.starts_with("add-activations")));
    assert!(events.iter().any(|e| e.starts_with("fire-rules")));

    // Reproducible: the same insert against a fresh session produces the
    // identical event trace, in the same exact order, across runs.
    let recorder2 = RecordingListener::new();
    let listener2: Arc<dyn rete_core::Listener> = Arc::new(DelegatingListener::new(vec![Arc::new(recorder2.clone())]));
    let session2 = Session::with_listener(person_adult_rulebase(), listener2);
    let (session2, _facts2) = session2
        .insert(vec![FactInput::new("Person", Person { name: "A".into(), age: 30 })])
        .unwrap();
    let _session2 = session2.fire_rules().unwrap();
    assert_eq!(events, recorder2.events());
}
