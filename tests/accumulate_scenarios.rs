//! Accumulator folds over right-side facts, with retraction and grouped
//! counting.
mod common;

use common::*;
use rete_core::{Bindings, FactInput, Session, Value};

fn total_for(rows: &[Bindings], customer: &str) -> Option<i64> {
    rows.iter().find_map(|b| match (b.get("?customer"), b.get("?total")) {
        (Some(Value::Str(c)), Some(Value::Int(t))) if c.as_ref() == customer => Some(*t),
        _ => None,
    })
}

#[test]
fn order_sum_accumulates_and_retracts() {
    let session = Session::new(order_total_rulebase());

    let (session, mut order_facts) = session
        .insert(vec![
            FactInput::new("Order", Order { customer: "X".into(), amount: 10 }),
            FactInput::new("Order", Order { customer: "X".into(), amount: 5 }),
            FactInput::new("Order", Order { customer: "Y".into(), amount: 7 }),
        ])
        .unwrap();

    let rows = session.query("total", &Bindings::new()).unwrap();
    assert_eq!(total_for(&rows, "X"), Some(15));
    assert_eq!(total_for(&rows, "Y"), Some(7));

    // Retract one of X's orders: the running total drops by that amount
    // rather than being recomputed from scratch, via the accumulator's
    // `retract` fold.
    let first_order = order_facts.remove(0);
    let session = session.retract(vec![first_order]).unwrap();
    let rows = session.query("total", &Bindings::new()).unwrap();
    assert_eq!(total_for(&rows, "X"), Some(5));
    assert_eq!(total_for(&rows, "Y"), Some(7));
}

fn count_for(rows: &[Bindings], project: &str) -> Option<i64> {
    rows.iter().find_map(|b| match (b.get("?project"), b.get("?count")) {
        (Some(Value::Str(p)), Some(Value::Int(n))) if p.as_ref() == project => Some(*n),
        _ => None,
    })
}

#[test]
fn task_count_per_project_uses_initial_value() {
    let session = Session::new(project_task_count_rulebase());

    let (session, _project_facts) = session
        .insert(vec![FactInput::new("Project", Project { name: "P".into() })])
        .unwrap();

    // No Task has been inserted yet: the count accumulator's initial value
    // already yields a row for "P" at zero, rather than waiting for a first
    // matching fact to create one.
    let rows = session.query("counts", &Bindings::new()).unwrap();
    assert_eq!(count_for(&rows, "P"), Some(0));

    let (session, task_facts) = session
        .insert(vec![
            FactInput::new("Task", Task { project: "P".into() }),
            FactInput::new("Task", Task { project: "P".into() }),
        ])
        .unwrap();

    let rows = session.query("counts", &Bindings::new()).unwrap();
    assert_eq!(count_for(&rows, "P"), Some(2));

    // Retracting both Tasks brings the count back down to zero rather than
    // annihilating the row entirely: a count accumulator has an initial
    // value, so an empty group still has a state to report.
    let session = session.retract(task_facts).unwrap();
    let rows = session.query("counts", &Bindings::new()).unwrap();
    assert_eq!(count_for(&rows, "P"), Some(0));
}
