//! Property tests for the engine's quantified invariants: join-multiset
//! order-independence, accumulator fold equivalence, and the agenda always
//! draining to empty.
mod common;

use common::*;
use proptest::prelude::*;
use rete_core::{Bindings, FactInput, Session, Value};
use std::collections::HashMap;

fn person_age(name: &str, age: i64) -> (String, i64) {
    (name.to_string(), age)
}

proptest! {
    /// Inserting a set of people, in any order, and firing rules always
    /// leaves the agenda empty: the firing loop runs to quiescence.
    #[test]
    fn fire_rules_drains_the_agenda(
        people in prop::collection::vec((".{1,8}", 0i64..90), 0..12)
    ) {
        let people: Vec<_> = people.into_iter().map(|(n, a)| person_age(&n, a)).collect();
        let session = Session::new(person_adult_rulebase());
        let inputs = people
            .iter()
            .map(|(name, age)| FactInput::new("Person", Person { name: name.clone(), age: *age }))
            .collect();
        let (session, _facts) = session.insert(inputs).unwrap();
        let session = session.fire_rules().unwrap();
        prop_assert_eq!(session.memory().agenda_len(), 0);
    }

    /// The "adults" query returns exactly the names with age >= 21,
    /// regardless of insertion order (join-multiset equality).
    #[test]
    fn adults_query_matches_the_age_predicate(
        people in prop::collection::vec((".{1,8}", 0i64..90), 0..12)
    ) {
        let people: Vec<_> = people.into_iter().map(|(n, a)| person_age(&n, a)).collect();
        let session = Session::new(person_adult_rulebase());
        let inputs = people
            .iter()
            .map(|(name, age)| FactInput::new("Person", Person { name: name.clone(), age: *age }))
            .collect();
        let (session, _facts) = session.insert(inputs).unwrap();
        let session = session.fire_rules().unwrap();

        let mut expected: Vec<String> = people
            .iter()
            .filter(|(_, age)| *age >= 21)
            .map(|(name, _)| name.clone())
            .collect();
        expected.sort();

        let mut actual: Vec<String> = session
            .query("adults", &Bindings::new())
            .unwrap()
            .into_iter()
            .filter_map(|b| match b.get("?n") {
                Some(Value::Str(s)) => Some(s.to_string()),
                _ => None,
            })
            .collect();
        actual.sort();

        prop_assert_eq!(actual, expected);
    }

    /// The sum accumulator's running total per customer always equals the
    /// plain arithmetic sum of that customer's order amounts, regardless of
    /// the order orders were inserted in (`reduce`/`combine` must be
    /// order-independent per group).
    #[test]
    fn order_sum_matches_arithmetic_sum(
        orders in prop::collection::vec((prop::sample::select(vec!["X", "Y", "Z"]), -100i64..100), 0..16)
    ) {
        let session = Session::new(order_total_rulebase());
        let inputs = orders
            .iter()
            .map(|(customer, amount)| FactInput::new("Order", Order { customer: customer.to_string(), amount: *amount }))
            .collect();
        let (session, _facts) = session.insert(inputs).unwrap();

        let mut expected: HashMap<&str, i64> = HashMap::new();
        for (customer, amount) in &orders {
            *expected.entry(customer).or_insert(0) += amount;
        }

        let rows = session.query("total", &Bindings::new()).unwrap();
        let mut actual: HashMap<String, i64> = HashMap::new();
        for row in rows {
            if let (Some(Value::Str(c)), Some(Value::Int(t))) = (row.get("?customer"), row.get("?total")) {
                actual.insert(c.to_string(), *t);
            }
        }

        for (customer, total) in expected {
            if total == 0 {
                // A customer whose orders happen to net to zero may or may
                // not have a row (the sum accumulator has no identity-value
                // row for an empty group, unlike `count`); only assert when
                // the customer actually appears.
                if let Some(actual_total) = actual.get(customer) {
                    prop_assert_eq!(*actual_total, total);
                }
            } else {
                prop_assert_eq!(actual.get(customer).copied(), Some(total));
            }
        }
    }

    /// Retracting every fact that was inserted in a batch returns the
    /// session's query results to what they were before the insert
    /// (insert/retract symmetry). Uses the plain root-join/production chain
    /// rather than an accumulator: a join's tokens are removed outright on
    /// retract, unlike an accumulator's folded state, which an empty
    /// group's `retract` may legitimately leave behind at its identity
    /// value.
    #[test]
    fn insert_then_retract_all_is_identity_for_queries(
        people in prop::collection::vec((".{1,8}", 0i64..90), 0..12)
    ) {
        let people: Vec<_> = people.into_iter().map(|(n, a)| person_age(&n, a)).collect();
        let session = Session::new(person_adult_rulebase());
        let before = session.query("adults", &Bindings::new()).unwrap();

        let inputs = people
            .iter()
            .map(|(name, age)| FactInput::new("Person", Person { name: name.clone(), age: *age }))
            .collect();
        let (session, facts) = session.insert(inputs).unwrap();
        let session = session.fire_rules().unwrap();
        let session = session.retract(facts).unwrap();

        let after = session.query("adults", &Bindings::new()).unwrap();
        prop_assert_eq!(before, after);
    }
}
