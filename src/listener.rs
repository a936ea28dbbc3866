//! The observable event stream: every propagation the engine performs, in
//! issue order. Listeners are strictly observers — their methods take
//! `&self`, never see a mutable memory or session handle, and a listener
//! that panics is trusted code whose failure propagates to the caller like
//! any other.
//!
//! Memory distinguishes a mutable transient form from an immutable
//! persistent snapshot; listeners need no such split, since their methods
//! never mutate shared state through `&self` — any `Arc<dyn Listener>` is
//! already safely shareable both across a single `fire`/`insert`/`retract`
//! call and across the calls either side of it. See `DESIGN.md`.
use crate::accumulate::AccumState;
use crate::fact::{Element, Fact};
use crate::ids::NodeId;
use crate::token::{Activation, Token};
use crate::value::Bindings;
use std::sync::Arc;

/// The listener surface. Every method has a no-op default so implementors
/// only override the events they care about.
pub trait Listener: Send + Sync {
    fn left_activate(&self, _node: NodeId, _tokens: &[Token]) {}
    fn left_retract(&self, _node: NodeId, _tokens: &[Token]) {}
    fn right_activate(&self, _node: NodeId, _elements: &[Element]) {}
    fn right_retract(&self, _node: NodeId, _elements: &[Element]) {}
    fn insert_facts(&self, _facts: &[Fact]) {}
    fn retract_facts(&self, _facts: &[Fact]) {}
    fn add_accum_reduced(&self, _node: NodeId, _join_bindings: &Bindings, _fact_bindings: &Bindings, _reduced: &AccumState) {}
    fn add_activations(&self, _node: NodeId, _activations: &[Activation]) {}
    fn remove_activations(&self, _node: NodeId, _activations: &[Activation]) {}
    fn fire_rules(&self, _node: NodeId) {}
    fn send_message(&self, _message: &str) {}
}

/// The identity listener: a `Session` built with no listeners uses this.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullListener;

impl Listener for NullListener {}

/// Forwards every event to an ordered list of children, in issue order.
#[derive(Clone, Default)]
pub struct DelegatingListener {
    children: Vec<Arc<dyn Listener>>,
}

impl DelegatingListener {
    pub fn new(children: Vec<Arc<dyn Listener>>) -> Self {
        Self { children }
    }
}

impl Listener for DelegatingListener {
    fn left_activate(&self, node: NodeId, tokens: &[Token]) {
        for c in &self.children {
            c.left_activate(node, tokens);
        }
    }

    fn left_retract(&self, node: NodeId, tokens: &[Token]) {
        for c in &self.children {
            c.left_retract(node, tokens);
        }
    }

    fn right_activate(&self, node: NodeId, elements: &[Element]) {
        for c in &self.children {
            c.right_activate(node, elements);
        }
    }

    fn right_retract(&self, node: NodeId, elements: &[Element]) {
        for c in &self.children {
            c.right_retract(node, elements);
        }
    }

    fn insert_facts(&self, facts: &[Fact]) {
        for c in &self.children {
            c.insert_facts(facts);
        }
    }

    fn retract_facts(&self, facts: &[Fact]) {
        for c in &self.children {
            c.retract_facts(facts);
        }
    }

    fn add_accum_reduced(&self, node: NodeId, join_bindings: &Bindings, fact_bindings: &Bindings, reduced: &AccumState) {
        for c in &self.children {
            c.add_accum_reduced(node, join_bindings, fact_bindings, reduced);
        }
    }

    fn add_activations(&self, node: NodeId, activations: &[Activation]) {
        for c in &self.children {
            c.add_activations(node, activations);
        }
    }

    fn remove_activations(&self, node: NodeId, activations: &[Activation]) {
        for c in &self.children {
            c.remove_activations(node, activations);
        }
    }

    fn fire_rules(&self, node: NodeId) {
        for c in &self.children {
            c.fire_rules(node);
        }
    }

    fn send_message(&self, message: &str) {
        for c in &self.children {
            c.send_message(message);
        }
    }
}

/// A listener that appends a short tag per event to a shared log — handy
/// for asserting event order in tests without writing a bespoke listener
/// per test.
#[derive(Clone, Default)]
pub struct RecordingListener {
    pub log: Arc<std::sync::Mutex<Vec<String>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.log.lock().expect("recording listener mutex poisoned").clone()
    }

    fn push(&self, event: String) {
        self.log.lock().expect("recording listener mutex poisoned").push(event);
    }
}

impl Listener for RecordingListener {
    fn left_activate(&self, node: NodeId, tokens: &[Token]) {
        self.push(format!("left-activate({:?}, {})", node, tokens.len()));
    }

    fn left_retract(&self, node: NodeId, tokens: &[Token]) {
        self.push(format!("left-retract({:?}, {})", node, tokens.len()));
    }

    fn right_activate(&self, node: NodeId, elements: &[Element]) {
        self.push(format!("right-activate({:?}, {})", node, elements.len()));
    }

    fn right_retract(&self, node: NodeId, elements: &[Element]) {
        self.push(format!("right-retract({:?}, {})", node, elements.len()));
    }

    fn insert_facts(&self, facts: &[Fact]) {
        self.push(format!("insert-facts({})", facts.len()));
    }

    fn retract_facts(&self, facts: &[Fact]) {
        self.push(format!("retract-facts({})", facts.len()));
    }

    fn add_accum_reduced(&self, node: NodeId, _join_bindings: &Bindings, _fact_bindings: &Bindings, _reduced: &AccumState) {
        self.push(format!("add-accum-reduced({:?})", node));
    }

    fn add_activations(&self, node: NodeId, activations: &[Activation]) {
        self.push(format!("add-activations({:?}, {})", node, activations.len()));
    }

    fn remove_activations(&self, node: NodeId, activations: &[Activation]) {
        self.push(format!("remove-activations({:?}, {})", node, activations.len()));
    }

    fn fire_rules(&self, node: NodeId) {
        self.push(format!("fire-rules({:?})", node));
    }

    fn send_message(&self, message: &str) {
        self.push(format!("send-message({})", message));
    }
}
