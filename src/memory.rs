//! Working memory: the transient/persistent duality that lets a `Session`
//! be a value.
//!
//! `PersistentMemory` is a snapshot built on `im`'s structurally-shared
//! collections, so cloning it is O(1) — this is what lets a `Session` be
//! a plain value, freely shareable across threads. `TransientMemory` owns
//! the same collections and mutates them in place for the duration of one
//! `insert`/`retract`/`fire_rules` call; because `im` collections only
//! copy-on-write when a substructure is actually shared, a transient with
//! the sole reference to its own state mutates in place just like a plain
//! `HashMap` would.
use crate::accumulate::AccumState;
use crate::error::{Result, RuleEngineError};
use crate::fact::{Element, Fact};
use crate::ids::{FactId, NodeId};
use crate::token::{Activation, Token};
use crate::value::Bindings;
use std::cell::Cell;

type TokenKey = (NodeId, Bindings);
type ElementKey = (NodeId, Bindings);
type AccumKey = (NodeId, Bindings);
type InsertionKey = (NodeId, Token);

#[derive(Clone, Default)]
struct MemoryState {
    tokens: im::HashMap<TokenKey, im::Vector<Token>>,
    elements: im::HashMap<ElementKey, im::Vector<Element>>,
    accum_reductions: im::HashMap<AccumKey, im::HashMap<Bindings, AccumState>>,
    insertion_log: im::HashMap<InsertionKey, im::Vector<Fact>>,
    agenda: im::Vector<Activation>,
    next_fact_id: u64,
}

/// An immutable snapshot of working memory. Cheap to clone; a `Session`
/// holds one of these between mutating calls.
#[derive(Clone, Default)]
pub struct PersistentMemory(MemoryState);

impl PersistentMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_transient(self) -> TransientMemory {
        TransientMemory {
            state: self.0,
            invalidated: Cell::new(false),
        }
    }

    /// Read-only accessors, usable without going through a transient phase
    /// — `Session::query` uses these, since a query never mutates memory.
    pub fn tokens_at(&self, node: NodeId, join_bindings: &Bindings) -> im::Vector<Token> {
        self.0
            .tokens
            .get(&(node, join_bindings.clone()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn agenda_len(&self) -> usize {
        self.0.agenda.len()
    }
}

impl std::fmt::Debug for PersistentMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentMemory")
            .field("agenda_len", &self.0.agenda.len())
            .field("token_buckets", &self.0.tokens.len())
            .field("element_buckets", &self.0.elements.len())
            .finish_non_exhaustive()
    }
}

/// A mutable working set, valid for the duration of one
/// `insert`/`retract`/`fire_rules` call. Not thread-safe; every method
/// re-checks an `invalidated` sentinel so a use-after-`to_persistent` is a
/// detected error rather than a silent no-op on stale state.
pub struct TransientMemory {
    state: MemoryState,
    invalidated: Cell<bool>,
}

impl TransientMemory {
    fn check(&self) -> Result<()> {
        if self.invalidated.get() {
            Err(RuleEngineError::InvalidatedTransient)
        } else {
            Ok(())
        }
    }

    /// Takes this transient's state and wraps it back into a snapshot.
    /// Further calls to any other method on this transient return
    /// [`RuleEngineError::InvalidatedTransient`].
    pub fn to_persistent(&mut self) -> Result<PersistentMemory> {
        self.check()?;
        self.invalidated.set(true);
        Ok(PersistentMemory(std::mem::take(&mut self.state)))
    }

    pub fn next_fact_id(&mut self) -> Result<FactId> {
        self.check()?;
        let id = FactId(self.state.next_fact_id);
        self.state.next_fact_id += 1;
        Ok(id)
    }

    // -- tokens --------------------------------------------------------

    pub fn add_tokens(&mut self, node: NodeId, join_bindings: Bindings, tokens: &[Token]) -> Result<()> {
        self.check()?;
        if tokens.is_empty() {
            return Ok(());
        }
        let bucket = self.state.tokens.entry((node, join_bindings)).or_default();
        for t in tokens {
            bucket.push_back(t.clone());
        }
        Ok(())
    }

    /// Removes `tokens` from the (node, join_bindings) bucket and returns
    /// exactly the ones that were actually present — callers must not
    /// fabricate downstream retractions for tokens that were never stored.
    pub fn remove_tokens(&mut self, node: NodeId, join_bindings: Bindings, tokens: &[Token]) -> Result<Vec<Token>> {
        self.check()?;
        let key = (node, join_bindings);
        let Some(bucket) = self.state.tokens.get_mut(&key) else {
            return Ok(Vec::new());
        };
        let mut removed = Vec::new();
        for t in tokens {
            if let Some(pos) = bucket.iter().position(|x| x == t) {
                bucket.remove(pos);
                removed.push(t.clone());
            }
        }
        if bucket.is_empty() {
            self.state.tokens.remove(&key);
        }
        Ok(removed)
    }

    pub fn get_tokens(&self, node: NodeId, join_bindings: Bindings) -> Result<im::Vector<Token>> {
        self.check()?;
        Ok(self.state.tokens.get(&(node, join_bindings)).cloned().unwrap_or_default())
    }

    // -- elements --------------------------------------------------------

    pub fn add_elements(&mut self, node: NodeId, join_bindings: Bindings, elements: &[Element]) -> Result<()> {
        self.check()?;
        if elements.is_empty() {
            return Ok(());
        }
        let bucket = self.state.elements.entry((node, join_bindings)).or_default();
        for e in elements {
            bucket.push_back(e.clone());
        }
        Ok(())
    }

    /// See [`Self::remove_tokens`]: returns only the elements that were
    /// actually present.
    pub fn remove_elements(&mut self, node: NodeId, join_bindings: Bindings, elements: &[Element]) -> Result<Vec<Element>> {
        self.check()?;
        let key = (node, join_bindings);
        let Some(bucket) = self.state.elements.get_mut(&key) else {
            return Ok(Vec::new());
        };
        let mut removed = Vec::new();
        for e in elements {
            if let Some(pos) = bucket.iter().position(|x| x == e) {
                bucket.remove(pos);
                removed.push(e.clone());
            }
        }
        if bucket.is_empty() {
            self.state.elements.remove(&key);
        }
        Ok(removed)
    }

    pub fn get_elements(&self, node: NodeId, join_bindings: Bindings) -> Result<im::Vector<Element>> {
        self.check()?;
        Ok(self.state.elements.get(&(node, join_bindings)).cloned().unwrap_or_default())
    }

    // -- accumulator reductions -----------------------------------------

    pub fn get_accum_group(&self, node: NodeId, join_bindings: Bindings) -> Result<im::HashMap<Bindings, AccumState>> {
        self.check()?;
        Ok(self.state.accum_reductions.get(&(node, join_bindings)).cloned().unwrap_or_default())
    }

    pub fn get_accum_reduced(&self, node: NodeId, join_bindings: Bindings, fact_bindings: Bindings) -> Result<Option<AccumState>> {
        self.check()?;
        Ok(self
            .state
            .accum_reductions
            .get(&(node, join_bindings))
            .and_then(|group| group.get(&fact_bindings))
            .cloned())
    }

    pub fn set_accum_reduced(&mut self, node: NodeId, join_bindings: Bindings, fact_bindings: Bindings, state: AccumState) -> Result<()> {
        self.check()?;
        self.state
            .accum_reductions
            .entry((node, join_bindings))
            .or_default()
            .insert(fact_bindings, state);
        Ok(())
    }

    pub fn remove_accum_reduced(&mut self, node: NodeId, join_bindings: Bindings, fact_bindings: Bindings) -> Result<Option<AccumState>> {
        self.check()?;
        let key = (node, join_bindings);
        let Some(group) = self.state.accum_reductions.get_mut(&key) else {
            return Ok(None);
        };
        let removed = group.remove(&fact_bindings);
        if group.is_empty() {
            self.state.accum_reductions.remove(&key);
        }
        Ok(removed)
    }

    // -- agenda ----------------------------------------------------------

    pub fn add_activations(&mut self, activations: &[Activation]) -> Result<()> {
        self.check()?;
        for a in activations {
            self.state.agenda.push_back(a.clone());
        }
        Ok(())
    }

    /// Removes every pending activation matching `node` and one of
    /// `tokens`, used when a `ProductionNode`'s left-retract revokes the
    /// tokens those activations were queued for.
    pub fn remove_activations_for(&mut self, node: NodeId, tokens: &[Token]) -> Result<Vec<Activation>> {
        self.check()?;
        let mut removed = Vec::new();
        let mut kept = im::Vector::new();
        for a in self.state.agenda.iter() {
            if a.node == node && tokens.contains(&a.token) {
                removed.push(a.clone());
            } else {
                kept.push_back(a.clone());
            }
        }
        self.state.agenda = kept;
        Ok(removed)
    }

    pub fn pop_activation(&mut self) -> Result<Option<Activation>> {
        self.check()?;
        Ok(self.state.agenda.pop_front())
    }

    pub fn agenda_is_empty(&self) -> Result<bool> {
        self.check()?;
        Ok(self.state.agenda.is_empty())
    }

    // -- insertion log -----------------------------------------------------

    /// Records facts a production's RHS inserted while firing for `token`,
    /// so a later retraction of `token` can cascade-retract exactly those
    /// facts.
    pub fn record_insertions(&mut self, node: NodeId, token: Token, facts: &[Fact]) -> Result<()> {
        self.check()?;
        if facts.is_empty() {
            return Ok(());
        }
        let bucket = self.state.insertion_log.entry((node, token)).or_default();
        for f in facts {
            bucket.push_back(f.clone());
        }
        Ok(())
    }

    /// Removes and returns the facts recorded for (node, token), if any —
    /// called when `token` is retracted from a `ProductionNode`.
    pub fn take_insertions(&mut self, node: NodeId, token: Token) -> Result<im::Vector<Fact>> {
        self.check()?;
        Ok(self.state.insertion_log.remove(&(node, token)).unwrap_or_default())
    }
}
