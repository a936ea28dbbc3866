//! Session: the public state container. Binds a rulebase, a memory
//! snapshot, and a listener into the insert/retract/fire-rules/query
//! surface. Every mutation consumes `self` and returns a new `Session` —
//! the session itself is a value — built on `PersistentMemory`'s O(1)
//! clone so the old snapshot remains valid and freely shareable across
//! threads.
use crate::context::RuleContext;
use crate::error::{Result, RuleEngineError};
use crate::fact::{Fact, FactInput};
use crate::listener::{Listener, NullListener};
use crate::memory::PersistentMemory;
use crate::rulebase::Rulebase;
use crate::token::{Activation, Token};
use crate::value::Bindings;
use std::sync::Arc;

/// Read-only view of a session's parts. The Transport is stateless
/// (`transport.rs`) so there is nothing owned to
/// surface for it beyond the free functions already public there; the
/// alpha-lookup is `rulebase.alpha_roots`, so this struct does not duplicate
/// it either.
pub struct SessionComponents<'a> {
    pub rulebase: &'a Rulebase,
    pub memory: &'a PersistentMemory,
    pub listener: &'a Arc<dyn Listener>,
}

/// The engine's public handle. Cheap to clone (`Arc<Rulebase>` +
/// structurally-shared `PersistentMemory` + `Arc<dyn Listener>`), and safe
/// to share across threads — all mutation happens on an internal
/// `TransientMemory` confined to the body of a single
/// `insert`/`retract`/`fire_rules` call.
#[derive(Clone)]
pub struct Session {
    rulebase: Arc<Rulebase>,
    memory: PersistentMemory,
    listener: Arc<dyn Listener>,
}

impl Session {
    /// Builds a session with no listeners (treated the same as holding a
    /// `NullListener`) and seeds every beta root with the empty token, the
    /// set of nodes that receive it at session start.
    pub fn new(rulebase: impl Into<Arc<Rulebase>>) -> Self {
        Self::with_listener(rulebase, Arc::new(NullListener))
    }

    pub fn with_listener(rulebase: impl Into<Arc<Rulebase>>, listener: Arc<dyn Listener>) -> Self {
        let rulebase = rulebase.into();
        let mut transient = PersistentMemory::new().to_transient();
        {
            let mut ctx = RuleContext::new(&rulebase, &mut transient, listener.as_ref());
            for &root in &rulebase.beta_roots {
                crate::network::left_activate(&mut ctx, root, Bindings::new(), vec![Token::root()])
                    .expect("seeding a freshly built transient cannot fail");
            }
        }
        let memory = transient
            .to_persistent()
            .expect("freshly built transient is never invalidated before this point");
        Self {
            rulebase,
            memory,
            listener,
        }
    }

    /// Inserts `facts`, assigning each a fresh [`crate::ids::FactId`], and
    /// propagates them through the alpha network. Returns the new session
    /// together with the [`Fact`] handles callers need to retract them
    /// later — working memory does not keep a master fact registry of its
    /// own (a `Fact` is opaque and lives only inside the tokens/elements it
    /// produced), so the handle returned here is the only way to name a
    /// specific fact again.
    pub fn insert(mut self, facts: Vec<FactInput>) -> anyhow::Result<(Self, Vec<Fact>)> {
        let mut transient = self.memory.to_transient();
        let built = {
            let mut ctx = RuleContext::new(&self.rulebase, &mut transient, self.listener.as_ref());
            ctx.insert(facts)?
        };
        self.memory = transient.to_persistent()?;
        Ok((self, built))
    }

    /// Retracts `facts`, propagating alpha-retract through the beta
    /// network.
    pub fn retract(mut self, facts: Vec<Fact>) -> anyhow::Result<Self> {
        let mut transient = self.memory.to_transient();
        {
            let mut ctx = RuleContext::new(&self.rulebase, &mut transient, self.listener.as_ref());
            ctx.retract(facts)?;
        }
        self.memory = transient.to_persistent()?;
        Ok(self)
    }

    /// Drains the agenda: pops one activation at a time, invokes its
    /// production's RHS under a `RuleContext` scoped to that firing, and
    /// loops until the agenda is empty. A RHS may call
    /// `ctx.insert`/`ctx.retract`, which mutate the same transient memory in
    /// place and can enqueue further activations — those are picked up by
    /// the same loop, so rule chains fire to quiescence within one
    /// `fire_rules` call.
    ///
    /// On an `Err` from a RHS, this method returns the error without storing
    /// a new snapshot: `self` is consumed, so the caller has no way to keep
    /// using the partially-mutated transient state by accident — the
    /// in-flight session must be discarded on failure.
    pub fn fire_rules(mut self) -> anyhow::Result<Self> {
        let mut transient = self.memory.to_transient();
        loop {
            let Some(Activation { node, token }) = transient.pop_activation()? else {
                break;
            };
            self.listener.fire_rules(node);
            let production = self
                .rulebase
                .node(node)?
                .as_production()
                .cloned()
                .ok_or(RuleEngineError::UnknownNode(node))?;
            let bindings = token.bindings.clone();
            let mut ctx = RuleContext::firing(&self.rulebase, &mut transient, self.listener.as_ref(), node, token);
            production.fire(&mut ctx, &bindings)?;
        }
        self.memory = transient.to_persistent()?;
        Ok(self)
    }

    /// Looks up the named query's stored tokens for `params` and returns
    /// each one's bindings. Fails with
    /// [`RuleEngineError::UnknownQuery`] if `name` is not registered — a
    /// query never mutates memory, so this reads straight off the
    /// persistent snapshot without a transient phase.
    pub fn query(&self, name: &str, params: &Bindings) -> Result<Vec<Bindings>> {
        let node_id = *self
            .rulebase
            .query_nodes
            .get(name)
            .ok_or_else(|| RuleEngineError::UnknownQuery(name.to_string()))?;
        let query_node = self
            .rulebase
            .node(node_id)?
            .as_query()
            .expect("query_nodes only ever points at a QueryNode");
        let join_bindings = params.project(&query_node.param_keys);
        Ok(self
            .memory
            .tokens_at(node_id, &join_bindings)
            .into_iter()
            .map(|t| t.bindings)
            .collect())
    }

    pub fn components(&self) -> SessionComponents<'_> {
        SessionComponents {
            rulebase: &self.rulebase,
            memory: &self.memory,
            listener: &self.listener,
        }
    }

    pub fn memory(&self) -> &PersistentMemory {
        &self.memory
    }

    pub fn rulebase(&self) -> &Rulebase {
        &self.rulebase
    }
}
