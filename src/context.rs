//! An explicit, borrow-checked handle in place of an ambient "current
//! session"/"rule context" thread-local. Every propagation function and
//! every RHS takes `&mut RuleContext` instead of reaching for ambient
//! state; since the borrow checker permits only one live `&mut RuleContext`
//! at a time, "no nested sessions on the same thread" holds by construction
//! rather than by a runtime discipline a thread-local would need.
use crate::alpha;
use crate::fact::{Fact, FactInput};
use crate::ids::NodeId;
use crate::listener::Listener;
use crate::memory::TransientMemory;
use crate::rulebase::Rulebase;
use crate::token::Token;

/// Which production is currently firing, if any — used for the no-loop
/// check and to key the insertion log.
pub(crate) struct Firing {
    pub node: NodeId,
    pub token: Token,
}

pub struct RuleContext<'a> {
    pub(crate) rulebase: &'a Rulebase,
    pub(crate) memory: &'a mut TransientMemory,
    pub(crate) listener: &'a dyn Listener,
    pub(crate) firing: Option<Firing>,
}

impl<'a> RuleContext<'a> {
    pub(crate) fn new(rulebase: &'a Rulebase, memory: &'a mut TransientMemory, listener: &'a dyn Listener) -> Self {
        Self {
            rulebase,
            memory,
            listener,
            firing: None,
        }
    }

    pub(crate) fn firing(
        rulebase: &'a Rulebase,
        memory: &'a mut TransientMemory,
        listener: &'a dyn Listener,
        node: NodeId,
        token: Token,
    ) -> Self {
        Self {
            rulebase,
            memory,
            listener,
            firing: Some(Firing { node, token }),
        }
    }

    pub(crate) fn firing_node(&self) -> Option<NodeId> {
        self.firing.as_ref().map(|f| f.node)
    }

    /// Inserts new facts from within a RHS (or from `Session::insert`,
    /// which builds a `RuleContext` with no firing node). When called
    /// while a production is firing, the inserted facts are additionally
    /// recorded in the insertion log keyed by that production's (node,
    /// token), so retracting the token later cascades their retraction.
    pub fn insert(&mut self, facts: Vec<FactInput>) -> anyhow::Result<Vec<Fact>> {
        let built: Vec<Fact> = facts
            .into_iter()
            .map(|input| {
                let id = self.memory.next_fact_id()?;
                Ok(Fact::new(id, input.fact_type, input.value))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        self.listener.insert_facts(&built);
        if let Some(firing) = &self.firing {
            self.memory.record_insertions(firing.node, firing.token.clone(), &built)?;
        }
        alpha::alpha_activate_all(self, &built)?;
        Ok(built)
    }

    /// Retracts facts the caller already holds handles for.
    pub fn retract(&mut self, facts: Vec<Fact>) -> anyhow::Result<()> {
        self.listener.retract_facts(&facts);
        alpha::alpha_retract_all(self, &facts)?;
        Ok(())
    }
}
