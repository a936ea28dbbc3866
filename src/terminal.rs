//! Terminal nodes: productions that fire RHS actions, and queries that
//! accumulate results for later lookup.
use crate::context::RuleContext;
use crate::ids::NodeId;
use crate::value::{Bindings, Sym};
use std::sync::Arc;

pub type Rhs = Arc<dyn Fn(&mut RuleContext, &Bindings) -> anyhow::Result<()> + Send + Sync>;

/// Fires its RHS for every token matching its conditions. `no_loop` gates
/// self-reactivation: an activation of this node produced while this same
/// node's RHS is executing is dropped rather than queued.
#[derive(Clone)]
pub struct ProductionNode {
    pub id: NodeId,
    pub name: Arc<str>,
    pub no_loop: bool,
    rhs: Rhs,
}

impl std::fmt::Debug for ProductionNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductionNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("no_loop", &self.no_loop)
            .finish_non_exhaustive()
    }
}

impl ProductionNode {
    pub fn new(id: NodeId, name: impl Into<Arc<str>>, no_loop: bool, rhs: Rhs) -> Self {
        Self {
            id,
            name: name.into(),
            no_loop,
            rhs,
        }
    }

    pub fn fire(&self, ctx: &mut RuleContext, bindings: &Bindings) -> anyhow::Result<()> {
        (self.rhs)(ctx, bindings)
    }
}

/// Stores tokens under the join-bindings formed by its parameter keys;
/// never propagates further. `Session::query` reads the stored tokens'
/// bindings back out.
#[derive(Clone, Debug)]
pub struct QueryNode {
    pub id: NodeId,
    pub name: Arc<str>,
    pub param_keys: Vec<Sym>,
}

impl QueryNode {
    pub fn new(id: NodeId, name: impl Into<Arc<str>>, param_keys: Vec<Sym>) -> Self {
        Self {
            id,
            name: name.into(),
            param_keys,
        }
    }
}
