//! The compiled network graph. No rule DSL compiler exists here, so
//! `RulebaseBuilder` stands in for it — the constructor surface an external
//! compiler would otherwise call, not a DSL of its own.
use crate::alpha::AlphaNode;
use crate::beta::BetaNode;
use crate::error::{Result, RuleEngineError};
use crate::fact::FactType;
use crate::ids::NodeId;
use crate::terminal::{ProductionNode, QueryNode};
use crate::value::Sym;
use std::collections::HashMap;
use std::sync::Arc;

/// Any node reachable from the alpha network's children or from a
/// beta-root, keyed by [`NodeId`] in [`Rulebase::nodes`]. Tagged rather
/// than a trait object for the same reason [`BetaNode`] is.
#[derive(Clone, Debug)]
pub enum NetworkNode {
    Beta(BetaNode),
    Production(ProductionNode),
    Query(QueryNode),
}

impl NetworkNode {
    pub fn id(&self) -> NodeId {
        match self {
            NetworkNode::Beta(b) => b.id(),
            NetworkNode::Production(p) => p.id,
            NetworkNode::Query(q) => q.id,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match self {
            NetworkNode::Beta(b) => b.children(),
            NetworkNode::Production(_) => &[],
            NetworkNode::Query(_) => &[],
        }
    }

    /// The join-bindings key Transport groups by before calling into this
    /// node. A `QueryNode`'s is its parameter keys, the keys tokens are
    /// stored under; a `ProductionNode`'s is empty (terminal, no further
    /// grouping is useful downstream of it).
    pub fn join_keys(&self) -> &[Sym] {
        match self {
            NetworkNode::Beta(b) => b.join_keys(),
            NetworkNode::Production(_) => &[],
            NetworkNode::Query(q) => &q.param_keys,
        }
    }

    pub fn as_beta(&self) -> Option<&BetaNode> {
        match self {
            NetworkNode::Beta(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_production(&self) -> Option<&ProductionNode> {
        match self {
            NetworkNode::Production(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_query(&self) -> Option<&QueryNode> {
        match self {
            NetworkNode::Query(q) => Some(q),
            _ => None,
        }
    }
}

/// The opaque compiler-supplied network value, concretized: alpha roots
/// keyed by fact type, the beta roots seeded with the empty token at
/// session construction, and the full node table every propagation looks
/// `NodeId`s up in.
#[derive(Clone, Debug, Default)]
pub struct Rulebase {
    pub alpha_roots: HashMap<FactType, Vec<AlphaNode>>,
    pub beta_roots: Vec<NodeId>,
    pub production_nodes: Vec<NodeId>,
    pub query_nodes: HashMap<Arc<str>, NodeId>,
    nodes: HashMap<NodeId, NetworkNode>,
}

impl Rulebase {
    pub fn node(&self, id: NodeId) -> Result<&NetworkNode> {
        self.nodes.get(&id).ok_or(RuleEngineError::UnknownNode(id))
    }
}

/// Constructor surface for a [`Rulebase`]. Not a rule DSL: callers build
/// the node graph directly, the way an out-of-scope compiler would after
/// parsing its own rule syntax.
#[derive(Default)]
pub struct RulebaseBuilder {
    alpha_roots: HashMap<FactType, Vec<AlphaNode>>,
    beta_roots: Vec<NodeId>,
    production_nodes: Vec<NodeId>,
    query_nodes: HashMap<Arc<str>, NodeId>,
    nodes: HashMap<NodeId, NetworkNode>,
    next_id: u64,
}

impl RulebaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh [`NodeId`] for a node the caller is about to add.
    pub fn alloc_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn add_alpha_root(&mut self, node: AlphaNode) -> &mut Self {
        self.alpha_roots
            .entry(node.fact_type.clone())
            .or_default()
            .push(node);
        self
    }

    /// Marks `id` as a node that receives the empty token at session
    /// construction. `id` must already (or will eventually) name a node
    /// added via [`Self::add_node`].
    pub fn add_beta_root(&mut self, id: NodeId) -> &mut Self {
        self.beta_roots.push(id);
        self
    }

    pub fn add_node(&mut self, node: NetworkNode) -> &mut Self {
        let id = node.id();
        match &node {
            NetworkNode::Production(_) => self.production_nodes.push(id),
            NetworkNode::Query(q) => {
                self.query_nodes.insert(q.name.clone(), id);
            }
            NetworkNode::Beta(_) => {}
        }
        self.nodes.insert(id, node);
        self
    }

    pub fn build(self) -> Rulebase {
        Rulebase {
            alpha_roots: self.alpha_roots,
            beta_roots: self.beta_roots,
            production_nodes: self.production_nodes,
            query_nodes: self.query_nodes,
            nodes: self.nodes,
        }
    }
}
