//! Beta network node kinds. Dispatched as a tagged `enum` rather than a
//! trait object: this keeps the hot propagation loop (`network.rs`) free of
//! vtable dispatch for the five node kinds, at the cost of a `match` per
//! call — a good trade for a graph whose shape is fixed once compiled.
use crate::accumulate::Accumulator;
use crate::ids::NodeId;
use crate::value::{Bindings, Sym};
use std::sync::Arc;

/// Left side is forever the empty token: it seeds the beta network at
/// session construction and never receives another left activation.
/// `condition` is the alpha node this root's elements came from, recorded
/// as the provenance step of every token it emits.
#[derive(Clone, Debug)]
pub struct RootJoinNode {
    pub id: NodeId,
    pub condition: NodeId,
    pub children: Vec<NodeId>,
}

/// Combines tokens and elements sharing `join_keys` by cross product.
#[derive(Clone, Debug)]
pub struct JoinNode {
    pub id: NodeId,
    pub condition: NodeId,
    pub join_keys: Vec<Sym>,
    pub children: Vec<NodeId>,
}

/// Emits a token iff the right-side element-set for its join-bindings is
/// empty.
#[derive(Clone, Debug)]
pub struct NegationNode {
    pub id: NodeId,
    pub condition: NodeId,
    pub join_keys: Vec<Sym>,
    pub children: Vec<NodeId>,
}

/// Stateless filter over tokens. `left_retract` forwards every input token
/// unconditionally, relying on predicate purity in bindings — a token
/// already forwarded necessarily passed the predicate, and a pure
/// predicate's verdict on it cannot have changed since.
#[derive(Clone)]
pub struct TestNode {
    pub id: NodeId,
    pub join_keys: Vec<Sym>,
    pub children: Vec<NodeId>,
    pub predicate: Arc<dyn Fn(&Bindings) -> bool + Send + Sync>,
}

impl std::fmt::Debug for TestNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestNode")
            .field("id", &self.id)
            .field("join_keys", &self.join_keys)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// Folds matching elements, grouped by `group_by_keys`, into a single
/// derived value per group exposed to every matched left token.
/// `join_keys` is the ordinary beta join-bindings key used to
/// bucket working memory, same as `JoinNode`/`NegationNode`; `group_by_keys`
/// is the *further* projection of element bindings the fold is keyed by
/// within one join-bindings bucket (e.g. grouping an order-sum by
/// `?customer` with no upstream join at all: `join_keys` is empty,
/// `group_by_keys` is `[?customer]`).
#[derive(Clone, Debug)]
pub struct AccumulateNode {
    pub id: NodeId,
    pub condition: NodeId,
    pub join_keys: Vec<Sym>,
    pub group_by_keys: Vec<Sym>,
    pub accumulator: Accumulator,
    pub children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub enum BetaNode {
    RootJoin(RootJoinNode),
    Join(JoinNode),
    Negation(NegationNode),
    Test(TestNode),
    Accumulate(AccumulateNode),
}

impl BetaNode {
    pub fn id(&self) -> NodeId {
        match self {
            BetaNode::RootJoin(n) => n.id,
            BetaNode::Join(n) => n.id,
            BetaNode::Negation(n) => n.id,
            BetaNode::Test(n) => n.id,
            BetaNode::Accumulate(n) => n.id,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match self {
            BetaNode::RootJoin(n) => &n.children,
            BetaNode::Join(n) => &n.children,
            BetaNode::Negation(n) => &n.children,
            BetaNode::Test(n) => &n.children,
            BetaNode::Accumulate(n) => &n.children,
        }
    }

    /// The join-bindings key Transport groups by before calling
    /// `right_activate`/`left_activate` on this node. `RootJoinNode` has
    /// none: all of its elements are processed together under the empty
    /// join-bindings, in one call.
    pub fn join_keys(&self) -> &[Sym] {
        match self {
            BetaNode::RootJoin(_) => &[],
            BetaNode::Join(n) => &n.join_keys,
            BetaNode::Negation(n) => &n.join_keys,
            BetaNode::Test(n) => &n.join_keys,
            BetaNode::Accumulate(n) => &n.join_keys,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BetaNode::RootJoin(_) => "root-join",
            BetaNode::Join(_) => "join",
            BetaNode::Negation(_) => "negation",
            BetaNode::Test(_) => "test",
            BetaNode::Accumulate(_) => "accumulate",
        }
    }
}
