//! Tokens and activations: the left-hand-side currency of the beta network.
use crate::ids::{FactId, NodeId};
use crate::value::{Bindings, Sym};
use smallvec::SmallVec;

/// One step of a token's provenance. Most steps record a fact joining in
/// through a condition node; `Accum` records that an `AccumulateNode`
/// contributed a derived (non-fact) value instead — the converted value
/// itself isn't stored here, since it already lives in the token's
/// bindings under the accumulator's `result_binding`, if any (see
/// `beta::AccumulateNode`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatchStep {
    Fact(FactId, NodeId),
    Accum(NodeId),
}

/// Provenance of a partial match: the ordered sequence of steps that
/// contributed to a token. Small-vec'd because most rules join a handful of
/// conditions, not hundreds.
pub type Matches = SmallVec<[MatchStep; 4]>;

/// `(matches, bindings)`. The empty token `Token::root()` seeds every beta
/// root at session construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    pub matches: Matches,
    pub bindings: Bindings,
}

impl Token {
    /// The empty token that seeds beta roots.
    pub fn root() -> Self {
        Self {
            matches: Matches::new(),
            bindings: Bindings::new(),
        }
    }

    /// Extend this token with one more fact-backed step, merging in the
    /// step's bindings. Used by `RootJoinNode` and `JoinNode`.
    pub fn extended(&self, fact: FactId, condition: NodeId, bindings: &Bindings) -> Self {
        let mut matches = self.matches.clone();
        matches.push(MatchStep::Fact(fact, condition));
        Self {
            matches,
            bindings: self.bindings.merged_with(bindings),
        }
    }

    /// Extend this token with an accumulate-node step: the fact-bindings the
    /// group was keyed by, plus (if the accumulator names one) the
    /// converted value bound to `result_binding`. Used by `AccumulateNode`.
    pub fn extended_accum(
        &self,
        node: NodeId,
        fact_bindings: &Bindings,
        result_binding: Option<&Sym>,
        converted: &crate::value::Value,
    ) -> Self {
        let mut matches = self.matches.clone();
        matches.push(MatchStep::Accum(node));
        let mut bindings = self.bindings.merged_with(fact_bindings);
        if let Some(sym) = result_binding {
            bindings = bindings.inserted(sym.clone(), converted.clone());
        }
        Self { matches, bindings }
    }
}

/// A pending execution of a production's RHS against a specific token.
/// Queued on the agenda.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Activation {
    pub node: NodeId,
    pub token: Token,
}
