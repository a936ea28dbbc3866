//! Error kinds the engine itself discriminates on. RHS/action failures are
//! not part of this enum: they are arbitrary user code errors and
//! propagate as `anyhow::Error`, reserved for the open-ended failure modes
//! of user-supplied code rather than the engine's own closed set of
//! programming-error conditions.
use crate::ids::NodeId;

#[derive(thiserror::Error, Debug)]
pub enum RuleEngineError {
    /// `Session::query` was called with a name that isn't in the rulebase's
    /// `query_nodes` map.
    #[error("unknown query: {0}")]
    UnknownQuery(String),

    /// A transient memory or listener was used after `to_persistent`
    /// already took its contents. A programming error, detected here via
    /// a runtime sentinel rather than left as a silent no-op, since
    /// silently dropping a mutation would be worse.
    #[error("transient memory used after to_persistent")]
    InvalidatedTransient,

    /// A beta node referenced by the rulebase's topology has no entry in
    /// the compiled node table — only reachable if a hand-built
    /// [`crate::rulebase::RulebaseBuilder`] wires a child id that was never
    /// added.
    #[error("node {0:?} not found in rulebase")]
    UnknownNode(NodeId),
}

pub type Result<T> = std::result::Result<T, RuleEngineError>;
