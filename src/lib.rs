//! # A Rete-style discrimination network runtime
//!
//! This crate is THE CORE of a forward-chaining production-rule engine: the
//! typed node graph, the working-memory data structures, the propagation
//! protocols between nodes, the accumulation (fold-over-matches) machinery,
//! the agenda-driven firing loop, and the observable lifecycle that mutates
//! a [`Session`] through transient memory.
//!
//! ## What this crate does not do
//!
//! The rule DSL parser/compiler that turns conditions into a node graph,
//! the top-level user-facing API around that DSL, inspection/reporting
//! tooling, and persistence/serialization are all out of scope — external
//! collaborators this crate only consumes a [`Rulebase`] from. Callers (or
//! a real compiler) build a [`Rulebase`] with [`RulebaseBuilder`], not a DSL
//! of its own.
//!
//! ## Working with a session
//!
//! A [`Session`] is a value: `insert`/`retract`/`fire_rules` each consume
//! one session and return a new one, so any previously-held `Session` stays
//! a valid, independently-readable snapshot (cloning one is O(1) — see
//! [`memory::PersistentMemory`]).
//!
//! ```
//! use rete_core::{Bindings, RulebaseBuilder, Session};
//!
//! // a `RulebaseBuilder`-constructed rulebase would normally come from a
//! // rule DSL compiler; see the crate tests for worked end-to-end examples.
//! let rulebase = RulebaseBuilder::new().build();
//! let session = Session::new(rulebase);
//! assert!(session.query("no-such-query", &Bindings::new()).is_err());
//! ```
#![warn(missing_docs)]

mod accumulate;
mod alpha;
mod beta;
mod context;
mod error;
mod fact;
mod ids;
mod listener;
mod memory;
mod network;
mod rulebase;
mod session;
mod terminal;
mod token;
mod transport;
mod value;

pub use accumulate::{AccumState, Accumulator, CombineFn, ConvertReturnFn, ReduceFn, RetractFn};
pub use alpha::{AlphaEnv, AlphaFn, AlphaNode};
pub use beta::{AccumulateNode, BetaNode, JoinNode, NegationNode, RootJoinNode, TestNode};
pub use context::RuleContext;
pub use error::{Result, RuleEngineError};
pub use fact::{Element, Fact, FactInput, FactType};
pub use ids::{FactId, NodeId};
pub use listener::{DelegatingListener, Listener, NullListener, RecordingListener};
pub use rulebase::{NetworkNode, Rulebase, RulebaseBuilder};
pub use session::{Session, SessionComponents};
pub use terminal::{ProductionNode, QueryNode, Rhs};
pub use token::{Activation, MatchStep, Matches, Token};
pub use value::{Bindings, Sym, Value};
