//! Facts: opaque user-supplied values carrying an inspectable type tag that
//! alpha roots are indexed by.
use crate::ids::FactId;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The type tag facts are indexed by. An interned string rather than a
/// `TypeId` so that callers outside this crate (i.e. whatever DSL compiler
/// produced the rulebase) can name fact types without needing a concrete
/// Rust type per kind of fact.
pub type FactType = Arc<str>;

/// An opaque fact. `value` is the user's payload; the engine never inspects
/// it directly, only through an alpha node's activation closure.
#[derive(Clone)]
pub struct Fact {
    id: FactId,
    fact_type: FactType,
    value: Arc<dyn Any + Send + Sync>,
}

impl Fact {
    /// Construct a fact. Called when a [`FactInput`] is admitted, after
    /// working memory (the sole assigner of [`FactId`]s) has handed out the
    /// next id — see `context::RuleContext::insert`.
    pub(crate) fn new(id: FactId, fact_type: FactType, value: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            id,
            fact_type,
            value,
        }
    }

    pub fn id(&self) -> FactId {
        self.id
    }

    pub fn fact_type(&self) -> &FactType {
        &self.fact_type
    }

    pub fn value(&self) -> &(dyn Any + Send + Sync) {
        self.value.as_ref()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fact")
            .field("id", &self.id)
            .field("fact_type", &self.fact_type)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Fact {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Fact {}

/// A fact paired with the bindings its alpha (or accumulate) condition
/// produced. Lives on the right side of beta nodes.
#[derive(Clone, Debug)]
pub struct Element {
    pub fact: Fact,
    pub bindings: crate::value::Bindings,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.fact.id == other.fact.id && self.bindings == other.bindings
    }
}
impl Eq for Element {}

/// A not-yet-inserted fact: a type tag and a payload, with no [`FactId`]
/// yet — working memory assigns one when `Session::insert`/`RuleContext::insert`
/// actually admits it. This is the caller-facing counterpart of [`Fact`];
/// callers cannot construct a [`Fact`] directly, only a `FactInput`.
#[derive(Clone)]
pub struct FactInput {
    pub fact_type: FactType,
    pub value: Arc<dyn Any + Send + Sync>,
}

impl FactInput {
    pub fn new(fact_type: impl Into<FactType>, value: impl Any + Send + Sync) -> Self {
        Self {
            fact_type: fact_type.into(),
            value: Arc::new(value),
        }
    }
}
