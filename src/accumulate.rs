//! Accumulators: the reduce/combine/retract/convert fold an `AccumulateNode`
//! consumes. An accumulator is opaque fold state boxed as `Any`, the same
//! way a `Fact`'s payload is (`fact::Fact::value`) — the engine never
//! inspects the state, only threads it through the four closures a caller
//! supplied when building the rulebase.
use crate::fact::Element;
use crate::fact::Fact;
use crate::value::{Bindings, Sym, Value};
use std::any::Any;
use std::sync::Arc;

/// Opaque fold state. `Arc` rather than `Box` so a stored reduction can be
/// cheaply read back out of working memory without cloning the underlying
/// state (mirrors `Fact::value`'s `Arc<dyn Any + Send + Sync>`).
pub type AccumState = Arc<dyn Any + Send + Sync>;

/// `reduce(previous, fact) -> state`. `previous` is `None` exactly once per
/// group: the first fact folded when the accumulator has no initial value.
pub type ReduceFn = Arc<dyn Fn(Option<&AccumState>, &Fact) -> AccumState + Send + Sync>;

/// `combine(a, b) -> state`. Must be associative — the engine uses it to
/// merge `pre_reduce`'s per-group fold with whatever was already stored for
/// that group.
pub type CombineFn = Arc<dyn Fn(&AccumState, &AccumState) -> AccumState + Send + Sync>;

/// `retract(previous, fact) -> Option<state>`. The inverse of `reduce` for
/// that one fact. `None` means the state is annihilated entirely — only
/// possible for accumulators with no initial value, when the last
/// contributing fact is retracted.
pub type RetractFn = Arc<dyn Fn(&AccumState, &Fact) -> Option<AccumState> + Send + Sync>;

/// `convert_return(state) -> Value` — what downstream tokens see bound to
/// the accumulator's `result_binding`.
pub type ConvertReturnFn = Arc<dyn Fn(&AccumState) -> Value + Send + Sync>;

/// Groups `elements` by the projection of their bindings onto
/// `group_by_keys`, folding each group with `reduce` from `initial_value`.
/// Used for out-of-band aggregation (a batch of elements arriving at once,
/// e.g. `right-activate`) before the result is merged with whatever state
/// the `AccumulateNode` already has stored for that group. Group order
/// follows first-seen order of `elements`, matching Transport's grouping
/// discipline so replaying a trace is reproducible.
pub fn pre_reduce(accumulator: &Accumulator, elements: &[Element], group_by_keys: &[Sym]) -> Vec<(Bindings, AccumState)> {
    let mut order: Vec<Bindings> = Vec::new();
    let mut folded: std::collections::HashMap<Bindings, Option<AccumState>> = std::collections::HashMap::new();
    for e in elements {
        let key = e.bindings.project(group_by_keys);
        let slot = folded.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            accumulator.initial_value.clone()
        });
        *slot = Some((accumulator.reduce)(slot.as_ref(), &e.fact));
    }
    order
        .into_iter()
        .filter_map(|key| folded.remove(&key).and_then(|v| v).map(|state| (key, state)))
        .collect()
}

/// A mini fold interface over elements matching an `AccumulateNode`'s
/// condition, grouped by `AccumulateNode::group_by_keys`.
#[derive(Clone)]
pub struct Accumulator {
    pub initial_value: Option<AccumState>,
    pub reduce: ReduceFn,
    pub combine: CombineFn,
    pub retract: RetractFn,
    pub convert_return: ConvertReturnFn,
    /// Variable the converted value is bound to in tokens this node emits,
    /// e.g. `?total`. `None` if the accumulator is used only for its
    /// filtering effect (rare, but the interface allows it).
    pub result_binding: Option<Sym>,
}

impl std::fmt::Debug for Accumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accumulator")
            .field("has_initial_value", &self.initial_value.is_some())
            .field("result_binding", &self.result_binding)
            .finish_non_exhaustive()
    }
}

impl Accumulator {
    /// A running count of matched facts, starting at zero (so an empty
    /// group still yields a row).
    pub fn count(result_binding: impl Into<Sym>) -> Self {
        Self {
            initial_value: Some(Arc::new(0i64)),
            reduce: Arc::new(|prev, _fact| {
                let n = prev.and_then(|p| p.downcast_ref::<i64>()).copied().unwrap_or(0);
                Arc::new(n + 1)
            }),
            combine: Arc::new(|a, b| {
                let a = *a.downcast_ref::<i64>().expect("count state is i64");
                let b = *b.downcast_ref::<i64>().expect("count state is i64");
                Arc::new(a + b)
            }),
            retract: Arc::new(|prev, _fact| {
                let n = *prev.downcast_ref::<i64>().expect("count state is i64");
                Some(Arc::new(n - 1))
            }),
            convert_return: Arc::new(|state| {
                Value::Int(*state.downcast_ref::<i64>().expect("count state is i64"))
            }),
            result_binding: Some(result_binding.into()),
        }
    }

    /// Sum of `extract(fact)` over the group, starting at zero.
    pub fn sum(
        extract: impl Fn(&Fact) -> i64 + Send + Sync + 'static,
        result_binding: impl Into<Sym>,
    ) -> Self {
        let extract = Arc::new(extract);
        let extract_reduce = extract.clone();
        let extract_retract = extract;
        Self {
            initial_value: Some(Arc::new(0i64)),
            reduce: Arc::new(move |prev, fact| {
                let n = prev.and_then(|p| p.downcast_ref::<i64>()).copied().unwrap_or(0);
                Arc::new(n + extract_reduce(fact))
            }),
            combine: Arc::new(|a, b| {
                let a = *a.downcast_ref::<i64>().expect("sum state is i64");
                let b = *b.downcast_ref::<i64>().expect("sum state is i64");
                Arc::new(a + b)
            }),
            retract: Arc::new(move |prev, fact| {
                let n = *prev.downcast_ref::<i64>().expect("sum state is i64");
                Some(Arc::new(n - extract_retract(fact)))
            }),
            convert_return: Arc::new(|state| {
                Value::Int(*state.downcast_ref::<i64>().expect("sum state is i64"))
            }),
            result_binding: Some(result_binding.into()),
        }
    }
}
