//! The binding environment: an immutable mapping from variable symbols to
//! values, shared structurally the way the rest of working memory is (see
//! `memory.rs`). Every token and element carries one of these.
use crate::ids::FactId;
use ordered_float::OrderedFloat;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An interned variable name, conventionally "?"-prefixed by whatever
/// compiler produced the rulebase. The engine itself attaches no meaning to
/// the prefix.
pub type Sym = Arc<str>;

/// A value bound to a variable. Deliberately small and closed: a DSL
/// compiler that needs richer values owns widening this enum, same as it
/// owns the condition language itself (out of scope here).
/// `Float` wraps `OrderedFloat` so the enum can still derive `Eq`/`Ord`/`Hash`
/// — bindings are put in `im::OrdMap`s and hashed wholesale (see
/// `Bindings::hash`), so every `Value` variant needs total order and hash.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Int(i64),
    Float(OrderedFloat<f64>),
    Bool(bool),
    Str(Arc<str>),
    Fact(FactId),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(OrderedFloat(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Arc::from(v))
    }
}

/// An immutable binding environment. Backed by `im::OrdMap` for O(1) clones
/// and structural sharing, the same reasoning as `memory::PersistentMemory`
/// (see that module's docs); wrapped rather than used directly so that
/// `Bindings` gets an order-independent `Hash`/`Ord` regardless of whatever
/// `im::OrdMap` itself derives.
#[derive(Clone, Debug, Default)]
pub struct Bindings(im::OrdMap<Sym, Value>);

impl Bindings {
    pub fn new() -> Self {
        Self(im::OrdMap::new())
    }

    pub fn get(&self, sym: &str) -> Option<&Value> {
        self.0.get(sym)
    }

    pub fn contains(&self, sym: &str) -> bool {
        self.0.contains_key(sym)
    }

    pub fn inserted(&self, sym: Sym, value: Value) -> Self {
        let mut m = self.0.clone();
        m.insert(sym, value);
        Self(m)
    }

    /// Merge two environments. On a conflicting key `other`'s value wins;
    /// well-formed beta nodes never present a caller with a genuine
    /// conflict since joins are only emitted when shared variables already
    /// agree (see `beta::join`).
    pub fn merged_with(&self, other: &Bindings) -> Self {
        let mut m = self.0.clone();
        for (k, v) in other.0.iter() {
            m.insert(k.clone(), v.clone());
        }
        Self(m)
    }

    /// Project onto a subset of keys, dropping everything else. Used to
    /// compute join-bindings and query parameter keys.
    pub fn project(&self, keys: &[Sym]) -> Self {
        let mut m = im::OrdMap::new();
        for k in keys {
            if let Some(v) = self.0.get(k) {
                m.insert(k.clone(), v.clone());
            }
        }
        Self(m)
    }

    /// True iff every key is bound in this environment.
    pub fn has_all(&self, keys: &[Sym]) -> bool {
        keys.iter().all(|k| self.0.contains_key(k))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Sym, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Sym, Value)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (Sym, Value)>>(iter: I) -> Self {
        let mut m = im::OrdMap::new();
        for (k, v) in iter {
            m.insert(k, v);
        }
        Self(m)
    }
}

impl PartialEq for Bindings {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().eq(other.0.iter())
    }
}
impl Eq for Bindings {}

impl PartialOrd for Bindings {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bindings {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.iter().cmp(other.0.iter())
    }
}

impl Hash for Bindings {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for (k, v) in self.0.iter() {
            k.hash(state);
            v.hash(state);
        }
    }
}
