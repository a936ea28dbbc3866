//! Alpha network: per-fact-type condition evaluators.
use crate::context::RuleContext;
use crate::fact::{Element, Fact, FactType};
use crate::ids::NodeId;
use crate::transport;
use crate::value::Bindings;
use std::any::Any;
use std::sync::Arc;

/// Opaque per-node compile-time configuration supplied when the node was
/// built. The activation closure already closes over whatever it needs;
/// this field exists so builder code can label or swap the environment
/// without rebuilding the closure itself.
pub type AlphaEnv = Arc<dyn Any + Send + Sync>;

pub type AlphaFn = Arc<dyn Fn(&Fact, &AlphaEnv) -> Option<Bindings> + Send + Sync>;

/// A single alpha condition: a type selector, an opaque environment, a
/// matching function, and the beta-network children it feeds elements to.
/// Alpha nodes hold no match state of their own — the element-set they
/// produce lives on the beta side.
#[derive(Clone)]
pub struct AlphaNode {
    pub id: NodeId,
    pub fact_type: FactType,
    pub env: AlphaEnv,
    activate_fn: AlphaFn,
    pub children: Vec<NodeId>,
}

impl std::fmt::Debug for AlphaNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaNode")
            .field("id", &self.id)
            .field("fact_type", &self.fact_type)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

impl AlphaNode {
    pub fn new(
        id: NodeId,
        fact_type: FactType,
        env: AlphaEnv,
        activate_fn: AlphaFn,
        children: Vec<NodeId>,
    ) -> Self {
        Self {
            id,
            fact_type,
            env,
            activate_fn,
            children,
        }
    }

    /// `(fact, env) -> bindings or "no match"` — the alpha activation
    /// contract every node's closure implements.
    pub fn activate(&self, fact: &Fact) -> Option<Bindings> {
        (self.activate_fn)(fact, &self.env)
    }
}

/// Presents every fact in `facts` to each alpha root registered under its
/// type, and hands the resulting elements to Transport for each alpha
/// node's children. Facts of a type with no registered alpha roots are
/// silently unmatched (a DSL compiler with a live rule for that type would
/// have registered a root).
pub fn alpha_activate_all(ctx: &mut RuleContext, facts: &[Fact]) -> anyhow::Result<()> {
    for (fact_type, group) in group_facts_by_type(facts) {
        let Some(roots) = ctx.rulebase.alpha_roots.get(&fact_type) else {
            continue;
        };
        for root in roots.clone() {
            let elements: Vec<Element> = group
                .iter()
                .filter_map(|f| {
                    root.activate(f).map(|bindings| Element {
                        fact: f.clone(),
                        bindings,
                    })
                })
                .collect();
            if !elements.is_empty() {
                transport::send_elements(ctx, &root.children, elements)?;
            }
        }
    }
    Ok(())
}

/// Mirrors `alpha_activate_all` for retraction: recomputes the same
/// elements the facts originally produced and asks Transport to retract
/// them.
pub fn alpha_retract_all(ctx: &mut RuleContext, facts: &[Fact]) -> anyhow::Result<()> {
    for (fact_type, group) in group_facts_by_type(facts) {
        let Some(roots) = ctx.rulebase.alpha_roots.get(&fact_type) else {
            continue;
        };
        for root in roots.clone() {
            let elements: Vec<Element> = group
                .iter()
                .filter_map(|f| {
                    root.activate(f).map(|bindings| Element {
                        fact: f.clone(),
                        bindings,
                    })
                })
                .collect();
            if !elements.is_empty() {
                transport::retract_elements(ctx, &root.children, elements)?;
            }
        }
    }
    Ok(())
}

fn group_facts_by_type(facts: &[Fact]) -> Vec<(FactType, Vec<Fact>)> {
    let mut order: Vec<FactType> = Vec::new();
    let mut groups: std::collections::HashMap<FactType, Vec<Fact>> = std::collections::HashMap::new();
    for fact in facts {
        groups
            .entry(fact.fact_type().clone())
            .or_insert_with(|| {
                order.push(fact.fact_type().clone());
                Vec::new()
            })
            .push(fact.clone());
    }
    order.into_iter().map(|t| (t.clone(), groups.remove(&t).unwrap())).collect()
}
