//! The propagation engine: each node kind's left/right activate/retract
//! rules, dispatched over the tagged [`crate::rulebase::NetworkNode`]
//! instead of virtual calls. Every function here takes and threads through
//! a single `&mut RuleContext` — an explicit, borrow-checked handle in
//! place of an ambient thread-local session.
use crate::accumulate::{pre_reduce, AccumState};
use crate::beta::BetaNode;
use crate::context::RuleContext;
use crate::fact::Element;
use crate::ids::NodeId;
use crate::rulebase::NetworkNode;
use crate::token::{Activation, Token};
use crate::transport;
use crate::value::Bindings;
use tracing::trace;

pub(crate) fn left_activate(ctx: &mut RuleContext, node_id: NodeId, join_bindings: Bindings, tokens: Vec<Token>) -> anyhow::Result<()> {
    if tokens.is_empty() {
        return Ok(());
    }
    trace!(node = ?node_id, count = tokens.len(), "left-activate");
    let node = ctx.rulebase.node(node_id)?.clone();
    match node {
        NetworkNode::Beta(BetaNode::RootJoin(_)) => Ok(()),
        NetworkNode::Beta(BetaNode::Join(n)) => join_left_activate(ctx, &n, join_bindings, tokens),
        NetworkNode::Beta(BetaNode::Negation(n)) => negation_left_activate(ctx, &n, join_bindings, tokens),
        NetworkNode::Beta(BetaNode::Test(n)) => test_left_activate(ctx, &n, join_bindings, tokens),
        NetworkNode::Beta(BetaNode::Accumulate(n)) => accumulate_left_activate(ctx, &n, join_bindings, tokens),
        NetworkNode::Production(p) => production_left_activate(ctx, &p, join_bindings, tokens),
        NetworkNode::Query(q) => query_left_activate(ctx, &q, join_bindings, tokens),
    }
}

pub(crate) fn left_retract(ctx: &mut RuleContext, node_id: NodeId, join_bindings: Bindings, tokens: Vec<Token>) -> anyhow::Result<()> {
    if tokens.is_empty() {
        return Ok(());
    }
    trace!(node = ?node_id, count = tokens.len(), "left-retract");
    let node = ctx.rulebase.node(node_id)?.clone();
    match node {
        NetworkNode::Beta(BetaNode::RootJoin(_)) => Ok(()),
        NetworkNode::Beta(BetaNode::Join(n)) => join_left_retract(ctx, &n, join_bindings, tokens),
        NetworkNode::Beta(BetaNode::Negation(n)) => negation_left_retract(ctx, &n, join_bindings, tokens),
        NetworkNode::Beta(BetaNode::Test(n)) => test_left_retract(ctx, &n, join_bindings, tokens),
        NetworkNode::Beta(BetaNode::Accumulate(n)) => accumulate_left_retract(ctx, &n, join_bindings, tokens),
        NetworkNode::Production(p) => production_left_retract(ctx, &p, join_bindings, tokens),
        NetworkNode::Query(q) => query_left_retract(ctx, &q, join_bindings, tokens),
    }
}

pub(crate) fn right_activate(ctx: &mut RuleContext, node_id: NodeId, join_bindings: Bindings, elements: Vec<Element>) -> anyhow::Result<()> {
    if elements.is_empty() {
        return Ok(());
    }
    trace!(node = ?node_id, count = elements.len(), "right-activate");
    let node = ctx.rulebase.node(node_id)?.clone();
    match node {
        NetworkNode::Beta(BetaNode::RootJoin(n)) => root_join_right_activate(ctx, &n, elements),
        NetworkNode::Beta(BetaNode::Join(n)) => join_right_activate(ctx, &n, join_bindings, elements),
        NetworkNode::Beta(BetaNode::Negation(n)) => negation_right_activate(ctx, &n, join_bindings, elements),
        NetworkNode::Beta(BetaNode::Test(_)) => Ok(()),
        NetworkNode::Beta(BetaNode::Accumulate(n)) => accumulate_right_activate(ctx, &n, join_bindings, elements),
        NetworkNode::Production(_) | NetworkNode::Query(_) => Ok(()),
    }
}

pub(crate) fn right_retract(ctx: &mut RuleContext, node_id: NodeId, join_bindings: Bindings, elements: Vec<Element>) -> anyhow::Result<()> {
    if elements.is_empty() {
        return Ok(());
    }
    trace!(node = ?node_id, count = elements.len(), "right-retract");
    let node = ctx.rulebase.node(node_id)?.clone();
    match node {
        NetworkNode::Beta(BetaNode::RootJoin(n)) => root_join_right_retract(ctx, &n, join_bindings, elements),
        NetworkNode::Beta(BetaNode::Join(n)) => join_right_retract(ctx, &n, join_bindings, elements),
        NetworkNode::Beta(BetaNode::Negation(n)) => negation_right_retract(ctx, &n, join_bindings, elements),
        NetworkNode::Beta(BetaNode::Test(_)) => Ok(()),
        NetworkNode::Beta(BetaNode::Accumulate(n)) => accumulate_right_retract(ctx, &n, join_bindings, elements),
        NetworkNode::Production(_) | NetworkNode::Query(_) => Ok(()),
    }
}

// ---------------------------------------------------------------------
// RootJoinNode
// ---------------------------------------------------------------------

fn root_join_tokens(node: &crate::beta::RootJoinNode, elements: &[Element]) -> Vec<Token> {
    let root = Token::root();
    elements
        .iter()
        .map(|e| root.extended(e.fact.id(), node.condition, &e.bindings))
        .collect()
}

fn root_join_right_activate(ctx: &mut RuleContext, node: &crate::beta::RootJoinNode, elements: Vec<Element>) -> anyhow::Result<()> {
    ctx.listener.right_activate(node.id, &elements);
    ctx.memory.add_elements(node.id, Bindings::new(), &elements)?;
    let tokens = root_join_tokens(node, &elements);
    transport::send_tokens(ctx, &node.children, tokens)
}

fn root_join_right_retract(ctx: &mut RuleContext, node: &crate::beta::RootJoinNode, join_bindings: Bindings, elements: Vec<Element>) -> anyhow::Result<()> {
    let removed = ctx.memory.remove_elements(node.id, join_bindings, &elements)?;
    ctx.listener.right_retract(node.id, &removed);
    let tokens = root_join_tokens(node, &removed);
    transport::retract_tokens(ctx, &node.children, tokens)
}

// ---------------------------------------------------------------------
// JoinNode
// ---------------------------------------------------------------------

/// Cross product with elements outer, tokens inner, both in insertion
/// order — kept stable so listener traces are reproducible.
fn join_cross(node: &crate::beta::JoinNode, elements: &[Element], tokens: &[Token]) -> Vec<Token> {
    let mut out = Vec::with_capacity(elements.len() * tokens.len());
    for e in elements {
        for t in tokens {
            out.push(t.extended(e.fact.id(), node.condition, &e.bindings));
        }
    }
    out
}

fn join_left_activate(ctx: &mut RuleContext, node: &crate::beta::JoinNode, join_bindings: Bindings, tokens: Vec<Token>) -> anyhow::Result<()> {
    ctx.listener.left_activate(node.id, &tokens);
    ctx.memory.add_tokens(node.id, join_bindings.clone(), &tokens)?;
    let elements = ctx.memory.get_elements(node.id, join_bindings)?;
    let elements: Vec<Element> = elements.into_iter().collect();
    let new_tokens = join_cross(node, &elements, &tokens);
    transport::send_tokens(ctx, &node.children, new_tokens)
}

fn join_left_retract(ctx: &mut RuleContext, node: &crate::beta::JoinNode, join_bindings: Bindings, tokens: Vec<Token>) -> anyhow::Result<()> {
    let removed = ctx.memory.remove_tokens(node.id, join_bindings.clone(), &tokens)?;
    ctx.listener.left_retract(node.id, &removed);
    let elements = ctx.memory.get_elements(node.id, join_bindings)?;
    let elements: Vec<Element> = elements.into_iter().collect();
    let retract = join_cross(node, &elements, &removed);
    transport::retract_tokens(ctx, &node.children, retract)
}

fn join_right_activate(ctx: &mut RuleContext, node: &crate::beta::JoinNode, join_bindings: Bindings, elements: Vec<Element>) -> anyhow::Result<()> {
    ctx.listener.right_activate(node.id, &elements);
    ctx.memory.add_elements(node.id, join_bindings.clone(), &elements)?;
    let tokens = ctx.memory.get_tokens(node.id, join_bindings)?;
    let tokens: Vec<Token> = tokens.into_iter().collect();
    let new_tokens = join_cross(node, &elements, &tokens);
    transport::send_tokens(ctx, &node.children, new_tokens)
}

fn join_right_retract(ctx: &mut RuleContext, node: &crate::beta::JoinNode, join_bindings: Bindings, elements: Vec<Element>) -> anyhow::Result<()> {
    let removed = ctx.memory.remove_elements(node.id, join_bindings.clone(), &elements)?;
    ctx.listener.right_retract(node.id, &removed);
    let tokens = ctx.memory.get_tokens(node.id, join_bindings)?;
    let tokens: Vec<Token> = tokens.into_iter().collect();
    let retract = join_cross(node, &removed, &tokens);
    transport::retract_tokens(ctx, &node.children, retract)
}

// ---------------------------------------------------------------------
// NegationNode
// ---------------------------------------------------------------------

fn negation_left_activate(ctx: &mut RuleContext, node: &crate::beta::NegationNode, join_bindings: Bindings, tokens: Vec<Token>) -> anyhow::Result<()> {
    ctx.listener.left_activate(node.id, &tokens);
    ctx.memory.add_tokens(node.id, join_bindings.clone(), &tokens)?;
    let elements = ctx.memory.get_elements(node.id, join_bindings)?;
    if elements.is_empty() {
        transport::send_tokens(ctx, &node.children, tokens)?;
    }
    Ok(())
}

fn negation_left_retract(ctx: &mut RuleContext, node: &crate::beta::NegationNode, join_bindings: Bindings, tokens: Vec<Token>) -> anyhow::Result<()> {
    let removed = ctx.memory.remove_tokens(node.id, join_bindings.clone(), &tokens)?;
    ctx.listener.left_retract(node.id, &removed);
    let elements = ctx.memory.get_elements(node.id, join_bindings)?;
    if elements.is_empty() {
        transport::retract_tokens(ctx, &node.children, removed)?;
    }
    Ok(())
}

fn negation_right_activate(ctx: &mut RuleContext, node: &crate::beta::NegationNode, join_bindings: Bindings, elements: Vec<Element>) -> anyhow::Result<()> {
    ctx.listener.right_activate(node.id, &elements);
    ctx.memory.add_elements(node.id, join_bindings.clone(), &elements)?;
    let tokens = ctx.memory.get_tokens(node.id, join_bindings)?;
    let tokens: Vec<Token> = tokens.into_iter().collect();
    transport::retract_tokens(ctx, &node.children, tokens)
}

fn negation_right_retract(ctx: &mut RuleContext, node: &crate::beta::NegationNode, join_bindings: Bindings, elements: Vec<Element>) -> anyhow::Result<()> {
    // Remove first, then re-emit iff the element-set is now empty — removing
    // one of several elements still sharing this join-bindings group must
    // not re-trigger the negated tokens while siblings remain.
    let removed = ctx.memory.remove_elements(node.id, join_bindings.clone(), &elements)?;
    ctx.listener.right_retract(node.id, &removed);
    let remaining = ctx.memory.get_elements(node.id, join_bindings.clone())?;
    if remaining.is_empty() {
        let tokens = ctx.memory.get_tokens(node.id, join_bindings)?;
        let tokens: Vec<Token> = tokens.into_iter().collect();
        transport::send_tokens(ctx, &node.children, tokens)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------
// TestNode
// ---------------------------------------------------------------------

fn test_left_activate(ctx: &mut RuleContext, node: &crate::beta::TestNode, _join_bindings: Bindings, tokens: Vec<Token>) -> anyhow::Result<()> {
    ctx.listener.left_activate(node.id, &tokens);
    let passing: Vec<Token> = tokens.into_iter().filter(|t| (node.predicate)(&t.bindings)).collect();
    transport::send_tokens(ctx, &node.children, passing)
}

fn test_left_retract(ctx: &mut RuleContext, node: &crate::beta::TestNode, _join_bindings: Bindings, tokens: Vec<Token>) -> anyhow::Result<()> {
    // Forwards every input token unconditionally — every previously
    // forwarded token also passed the predicate, and the predicate is
    // assumed pure in bindings.
    ctx.listener.left_retract(node.id, &tokens);
    transport::retract_tokens(ctx, &node.children, tokens)
}

// ---------------------------------------------------------------------
// AccumulateNode
// ---------------------------------------------------------------------

fn emit_accum_token(node: &crate::beta::AccumulateNode, token: &Token, fact_bindings: &Bindings, state: &AccumState) -> Token {
    let converted = (node.accumulator.convert_return)(state);
    token.extended_accum(node.id, fact_bindings, node.accumulator.result_binding.as_ref(), &converted)
}

fn accumulate_left_activate(ctx: &mut RuleContext, node: &crate::beta::AccumulateNode, join_bindings: Bindings, tokens: Vec<Token>) -> anyhow::Result<()> {
    ctx.listener.left_activate(node.id, &tokens);
    ctx.memory.add_tokens(node.id, join_bindings.clone(), &tokens)?;
    let group = ctx.memory.get_accum_group(node.id, join_bindings.clone())?;
    let mut new_tokens = Vec::new();
    if !group.is_empty() {
        for (fact_bindings, state) in group.iter() {
            for t in &tokens {
                new_tokens.push(emit_accum_token(node, t, fact_bindings, state));
            }
        }
    } else if let Some(initial) = node.accumulator.initial_value.clone() {
        for t in &tokens {
            if !t.bindings.has_all(&node.group_by_keys) {
                continue;
            }
            let fact_bindings = t.bindings.project(&node.group_by_keys);
            ctx.memory.set_accum_reduced(node.id, join_bindings.clone(), fact_bindings.clone(), initial.clone())?;
            ctx.listener.add_accum_reduced(node.id, &join_bindings, &fact_bindings, &initial);
            new_tokens.push(emit_accum_token(node, t, &fact_bindings, &initial));
        }
    }
    transport::send_tokens(ctx, &node.children, new_tokens)
}

fn accumulate_left_retract(ctx: &mut RuleContext, node: &crate::beta::AccumulateNode, join_bindings: Bindings, tokens: Vec<Token>) -> anyhow::Result<()> {
    let removed = ctx.memory.remove_tokens(node.id, join_bindings.clone(), &tokens)?;
    ctx.listener.left_retract(node.id, &removed);
    let group = ctx.memory.get_accum_group(node.id, join_bindings)?;
    let mut retract_tokens_list = Vec::new();
    for (fact_bindings, state) in group.iter() {
        for t in &removed {
            retract_tokens_list.push(emit_accum_token(node, t, fact_bindings, state));
        }
    }
    transport::retract_tokens(ctx, &node.children, retract_tokens_list)
}

fn accumulate_right_activate(ctx: &mut RuleContext, node: &crate::beta::AccumulateNode, join_bindings: Bindings, elements: Vec<Element>) -> anyhow::Result<()> {
    ctx.listener.right_activate(node.id, &elements);
    ctx.memory.add_elements(node.id, join_bindings.clone(), &elements)?;
    let pairs = pre_reduce(&node.accumulator, &elements, &node.group_by_keys);
    let tokens = ctx.memory.get_tokens(node.id, join_bindings.clone())?;
    let tokens: Vec<Token> = tokens.into_iter().collect();
    accumulate_right_activate_reduced(ctx, node, join_bindings, pairs, &tokens)
}

/// For each (fact-bindings, freshly-folded state) pair, retract whatever
/// accumulated token this node previously emitted for that group, combine
/// the states, store and emit the combined result.
fn accumulate_right_activate_reduced(
    ctx: &mut RuleContext,
    node: &crate::beta::AccumulateNode,
    join_bindings: Bindings,
    pairs: Vec<(Bindings, AccumState)>,
    tokens: &[Token],
) -> anyhow::Result<()> {
    for (fact_bindings, fresh) in pairs {
        let previous = ctx.memory.get_accum_reduced(node.id, join_bindings.clone(), fact_bindings.clone())?;
        if let Some(prev_state) = &previous {
            let retract_list: Vec<Token> = tokens.iter().map(|t| emit_accum_token(node, t, &fact_bindings, prev_state)).collect();
            transport::retract_tokens(ctx, &node.children, retract_list)?;
        }
        let combined = match &previous {
            Some(prev) => (node.accumulator.combine)(prev, &fresh),
            None => fresh,
        };
        ctx.memory.set_accum_reduced(node.id, join_bindings.clone(), fact_bindings.clone(), combined.clone())?;
        ctx.listener.add_accum_reduced(node.id, &join_bindings, &fact_bindings, &combined);
        let emit_list: Vec<Token> = tokens.iter().map(|t| emit_accum_token(node, t, &fact_bindings, &combined)).collect();
        transport::send_tokens(ctx, &node.children, emit_list)?;
    }
    Ok(())
}

fn accumulate_right_retract(ctx: &mut RuleContext, node: &crate::beta::AccumulateNode, join_bindings: Bindings, elements: Vec<Element>) -> anyhow::Result<()> {
    let removed = ctx.memory.remove_elements(node.id, join_bindings.clone(), &elements)?;
    ctx.listener.right_retract(node.id, &removed);
    let tokens = ctx.memory.get_tokens(node.id, join_bindings.clone())?;
    let tokens: Vec<Token> = tokens.into_iter().collect();
    // Processed one element at a time: each retraction recomputes
    // "previous" from memory, since an earlier element in the same batch
    // may have already updated the group's state.
    for e in &removed {
        let fact_bindings = e.bindings.project(&node.group_by_keys);
        let previous = ctx.memory.get_accum_reduced(node.id, join_bindings.clone(), fact_bindings.clone())?;
        let Some(prev_state) = previous else {
            continue;
        };
        let retract_list: Vec<Token> = tokens.iter().map(|t| emit_accum_token(node, t, &fact_bindings, &prev_state)).collect();
        transport::retract_tokens(ctx, &node.children, retract_list)?;
        match (node.accumulator.retract)(&prev_state, &e.fact) {
            Some(new_state) => {
                ctx.memory.set_accum_reduced(node.id, join_bindings.clone(), fact_bindings.clone(), new_state.clone())?;
                ctx.listener.add_accum_reduced(node.id, &join_bindings, &fact_bindings, &new_state);
                let emit_list: Vec<Token> = tokens.iter().map(|t| emit_accum_token(node, t, &fact_bindings, &new_state)).collect();
                transport::send_tokens(ctx, &node.children, emit_list)?;
            }
            None => {
                ctx.memory.remove_accum_reduced(node.id, join_bindings.clone(), fact_bindings.clone())?;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------
// ProductionNode / QueryNode
// ---------------------------------------------------------------------

fn production_left_activate(ctx: &mut RuleContext, node: &crate::terminal::ProductionNode, join_bindings: Bindings, tokens: Vec<Token>) -> anyhow::Result<()> {
    ctx.listener.left_activate(node.id, &tokens);
    ctx.memory.add_tokens(node.id, join_bindings, &tokens)?;
    let currently_firing_here = node.no_loop && ctx.firing_node() == Some(node.id);
    let new_activations: Vec<Activation> = if currently_firing_here {
        Vec::new()
    } else {
        tokens.into_iter().map(|token| Activation { node: node.id, token }).collect()
    };
    if !new_activations.is_empty() {
        ctx.memory.add_activations(&new_activations)?;
        ctx.listener.add_activations(node.id, &new_activations);
    }
    Ok(())
}

fn production_left_retract(ctx: &mut RuleContext, node: &crate::terminal::ProductionNode, join_bindings: Bindings, tokens: Vec<Token>) -> anyhow::Result<()> {
    let removed = ctx.memory.remove_tokens(node.id, join_bindings, &tokens)?;
    ctx.listener.left_retract(node.id, &removed);
    let removed_activations = ctx.memory.remove_activations_for(node.id, &removed)?;
    if !removed_activations.is_empty() {
        ctx.listener.remove_activations(node.id, &removed_activations);
    }
    for token in removed {
        let facts = ctx.memory.take_insertions(node.id, token)?;
        if !facts.is_empty() {
            let facts: Vec<_> = facts.into_iter().collect();
            ctx.listener.retract_facts(&facts);
            crate::alpha::alpha_retract_all(ctx, &facts)?;
        }
    }
    Ok(())
}

fn query_left_activate(ctx: &mut RuleContext, node: &crate::terminal::QueryNode, join_bindings: Bindings, tokens: Vec<Token>) -> anyhow::Result<()> {
    ctx.listener.left_activate(node.id, &tokens);
    ctx.memory.add_tokens(node.id, join_bindings, &tokens)
}

fn query_left_retract(ctx: &mut RuleContext, node: &crate::terminal::QueryNode, join_bindings: Bindings, tokens: Vec<Token>) -> anyhow::Result<()> {
    let removed = ctx.memory.remove_tokens(node.id, join_bindings, &tokens)?;
    ctx.listener.left_retract(node.id, &removed);
    Ok(())
}
