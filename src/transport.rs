//! Transport: routes tokens and elements to a node's children, grouping by
//! join bindings. Transport owns no state of its own — every function here
//! is a stateless fan-out over the node table plus whatever `RuleContext`
//! already carries.
use crate::context::RuleContext;
use crate::fact::Element;
use crate::ids::NodeId;
use crate::network;
use crate::token::Token;
use crate::value::Bindings;

/// Groups `items` by `key_fn(item)`, preserving the order each distinct key
/// was first seen in — grouping must be deterministic per input order so
/// that listener traces are reproducible across runs.
fn group_by<T: Clone>(items: &[T], key_fn: impl Fn(&T) -> Bindings) -> Vec<(Bindings, Vec<T>)> {
    let mut groups: Vec<(Bindings, Vec<T>)> = Vec::new();
    let mut index: std::collections::HashMap<Bindings, usize> = std::collections::HashMap::new();
    for item in items {
        let key = key_fn(item);
        match index.get(&key) {
            Some(&i) => groups[i].1.push(item.clone()),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![item.clone()]));
            }
        }
    }
    groups
}

/// Groups by the projection of each element's bindings onto the target's
/// join-keys, calling `right-activate` once per group (or once total,
/// under the empty join-bindings, if the target has no join-keys at all).
pub(crate) fn send_elements(ctx: &mut RuleContext, targets: &[NodeId], elements: Vec<Element>) -> anyhow::Result<()> {
    for &node_id in targets {
        let join_keys = ctx.rulebase.node(node_id)?.join_keys().to_vec();
        if join_keys.is_empty() {
            if !elements.is_empty() {
                network::right_activate(ctx, node_id, Bindings::new(), elements.clone())?;
            }
            continue;
        }
        for (join_bindings, group) in group_by(&elements, |e| e.bindings.project(&join_keys)) {
            network::right_activate(ctx, node_id, join_bindings, group)?;
        }
    }
    Ok(())
}

/// Mirrors [`send_elements`] with `left-activate`.
pub(crate) fn send_tokens(ctx: &mut RuleContext, targets: &[NodeId], tokens: Vec<Token>) -> anyhow::Result<()> {
    for &node_id in targets {
        let join_keys = ctx.rulebase.node(node_id)?.join_keys().to_vec();
        if join_keys.is_empty() {
            if !tokens.is_empty() {
                network::left_activate(ctx, node_id, Bindings::new(), tokens.clone())?;
            }
            continue;
        }
        for (join_bindings, group) in group_by(&tokens, |t| t.bindings.project(&join_keys)) {
            network::left_activate(ctx, node_id, join_bindings, group)?;
        }
    }
    Ok(())
}

/// Groups by *full* bindings (so each group still identifies exactly the
/// elements that were actually stored together), then restricts to the
/// target's join-keys only when calling `right-retract`.
pub(crate) fn retract_elements(ctx: &mut RuleContext, targets: &[NodeId], elements: Vec<Element>) -> anyhow::Result<()> {
    if elements.is_empty() {
        return Ok(());
    }
    for &node_id in targets {
        let join_keys = ctx.rulebase.node(node_id)?.join_keys().to_vec();
        for (full_bindings, group) in group_by(&elements, |e| e.bindings.clone()) {
            let join_bindings = full_bindings.project(&join_keys);
            network::right_retract(ctx, node_id, join_bindings, group)?;
        }
    }
    Ok(())
}

/// Mirrors [`retract_elements`] with `left-retract`.
pub(crate) fn retract_tokens(ctx: &mut RuleContext, targets: &[NodeId], tokens: Vec<Token>) -> anyhow::Result<()> {
    if tokens.is_empty() {
        return Ok(());
    }
    for &node_id in targets {
        let join_keys = ctx.rulebase.node(node_id)?.join_keys().to_vec();
        for (full_bindings, group) in group_by(&tokens, |t| t.bindings.clone()) {
            let join_bindings = full_bindings.project(&join_keys);
            network::left_retract(ctx, node_id, join_bindings, group)?;
        }
    }
    Ok(())
}
