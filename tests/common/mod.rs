//! Hand-built rulebases standing in for what a rule DSL compiler would
//! otherwise produce (see `rulebase::RulebaseBuilder`'s docs). Grounds the
//! end-to-end test scenarios in concrete, runnable networks.
#![allow(dead_code)]
use rete_core::{
    AccumulateNode, Accumulator, AlphaEnv, AlphaNode, Bindings, Fact, FactInput, NegationNode,
    NetworkNode, ProductionNode, QueryNode, Rhs, RootJoinNode, Rulebase, RulebaseBuilder,
    RuleContext, Sym, Value,
};
use std::sync::Arc;

pub struct Person {
    pub name: String,
    pub age: i64,
}

pub struct Adult {
    pub name: String,
}

pub struct Order {
    pub customer: String,
    pub amount: i64,
}

pub struct Employee {
    pub name: String,
}

pub struct Manager {
    pub name: String,
}

pub struct Ic {
    pub name: String,
}

pub struct Flag;

pub struct Project {
    pub name: String,
}

pub struct Task {
    pub project: String,
}

pub fn sym(s: &str) -> Sym {
    Arc::from(s)
}

/// Installs a stderr `tracing` subscriber for tests that want to see the
/// engine's trace output while debugging a failure. Idempotent: safe to
/// call from every test, since `set_global_default` silently no-ops once a
/// subscriber is already installed.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let env = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| "info".to_owned());
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(env))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn no_env() -> AlphaEnv {
    Arc::new(())
}

/// "if Person{name=?n, age≥21} then emit Adult{?n}", plus a parameterless
/// "adults" query fed from the same root-join.
pub fn person_adult_rulebase() -> Rulebase {
    let mut b = RulebaseBuilder::new();
    let alpha_id = b.alloc_id();
    let root_join_id = b.alloc_id();
    let production_id = b.alloc_id();
    let query_id = b.alloc_id();

    let alpha = AlphaNode::new(
        alpha_id,
        "Person".into(),
        no_env(),
        Arc::new(|fact: &Fact, _env: &AlphaEnv| {
            let p = fact.downcast_ref::<Person>()?;
            if p.age >= 21 {
                Some(Bindings::new().inserted(sym("?n"), Value::from(p.name.as_str())))
            } else {
                None
            }
        }),
        vec![root_join_id],
    );
    b.add_alpha_root(alpha);

    b.add_node(NetworkNode::Beta(rete_core::BetaNode::RootJoin(RootJoinNode {
        id: root_join_id,
        condition: alpha_id,
        children: vec![production_id, query_id],
    })));

    let rhs: Rhs = Arc::new(|ctx: &mut RuleContext, bindings: &Bindings| -> anyhow::Result<()> {
        if let Some(Value::Str(name)) = bindings.get("?n") {
            ctx.insert(vec![FactInput::new(
                "Adult",
                Adult {
                    name: name.to_string(),
                },
            )])?;
        }
        Ok(())
    });
    b.add_node(NetworkNode::Production(ProductionNode::new(
        production_id,
        "adult-rule",
        false,
        rhs,
    )));

    b.add_node(NetworkNode::Query(QueryNode::new(query_id, "adults", vec![])));

    b.build()
}

/// Sum of `Order{amount}` grouped by `?customer`, exposed as an unfiltered
/// "total" query. The accumulate node is a beta root (no upstream join) so
/// it needs the empty token seeded at session construction.
pub fn order_total_rulebase() -> Rulebase {
    let mut b = RulebaseBuilder::new();
    let alpha_id = b.alloc_id();
    let accumulate_id = b.alloc_id();
    let query_id = b.alloc_id();

    let alpha = AlphaNode::new(
        alpha_id,
        "Order".into(),
        no_env(),
        Arc::new(|fact: &Fact, _env: &AlphaEnv| {
            let o = fact.downcast_ref::<Order>()?;
            Some(Bindings::new().inserted(sym("?customer"), Value::from(o.customer.as_str())))
        }),
        vec![accumulate_id],
    );
    b.add_alpha_root(alpha);

    let accumulator = Accumulator::sum(
        |fact: &Fact| fact.downcast_ref::<Order>().map(|o| o.amount).unwrap_or(0),
        "?total",
    );
    b.add_node(NetworkNode::Beta(rete_core::BetaNode::Accumulate(AccumulateNode {
        id: accumulate_id,
        condition: alpha_id,
        join_keys: vec![],
        group_by_keys: vec![sym("?customer")],
        accumulator,
        children: vec![query_id],
    })));
    b.add_beta_root(accumulate_id);

    b.add_node(NetworkNode::Query(QueryNode::new(query_id, "total", vec![])));

    b.build()
}

/// "if Employee{?e} and not Manager{?e} then emit IC{?e}", plus an
/// unfiltered "ics" query.
pub fn employee_manager_rulebase() -> Rulebase {
    let mut b = RulebaseBuilder::new();
    let employee_alpha_id = b.alloc_id();
    let manager_alpha_id = b.alloc_id();
    let root_join_id = b.alloc_id();
    let negation_id = b.alloc_id();
    let production_id = b.alloc_id();
    let query_id = b.alloc_id();

    let employee_alpha = AlphaNode::new(
        employee_alpha_id,
        "Employee".into(),
        no_env(),
        Arc::new(|fact: &Fact, _env: &AlphaEnv| {
            let e = fact.downcast_ref::<Employee>()?;
            Some(Bindings::new().inserted(sym("?e"), Value::from(e.name.as_str())))
        }),
        vec![root_join_id],
    );
    b.add_alpha_root(employee_alpha);

    let manager_alpha = AlphaNode::new(
        manager_alpha_id,
        "Manager".into(),
        no_env(),
        Arc::new(|fact: &Fact, _env: &AlphaEnv| {
            let m = fact.downcast_ref::<Manager>()?;
            Some(Bindings::new().inserted(sym("?e"), Value::from(m.name.as_str())))
        }),
        vec![negation_id],
    );
    b.add_alpha_root(manager_alpha);

    b.add_node(NetworkNode::Beta(rete_core::BetaNode::RootJoin(RootJoinNode {
        id: root_join_id,
        condition: employee_alpha_id,
        children: vec![negation_id],
    })));

    b.add_node(NetworkNode::Beta(rete_core::BetaNode::Negation(NegationNode {
        id: negation_id,
        condition: manager_alpha_id,
        join_keys: vec![sym("?e")],
        children: vec![production_id, query_id],
    })));

    let rhs: Rhs = Arc::new(|ctx: &mut RuleContext, bindings: &Bindings| -> anyhow::Result<()> {
        if let Some(Value::Str(name)) = bindings.get("?e") {
            ctx.insert(vec![FactInput::new(
                "Ic",
                Ic {
                    name: name.to_string(),
                },
            )])?;
        }
        Ok(())
    });
    b.add_node(NetworkNode::Production(ProductionNode::new(
        production_id,
        "ic-rule",
        false,
        rhs,
    )));

    b.add_node(NetworkNode::Query(QueryNode::new(query_id, "ics", vec![])));

    b.build()
}

/// A rule that inserts a `Flag` whenever one is present, guarded by
/// `no_loop` so a single inserted `Flag` yields exactly one activation.
pub fn flag_no_loop_rulebase() -> Rulebase {
    let mut b = RulebaseBuilder::new();
    let alpha_id = b.alloc_id();
    let root_join_id = b.alloc_id();
    let production_id = b.alloc_id();

    let alpha = AlphaNode::new(
        alpha_id,
        "Flag".into(),
        no_env(),
        Arc::new(|_fact: &Fact, _env: &AlphaEnv| Some(Bindings::new())),
        vec![root_join_id],
    );
    b.add_alpha_root(alpha);

    b.add_node(NetworkNode::Beta(rete_core::BetaNode::RootJoin(RootJoinNode {
        id: root_join_id,
        condition: alpha_id,
        children: vec![production_id],
    })));

    let rhs: Rhs = Arc::new(|ctx: &mut RuleContext, _bindings: &Bindings| -> anyhow::Result<()> {
        ctx.insert(vec![FactInput::new("Flag", Flag)])?;
        Ok(())
    });
    b.add_node(NetworkNode::Production(ProductionNode::new(
        production_id,
        "self-flagging-rule",
        true,
        rhs,
    )));

    b.build()
}

/// A `count` accumulator with an initial value, grouped by `?project`,
/// where `?project` arrives already bound from an upstream `Project`
/// condition rather than from the counted fact itself.
pub fn project_task_count_rulebase() -> Rulebase {
    let mut b = RulebaseBuilder::new();
    let project_alpha_id = b.alloc_id();
    let task_alpha_id = b.alloc_id();
    let root_join_id = b.alloc_id();
    let accumulate_id = b.alloc_id();
    let query_id = b.alloc_id();

    let project_alpha = AlphaNode::new(
        project_alpha_id,
        "Project".into(),
        no_env(),
        Arc::new(|fact: &Fact, _env: &AlphaEnv| {
            let p = fact.downcast_ref::<Project>()?;
            Some(Bindings::new().inserted(sym("?project"), Value::from(p.name.as_str())))
        }),
        vec![root_join_id],
    );
    b.add_alpha_root(project_alpha);

    let task_alpha = AlphaNode::new(
        task_alpha_id,
        "Task".into(),
        no_env(),
        Arc::new(|fact: &Fact, _env: &AlphaEnv| {
            let t = fact.downcast_ref::<Task>()?;
            Some(Bindings::new().inserted(sym("?project"), Value::from(t.project.as_str())))
        }),
        vec![accumulate_id],
    );
    b.add_alpha_root(task_alpha);

    b.add_node(NetworkNode::Beta(rete_core::BetaNode::RootJoin(RootJoinNode {
        id: root_join_id,
        condition: project_alpha_id,
        children: vec![accumulate_id],
    })));

    b.add_node(NetworkNode::Beta(rete_core::BetaNode::Accumulate(AccumulateNode {
        id: accumulate_id,
        condition: task_alpha_id,
        join_keys: vec![sym("?project")],
        group_by_keys: vec![sym("?project")],
        accumulator: Accumulator::count("?count"),
        children: vec![query_id],
    })));

    b.add_node(NetworkNode::Query(QueryNode::new(query_id, "counts", vec![])));

    b.build()
}
