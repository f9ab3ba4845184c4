//! SSA encoder.
//!
//! Walks a root-to-leaf path and produces an ordered list of single
//! static-assignment predicates plus the `CfgNode` each one came from.
//! Mirrors the per-node emission table precisely; nothing here inspects
//! structure the table doesn't name, so adding a new `Stmt` kind to the
//! front end must be mirrored here or its statements are silently skipped.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;

use crate::ast::{self, AnnValue, AssignTarget, Expr, FunctionDef, TypeTag};
use crate::cfg::{AssignFragment, Cfg, NodeKind};
use crate::path::PathArena;

pub type TypeEnv = HashMap<String, TypeTag>;
pub type VarEnv = HashMap<String, u32>;

#[derive(Debug, Clone)]
pub struct Predicate {
    pub expr: Expr,
    pub text: String,
    pub node: NodeIndex,
}

pub struct EncodeResult {
    pub predicates: Vec<Predicate>,
    pub nodes: Vec<NodeIndex>,
    pub completed: bool,
    pub type_env: TypeEnv,
}

/// Build the base `TypeEnv` for a function: parameter annotations plus every
/// `x: T = …` annotation appearing in the body. List annotations contribute
/// one entry per synthetic element base, inferring each element's type from
/// its literal kind (the open question SPEC_FULL.md §9 decides in favor of:
/// unannotated list elements are typed from their literal form, defaulting
/// to `Int` when an element isn't a literal).
pub fn build_type_env(func: &FunctionDef) -> TypeEnv {
    let mut env = TypeEnv::new();
    for p in &func.params {
        env.insert(p.name.clone(), p.ty);
    }
    walk_stmts_for_types(&func.body, &mut env);
    env
}

fn walk_stmts_for_types(stmts: &[crate::ast::Stmt], env: &mut TypeEnv) {
    use crate::ast::Stmt;
    for stmt in stmts {
        match stmt {
            Stmt::AnnAssign { name, ty, value, .. } => match (ty, value) {
                (Some(t), _) => {
                    env.insert(name.clone(), *t);
                }
                (None, AnnValue::List(elements)) => {
                    for (i, e) in elements.iter().enumerate() {
                        let key = Expr::subscript_key(name, i as i64);
                        env.insert(key, infer_literal_type(e));
                    }
                }
                (None, AnnValue::Scalar(_)) => {}
            },
            Stmt::If { then_body, else_body, .. } => {
                walk_stmts_for_types(then_body, env);
                walk_stmts_for_types(else_body, env);
            }
            Stmt::While { body, .. } => walk_stmts_for_types(body, env),
            _ => {}
        }
    }
}

fn infer_literal_type(expr: &Expr) -> TypeTag {
    match expr {
        Expr::RealLit(_) => TypeTag::Real,
        Expr::StrLit(_) => TypeTag::Str,
        _ => TypeTag::Int,
    }
}

fn ensure_versions(expr: &Expr, var_env: &mut VarEnv) {
    for base in ast::collect_identifiers(expr) {
        var_env.entry(base).or_insert(0);
    }
}

fn versioned(expr: &Expr, var_env: &mut VarEnv) -> Expr {
    ensure_versions(expr, var_env);
    let mapping: HashMap<String, String> =
        var_env.iter().map(|(k, v)| (k.clone(), format!("_{k}_{v}"))).collect();
    ast::substitute(expr, &mapping)
}

fn bump_version(var_env: &mut VarEnv, base: &str) -> u32 {
    let next = match var_env.get(base) {
        Some(v) => v + 1,
        None => 0,
    };
    var_env.insert(base.to_string(), next);
    next
}

/// Encode the root-to-leaf path given by `leaf` in `arena` against `graph`.
pub fn encode_path(arena: &PathArena, graph: &Cfg, leaf: usize, func: &FunctionDef) -> EncodeResult {
    let mut predicates = Vec::new();
    let mut nodes = Vec::new();
    let mut completed = false;
    let mut var_env = VarEnv::new();
    let mut type_env = build_type_env(func);

    for idx in arena.path_to_root(leaf) {
        let data = arena.get(idx);
        let cfg_node = &graph[data.cfg_node];
        match &cfg_node.kind {
            NodeKind::Entry => {
                let mut terms = Vec::new();
                for p in &func.params {
                    var_env.insert(p.name.clone(), 0);
                    terms.push(Expr::eq(Expr::Ident(p.name.clone()), Expr::Ident(format!("_{}_0", p.name))));
                }
                if !terms.is_empty() {
                    let expr = Expr::and(terms);
                    let text = ast::render(&expr);
                    predicates.push(Predicate { expr, text, node: data.cfg_node });
                    nodes.push(data.cfg_node);
                }
            }
            NodeKind::Exit => {
                completed = true;
            }
            NodeKind::Pass => {}
            NodeKind::Branch(cond) => {
                if data.branch_order > 1 {
                    return EncodeResult { predicates, nodes, completed: false, type_env };
                }
                let rewritten = versioned(cond, &mut var_env);
                let expr = if data.branch_order == 0 { rewritten } else { Expr::Not(Box::new(rewritten)) };
                let text = ast::render(&expr);
                predicates.push(Predicate { expr, text, node: data.cfg_node });
                nodes.push(data.cfg_node);
            }
            NodeKind::Assign(fragment) => match fragment {
                AssignFragment::AnnAssign { name, value } => match value {
                    AnnValue::Scalar(e) => {
                        let rewritten = versioned(e, &mut var_env);
                        let v = bump_version(&mut var_env, name);
                        type_env.entry(name.clone()).or_insert(TypeTag::Int);
                        let expr = Expr::eq(Expr::Ident(format!("_{name}_{v}")), rewritten);
                        let text = ast::render(&expr);
                        predicates.push(Predicate { expr, text, node: data.cfg_node });
                        nodes.push(data.cfg_node);
                    }
                    AnnValue::List(elements) => {
                        for (i, e) in elements.iter().enumerate() {
                            let base = Expr::subscript_key(name, i as i64);
                            let rewritten = versioned(e, &mut var_env);
                            var_env.insert(base.clone(), 0);
                            type_env.entry(base.clone()).or_insert_with(|| infer_literal_type(e));
                            let expr = Expr::eq(Expr::Ident(format!("_{base}_0")), rewritten);
                            let text = ast::render(&expr);
                            predicates.push(Predicate { expr, text, node: data.cfg_node });
                            nodes.push(data.cfg_node);
                        }
                    }
                },
                AssignFragment::Assign { target, value } => {
                    let rewritten = versioned(value, &mut var_env);
                    let base = match target {
                        AssignTarget::Name(n) => n.clone(),
                        AssignTarget::Index { base, index } => Expr::subscript_key(base, *index),
                    };
                    let v = bump_version(&mut var_env, &base);
                    if let AssignTarget::Index { base: b, .. } = target {
                        if let Some(t) = type_env.get(b).copied() {
                            type_env.entry(base.clone()).or_insert(t);
                        }
                    }
                    let expr = Expr::eq(Expr::Ident(format!("_{base}_{v}")), rewritten);
                    let text = ast::render(&expr);
                    predicates.push(Predicate { expr, text, node: data.cfg_node });
                    nodes.push(data.cfg_node);
                }
                AssignFragment::Return(_) => {}
                AssignFragment::Expr(call) => {
                    // Peer-function call statement: passed through unchanged,
                    // same as a call embedded in a condition. The constraint
                    // detector resolves or discards it later.
                    let rewritten = versioned(call, &mut var_env);
                    let text = ast::render(&rewritten);
                    predicates.push(Predicate { expr: rewritten, text, node: data.cfg_node });
                    nodes.push(data.cfg_node);
                }
            },
        }
    }

    EncodeResult { predicates, nodes, completed, type_env }
}

/// Strip the `_<base>_<version>` wrapper a versioned identifier carries.
pub fn strip_version(name: &str) -> Option<&str> {
    let rest = name.strip_prefix('_')?;
    let (base, _version) = rest.rsplit_once('_')?;
    Some(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::build_cfg;
    use crate::parser::parse;

    fn encode_all(src: &str) -> Vec<EncodeResult> {
        let file = parse(src).unwrap();
        let func = &file.functions[0];
        let fcfg = build_cfg(func).unwrap();
        let mut arena = PathArena::new();
        let root = arena.push_root(fcfg.entry);
        let leaves = crate::path::enumerate_paths(&mut arena, &fcfg.graph, root, 10, 10);
        leaves.into_iter().map(|leaf| encode_path(&arena, &fcfg.graph, leaf, func)).collect()
    }

    #[test]
    fn entry_marker_binds_parameters_to_version_zero() {
        let results = encode_all("def f(a: int, b: int):\n    return a\n");
        let r = &results[0];
        assert_eq!(r.predicates[0].text, "(a == _a_0)");
    }

    #[test]
    fn branch_order_negates_condition_on_false_path() {
        let results = encode_all("def f(a: int):\n    if a > 0:\n        return a\n    return a\n");
        let texts: Vec<&str> = results.iter().flat_map(|r| r.predicates.iter().map(|p| p.text.as_str())).collect();
        assert!(texts.iter().any(|t| t.contains("not (_a_0 > 0)")));
        assert!(texts.iter().any(|t| t.contains("(_a_0 > 0)") && !t.contains("not")));
    }

    #[test]
    fn list_literal_assigns_versioned_element_bases() {
        let results = encode_all("def f():\n    xs: list = [1, 2, 3]\n    xs[1] = 5\n    return xs[1]\n");
        let r = &results[0];
        let texts: Vec<&str> = r.predicates.iter().map(|p| p.text.as_str()).collect();
        assert!(texts.contains(&"(_xs_0_0 == 1)"));
        assert!(texts.contains(&"(_xs_1_0 == 2)"));
        assert!(texts.contains(&"(_xs_2_0 == 3)"));
        assert!(texts.contains(&"(_xs_1_1 == 5)"));
    }
}
