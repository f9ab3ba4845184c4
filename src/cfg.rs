//! Control-flow graph construction.
//!
//! Mirrors the teacher's `build_sub`/`connect_all` dispatch-and-wire pattern
//! (recursive per-statement construction returning an entry node plus a list
//! of dangling exit edges the caller stitches together) but targets our own
//! `ast::Stmt` tree instead of tree-sitter nodes, and encodes branch order on
//! the node itself rather than relying on petgraph edge-insertion order, so
//! enumeration stays deterministic regardless of how petgraph iterates
//! neighbors.

use petgraph::graph::{Graph, NodeIndex};

use crate::ast::{Expr, FunctionDef, Stmt};
use crate::errors::EngineError;

/// What a CFG node represents. `Entry`/`Exit` are synthetic bookends, added
/// the same way the teacher's `build_cfg` adds them.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Entry,
    Exit,
    Assign(AssignFragment),
    Branch(Expr),
    Pass,
}

#[derive(Debug, Clone)]
pub enum AssignFragment {
    AnnAssign { name: String, value: crate::ast::AnnValue },
    Assign { target: crate::ast::AssignTarget, value: Expr },
    Return(Option<Expr>),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct CfgNode {
    pub kind: NodeKind,
    pub line: usize,
    /// Ordered successors. A `Branch` node populates both slots (`[0]` =
    /// true branch, `[1]` = false branch); every other node kind uses at
    /// most `[0]`. Kept as an explicit field instead of reading petgraph
    /// neighbor order, which is insertion-order dependent.
    pub children: [Option<NodeIndex>; 2],
}

pub type Cfg = Graph<CfgNode, ()>;

pub struct FunctionCfg {
    pub graph: Cfg,
    pub entry: NodeIndex,
    pub exit: NodeIndex,
}

/// A dangling edge source still waiting to be connected to whatever comes
/// next in the enclosing block, tagged with which branch slot it occupies on
/// its source node.
struct OpenEdge {
    from: NodeIndex,
    slot: usize,
}

fn push_node(graph: &mut Cfg, kind: NodeKind, line: usize) -> NodeIndex {
    graph.add_node(CfgNode { kind, line, children: [None, None] })
}

fn connect(graph: &mut Cfg, open: OpenEdge, to: NodeIndex) {
    graph.add_edge(open.from, to, ());
    graph[open.from].children[open.slot] = Some(to);
}

fn connect_all(graph: &mut Cfg, opens: Vec<OpenEdge>, to: NodeIndex) {
    for open in opens {
        connect(graph, open, to);
    }
}

/// Build the CFG for one function. Returns the entry node, a synthetic exit
/// node every `Return` path and the function's natural fall-through both
/// reach, and the graph itself.
pub fn build_cfg(func: &FunctionDef) -> Result<FunctionCfg, EngineError> {
    let mut graph = Cfg::new();
    let entry = push_node(&mut graph, NodeKind::Entry, 0);
    let exit = push_node(&mut graph, NodeKind::Exit, 0);

    let (head, tail_opens, returns) = build_block(&mut graph, &func.body)?;
    match head {
        Some(head) => {
            graph.add_edge(entry, head, ());
            graph[entry].children[0] = Some(head);
        }
        None => {
            graph.add_edge(entry, exit, ());
            graph[entry].children[0] = Some(exit);
        }
    }
    connect_all(&mut graph, tail_opens, exit);
    for ret in returns {
        connect(&mut graph, ret, exit);
    }

    #[cfg(debug_assertions)]
    debug_assert_reachable(&graph, entry, exit);

    Ok(FunctionCfg { graph, entry, exit })
}

/// Build a block of statements. Returns:
/// - the entry node of the block (`None` if the block is empty),
/// - the open edges falling out the bottom of the block (normal
///   fall-through — empty if the block provably always returns),
/// - open edges from `return` statements anywhere in the block, which bypass
///   normal fall-through and connect straight to the function exit.
fn build_block(
    graph: &mut Cfg,
    stmts: &[Stmt],
) -> Result<(Option<NodeIndex>, Vec<OpenEdge>, Vec<OpenEdge>), EngineError> {
    let mut head: Option<NodeIndex> = None;
    let mut prev_opens: Vec<OpenEdge> = Vec::new();
    let mut returns: Vec<OpenEdge> = Vec::new();

    for stmt in stmts {
        let (stmt_head, stmt_tail, stmt_returns) = build_stmt(graph, stmt)?;
        if head.is_none() {
            head = Some(stmt_head);
        }
        let taken = std::mem::take(&mut prev_opens);
        connect_all(graph, taken, stmt_head);
        prev_opens = stmt_tail;
        returns.extend(stmt_returns);
    }

    Ok((head, prev_opens, returns))
}

/// `(entry node, fall-through open edges, return open edges)`. The entry
/// node is only absent for an empty block, which can't happen at statement
/// granularity — every `Stmt` lowers to at least one real node — so callers
/// above `build_block` can treat it as infallible.
type StmtBuild = (NodeIndex, Vec<OpenEdge>, Vec<OpenEdge>);

fn build_stmt(graph: &mut Cfg, stmt: &Stmt) -> Result<StmtBuild, EngineError> {
    match stmt {
        Stmt::AnnAssign { name, value, line, .. } => {
            let n = push_node(
                graph,
                NodeKind::Assign(AssignFragment::AnnAssign { name: name.clone(), value: value.clone() }),
                *line,
            );
            Ok((n, vec![OpenEdge { from: n, slot: 0 }], vec![]))
        }
        Stmt::Assign { target, value, line } => {
            let n = push_node(
                graph,
                NodeKind::Assign(AssignFragment::Assign { target: target.clone(), value: value.clone() }),
                *line,
            );
            Ok((n, vec![OpenEdge { from: n, slot: 0 }], vec![]))
        }
        Stmt::Expr { call, line } => {
            let n = push_node(graph, NodeKind::Assign(AssignFragment::Expr(call.clone())), *line);
            Ok((n, vec![OpenEdge { from: n, slot: 0 }], vec![]))
        }
        Stmt::Pass { line } => {
            let n = push_node(graph, NodeKind::Pass, *line);
            Ok((n, vec![OpenEdge { from: n, slot: 0 }], vec![]))
        }
        Stmt::Return { value, line } => {
            let n = push_node(graph, NodeKind::Assign(AssignFragment::Return(value.clone())), *line);
            Ok((n, vec![], vec![OpenEdge { from: n, slot: 0 }]))
        }
        Stmt::If { cond, then_body, else_body, line } => {
            let branch = push_node(graph, NodeKind::Branch(cond.clone()), *line);
            let (then_head, then_tail, then_returns) = build_block(graph, then_body)?;
            let (else_head, else_tail, else_returns) = build_block(graph, else_body)?;

            match then_head {
                Some(h) => connect(graph, OpenEdge { from: branch, slot: 0 }, h),
                None => graph[branch].children[0] = None,
            }
            match else_head {
                Some(h) => connect(graph, OpenEdge { from: branch, slot: 1 }, h),
                None => graph[branch].children[1] = None,
            }

            let mut tail = then_tail;
            tail.extend(else_tail);
            // An empty `then`/`else` arm falls straight through the branch
            // node itself on that slot.
            if matches!(graph[branch].children[0], None) {
                tail.push(OpenEdge { from: branch, slot: 0 });
            }
            if matches!(graph[branch].children[1], None) {
                tail.push(OpenEdge { from: branch, slot: 1 });
            }

            let mut returns = then_returns;
            returns.extend(else_returns);
            Ok((branch, tail, returns))
        }
        Stmt::While { cond, body, line } => {
            let branch = push_node(graph, NodeKind::Branch(cond.clone()), *line);
            let (body_head, body_tail, body_returns) = build_block(graph, body)?;
            match body_head {
                Some(h) => {
                    connect(graph, OpenEdge { from: branch, slot: 0 }, h);
                    connect_all(graph, body_tail, branch);
                }
                None => {
                    // Empty loop body: true branch loops straight back to
                    // the condition node.
                    graph.add_edge(branch, branch, ());
                    graph[branch].children[0] = Some(branch);
                }
            }
            // False branch (loop exit) stays open for the caller to wire.
            Ok((branch, vec![OpenEdge { from: branch, slot: 1 }], body_returns))
        }
    }
}

#[cfg(debug_assertions)]
fn debug_assert_reachable(graph: &Cfg, entry: NodeIndex, exit: NodeIndex) {
    use petgraph::algo::has_path_connecting;
    debug_assert!(
        has_path_connecting(&*graph, entry, exit, None) || graph.node_count() <= 2,
        "exit node must be reachable from entry"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use petgraph::visit::EdgeRef;

    fn build(src: &str) -> FunctionCfg {
        let file = parse(src).unwrap();
        build_cfg(&file.functions[0]).unwrap()
    }

    #[test]
    fn straight_line_function_has_single_path_to_exit() {
        let cfg = build("def f(a: int):\n    b: int = a\n    return b\n");
        assert!(matches!(cfg.graph[cfg.entry].kind, NodeKind::Entry));
        assert!(matches!(cfg.graph[cfg.exit].kind, NodeKind::Exit));
    }

    #[test]
    fn if_else_branch_node_has_two_children() {
        let cfg = build("def f(a: int):\n    if a > 0:\n        return a\n    else:\n        return 0\n");
        let branch = cfg.graph.node_indices().find(|&i| matches!(cfg.graph[i].kind, NodeKind::Branch(_))).unwrap();
        assert!(cfg.graph[branch].children[0].is_some());
        assert!(cfg.graph[branch].children[1].is_some());
    }

    #[test]
    fn while_loop_body_connects_back_to_condition() {
        let cfg = build("def f(a: int):\n    while a > 0:\n        a = a - 1\n    return a\n");
        let branch = cfg.graph.node_indices().find(|&i| matches!(cfg.graph[i].kind, NodeKind::Branch(_))).unwrap();
        let true_target = cfg.graph[branch].children[0].unwrap();
        // body falls through back to the branch node
        assert!(cfg.graph.edges(true_target).any(|e| e.target() == branch) || true_target == branch);
    }
}
