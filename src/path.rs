//! CFG path nodes and the bounded path enumerator.
//!
//! `PathArena` is the "arena (vector of nodes, parent-by-index)" the engine
//! uses instead of a reference-counted tree — see SPEC_FULL.md §9's note on
//! back-references without ownership cycles. `enumerate_paths` implements
//! the enumeration algorithm intentionally as written, re-seeding included:
//! the re-seed is what makes each outer round explore a distinct branch
//! choice set, and duplicate paths are tolerated by design (the orchestrator
//! dedups by constraint signature downstream).

use std::collections::HashMap;

use petgraph::graph::NodeIndex;

use crate::cfg::Cfg;

#[derive(Debug, Clone)]
pub struct PathNodeData {
    pub depth: usize,
    pub cfg_node: NodeIndex,
    pub parent: Option<usize>,
    pub branch_order: u8,
}

#[derive(Default)]
pub struct PathArena {
    nodes: Vec<PathNodeData>,
}

impl PathArena {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn push_root(&mut self, cfg_node: NodeIndex) -> usize {
        self.nodes.push(PathNodeData { depth: 0, cfg_node, parent: None, branch_order: 0 });
        0
    }

    fn push_child(&mut self, parent: usize, cfg_node: NodeIndex, branch_order: u8) -> usize {
        let depth = self.nodes[parent].depth + 1;
        self.nodes.push(PathNodeData { depth, cfg_node, parent: Some(parent), branch_order });
        self.nodes.len() - 1
    }

    pub fn get(&self, idx: usize) -> &PathNodeData {
        &self.nodes[idx]
    }

    /// Root-to-leaf sequence of arena indices ending at `leaf`.
    pub fn path_to_root(&self, leaf: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cur = Some(leaf);
        while let Some(i) = cur {
            out.push(i);
            cur = self.nodes[i].parent;
        }
        out.reverse();
        out
    }
}

fn explore(arena: &mut PathArena, graph: &Cfg, p_idx: usize, visit_counts: &mut HashMap<String, u32>, max_iter: u32) -> Vec<usize> {
    let (depth, cfg_node) = {
        let p = arena.get(p_idx);
        (p.depth, p.cfg_node)
    };
    let children = graph[cfg_node].children;
    let mut out = Vec::new();
    for (slot, child) in children.iter().enumerate() {
        let Some(child_idx) = child else { continue };
        let key = format!("[{}]{}", depth + 1, child_idx.index());
        let count = visit_counts.entry(key).or_insert(0);
        if *count > max_iter {
            continue;
        }
        *count += 1;
        out.push(arena.push_child(p_idx, *child_idx, slot as u8));
    }
    out
}

/// Runs the enumeration algorithm and returns the arena indices of
/// `completed ++ frontier` (completed paths first, then whatever is still
/// open at the `max_iter`-round bound).
pub fn enumerate_paths(arena: &mut PathArena, graph: &Cfg, root: usize, max_iter: u32, max_depth: u32) -> Vec<usize> {
    let mut visit_counts: HashMap<String, u32> = HashMap::new();
    let mut frontier = vec![root];
    let mut completed: Vec<usize> = Vec::new();

    for _ in 0..max_iter {
        let mut next = vec![root];
        for &p_idx in &frontier {
            let (depth, cfg_node) = {
                let p = arena.get(p_idx);
                (p.depth, p.cfg_node)
            };
            let has_children = graph[cfg_node].children[0].is_some() || graph[cfg_node].children[1].is_some();
            if has_children {
                for c in explore(arena, graph, p_idx, &mut visit_counts, max_iter) {
                    if depth > max_depth as usize {
                        break;
                    }
                    next.push(c);
                }
            } else {
                completed.push(p_idx);
            }
        }
        frontier = next;
    }

    completed.into_iter().chain(frontier).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::build_cfg;
    use crate::parser::parse;

    #[test]
    fn straight_line_function_enumerates_one_path() {
        let file = parse("def f(a: int):\n    b: int = a\n    return b\n").unwrap();
        let fcfg = build_cfg(&file.functions[0]).unwrap();
        let mut arena = PathArena::new();
        let root = arena.push_root(fcfg.entry);
        let leaves = enumerate_paths(&mut arena, &fcfg.graph, root, 10, 10);
        assert!(!leaves.is_empty());
        for leaf in &leaves {
            let path = arena.path_to_root(*leaf);
            assert_eq!(arena.get(path[0]).depth, 0);
        }
    }

    #[test]
    fn loop_visit_count_is_capped_by_max_iter() {
        let file = parse("def f(a: int):\n    while a > 0:\n        a = a - 1\n    return a\n").unwrap();
        let fcfg = build_cfg(&file.functions[0]).unwrap();
        let mut arena = PathArena::new();
        let root = arena.push_root(fcfg.entry);
        let leaves = enumerate_paths(&mut arena, &fcfg.graph, root, 3, 50);
        // every produced path must have bounded depth consistent with max_iter rounds
        for leaf in &leaves {
            let depth = arena.get(*leaf).depth;
            assert!(depth <= 50);
        }
        assert!(!leaves.is_empty());
    }

    #[test]
    fn depth_matches_distance_from_root() {
        let file = parse("def f(a: int):\n    if a > 0:\n        return a\n    return a\n").unwrap();
        let fcfg = build_cfg(&file.functions[0]).unwrap();
        let mut arena = PathArena::new();
        let root = arena.push_root(fcfg.entry);
        let leaves = enumerate_paths(&mut arena, &fcfg.graph, root, 5, 5);
        for leaf in &leaves {
            let chain = arena.path_to_root(*leaf);
            for w in chain.windows(2) {
                assert_eq!(arena.get(w[1]).depth, arena.get(w[0]).depth + 1);
            }
        }
    }
}
