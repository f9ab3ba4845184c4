//! Analysis orchestrator. Ties the enumerator, SSA encoder, constraint
//! detector, and solver driver together for one function, and implements
//! the bounded one-level constant-driven recheck of callees.

use std::collections::{HashMap, HashSet};

use petgraph::graph::NodeIndex;
use z3::{Context, Solver};

use crate::ast::{FunctionDef, SourceFile};
use crate::cfg::build_cfg;
use crate::constraints::{self, ArgResolution};
use crate::errors::EngineError;
use crate::path::{enumerate_paths, PathArena};
use crate::solver::{solve_path, SolveOutcome};
use crate::ssa::encode_path;

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub max_depth: u32,
    pub max_tries: u32,
    pub max_iter: u32,
    pub constant_recheck: bool,
}

pub enum ReportOutcome {
    /// `(param name, value)` in declaration order — see `SolveOutcome::Sat`.
    Sat(Vec<(String, String)>),
    Unsat { clauses: Vec<(String, String, Option<(usize, String)>)> },
    Unknown,
}

pub struct PathReport {
    pub index: usize,
    pub predicates_text: Vec<String>,
    pub outcome: ReportOutcome,
}

pub struct FunctionReport {
    pub name: String,
    pub paths: Vec<PathReport>,
    pub rechecks: Vec<(String, FunctionReport)>,
}

pub fn analyze_function(
    source: &SourceFile,
    func: &FunctionDef,
    options: &AnalysisOptions,
    ctx: &Context,
) -> Result<FunctionReport, EngineError> {
    analyze_with_constants(source, func, options, ctx, 1, None)
}

fn analyze_with_constants(
    source: &SourceFile,
    func: &FunctionDef,
    options: &AnalysisOptions,
    ctx: &Context,
    recheck_budget: u8,
    insert_constants: Option<&HashMap<String, String>>,
) -> Result<FunctionReport, EngineError> {
    let fcfg = build_cfg(func)?;
    let mut arena = PathArena::new();
    let root = arena.push_root(fcfg.entry);
    let leaves = enumerate_paths(&mut arena, &fcfg.graph, root, options.max_iter, options.max_depth);

    let peer_names: HashSet<String> = source.peer_names();
    let param_names: Vec<String> = func.params.iter().map(|p| p.name.clone()).collect();
    let solver = Solver::new(ctx);

    let mut seen_signatures: HashSet<String> = HashSet::new();
    let mut paths = Vec::new();
    let mut pending_rechecks: Vec<(String, HashMap<String, String>)> = Vec::new();
    let mut path_index = 0usize;

    for leaf in leaves {
        if path_index as u32 >= options.max_tries {
            break;
        }
        let encoded = encode_path(&arena, &fcfg.graph, leaf, func);
        if encoded.predicates.len() < 2 {
            continue;
        }
        let signature = encoded.predicates.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("|");
        if !seen_signatures.insert(signature) {
            continue;
        }

        let detected = constraints::detect(encoded.predicates, &peer_names);
        if detected.predicates.len() < 2 {
            continue;
        }

        let predicates_text: Vec<String> = detected.predicates.iter().map(|p| p.text.clone()).collect();
        let outcome = solve_path(ctx, &solver, &detected.predicates, &encoded.type_env, &param_names, insert_constants)?;

        let report_outcome = match outcome {
            SolveOutcome::Sat(values) => ReportOutcome::Sat(values),
            SolveOutcome::Unsat(report) => ReportOutcome::Unsat {
                clauses: report
                    .clauses
                    .into_iter()
                    .map(|(label, text, node)| {
                        let line = node.map(|n| line_of(&fcfg.graph, n));
                        let stmt = line.map(|l| (l, text.clone()));
                        (label, text, stmt)
                    })
                    .collect(),
            },
            SolveOutcome::Unknown => ReportOutcome::Unknown,
        };

        if options.constant_recheck && recheck_budget > 0 {
            for (key, resolved) in &detected.call_constants {
                if let Some((callee_name, consts)) = resolve_callee_constants(source, key, resolved) {
                    pending_rechecks.push((callee_name, consts));
                }
            }
        }

        paths.push(PathReport { index: path_index, predicates_text, outcome: report_outcome });
        path_index += 1;
    }

    let mut rechecks = Vec::new();
    if options.constant_recheck && recheck_budget > 0 {
        for (callee_name, consts) in pending_rechecks {
            if let Some(callee) = source.find(&callee_name) {
                let sub = analyze_with_constants(source, callee, options, ctx, recheck_budget - 1, Some(&consts))?;
                rechecks.push((callee_name, sub));
            }
        }
    }

    Ok(FunctionReport { name: func.name.clone(), paths, rechecks })
}

fn line_of(graph: &crate::cfg::Cfg, node: NodeIndex) -> usize {
    graph[node].line
}

fn resolve_callee_constants(
    source: &SourceFile,
    key: &str,
    resolved: &[ArgResolution],
) -> Option<(String, HashMap<String, String>)> {
    let (callee_name, _) = key.split_once("**")?;
    let callee = source.find(callee_name)?;
    let mut consts = HashMap::new();
    for (param, arg) in callee.params.iter().zip(resolved.iter()) {
        if let ArgResolution::Constant(literal) = arg {
            consts.insert(param.name.clone(), literal.clone());
        }
    }
    if consts.is_empty() {
        None
    } else {
        Some((callee_name.to_string(), consts))
    }
}

// Full-pipeline behavior (parse -> cfg -> path -> ssa -> constraints ->
// solver) is exercised by the seed-scenario integration tests under
// `tests/`, not here; this module's own surface is thin enough that it has
// nothing left to unit-test in isolation.
