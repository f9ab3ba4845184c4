//! Textual report rendering. The per-path block format is fixed by the
//! external interface contract and must stay byte-identical across runs for
//! identical inputs; `console::style` is only used on banner/header text
//! that sits outside those fixed lines.

use std::fmt::Write as _;

use console::style;

use crate::orchestrator::{FunctionReport, ReportOutcome};

pub fn render_function_report(report: &FunctionReport) -> String {
    let mut out = String::new();
    render_into(report, &mut out, 0);
    out
}

fn render_into(report: &FunctionReport, out: &mut String, depth: usize) {
    if depth == 0 {
        let _ = writeln!(out, "{}", style(format!("== {} ==", report.name)).bold());
    } else {
        let _ = writeln!(out, "{}", style(format!("-- constant recheck: {} --", report.name)).cyan());
    }

    for path in &report.paths {
        let _ = writeln!(out, " ---- path: {} ----", path.index);
        let joined = path.predicates_text.join(", ");
        let _ = writeln!(out, "Constraint Path: [{joined}]");
        match &path.outcome {
            ReportOutcome::Sat(values) => {
                let body = values.iter().map(|(k, v)| format!("{k}: {v}")).collect::<Vec<_>>().join(", ");
                let _ = writeln!(out, "Constraint Arguments: {{{body}}}");
            }
            ReportOutcome::Unsat { clauses } => {
                let core = clauses.iter().map(|(label, text, _)| format!("{label}:{text}")).collect::<Vec<_>>().join(" ");
                let _ = writeln!(out, "Unsat core ({} clauses): {core}", clauses.len());
                let stmts = clauses
                    .iter()
                    .filter_map(|(_, text, stmt)| stmt.as_ref().map(|(line, _)| format!("Line{line}:{text}")))
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = writeln!(out, "Statements in Unsat Path: {stmts}");
            }
            ReportOutcome::Unknown => {
                let _ = writeln!(out, "Solver returned unknown");
            }
        }
    }

    for (_, sub) in &report.rechecks {
        render_into(sub, out, depth + 1);
    }
}
