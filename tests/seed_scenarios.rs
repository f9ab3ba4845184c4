//! Integration tests for the seed scenarios (S1-S6): small source snippets
//! built inline, run through the full analysis pipeline, and checked against
//! the specific behavior each scenario is meant to pin down.

use sympath::orchestrator::{analyze_function, AnalysisOptions, ReportOutcome};
use sympath::parser::parse;

fn default_options() -> AnalysisOptions {
    AnalysisOptions { max_depth: 10, max_tries: 10, max_iter: 10, constant_recheck: true }
}

fn run(src: &str, func_name: &str, options: &AnalysisOptions) -> sympath::orchestrator::FunctionReport {
    let source = parse(src).unwrap();
    let func = source.find(func_name).unwrap().clone();
    let z3_config = z3::Config::new();
    let ctx = z3::Context::new(&z3_config);
    analyze_function(&source, &func, options, &ctx).unwrap()
}

// S1 - triangle classifier: exactly three feasible path classes (scalene,
// isosceles, equilateral), reachable by e.g. {a:1,b:2,c:3}, {a:1,b:1,c:2},
// and {a:1,b:1,c:1} respectively.
const TRIANGLE: &str = "\
def check_triangle(a: int, b: int, c: int):
    if a == b:
        if a == c:
            if b == c:
                return \"Equilateral\"
            return \"Isosceles\"
        return \"Isosceles\"
    if b != c:
        if a == c:
            return \"Isosceles\"
        return \"Scalene\"
    return \"Isosceles\"
";

#[test]
fn s1_triangle_classifier_has_at_least_three_distinct_satisfiable_path_classes() {
    let report = run(TRIANGLE, "check_triangle", &default_options());
    let sat_count = report.paths.iter().filter(|p| matches!(p.outcome, ReportOutcome::Sat(_))).count();
    assert!(sat_count >= 3, "expected at least 3 satisfiable path classes, got {sat_count}");
}

// S2 - unreachable branch guarded by a peer-function call. The guard
// `is_divisible_by_3_5(a)` is stripped from the solver predicates (a call
// isn't solver-encodable on its own), but the two direct modulo checks
// nested inside its true branch - `a % 15 == 0` and `a % 15 != 0` on the
// same path - are a literal predicate and its negation, so that path is
// unsat and its core must cite both.
const GUARDED_TRIANGLE: &str = "\
def check_triangle(a: int, b: int, c: int):
    if is_divisible_by_3_5(a):
        if a % 15 == 0:
            if a % 15 != 0:
                return 1
            return 2
        return 3
    return 4

def is_divisible_by_3_5(num: int):
    if num % 3 == 0:
        if num % 5 == 0:
            return 1
    return 0
";

#[test]
fn s2_call_guarded_branch_combined_with_a_contradicting_modulo_check_is_unsat() {
    let report = run(GUARDED_TRIANGLE, "check_triangle", &default_options());
    let found = report.paths.iter().find_map(|p| match &p.outcome {
        ReportOutcome::Unsat { clauses } => {
            let has_pos = clauses.iter().any(|(_, text, _)| text.contains("% 15 == 0"));
            let has_neg = clauses.iter().any(|(_, text, _)| text.contains("% 15 != 0"));
            (has_pos && has_neg).then_some(())
        }
        _ => None,
    });
    assert!(found.is_some(), "expected an unsat path whose core cites both `a % 15 == 0` and its negation");
}

// S3 - gcd with a loop: bounding max_iter to 3 still enumerates more than
// one distinct unrolling.
const GOOD_GCD: &str = "\
def good_gcd(a: int, b: int):
    if a < b:
        c: int = a
        a = b
        b = c
    while b != 0:
        c: int = a
        a = b
        b = c % b
    return a
";

#[test]
fn s3_good_gcd_enumerates_multiple_loop_unrollings_under_a_bounded_max_iter() {
    let options = AnalysisOptions { max_iter: 3, ..default_options() };
    let report = run(GOOD_GCD, "good_gcd", &options);
    assert!(report.paths.len() > 1, "expected multiple distinct unrollings of the while loop");
}

// S4 - buggy gcd: `if b > c` right after `b := c` is always false, so that
// path is unsat.
const BAD_GCD: &str = "\
def bad_gcd(a: int, b: int):
    if a < b:
        c: int = a
        a = b
        b = c
        if b > c:
            return b
    while b != 0:
        c: int = a
        a = b
        b = c % b
    return a
";

#[test]
fn s4_bad_gcd_flags_the_impossible_guard_as_unsat() {
    let report = run(BAD_GCD, "bad_gcd", &default_options());
    let has_unsat = report.paths.iter().any(|p| matches!(p.outcome, ReportOutcome::Unsat { .. }));
    assert!(has_unsat, "`if b > c` right after `b = c` should be unreachable");
}

// S5 - constant-driven recheck: one path pins `a == 7` ahead of calling
// `g(a)`; with the recheck enabled, the orchestrator reruns `g` with that
// constant inserted.
const CONST_RECHECK: &str = "\
def f(a: int, b: int, c: int):
    if a == 7:
        g(a)
    return a

def g(x: int):
    if x == 7:
        return x
    return x
";

#[test]
fn s5_constant_driven_recheck_runs_the_callee_under_the_resolved_constant() {
    let report = run(CONST_RECHECK, "f", &default_options());
    assert!(!report.rechecks.is_empty(), "expected a constant-driven recheck of `g`");
    assert_eq!(report.rechecks[0].0, "g");
}

#[test]
fn s5_disabling_constant_recheck_skips_the_callee_rerun() {
    let options = AnalysisOptions { constant_recheck: false, ..default_options() };
    let report = run(CONST_RECHECK, "f", &options);
    assert!(report.rechecks.is_empty());
}

// S6 - list assignment: `xs: list = [1, 2, 3]` then `xs[1] = 5` must encode
// to `_xs_0_0 == 1`, `_xs_1_0 == 2`, `_xs_2_0 == 3`, `_xs_1_1 == 5`, and the
// later read of `xs[1]` sees the reassigned value.
const LIST_ASSIGN: &str = "\
def list_assign():
    xs: list = [1, 2, 3]
    xs[1] = 5
    if xs[1] == 5:
        return xs[1]
    return 0
";

#[test]
fn s6_list_element_reassignment_is_visible_to_a_later_read() {
    let report = run(LIST_ASSIGN, "list_assign", &default_options());
    let reassigned_path = report.paths.iter().find(|p| {
        let text = p.predicates_text.join("|");
        text.contains("_xs_0_0 == 1")
            && text.contains("_xs_1_0 == 2")
            && text.contains("_xs_2_0 == 3")
            && text.contains("_xs_1_1 == 5")
    });
    assert!(reassigned_path.is_some(), "expected a path whose predicates encode the full list-assignment sequence");
    assert!(matches!(reassigned_path.unwrap().outcome, ReportOutcome::Sat(_)));
}
