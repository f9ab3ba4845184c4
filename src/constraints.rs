//! Constraint detector: a best-effort text-scanning pass over encoded
//! predicates that finds peer-function calls and resolves which of their
//! arguments are pinned to literal constants earlier on the path.
//!
//! Ported from the original project's `ConstantDetector.py` scan-and-split
//! approach rather than rebuilt as a structural walk: the detector is
//! explicitly documented (SPEC_FULL.md §4.4) as operating on rendered
//! predicate text, not the expression tree, so a call buried inside a larger
//! boolean expression is still found the same way the original finds it.

use std::collections::{HashMap, HashSet};

use crate::ssa::Predicate;

#[derive(Debug, Clone, PartialEq)]
pub enum ArgResolution {
    Constant(String),
    Unknown,
}

pub struct DetectResult {
    pub predicates: Vec<Predicate>,
    pub call_constants: HashMap<String, Vec<ArgResolution>>,
}

/// Does `value` parse as a literal constant (the numeric literals this
/// language supports)?
fn is_number(value: &str) -> bool {
    value.parse::<f64>().is_ok()
}

/// Scan `texts[..=location]` for an equation `variable == <literal>`,
/// returning the last (rightmost-in-order) match — later equations override
/// earlier ones, matching the original's "last write wins" scan order.
///
/// Anchored on `variable`'s own `== ` occurrence rather than the text's
/// rightmost `==` split: a rendered predicate can be a compound condition
/// like `(_a_0 == 7 and _c_0 == 3)`, and taking the trailing segment of the
/// whole string would read `_c_0`'s literal back as `_a_0`'s.
fn check_constant(variable: &str, texts: &[String], location: usize) -> Option<String> {
    let needle = format!("{variable} == ");
    let mut constant = None;
    for (index, ct) in texts.iter().enumerate() {
        if index > location {
            break;
        }
        if let Some(pos) = ct.find(&needle) {
            let after = &ct[pos + needle.len()..];
            let value: String = after.chars().take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-').collect();
            if is_number(&value) {
                constant = Some(value);
            }
        }
    }
    constant
}

/// Find peer-function calls in `predicates`, resolve their arguments against
/// earlier equations, and strip the call predicates out of the returned
/// list (they aren't solver-encodable in isolation).
pub fn detect(predicates: Vec<Predicate>, peer_names: &HashSet<String>) -> DetectResult {
    let texts: Vec<String> = predicates.iter().map(|p| p.text.clone()).collect();

    let mut function_with_args: HashMap<String, (Vec<String>, usize)> = HashMap::new();
    let mut removed_indexes: HashSet<usize> = HashSet::new();

    for (i, ct) in texts.iter().enumerate() {
        let parts: Vec<&str> = ct.split('(').collect();
        for (j, fc) in parts.iter().enumerate() {
            if !peer_names.contains(*fc) {
                continue;
            }
            let Some(arguments_raw) = parts.get(j + 1) else { continue };
            let arguments = arguments_raw.replace(')', "");
            let args: Vec<String> = arguments.split(',').map(|s| s.to_string()).collect();
            let key = format!("{fc}**{i}");
            function_with_args.insert(key, (args, i));
            removed_indexes.insert(i);
        }
    }

    let mut call_constants: HashMap<String, Vec<ArgResolution>> = HashMap::new();
    for (key, (args, location)) in &function_with_args {
        let resolved: Vec<ArgResolution> = args
            .iter()
            .map(|variable| match check_constant(variable.trim(), &texts, *location) {
                Some(c) => ArgResolution::Constant(c),
                None => ArgResolution::Unknown,
            })
            .collect();
        call_constants.insert(key.clone(), resolved);
    }

    call_constants.retain(|_, resolved| resolved.iter().any(|r| *r != ArgResolution::Unknown));

    let surviving = predicates
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !removed_indexes.contains(i))
        .map(|(_, p)| p)
        .collect();

    DetectResult { predicates: surviving, call_constants }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use petgraph::graph::NodeIndex;

    fn pred(text: &str) -> Predicate {
        Predicate { expr: Expr::BoolLit(true), text: text.to_string(), node: NodeIndex::new(0) }
    }

    #[test]
    fn resolves_call_argument_pinned_to_constant() {
        let peers: HashSet<String> = ["g".to_string()].into_iter().collect();
        let predicates = vec![pred("(_a_0 == 7)"), pred("g(_a_0)")];
        let result = detect(predicates, &peers);
        assert_eq!(result.predicates.len(), 1);
        let key = "g**1".to_string();
        assert_eq!(result.call_constants.get(&key), Some(&vec![ArgResolution::Constant("7".to_string())]));
    }

    #[test]
    fn anchors_on_the_variable_not_the_rightmost_equation_in_a_compound_predicate() {
        let peers: HashSet<String> = ["g".to_string()].into_iter().collect();
        let predicates = vec![pred("(_a_0 == 7 and _c_0 == 3)"), pred("g(_a_0)")];
        let result = detect(predicates, &peers);
        let key = "g**1".to_string();
        assert_eq!(result.call_constants.get(&key), Some(&vec![ArgResolution::Constant("7".to_string())]));
    }

    #[test]
    fn discards_call_when_all_arguments_unknown() {
        let peers: HashSet<String> = ["g".to_string()].into_iter().collect();
        let predicates = vec![pred("g(_a_0)")];
        let result = detect(predicates, &peers);
        assert!(result.call_constants.is_empty());
        assert_eq!(result.predicates.len(), 0);
    }
}
