//! SMT solver driver. Declares versioned symbols with the right sort,
//! submits each predicate as a named tracked clause, and reads back a model
//! or an unsat core. Expressions are built structurally through z3's native
//! API (`z3::ast`) rather than by printing and re-parsing text — the textual
//! form produced by `ast::render` stays around only for diagnostics and for
//! the constraint detector's text scan, per SPEC_FULL.md §9's note on the
//! exec/eval pattern in the original.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use z3::ast::Ast;
use z3::{ast, Context, SatResult, Solver};

use crate::ast::{BinOpKind, BoolOpKind, CmpOp, Expr, TypeTag};
use crate::errors::EngineError;
use crate::ssa::{strip_version, Predicate, TypeEnv};

#[derive(Debug, Clone)]
enum Z3Val<'ctx> {
    Int(ast::Int<'ctx>),
    Real(ast::Real<'ctx>),
    Str(ast::String<'ctx>),
    Bool(ast::Bool<'ctx>),
}

impl<'ctx> Z3Val<'ctx> {
    fn as_bool(&self) -> Result<ast::Bool<'ctx>, EngineError> {
        match self {
            Z3Val::Bool(b) => Ok(b.clone()),
            _ => Err(EngineError::Invariant("expected boolean sort".into())),
        }
    }
}

struct Builder<'ctx> {
    ctx: &'ctx Context,
    consts: HashMap<String, Z3Val<'ctx>>,
    type_env: &'ctx TypeEnv,
}

impl<'ctx> Builder<'ctx> {
    fn sort_for(&self, name: &str) -> TypeTag {
        let key = strip_version(name).unwrap_or(name);
        self.type_env.get(key).copied().unwrap_or(TypeTag::Int)
    }

    fn get_or_declare(&mut self, name: &str) -> Z3Val<'ctx> {
        if let Some(v) = self.consts.get(name) {
            return v.clone();
        }
        let val = match self.sort_for(name) {
            TypeTag::Int => Z3Val::Int(ast::Int::new_const(self.ctx, name)),
            TypeTag::Real => Z3Val::Real(ast::Real::new_const(self.ctx, name)),
            TypeTag::Str => Z3Val::Str(ast::String::new_const(self.ctx, name)),
        };
        self.consts.insert(name.to_string(), val.clone());
        val
    }

    fn build(&mut self, expr: &Expr) -> Result<Z3Val<'ctx>, EngineError> {
        match expr {
            Expr::Ident(name) => Ok(self.get_or_declare(name)),
            Expr::Subscript { base, index } => Ok(self.get_or_declare(&Expr::subscript_key(base, *index))),
            Expr::IntLit(v) => Ok(Z3Val::Int(ast::Int::from_i64(self.ctx, *v))),
            Expr::RealLit(v) => {
                let scaled = (*v * 1_000_000.0).round() as i64;
                Ok(Z3Val::Real(ast::Real::from_real(self.ctx, scaled as i32, 1_000_000)))
            }
            Expr::BoolLit(v) => Ok(Z3Val::Bool(ast::Bool::from_bool(self.ctx, *v))),
            Expr::StrLit(v) => Ok(Z3Val::Str(ast::String::from_str(self.ctx, v).map_err(|_| {
                EngineError::Invariant(format!("string literal `{v}` is not representable"))
            })?)),
            Expr::BinOp { op, lhs, rhs } => self.build_binop(*op, lhs, rhs),
            Expr::Compare { op, lhs, rhs } => self.build_compare(*op, lhs, rhs),
            Expr::BoolOp { op, terms } => {
                let built: Result<Vec<_>, _> = terms.iter().map(|t| self.build(t).and_then(|v| v.as_bool())).collect();
                let built = built?;
                let refs: Vec<&ast::Bool> = built.iter().collect();
                Ok(Z3Val::Bool(match op {
                    BoolOpKind::And => ast::Bool::and(self.ctx, &refs),
                    BoolOpKind::Or => ast::Bool::or(self.ctx, &refs),
                }))
            }
            Expr::Not(inner) => Ok(Z3Val::Bool(self.build(inner)?.as_bool()?.not())),
            Expr::Call { callee, .. } => Err(EngineError::Invariant(format!(
                "call to `{callee}` reached the solver — the constraint detector should have removed it"
            ))),
        }
    }

    fn build_binop(&mut self, op: BinOpKind, lhs: &Expr, rhs: &Expr) -> Result<Z3Val<'ctx>, EngineError> {
        let l = self.build(lhs)?;
        let r = self.build(rhs)?;
        match (l, r) {
            (Z3Val::Int(a), Z3Val::Int(b)) => Ok(Z3Val::Int(match op {
                BinOpKind::Add => a + b,
                BinOpKind::Sub => a - b,
                BinOpKind::Mul => a * b,
                BinOpKind::Div => a.div(&b),
                BinOpKind::Mod => a.rem(&b),
            })),
            (Z3Val::Real(a), Z3Val::Real(b)) => Ok(Z3Val::Real(match op {
                BinOpKind::Add => a + b,
                BinOpKind::Sub => a - b,
                BinOpKind::Mul => a * b,
                BinOpKind::Div => a.div(&b),
                BinOpKind::Mod => return Err(EngineError::Invariant("`%` is not defined over real values".into())),
            })),
            _ => Err(EngineError::Invariant("arithmetic operator applied to mismatched or non-numeric sorts".into())),
        }
    }

    fn build_compare(&mut self, op: CmpOp, lhs: &Expr, rhs: &Expr) -> Result<Z3Val<'ctx>, EngineError> {
        let l = self.build(lhs)?;
        let r = self.build(rhs)?;
        let b = match (&l, &r) {
            (Z3Val::Int(a), Z3Val::Int(b)) => match op {
                CmpOp::Eq => a._eq(b),
                CmpOp::Ne => a._eq(b).not(),
                CmpOp::Lt => a.lt(b),
                CmpOp::Le => a.le(b),
                CmpOp::Gt => a.gt(b),
                CmpOp::Ge => a.ge(b),
            },
            (Z3Val::Real(a), Z3Val::Real(b)) => match op {
                CmpOp::Eq => a._eq(b),
                CmpOp::Ne => a._eq(b).not(),
                CmpOp::Lt => a.lt(b),
                CmpOp::Le => a.le(b),
                CmpOp::Gt => a.gt(b),
                CmpOp::Ge => a.ge(b),
            },
            (Z3Val::Str(a), Z3Val::Str(b)) => match op {
                CmpOp::Eq => a._eq(b),
                CmpOp::Ne => a._eq(b).not(),
                _ => return Err(EngineError::Invariant("ordering comparisons are not defined over strings".into())),
            },
            (Z3Val::Bool(a), Z3Val::Bool(b)) => match op {
                CmpOp::Eq => a._eq(b),
                CmpOp::Ne => a._eq(b).not(),
                _ => return Err(EngineError::Invariant("ordering comparisons are not defined over booleans".into())),
            },
            _ => return Err(EngineError::Invariant("comparison applied to mismatched sorts".into())),
        };
        Ok(Z3Val::Bool(b))
    }
}

pub struct UnsatReport {
    pub clauses: Vec<(String, String, Option<NodeIndex>)>,
}

pub enum SolveOutcome {
    /// `(param name, value)` pairs in the target function's declaration
    /// order — not a `HashMap`, whose default hasher is randomly seeded per
    /// process and would make report output order nondeterministic across
    /// runs of the same binary on the same input.
    Sat(Vec<(String, String)>),
    Unsat(UnsatReport),
    Unknown,
}

/// Solve one path's predicates. `param_names` are the target function's
/// parameters in declaration order (used to extract the model). When
/// `insert_constants` is set, the driver additionally pins each resolved
/// `(param, literal)` pair, per the constant-recheck pass (SPEC_FULL.md
/// §4.6) — unless that parameter already carries a literal binding on this
/// path.
pub fn solve_path<'ctx>(
    ctx: &'ctx Context,
    solver: &Solver<'ctx>,
    predicates: &[Predicate],
    type_env: &'ctx TypeEnv,
    param_names: &[String],
    insert_constants: Option<&HashMap<String, String>>,
) -> Result<SolveOutcome, EngineError> {
    let mut builder = Builder { ctx, consts: HashMap::new(), type_env };

    solver.push();
    let mut label_map: HashMap<String, (String, Option<NodeIndex>)> = HashMap::new();

    for (i, pred) in predicates.iter().enumerate() {
        let label = format!("p{}", i + 1);
        let bool_expr = builder.build(&pred.expr)?.as_bool()?;
        let track = ast::Bool::new_const(ctx, label.as_str());
        solver.assert_and_track(&bool_expr, &track);
        label_map.insert(label, (pred.text.clone(), Some(pred.node)));
    }

    if let Some(consts) = insert_constants {
        let already_pinned: std::collections::HashSet<&str> =
            predicates.iter().filter_map(|p| literal_binding_target(&p.text)).collect();
        for (n, (param, literal)) in consts.iter().enumerate() {
            if already_pinned.contains(param.as_str()) {
                continue;
            }
            let label = format!("k{}", n + 1);
            let versioned = format!("_{param}_0");
            let sym = builder.get_or_declare(&versioned);
            let lit = builder.build(&literal_expr(literal))?;
            let eq = match (&sym, &lit) {
                (Z3Val::Int(a), Z3Val::Int(b)) => a._eq(b),
                (Z3Val::Real(a), Z3Val::Real(b)) => a._eq(b),
                _ => continue,
            };
            let track = ast::Bool::new_const(ctx, label.as_str());
            solver.assert_and_track(&eq, &track);
            label_map.insert(label, (format!("{versioned} == {literal}"), None));
        }
    }

    let outcome = match solver.check() {
        SatResult::Sat => {
            let model = solver
                .get_model()
                .ok_or_else(|| EngineError::Invariant("solver reported sat with no model".into()))?;
            let mut values: Vec<(String, String)> = Vec::new();
            for name in param_names {
                let versioned = format!("_{name}_0");
                let val = builder.get_or_declare(&versioned);
                let rendered = eval_to_string(&model, &val);
                values.push((name.clone(), rendered));
            }
            solver.pop(1);
            // Blocking clause must cover every parameter, not just the Int
            // ones, or the progress guarantee breaks for any function with a
            // float/str parameter: a distinct model that happens to share the
            // same int prefix would be wrongly excluded by a partial clause.
            let blocking_terms: Vec<ast::Bool> = param_names
                .iter()
                .zip(values.iter())
                .filter_map(|(name, (_, text))| {
                    let versioned = format!("_{name}_0");
                    let sym = builder.consts.get(&versioned)?.clone();
                    let rhs = builder.build(&literal_expr(text)).ok()?;
                    match (&sym, &rhs) {
                        (Z3Val::Int(a), Z3Val::Int(b)) => Some(a._eq(b)),
                        (Z3Val::Real(a), Z3Val::Real(b)) => Some(a._eq(b)),
                        (Z3Val::Str(a), Z3Val::Str(b)) => Some(a._eq(b)),
                        _ => None,
                    }
                })
                .collect();
            if !blocking_terms.is_empty() {
                let refs: Vec<&ast::Bool> = blocking_terms.iter().collect();
                let conj = ast::Bool::and(ctx, &refs);
                solver.assert(&conj.not());
            }
            SolveOutcome::Sat(values)
        }
        SatResult::Unsat => {
            let core = solver.get_unsat_core();
            let mut clauses = Vec::new();
            for label_ast in &core {
                let label = label_ast.to_string();
                if let Some((text, node)) = label_map.get(&label) {
                    clauses.push((label.clone(), text.clone(), *node));
                }
            }
            solver.pop(1);
            SolveOutcome::Unsat(UnsatReport { clauses })
        }
        SatResult::Unknown => {
            solver.pop(1);
            SolveOutcome::Unknown
        }
    };

    Ok(outcome)
}

fn literal_expr(literal: &str) -> Expr {
    match literal.parse::<i64>() {
        Ok(v) => Expr::IntLit(v),
        Err(_) => match literal.parse::<f64>() {
            Ok(v) => Expr::RealLit(v),
            Err(_) => Expr::StrLit(literal.to_string()),
        },
    }
}

/// If `text` is a bare `_<base>_<v> == <literal>` equation, return the base
/// parameter name it pins (used to skip redundant constant insertion).
fn literal_binding_target(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    let (lhs, rhs) = inner.split_once(" == ")?;
    if rhs.parse::<f64>().is_err() {
        return None;
    }
    strip_version(lhs)
}

fn eval_to_string(model: &z3::Model, val: &Z3Val) -> String {
    match val {
        Z3Val::Int(v) => model.eval(v, true).and_then(|r| r.as_i64()).map(|v| v.to_string()).unwrap_or_default(),
        Z3Val::Real(v) => model
            .eval(v, true)
            .and_then(|r| r.as_real())
            .map(|(num, den)| (num as f64 / den as f64).to_string())
            .unwrap_or_default(),
        Z3Val::Str(v) => model.eval(v, true).and_then(|r| r.as_string()).unwrap_or_default(),
        Z3Val::Bool(v) => model.eval(v, true).and_then(|r| r.as_bool()).map(|v| v.to_string()).unwrap_or_default(),
    }
}
