//! AST & type helpers.
//!
//! Defines the expression/statement tree the parser produces and the small
//! set of capability queries the SSA encoder and constraint detector need:
//! collecting free identifiers, substituting identifiers, and rendering an
//! expression back to source text. Also carries the fixed annotation-to-sort
//! table used to translate source-level type annotations.

use std::collections::HashSet;

/// Solver-facing type of a value. Corresponds 1:1 to the source annotations
/// `int`, `float`, `str`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Int,
    Real,
    Str,
}

static TYPE_TABLE: phf::Map<&'static str, TypeTag> = phf::phf_map! {
    "int" => TypeTag::Int,
    "float" => TypeTag::Real,
    "str" => TypeTag::Str,
};

impl TypeTag {
    /// Translate a source-level annotation name to a `TypeTag`, or `None` if
    /// the annotation isn't in the fixed table. Callers attach line info and
    /// turn this into an `UnknownType` error, since that error is recovered
    /// per-function (spec.md §7) and only the parser knows which function a
    /// failed lookup belongs to.
    pub fn from_annotation(name: &str) -> Option<Self> {
        TYPE_TABLE.get(name).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOpKind {
    And,
    Or,
}

/// An expression node. `Subscript` nodes only support statically-known
/// integer indices, matching the restriction documented in spec.md §9
/// ("subscript renaming" open question) — dynamic-index array access is not
/// supported.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(String),
    Subscript { base: String, index: i64 },
    IntLit(i64),
    RealLit(f64),
    BoolLit(bool),
    StrLit(String),
    BinOp { op: BinOpKind, lhs: Box<Expr>, rhs: Box<Expr> },
    Compare { op: CmpOp, lhs: Box<Expr>, rhs: Box<Expr> },
    BoolOp { op: BoolOpKind, terms: Vec<Expr> },
    Not(Box<Expr>),
    Call { callee: String, args: Vec<Expr> },
}

impl Expr {
    pub fn eq(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Compare { op: CmpOp::Eq, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    pub fn and(terms: Vec<Expr>) -> Expr {
        Expr::BoolOp { op: BoolOpKind::And, terms }
    }

    /// Synthetic identifier key used for a statically-indexed subscript, e.g.
    /// `xs[1]` collapses to the key `"xs_1"`.
    pub fn subscript_key(base: &str, index: i64) -> String {
        format!("{base}_{index}")
    }
}

/// Collect every free identifier occurrence in `expr`. Subscripts with a
/// static index are collapsed to the synthetic key `<base>_<index>`.
pub fn collect_identifiers(expr: &Expr) -> HashSet<String> {
    let mut out = HashSet::new();
    collect_into(expr, &mut out);
    out
}

fn collect_into(expr: &Expr, out: &mut HashSet<String>) {
    match expr {
        Expr::Ident(name) => {
            out.insert(name.clone());
        }
        Expr::Subscript { base, index } => {
            out.insert(Expr::subscript_key(base, *index));
        }
        Expr::IntLit(_) | Expr::RealLit(_) | Expr::BoolLit(_) | Expr::StrLit(_) => {}
        Expr::BinOp { lhs, rhs, .. } | Expr::Compare { lhs, rhs, .. } => {
            collect_into(lhs, out);
            collect_into(rhs, out);
        }
        Expr::BoolOp { terms, .. } => {
            for t in terms {
                collect_into(t, out);
            }
        }
        Expr::Not(inner) => collect_into(inner, out),
        Expr::Call { args, .. } => {
            for a in args {
                collect_into(a, out);
            }
        }
    }
}

/// Substitute every identifier occurrence (including collapsed subscripts)
/// for its versioned name according to `mapping`. This is a total function:
/// a base with no entry in `mapping` is left unchanged (conservative
/// pass-through), and boolean structure (`And`/`Or`/`Not`) is always
/// preserved by recursing into every operand so it survives rendering.
pub fn substitute(expr: &Expr, mapping: &std::collections::HashMap<String, String>) -> Expr {
    match expr {
        Expr::Ident(name) => match mapping.get(name) {
            Some(versioned) => Expr::Ident(versioned.clone()),
            None => expr.clone(),
        },
        Expr::Subscript { base, index } => {
            let key = Expr::subscript_key(base, *index);
            match mapping.get(&key) {
                Some(versioned) => Expr::Ident(versioned.clone()),
                None => expr.clone(),
            }
        }
        Expr::IntLit(_) | Expr::RealLit(_) | Expr::BoolLit(_) | Expr::StrLit(_) => expr.clone(),
        Expr::BinOp { op, lhs, rhs } => Expr::BinOp {
            op: *op,
            lhs: Box::new(substitute(lhs, mapping)),
            rhs: Box::new(substitute(rhs, mapping)),
        },
        Expr::Compare { op, lhs, rhs } => Expr::Compare {
            op: *op,
            lhs: Box::new(substitute(lhs, mapping)),
            rhs: Box::new(substitute(rhs, mapping)),
        },
        Expr::BoolOp { op, terms } => Expr::BoolOp {
            op: *op,
            terms: terms.iter().map(|t| substitute(t, mapping)).collect(),
        },
        Expr::Not(inner) => Expr::Not(Box::new(substitute(inner, mapping))),
        Expr::Call { callee, args } => Expr::Call {
            callee: callee.clone(),
            args: args.iter().map(|a| substitute(a, mapping)).collect(),
        },
    }
}

/// Render an expression back to source text. Used only for diagnostics (the
/// solver itself is built structurally — see `solver::build_z3`).
pub fn render(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Subscript { base, index } => format!("{base}[{index}]"),
        Expr::IntLit(v) => v.to_string(),
        Expr::RealLit(v) => v.to_string(),
        Expr::BoolLit(v) => v.to_string(),
        Expr::StrLit(v) => format!("\"{v}\""),
        Expr::BinOp { op, lhs, rhs } => {
            format!("({} {} {})", render(lhs), bin_op_text(*op), render(rhs))
        }
        Expr::Compare { op, lhs, rhs } => {
            format!("({} {} {})", render(lhs), cmp_op_text(*op), render(rhs))
        }
        Expr::BoolOp { op, terms } => {
            let sep = match op {
                BoolOpKind::And => " and ",
                BoolOpKind::Or => " or ",
            };
            let joined = terms.iter().map(render).collect::<Vec<_>>().join(sep);
            format!("({joined})")
        }
        Expr::Not(inner) => format!("not ({})", render(inner)),
        Expr::Call { callee, args } => {
            let joined = args.iter().map(render).collect::<Vec<_>>().join(", ");
            format!("{callee}({joined})")
        }
    }
}

fn bin_op_text(op: BinOpKind) -> &'static str {
    match op {
        BinOpKind::Add => "+",
        BinOpKind::Sub => "-",
        BinOpKind::Mul => "*",
        BinOpKind::Div => "/",
        BinOpKind::Mod => "%",
    }
}

fn cmp_op_text(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "==",
        CmpOp::Ne => "!=",
        CmpOp::Lt => "<",
        CmpOp::Le => "<=",
        CmpOp::Gt => ">",
        CmpOp::Ge => ">=",
    }
}

/// Right-hand side of an annotated assignment: either a plain expression or
/// a list literal (spec.md §4.3's list-assignment encoding rule).
#[derive(Debug, Clone, PartialEq)]
pub enum AnnValue {
    Scalar(Expr),
    List(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    Name(String),
    Index { base: String, index: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `ty` is `None` for a list annotation (`xs: list = [...]`), since
    /// `TypeTag` only covers the three scalar solver sorts; element types are
    /// inferred from the list literal during SSA encoding.
    AnnAssign { name: String, ty: Option<TypeTag>, value: AnnValue, line: usize },
    Assign { target: AssignTarget, value: Expr, line: usize },
    If { cond: Expr, then_body: Vec<Stmt>, else_body: Vec<Stmt>, line: usize },
    While { cond: Expr, body: Vec<Stmt>, line: usize },
    Return { value: Option<Expr>, line: usize },
    Pass { line: usize },
    Expr { call: Expr, line: usize },
}

impl Stmt {
    pub fn line(&self) -> usize {
        match self {
            Stmt::AnnAssign { line, .. }
            | Stmt::Assign { line, .. }
            | Stmt::If { line, .. }
            | Stmt::While { line, .. }
            | Stmt::Return { line, .. }
            | Stmt::Pass { line }
            | Stmt::Expr { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: TypeTag,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    pub functions: Vec<FunctionDef>,
}

impl SourceFile {
    pub fn find(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn peer_names(&self) -> HashSet<String> {
        self.functions.iter().map(|f| f.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_translation_table_is_fixed() {
        assert_eq!(TypeTag::from_annotation("int").unwrap(), TypeTag::Int);
        assert_eq!(TypeTag::from_annotation("float").unwrap(), TypeTag::Real);
        assert_eq!(TypeTag::from_annotation("str").unwrap(), TypeTag::Str);
        assert_eq!(TypeTag::from_annotation("list"), None);
    }

    #[test]
    fn collect_identifiers_collapses_static_subscripts() {
        let expr = Expr::Compare {
            op: CmpOp::Eq,
            lhs: Box::new(Expr::Subscript { base: "xs".into(), index: 1 }),
            rhs: Box::new(Expr::IntLit(5)),
        };
        let ids = collect_identifiers(&expr);
        assert!(ids.contains("xs_1"));
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn substitute_rewrites_boolean_structure() {
        let mut mapping = std::collections::HashMap::new();
        mapping.insert("a".to_string(), "_a_1".to_string());
        mapping.insert("b".to_string(), "_b_0".to_string());

        let expr = Expr::BoolOp {
            op: BoolOpKind::And,
            terms: vec![
                Expr::Not(Box::new(Expr::Ident("a".into()))),
                Expr::Compare {
                    op: CmpOp::Eq,
                    lhs: Box::new(Expr::Ident("b".into())),
                    rhs: Box::new(Expr::IntLit(0)),
                },
            ],
        };
        let rewritten = substitute(&expr, &mapping);
        assert_eq!(render(&rewritten), "(not (_a_1) and (_b_0 == 0))");
    }

    #[test]
    fn substitute_passes_through_unmapped_identifiers() {
        let mapping = std::collections::HashMap::new();
        let expr = Expr::Ident("unmapped".into());
        assert_eq!(substitute(&expr, &mapping), expr);
    }
}
