//! Recursive-descent parser. Turns a token stream into a `SourceFile`.
//!
//! This is the engine's stand-in for the "externally provided AST" spec.md
//! assumes a caller supplies (see SPEC_FULL.md §4.0) — deliberately small,
//! since no off-the-shelf grammar exists for this toy language.

use crate::ast::{AnnValue, AssignTarget, BinOpKind, BoolOpKind, CmpOp, Expr, FunctionDef, Param, SourceFile, Stmt, TypeTag};
use crate::errors::EngineError;
use crate::lexer::{tokenize, Token, TokenKind};

pub fn parse(src: &str) -> Result<SourceFile, EngineError> {
    let tokens = tokenize(src)?;
    let mut p = Parser { tokens, pos: 0 };
    p.parse_source_file()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn line(&self) -> usize {
        self.tokens[self.pos].line
    }

    fn advance(&mut self) -> TokenKind {
        let tok = self.tokens[self.pos].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), EngineError> {
        if std::mem::discriminant(self.peek()) == std::mem::discriminant(kind) {
            self.advance();
            Ok(())
        } else {
            Err(EngineError::Parse {
                line: self.line(),
                message: format!("expected {kind:?}, found {:?}", self.peek()),
            })
        }
    }

    fn expect_ident(&mut self) -> Result<String, EngineError> {
        match self.advance() {
            TokenKind::Ident(name) => Ok(name),
            other => Err(EngineError::Parse { line: self.line(), message: format!("expected identifier, found {other:?}") }),
        }
    }

    fn skip_blank_newlines(&mut self) {
        while matches!(self.peek(), TokenKind::Newline) {
            self.advance();
        }
    }

    /// `UnknownType` from a function's own annotations is recovered at this
    /// level per spec.md §7: the offending function is skipped and parsing
    /// continues with the next `def`, rather than aborting the whole file
    /// the way a structural `Parse` error does.
    fn parse_source_file(&mut self) -> Result<SourceFile, EngineError> {
        let mut functions = Vec::new();
        self.skip_blank_newlines();
        while !matches!(self.peek(), TokenKind::Eof) {
            match self.parse_function() {
                Ok(f) => functions.push(f),
                Err(EngineError::UnknownType { line, name }) => {
                    tracing::warn!("skipping function with unknown type annotation `{name}` at line {line}");
                    self.skip_to_next_def();
                }
                Err(e) => return Err(e),
            }
            self.skip_blank_newlines();
        }
        Ok(SourceFile { functions })
    }

    /// Resync after a recovered per-function error by discarding tokens up to
    /// the next top-level `def` (or end of file). Safe because `def` only
    /// ever appears at top level; a broken function's leftover body tokens
    /// never contain one.
    fn skip_to_next_def(&mut self) {
        while !matches!(self.peek(), TokenKind::Def | TokenKind::Eof) {
            self.advance();
        }
    }

    fn parse_type(&mut self) -> Result<TypeTag, EngineError> {
        let line = self.line();
        let name = self.expect_ident()?;
        TypeTag::from_annotation(&name).ok_or_else(|| EngineError::UnknownType { line, name })
    }

    /// Like `parse_type`, but additionally accepts the `list` annotation
    /// (valid only on the left side of an annotated assignment), returned as
    /// `None`.
    fn parse_ann_type(&mut self) -> Result<Option<TypeTag>, EngineError> {
        let line = self.line();
        let name = self.expect_ident()?;
        if name == "list" {
            return Ok(None);
        }
        TypeTag::from_annotation(&name).map(Some).ok_or_else(|| EngineError::UnknownType { line, name })
    }

    fn parse_function(&mut self) -> Result<FunctionDef, EngineError> {
        self.expect(&TokenKind::Def)?;
        let name = self.expect_ident()?;
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        if !matches!(self.peek(), TokenKind::RParen) {
            loop {
                let pname = self.expect_ident()?;
                self.expect(&TokenKind::Colon)?;
                let ty = self.parse_type()?;
                params.push(Param { name: pname, ty });
                if matches!(self.peek(), TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        if matches!(self.peek(), TokenKind::Arrow) {
            self.advance();
            // Return annotation is parsed but unused, per spec.md §4.3/§9.
            let _ = self.parse_type()?;
        }
        self.expect(&TokenKind::Colon)?;
        let body = self.parse_block()?;
        Ok(FunctionDef { name, params, body })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, EngineError> {
        self.expect(&TokenKind::Newline)?;
        self.expect(&TokenKind::Indent)?;
        let mut stmts = Vec::new();
        while !matches!(self.peek(), TokenKind::Dedent | TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        if matches!(self.peek(), TokenKind::Dedent) {
            self.advance();
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, EngineError> {
        let line = self.line();
        let stmt = match self.peek().clone() {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Return => {
                self.advance();
                let value = if matches!(self.peek(), TokenKind::Newline) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                Ok(Stmt::Return { value, line })
            }
            TokenKind::Pass => {
                self.advance();
                Ok(Stmt::Pass { line })
            }
            TokenKind::Ident(_) => self.parse_ident_led_stmt(line),
            other => Err(EngineError::Parse { line, message: format!("unexpected token {other:?} at statement start") }),
        }?;
        if matches!(self.peek(), TokenKind::Newline) {
            self.advance();
        }
        Ok(stmt)
    }

    fn parse_if(&mut self) -> Result<Stmt, EngineError> {
        let line = self.line();
        self.expect(&TokenKind::If)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::Colon)?;
        let then_body = self.parse_block()?;
        let else_body = if matches!(self.peek(), TokenKind::Else) {
            self.advance();
            self.expect(&TokenKind::Colon)?;
            self.parse_block()?
        } else {
            Vec::new()
        };
        Ok(Stmt::If { cond, then_body, else_body, line })
    }

    fn parse_while(&mut self) -> Result<Stmt, EngineError> {
        let line = self.line();
        self.expect(&TokenKind::While)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::Colon)?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body, line })
    }

    /// Disambiguates `x: T = e`, `x = e`, `a[i] = e`, and a bare call
    /// expression statement — all of which start with an identifier.
    fn parse_ident_led_stmt(&mut self, line: usize) -> Result<Stmt, EngineError> {
        let name = self.expect_ident()?;

        if matches!(self.peek(), TokenKind::Colon) {
            self.advance();
            let ty = self.parse_ann_type()?;
            self.expect(&TokenKind::Assign)?;
            let value = if matches!(self.peek(), TokenKind::LBracket) {
                AnnValue::List(self.parse_list_literal()?)
            } else {
                AnnValue::Scalar(self.parse_expr()?)
            };
            return Ok(Stmt::AnnAssign { name, ty, value, line });
        }

        if matches!(self.peek(), TokenKind::LBracket) {
            self.advance();
            let index = self.parse_int_literal()?;
            self.expect(&TokenKind::RBracket)?;
            self.expect(&TokenKind::Assign)?;
            let value = self.parse_expr()?;
            return Ok(Stmt::Assign { target: AssignTarget::Index { base: name, index }, value, line });
        }

        if matches!(self.peek(), TokenKind::Assign) {
            self.advance();
            let value = self.parse_expr()?;
            return Ok(Stmt::Assign { target: AssignTarget::Name(name), value, line });
        }

        if matches!(self.peek(), TokenKind::LParen) {
            let call = self.parse_call(name)?;
            return Ok(Stmt::Expr { call, line });
        }

        Err(EngineError::Parse { line, message: format!("unexpected token after identifier `{name}`") })
    }

    fn parse_int_literal(&mut self) -> Result<i64, EngineError> {
        let line = self.line();
        match self.advance() {
            TokenKind::Int(v) => Ok(v),
            other => Err(EngineError::Parse { line, message: format!("expected integer index, found {other:?}") }),
        }
    }

    fn parse_list_literal(&mut self) -> Result<Vec<Expr>, EngineError> {
        self.expect(&TokenKind::LBracket)?;
        let mut elements = Vec::new();
        if !matches!(self.peek(), TokenKind::RBracket) {
            loop {
                elements.push(self.parse_expr()?);
                if matches!(self.peek(), TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(elements)
    }

    fn parse_call(&mut self, callee: String) -> Result<Expr, EngineError> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if !matches!(self.peek(), TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if matches!(self.peek(), TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(Expr::Call { callee, args })
    }

    // ---- expression grammar (lowest to highest precedence) ----

    fn parse_expr(&mut self) -> Result<Expr, EngineError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, EngineError> {
        let mut terms = vec![self.parse_and()?];
        while matches!(self.peek(), TokenKind::Or) {
            self.advance();
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 { terms.pop().unwrap() } else { Expr::BoolOp { op: BoolOpKind::Or, terms } })
    }

    fn parse_and(&mut self) -> Result<Expr, EngineError> {
        let mut terms = vec![self.parse_not()?];
        while matches!(self.peek(), TokenKind::And) {
            self.advance();
            terms.push(self.parse_not()?);
        }
        Ok(if terms.len() == 1 { terms.pop().unwrap() } else { Expr::BoolOp { op: BoolOpKind::And, terms } })
    }

    fn parse_not(&mut self) -> Result<Expr, EngineError> {
        if matches!(self.peek(), TokenKind::Not) {
            self.advance();
            Ok(Expr::Not(Box::new(self.parse_not()?)))
        } else {
            self.parse_compare()
        }
    }

    fn parse_compare(&mut self) -> Result<Expr, EngineError> {
        let lhs = self.parse_sum()?;
        let op = match self.peek() {
            TokenKind::EqEq => CmpOp::Eq,
            TokenKind::NotEq => CmpOp::Ne,
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::Le => CmpOp::Le,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::Ge => CmpOp::Ge,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_sum()?;
        Ok(Expr::Compare { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
    }

    fn parse_sum(&mut self) -> Result<Expr, EngineError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOpKind::Add,
                TokenKind::Minus => BinOpKind::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = Expr::BinOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, EngineError> {
        let mut lhs = self.parse_factor()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOpKind::Mul,
                TokenKind::Slash => BinOpKind::Div,
                TokenKind::Percent => BinOpKind::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_factor()?;
            lhs = Expr::BinOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<Expr, EngineError> {
        let line = self.line();
        match self.advance() {
            TokenKind::Int(v) => Ok(Expr::IntLit(v)),
            TokenKind::Float(v) => Ok(Expr::RealLit(v)),
            TokenKind::Str(v) => Ok(Expr::StrLit(v)),
            TokenKind::True => Ok(Expr::BoolLit(true)),
            TokenKind::False => Ok(Expr::BoolLit(false)),
            TokenKind::Minus => {
                let inner = self.parse_factor()?;
                Ok(Expr::BinOp { op: BinOpKind::Sub, lhs: Box::new(Expr::IntLit(0)), rhs: Box::new(inner) })
            }
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                if matches!(self.peek(), TokenKind::LParen) {
                    self.parse_call(name)
                } else if matches!(self.peek(), TokenKind::LBracket) {
                    self.advance();
                    let index = self.parse_int_literal()?;
                    self.expect(&TokenKind::RBracket)?;
                    Ok(Expr::Subscript { base: name, index })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            other => Err(EngineError::Parse { line, message: format!("unexpected token {other:?} in expression") }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_triangle_classifier_shape() {
        let src = "def check_triangle(a: int, b: int, c: int):\n\
                    \x20   if a == b:\n\
                    \x20       return\n\
                    \x20   pass\n";
        let file = parse(src).unwrap();
        assert_eq!(file.functions.len(), 1);
        assert_eq!(file.functions[0].params.len(), 3);
        assert!(matches!(file.functions[0].body[0], Stmt::If { .. }));
    }

    #[test]
    fn parses_list_literal_and_subscript_assignment() {
        let src = "def f():\n    xs: list = [1, 2, 3]\n    xs[1] = 5\n";
        let file = parse(src).unwrap();
        let body = &file.functions[0].body;
        assert!(matches!(
            body[0],
            Stmt::AnnAssign { ty: None, value: AnnValue::List(ref els), .. } if els.len() == 3
        ));
        assert!(matches!(
            body[1],
            Stmt::Assign { target: AssignTarget::Index { index: 1, .. }, .. }
        ));
    }

    #[test]
    fn recovers_from_unknown_type_by_skipping_just_that_function() {
        let src = "def bad(a: bogus):\n    pass\n\ndef good(b: int):\n    pass\n";
        let file = parse(src).unwrap();
        assert_eq!(file.functions.len(), 1);
        assert_eq!(file.functions[0].name, "good");
    }

    #[test]
    fn parses_multiple_functions_in_declaration_order() {
        let src = "def f(a: int):\n    pass\n\ndef g(b: int):\n    pass\n";
        let file = parse(src).unwrap();
        assert_eq!(file.functions[0].name, "f");
        assert_eq!(file.functions[1].name, "g");
    }
}
