//! Lexer for the engine's small imperative language. Indentation is
//! significant (Python-like); this module turns raw source text into a flat
//! token stream with `Indent`/`Dedent`/`Newline` markers the parser consumes
//! directly, the same way a tree-sitter grammar would hand the CFG builder
//! pre-structured nodes in the teacher's pipeline.

use crate::errors::EngineError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Def,
    If,
    Else,
    While,
    Return,
    Pass,
    And,
    Or,
    Not,
    True,
    False,

    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),

    Colon,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Arrow,
    Assign,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,

    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

fn keyword(word: &str) -> Option<TokenKind> {
    Some(match word {
        "def" => TokenKind::Def,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "return" => TokenKind::Return,
        "pass" => TokenKind::Pass,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "True" => TokenKind::True,
        "False" => TokenKind::False,
        _ => return None,
    })
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, EngineError> {
    let mut tokens = Vec::new();
    let mut indent_stack = vec![0usize];
    let mut line_no = 0usize;
    let mut paren_depth: i32 = 0;

    // Re-tokenize line by line; the language has no multi-line expressions
    // other than inside parens/brackets.
    let lines: Vec<&str> = src.lines().collect();

    for raw_line in lines {
        line_no += 1;
        let line = strip_comment(raw_line);

        if paren_depth == 0 {
            let indent = leading_spaces(line);
            let trimmed = line[indent..].trim_end();
            if trimmed.is_empty() {
                continue; // blank or comment-only line: no Newline token
            }
            let current = *indent_stack.last().unwrap();
            if indent > current {
                indent_stack.push(indent);
                tokens.push(Token { kind: TokenKind::Indent, line: line_no });
            } else {
                while indent < *indent_stack.last().unwrap() {
                    indent_stack.pop();
                    tokens.push(Token { kind: TokenKind::Dedent, line: line_no });
                }
                if indent != *indent_stack.last().unwrap() {
                    return Err(EngineError::Parse {
                        line: line_no,
                        message: "inconsistent indentation".into(),
                    });
                }
            }
        }

        let body = if paren_depth == 0 { &line[leading_spaces(line)..] } else { line };
        lex_line_body(body, line_no, &mut tokens, &mut paren_depth)?;

        if paren_depth == 0 {
            tokens.push(Token { kind: TokenKind::Newline, line: line_no });
        }
    }

    while indent_stack.len() > 1 {
        indent_stack.pop();
        tokens.push(Token { kind: TokenKind::Dedent, line: line_no });
    }
    tokens.push(Token { kind: TokenKind::Eof, line: line_no });
    Ok(tokens)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn leading_spaces(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ').count()
}

fn lex_line_body(
    body: &str,
    line_no: usize,
    tokens: &mut Vec<Token>,
    paren_depth: &mut i32,
) -> Result<(), EngineError> {
    let chars: Vec<char> = body.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '(' => {
                tokens.push(Token { kind: TokenKind::LParen, line: line_no });
                *paren_depth += 1;
                i += 1;
            }
            ')' => {
                tokens.push(Token { kind: TokenKind::RParen, line: line_no });
                *paren_depth -= 1;
                i += 1;
            }
            '[' => {
                tokens.push(Token { kind: TokenKind::LBracket, line: line_no });
                *paren_depth += 1;
                i += 1;
            }
            ']' => {
                tokens.push(Token { kind: TokenKind::RBracket, line: line_no });
                *paren_depth -= 1;
                i += 1;
            }
            ':' => {
                tokens.push(Token { kind: TokenKind::Colon, line: line_no });
                i += 1;
            }
            ',' => {
                tokens.push(Token { kind: TokenKind::Comma, line: line_no });
                i += 1;
            }
            '+' => {
                tokens.push(Token { kind: TokenKind::Plus, line: line_no });
                i += 1;
            }
            '-' => {
                if chars.get(i + 1) == Some(&'>') {
                    tokens.push(Token { kind: TokenKind::Arrow, line: line_no });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::Minus, line: line_no });
                    i += 1;
                }
            }
            '*' => {
                tokens.push(Token { kind: TokenKind::Star, line: line_no });
                i += 1;
            }
            '/' => {
                tokens.push(Token { kind: TokenKind::Slash, line: line_no });
                i += 1;
            }
            '%' => {
                tokens.push(Token { kind: TokenKind::Percent, line: line_no });
                i += 1;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token { kind: TokenKind::EqEq, line: line_no });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::Assign, line: line_no });
                    i += 1;
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token { kind: TokenKind::NotEq, line: line_no });
                    i += 2;
                } else {
                    return Err(EngineError::Parse { line: line_no, message: "unexpected `!`".into() });
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token { kind: TokenKind::Le, line: line_no });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::Lt, line: line_no });
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token { kind: TokenKind::Ge, line: line_no });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::Gt, line: line_no });
                    i += 1;
                }
            }
            '"' | '\'' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                while i < chars.len() && chars[i] != quote {
                    s.push(chars[i]);
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(EngineError::Parse { line: line_no, message: "unterminated string literal".into() });
                }
                i += 1; // closing quote
                tokens.push(Token { kind: TokenKind::Str(s), line: line_no });
            }
            c if c.is_ascii_digit() => {
                let start = i;
                let mut is_float = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    if chars[i] == '.' {
                        is_float = true;
                    }
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if is_float {
                    let v: f64 = text
                        .parse()
                        .map_err(|_| EngineError::Parse { line: line_no, message: format!("bad float literal `{text}`") })?;
                    tokens.push(Token { kind: TokenKind::Float(v), line: line_no });
                } else {
                    let v: i64 = text
                        .parse()
                        .map_err(|_| EngineError::Parse { line: line_no, message: format!("bad int literal `{text}`") })?;
                    tokens.push(Token { kind: TokenKind::Int(v), line: line_no });
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match keyword(&word) {
                    Some(kind) => tokens.push(Token { kind, line: line_no }),
                    None => tokens.push(Token { kind: TokenKind::Ident(word), line: line_no }),
                }
            }
            other => {
                return Err(EngineError::Parse {
                    line: line_no,
                    message: format!("unexpected character `{other}`"),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_function_header() {
        let toks = tokenize("def f(a: int, b: int) -> int:\n    pass\n").unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| &t.kind).collect();
        assert_eq!(kinds[0], &TokenKind::Def);
        assert!(matches!(kinds[1], TokenKind::Ident(name) if name == "f"));
        assert!(kinds.contains(&&TokenKind::Arrow));
        assert!(kinds.contains(&&TokenKind::Indent));
        assert!(kinds.contains(&&TokenKind::Pass));
    }

    #[test]
    fn rejects_inconsistent_dedent() {
        let src = "def f():\n    if True:\n        pass\n      pass\n";
        assert!(tokenize(src).is_err());
    }
}
