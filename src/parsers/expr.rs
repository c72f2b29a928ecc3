//! Recursive-descent parser for single-line expressions and statements.
//!
//! Precedence, tightest first: unary (`+ - not`) → `* / // %` → `+ -` →
//! comparisons → `and` → `or`. A comma-separated list at the top level of an
//! expression list forms a tuple.

use super::base::{SyntaxError, Token, TokenKind, tokenize};
use crate::syntax::types::{AugOp, BinOp, Expr, Stmt, UnaryOp};

/// Python keywords that may never be used as identifiers.
pub const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

// ─── ExprParser ──────────────────────────────────────────────────────────────

struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    source: &'a str,
}

impl<'a> ExprParser<'a> {
    fn new(tokens: &'a [Token], source: &'a str) -> Self {
        Self {
            tokens,
            pos: 0,
            source,
        }
    }

    fn peek(&self) -> &Token {
        // tokenize() always terminates the list with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn remaining_text(&self) -> String {
        let start = self.peek().pos;
        self.source.chars().skip(start).collect::<String>().trim().to_string()
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        let rest = self.remaining_text();
        if rest.is_empty() {
            SyntaxError::at(message, self.source.trim())
        } else {
            SyntaxError::at(message, rest)
        }
    }

    fn expect_rparen(&mut self) -> Result<(), SyntaxError> {
        if self.peek().kind == TokenKind::RParen {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here("缺少右括号"))
        }
    }

    /// expr_list := or_expr (',' or_expr)*
    fn parse_expr_list(&mut self) -> Result<Expr, SyntaxError> {
        let first = self.parse_or()?;
        if self.peek().kind != TokenKind::Comma {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.peek().kind == TokenKind::Comma {
            self.advance();
            items.push(self.parse_or()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_and()?;
        while self.peek().is_id("or") {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = bin(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_comparison()?;
        while self.peek().is_id("and") {
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = bin(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let tok = self.peek();
            let op = match (tok.kind, tok.text.as_str()) {
                (TokenKind::Op, "==" | "!=" | "<" | "<=" | ">" | ">=") => {
                    BinOp::from_symbol(&tok.text)
                }
                _ => None,
            };
            let Some(op) = op else { break };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = bin(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = if self.peek().is_op("+") {
                BinOp::Add
            } else if self.peek().is_op("-") {
                BinOp::Sub
            } else {
                break;
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = bin(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let tok = self.peek();
            let op = match (tok.kind, tok.text.as_str()) {
                (TokenKind::Op, "*" | "/" | "//" | "%") => BinOp::from_symbol(&tok.text),
                _ => None,
            };
            let Some(op) = op else { break };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = bin(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = if self.peek().is_op("+") {
            Some(UnaryOp::Plus)
        } else if self.peek().is_op("-") {
            Some(UnaryOp::Neg)
        } else if self.peek().is_id("not") {
            Some(UnaryOp::Not)
        } else {
            None
        };
        match op {
            Some(op) => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                })
            }
            None => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Num => Ok(Expr::Num(tok.text)),
            TokenKind::Str => Ok(Expr::Str(tok.text)),
            TokenKind::Id => match tok.text.as_str() {
                "True" => Ok(Expr::Bool(true)),
                "False" => Ok(Expr::Bool(false)),
                "None" => Ok(Expr::None),
                name if is_keyword(name) => {
                    Err(SyntaxError::at("关键字不能用作表达式", name.to_string()))
                }
                _ => {
                    if self.peek().kind == TokenKind::LParen {
                        self.advance();
                        let args = self.parse_call_args()?;
                        Ok(Expr::Call {
                            name: tok.text,
                            args,
                        })
                    } else {
                        Ok(Expr::Var(tok.text))
                    }
                }
            },
            TokenKind::LParen => {
                if self.peek().kind == TokenKind::RParen {
                    return Err(SyntaxError::at("不支持空元组", self.source.trim()));
                }
                let inner = self.parse_expr_list()?;
                self.expect_rparen()?;
                Ok(inner)
            }
            TokenKind::Eof => Err(SyntaxError::at("表达式不完整", self.source.trim())),
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error_here("无法解析的表达式"))
            }
        }
    }

    /// Arguments after `(`, up to and including `)`.
    fn parse_call_args(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut args = Vec::new();
        if self.peek().kind == TokenKind::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_or()?);
            if self.peek().kind == TokenKind::Comma {
                self.advance();
                continue;
            }
            self.expect_rparen()?;
            return Ok(args);
        }
    }

    fn expect_end(&self) -> Result<(), SyntaxError> {
        if self.peek().kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.error_here("表达式存在多余内容"))
        }
    }
}

fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Bin {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Parse an expression (or a top-level tuple) spanning the whole input.
pub fn parse_expression(src: &str) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(src)?;
    parse_tokens(&tokens, src)
}

fn parse_tokens(tokens: &[Token], src: &str) -> Result<Expr, SyntaxError> {
    let mut parser = ExprParser::new(tokens, src);
    if parser.peek().kind == TokenKind::Eof {
        return Err(SyntaxError::new("表达式为空"));
    }
    let expr = parser.parse_expr_list()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Index of the first depth-0 token satisfying `pred`.
fn find_top_level(tokens: &[Token], pred: impl Fn(&Token) -> bool) -> Option<usize> {
    let mut depth = 0i32;
    for (i, tok) in tokens.iter().enumerate() {
        match tok.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth -= 1,
            _ if depth == 0 && pred(tok) => return Some(i),
            _ => {}
        }
    }
    None
}

/// Source text covered by `tokens[from..]` (up to the Eof token).
fn text_from(src: &str, tokens: &[Token], from: usize) -> String {
    let start = tokens[from].pos;
    src.chars().skip(start).collect::<String>().trim().to_string()
}

/// Parse a single statement line.
pub fn parse_statement(src: &str) -> Result<Stmt, SyntaxError> {
    let text = src.trim();
    if text.is_empty() || text == "pass" {
        return Ok(Stmt::Pass);
    }
    let tokens = tokenize(text)?;

    if tokens[0].is_id("return") {
        if tokens[1].kind == TokenKind::Eof {
            return Ok(Stmt::Return(None));
        }
        let rest = text_from(text, &tokens, 1);
        return Ok(Stmt::Return(Some(parse_expression(&rest)?)));
    }

    if tokens[0].is_id("print") && tokens[1].kind == TokenKind::LParen {
        return match parse_tokens(&tokens, text)? {
            Expr::Call { name, args } if name == "print" => Ok(Stmt::Print(args)),
            _ => Err(SyntaxError::at("print 语句格式错误", text)),
        };
    }

    let uses_input = tokens
        .windows(2)
        .any(|w| w[0].is_id("input") && w[1].kind == TokenKind::LParen);
    if uses_input {
        return Err(SyntaxError::at("不支持 input()", text));
    }

    if let Some(idx) = find_top_level(&tokens, |t| t.is_op("+=") || t.is_op("-=")) {
        let op = if tokens[idx].text == "+=" {
            AugOp::Add
        } else {
            AugOp::Sub
        };
        if idx != 1 || tokens[0].kind != TokenKind::Id {
            return Err(SyntaxError::at("增量赋值的目标必须是单个变量", text));
        }
        let value = parse_expression(&text_from(text, &tokens, idx + 1))?;
        return Ok(Stmt::AugAssign {
            target: tokens[0].text.clone(),
            op,
            value,
        });
    }

    if let Some(idx) = find_top_level(&tokens, |t| t.is_op("=")) {
        let targets = parse_targets(&tokens[..idx])
            .ok_or_else(|| SyntaxError::at("赋值目标无效", text))?;
        let value = parse_expression(&text_from(text, &tokens, idx + 1))?;
        if let Expr::Tuple(items) = &value {
            if targets.len() > 1 && items.len() != targets.len() {
                return Err(SyntaxError::at("解包数量不匹配", text));
            }
        }
        return Ok(Stmt::Assign { targets, value });
    }

    match parse_tokens(&tokens, text)? {
        call @ Expr::Call { .. } => Ok(Stmt::ExprStmt(call)),
        _ => Err(SyntaxError::at("不支持的语句", text)),
    }
}

/// `a` or `a, b, c`: identifiers separated by commas.
fn parse_targets(tokens: &[Token]) -> Option<Vec<String>> {
    let mut targets = Vec::new();
    for (i, tok) in tokens.iter().enumerate() {
        let expect_name = i % 2 == 0;
        match (expect_name, tok.kind) {
            (true, TokenKind::Id) => targets.push(tok.text.clone()),
            (false, TokenKind::Comma) => {}
            _ => return None,
        }
    }
    if targets.is_empty() || tokens.len() % 2 == 0 {
        return None;
    }
    Some(targets)
}

#[cfg(test)]
#[path = "../../tests/rust/test_parsers_expr.rs"]
mod tests;
