//! Shared Cursor tokenizer and text-splitting helpers.
//!
//! The cursor works over one logical source line; the block parser strips
//! indentation and comments before handing lines over.

use thiserror::Error;

// ─── SyntaxError ─────────────────────────────────────────────────────────────

/// Unparseable statement or expression. `fragment` names the offending text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub fragment: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fragment: None,
        }
    }

    pub fn at(message: impl Into<String>, fragment: impl Into<String>) -> Self {
        let fragment = fragment.into();
        Self {
            message: format!("{}: `{}`", message.into(), fragment),
            fragment: Some(fragment),
        }
    }
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Num,
    Str,
    Id,
    Op,
    LParen,
    RParen,
    Comma,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal text; for `Str` this is the unescaped contents.
    pub text: String,
    /// Char offset of the token start.
    pub pos: usize,
}

impl Token {
    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Op && self.text == op
    }

    pub fn is_id(&self, name: &str) -> bool {
        self.kind == TokenKind::Id && self.text == name
    }
}

/// Operators recognised by the tokenizer, longest first.
pub const OPERATORS: &[&str] = &[
    "//", "==", "!=", "<=", ">=", "+=", "-=", "+", "-", "*", "/", "%", "<", ">", "=",
];

// ─── Cursor (stateful tokenizer) ─────────────────────────────────────────────

/// Stateful cursor over a single source line.
pub struct Cursor {
    pub src: Vec<char>,
    pub pos: usize,
}

impl Cursor {
    pub fn new(src: &str) -> Self {
        Self {
            src: src.chars().collect(),
            pos: 0,
        }
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Peek whether the next chars match the given string.
    pub fn peek(&self, s: &str) -> bool {
        let chars: Vec<char> = s.chars().collect();
        if self.pos + chars.len() > self.src.len() {
            return false;
        }
        self.src[self.pos..self.pos + chars.len()] == chars[..]
    }

    /// Consume `s` if it matches; returns true if consumed.
    pub fn consume(&mut self, s: &str) -> bool {
        if self.peek(s) {
            self.pos += s.chars().count();
            true
        } else {
            false
        }
    }

    /// Skip spaces and tabs.
    pub fn skip_ws(&mut self) {
        while self.pos < self.src.len() && (self.src[self.pos] == ' ' || self.src[self.pos] == '\t')
        {
            self.pos += 1;
        }
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.src[start..end].iter().collect()
    }

    fn rest(&self) -> String {
        self.slice(self.pos.min(self.src.len()), self.src.len())
    }

    /// Match an identifier: a letter or `_`, then letters, digits or `_`.
    pub fn match_identifier(&mut self) -> Option<String> {
        let ch = *self.src.get(self.pos)?;
        if !ch.is_alphabetic() && ch != '_' {
            return None;
        }
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.src.len() {
            let c = self.src[self.pos];
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        Some(self.slice(start, self.pos))
    }

    /// Match an integer or decimal literal.
    pub fn match_number(&mut self) -> Option<String> {
        let ch = *self.src.get(self.pos)?;
        if !ch.is_ascii_digit() {
            return None;
        }
        let start = self.pos;
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.pos + 1 < self.src.len()
            && self.src[self.pos] == '.'
            && self.src[self.pos + 1].is_ascii_digit()
        {
            self.pos += 1;
            while self.pos < self.src.len() && self.src[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        }
        Some(self.slice(start, self.pos))
    }

    /// Parse a quoted string starting at the current quote char.
    ///
    /// Handles `\n`, `\t`, `\\` and escaped quotes; an unterminated string
    /// is an error.
    pub fn parse_quoted_string(&mut self) -> Result<String, SyntaxError> {
        let start = self.pos;
        let quote = self.src[self.pos];
        self.pos += 1;
        let mut buf = String::new();
        while self.pos < self.src.len() {
            let ch = self.src[self.pos];
            if ch == quote {
                self.pos += 1;
                return Ok(buf);
            }
            if ch == '\\' && self.pos + 1 < self.src.len() {
                let nxt = self.src[self.pos + 1];
                match nxt {
                    'n' => buf.push('\n'),
                    't' => buf.push('\t'),
                    other => buf.push(other),
                }
                self.pos += 2;
            } else {
                buf.push(ch);
                self.pos += 1;
            }
        }
        Err(SyntaxError::at("字符串未闭合", self.slice(start, self.src.len())))
    }

    /// Produce the next token.
    pub fn next_token(&mut self) -> Result<Token, SyntaxError> {
        self.skip_ws();
        let pos = self.pos;
        let Some(&ch) = self.src.get(self.pos) else {
            return Ok(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                pos,
            });
        };
        let token = |kind, text: String| Token { kind, text, pos };

        if let Some(num) = self.match_number() {
            return Ok(token(TokenKind::Num, num));
        }
        if let Some(id) = self.match_identifier() {
            return Ok(token(TokenKind::Id, id));
        }
        if ch == '"' || ch == '\'' {
            let s = self.parse_quoted_string()?;
            return Ok(token(TokenKind::Str, s));
        }
        match ch {
            '(' => {
                self.pos += 1;
                return Ok(token(TokenKind::LParen, "(".to_string()));
            }
            ')' => {
                self.pos += 1;
                return Ok(token(TokenKind::RParen, ")".to_string()));
            }
            ',' => {
                self.pos += 1;
                return Ok(token(TokenKind::Comma, ",".to_string()));
            }
            _ => {}
        }
        for op in OPERATORS {
            if self.consume(op) {
                return Ok(token(TokenKind::Op, (*op).to_string()));
            }
        }
        Err(SyntaxError::at(
            format!("无法识别的字符 '{ch}'"),
            self.rest(),
        ))
    }
}

/// Tokenize one line; the result always ends with an `Eof` token.
pub fn tokenize(line: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut cursor = Cursor::new(line);
    let mut tokens = Vec::new();
    loop {
        let tok = cursor.next_token()?;
        let done = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if done {
            return Ok(tokens);
        }
    }
}

// ─── Text helpers ────────────────────────────────────────────────────────────

/// Split `text` on `sep` at parenthesis depth 0, outside string literals.
///
/// Pieces are trimmed; an empty input yields an empty list.
pub fn split_top_level(text: &str, sep: char) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut current = String::new();
    for ch in text.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                current.push(ch);
            }
            c if c == sep && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    parts.push(current.trim().to_string());
    parts
}

/// Remove a trailing `# comment` that is not inside a string literal.
pub fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, ch) in line.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '#' => return &line[..idx],
            _ => {}
        }
    }
    line
}

/// Leading-whitespace width, counting a tab as four columns.
pub fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

#[cfg(test)]
#[path = "../../tests/rust/test_parsers_base.rs"]
mod tests;
