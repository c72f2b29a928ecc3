//! AST and IR data structures for the Python subset.
//!
//! Two layers live here:
//!   * the expression / statement AST produced by `parsers::expr` for a
//!     single line of source, and
//!   * the block IR produced by `parsers::block`, where statement lines are
//!     kept as opaque text and re-parsed lazily by the validator.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Loc ─────────────────────────────────────────────────────────────────────

/// 1-based source line attached to every IR node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Loc {
    pub line: usize,
}

impl Loc {
    pub fn new(line: usize) -> Self {
        Self { line }
    }
}

// ─── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 3,
            BinOp::Add | BinOp::Sub => 4,
            BinOp::Mul | BinOp::Div | BinOp::FloorDiv | BinOp::Mod => 5,
        }
    }

    pub fn from_symbol(sym: &str) -> Option<BinOp> {
        let op = match sym {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            "//" => BinOp::FloorDiv,
            "%" => BinOp::Mod,
            "==" => BinOp::Eq,
            "!=" => BinOp::Ne,
            "<" => BinOp::Lt,
            "<=" => BinOp::Le,
            ">" => BinOp::Gt,
            ">=" => BinOp::Ge,
            "and" => BinOp::And,
            "or" => BinOp::Or,
            _ => return None,
        };
        Some(op)
    }
}

// ─── Expr ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal, kept as written so regenerated code matches the source.
    Num(String),
    /// String literal contents (without quotes).
    Str(String),
    Bool(bool),
    None,
    Var(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Bin {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Tuple(Vec<Expr>),
}

impl Expr {
    /// Visit every call expression in evaluation order.
    pub fn for_each_call<'a>(&'a self, f: &mut impl FnMut(&'a str, &'a [Expr])) {
        match self {
            Expr::Unary { operand, .. } => operand.for_each_call(f),
            Expr::Bin { lhs, rhs, .. } => {
                lhs.for_each_call(f);
                rhs.for_each_call(f);
            }
            Expr::Call { name, args } => {
                for a in args {
                    a.for_each_call(f);
                }
                f(name, args);
            }
            Expr::Tuple(items) => {
                for i in items {
                    i.for_each_call(f);
                }
            }
            Expr::Num(_) | Expr::Str(_) | Expr::Bool(_) | Expr::None | Expr::Var(_) => {}
        }
    }

    /// Integer value of a constant literal (`3`, `+3`, `-3`), if any.
    pub fn const_int(&self) -> Option<i64> {
        match self {
            Expr::Num(text) => text.parse::<i64>().ok(),
            Expr::Unary {
                op: UnaryOp::Plus,
                operand,
            } => operand.const_int(),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => operand.const_int().map(|v| -v),
            _ => None,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Bin { op, .. } => op.precedence(),
            Expr::Unary { .. } => 6,
            Expr::Tuple(_) => 0,
            _ => 7,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min_prec: u8) -> fmt::Result {
        if self.precedence() < min_prec {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(text) => write!(f, "{text}"),
            Expr::Str(s) => {
                let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
                write!(f, "'{escaped}'")
            }
            Expr::Bool(true) => write!(f, "True"),
            Expr::Bool(false) => write!(f, "False"),
            Expr::None => write!(f, "None"),
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Unary { op, operand } => {
                match op {
                    UnaryOp::Not => write!(f, "not ")?,
                    other => write!(f, "{}", other.as_str())?,
                }
                operand.fmt_operand(f, 6)
            }
            Expr::Bin { op, lhs, rhs } => {
                let prec = op.precedence();
                lhs.fmt_operand(f, prec)?;
                write!(f, " {} ", op.as_str())?;
                // Left-associative: an equal-precedence right operand needs parens.
                rhs.fmt_operand(f, prec + 1)
            }
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    a.fmt_operand(f, 1)?;
                }
                write!(f, ")")
            }
            Expr::Tuple(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_operand(f, 1)?;
                }
                Ok(())
            }
        }
    }
}

// ─── Stmt ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AugOp {
    Add,
    Sub,
}

impl AugOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AugOp::Add => "+=",
            AugOp::Sub => "-=",
        }
    }
}

/// A single parsed statement line.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Pass,
    Return(Option<Expr>),
    Print(Vec<Expr>),
    AugAssign {
        target: String,
        op: AugOp,
        value: Expr,
    },
    /// `a = x` or tuple unpacking `a, b = x, y`.
    Assign {
        targets: Vec<String>,
        value: Expr,
    },
    /// Bare call expression, e.g. `greet(name)`.
    ExprStmt(Expr),
}

impl Stmt {
    /// Every expression evaluated by this statement.
    pub fn exprs(&self) -> Vec<&Expr> {
        match self {
            Stmt::Pass | Stmt::Return(None) => Vec::new(),
            Stmt::Return(Some(e)) | Stmt::ExprStmt(e) => vec![e],
            Stmt::Print(args) => args.iter().collect(),
            Stmt::AugAssign { value, .. } | Stmt::Assign { value, .. } => vec![value],
        }
    }

    /// Names bound by this statement.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Stmt::AugAssign { target, .. } => vec![target.as_str()],
            Stmt::Assign { targets, .. } => targets.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

// ─── Block IR ────────────────────────────────────────────────────────────────

pub type Block = Vec<IrNode>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrNode {
    Stmt {
        text: String,
        loc: Loc,
    },
    If {
        cond: String,
        then: Block,
        else_: Option<Block>,
        loc: Loc,
    },
    While {
        cond: String,
        body: Block,
        loc: Loc,
    },
    ForRange {
        var: String,
        start: String,
        end: String,
        step: Option<String>,
        body: Block,
        loc: Loc,
    },
    Def {
        name: String,
        params: Vec<String>,
        body: Block,
        loc: Loc,
    },
}

impl IrNode {
    pub fn stmt(text: impl Into<String>, line: usize) -> Self {
        IrNode::Stmt {
            text: text.into(),
            loc: Loc::new(line),
        }
    }

    pub fn loc(&self) -> Loc {
        match self {
            IrNode::Stmt { loc, .. }
            | IrNode::If { loc, .. }
            | IrNode::While { loc, .. }
            | IrNode::ForRange { loc, .. }
            | IrNode::Def { loc, .. } => *loc,
        }
    }

    /// True if this node (or anything nested in it) is a `return` statement.
    pub fn contains_return(&self) -> bool {
        match self {
            IrNode::Stmt { text, .. } => is_return_text(text),
            IrNode::If { then, else_, .. } => {
                then.iter().any(IrNode::contains_return)
                    || else_
                        .as_ref()
                        .is_some_and(|b| b.iter().any(IrNode::contains_return))
            }
            IrNode::While { body, .. }
            | IrNode::ForRange { body, .. }
            | IrNode::Def { body, .. } => body.iter().any(IrNode::contains_return),
        }
    }
}

/// `return` or `return <expr>` (word boundary aware).
pub fn is_return_text(text: &str) -> bool {
    let t = text.trim();
    t == "return"
        || t.strip_prefix("return")
            .is_some_and(|rest| rest.starts_with([' ', '\t', '(']))
}

/// `def name(a, b)` signature text, as used for function entry titles.
pub fn def_signature(name: &str, params: &[String]) -> String {
    format!("def {}({})", name, params.join(", "))
}

#[cfg(test)]
#[path = "../../tests/rust/test_syntax_types.rs"]
mod tests;
