//! Strict validator for the Python subset.
//!
//! Re-parses every statement and condition of the block IR with the
//! expression grammar and enforces the semantic rules:
//!   * calls must resolve to a module-level `def` (top-level code may only
//!     call functions defined above it; function bodies may call any);
//!   * no duplicate definitions, no nested `def`;
//!   * identifiers must be legal and not keywords;
//!   * `return` only inside a function;
//!   * `range` steps must be positive integer constants.
//!
//! All problems are collected; nothing is thrown.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::parsers::expr::{is_keyword, parse_expression, parse_statement};
use crate::parsers::parse_program;
use crate::syntax::types::{Block, Expr, IrNode, Loc, Stmt};

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}_][\p{L}\p{N}_]*$").expect("valid identifier regex"));
static FSTRING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\b[rb]?f["']"#).expect("valid f-string regex"));

/// Accepted program: the IR and any advisory warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
    pub ir: Block,
    pub warnings: Vec<String>,
}

/// Rejected program: every syntax/semantic error found, plus warnings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", errors.join("\n"))]
pub struct ValidationFailure {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn is_valid_identifier(name: &str) -> bool {
    IDENT_RE.is_match(name) && !is_keyword(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    TopLevel,
    Function,
}

struct Validator {
    /// name → parameter count, for every module-level def.
    module_defs: HashMap<String, usize>,
    /// Module-level defs already executed in source order.
    seen_defs: HashSet<String>,
    errors: Vec<String>,
}

impl Validator {
    fn error(&mut self, loc: Loc, message: impl AsRef<str>) {
        self.errors.push(format!("第{}行: {}", loc.line, message.as_ref()));
    }

    fn check_identifier(&mut self, loc: Loc, name: &str, what: &str) {
        if !is_valid_identifier(name) {
            self.error(loc, format!("非法的{what}名称: {name}"));
        }
    }

    fn collect_defs(&mut self, block: &Block) {
        for node in block {
            if let IrNode::Def {
                name, params, loc, ..
            } = node
            {
                self.check_identifier(*loc, name, "函数");
                if self.module_defs.contains_key(name) {
                    self.error(*loc, format!("函数重复定义: {name}"));
                } else {
                    self.module_defs.insert(name.clone(), params.len());
                }
            }
        }
    }

    fn check_calls(&mut self, loc: Loc, expr: &Expr, scope: Scope) {
        let mut calls: Vec<(String, usize)> = Vec::new();
        expr.for_each_call(&mut |name, args| calls.push((name.to_string(), args.len())));
        for (name, argc) in calls {
            match self.module_defs.get(&name).copied() {
                None if name == "print" => {
                    self.error(loc, "print() 只能作为独立语句使用");
                }
                None => self.error(loc, format!("函数未定义: {name}")),
                Some(_) if scope == Scope::TopLevel && !self.seen_defs.contains(&name) => {
                    self.error(loc, format!("函数未定义: {name}（调用前必须先定义）"));
                }
                Some(arity) if arity != argc => {
                    self.error(
                        loc,
                        format!("函数 {name} 需要 {arity} 个参数，实际传入 {argc} 个"),
                    );
                }
                Some(_) => {}
            }
        }
    }

    fn check_expr_text(&mut self, loc: Loc, text: &str, scope: Scope) -> Option<Expr> {
        match parse_expression(text) {
            Ok(expr) => {
                self.check_calls(loc, &expr, scope);
                Some(expr)
            }
            Err(e) => {
                self.error(loc, e.to_string());
                None
            }
        }
    }

    fn check_stmt(&mut self, loc: Loc, text: &str, scope: Scope) {
        let stmt = match parse_statement(text) {
            Ok(stmt) => stmt,
            Err(e) => {
                self.error(loc, e.to_string());
                return;
            }
        };
        if matches!(stmt, Stmt::Return(_)) && scope == Scope::TopLevel {
            self.error(loc, "return 只能出现在函数内部");
        }
        for target in stmt.targets() {
            self.check_identifier(loc, target, "变量");
        }
        if let Stmt::Print(args) = &stmt {
            for arg in args {
                self.check_calls(loc, arg, scope);
            }
        } else {
            for expr in stmt.exprs() {
                self.check_calls(loc, expr, scope);
            }
        }
    }

    fn walk_block(&mut self, block: &Block, scope: Scope, module_level: bool) {
        for node in block {
            self.walk_node(node, scope, module_level);
        }
    }

    fn walk_node(&mut self, node: &IrNode, scope: Scope, module_level: bool) {
        match node {
            IrNode::Stmt { text, loc } => self.check_stmt(*loc, text, scope),
            IrNode::If {
                cond,
                then,
                else_,
                loc,
            } => {
                self.check_expr_text(*loc, cond, scope);
                self.walk_block(then, scope, false);
                if let Some(else_block) = else_ {
                    self.walk_block(else_block, scope, false);
                }
            }
            IrNode::While { cond, body, loc } => {
                self.check_expr_text(*loc, cond, scope);
                self.walk_block(body, scope, false);
            }
            IrNode::ForRange {
                var,
                start,
                end,
                step,
                body,
                loc,
            } => {
                self.check_identifier(*loc, var, "循环变量");
                self.check_expr_text(*loc, start, scope);
                self.check_expr_text(*loc, end, scope);
                if let Some(step) = step {
                    if let Some(expr) = self.check_expr_text(*loc, step, scope) {
                        match expr.const_int() {
                            None => self.error(*loc, "range() 的步长必须是整数常量"),
                            Some(v) if v <= 0 => self.error(*loc, "range() 的步长必须为正数"),
                            Some(_) => {}
                        }
                    }
                }
                self.walk_block(body, scope, false);
            }
            IrNode::Def {
                name,
                params,
                body,
                loc,
            } => {
                if !module_level {
                    self.error(*loc, format!("函数定义只能位于模块顶层: {name}"));
                }
                let mut seen_params = HashSet::new();
                for p in params {
                    self.check_identifier(*loc, p, "参数");
                    if !seen_params.insert(p.as_str()) {
                        self.error(*loc, format!("参数重复: {p}"));
                    }
                }
                self.walk_block(body, Scope::Function, false);
                if module_level {
                    self.seen_defs.insert(name.clone());
                }
            }
        }
    }
}

/// Advisory hints about common constructs outside the subset.
fn unsupported_hints(code: &str) -> Vec<String> {
    let mut hints = Vec::new();
    if code.contains("elif") {
        hints.push("提示: elif 会被转换为 else 中嵌套的 if".to_string());
    }
    if FSTRING_RE.is_match(code) {
        hints.push("提示: 不支持 f-string，请使用字符串拼接或 print 的多个参数".to_string());
    }
    if code.contains("len(") {
        hints.push("提示: 不支持 len() 等内置函数".to_string());
    }
    if code.contains('[') {
        hints.push("提示: 不支持列表与下标访问".to_string());
    }
    if code.contains('{') {
        hints.push("提示: 不支持字典与集合".to_string());
    }
    if code.contains("input(") {
        hints.push("提示: 不支持 input()，请直接给变量赋值".to_string());
    }
    if code.contains("import ") {
        hints.push("提示: 不支持导入模块".to_string());
    }
    if code.contains("class ") {
        hints.push("提示: 不支持定义类".to_string());
    }
    hints
}

/// Validate source text against the strict subset.
pub fn validate_python_strict(code: &str) -> Result<Validated, ValidationFailure> {
    let parsed = match parse_program(code) {
        Ok(parsed) => parsed,
        Err(err) => {
            let mut warnings = err.warnings;
            warnings.extend(unsupported_hints(code));
            return Err(ValidationFailure {
                errors: err.errors,
                warnings,
            });
        }
    };

    let mut validator = Validator {
        module_defs: HashMap::new(),
        seen_defs: HashSet::new(),
        errors: Vec::new(),
    };
    validator.collect_defs(&parsed.ir);
    validator.walk_block(&parsed.ir, Scope::TopLevel, true);

    if validator.errors.is_empty() {
        return Ok(Validated {
            ir: parsed.ir,
            warnings: parsed.warnings,
        });
    }
    debug!(errors = validator.errors.len(), "validation failed");
    let mut warnings = parsed.warnings;
    warnings.extend(unsupported_hints(code));
    Err(ValidationFailure {
        errors: validator.errors,
        warnings,
    })
}

#[cfg(test)]
#[path = "../tests/rust/test_validate.rs"]
mod tests;
