//! Flow → code regeneration.
//!
//! Rebuilds structured block IR from a (possibly hand-edited) flow graph and
//! prints it back to Python. Decisions entered by a back-edge become `while`
//! loops; every other decision becomes an `if` whose branches rejoin at the
//! first node reachable from both sides.

use std::collections::{HashMap, HashSet, VecDeque};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use super::merge::{ComponentKind, ordered_components};
use super::types::{FlowGraph, FlowNode, Shape, is_false_label, is_true_label};
use crate::layout::graph::FlowGraphIR;
use crate::parsers::base::split_top_level;
use crate::parsers::expr::{parse_expression, parse_statement};
use crate::syntax::printer::ir_to_python;
use crate::syntax::types::{AugOp, BinOp, Block, Expr, IrNode, Loc, Stmt, is_return_text};

static DEF_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^def\s+([^\s(]+)\s*\((.*)\)\s*:?$").expect("valid def title regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    #[error("流程图缺少开始节点")]
    MissingEntry,
    #[error("判断节点 `{0}` 必须恰好有两条出边")]
    MalformedDecision(String),
    #[error("节点 `{0}` 有多条后继，无法生成顺序代码")]
    Branching(String),
    #[error("回边指向了非判断节点 `{0}`")]
    LoopTarget(String),
    #[error("流程图结构无法转换为代码，节点 `{0}` 被重复访问")]
    Unstructured(String),
    #[error("无法解析函数入口 `{0}`")]
    BadSignature(String),
}

struct Generator<'g> {
    nodes: HashMap<&'g str, &'g FlowNode>,
    /// Forward successors (back-edges removed), in edge order, with labels.
    forward: HashMap<&'g str, Vec<(&'g str, Option<&'g str>)>>,
    loop_headers: HashSet<&'g str>,
    emitted: HashSet<&'g str>,
}

impl<'g> Generator<'g> {
    fn new(graph: &'g FlowGraph, back: &HashSet<usize>) -> Result<Self, CodegenError> {
        let nodes: HashMap<&str, &FlowNode> =
            graph.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let mut forward: HashMap<&str, Vec<(&str, Option<&str>)>> = HashMap::new();
        let mut loop_headers = HashSet::new();
        for (i, edge) in graph.edges.iter().enumerate() {
            if back.contains(&i) {
                match nodes.get(edge.to.as_str()) {
                    Some(n) if n.shape == Shape::Decision => {
                        loop_headers.insert(edge.to.as_str());
                    }
                    _ => return Err(CodegenError::LoopTarget(edge.to.clone())),
                }
                continue;
            }
            forward
                .entry(edge.from.as_str())
                .or_default()
                .push((edge.to.as_str(), edge.label.as_deref()));
        }
        Ok(Self {
            nodes,
            forward,
            loop_headers,
            emitted: HashSet::new(),
        })
    }

    fn successors(&self, id: &str) -> &[(&'g str, Option<&'g str>)] {
        self.forward.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn single_successor(&self, id: &'g str) -> Result<Option<&'g str>, CodegenError> {
        match self.successors(id) {
            [] => Ok(None),
            [(next, _)] => Ok(Some(*next)),
            _ => Err(CodegenError::Branching(id.to_string())),
        }
    }

    /// (true target, false target) of a decision.
    fn branches(&self, id: &'g str) -> Result<(&'g str, &'g str), CodegenError> {
        let succ = self.successors(id);
        let [(a, la), (b, lb)] = succ else {
            return Err(CodegenError::MalformedDecision(id.to_string()));
        };
        let a_false = la.is_some_and(is_false_label);
        let b_true = lb.is_some_and(is_true_label);
        if a_false || b_true {
            Ok((*b, *a))
        } else {
            Ok((*a, *b))
        }
    }

    /// Forward BFS order from `start`, never expanding past `stop`.
    fn reachable(&self, start: &'g str, stop: Option<&'g str>) -> Vec<&'g str> {
        let mut seen: HashSet<&str> = HashSet::from([start]);
        let mut order = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(id) = queue.pop_front() {
            if Some(id) == stop {
                continue;
            }
            for &(next, _) in self.successors(id) {
                if seen.insert(next) {
                    order.push(next);
                    queue.push_back(next);
                }
            }
        }
        order
    }

    /// First node on the true side, in BFS order, also reachable from the
    /// false side.
    fn merge_point(
        &self,
        on_true: &'g str,
        on_false: &'g str,
        stop: Option<&'g str>,
    ) -> Option<&'g str> {
        let from_false: HashSet<&str> = self.reachable(on_false, stop).into_iter().collect();
        self.reachable(on_true, stop)
            .into_iter()
            .find(|id| from_false.contains(id))
    }

    fn loc(&self, id: &str) -> Loc {
        Loc::new(self.nodes.get(id).and_then(|n| n.line).unwrap_or(0))
    }

    fn emit_seq(
        &mut self,
        start: Option<&'g str>,
        stop: Option<&'g str>,
    ) -> Result<Block, CodegenError> {
        let mut block = Block::new();
        let mut cursor = start;
        while let Some(id) = cursor {
            if Some(id) == stop {
                break;
            }
            let Some(node) = self.nodes.get(id).copied() else {
                break;
            };
            if !self.emitted.insert(id) {
                return Err(CodegenError::Unstructured(id.to_string()));
            }
            let title = node.title.trim();
            cursor = match node.shape {
                Shape::Connector => self.single_successor(id)?,
                Shape::StartEnd if node.is_entry() => self.single_successor(id)?,
                Shape::StartEnd => {
                    if is_return_text(title) {
                        block.push(IrNode::Stmt {
                            text: title.to_string(),
                            loc: self.loc(id),
                        });
                    }
                    None
                }
                Shape::Decision if self.loop_headers.contains(id) => {
                    let (body_start, exit) = self.branches(id)?;
                    let body = self.emit_seq(Some(body_start), Some(id))?;
                    block.push(IrNode::While {
                        cond: title.to_string(),
                        body,
                        loc: self.loc(id),
                    });
                    Some(exit)
                }
                Shape::Decision => {
                    let (on_true, on_false) = self.branches(id)?;
                    let join = self.merge_point(on_true, on_false, stop);
                    let then = self.emit_seq(Some(on_true), join)?;
                    if join.is_none() && ends_in_return(&then) {
                        // The false side simply continues the sequence.
                        block.push(IrNode::If {
                            cond: title.to_string(),
                            then,
                            else_: None,
                            loc: self.loc(id),
                        });
                        cursor = Some(on_false);
                        continue;
                    }
                    let else_block = self.emit_seq(Some(on_false), join)?;
                    block.push(IrNode::If {
                        cond: title.to_string(),
                        then,
                        else_: (!else_block.is_empty()).then_some(else_block),
                        loc: self.loc(id),
                    });
                    join
                }
                Shape::Process | Shape::Io | Shape::Subroutine => {
                    if title != "pass" && !title.is_empty() {
                        block.push(IrNode::Stmt {
                            text: title.to_string(),
                            loc: self.loc(id),
                        });
                    }
                    self.single_successor(id)?
                }
            };
        }
        Ok(block)
    }
}

fn ends_in_return(block: &Block) -> bool {
    matches!(block.last(), Some(IrNode::Stmt { text, .. }) if is_return_text(text))
}

fn parse_def_title(title: &str) -> Result<(String, Vec<String>), CodegenError> {
    let caps = DEF_TITLE_RE
        .captures(title.trim())
        .ok_or_else(|| CodegenError::BadSignature(title.to_string()))?;
    Ok((caps[1].to_string(), split_top_level(&caps[2], ',')))
}

/// Reconstruct block IR from a flow graph: functions first, then module code.
pub fn flow_to_ir(graph: &FlowGraph) -> Result<Block, CodegenError> {
    let view = FlowGraphIR::from_flow(graph);
    let mut back = HashSet::new();
    for node in graph.nodes.iter().filter(|n| n.is_entry()) {
        back.extend(view.back_edges(&node.id));
    }
    let mut generator = Generator::new(graph, &back)?;

    let mut defs = Block::new();
    let mut main = Block::new();
    for (kind, members) in ordered_components(graph) {
        let entry = members
            .iter()
            .filter_map(|&i| graph.nodes.get(i))
            .find(|n| n.is_entry())
            .ok_or(CodegenError::MissingEntry)?;
        let body = generator.emit_seq(Some(entry.id.as_str()), None)?;
        let title = entry.title.trim();
        if title.starts_with("def ") {
            let (name, params) = parse_def_title(title)?;
            defs.push(IrNode::Def {
                name,
                params,
                body,
                loc: Loc::new(entry.line.unwrap_or(0)),
            });
        } else {
            if kind != ComponentKind::Main {
                debug!(entry = %entry.id, "start component treated as module code");
            }
            main.extend(body);
        }
    }
    defs.extend(main);
    Ok(defs)
}

// ─── Counting-loop rewrite ────────────────────────────────────────────────────

fn assigned_names(block: &Block, out: &mut HashSet<String>) {
    for node in block {
        match node {
            IrNode::Stmt { text, .. } => {
                if let Ok(stmt) = parse_statement(text) {
                    out.extend(stmt.targets().into_iter().map(str::to_string));
                }
            }
            IrNode::If { then, else_, .. } => {
                assigned_names(then, out);
                if let Some(b) = else_ {
                    assigned_names(b, out);
                }
            }
            IrNode::While { body, .. } => assigned_names(body, out),
            IrNode::ForRange { var, body, .. } => {
                out.insert(var.clone());
                assigned_names(body, out);
            }
            IrNode::Def { .. } => {}
        }
    }
}

fn expr_vars(expr: &Expr, out: &mut HashSet<String>) {
    match expr {
        Expr::Var(v) => {
            out.insert(v.clone());
        }
        Expr::Unary { operand, .. } => expr_vars(operand, out),
        Expr::Bin { lhs, rhs, .. } => {
            expr_vars(lhs, out);
            expr_vars(rhs, out);
        }
        Expr::Call { args, .. } | Expr::Tuple(args) => {
            for a in args {
                expr_vars(a, out);
            }
        }
        Expr::Num(_) | Expr::Str(_) | Expr::Bool(_) | Expr::None => {}
    }
}

/// `v = <start>` → (v, start).
fn counter_init(node: &IrNode) -> Option<(String, Expr)> {
    let IrNode::Stmt { text, .. } = node else {
        return None;
    };
    match parse_statement(text).ok()? {
        Stmt::Assign { targets, value } if targets.len() == 1 && !matches!(value, Expr::Tuple(_)) => {
            Some((targets.into_iter().next()?, value))
        }
        _ => None,
    }
}

/// `v += k` or `v = v + k` with `k` a positive integer literal.
fn counter_step(node: &IrNode, var: &str) -> Option<i64> {
    let IrNode::Stmt { text, .. } = node else {
        return None;
    };
    let step = match parse_statement(text).ok()? {
        Stmt::AugAssign {
            target,
            op: AugOp::Add,
            value,
        } if target == var => value.const_int(),
        Stmt::Assign { targets, value } if targets == [var] => match value {
            Expr::Bin {
                op: BinOp::Add,
                lhs,
                rhs,
            } if *lhs == Expr::Var(var.to_string()) => rhs.const_int(),
            _ => None,
        },
        _ => None,
    }?;
    (step > 0).then_some(step)
}

fn try_counting_loop(init: &IrNode, looped: &IrNode) -> Option<IrNode> {
    let (var, start) = counter_init(init)?;
    let IrNode::While { cond, body, loc } = looped else {
        return None;
    };
    let Expr::Bin {
        op: BinOp::Lt,
        lhs,
        rhs: end,
    } = parse_expression(cond).ok()?
    else {
        return None;
    };
    if *lhs != Expr::Var(var.clone()) {
        return None;
    }
    let (last, rest) = body.split_last()?;
    let step = counter_step(last, &var)?;

    let rest: Block = rest.to_vec();
    let mut assigned = HashSet::new();
    assigned_names(&rest, &mut assigned);
    let mut end_vars = HashSet::new();
    expr_vars(&end, &mut end_vars);
    if assigned.contains(&var) || end_vars.iter().any(|v| assigned.contains(v) || *v == var) {
        return None;
    }

    Some(IrNode::ForRange {
        var,
        start: start.to_string(),
        end: end.to_string(),
        step: (step != 1).then(|| step.to_string()),
        body: rewrite_counting_loops(&rest),
        loc: *loc,
    })
}

/// Fold `v = a; while v < b: …; v += k` back into `for v in range(a, b, k)`.
pub fn rewrite_counting_loops(block: &Block) -> Block {
    let mut out = Block::new();
    let mut i = 0;
    while i < block.len() {
        if let Some(next) = block.get(i + 1) {
            if let Some(for_node) = try_counting_loop(&block[i], next) {
                out.push(for_node);
                i += 2;
                continue;
            }
        }
        out.push(match &block[i] {
            IrNode::If {
                cond,
                then,
                else_,
                loc,
            } => IrNode::If {
                cond: cond.clone(),
                then: rewrite_counting_loops(then),
                else_: else_.as_ref().map(rewrite_counting_loops),
                loc: *loc,
            },
            IrNode::While { cond, body, loc } => IrNode::While {
                cond: cond.clone(),
                body: rewrite_counting_loops(body),
                loc: *loc,
            },
            IrNode::ForRange {
                var,
                start,
                end,
                step,
                body,
                loc,
            } => IrNode::ForRange {
                var: var.clone(),
                start: start.clone(),
                end: end.clone(),
                step: step.clone(),
                body: rewrite_counting_loops(body),
                loc: *loc,
            },
            IrNode::Def {
                name,
                params,
                body,
                loc,
            } => IrNode::Def {
                name: name.clone(),
                params: params.clone(),
                body: rewrite_counting_loops(body),
                loc: *loc,
            },
            stmt @ IrNode::Stmt { .. } => stmt.clone(),
        });
        i += 1;
    }
    out
}

/// Regenerate Python source from a flow graph.
pub fn flow_to_python(graph: &FlowGraph, fold_counting_loops: bool) -> Result<String, CodegenError> {
    let mut ir = flow_to_ir(graph)?;
    if fold_counting_loops {
        ir = rewrite_counting_loops(&ir);
    }
    Ok(ir_to_python(&ir))
}

#[cfg(test)]
#[path = "../../tests/rust/test_flow_codegen.rs"]
mod tests;
