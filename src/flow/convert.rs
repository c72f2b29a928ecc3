//! CFG → flowchart converter.
//!
//! Walks the block IR depth-first, threading a list of pending exits (edges
//! whose source is known but whose target is the next node to be emitted).
//! Two or more pending exits never attach to a node directly: a `connector`
//! node collects them first, so every successor of a branch merge has exactly
//! one incoming edge. A loop-back edge never leaves a decision either, so a
//! decision keeps both of its forward branches.

use std::collections::HashSet;

use tracing::debug;

use super::merge::merge;
use super::types::{
    EdgeStyle, END_TITLE, FALSE_LABEL, FlowEdge, FlowGraph, FlowNode, START_TITLE, Shape,
    TRUE_LABEL,
};
use crate::parsers::expr::parse_statement;
use crate::syntax::types::{Block, Expr, IrNode, Stmt, def_signature};

/// Namespace of the module-level flow inside a merged graph.
pub const MAIN_NAMESPACE: &str = "main";

/// Namespace of a function's flow inside a merged graph: the function name,
/// unless it would collide with the module namespace.
pub fn function_namespace(name: &str) -> String {
    if name == MAIN_NAMESPACE {
        format!("def_{name}")
    } else {
        name.to_string()
    }
}

#[derive(Debug, Clone)]
struct Pending {
    from: String,
    label: Option<String>,
}

impl Pending {
    fn from(id: &str) -> Self {
        Self {
            from: id.to_string(),
            label: None,
        }
    }

    fn labeled(id: &str, label: &str) -> Self {
        Self {
            from: id.to_string(),
            label: Some(label.to_string()),
        }
    }
}

struct FlowBuilder<'a> {
    functions: &'a HashSet<String>,
    graph: FlowGraph,
    next_node: usize,
    next_edge: usize,
}

impl<'a> FlowBuilder<'a> {
    fn new(functions: &'a HashSet<String>) -> Self {
        Self {
            functions,
            graph: FlowGraph::new(),
            next_node: 0,
            next_edge: 0,
        }
    }

    fn add_node(&mut self, shape: Shape, title: &str, line: Option<usize>) -> String {
        self.next_node += 1;
        let id = format!("n{}", self.next_node);
        let mut node = FlowNode::new(id.clone(), shape, title);
        node.line = line;
        self.graph.nodes.push(node);
        id
    }

    fn add_edge(&mut self, from: &str, to: &str, label: Option<String>, style: EdgeStyle) {
        self.next_edge += 1;
        let edge = FlowEdge::new(format!("e{}", self.next_edge), from, to)
            .with_label(label)
            .with_style(style);
        self.graph.edges.push(edge);
    }

    /// Connect pending exits to `target`, through a connector when ≥2 converge.
    fn attach(&mut self, pending: Vec<Pending>, target: &str, style: EdgeStyle) {
        if pending.len() >= 2 {
            let connector = self.add_node(Shape::Connector, "", None);
            for p in pending {
                self.add_edge(&p.from, &connector, p.label, EdgeStyle::Forward);
            }
            self.add_edge(&connector, target, None, style);
        } else {
            for p in pending {
                self.add_edge(&p.from, target, p.label, style);
            }
        }
    }

    /// Close a loop body onto its header. A lone decision exit goes through a
    /// connector first; a body with no exits gets no back-edge.
    fn close_loop(&mut self, exits: Vec<Pending>, header: &str) {
        if matches!(exits.as_slice(), [only] if only.label.is_some()) {
            let connector = self.add_node(Shape::Connector, "", None);
            self.attach(exits, &connector, EdgeStyle::Forward);
            self.add_edge(&connector, header, None, EdgeStyle::LoopBack);
        } else {
            self.attach(exits, header, EdgeStyle::LoopBack);
        }
    }

    fn emit(&mut self, pending: Vec<Pending>, shape: Shape, title: &str, line: usize) -> String {
        let id = self.add_node(shape, title, Some(line));
        self.attach(pending, &id, EdgeStyle::Forward);
        id
    }

    fn convert_block(&mut self, block: &Block, mut pending: Vec<Pending>) -> Vec<Pending> {
        for node in block {
            if pending.is_empty() {
                debug!(line = node.loc().line, "dropping unreachable statement");
                break;
            }
            pending = self.convert_node(node, pending);
        }
        pending
    }

    fn statement_shape(&self, stmt: &Stmt) -> (Shape, Option<String>) {
        let call_name = match stmt {
            Stmt::Print(_) => return (Shape::Io, None),
            Stmt::Assign {
                value: Expr::Call { name, .. },
                ..
            }
            | Stmt::ExprStmt(Expr::Call { name, .. }) => Some(name),
            _ => None,
        };
        match call_name {
            Some(name) if self.functions.contains(name) => (Shape::Subroutine, Some(name.clone())),
            _ => (Shape::Process, None),
        }
    }

    /// Loop body that jumps back to `header`; an empty body gets a `pass` node.
    fn convert_loop_body(&mut self, header: &str, body: &Block, line: usize) -> Vec<Pending> {
        let entry = vec![Pending::labeled(header, TRUE_LABEL)];
        if body.is_empty() {
            let id = self.emit(entry, Shape::Process, "pass", line);
            return vec![Pending::from(&id)];
        }
        self.convert_block(body, entry)
    }

    fn convert_node(&mut self, node: &IrNode, pending: Vec<Pending>) -> Vec<Pending> {
        match node {
            IrNode::Stmt { text, loc } => {
                let title = text.trim();
                let stmt = parse_statement(title);
                match stmt {
                    Ok(Stmt::Pass) => pending,
                    Ok(Stmt::Return(_)) => {
                        self.emit(pending, Shape::StartEnd, title, loc.line);
                        Vec::new()
                    }
                    Ok(stmt) => {
                        let (shape, callee) = self.statement_shape(&stmt);
                        let id = self.emit(pending, shape, title, loc.line);
                        if let Some(node) = self.graph.nodes.iter_mut().find(|n| n.id == id) {
                            node.callee = callee;
                        }
                        vec![Pending::from(&id)]
                    }
                    Err(_) => {
                        let id = self.emit(pending, Shape::Process, title, loc.line);
                        vec![Pending::from(&id)]
                    }
                }
            }
            IrNode::If {
                cond,
                then,
                else_,
                loc,
            } => {
                let decision = self.emit(pending, Shape::Decision, cond.trim(), loc.line);
                let mut exits =
                    self.convert_block(then, vec![Pending::labeled(&decision, TRUE_LABEL)]);
                let false_entry = vec![Pending::labeled(&decision, FALSE_LABEL)];
                match else_ {
                    Some(else_block) => exits.extend(self.convert_block(else_block, false_entry)),
                    None => exits.extend(false_entry),
                }
                exits
            }
            IrNode::While { cond, body, loc } => {
                let header = self.emit(pending, Shape::Decision, cond.trim(), loc.line);
                let exits = self.convert_loop_body(&header, body, loc.line);
                self.close_loop(exits, &header);
                vec![Pending::labeled(&header, FALSE_LABEL)]
            }
            IrNode::ForRange {
                var,
                start,
                end,
                step,
                body,
                loc,
            } => {
                let init_title = format!("{} = {}", var, start.trim());
                let init = self.emit(pending, Shape::Process, &init_title, loc.line);
                let cond = format!("{} < {}", var, end.trim());
                let header =
                    self.emit(vec![Pending::from(&init)], Shape::Decision, &cond, loc.line);
                let exits = self.convert_loop_body(&header, body, loc.line);
                if exits.is_empty() {
                    debug!(line = loc.line, "loop body never falls through, no step node");
                } else {
                    let step_title = format!(
                        "{} += {}",
                        var,
                        step.as_deref().map(str::trim).unwrap_or("1")
                    );
                    let step_node = self.emit(exits, Shape::Process, &step_title, loc.line);
                    self.close_loop(vec![Pending::from(&step_node)], &header);
                }
                vec![Pending::labeled(&header, FALSE_LABEL)]
            }
            IrNode::Def { name, loc, .. } => {
                debug!(line = loc.line, name = %name, "nested def ignored by converter");
                pending
            }
        }
    }
}

/// Build the flow of one body, framed by an entry node and (on fallthrough)
/// an end node.
fn convert_body(
    functions: &HashSet<String>,
    entry_title: &str,
    entry_line: Option<usize>,
    body: &[&IrNode],
) -> FlowGraph {
    let mut builder = FlowBuilder::new(functions);
    let entry = builder.add_node(Shape::StartEnd, entry_title, entry_line);
    let block: Block = body.iter().map(|n| (*n).clone()).collect();
    let exits = builder.convert_block(&block, vec![Pending::from(&entry)]);
    if !exits.is_empty() {
        let end = builder.add_node(Shape::StartEnd, END_TITLE, None);
        builder.attach(exits, &end, EdgeStyle::Forward);
    }
    builder.graph
}

/// Convert a single function definition into its own (un-namespaced) flow.
pub fn convert_function(
    functions: &HashSet<String>,
    name: &str,
    params: &[String],
    body: &Block,
    line: usize,
) -> FlowGraph {
    let refs: Vec<&IrNode> = body.iter().collect();
    convert_body(functions, &def_signature(name, params), Some(line), &refs)
}

/// Convert a whole program: the module flow plus one flow per `def`, merged
/// into a single namespaced graph.
pub fn convert_program(ir: &Block) -> FlowGraph {
    let functions: HashSet<String> = ir
        .iter()
        .filter_map(|n| match n {
            IrNode::Def { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();

    let main_items: Vec<&IrNode> = ir
        .iter()
        .filter(|n| !matches!(n, IrNode::Def { .. }))
        .collect();
    let mut parts = vec![(
        MAIN_NAMESPACE.to_string(),
        convert_body(&functions, START_TITLE, None, &main_items),
    )];

    for node in ir {
        if let IrNode::Def {
            name,
            params,
            body,
            loc,
        } = node
        {
            parts.push((
                function_namespace(name),
                convert_function(&functions, name, params, body, loc.line),
            ));
        }
    }
    merge(parts)
}

#[cfg(test)]
#[path = "../../tests/rust/test_flow_convert.rs"]
mod tests;
