use super::*;
use crate::flow::types::{FlowEdge, Shape};
use crate::validate::validate_python_strict;
use pretty_assertions::assert_eq;

fn flow(code: &str) -> FlowGraph {
    convert_program(&validate_python_strict(code).unwrap().ir)
}

fn by_title<'a>(g: &'a FlowGraph, title: &str) -> &'a FlowNode {
    g.nodes
        .iter()
        .find(|n| n.title == title)
        .unwrap_or_else(|| panic!("no node titled {title}"))
}

fn edge<'a>(g: &'a FlowGraph, from: &str, to: &str) -> Option<&'a FlowEdge> {
    g.edges.iter().find(|e| e.from == from && e.to == to)
}

const GRADE: &str = "s = 85\nif s >= 90:\n    g = 'A'\nelif s >= 60:\n    g = 'B'\nelse:\n    g = 'C'\nprint(g)\n";

// ── Straight line ────────────────────────────────────────────────────────

#[test]
fn test_straight_line_program() {
    let g = flow("a = 1\nprint(a)\n");
    let titles: Vec<&str> = g.nodes.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["开始", "a = 1", "print(a)", "结束"]);
    let ids: Vec<&str> = g.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["main.n1", "main.n2", "main.n3", "main.n4"]);
    assert_eq!(g.nodes[2].shape, Shape::Io);
    assert_eq!(g.edges.len(), 3);
    assert_eq!(g.nodes[1].line, Some(1));
}

#[test]
fn test_empty_program_is_start_to_end() {
    let g = flow("");
    assert_eq!(g.nodes.len(), 2);
    assert_eq!(g.edges.len(), 1);
}

// ── Branches ─────────────────────────────────────────────────────────────

#[test]
fn test_elif_chain_uses_single_connector() {
    let g = flow(GRADE);
    let connectors: Vec<&FlowNode> = g.nodes_with_shape(Shape::Connector).collect();
    assert_eq!(connectors.len(), 1);
    let print = by_title(&g, "print(g)");
    let incoming: Vec<&FlowEdge> = g.incoming(&print.id).collect();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].from, connectors[0].id);
    assert_eq!(g.incoming(&connectors[0].id).count(), 3);
}

#[test]
fn test_decisions_have_labeled_branches() {
    let g = flow(GRADE);
    for d in g.nodes_with_shape(Shape::Decision) {
        let mut labels: Vec<&str> = g
            .outgoing(&d.id)
            .filter_map(|e| e.label.as_deref())
            .collect();
        labels.sort();
        assert_eq!(labels, vec!["否", "是"], "decision {}", d.title);
    }
}

#[test]
fn test_if_without_else_merges_false_branch() {
    let g = flow("x = 1\nif x > 0:\n    x = 2\nprint(x)\n");
    let decision = by_title(&g, "x > 0");
    let connector = g.nodes_with_shape(Shape::Connector).next().unwrap();
    let false_edge = edge(&g, &decision.id, &connector.id).unwrap();
    assert_eq!(false_edge.label.as_deref(), Some("否"));
}

// ── Loops ────────────────────────────────────────────────────────────────

#[test]
fn test_for_range_loop_shape() {
    let g = flow("n = 10\na = 0\nfor i in range(n):\n  print(a)\n  a = a + 1\n");
    let init = by_title(&g, "i = 0");
    let header = by_title(&g, "i < n");
    let print = by_title(&g, "print(a)");
    let step = by_title(&g, "i += 1");
    assert_eq!(header.shape, Shape::Decision);
    assert!(edge(&g, &init.id, &header.id).is_some());
    let body_edge = edge(&g, &header.id, &print.id).unwrap();
    assert_eq!(body_edge.label.as_deref(), Some("是"));
    let back = edge(&g, &step.id, &header.id).unwrap();
    assert_eq!(back.style, EdgeStyle::LoopBack);
    let exit = g
        .outgoing(&header.id)
        .find(|e| e.label.as_deref() == Some("否"))
        .unwrap();
    assert_eq!(g.node(&exit.to).map(|n| n.title.as_str()), Some("结束"));
}

#[test]
fn test_for_range_with_step() {
    let g = flow("for i in range(0, 10, 3):\n    print(i)\n");
    assert!(g.nodes.iter().any(|n| n.title == "i += 3"));
}

#[test]
fn test_while_body_if_merges_before_back_edge() {
    let g = flow("x = 5\nwhile x > 0:\n    if x > 2:\n        x -= 2\n    else:\n        x -= 1\n");
    let header = by_title(&g, "x > 0");
    let back: Vec<&FlowEdge> = g
        .edges
        .iter()
        .filter(|e| e.style == EdgeStyle::LoopBack)
        .collect();
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].to, header.id);
    assert_eq!(g.node(&back[0].from).map(|n| n.shape), Some(Shape::Connector));
}

#[test]
fn test_empty_while_body_gets_pass_node() {
    let g = flow("x = 1\nwhile x > 5:\n    pass\n");
    let pass = by_title(&g, "pass");
    let header = by_title(&g, "x > 5");
    assert_eq!(edge(&g, &pass.id, &header.id).map(|e| e.style), Some(EdgeStyle::LoopBack));
}

fn loop_backs_into<'a>(g: &'a FlowGraph, header: &str) -> Vec<&'a FlowEdge> {
    g.edges
        .iter()
        .filter(|e| e.style == EdgeStyle::LoopBack && e.to == header)
        .collect()
}

#[test]
fn test_nested_while_closes_outer_loop_through_connector() {
    let g = flow("a = 0\nb = 0\nwhile a < 3:\n    a += 1\n    while b < 3:\n        b += 1\nprint(a)\n");
    let outer = by_title(&g, "a < 3");
    let inner = by_title(&g, "b < 3");
    let back = loop_backs_into(&g, &outer.id);
    assert_eq!(back.len(), 1);
    let connector = g.node(&back[0].from).unwrap();
    assert_eq!(connector.shape, Shape::Connector);
    let inner_exit = edge(&g, &inner.id, &connector.id).unwrap();
    assert_eq!(inner_exit.label.as_deref(), Some("否"));
    assert_eq!(inner_exit.style, EdgeStyle::Forward);
    // Both loop headers keep a true and a false forward branch.
    for header in [outer, inner] {
        let forward = g
            .outgoing(&header.id)
            .filter(|e| e.style == EdgeStyle::Forward)
            .count();
        assert_eq!(forward, 2, "header {}", header.title);
    }
}

#[test]
fn test_returning_if_closes_loop_through_connector() {
    let g = flow(
        "def f(n):\n    i = 0\n    while i < n:\n        i += 1\n        if i == 3:\n            return i\n    return 0\n\nx = f(5)\n",
    );
    let header = by_title(&g, "i < n");
    let decision = by_title(&g, "i == 3");
    let back = loop_backs_into(&g, &header.id);
    assert_eq!(back.len(), 1);
    assert_eq!(g.node(&back[0].from).map(|n| n.shape), Some(Shape::Connector));
    assert_eq!(g.outgoing(&decision.id).count(), 2);
    assert!(g.outgoing(&decision.id).all(|e| e.style == EdgeStyle::Forward));
}

#[test]
fn test_for_body_that_always_returns_has_no_step() {
    let g = flow("def f(n):\n    for i in range(n):\n        return i\n    return 0\n\nx = f(3)\n");
    assert!(!g.nodes.iter().any(|n| n.title == "i += 1"));
    assert!(g.edges.iter().all(|e| e.style == EdgeStyle::Forward));
    let header = by_title(&g, "i < n");
    let exit = g
        .outgoing(&header.id)
        .find(|e| e.label.as_deref() == Some("否"))
        .unwrap();
    assert_eq!(g.node(&exit.to).map(|n| n.title.as_str()), Some("return 0"));
}

#[test]
fn test_every_non_entry_node_has_an_incoming_edge() {
    let programs = [
        GRADE,
        "x = 5\nwhile x > 0:\n    x -= 1\nprint(x)\n",
        "a = 0\nb = 0\nwhile a < 3:\n    a += 1\n    while b < 3:\n        b += 1\nprint(a)\n",
        "def f(n):\n    for i in range(n):\n        return i\n    return 0\n\nx = f(3)\n",
        "def g(n):\n    while n > 0:\n        if n == 2:\n            return n\n        else:\n            return 0\n    return 1\n\ny = g(2)\n",
        "def h(n):\n    for k in range(n):\n        for j in range(k):\n            if j == 2:\n                return j\n    return 0\n\nz = h(4)\n",
    ];
    for code in programs {
        let g = flow(code);
        let orphans: Vec<&str> = g
            .nodes
            .iter()
            .filter(|n| !n.is_entry() && g.incoming(&n.id).next().is_none())
            .map(|n| n.id.as_str())
            .collect();
        assert!(orphans.is_empty(), "orphans {orphans:?} in:\n{code}");
    }
}

// ── Functions ────────────────────────────────────────────────────────────

#[test]
fn test_functions_get_own_namespace() {
    let g = flow("def add(a, b):\n    return a + b\n\ns = add(1, 2)\nprint(s)\n");
    let entry = by_title(&g, "def add(a, b)");
    assert_eq!(entry.id, "add.n1");
    assert_eq!(entry.line, Some(1));
    let ret = by_title(&g, "return a + b");
    assert_eq!(ret.shape, Shape::StartEnd);
    assert!(edge(&g, "add.n1", &ret.id).is_some());

    let call = by_title(&g, "s = add(1, 2)");
    assert_eq!(call.shape, Shape::Subroutine);
    assert_eq!(call.callee.as_deref(), Some("add"));
    assert!(call.id.starts_with("main."));
}

#[test]
fn test_function_named_main_is_renamed() {
    let g = flow("def main():\n    print(1)\n\nmain()\n");
    assert!(g.nodes.iter().any(|n| n.id == "def_main.n1"));
    assert_eq!(function_namespace("other"), "other");
}

#[test]
fn test_statements_after_return_are_dropped() {
    let g = flow("def f():\n    return 1\n    print(2)\n\nx = f()\n");
    assert!(!g.nodes.iter().any(|n| n.title == "print(2)"));
    assert!(!g.nodes.iter().any(|n| n.id.starts_with("f.") && n.title == "结束"));
}

#[test]
fn test_branch_returns_leave_single_exit() {
    let g = flow("def sign(x):\n    if x < 0:\n        return -1\n    return 1\n\ny = sign(3)\n");
    assert_eq!(g.nodes.iter().filter(|n| n.id.starts_with("sign.")).count(), 4);
    assert!(g.nodes_with_shape(Shape::Connector).next().is_none());
}
