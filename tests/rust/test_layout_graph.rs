use super::*;
use crate::flow::types::{FlowEdge, FlowNode};
use pretty_assertions::assert_eq;

fn graph(nodes: &[(&str, Shape)], edges: &[(&str, &str)]) -> FlowGraph {
    FlowGraph {
        nodes: nodes
            .iter()
            .map(|(id, shape)| FlowNode::new(*id, *shape, *id))
            .collect(),
        edges: edges
            .iter()
            .enumerate()
            .map(|(i, (from, to))| FlowEdge::new(format!("e{}", i + 1), *from, *to))
            .collect(),
    }
}

fn sorted(set: HashSet<usize>) -> Vec<usize> {
    let mut v: Vec<usize> = set.into_iter().collect();
    v.sort();
    v
}

// ── Construction ─────────────────────────────────────────────────────────

#[test]
fn test_empty_graph() {
    let ir = FlowGraphIR::from_flow(&FlowGraph::default());
    assert_eq!(ir.node_count(), 0);
    assert_eq!(ir.edge_count(), 0);
    assert!(ir.is_dag());
}

#[test]
fn test_nodes_and_edges_counted() {
    let g = graph(
        &[("s", Shape::StartEnd), ("a", Shape::Process), ("e", Shape::StartEnd)],
        &[("s", "a"), ("a", "e")],
    );
    let ir = FlowGraphIR::from_flow(&g);
    assert_eq!(ir.node_count(), 3);
    assert_eq!(ir.edge_count(), 2);
}

#[test]
fn test_dangling_edge_skipped() {
    let g = graph(&[("a", Shape::Process)], &[("a", "ghost"), ("ghost", "a")]);
    let ir = FlowGraphIR::from_flow(&g);
    assert_eq!(ir.node_count(), 1);
    assert_eq!(ir.edge_count(), 0);
}

#[test]
fn test_duplicate_node_id_kept_once() {
    let g = graph(&[("a", Shape::Process), ("a", Shape::Io)], &[]);
    let ir = FlowGraphIR::from_flow(&g);
    assert_eq!(ir.node_count(), 1);
    let idx = ir.node_index["a"];
    assert_eq!(ir.digraph[idx].shape, Shape::Process);
    assert_eq!(ir.digraph[idx].index, 0);
}

#[test]
fn test_weights_point_back_into_flow_graph() {
    let g = graph(&[("a", Shape::Process), ("b", Shape::Process)], &[("a", "b")]);
    let ir = FlowGraphIR::from_flow(&g);
    let edge = ir.digraph.edge_weights().next().unwrap();
    assert_eq!(edge.id, "e1");
    assert_eq!(edge.index, 0);
}

// ── Degrees and order ────────────────────────────────────────────────────

#[test]
fn test_degrees() {
    let g = graph(
        &[("a", Shape::Decision), ("b", Shape::Process), ("c", Shape::Process)],
        &[("a", "b"), ("a", "c"), ("b", "c")],
    );
    let ir = FlowGraphIR::from_flow(&g);
    assert_eq!(ir.out_degree("a"), 2);
    assert_eq!(ir.in_degree("a"), 0);
    assert_eq!(ir.in_degree("c"), 2);
    assert_eq!(ir.in_degree("missing"), 0);
    assert_eq!(ir.out_degree("missing"), 0);
}

#[test]
fn test_topological_order_of_dag() {
    let g = graph(
        &[("c", Shape::Process), ("b", Shape::Process), ("a", Shape::Process)],
        &[("a", "b"), ("b", "c")],
    );
    let ir = FlowGraphIR::from_flow(&g);
    assert!(ir.is_dag());
    assert_eq!(
        ir.topological_order().unwrap(),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
}

#[test]
fn test_cycle_has_no_topological_order() {
    let g = graph(&[("a", Shape::Process), ("b", Shape::Process)], &[("a", "b"), ("b", "a")]);
    let ir = FlowGraphIR::from_flow(&g);
    assert!(!ir.is_dag());
    assert!(ir.topological_order().is_none());
}

// ── Distances ────────────────────────────────────────────────────────────

#[test]
fn test_bfs_distances() {
    let g = graph(
        &[
            ("s", Shape::StartEnd),
            ("d", Shape::Decision),
            ("x", Shape::Process),
            ("y", Shape::Process),
            ("far", Shape::Process),
        ],
        &[("s", "d"), ("d", "x"), ("d", "y"), ("x", "y")],
    );
    let ir = FlowGraphIR::from_flow(&g);
    let dist = ir.bfs_distances("s");
    assert_eq!(dist["s"], 0);
    assert_eq!(dist["d"], 1);
    assert_eq!(dist["x"], 2);
    assert_eq!(dist["y"], 2);
    assert!(!dist.contains_key("far"));
}

#[test]
fn test_bfs_from_unknown_entry_is_empty() {
    let ir = FlowGraphIR::from_flow(&graph(&[("a", Shape::Process)], &[]));
    assert!(ir.bfs_distances("nope").is_empty());
}

// ── Back-edges ───────────────────────────────────────────────────────────

#[test]
fn test_simple_loop_back_edge() {
    // s → h → b → h, h → e
    let g = graph(
        &[
            ("s", Shape::StartEnd),
            ("h", Shape::Decision),
            ("b", Shape::Process),
            ("e", Shape::StartEnd),
        ],
        &[("s", "h"), ("h", "b"), ("b", "h"), ("h", "e")],
    );
    let ir = FlowGraphIR::from_flow(&g);
    assert_eq!(sorted(ir.back_edges("s")), vec![2]);
}

#[test]
fn test_merge_edge_with_equal_distance_stays_forward() {
    // d branches to x and y, x also feeds y: both at distance 2, no cycle.
    let g = graph(
        &[
            ("s", Shape::StartEnd),
            ("d", Shape::Decision),
            ("x", Shape::Process),
            ("y", Shape::Process),
        ],
        &[("s", "d"), ("d", "x"), ("d", "y"), ("x", "y")],
    );
    let ir = FlowGraphIR::from_flow(&g);
    assert!(ir.back_edges("s").is_empty());
}

#[test]
fn test_nested_loops_have_two_back_edges() {
    // s → o → i → b → i, i → t → o, o → e
    let g = graph(
        &[
            ("s", Shape::StartEnd),
            ("o", Shape::Decision),
            ("i", Shape::Decision),
            ("b", Shape::Process),
            ("t", Shape::Process),
            ("e", Shape::StartEnd),
        ],
        &[
            ("s", "o"),
            ("o", "i"),
            ("i", "b"),
            ("b", "i"),
            ("i", "t"),
            ("t", "o"),
            ("o", "e"),
        ],
    );
    let ir = FlowGraphIR::from_flow(&g);
    assert_eq!(sorted(ir.back_edges("s")), vec![3, 5]);
}

#[test]
fn test_self_loop_is_back_edge() {
    let g = graph(&[("s", Shape::StartEnd), ("a", Shape::Process)], &[("s", "a"), ("a", "a")]);
    let ir = FlowGraphIR::from_flow(&g);
    assert_eq!(sorted(ir.back_edges("s")), vec![1]);
}

#[test]
fn test_unreachable_cycle_not_reported() {
    let g = graph(
        &[("s", Shape::StartEnd), ("a", Shape::Process), ("b", Shape::Process)],
        &[("a", "b"), ("b", "a")],
    );
    let ir = FlowGraphIR::from_flow(&g);
    assert!(ir.back_edges("s").is_empty());
    assert!(ir.back_edges("missing").is_empty());
}

#[test]
fn test_back_edges_of_converted_loop() {
    let code = "i = 0\nwhile i < 3:\n    i += 1\n";
    let g = crate::code_to_flow(code).unwrap();
    let ir = FlowGraphIR::from_flow(&g);
    let back = ir.back_edges("main.n1");
    assert_eq!(back.len(), 1);
    let idx = *back.iter().next().unwrap();
    assert_eq!(g.edges[idx].style, crate::flow::types::EdgeStyle::LoopBack);
}
