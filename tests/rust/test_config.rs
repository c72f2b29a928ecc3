use super::*;
use crate::flow::types::{FlowEdge, FlowNode, Shape};
use pretty_assertions::assert_eq;

fn p(x: i64, y: i64) -> Point {
    Point::new(x, y)
}

fn placed(id: &str, x: i64, y: i64) -> FlowNode {
    let mut n = FlowNode::new(id, Shape::Process, id);
    n.x = x;
    n.y = y;
    n
}

fn routed(id: &str, from: &str, to: &str, anchors: Vec<Point>) -> FlowEdge {
    let mut e = FlowEdge::new(id, from, to);
    e.anchors = Some(anchors);
    e
}

// ── Rule sets ────────────────────────────────────────────────────────────

#[test]
fn test_defaults() {
    let rules = RuleSet::default();
    assert!(rules.tidy.merge_fan_in);
    assert!(rules.tidy.rewrite_counting_loops);
    assert_eq!(rules.beautify.max_nodes, 120);
    assert_eq!(rules.beautify.max_edge_crossings, 4);
}

#[test]
fn test_partial_json_keeps_defaults() {
    let rules =
        RuleSet::from_json(r#"{"tidy": {"mergeFanIn": false}, "beautify": {"maxNodes": 10}}"#)
            .unwrap();
    assert!(!rules.tidy.merge_fan_in);
    assert!(rules.tidy.snap_to_grid);
    assert_eq!(rules.beautify.max_nodes, 10);
    assert_eq!(rules.beautify.max_flow_angle, 75.0);
    assert_eq!(RuleSet::from_json("{}").unwrap(), RuleSet::default());
}

#[test]
fn test_invalid_json_is_an_error() {
    let err = RuleSet::from_json("{not json").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
    assert!(err.to_string().starts_with("invalid rule set"));
}

#[test]
fn test_cleanup_options_follow_tidy_flags() {
    let tidy = TidyRules {
        snap_to_grid: false,
        ..TidyRules::default()
    };
    assert_eq!(
        tidy.cleanup_options(),
        CleanupOptions {
            snap_to_grid: false,
            fix_tiny_segments: true,
        }
    );
}

// ── Crossings ────────────────────────────────────────────────────────────

#[test]
fn test_segments_cross() {
    let h = (p(0, 5), p(10, 5));
    assert!(segments_cross(h, (p(5, 0), p(5, 10))));
    assert!(segments_cross((p(5, 10), p(5, 0)), h));
    // Touching at an endpoint is not a crossing.
    assert!(!segments_cross(h, (p(5, 5), p(5, 10))));
    assert!(!segments_cross(h, (p(0, 8), p(10, 8))));
}

#[test]
fn test_count_route_crossings_between_edges_only() {
    let graph = FlowGraph {
        nodes: vec![],
        edges: vec![
            routed("e1", "a", "b", vec![p(0, 50), p(100, 50)]),
            routed("e2", "c", "d", vec![p(50, 0), p(50, 100)]),
            // Self-crossing polyline.
            routed("e3", "a", "d", vec![p(200, 0), p(200, 100), p(150, 100), p(150, 50), p(250, 50)]),
        ],
    };
    assert_eq!(count_route_crossings(&graph), 1);
}

// ── Flow angle ───────────────────────────────────────────────────────────

#[test]
fn test_vertical_flow_has_zero_angle() {
    let graph = FlowGraph {
        nodes: vec![placed("a", 0, 0), placed("b", 0, 100)],
        edges: vec![FlowEdge::new("e1", "a", "b")],
    };
    assert_eq!(max_flow_angle(&graph), 0.0);
}

#[test]
fn test_diagonal_flow_angle() {
    let graph = FlowGraph {
        nodes: vec![placed("a", 0, 0), placed("b", 200, 100)],
        edges: vec![FlowEdge::new("e1", "a", "b")],
    };
    let angle = max_flow_angle(&graph);
    assert!((angle - 63.43).abs() < 0.01, "{angle}");
}

#[test]
fn test_loop_back_edges_ignored_for_angle() {
    let graph = FlowGraph {
        nodes: vec![placed("a", 0, 0), placed("b", 0, 100)],
        edges: vec![
            FlowEdge::new("e1", "a", "b"),
            FlowEdge::new("e2", "b", "a").with_style(EdgeStyle::LoopBack),
        ],
    };
    assert_eq!(max_flow_angle(&graph), 0.0);
}

// ── Report ───────────────────────────────────────────────────────────────

#[test]
fn test_report_within_thresholds() {
    let graph = FlowGraph {
        nodes: vec![placed("a", 0, 0), placed("b", 0, 100)],
        edges: vec![routed("e1", "a", "b", vec![p(70, 50), p(70, 100)])],
    };
    let report = beautify_report(&graph, &BeautifyThresholds::default());
    assert!(report.is_within_thresholds());
    assert_eq!(report.node_count, 2);
    assert_eq!(report.edge_crossings, 0);
}

#[test]
fn test_report_lists_violations() {
    let graph = FlowGraph {
        nodes: vec![placed("a", 0, 0), placed("b", 200, 100)],
        edges: vec![
            routed("e1", "a", "b", vec![p(0, 50), p(100, 50)]),
            routed("e2", "b", "a", vec![p(50, 0), p(50, 100)]).with_style(EdgeStyle::LoopBack),
        ],
    };
    let thresholds = BeautifyThresholds {
        max_nodes: 1,
        max_edge_crossings: 0,
        max_flow_angle: 60.0,
    };
    let report = beautify_report(&graph, &thresholds);
    assert_eq!(
        report.violations,
        vec![
            "节点数 2 超过上限 1".to_string(),
            "连线交叉 1 处，超过上限 0".to_string(),
            "流向角度 63° 超过上限 60°".to_string(),
        ]
    );
    assert!(!report.is_within_thresholds());
}

#[test]
fn test_report_serializes_camel_case() {
    let report = beautify_report(&FlowGraph::default(), &BeautifyThresholds::default());
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["nodeCount"], 0);
    assert_eq!(json["edgeCrossings"], 0);
    assert!(json["violations"].as_array().unwrap().is_empty());
}
