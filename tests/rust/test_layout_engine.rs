use super::*;
use crate::flow::types::FlowNode;
use crate::layout::geometry::is_orthogonal;
use pretty_assertions::assert_eq;

const GRADE: &str = "s = 85\nif s >= 90:\n    g = 'A'\nelif s >= 60:\n    g = 'B'\nelse:\n    g = 'C'\nprint(g)\n";
const COUNT: &str = "n = 3\nfor i in range(n):\n    print(i)\n";
const FUNCS: &str = "def add(a, b):\n    return a + b\ns = add(1, 2)\nprint(s)\n";

fn flow(code: &str) -> FlowGraph {
    crate::code_to_flow(code).unwrap()
}

fn engine() -> LayoutEngine {
    LayoutEngine::new(Arc::new(LayoutCache::default()))
}

fn rect_of(n: &FlowNode) -> Rect {
    let (w, h) = node_size_for_title(n.shape, &n.title);
    Rect::new(n.x, n.y, w, h)
}

fn by_title<'a>(g: &'a FlowGraph, title: &str) -> &'a FlowNode {
    g.nodes
        .iter()
        .find(|n| n.title == title)
        .unwrap_or_else(|| panic!("no node titled {title}"))
}

fn assert_no_overlap(g: &FlowGraph) {
    for (i, a) in g.nodes.iter().enumerate() {
        for b in &g.nodes[i + 1..] {
            assert!(
                !rect_of(a).overlaps(&rect_of(b)),
                "{} overlaps {}",
                a.id,
                b.id
            );
        }
    }
}

// ── Ordering helpers ─────────────────────────────────────────────────────

#[test]
fn test_id_order_is_natural() {
    assert!(id_order("main.n2") < id_order("main.n10"));
    assert!(id_order("e9") < id_order("e10"));
    assert_eq!(id_order("abc"), ("abc", 0, "abc"));
}

// ── Ports ────────────────────────────────────────────────────────────────

#[test]
fn test_source_port_rules() {
    assert_eq!(source_port(Shape::Decision, "x > 0", Some("是"), false), Port::Bottom);
    assert_eq!(source_port(Shape::Decision, "x > 0", Some("否"), false), Port::Right);
    assert_eq!(source_port(Shape::StartEnd, "开始", None, false), Port::Bottom);
    assert_eq!(source_port(Shape::Process, "i += 1", None, true), Port::Left);
    // Io has no side ports.
    assert_eq!(source_port(Shape::Io, "print(i)", None, true), Port::Bottom);
}

#[test]
fn test_target_port_rules() {
    assert_eq!(target_port(Shape::StartEnd, "结束", false), Port::Top);
    assert_eq!(target_port(Shape::Decision, "i < n", true), Port::Left);
    assert_eq!(target_port(Shape::Process, "x = 1", false), Port::Top);
    assert_eq!(target_port(Shape::Io, "print(x)", true), Port::Top);
}

#[test]
fn test_loop_ports_in_layout() {
    let g = flow(COUNT);
    let out = engine().layout(&g, Viewport::default()).graph;
    let header = by_title(&out, "i < n");
    let back = out
        .edges
        .iter()
        .find(|e| e.style == EdgeStyle::LoopBack)
        .unwrap();
    assert_eq!(back.to, header.id);
    assert_eq!((back.from_port, back.to_port), (Port::Left, Port::Left));

    let yes = out
        .outgoing(&header.id)
        .find(|e| e.label.as_deref() == Some("是"))
        .unwrap();
    let no = out
        .outgoing(&header.id)
        .find(|e| e.label.as_deref() == Some("否"))
        .unwrap();
    assert_eq!(yes.from_port, Port::Bottom);
    assert_eq!(no.from_port, Port::Right);
    assert_eq!(no.to_port, Port::Top);
}

// ── Placement ────────────────────────────────────────────────────────────

#[test]
fn test_empty_graph() {
    let result = engine().layout(&FlowGraph::default(), Viewport::default());
    assert_eq!(result.graph, FlowGraph::default());
    assert!(result.degraded_edges.is_empty());
}

#[test]
fn test_straight_line_is_stacked() {
    let result = engine().layout(&flow("a = 1\nprint(a)\n"), Viewport::default());
    assert!(result.degraded_edges.is_empty());
    let g = &result.graph;
    for pair in g.nodes.windows(2) {
        assert!(rect_of(&pair[0]).bottom() < pair[1].y);
    }
    assert_eq!(g.nodes.iter().map(|n| n.y).min(), Some(MARGIN));
}

#[test]
fn test_no_overlap() {
    for code in [GRADE, COUNT, FUNCS] {
        let g = engine().layout(&flow(code), Viewport::default()).graph;
        assert_no_overlap(&g);
    }
}

#[test]
fn test_positions_on_grid() {
    let g = engine().layout(&flow(GRADE), Viewport::default()).graph;
    for n in &g.nodes {
        assert_eq!(n.x % GRID, 0, "{}", n.id);
        assert_eq!(n.y % GRID, 0, "{}", n.id);
    }
}

#[test]
fn test_merge_connector_above_follow_up() {
    let g = engine().layout(&flow(GRADE), Viewport::default()).graph;
    let connector = g.nodes_with_shape(Shape::Connector).next().unwrap();
    let print = by_title(&g, "print(g)");
    assert!(connector.y < print.y);
}

#[test]
fn test_main_packed_before_functions() {
    let g = engine().layout(&flow(FUNCS), Viewport::default()).graph;
    let main_right = g
        .nodes
        .iter()
        .filter(|n| n.id.starts_with("main."))
        .map(|n| rect_of(n).right())
        .max()
        .unwrap();
    let func_left = g
        .nodes
        .iter()
        .filter(|n| n.id.starts_with("add."))
        .map(|n| n.x)
        .min()
        .unwrap();
    assert!(main_right < func_left);
    assert_eq!(
        g.nodes
            .iter()
            .filter(|n| n.id.starts_with("main."))
            .map(|n| n.x)
            .min(),
        Some(MARGIN)
    );
}

#[test]
fn test_narrow_viewport_wraps_components() {
    let viewport = Viewport {
        width: 200,
        height: 800,
    };
    let g = engine().layout(&flow(FUNCS), viewport).graph;
    let main_bottom = g
        .nodes
        .iter()
        .filter(|n| n.id.starts_with("main."))
        .map(|n| rect_of(n).bottom())
        .max()
        .unwrap();
    let func_top = g
        .nodes
        .iter()
        .filter(|n| n.id.starts_with("add."))
        .map(|n| n.y)
        .min()
        .unwrap();
    assert!(main_bottom < func_top);
    assert_no_overlap(&g);
}

// ── Routes ───────────────────────────────────────────────────────────────

#[test]
fn test_every_edge_anchored_at_its_ports() {
    for code in [GRADE, COUNT, FUNCS] {
        let g = engine().layout(&flow(code), Viewport::default()).graph;
        for e in &g.edges {
            let anchors = e.anchors.as_ref().unwrap();
            let from = rect_of(g.node(&e.from).unwrap());
            let to = rect_of(g.node(&e.to).unwrap());
            assert_eq!(anchors.first(), Some(&port_point(&from, e.from_port)), "{}", e.id);
            assert_eq!(anchors.last(), Some(&port_point(&to, e.to_port)), "{}", e.id);
            assert!(is_orthogonal(anchors), "{}", e.id);
        }
    }
}

#[test]
fn test_back_edge_detected_without_style_hint() {
    let mut g = flow(COUNT);
    for e in &mut g.edges {
        e.style = EdgeStyle::Forward;
    }
    let out = engine().layout(&g, Viewport::default()).graph;
    assert_eq!(
        out.edges
            .iter()
            .filter(|e| e.style == EdgeStyle::LoopBack)
            .count(),
        1
    );
}

// ── Determinism and caching ──────────────────────────────────────────────

#[test]
fn test_layout_is_deterministic() {
    let g = flow(GRADE);
    let first = engine().layout(&g, Viewport::default());
    for _ in 0..3 {
        let again = engine().layout(&g, Viewport::default());
        assert!(!again.from_cache);
        assert_eq!(again.graph, first.graph);
    }
}

#[test]
fn test_second_call_hits_cache() {
    let engine = engine();
    let g = flow(COUNT);
    let first = engine.layout(&g, Viewport::default());
    let second = engine.layout(&g, Viewport::default());
    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.graph, second.graph);
    assert_eq!(engine.cache().len(), 1);
}

#[test]
fn test_input_order_does_not_change_key() {
    let engine = engine();
    let g = flow(GRADE);
    engine.layout(&g, Viewport::default());
    let mut shuffled = g.clone();
    shuffled.nodes.reverse();
    shuffled.edges.reverse();
    assert!(engine.layout(&shuffled, Viewport::default()).from_cache);
}

#[test]
fn test_viewport_and_rules_are_part_of_key() {
    let cache = Arc::new(LayoutCache::default());
    let g = flow(COUNT);
    let plain = LayoutEngine::new(cache.clone());
    plain.layout(&g, Viewport::default());
    let narrow = Viewport {
        width: 300,
        height: 800,
    };
    assert!(!plain.layout(&g, narrow).from_cache);

    let untidy = LayoutEngine::new(cache.clone()).with_rules(TidyRules {
        merge_fan_in: false,
        ..TidyRules::default()
    });
    assert!(!untidy.layout(&g, Viewport::default()).from_cache);
    assert_eq!(cache.len(), 3);
}

#[test]
fn test_cache_shared_between_engines() {
    let cache = Arc::new(LayoutCache::default());
    let g = flow(FUNCS);
    LayoutEngine::new(cache.clone()).layout(&g, Viewport::default());
    assert!(LayoutEngine::new(cache.clone()).layout(&g, Viewport::default()).from_cache);
}

#[test]
fn test_cache_clear_and_eviction() {
    let cache = Arc::new(LayoutCache::new(1));
    let engine = LayoutEngine::new(cache.clone());
    let a = flow(COUNT);
    let b = flow(GRADE);
    engine.layout(&a, Viewport::default());
    engine.layout(&b, Viewport::default());
    assert_eq!(cache.len(), 1);
    assert!(!engine.layout(&a, Viewport::default()).from_cache);

    cache.clear();
    assert!(cache.is_empty());
    assert!(!engine.layout(&a, Viewport::default()).from_cache);
}

#[test]
fn test_title_change_misses_cache() {
    let engine = engine();
    let g = flow(COUNT);
    engine.layout(&g, Viewport::default());
    let mut renamed = g.clone();
    renamed.nodes[1].title = "n = 4".to_string();
    assert!(!engine.layout(&renamed, Viewport::default()).from_cache);
}
