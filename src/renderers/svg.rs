//! SVG preview renderer: draws a laid-out flow graph.
//!
//! Expects node positions and edge anchors from `LayoutEngine::layout`;
//! edges without anchors are drawn as a straight port-to-port line.

use crate::flow::types::{EdgeStyle, FlowEdge, FlowGraph, FlowNode, Shape};
use crate::layout::curve::catmull_rom_to_bezier_path;
use crate::layout::geometry::{Point, Rect};
use crate::layout::sizing::{LINE_HEIGHT, node_outline, node_size_for_title, port_point, title_lines};

// ── Constants ────────────────────────────────────────────────────────────────

const FONT_SIZE: i64 = 13;
const FONT_FAMILY: &str = "sans-serif";
const PADDING: i64 = 20;

const FILL_STROKE: &str = r#"fill="white" stroke="black" stroke-width="1.5""#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SvgOptions {
    /// Draw edges as Catmull-Rom curves instead of orthogonal polylines.
    pub curved: bool,
}

// ── Helpers ──────────────────────────────────────────────────────────────────

pub(crate) fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn font(size: i64) -> String {
    format!(r#"font-family="{FONT_FAMILY}" font-size="{size}""#)
}

fn node_rect(node: &FlowNode) -> Rect {
    let (w, h) = node_size_for_title(node.shape, &node.title);
    Rect::new(node.x, node.y, w, h)
}

fn points_attr(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Nodes ────────────────────────────────────────────────────────────────────

fn render_node(node: &FlowNode) -> String {
    let rect = node_rect(node);
    let c = rect.center();
    let shape_svg = match node.shape {
        Shape::Connector => format!(
            r#"<circle cx="{}" cy="{}" r="{}" {FILL_STROKE}/>"#,
            c.x,
            c.y,
            rect.w / 2
        ),
        Shape::StartEnd => {
            let r = rect.h / 2;
            format!(
                r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{r}" {FILL_STROKE}/>"#,
                rect.x, rect.y, rect.w, rect.h
            )
        }
        Shape::Subroutine => {
            let inset = 8;
            format!(
                concat!(
                    r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" {fs}/>"#,
                    "\n",
                    r#"<line x1="{l}" y1="{y}" x2="{l}" y2="{b}" stroke="black"/>"#,
                    "\n",
                    r#"<line x1="{r}" y1="{y}" x2="{r}" y2="{b}" stroke="black"/>"#
                ),
                x = rect.x,
                y = rect.y,
                w = rect.w,
                h = rect.h,
                b = rect.bottom(),
                l = rect.x + inset,
                r = rect.right() - inset,
                fs = FILL_STROKE,
            )
        }
        Shape::Decision | Shape::Io | Shape::Process => format!(
            r#"<polygon points="{}" {FILL_STROKE}/>"#,
            points_attr(&node_outline(node.shape, &rect))
        ),
    };
    if node.shape == Shape::Connector {
        return shape_svg;
    }

    let lines = title_lines(&node.title);
    let f = font(FONT_SIZE);
    let label_svg = if lines.len() == 1 {
        format!(
            r#"<text x="{}" y="{}" dominant-baseline="central" text-anchor="middle" {f}>{}</text>"#,
            c.x,
            c.y,
            escape(&lines[0])
        )
    } else {
        let total_h = lines.len() as i64 * LINE_HEIGHT;
        let start_y = c.y - total_h / 2 + LINE_HEIGHT / 2;
        let tspans: String = lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let ty = start_y + i as i64 * LINE_HEIGHT;
                format!(
                    r#"<tspan x="{}" y="{ty}" dominant-baseline="central">{}</tspan>"#,
                    c.x,
                    escape(line)
                )
            })
            .collect();
        format!(r#"<text text-anchor="middle" {f}>{tspans}</text>"#)
    };
    format!(r#"<g data-id="{}">{shape_svg}{label_svg}</g>"#, escape(&node.id))
}

// ── Edges ────────────────────────────────────────────────────────────────────

fn edge_points(graph: &FlowGraph, edge: &FlowEdge) -> Vec<Point> {
    if let Some(anchors) = edge.anchors.as_ref().filter(|a| a.len() >= 2) {
        return anchors.clone();
    }
    match (graph.node(&edge.from), graph.node(&edge.to)) {
        (Some(a), Some(b)) => vec![
            port_point(&node_rect(a), edge.from_port),
            port_point(&node_rect(b), edge.to_port),
        ],
        _ => Vec::new(),
    }
}

fn render_edge(graph: &FlowGraph, edge: &FlowEdge, options: SvgOptions) -> String {
    let points = edge_points(graph, edge);
    if points.len() < 2 {
        return String::new();
    }
    let dash = match edge.style {
        EdgeStyle::LoopBack => r#" stroke-dasharray="6 4""#,
        EdgeStyle::Forward => "",
    };
    let common = format!(
        r#"fill="none" stroke="black" stroke-width="1.5"{dash} marker-end="url(#arrowhead)""#
    );
    let mut parts = vec![if options.curved {
        format!(r#"<path d="{}" {common}/>"#, catmull_rom_to_bezier_path(&points))
    } else {
        format!(r#"<polyline points="{}" {common}/>"#, points_attr(&points))
    }];

    if let Some(label) = edge.label.as_deref().filter(|l| !l.is_empty()) {
        // Label sits beside the first leg, just past the source stub.
        let (a, b) = (points[0], points[1]);
        let (lx, ly) = if a.x == b.x {
            (a.x + 8, a.y + (b.y - a.y).signum() * 14)
        } else {
            (a.x + (b.x - a.x).signum() * 14, a.y - 6)
        };
        let f = font(FONT_SIZE - 1);
        parts.push(format!(
            r##"<text x="{lx}" y="{ly}" {f} fill="#333">{}</text>"##,
            escape(label)
        ));
    }
    parts.join("\n")
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Render `graph` to an SVG document. An empty graph renders as an empty
/// string.
pub fn render_svg(graph: &FlowGraph, options: SvgOptions) -> String {
    if graph.nodes.is_empty() {
        return String::new();
    }

    let mut max_x = 0;
    let mut max_y = 0;
    for node in &graph.nodes {
        let r = node_rect(node);
        max_x = max_x.max(r.right());
        max_y = max_y.max(r.bottom());
    }
    for p in graph.edges.iter().flat_map(|e| e.anchors.iter().flatten()) {
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let svg_w = max_x + PADDING * 2;
    let svg_h = max_y + PADDING * 2;

    let mut parts = vec![
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{svg_w}" height="{svg_h}" viewBox="0 0 {svg_w} {svg_h}">"#
        ),
        "<defs>".to_string(),
        r#"  <marker id="arrowhead" markerWidth="10" markerHeight="7" refX="10" refY="3.5" orient="auto">"#.to_string(),
        r#"    <polygon points="0 0, 10 3.5, 0 7" fill="black"/>"#.to_string(),
        "  </marker>".to_string(),
        "</defs>".to_string(),
        format!(r#"<rect width="{svg_w}" height="{svg_h}" fill="white"/>"#),
    ];

    // Edges behind nodes, in edge order.
    for edge in &graph.edges {
        let svg = render_edge(graph, edge, options);
        if !svg.is_empty() {
            parts.push(svg);
        }
    }
    for node in &graph.nodes {
        parts.push(render_node(node));
    }

    parts.push("</svg>".to_string());
    parts.join("\n")
}

#[cfg(test)]
#[path = "../../tests/rust/test_renderers_svg.rs"]
mod tests;
