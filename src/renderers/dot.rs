//! Graphviz DOT emission for flow graphs.

use crate::flow::types::{EdgeStyle, FlowGraph, Shape};

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn dot_shape(shape: Shape) -> &'static str {
    match shape {
        Shape::StartEnd => "box, style=rounded",
        Shape::Process => "box",
        Shape::Decision => "diamond",
        Shape::Io => "parallelogram",
        Shape::Subroutine => "box, peripheries=2",
        Shape::Connector => "point, width=0.12",
    }
}

/// DOT source for `graph`, top-to-bottom. Loop-closing edges are dashed and
/// do not constrain ranking.
pub fn to_dot(graph: &FlowGraph) -> String {
    let mut out = String::from("digraph flow {\n");
    out.push_str("  rankdir=TB;\n");
    out.push_str("  node [fontname=\"sans-serif\", fontsize=11];\n");
    out.push_str("  edge [fontname=\"sans-serif\", fontsize=10];\n");
    for node in &graph.nodes {
        let label = if node.shape == Shape::Connector {
            String::from("\"\"")
        } else {
            quote(&node.title)
        };
        out.push_str(&format!(
            "  {} [shape={}, label={label}];\n",
            quote(&node.id),
            dot_shape(node.shape)
        ));
    }
    for edge in &graph.edges {
        let mut attrs: Vec<String> = Vec::new();
        if let Some(label) = &edge.label {
            attrs.push(format!("label={}", quote(label)));
        }
        if edge.style == EdgeStyle::LoopBack {
            attrs.push("style=dashed".to_string());
            attrs.push("constraint=false".to_string());
        }
        let attrs = if attrs.is_empty() {
            String::new()
        } else {
            format!(" [{}]", attrs.join(", "))
        };
        out.push_str(&format!(
            "  {} -> {}{attrs};\n",
            quote(&edge.from),
            quote(&edge.to)
        ));
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
#[path = "../../tests/rust/test_renderers_dot.rs"]
mod tests;
