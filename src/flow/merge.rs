//! Combining per-function flows into one graph, and splitting a graph back
//! into its connected components.

use std::collections::HashMap;

use petgraph::unionfind::UnionFind;

use super::types::{FlowGraph, Shape, START_TITLE, is_start_title};
use crate::syntax::types::is_return_text;

/// Merge `(namespace, graph)` parts into one graph; every node and edge id is
/// prefixed with `namespace.` so flows never collide.
pub fn merge(parts: Vec<(String, FlowGraph)>) -> FlowGraph {
    let mut merged = FlowGraph::new();
    for (ns, graph) in parts {
        let prefix = |id: &str| format!("{ns}.{id}");
        for mut node in graph.nodes {
            node.id = prefix(&node.id);
            merged.nodes.push(node);
        }
        for mut edge in graph.edges {
            edge.id = prefix(&edge.id);
            edge.from = prefix(&edge.from);
            edge.to = prefix(&edge.to);
            merged.edges.push(edge);
        }
    }
    merged
}

/// Connected components (ignoring direction) as lists of node indices, each
/// sorted, ordered by their first node index.
pub fn components(graph: &FlowGraph) -> Vec<Vec<usize>> {
    let index: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();
    let mut uf = UnionFind::<usize>::new(graph.nodes.len());
    for edge in &graph.edges {
        if let (Some(&a), Some(&b)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str())) {
            uf.union(a, b);
        }
    }

    let mut by_root: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..graph.nodes.len() {
        by_root.entry(uf.find(i)).or_default().push(i);
    }
    let mut comps: Vec<Vec<usize>> = by_root.into_values().collect();
    comps.sort_by_key(|c| c[0]);
    comps
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentKind {
    Main,
    Function,
    Other,
}

/// Classify the component made of `members` (node indices into `graph`).
pub fn classify_component(graph: &FlowGraph, members: &[usize]) -> ComponentKind {
    let nodes = || members.iter().filter_map(|&i| graph.nodes.get(i));
    let starts: Vec<&str> = nodes()
        .filter(|n| n.shape == Shape::StartEnd && is_start_title(&n.title))
        .map(|n| n.title.trim())
        .collect();

    if starts.iter().any(|t| *t == START_TITLE || t.eq_ignore_ascii_case("start")) {
        if nodes().any(|n| n.shape == Shape::StartEnd && is_return_text(&n.title)) {
            return ComponentKind::Function;
        }
        return ComponentKind::Main;
    }
    if starts.iter().any(|t| t.starts_with("def ")) {
        return ComponentKind::Function;
    }
    ComponentKind::Other
}

/// Components sorted for layout: main first, then functions, then the rest;
/// ties keep source order.
pub fn ordered_components(graph: &FlowGraph) -> Vec<(ComponentKind, Vec<usize>)> {
    let mut comps: Vec<(ComponentKind, Vec<usize>)> = components(graph)
        .into_iter()
        .map(|c| (classify_component(graph, &c), c))
        .collect();
    comps.sort_by(|a, b| a.0.cmp(&b.0).then(a.1[0].cmp(&b.1[0])));
    comps
}

#[cfg(test)]
#[path = "../../tests/rust/test_flow_merge.rs"]
mod tests;
