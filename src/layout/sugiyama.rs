//! Sugiyama layered layout for one connected flow component.
//!
//! Phases:
//!   1. Cycle removal (greedy-FAS)
//!   2. Layer assignment (longest path)
//!   3. Dummy node insertion
//!   4. Crossing minimisation (barycenter)
//!   5. Coordinate assignment (pixel sizes, median alignment)
//!
//! Iteration always follows node insertion order so identical inputs give
//! identical placements.

use std::collections::{HashMap, HashSet};

// ─── Constants ────────────────────────────────────────────────────────────────

pub const DUMMY_PREFIX: &str = "__dummy_";
/// Horizontal room reserved for an edge passing through a layer.
pub const DUMMY_WIDTH: i64 = 20;
pub const MIN_H_GAP: i64 = 40;
pub const MIN_V_GAP: i64 = 50;
const MAX_CROSSING_PASSES: usize = 24;
const ALIGNMENT_SWEEPS: usize = 3;

/// Gaps between neighbouring nodes and layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spacing {
    pub h_gap: i64,
    pub v_gap: i64,
}

impl Spacing {
    /// Spacing derived from the largest node of a component.
    pub fn for_sizes<'a>(sizes: impl IntoIterator<Item = &'a (i64, i64)>) -> Self {
        let (max_w, max_h) = sizes
            .into_iter()
            .fold((0, 0), |(w, h), &(nw, nh)| (w.max(nw), h.max(nh)));
        Self {
            h_gap: MIN_H_GAP.max(max_w / 3),
            v_gap: MIN_V_GAP.max(max_h * 4 / 5),
        }
    }
}

// ─── Mini-graph helpers ───────────────────────────────────────────────────────

/// Lightweight adjacency graph over node ids, keeping insertion order.
#[derive(Debug, Clone, Default)]
pub struct AdjGraph {
    nodes: Vec<String>,
    successors: HashMap<String, Vec<String>>,
    predecessors: HashMap<String, Vec<String>>,
    edges: Vec<(String, String)>,
}

impl AdjGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: &str) {
        if !self.successors.contains_key(id) {
            self.nodes.push(id.to_string());
            self.successors.insert(id.to_string(), Vec::new());
            self.predecessors.insert(id.to_string(), Vec::new());
        }
    }

    pub fn add_edge(&mut self, src: &str, tgt: &str) {
        self.add_node(src);
        self.add_node(tgt);
        self.successors
            .entry(src.to_string())
            .or_default()
            .push(tgt.to_string());
        self.predecessors
            .entry(tgt.to_string())
            .or_default()
            .push(src.to_string());
        self.edges.push((src.to_string(), tgt.to_string()));
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn edges(&self) -> &[(String, String)] {
        &self.edges
    }

    fn out_degree(&self, id: &str) -> usize {
        self.successors.get(id).map_or(0, Vec::len)
    }

    fn in_degree(&self, id: &str) -> usize {
        self.predecessors.get(id).map_or(0, Vec::len)
    }

    fn successors_of(&self, id: &str) -> &[String] {
        self.successors.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn predecessors_of(&self, id: &str) -> &[String] {
        self.predecessors.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ─── Cycle Removal (Greedy-FAS) ───────────────────────────────────────────────

/// Node ordering by the greedy-FAS heuristic; edges pointing backwards in
/// this order form a feedback arc set.
fn greedy_fas_ordering(ag: &AdjGraph) -> Vec<String> {
    let mut active: HashSet<&str> = ag.nodes.iter().map(String::as_str).collect();
    let mut out_deg: HashMap<&str, i64> = HashMap::new();
    let mut in_deg: HashMap<&str, i64> = HashMap::new();
    for node in &ag.nodes {
        out_deg.insert(node, ag.out_degree(node) as i64);
        in_deg.insert(node, ag.in_degree(node) as i64);
    }

    let mut s1: Vec<String> = Vec::new();
    let mut s2: Vec<String> = Vec::new();
    let active_in_order = |active: &HashSet<&str>| -> Vec<&str> {
        ag.nodes
            .iter()
            .map(String::as_str)
            .filter(|n| active.contains(n))
            .collect()
    };

    while !active.is_empty() {
        loop {
            let sinks: Vec<&str> = active_in_order(&active)
                .into_iter()
                .filter(|n| out_deg.get(n).copied().unwrap_or(0) == 0)
                .collect();
            if sinks.is_empty() {
                break;
            }
            for sink in sinks {
                active.remove(sink);
                s2.push(sink.to_string());
                for pred in ag.predecessors_of(sink) {
                    if active.contains(pred.as_str()) {
                        *out_deg.entry(pred).or_insert(0) -= 1;
                    }
                }
            }
        }

        loop {
            let sources: Vec<&str> = active_in_order(&active)
                .into_iter()
                .filter(|n| in_deg.get(n).copied().unwrap_or(0) == 0)
                .collect();
            if sources.is_empty() {
                break;
            }
            for source in sources {
                active.remove(source);
                s1.push(source.to_string());
                for succ in ag.successors_of(source) {
                    if active.contains(succ.as_str()) {
                        *in_deg.entry(succ).or_insert(0) -= 1;
                    }
                }
            }
        }

        // First node with the largest out - in degree breaks the cycle.
        let mut best: Option<(&str, i64)> = None;
        for n in active_in_order(&active) {
            let score = out_deg.get(n).copied().unwrap_or(0) - in_deg.get(n).copied().unwrap_or(0);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((n, score));
            }
        }
        if let Some((node, _)) = best {
            active.remove(node);
            s1.push(node.to_string());
            for succ in ag.successors_of(node) {
                if active.contains(succ.as_str()) {
                    *in_deg.entry(succ).or_insert(0) -= 1;
                }
            }
            for pred in ag.predecessors_of(node) {
                if active.contains(pred.as_str()) {
                    *out_deg.entry(pred).or_insert(0) -= 1;
                }
            }
        }
    }

    s2.reverse();
    s1.extend(s2);
    s1
}

/// Reverse feedback edges and drop self-loops. Returns the DAG and the set of
/// reversed `(src, tgt)` pairs.
pub fn remove_cycles(ag: &AdjGraph) -> (AdjGraph, HashSet<(String, String)>) {
    let ordering = greedy_fas_ordering(ag);
    let position: HashMap<&str, usize> = ordering
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();

    let mut reversed: HashSet<(String, String)> = HashSet::new();
    let mut dag = AdjGraph::new();
    for node in &ag.nodes {
        dag.add_node(node);
    }
    for (src, tgt) in &ag.edges {
        if src == tgt {
            reversed.insert((src.clone(), tgt.clone()));
            continue;
        }
        let sp = position.get(src.as_str()).copied().unwrap_or(0);
        let tp = position.get(tgt.as_str()).copied().unwrap_or(0);
        if sp > tp {
            reversed.insert((src.clone(), tgt.clone()));
            dag.add_edge(tgt, src);
        } else {
            dag.add_edge(src, tgt);
        }
    }
    (dag, reversed)
}

// ─── Layer Assignment ─────────────────────────────────────────────────────────

pub struct LayerAssignment {
    pub layers: HashMap<String, usize>,
    pub layer_count: usize,
}

impl LayerAssignment {
    /// Longest-path layering of a DAG.
    pub fn assign(dag: &AdjGraph) -> Self {
        let mut layers: HashMap<String, usize> =
            dag.nodes.iter().map(|n| (n.clone(), 0)).collect();

        let mut changed = true;
        while changed {
            changed = false;
            for (src, tgt) in &dag.edges {
                let src_layer = layers.get(src).copied().unwrap_or(0);
                let tgt_layer = layers.entry(tgt.clone()).or_insert(0);
                if *tgt_layer < src_layer + 1 {
                    *tgt_layer = src_layer + 1;
                    changed = true;
                }
            }
        }

        let layer_count = layers.values().copied().max().map_or(1, |m| m + 1);
        Self {
            layers,
            layer_count,
        }
    }
}

// ─── Dummy Node Insertion ─────────────────────────────────────────────────────

pub struct AugmentedGraph {
    pub ag: AdjGraph,
    pub layers: HashMap<String, usize>,
    pub layer_count: usize,
}

/// Split every edge spanning more than one layer into a chain through dummy
/// nodes, one per intermediate layer.
pub fn insert_dummy_nodes(dag: &AdjGraph, la: &LayerAssignment) -> AugmentedGraph {
    let mut ag = AdjGraph::new();
    for node in &dag.nodes {
        ag.add_node(node);
    }
    let mut layers = la.layers.clone();

    for (edge_no, (src, tgt)) in dag.edges.iter().enumerate() {
        let src_layer = layers.get(src).copied().unwrap_or(0);
        let tgt_layer = layers.get(tgt).copied().unwrap_or(0);
        if tgt_layer <= src_layer + 1 {
            ag.add_edge(src, tgt);
            continue;
        }
        let mut prev = src.clone();
        for step in 0..(tgt_layer - src_layer - 1) {
            let dummy = format!("{DUMMY_PREFIX}{edge_no}_{step}");
            ag.add_edge(&prev, &dummy);
            layers.insert(dummy.clone(), src_layer + step + 1);
            prev = dummy;
        }
        ag.add_edge(&prev, tgt);
    }

    AugmentedGraph {
        ag,
        layers,
        layer_count: la.layer_count,
    }
}

// ─── Crossing Minimisation ────────────────────────────────────────────────────

fn barycenter(neighbors: &[String], pos: &HashMap<&str, f64>) -> Option<f64> {
    let positions: Vec<f64> = neighbors
        .iter()
        .filter_map(|nb| pos.get(nb.as_str()).copied())
        .collect();
    (!positions.is_empty()).then(|| positions.iter().sum::<f64>() / positions.len() as f64)
}

pub fn count_crossings(ordering: &[Vec<String>], ag: &AdjGraph) -> usize {
    let mut total = 0usize;
    for pair in ordering.windows(2) {
        let tgt_pos: HashMap<&str, usize> = pair[1]
            .iter()
            .enumerate()
            .map(|(i, nid)| (nid.as_str(), i))
            .collect();
        let mut edges: Vec<(usize, usize)> = Vec::new();
        for (sp, src) in pair[0].iter().enumerate() {
            for nb in ag.successors_of(src) {
                if let Some(&tp) = tgt_pos.get(nb.as_str()) {
                    edges.push((sp, tp));
                }
            }
        }
        for i in 0..edges.len() {
            for j in (i + 1)..edges.len() {
                let (a0, a1) = edges[i];
                let (b0, b1) = edges[j];
                if (a0 < b0 && a1 > b1) || (a0 > b0 && a1 < b1) {
                    total += 1;
                }
            }
        }
    }
    total
}

/// Reorder one layer by neighbour barycenters; nodes without neighbours keep
/// their current slot value so the sort stays stable.
fn sort_layer(
    layer: &mut [String],
    neighbors: impl Fn(&str) -> Vec<String>,
    pos: &HashMap<&str, f64>,
) {
    let mut keyed: Vec<(f64, String)> = layer
        .iter()
        .enumerate()
        .map(|(i, id)| (barycenter(&neighbors(id), pos).unwrap_or(i as f64), id.clone()))
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    for (slot, (_, id)) in layer.iter_mut().zip(keyed) {
        *slot = id;
    }
}

pub fn minimise_crossings(aug: &AugmentedGraph) -> Vec<Vec<String>> {
    let mut ordering: Vec<Vec<String>> = vec![Vec::new(); aug.layer_count];
    for node in &aug.ag.nodes {
        let layer = aug.layers.get(node).copied().unwrap_or(0);
        if let Some(slot) = ordering.get_mut(layer) {
            slot.push(node.clone());
        }
    }

    let mut best = count_crossings(&ordering, &aug.ag);
    let mut best_ordering = ordering.clone();
    for _pass in 0..MAX_CROSSING_PASSES {
        if best == 0 {
            break;
        }
        for layer_idx in 1..ordering.len() {
            let prev = ordering[layer_idx - 1].clone();
            let pos: HashMap<&str, f64> = prev
                .iter()
                .enumerate()
                .map(|(i, n)| (n.as_str(), i as f64))
                .collect();
            sort_layer(
                &mut ordering[layer_idx],
                |id| aug.ag.predecessors_of(id).to_vec(),
                &pos,
            );
        }
        for layer_idx in (0..ordering.len().saturating_sub(1)).rev() {
            let next = ordering[layer_idx + 1].clone();
            let pos: HashMap<&str, f64> = next
                .iter()
                .enumerate()
                .map(|(i, n)| (n.as_str(), i as f64))
                .collect();
            sort_layer(
                &mut ordering[layer_idx],
                |id| aug.ag.successors_of(id).to_vec(),
                &pos,
            );
        }
        let crossings = count_crossings(&ordering, &aug.ag);
        if crossings >= best {
            break;
        }
        best = crossings;
        best_ordering = ordering.clone();
    }
    best_ordering
}

// ─── Coordinate Assignment ────────────────────────────────────────────────────

/// A node placed by the layout, `(x, y)` is its top-left corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedNode {
    pub id: String,
    pub layer: usize,
    pub order: usize,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// Median center of `neighbors` that already have a center.
fn median_center(neighbors: &[String], centers: &HashMap<String, i64>) -> Option<i64> {
    let mut cs: Vec<i64> = neighbors
        .iter()
        .filter_map(|n| centers.get(n).copied())
        .collect();
    if cs.is_empty() {
        return None;
    }
    cs.sort_unstable();
    Some(cs[(cs.len() - 1) / 2])
}

/// Place a layer left to right, each node as close to its desired center as
/// the previous node allows.
fn place_layer(
    layer: &[String],
    dims: &impl Fn(&str) -> (i64, i64),
    desired: impl Fn(&str) -> Option<i64>,
    centers: &mut HashMap<String, i64>,
    h_gap: i64,
) {
    let mut right_edge: Option<i64> = None;
    for id in layer {
        let (w, _) = dims(id);
        let current = centers.get(id).copied().unwrap_or(0);
        let want = desired(id).unwrap_or(current) - w / 2;
        let x = match right_edge {
            Some(r) => want.max(r + h_gap),
            None => want,
        };
        centers.insert(id.clone(), x + w / 2);
        right_edge = Some(x + w);
    }
}

pub fn assign_coordinates(
    ordering: &[Vec<String>],
    aug: &AugmentedGraph,
    sizes: &HashMap<String, (i64, i64)>,
    spacing: Spacing,
) -> Vec<PlacedNode> {
    let dims = |id: &str| -> (i64, i64) {
        sizes.get(id).copied().unwrap_or(if id.starts_with(DUMMY_PREFIX) {
            (DUMMY_WIDTH, 0)
        } else {
            (DUMMY_WIDTH, DUMMY_WIDTH)
        })
    };

    let layer_height: Vec<i64> = ordering
        .iter()
        .map(|layer| layer.iter().map(|id| dims(id).1).max().unwrap_or(0))
        .collect();
    let mut layer_y: Vec<i64> = Vec::with_capacity(ordering.len());
    let mut y = 0;
    for &h in &layer_height {
        layer_y.push(y);
        y += h + spacing.v_gap;
    }

    // Initial packing, then alternate down/up median alignment sweeps.
    let mut centers: HashMap<String, i64> = HashMap::new();
    for layer in ordering {
        place_layer(layer, &dims, |_| None, &mut centers, spacing.h_gap);
    }
    for _ in 0..ALIGNMENT_SWEEPS {
        for layer in ordering.iter().skip(1) {
            let snapshot = centers.clone();
            place_layer(
                layer,
                &dims,
                |id| median_center(aug.ag.predecessors_of(id), &snapshot),
                &mut centers,
                spacing.h_gap,
            );
        }
        for layer in ordering.iter().rev().skip(1) {
            let snapshot = centers.clone();
            place_layer(
                layer,
                &dims,
                |id| median_center(aug.ag.successors_of(id), &snapshot),
                &mut centers,
                spacing.h_gap,
            );
        }
    }
    // Final downward sweep keeps children under their parents.
    for layer in ordering.iter().skip(1) {
        let snapshot = centers.clone();
        place_layer(
            layer,
            &dims,
            |id| median_center(aug.ag.predecessors_of(id), &snapshot),
            &mut centers,
            spacing.h_gap,
        );
    }

    let mut nodes: Vec<PlacedNode> = Vec::new();
    for (layer_idx, layer) in ordering.iter().enumerate() {
        for (order, id) in layer.iter().enumerate() {
            if id.starts_with(DUMMY_PREFIX) {
                continue;
            }
            let (w, h) = dims(id);
            let center = centers.get(id).copied().unwrap_or(0);
            nodes.push(PlacedNode {
                id: id.clone(),
                layer: layer_idx,
                order,
                x: center - w / 2,
                y: layer_y[layer_idx] + (layer_height[layer_idx] - h) / 2,
                width: w,
                height: h,
            });
        }
    }

    if let Some(min_x) = nodes.iter().map(|n| n.x).min() {
        for n in &mut nodes {
            n.x -= min_x;
        }
    }
    nodes
}

// ─── Driver ───────────────────────────────────────────────────────────────────

pub struct SugiyamaLayout;

impl SugiyamaLayout {
    /// Lay out `nodes` (id, size) connected by forward `edges`; any remaining
    /// cycles are broken by greedy-FAS.
    pub fn layout(nodes: &[(String, (i64, i64))], edges: &[(String, String)]) -> Vec<PlacedNode> {
        let mut ag = AdjGraph::new();
        for (id, _) in nodes {
            ag.add_node(id);
        }
        for (src, tgt) in edges {
            ag.add_edge(src, tgt);
        }
        let (dag, _) = remove_cycles(&ag);
        let la = LayerAssignment::assign(&dag);
        let aug = insert_dummy_nodes(&dag, &la);
        let ordering = minimise_crossings(&aug);

        let sizes: HashMap<String, (i64, i64)> = nodes.iter().cloned().collect();
        let spacing = Spacing::for_sizes(sizes.values());
        assign_coordinates(&ordering, &aug, &sizes, spacing)
    }
}

#[cfg(test)]
#[path = "../../tests/rust/test_layout_sugiyama.rs"]
mod tests;
