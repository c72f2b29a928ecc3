//! Layered layout engine: positions every node of a flow graph, assigns
//! ports and routes every edge.
//!
//! Pipeline per call:
//!
//! 1. split the graph into connected components (main first, then functions),
//! 2. classify loop-closing edges from each component's entry,
//! 3. run the Sugiyama phases on the forward edges of each component,
//! 4. pack components left-to-right, wrapping at the viewport width,
//! 5. assign ports by shape/label rules and route every edge orthogonally,
//! 6. merge fan-in edges into shared trunks.
//!
//! Identical `(graph, viewport, rules)` inputs produce identical output, so
//! results are memoised in an injected [`LayoutCache`].

use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::LruCache;
use crate::config::TidyRules;
use crate::flow::merge::ordered_components;
use crate::flow::types::{EdgeStyle, FlowGraph, Port, Shape, is_false_label};

use super::geometry::{GRID, Point, Rect, snap};
use super::graph::FlowGraphIR;
use super::routing::{
    FanInEdge, Route, RouteRequest, STUB, merge_fan_in, route_orthogonal_visio_like,
};
use super::sizing::{allowed_ports_for_shape, fixed_port_for_start_end, node_size_for_title, port_point};
use super::sugiyama::SugiyamaLayout;

/// Margin around the whole drawing; leaves room for loop corridors.
pub const MARGIN: i64 = 60;
pub const COMPONENT_GAP: i64 = 80;
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    pub width: i64,
    pub height: i64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
        }
    }
}

// ─── Cache ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct EdgeLayout {
    from_port: Port,
    to_port: Port,
    style: EdgeStyle,
    anchors: Option<Vec<Point>>,
}

/// Everything the engine decides for one graph, keyed by element id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct LaidOut {
    positions: HashMap<String, (i64, i64)>,
    edges: HashMap<String, EdgeLayout>,
    degraded: Vec<String>,
}

/// Thread-safe LRU of finished layouts. Owned by the caller and shared with
/// any number of engines; concurrent inserts under one key are last-write-wins.
#[derive(Debug)]
pub struct LayoutCache {
    inner: Mutex<LruCache<u64, LaidOut>>,
}

impl LayoutCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    fn get(&self, key: u64) -> Option<LaidOut> {
        self.inner.lock().get(&key)
    }

    fn insert(&self, key: u64, value: LaidOut) {
        self.inner.lock().insert(key, value);
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

fn fx_hash(value: impl Hash) -> u64 {
    let mut h = FxHasher::default();
    value.hash(&mut h);
    h.finish()
}

/// Structural key: element hashes are sorted before combining, so node and
/// edge order in the input does not matter.
fn cache_key(graph: &FlowGraph, viewport: Viewport, tidy: &TidyRules) -> u64 {
    let mut nodes: Vec<u64> = graph
        .nodes
        .iter()
        .map(|n| fx_hash((&n.id, n.shape, &n.title)))
        .collect();
    let mut edges: Vec<u64> = graph
        .edges
        .iter()
        .map(|e| fx_hash((&e.id, &e.from, &e.to, &e.label, e.style)))
        .collect();
    nodes.sort_unstable();
    edges.sort_unstable();
    fx_hash((
        nodes,
        edges,
        viewport,
        tidy.merge_fan_in,
        tidy.cleanup_tiny_segments,
        tidy.snap_to_grid,
    ))
}

/// Sort key that orders `n2` before `n10`.
fn id_order(id: &str) -> (&str, u64, &str) {
    let digits_at = id
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map_or(id.len(), |(i, _)| i);
    let (prefix, digits) = id.split_at(digits_at);
    (prefix, digits.parse().unwrap_or(0), id)
}

// ─── Engine ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    /// Input graph with positions, ports and anchors filled in.
    pub graph: FlowGraph,
    /// Edges whose route fell back to the obstacle-blind direct path.
    pub degraded_edges: Vec<String>,
    pub from_cache: bool,
}

#[derive(Debug, Clone)]
pub struct LayoutEngine {
    cache: Arc<LayoutCache>,
    tidy: TidyRules,
}

impl LayoutEngine {
    pub fn new(cache: Arc<LayoutCache>) -> Self {
        Self {
            cache,
            tidy: TidyRules::default(),
        }
    }

    pub fn with_rules(mut self, tidy: TidyRules) -> Self {
        self.tidy = tidy;
        self
    }

    pub fn cache(&self) -> &LayoutCache {
        &self.cache
    }

    pub fn layout(&self, graph: &FlowGraph, viewport: Viewport) -> LayoutResult {
        let key = cache_key(graph, viewport, &self.tidy);
        let (laid, from_cache) = match self.cache.get(key) {
            Some(hit) => {
                debug!(key, "layout cache hit");
                (hit, true)
            }
            None => {
                debug!(key, nodes = graph.nodes.len(), "layout cache miss");
                let laid = compute(graph, viewport, &self.tidy);
                self.cache.insert(key, laid.clone());
                (laid, false)
            }
        };
        LayoutResult {
            graph: apply(graph, &laid),
            degraded_edges: laid.degraded,
            from_cache,
        }
    }
}

fn apply(graph: &FlowGraph, laid: &LaidOut) -> FlowGraph {
    let mut out = graph.clone();
    for node in &mut out.nodes {
        if let Some(&(x, y)) = laid.positions.get(&node.id) {
            node.x = x;
            node.y = y;
        }
    }
    for edge in &mut out.edges {
        if let Some(e) = laid.edges.get(&edge.id) {
            edge.from_port = e.from_port;
            edge.to_port = e.to_port;
            edge.style = e.style;
            edge.anchors = e.anchors.clone();
        }
    }
    out
}

// ─── Ports ────────────────────────────────────────────────────────────────────

fn source_port(shape: Shape, title: &str, label: Option<&str>, back: bool) -> Port {
    let port = if back {
        Port::Left
    } else {
        match shape {
            Shape::Decision => match label {
                Some(l) if is_false_label(l) => Port::Right,
                _ => Port::Bottom,
            },
            Shape::StartEnd => fixed_port_for_start_end(title),
            _ => Port::Bottom,
        }
    };
    allowed_or(port, allowed_ports_for_shape(shape, title), Port::Bottom)
}

fn target_port(shape: Shape, title: &str, back: bool) -> Port {
    let port = match shape {
        Shape::StartEnd => fixed_port_for_start_end(title),
        _ if back => Port::Left,
        _ => Port::Top,
    };
    allowed_or(port, allowed_ports_for_shape(shape, title), Port::Top)
}

/// `port` when the shape allows it, else `fallback`, else the first allowed port.
fn allowed_or(port: Port, allowed: &[Port], fallback: Port) -> Port {
    if allowed.contains(&port) {
        port
    } else if allowed.contains(&fallback) {
        fallback
    } else {
        allowed.first().copied().unwrap_or(fallback)
    }
}

// ─── Layout pass ──────────────────────────────────────────────────────────────

fn compute(graph: &FlowGraph, viewport: Viewport, tidy: &TidyRules) -> LaidOut {
    let mut laid = LaidOut::default();
    if graph.nodes.is_empty() {
        return laid;
    }
    let ir = FlowGraphIR::from_flow(graph);
    let comps = ordered_components(graph);

    let mut back: HashSet<usize> = graph
        .edges
        .iter()
        .enumerate()
        .filter(|(_, e)| e.style == EdgeStyle::LoopBack)
        .map(|(i, _)| i)
        .collect();
    for (_, members) in &comps {
        let entry = members
            .iter()
            .map(|&i| &graph.nodes[i])
            .find(|n| n.is_entry())
            .or_else(|| {
                members
                    .iter()
                    .map(|&i| &graph.nodes[i])
                    .find(|n| ir.in_degree(&n.id) == 0)
            })
            .unwrap_or(&graph.nodes[members[0]]);
        back.extend(ir.back_edges(&entry.id));
    }

    let node_comp: HashMap<&str, usize> = comps
        .iter()
        .enumerate()
        .flat_map(|(c, (_, members))| members.iter().map(move |&i| (graph.nodes[i].id.as_str(), c)))
        .collect();
    let mut edge_order: Vec<usize> = (0..graph.edges.len()).collect();
    edge_order.sort_by(|&a, &b| id_order(&graph.edges[a].id).cmp(&id_order(&graph.edges[b].id)));

    // Place each component at the origin, then pack.
    let mut rects: HashMap<&str, Rect> = HashMap::new();
    let (mut cursor_x, mut cursor_y, mut row_h) = (MARGIN, MARGIN, 0);
    for (c, (kind, members)) in comps.iter().enumerate() {
        let mut ids: Vec<&str> = members.iter().map(|&i| graph.nodes[i].id.as_str()).collect();
        ids.sort_by(|a, b| id_order(a).cmp(&id_order(b)));
        let sized: Vec<(String, (i64, i64))> = ids
            .iter()
            .filter_map(|id| graph.node(id))
            .map(|n| (n.id.clone(), node_size_for_title(n.shape, &n.title)))
            .collect();
        let forward: Vec<(String, String)> = edge_order
            .iter()
            .filter(|&&i| !back.contains(&i))
            .map(|&i| &graph.edges[i])
            .filter(|e| node_comp.get(e.from.as_str()) == Some(&c) && e.from != e.to)
            .filter(|e| node_comp.get(e.to.as_str()) == Some(&c))
            .map(|e| (e.from.clone(), e.to.clone()))
            .collect();

        let placed = SugiyamaLayout::layout(&sized, &forward);
        let min_x = placed.iter().map(|p| p.x).min().unwrap_or(0);
        let min_y = placed.iter().map(|p| p.y).min().unwrap_or(0);
        let w = placed.iter().map(|p| p.x + p.width - min_x).max().unwrap_or(0);
        let h = placed.iter().map(|p| p.y + p.height - min_y).max().unwrap_or(0);

        if cursor_x > MARGIN && cursor_x + w + MARGIN > viewport.width {
            cursor_x = MARGIN;
            cursor_y += row_h + COMPONENT_GAP;
            row_h = 0;
        }
        debug!(component = c, ?kind, x = cursor_x, y = cursor_y, w, h, "packed component");
        for p in &placed {
            let Some(node) = graph.node(&p.id) else {
                continue;
            };
            let (x, y) = (snap(cursor_x + p.x - min_x), snap(cursor_y + p.y - min_y));
            laid.positions.insert(p.id.clone(), (x, y));
            rects.insert(node.id.as_str(), Rect::new(x, y, p.width, p.height));
        }
        cursor_x += w + COMPONENT_GAP;
        row_h = row_h.max(h);
    }

    let obstacles: Vec<Rect> = {
        let mut entries: Vec<(&str, Rect)> = rects.iter().map(|(id, r)| (*id, *r)).collect();
        entries.sort_by(|a, b| id_order(a.0).cmp(&id_order(b.0)));
        entries.into_iter().map(|(_, r)| r).collect()
    };
    let corridors = loop_corridors(graph, &back, &rects, &edge_order);

    // Route.
    let mut routes: HashMap<usize, (RouteRequest, Route)> = HashMap::new();
    for &i in &edge_order {
        let edge = &graph.edges[i];
        let (Some(src), Some(dst)) = (graph.node(&edge.from), graph.node(&edge.to)) else {
            continue;
        };
        let (Some(from_rect), Some(to_rect)) = (rects.get(src.id.as_str()), rects.get(dst.id.as_str()))
        else {
            continue;
        };
        let is_back = back.contains(&i);
        let from_port = source_port(src.shape, &src.title, edge.label.as_deref(), is_back);
        let to_port = target_port(dst.shape, &dst.title, is_back);
        let mut req = RouteRequest::new(
            port_point(from_rect, from_port),
            from_port,
            port_point(to_rect, to_port),
            to_port,
        );
        req.corridor_x = corridors.get(&i).copied();
        let route = route_orthogonal_visio_like(&req, &obstacles, tidy.cleanup_options());
        routes.insert(i, (req, route));
    }

    if tidy.merge_fan_in {
        merge_fan_ins(graph, &back, &edge_order, &obstacles, &mut routes);
    }

    for &i in &edge_order {
        let edge = &graph.edges[i];
        let Some((req, route)) = routes.remove(&i) else {
            continue;
        };
        if route.degraded {
            laid.degraded.push(edge.id.clone());
        }
        let style = if back.contains(&i) {
            EdgeStyle::LoopBack
        } else {
            edge.style
        };
        laid.edges.insert(
            edge.id.clone(),
            EdgeLayout {
                from_port: req.from_port,
                to_port: req.to_port,
                style,
                anchors: Some(route.points),
            },
        );
    }
    laid
}

/// Preferred x for the vertical run of each loop-closing edge: left of every
/// node the loop spans, one grid step further out per enclosed loop.
fn loop_corridors(
    graph: &FlowGraph,
    back: &HashSet<usize>,
    rects: &HashMap<&str, Rect>,
    edge_order: &[usize],
) -> HashMap<usize, i64> {
    let span = |i: usize| -> Option<(i64, i64)> {
        let e = &graph.edges[i];
        let (a, b) = (rects.get(e.from.as_str())?, rects.get(e.to.as_str())?);
        Some((a.y.min(b.y), a.bottom().max(b.bottom())))
    };
    let mut loops: Vec<(usize, (i64, i64))> = edge_order
        .iter()
        .filter(|&&i| back.contains(&i))
        .filter_map(|&i| span(i).map(|s| (i, s)))
        .collect();
    loops.sort_by_key(|&(i, (top, bottom))| (bottom - top, i));

    let mut corridors = HashMap::new();
    for (k, &(i, (top, bottom))) in loops.iter().enumerate() {
        let left = rects
            .values()
            .filter(|r| r.bottom() >= top && r.y <= bottom)
            .map(|r| r.x)
            .min()
            .unwrap_or(0);
        let nested = loops[..k]
            .iter()
            .filter(|(_, (t, b))| *t >= top && *b <= bottom)
            .count() as i64;
        corridors.insert(i, snap(left - STUB - GRID * (1 + nested)));
    }
    corridors
}

/// Merge forward edges entering the same node's top port from above.
fn merge_fan_ins(
    graph: &FlowGraph,
    back: &HashSet<usize>,
    edge_order: &[usize],
    obstacles: &[Rect],
    routes: &mut HashMap<usize, (RouteRequest, Route)>,
) {
    let mut targets: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for &i in edge_order {
        if back.contains(&i) {
            continue;
        }
        let Some((req, _)) = routes.get(&i) else {
            continue;
        };
        if req.to_port != Port::Top || req.from.y >= req.to.y {
            continue;
        }
        let to = graph.edges[i].to.as_str();
        let group = groups.entry(to).or_default();
        if group.is_empty() {
            targets.push(to);
        }
        group.push(i);
    }

    for target in targets {
        let members = &groups[target];
        if members.len() < 2 {
            continue;
        }
        let mut fans: Vec<FanInEdge> = members
            .iter()
            .filter_map(|i| routes.get(i))
            .map(|(req, route)| FanInEdge {
                from: req.from,
                from_port: req.from_port,
                route: route.clone(),
            })
            .collect();
        let Some(&first) = members.first() else {
            continue;
        };
        let Some(target_pt) = routes.get(&first).map(|(req, _)| req.to) else {
            continue;
        };
        if let Some(trunk_y) = merge_fan_in(target_pt, &mut fans, obstacles) {
            debug!(target, trunk_y, edges = fans.len(), "merged fan-in");
            for (i, fan) in members.iter().zip(fans) {
                if let Some((_, route)) = routes.get_mut(i) {
                    *route = fan.route;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/rust/test_layout_engine.rs"]
mod tests;
