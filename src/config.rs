//! Rule-set configuration: tidy toggles for layout/codegen and the
//! thresholds the beautify report checks a diagram against.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flow::types::{EdgeStyle, FlowGraph};
use crate::layout::geometry::{Point, Rect};
use crate::layout::routing::CleanupOptions;
use crate::layout::sizing::node_size_for_title;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid rule set: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TidyRules {
    /// Merge edges entering one node from above into a shared trunk.
    pub merge_fan_in: bool,
    pub cleanup_tiny_segments: bool,
    pub snap_to_grid: bool,
    /// Fold counting `while` loops back into `for … in range(…)`.
    pub rewrite_counting_loops: bool,
}

impl Default for TidyRules {
    fn default() -> Self {
        Self {
            merge_fan_in: true,
            cleanup_tiny_segments: true,
            snap_to_grid: true,
            rewrite_counting_loops: true,
        }
    }
}

impl TidyRules {
    pub fn cleanup_options(&self) -> CleanupOptions {
        CleanupOptions {
            snap_to_grid: self.snap_to_grid,
            fix_tiny_segments: self.cleanup_tiny_segments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BeautifyThresholds {
    pub max_nodes: usize,
    pub max_edge_crossings: usize,
    /// Largest allowed angle (degrees) between a forward edge's direction and
    /// straight down.
    pub max_flow_angle: f64,
}

impl Default for BeautifyThresholds {
    fn default() -> Self {
        Self {
            max_nodes: 120,
            max_edge_crossings: 4,
            max_flow_angle: 75.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub tidy: TidyRules,
    pub beautify: BeautifyThresholds,
}

impl RuleSet {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}

// ─── Beautify report ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeautifyReport {
    pub node_count: usize,
    pub edge_crossings: usize,
    pub max_flow_angle: f64,
    pub violations: Vec<String>,
}

impl BeautifyReport {
    pub fn is_within_thresholds(&self) -> bool {
        self.violations.is_empty()
    }
}

type Segment = (Point, Point);

/// Proper crossing of a horizontal and a vertical segment (touching at an
/// endpoint does not count).
fn segments_cross(a: Segment, b: Segment) -> bool {
    let (h, v) = if a.0.y == a.1.y && b.0.x == b.1.x {
        (a, b)
    } else if b.0.y == b.1.y && a.0.x == a.1.x {
        (b, a)
    } else {
        return false;
    };
    let (hx0, hx1) = (h.0.x.min(h.1.x), h.0.x.max(h.1.x));
    let (vy0, vy1) = (v.0.y.min(v.1.y), v.0.y.max(v.1.y));
    v.0.x > hx0 && v.0.x < hx1 && h.0.y > vy0 && h.0.y < vy1
}

/// Number of crossings between routed polylines of different edges.
pub fn count_route_crossings(graph: &FlowGraph) -> usize {
    let segments: Vec<Vec<Segment>> = graph
        .edges
        .iter()
        .map(|e| {
            e.anchors
                .as_deref()
                .unwrap_or(&[])
                .windows(2)
                .map(|w| (w[0], w[1]))
                .collect()
        })
        .collect();
    let mut total = 0;
    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            for &a in &segments[i] {
                total += segments[j].iter().filter(|&&b| segments_cross(a, b)).count();
            }
        }
    }
    total
}

fn node_rect(graph: &FlowGraph, id: &str) -> Option<Rect> {
    let node = graph.node(id)?;
    let (w, h) = node_size_for_title(node.shape, &node.title);
    Some(Rect::new(node.x, node.y, w, h))
}

/// Steepest forward-edge direction, in degrees away from straight down.
pub fn max_flow_angle(graph: &FlowGraph) -> f64 {
    graph
        .edges
        .iter()
        .filter(|e| e.style == EdgeStyle::Forward)
        .filter_map(|e| {
            let a = node_rect(graph, &e.from)?.center();
            let b = node_rect(graph, &e.to)?.center();
            let (dx, dy) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
            (dx != 0.0 || dy != 0.0).then(|| dx.abs().atan2(dy).to_degrees())
        })
        .fold(0.0, f64::max)
}

/// Measure a laid-out graph against `thresholds`.
pub fn beautify_report(graph: &FlowGraph, thresholds: &BeautifyThresholds) -> BeautifyReport {
    let node_count = graph.nodes.len();
    let edge_crossings = count_route_crossings(graph);
    let angle = max_flow_angle(graph);

    let mut violations = Vec::new();
    if node_count > thresholds.max_nodes {
        violations.push(format!(
            "节点数 {node_count} 超过上限 {}",
            thresholds.max_nodes
        ));
    }
    if edge_crossings > thresholds.max_edge_crossings {
        violations.push(format!(
            "连线交叉 {edge_crossings} 处，超过上限 {}",
            thresholds.max_edge_crossings
        ));
    }
    if angle > thresholds.max_flow_angle {
        violations.push(format!(
            "流向角度 {angle:.0}° 超过上限 {:.0}°",
            thresholds.max_flow_angle
        ));
    }
    BeautifyReport {
        node_count,
        edge_crossings,
        max_flow_angle: angle,
        violations,
    }
}

#[cfg(test)]
#[path = "../tests/rust/test_config.rs"]
mod tests;
