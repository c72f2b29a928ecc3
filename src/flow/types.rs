//! Flowchart graph types shared by the converter, layout engine and renderers.

use serde::{Deserialize, Serialize};

use crate::layout::geometry::Point;

// ─── Constants ────────────────────────────────────────────────────────────────

pub const START_TITLE: &str = "开始";
pub const END_TITLE: &str = "结束";
pub const TRUE_LABEL: &str = "是";
pub const FALSE_LABEL: &str = "否";

// ─── Shape ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    StartEnd,
    Process,
    Decision,
    Io,
    Subroutine,
    Connector,
}

impl Shape {
    pub fn as_str(self) -> &'static str {
        match self {
            Shape::StartEnd => "start_end",
            Shape::Process => "process",
            Shape::Decision => "decision",
            Shape::Io => "io",
            Shape::Subroutine => "subroutine",
            Shape::Connector => "connector",
        }
    }
}

// ─── Port ─────────────────────────────────────────────────────────────────────

/// Side of a node an edge attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Port {
    Top,
    Bottom,
    Left,
    Right,
}

impl Port {
    pub const ALL: [Port; 4] = [Port::Top, Port::Bottom, Port::Left, Port::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Port::Top => "top",
            Port::Bottom => "bottom",
            Port::Left => "left",
            Port::Right => "right",
        }
    }
}

// ─── EdgeStyle ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStyle {
    #[default]
    Forward,
    /// Loop-closing edge; attaches to side ports.
    LoopBack,
}

// ─── FlowNode ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub id: String,
    pub shape: Shape,
    pub title: String,
    /// Top-left corner; filled in by the layout engine.
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
    /// Function referenced by a `subroutine` node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callee: Option<String>,
    /// Source line the node was generated from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl FlowNode {
    pub fn new(id: impl Into<String>, shape: Shape, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            shape,
            title: title.into(),
            x: 0,
            y: 0,
            callee: None,
            line: None,
        }
    }

    /// Entry node of a component: `开始` or a `def …` signature.
    pub fn is_entry(&self) -> bool {
        self.shape == Shape::StartEnd && is_start_title(&self.title)
    }
}

/// Start-like titles; every other `start_end` title is an end/return.
pub fn is_start_title(title: &str) -> bool {
    let t = title.trim();
    matches!(t, "开始" | "start" | "Start" | "START") || t.starts_with("def ")
}

pub fn is_true_label(label: &str) -> bool {
    matches!(
        label.trim(),
        "是" | "真" | "true" | "True" | "yes" | "Yes" | "Y" | "T"
    )
}

pub fn is_false_label(label: &str) -> bool {
    matches!(
        label.trim(),
        "否" | "假" | "false" | "False" | "no" | "No" | "N" | "F"
    )
}

// ─── FlowEdge ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default = "default_from_port")]
    pub from_port: Port,
    #[serde(default = "default_to_port")]
    pub to_port: Port,
    #[serde(default)]
    pub style: EdgeStyle,
    /// Routed polyline, filled in by the layout engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchors: Option<Vec<Point>>,
}

fn default_from_port() -> Port {
    Port::Bottom
}

fn default_to_port() -> Port {
    Port::Top
}

impl FlowEdge {
    pub fn new(id: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            label: None,
            from_port: Port::Bottom,
            to_port: Port::Top,
            style: EdgeStyle::Forward,
            anchors: None,
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    pub fn with_style(mut self, style: EdgeStyle) -> Self {
        self.style = style;
        self
    }
}

// ─── FlowGraph ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a FlowEdge> + 'a {
        self.edges.iter().filter(move |e| e.to == id)
    }

    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a FlowEdge> + 'a {
        self.edges.iter().filter(move |e| e.from == id)
    }

    pub fn nodes_with_shape(&self, shape: Shape) -> impl Iterator<Item = &FlowNode> {
        self.nodes.iter().filter(move |n| n.shape == shape)
    }
}

#[cfg(test)]
#[path = "../../tests/rust/test_flow_types.rs"]
mod tests;
