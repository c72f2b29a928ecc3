//! FlowGraphIR: a petgraph view over a `FlowGraph` for layout and analysis.
//!
//! Node and edge weights point back into the flow graph by index, so the view
//! is cheap to build and never owns titles or routes.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::Direction as PgDirection;
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::flow::types::{FlowGraph, Shape};

/// Node weight: position of the node in `FlowGraph::nodes`.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub id: String,
    pub shape: Shape,
    pub index: usize,
}

/// Edge weight: position of the edge in `FlowGraph::edges`.
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub id: String,
    pub index: usize,
}

pub struct FlowGraphIR {
    pub digraph: DiGraph<NodeData, EdgeData>,
    /// Maps node id → petgraph NodeIndex.
    pub node_index: HashMap<String, NodeIndex>,
}

impl FlowGraphIR {
    /// Build the view; edges whose endpoints are missing are skipped.
    pub fn from_flow(graph: &FlowGraph) -> Self {
        let mut digraph: DiGraph<NodeData, EdgeData> = DiGraph::new();
        let mut node_index: HashMap<String, NodeIndex> = HashMap::new();

        for (i, node) in graph.nodes.iter().enumerate() {
            if node_index.contains_key(&node.id) {
                continue;
            }
            let idx = digraph.add_node(NodeData {
                id: node.id.clone(),
                shape: node.shape,
                index: i,
            });
            node_index.insert(node.id.clone(), idx);
        }
        for (i, edge) in graph.edges.iter().enumerate() {
            let (Some(&from), Some(&to)) = (node_index.get(&edge.from), node_index.get(&edge.to))
            else {
                continue;
            };
            digraph.add_edge(
                from,
                to,
                EdgeData {
                    id: edge.id.clone(),
                    index: i,
                },
            );
        }
        Self {
            digraph,
            node_index,
        }
    }

    pub fn node_count(&self) -> usize {
        self.digraph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.digraph.edge_count()
    }

    pub fn is_dag(&self) -> bool {
        !is_cyclic_directed(&self.digraph)
    }

    pub fn topological_order(&self) -> Option<Vec<String>> {
        toposort(&self.digraph, None).ok().map(|order| {
            order
                .into_iter()
                .map(|idx| self.digraph[idx].id.clone())
                .collect()
        })
    }

    pub fn in_degree(&self, id: &str) -> usize {
        self.node_index.get(id).map_or(0, |&idx| {
            self.digraph
                .edges_directed(idx, PgDirection::Incoming)
                .count()
        })
    }

    pub fn out_degree(&self, id: &str) -> usize {
        self.node_index.get(id).map_or(0, |&idx| {
            self.digraph
                .edges_directed(idx, PgDirection::Outgoing)
                .count()
        })
    }

    /// Outgoing edges of `idx` in flow-graph edge order.
    fn ordered_out_edges(&self, idx: NodeIndex) -> Vec<(EdgeIndex, NodeIndex)> {
        let mut out: Vec<(usize, EdgeIndex, NodeIndex)> = self
            .digraph
            .edges_directed(idx, PgDirection::Outgoing)
            .map(|e| (e.weight().index, e.id(), e.target()))
            .collect();
        out.sort_by_key(|(i, _, _)| *i);
        out.into_iter().map(|(_, e, t)| (e, t)).collect()
    }

    /// BFS hop distance from `entry` to every reachable node id.
    pub fn bfs_distances(&self, entry: &str) -> HashMap<String, usize> {
        let mut dist: HashMap<String, usize> = HashMap::new();
        let Some(&start) = self.node_index.get(entry) else {
            return dist;
        };
        let mut queue = VecDeque::from([(start, 0usize)]);
        dist.insert(entry.to_string(), 0);
        while let Some((idx, d)) = queue.pop_front() {
            for (_, next) in self.ordered_out_edges(idx) {
                let id = &self.digraph[next].id;
                if !dist.contains_key(id) {
                    dist.insert(id.clone(), d + 1);
                    queue.push_back((next, d + 1));
                }
            }
        }
        dist
    }

    /// Loop-closing edges reachable from `entry`, by flow-graph edge index.
    ///
    /// An edge is a back-edge when `dist(to) <= dist(from)` and it returns
    /// to a node still on the depth-first stack, so merge edges that only
    /// tie on distance stay forward.
    pub fn back_edges(&self, entry: &str) -> HashSet<usize> {
        let mut back = HashSet::new();
        let Some(&start) = self.node_index.get(entry) else {
            return back;
        };
        let dist = self.bfs_distances(entry);
        let distance = |idx: NodeIndex| dist.get(&self.digraph[idx].id).copied();

        let mut on_stack: HashSet<NodeIndex> = HashSet::new();
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        // Explicit DFS stack of (node, its ordered out-edges, next position).
        let mut stack: Vec<(NodeIndex, Vec<(EdgeIndex, NodeIndex)>, usize)> =
            vec![(start, self.ordered_out_edges(start), 0)];
        visited.insert(start);
        on_stack.insert(start);

        while let Some((node, edges, pos)) = stack.last_mut() {
            let node = *node;
            let Some(&(edge, target)) = edges.get(*pos) else {
                on_stack.remove(&node);
                stack.pop();
                continue;
            };
            *pos += 1;
            if on_stack.contains(&target) {
                if let (Some(dt), Some(df)) = (distance(target), distance(node)) {
                    if dt <= df {
                        back.insert(self.digraph[edge].index);
                    }
                }
            } else if visited.insert(target) {
                on_stack.insert(target);
                stack.push((target, self.ordered_out_edges(target), 0));
            }
        }
        back
    }
}

#[cfg(test)]
#[path = "../../tests/rust/test_layout_graph.rs"]
mod tests;
