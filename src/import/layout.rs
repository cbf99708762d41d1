//! Auxiliary layout graph and the layout-engine seam.
//!
//! The importer records every created node and edge here, hands the graph to
//! a [`LayoutEngine`], and copies the computed coordinates back onto the
//! real nodes. [`LayeredLayout`] is the built-in left-to-right engine; a
//! host may substitute its own.

use std::collections::HashMap;

use crate::graph::NodeId;

#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub id: NodeId,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Default)]
pub struct LayoutGraph {
    nodes: Vec<LayoutNode>,
    index: HashMap<NodeId, usize>,
    edges: Vec<(NodeId, NodeId)>,
    /// Bounding box of the laid-out nodes, filled by the engine.
    pub width: f64,
    pub height: f64,
}

impl LayoutGraph {
    pub fn new() -> Self {
        LayoutGraph::default()
    }

    pub fn add_node(&mut self, id: NodeId, width: f64, height: f64) {
        self.index.insert(id, self.nodes.len());
        self.nodes.push(LayoutNode {
            id,
            width,
            height,
            x: 0.0,
            y: 0.0,
        });
    }

    /// Directed edge from a producer to its consumer.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.edges.push((from, to));
    }

    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&LayoutNode> {
        self.index.get(&id).map(|i| &self.nodes[*i])
    }
}

pub trait LayoutEngine: Send {
    /// Assign coordinates to every node and fill the graph bounds.
    fn layout(&self, graph: &mut LayoutGraph);
}

/// Simple layered left-to-right placement: nodes are ranked by their longest
/// path from a source, ranks become columns, and nodes stack downwards
/// within each column.
#[derive(Debug, Clone)]
pub struct LayeredLayout {
    pub node_sep: f64,
    pub rank_sep: f64,
    pub margin: f64,
}

impl Default for LayeredLayout {
    fn default() -> Self {
        LayeredLayout {
            node_sep: 30.0,
            rank_sep: 60.0,
            margin: 40.0,
        }
    }
}

impl LayoutEngine for LayeredLayout {
    fn layout(&self, graph: &mut LayoutGraph) {
        if graph.nodes.is_empty() {
            graph.width = 0.0;
            graph.height = 0.0;
            return;
        }

        let ranks = compute_ranks(graph);
        let max_rank = ranks.values().copied().max().unwrap_or(0);

        // Column widths, then x offsets.
        let mut column_width = vec![0.0f64; max_rank + 1];
        for node in &graph.nodes {
            let rank = ranks[&node.id];
            column_width[rank] = column_width[rank].max(node.width);
        }
        let mut column_x = vec![0.0f64; max_rank + 1];
        let mut x = self.margin;
        for (rank, width) in column_width.iter().enumerate() {
            column_x[rank] = x;
            x += width + self.rank_sep;
        }

        let mut column_y = vec![self.margin; max_rank + 1];
        let mut max_y = 0.0f64;
        for node in &mut graph.nodes {
            let rank = ranks[&node.id];
            node.x = column_x[rank];
            node.y = column_y[rank];
            column_y[rank] += node.height + self.node_sep;
            max_y = max_y.max(node.y + node.height);
        }

        graph.width = x - self.rank_sep + self.margin;
        graph.height = max_y + self.margin;
    }
}

/// Longest-path ranks; a node's rank is one past its furthest producer.
/// Nodes on a cycle (cannot happen for imported trees) keep rank zero.
fn compute_ranks(graph: &LayoutGraph) -> HashMap<NodeId, usize> {
    let mut incoming: HashMap<NodeId, usize> = graph.nodes.iter().map(|n| (n.id, 0)).collect();
    for (_, to) in &graph.edges {
        if let Some(count) = incoming.get_mut(to) {
            *count += 1;
        }
    }

    let mut ranks: HashMap<NodeId, usize> = graph.nodes.iter().map(|n| (n.id, 0)).collect();
    let mut queue: Vec<NodeId> = incoming
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(id, _)| *id)
        .collect();
    queue.sort_unstable();

    while let Some(id) = queue.pop() {
        for (from, to) in &graph.edges {
            if *from != id || !ranks.contains_key(to) {
                continue;
            }
            let candidate = ranks[&id] + 1;
            if candidate > ranks[to] {
                ranks.insert(*to, candidate);
            }
            if let Some(count) = incoming.get_mut(to) {
                *count -= 1;
                if *count == 0 {
                    queue.push(*to);
                }
            }
        }
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_lays_out_left_to_right() {
        let mut graph = LayoutGraph::new();
        graph.add_node(1, 160.0, 80.0);
        graph.add_node(2, 160.0, 80.0);
        graph.add_node(3, 160.0, 60.0);
        graph.add_edge(1, 2);
        graph.add_edge(2, 3);

        LayeredLayout::default().layout(&mut graph);

        let (a, b, c) = (
            graph.node(1).unwrap(),
            graph.node(2).unwrap(),
            graph.node(3).unwrap(),
        );
        assert!(a.x < b.x && b.x < c.x);
        assert!(graph.width > 0.0 && graph.height > 0.0);
    }

    #[test]
    fn siblings_stack_in_one_column() {
        let mut graph = LayoutGraph::new();
        graph.add_node(1, 160.0, 80.0);
        graph.add_node(2, 160.0, 80.0);
        graph.add_node(3, 160.0, 60.0);
        graph.add_edge(1, 3);
        graph.add_edge(2, 3);

        LayeredLayout::default().layout(&mut graph);

        let (a, b) = (graph.node(1).unwrap(), graph.node(2).unwrap());
        assert_eq!(a.x, b.x);
        assert_ne!(a.y, b.y);
    }
}
