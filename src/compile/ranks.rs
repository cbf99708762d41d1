//! Dependency ranks over the live graph.
//!
//! Producers always finish before any direct consumer starts; nodes within
//! one rank have no dependency between them and may execute concurrently.
//! The live graph is cyclic-capable, so a repeated visit is rejected here
//! rather than assumed away.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::graph::{EditorGraph, NodeId};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("the workflow graph contains a cycle")]
pub struct CycleError;

/// Nodes grouped by topological depth, producers first. Node order within a
/// rank follows node ids for determinism; execution order within a rank is
/// unspecified anyway.
pub fn execution_ranks(graph: &EditorGraph) -> Result<Vec<Vec<NodeId>>, CycleError> {
    let mut digraph: DiGraph<NodeId, ()> = DiGraph::new();
    let mut indices: HashMap<NodeId, NodeIndex> = HashMap::new();

    for id in graph.node_ids() {
        indices.insert(id, digraph.add_node(id));
    }
    for link in graph.links() {
        digraph.add_edge(indices[&link.from], indices[&link.to], ());
    }

    let mut in_degree: HashMap<NodeIndex, usize> = digraph
        .node_indices()
        .map(|idx| (idx, digraph.neighbors_directed(idx, Direction::Incoming).count()))
        .collect();

    let mut ranks = Vec::new();
    let mut placed = 0usize;
    let mut current: Vec<NodeIndex> = in_degree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(idx, _)| *idx)
        .collect();

    while !current.is_empty() {
        current.sort_by_key(|idx| digraph[*idx]);
        placed += current.len();
        let mut next = Vec::new();
        for idx in &current {
            for successor in digraph.neighbors_directed(*idx, Direction::Outgoing) {
                let degree = in_degree
                    .get_mut(&successor)
                    .expect("successor was added to the degree map");
                *degree -= 1;
                if *degree == 0 {
                    next.push(successor);
                }
            }
        }
        ranks.push(current.iter().map(|idx| digraph[*idx]).collect());
        current = next;
    }

    if placed != digraph.node_count() {
        return Err(CycleError);
    }
    Ok(ranks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory;
    use crate::schema::model::{OperatorSchema, OutputType, PinType, SourceSchema};
    use std::sync::Arc;

    fn chain_defs() -> (Arc<crate::factory::BlockDefinition>, Arc<crate::factory::BlockDefinition>) {
        let producer = Arc::new(factory::build(&Arc::new(OperatorSchema::new(
            "Producer".into(),
            None,
            None,
            None,
            vec![],
            vec![],
            vec![],
            vec![],
            OutputType::Static(PinType::new("raster")),
        ))));
        let consumer = Arc::new(factory::build(&Arc::new(OperatorSchema::new(
            "Consumer".into(),
            None,
            None,
            None,
            vec![],
            vec![],
            vec![(
                "raster".into(),
                SourceSchema {
                    pin_type: PinType::new("raster"),
                    inner_type: None,
                },
            )],
            vec!["raster".into()],
            OutputType::Static(PinType::new("raster")),
        ))));
        (producer, consumer)
    }

    #[test]
    fn producers_rank_before_consumers() {
        let (producer, consumer) = chain_defs();
        let mut graph = EditorGraph::new();
        let a = graph.add_operator_block(&producer);
        let b = graph.add_operator_block(&producer);
        let c = graph.add_operator_block(&consumer);
        graph.connect(a, c, "raster").unwrap();

        let ranks = execution_ranks(&graph).unwrap();
        assert_eq!(ranks, vec![vec![a, b], vec![c]]);
    }

    #[test]
    fn cycles_are_rejected() {
        let (_, consumer) = chain_defs();
        let mut graph = EditorGraph::new();
        let a = graph.add_operator_block(&consumer);
        let b = graph.add_operator_block(&consumer);
        graph.connect(a, b, "raster").unwrap();
        graph.connect(b, a, "raster").unwrap();

        assert_eq!(execution_ranks(&graph), Err(CycleError));
    }
}
