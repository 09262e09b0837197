//! Linear execution planning.
//!
//! A workflow executes as one strictly ordered sequence; this module
//! turns the stored graph into that sequence.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use crate::{
    Result, SeqflowError,
    model::{ConnectionModel, NodeModel},
};

/// Compute the execution order of a workflow's nodes.
///
/// Rules:
/// - no connections at all: the nodes come back in their given order;
/// - otherwise every node becomes a vertex (isolated nodes included,
///   so they survive the sort) and every connection an edge, and the
///   topological order of that graph is the execution order;
/// - a cycle aborts with [`SeqflowError::CyclicGraph`] before anything
///   executes;
/// - each node appears at most once however many connections touch it;
/// - connection endpoints naming unknown ids still take part in the
///   ordering and drop out of the result.
///
/// The order is deterministic for identical input.
pub fn execution_order(
    nodes: Vec<NodeModel>,
    connections: &[ConnectionModel],
) -> Result<Vec<NodeModel>> {
    if connections.is_empty() {
        return Ok(nodes);
    }

    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut indices: HashMap<String, NodeIndex> = HashMap::new();
    let mut by_id: HashMap<String, NodeModel> = HashMap::new();

    for node in nodes {
        if !indices.contains_key(&node.id) {
            let index = graph.add_node(node.id.clone());
            indices.insert(node.id.clone(), index);
            by_id.insert(node.id.clone(), node);
        }
    }

    for connection in connections {
        let from = vertex(&mut graph, &mut indices, &connection.from_node_id);
        let to = vertex(&mut graph, &mut indices, &connection.to_node_id);
        graph.add_edge(from, to, ());
    }

    let sorted = petgraph::algo::toposort(&graph, None)
        .map_err(|_| SeqflowError::CyclicGraph("Workflow contains a cycle".to_string()))?;

    Ok(sorted
        .into_iter()
        .filter_map(|index| by_id.remove(&graph[index]))
        .collect())
}

fn vertex(
    graph: &mut DiGraph<String, ()>,
    indices: &mut HashMap<String, NodeIndex>,
    id: &str,
) -> NodeIndex {
    match indices.get(id) {
        Some(index) => *index,
        None => {
            let index = graph.add_node(id.to_string());
            indices.insert(id.to_string(), index);
            index
        }
    }
}
