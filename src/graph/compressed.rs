//! Memory-efficient undirected graph representation

use std::mem;

use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

/// Compressed sparse representation of an unweighted, undirected, loop-free graph.
///
/// Every edge `{a, b}` is stored twice, once in the adjacency list of each
/// endpoint, and adjacency lists are sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyGraph {
    /// Number of nodes in the graph
    pub node_count: usize,

    /// Offset array: index where each node's neighbors begin
    /// offsets[i] to offsets[i+1] defines the neighbor range for node i
    pub offsets: Vec<u32>,

    /// Neighbor array: concatenated, sorted neighbor lists
    pub edges: Vec<u32>,

    /// Entity id of each node
    pub node_ids: Vec<String>,
}

impl AdjacencyGraph {
    /// Build from per-node neighbor lists; lists are sorted and deduplicated
    pub fn from_adjacency_lists(node_ids: Vec<String>, mut adjacency_lists: Vec<Vec<u32>>) -> Self {
        let node_count = adjacency_lists.len();
        let edge_count: usize = adjacency_lists.iter().map(|list| list.len()).sum();

        let mut offsets = Vec::with_capacity(node_count + 1);
        let mut edges = Vec::with_capacity(edge_count);
        offsets.push(0);

        for list in &mut adjacency_lists {
            // Sort for binary search efficiency
            list.sort_unstable();
            list.dedup();
            edges.extend_from_slice(list);
            offsets.push(edges.len() as u32);
        }

        Self {
            node_count,
            offsets,
            edges,
            node_ids,
        }
    }

    /// Neighbors of a node
    pub fn neighbors(&self, node: usize) -> &[u32] {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        &self.edges[start..end]
    }

    /// Check if there's an edge between two nodes
    pub fn has_edge(&self, a: usize, b: u32) -> bool {
        self.neighbors(a).binary_search(&b).is_ok()
    }

    /// Number of edges incident to a node
    pub fn degree(&self, node: usize) -> usize {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        end - start
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.edges.len() / 2
    }

    /// Each undirected edge once, as `(smaller, larger)` node indices
    pub fn edge_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.node_count).flat_map(move |a| {
            self.neighbors(a)
                .iter()
                .map(|&b| b as usize)
                .filter(move |&b| a < b)
                .map(move |b| (a, b))
        })
    }

    /// Node-induced subgraph keeping the given nodes, in the given order
    pub fn subgraph(&self, nodes: &[usize]) -> Self {
        let mut orig_to_sub = vec![u32::MAX; self.node_count];
        for (i, &node) in nodes.iter().enumerate() {
            orig_to_sub[node] = i as u32;
        }

        let adjacency_lists = nodes
            .iter()
            .map(|&node| {
                self.neighbors(node)
                    .iter()
                    .map(|&n| orig_to_sub[n as usize])
                    .filter(|&n| n != u32::MAX)
                    .collect()
            })
            .collect();

        let node_ids = nodes.iter().map(|&n| self.node_ids[n].clone()).collect();
        Self::from_adjacency_lists(node_ids, adjacency_lists)
    }

    /// Convert to a petgraph graph weighted by node id, for export
    pub fn to_petgraph(&self) -> UnGraph<String, ()> {
        let mut graph = UnGraph::with_capacity(self.node_count, self.edge_count());
        let indices: Vec<NodeIndex> = self.node_ids.iter().map(|id| graph.add_node(id.clone())).collect();
        for (a, b) in self.edge_pairs() {
            graph.add_edge(indices[a], indices[b], ());
        }
        graph
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        let base = mem::size_of::<Self>();
        let offsets = self.offsets.capacity() * mem::size_of::<u32>();
        let edges = self.edges.capacity() * mem::size_of::<u32>();
        let ids = self.node_ids.iter().map(|s| s.capacity()).sum::<usize>();

        base + offsets + edges + ids
    }
}
