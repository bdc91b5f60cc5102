//! Graph algorithms for analysis

use serde::{Deserialize, Serialize};

use crate::data::FeatureTable;
use crate::error::{AnalysisError, AnalysisResult};
use crate::graph::builder::ThresholdGraphBuilder;
use crate::graph::AdjacencyGraph;
use crate::similarity::SimilarityMatrix;

/// Normalized degree of every node, `degree / (N - 1)`, in node order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegreeCentrality {
    node_ids: Vec<String>,
    values: Vec<f64>,
}

impl DegreeCentrality {
    /// A graph with fewer than two nodes has centrality 0 everywhere
    pub fn compute(graph: &AdjacencyGraph) -> Self {
        let others = graph.node_count.saturating_sub(1);
        let values = (0..graph.node_count)
            .map(|node| {
                if others == 0 {
                    0.0
                } else {
                    graph.degree(node) as f64 / others as f64
                }
            })
            .collect();

        Self {
            node_ids: graph.node_ids.clone(),
            values,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        let node = self.node_ids.iter().position(|n| n == id)?;
        Some(self.values[node])
    }

    /// `(id, centrality)` pairs in node order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.node_ids
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// The `count` most central nodes, highest first. Equal centralities keep
    /// node order.
    pub fn hubs(&self, count: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.values.len()).collect();
        order.sort_by(|&a, &b| self.values[b].total_cmp(&self.values[a]));
        order.truncate(count);
        order
    }
}

/// Ego network of a hub: the hub plus every node adjacent to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub hub: usize,
    pub hub_id: String,

    /// Node indices, ascending, hub included
    pub members: Vec<usize>,
    pub member_ids: Vec<String>,
}

impl Community {
    pub fn around(graph: &AdjacencyGraph, hub: usize) -> Self {
        let mut members: Vec<usize> = graph.neighbors(hub).iter().map(|&n| n as usize).collect();
        members.push(hub);
        members.sort_unstable();

        Self {
            hub,
            hub_id: graph.node_ids[hub].clone(),
            member_ids: members.iter().map(|&m| graph.node_ids[m].clone()).collect(),
            members,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Share of members carrying each feature of `features`
    pub fn annotate(&self, features: &FeatureTable) -> AnalysisResult<Vec<CommunityAnnotation>> {
        features
            .names()
            .iter()
            .map(|feature| {
                let mut count = 0;
                for id in &self.member_ids {
                    let flagged = features
                        .flag(id, feature)
                        .ok_or_else(|| AnalysisError::UnknownEntity(id.clone()))?;
                    if flagged {
                        count += 1;
                    }
                }
                Ok(CommunityAnnotation {
                    feature: feature.clone(),
                    count,
                    percentage: 100.0 * count as f64 / self.len() as f64,
                })
            })
            .collect()
    }
}

/// How many members of a community carry one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityAnnotation {
    pub feature: String,
    pub count: usize,
    pub percentage: f64,
}

/// For each node, the number of communities it joins as a hub neighbour
pub fn membership_counts(graph: &AdjacencyGraph, communities: &[Community]) -> Vec<usize> {
    let mut counts = vec![0; graph.node_count];
    for community in communities {
        for &member in &community.members {
            if member != community.hub {
                counts[member] += 1;
            }
        }
    }
    counts
}

/// Complete network analysis of one similarity matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphAnalysis {
    pub threshold: f64,
    pub graph: AdjacencyGraph,
    pub centrality: DegreeCentrality,
    pub hubs: Vec<usize>,
    pub communities: Vec<Community>,
    pub membership_counts: Vec<usize>,

    /// One list per community, in community order, when features were given
    pub annotations: Option<Vec<Vec<CommunityAnnotation>>>,
}

impl GraphAnalysis {
    pub fn run(
        matrix: &SimilarityMatrix,
        builder: &ThresholdGraphBuilder,
        hub_count: usize,
        features: Option<&FeatureTable>,
    ) -> AnalysisResult<Self> {
        let built = builder.build(matrix)?;
        let graph = built.graph;

        let centrality = DegreeCentrality::compute(&graph);
        let hubs = centrality.hubs(hub_count);
        for &hub in &hubs {
            log::debug!(
                "Hub {} with centrality {:.4}",
                graph.node_ids[hub],
                centrality.values()[hub]
            );
        }

        let communities: Vec<Community> = hubs.iter().map(|&hub| Community::around(&graph, hub)).collect();
        let membership_counts = membership_counts(&graph, &communities);

        let annotations = match features {
            Some(features) => Some(
                communities
                    .iter()
                    .map(|community| community.annotate(features))
                    .collect::<AnalysisResult<Vec<_>>>()?,
            ),
            None => None,
        };

        log::info!(
            "Found {} communities around hubs, sizes {:?}",
            communities.len(),
            communities.iter().map(Community::len).collect::<Vec<_>>()
        );

        Ok(Self {
            threshold: built.threshold,
            graph,
            centrality,
            hubs,
            communities,
            membership_counts,
            annotations,
        })
    }

    /// Nodes with at least one edge
    pub fn connected_nodes(&self) -> Vec<usize> {
        (0..self.graph.node_count)
            .filter(|&node| self.graph.degree(node) > 0)
            .collect()
    }
}
