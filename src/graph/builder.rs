//! Graph construction module

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::graph::AdjacencyGraph;
use crate::similarity::SimilarityMatrix;

/// Mean of every off-diagonal entry; needs at least two entities
pub fn mean_off_diagonal(matrix: &SimilarityMatrix) -> AnalysisResult<f64> {
    let n = matrix.len();
    if n < 2 {
        return Err(AnalysisError::EmptyInput("off-diagonal pairs"));
    }

    let sum: f64 = (0..n)
        .into_par_iter()
        .map(|i| (0..n).filter(|&j| j != i).map(|j| matrix.get(i, j)).sum::<f64>())
        .sum();

    Ok(sum / (n * (n - 1)) as f64)
}

/// Adjacency graph together with the threshold that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdGraph {
    pub threshold: f64,
    pub graph: AdjacencyGraph,
}

/// Turns a dense similarity matrix into an unweighted graph: `{i, j}` is an
/// edge iff `i != j` and `S(i, j)` is strictly above the threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdGraphBuilder {
    /// Fixed threshold; the matrix's off-diagonal mean when unset
    threshold: Option<f64>,
}

impl ThresholdGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed threshold instead of the off-diagonal mean
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn build(&self, matrix: &SimilarityMatrix) -> AnalysisResult<ThresholdGraph> {
        let threshold = match self.threshold {
            Some(threshold) => threshold,
            None => mean_off_diagonal(matrix)?,
        };
        log::info!(
            "Building threshold graph over {} entities (threshold {:.6})",
            matrix.len(),
            threshold
        );

        let n = matrix.len();
        let adjacency_lists: Vec<Vec<u32>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .filter(|&j| j != i && matrix.get(i, j) > threshold)
                    .map(|j| j as u32)
                    .collect()
            })
            .collect();

        let graph = AdjacencyGraph::from_adjacency_lists(matrix.ids().to_vec(), adjacency_lists);
        log::info!(
            "Threshold graph has {} edges ({} bytes)",
            graph.edge_count(),
            graph.memory_usage()
        );

        Ok(ThresholdGraph { threshold, graph })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("w{}", i)).collect()
    }

    #[test]
    fn mean_excludes_the_diagonal() {
        let matrix = SimilarityMatrix::from_values(
            ids(3),
            array![[9.0, 0.2, 0.4], [0.2, 9.0, 0.6], [0.4, 0.6, 9.0]],
        )
        .unwrap();
        assert!((mean_off_diagonal(&matrix).unwrap() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn single_entity_has_no_mean() {
        let matrix = SimilarityMatrix::from_values(ids(1), array![[1.0]]).unwrap();
        assert_eq!(mean_off_diagonal(&matrix), Err(AnalysisError::EmptyInput("off-diagonal pairs")));
    }

    #[test]
    fn uniform_matrix_has_no_edges() {
        let matrix = SimilarityMatrix::from_values(
            ids(3),
            array![[1.0, 0.5, 0.5], [0.5, 1.0, 0.5], [0.5, 0.5, 1.0]],
        )
        .unwrap();
        let built = ThresholdGraphBuilder::new().build(&matrix).unwrap();
        assert_eq!(built.threshold, 0.5);
        assert_eq!(built.graph.edge_count(), 0);
    }

    #[test]
    fn edges_are_strictly_above_threshold_and_loop_free() {
        let matrix = SimilarityMatrix::from_values(
            ids(4),
            array![
                [1.0, 0.9, 0.1, -0.3],
                [0.9, 1.0, 0.5, 0.0],
                [0.1, 0.5, 1.0, 0.7],
                [-0.3, 0.0, 0.7, 1.0],
            ],
        )
        .unwrap();
        // mean off-diagonal = 1.9 / 6, just above 0.3
        let built = ThresholdGraphBuilder::new().build(&matrix).unwrap();
        let graph = &built.graph;
        assert_eq!(graph.edge_pairs().collect::<Vec<_>>(), vec![(0, 1), (1, 2), (2, 3)]);
        for node in 0..4 {
            assert!(!graph.has_edge(node, node as u32));
            assert!(graph.degree(node) <= 3);
            for &other in graph.neighbors(node) {
                assert!(graph.has_edge(other as usize, node as u32));
            }
        }
    }

    #[test]
    fn fixed_threshold_overrides_mean() {
        let matrix = SimilarityMatrix::from_values(
            ids(3),
            array![[1.0, 0.5, 0.5], [0.5, 1.0, 0.5], [0.5, 0.5, 1.0]],
        )
        .unwrap();
        let built = ThresholdGraphBuilder::new().with_threshold(0.4).build(&matrix).unwrap();
        assert_eq!(built.graph.edge_count(), 3);
    }
}
