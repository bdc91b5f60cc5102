//! Cluster quality metrics

use serde::{Deserialize, Serialize};

use crate::cluster::{Clustering, Partition};
use crate::error::{AnalysisError, AnalysisResult};
use crate::similarity::SimilarityMatrix;

/// Aggregate quality of one partition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterScores {
    /// Sum over entities of the similarity to their own medoid
    pub similarity_sum: f64,

    /// Mean similarity of an entity to its own medoid
    pub similarity_avg: f64,

    /// Sum over entities of `1 - similarity` to their own medoid
    pub distance_sum: f64,

    /// Mean distance of an entity to its own medoid
    pub distance_avg: f64,

    /// Mean, over entities, of the average distance to every other cluster's medoid
    pub inter_cluster_distance_avg: f64,
}

impl ClusterScores {
    /// Euclidean distance of `(inter_cluster_distance_avg, similarity_avg)`
    /// from the ideal point `(1, 1)`
    pub fn balance_distance(&self) -> f64 {
        ((1.0 - self.similarity_avg).powi(2) + (1.0 - self.inter_cluster_distance_avg).powi(2)).sqrt()
    }
}

/// Score a partition against its medoids
pub fn score(
    partition: &Partition,
    medoids: &[usize],
    matrix: &SimilarityMatrix,
) -> AnalysisResult<ClusterScores> {
    let n = partition.entity_count();
    if n == 0 {
        return Err(AnalysisError::EmptyInput("partition"));
    }
    if n != matrix.len() {
        return Err(AnalysisError::InvalidMatrix(format!(
            "partition covers {} entities but the matrix has {}",
            n,
            matrix.len()
        )));
    }
    if medoids.len() != partition.k() {
        return Err(AnalysisError::InvalidMedoids(format!(
            "expected {} medoids, got {}",
            partition.k(),
            medoids.len()
        )));
    }

    let own_medoid = |entity: usize| medoids[partition.cluster_of(entity)];

    let similarity_sum: f64 = (0..n).map(|e| matrix.get(e, own_medoid(e))).sum();
    let distance_sum: f64 = (0..n).map(|e| 1.0 - matrix.get(e, own_medoid(e))).sum();

    let other_clusters = partition.k().saturating_sub(1);
    let inter_cluster_distance_avg = if other_clusters == 0 {
        0.0
    } else {
        let total: f64 = (0..n)
            .map(|e| {
                let own = partition.cluster_of(e);
                medoids
                    .iter()
                    .enumerate()
                    .filter(|&(cluster, _)| cluster != own)
                    .map(|(_, &m)| 1.0 - matrix.get(e, m))
                    .sum::<f64>()
                    / other_clusters as f64
            })
            .sum();
        total / n as f64
    };

    Ok(ClusterScores {
        similarity_sum,
        similarity_avg: similarity_sum / n as f64,
        distance_sum,
        distance_avg: distance_sum / n as f64,
        inter_cluster_distance_avg,
    })
}

/// Score a finished clustering run
pub fn score_clustering(clustering: &Clustering, matrix: &SimilarityMatrix) -> AnalysisResult<ClusterScores> {
    score(&clustering.partition, &clustering.medoids, matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::SimilarityKind;
    use ndarray::array;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| i.to_string()).collect()
    }

    #[test]
    fn separated_blocks_score_perfectly() {
        let vectors = vec![vec![1, 1, 0, 0], vec![1, 1, 0, 0], vec![0, 0, 1, 1], vec![0, 0, 1, 1]];
        let matrix =
            SimilarityMatrix::build_with_kind(ids(4), &vectors, SimilarityKind::NormalizedJaccard).unwrap();
        let partition = Partition::from_assignments(vec![0, 0, 1, 1], 2);

        let scores = score(&partition, &[0, 2], &matrix).unwrap();
        assert_eq!(scores.similarity_avg, 1.0);
        assert_eq!(scores.distance_avg, 0.0);
        assert_eq!(scores.inter_cluster_distance_avg, 1.0);
        assert_eq!(scores.balance_distance(), 0.0);
    }

    #[test]
    fn similarity_and_distance_sum_to_one_for_jaccard() {
        let vectors = vec![
            vec![1, 0, 1, 1, 0, 0],
            vec![1, 1, 1, 0, 0, 0],
            vec![0, 0, 1, 1, 1, 0],
            vec![0, 1, 0, 0, 1, 1],
            vec![1, 0, 0, 0, 1, 1],
        ];
        for kind in [SimilarityKind::NormalizedJaccard, SimilarityKind::Jaccard] {
            let matrix = SimilarityMatrix::build_with_kind(ids(5), &vectors, kind).unwrap();
            let partition = Partition::from_assignments(vec![0, 0, 1, 2, 2], 3);
            let scores = score(&partition, &[1, 2, 4], &matrix).unwrap();
            assert!((scores.similarity_avg + scores.distance_avg - 1.0).abs() < 1e-12);
            assert!((scores.similarity_sum + scores.distance_sum - 5.0).abs() < 1e-12);
        }
    }

    #[test]
    fn inter_cluster_distance_averages_other_medoids() {
        let values = array![
            [1.0, 0.8, 0.2, 0.4],
            [0.8, 1.0, 0.6, 0.0],
            [0.2, 0.6, 1.0, 0.5],
            [0.4, 0.0, 0.5, 1.0],
        ];
        let matrix = SimilarityMatrix::from_values(ids(4), values).unwrap();
        let partition = Partition::from_assignments(vec![0, 0, 1, 2], 3);
        let scores = score(&partition, &[0, 2, 3], &matrix).unwrap();

        // own-medoid similarities: 1.0, 0.8, 1.0, 1.0
        assert!((scores.similarity_avg - 0.95).abs() < 1e-12);
        // entity 0: (0.8 + 0.6) / 2, entity 1: (0.4 + 1.0) / 2,
        // entity 2: (0.8 + 0.5) / 2, entity 3: (0.6 + 0.5) / 2
        let expected = (0.7 + 0.7 + 0.65 + 0.55) / 4.0;
        assert!((scores.inter_cluster_distance_avg - expected).abs() < 1e-12);
    }

    #[test]
    fn distance_is_computed_independently_for_signed_scores() {
        let values = array![[1.0, -0.5], [-0.5, 1.0]];
        let matrix = SimilarityMatrix::from_values(ids(2), values).unwrap();
        let partition = Partition::from_assignments(vec![0, 0], 1);
        let scores = score(&partition, &[0], &matrix).unwrap();
        assert_eq!(scores.similarity_avg, 0.25);
        assert_eq!(scores.distance_avg, 0.75);
        assert_eq!(scores.inter_cluster_distance_avg, 0.0);
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let matrix = SimilarityMatrix::from_values(ids(2), array![[1.0, 0.0], [0.0, 1.0]]).unwrap();
        let partition = Partition::from_assignments(vec![0, 1], 2);
        assert!(score(&partition, &[0], &matrix).is_err());
        let short = Partition::from_assignments(vec![0], 1);
        assert!(score(&short, &[0], &matrix).is_err());
    }
}
