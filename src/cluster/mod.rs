//! Cluster analysis module

pub mod medoids;
pub mod metrics;
pub mod search;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::similarity::SimilarityMatrix;

pub use medoids::{circular_argmax, MedoidClusterer};
pub use metrics::{score, score_clustering, ClusterScores};
pub use search::{Criterion, MedoidSearch, RunRecord, SearchOutcome};

/// Assignment of every entity (matrix index) to one of `k` clusters.
///
/// Stored as one cluster index per entity, so the clusters are disjoint and
/// cover every entity by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    k: usize,
    assignments: Vec<usize>,
}

impl Partition {
    /// Build from a per-entity cluster index; every index must be below `k`
    pub fn from_assignments(assignments: Vec<usize>, k: usize) -> Self {
        debug_assert!(assignments.iter().all(|&c| c < k));
        Self { k, assignments }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn entity_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }

    pub fn cluster_of(&self, entity: usize) -> usize {
        self.assignments[entity]
    }

    /// Members of each cluster, in entity order
    pub fn clusters(&self) -> Vec<Vec<usize>> {
        let mut clusters = vec![Vec::new(); self.k];
        for (entity, &cluster) in self.assignments.iter().enumerate() {
            clusters[cluster].push(entity);
        }
        clusters
    }

    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for &cluster in &self.assignments {
            sizes[cluster] += 1;
        }
        sizes
    }

    /// First cluster with no members, if any
    pub fn first_empty_cluster(&self) -> Option<usize> {
        self.sizes().iter().position(|&size| size == 0)
    }
}

/// One preferred offset per entity, fixed for a whole clustering run and
/// used only to break similarity ties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceVector(Vec<usize>);

impl PreferenceVector {
    pub fn new(preferences: Vec<usize>) -> Self {
        Self(preferences)
    }

    /// Draw one value in `[0, k)` per entity
    pub fn random<R: Rng>(entities: usize, k: usize, rng: &mut R) -> Self {
        Self((0..entities).map(|_| rng.random_range(0..k.max(1))).collect())
    }

    /// Every entity starts its scan at offset 0
    pub fn zeros(entities: usize) -> Self {
        Self(vec![0; entities])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, entity: usize) -> usize {
        self.0[entity]
    }
}

/// Frozen result of a converged clustering run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clustering {
    /// Final entity to cluster assignment
    pub partition: Partition,

    /// Medoid (matrix index) of each cluster, in cluster order
    pub medoids: Vec<usize>,

    /// Number of update/reassign rounds until the assignment stopped changing
    pub iterations: usize,
}

impl Clustering {
    /// Member ids of each cluster
    pub fn cluster_ids(&self, matrix: &SimilarityMatrix) -> Vec<Vec<String>> {
        self.partition
            .clusters()
            .into_iter()
            .map(|members| members.into_iter().map(|m| matrix.ids()[m].clone()).collect())
            .collect()
    }

    /// Medoid ids in cluster order
    pub fn medoid_ids(&self, matrix: &SimilarityMatrix) -> Vec<String> {
        self.medoids.iter().map(|&m| matrix.ids()[m].clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn partition_clusters_are_disjoint_and_exhaustive() {
        let partition = Partition::from_assignments(vec![1, 0, 1, 2, 0], 3);
        let clusters = partition.clusters();
        assert_eq!(clusters, vec![vec![1, 4], vec![0, 2], vec![3]]);
        assert_eq!(partition.sizes(), vec![2, 2, 1]);

        let mut all: Vec<usize> = clusters.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn partition_reports_empty_cluster() {
        let partition = Partition::from_assignments(vec![0, 0, 2], 3);
        assert_eq!(partition.first_empty_cluster(), Some(1));
        assert_eq!(Partition::from_assignments(vec![0, 1], 2).first_empty_cluster(), None);
    }

    #[test]
    fn random_preferences_stay_in_range_and_repeat_with_seed() {
        let a = PreferenceVector::random(50, 3, &mut StdRng::seed_from_u64(9));
        let b = PreferenceVector::random(50, 3, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
        assert!((0..50).all(|i| a.get(i) < 3));
    }
}
