//! Medoid-based partitioning of entities by pairwise similarity

use rand::Rng;

use crate::cluster::{Clustering, Partition, PreferenceVector};
use crate::error::{AnalysisError, AnalysisResult};
use crate::similarity::SimilarityMatrix;

/// Index of the maximum score, scanning circularly from `offset`.
///
/// Among tied maxima the first one reached from `offset % len` wins, so a
/// fixed offset always resolves the same tie the same way. NaN scores never
/// win; `None` is returned for an empty or all-NaN slice.
pub fn circular_argmax(scores: &[f64], offset: usize) -> Option<usize> {
    if scores.is_empty() {
        return None;
    }

    let max = scores
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NEG_INFINITY, f64::max);

    let n = scores.len();
    let start = offset % n;
    (0..n).map(|step| (start + step) % n).find(|&i| scores[i] == max)
}

/// Iterative k-medoids over a similarity matrix.
///
/// Each round reassigns every entity to its most similar medoid and then
/// moves each medoid to the member with the highest mean similarity to the
/// rest of its cluster, until the assignment stops changing. The result is a
/// local optimum that depends on the initial medoids.
#[derive(Debug, Clone)]
pub struct MedoidClusterer {
    /// Number of clusters
    k: usize,
    /// Cap on update/reassign rounds
    max_iterations: usize,
}

impl MedoidClusterer {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: 100,
        }
    }

    /// Set maximum iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Cluster from the given initial medoids, drawing a fresh tie-break
    /// preference per entity from `rng`
    pub fn run<R: Rng>(
        &self,
        matrix: &SimilarityMatrix,
        initial_medoids: &[usize],
        rng: &mut R,
    ) -> AnalysisResult<Clustering> {
        let preferences = PreferenceVector::random(matrix.len(), self.k, rng);
        self.run_with_preferences(matrix, initial_medoids, &preferences)
    }

    /// Same as [`run`](Self::run) with medoids named by entity id
    pub fn run_with_ids<R: Rng>(
        &self,
        matrix: &SimilarityMatrix,
        initial_medoids: &[String],
        rng: &mut R,
    ) -> AnalysisResult<Clustering> {
        let medoids = matrix.indices_of(initial_medoids)?;
        self.run(matrix, &medoids, rng)
    }

    /// Deterministic core: identical inputs always give the identical result
    pub fn run_with_preferences(
        &self,
        matrix: &SimilarityMatrix,
        initial_medoids: &[usize],
        preferences: &PreferenceVector,
    ) -> AnalysisResult<Clustering> {
        self.validate(matrix, initial_medoids, preferences)?;

        let mut medoids = initial_medoids.to_vec();
        let mut partition = self.assign(matrix, &medoids, preferences)?;
        ensure_populated(&partition, 0)?;

        let mut iterations = 0;
        loop {
            if iterations >= self.max_iterations {
                return Err(AnalysisError::ConvergenceNonTermination { iterations });
            }

            medoids = self.update(matrix, &partition, &medoids, preferences, iterations)?;
            let next = self.assign(matrix, &medoids, preferences)?;
            iterations += 1;

            log::debug!(
                "Iteration {}: medoids {:?}, cluster sizes {:?}",
                iterations,
                medoids,
                next.sizes()
            );

            if next == partition {
                break;
            }

            ensure_populated(&next, iterations)?;
            partition = next;
        }

        Ok(Clustering {
            partition,
            medoids,
            iterations,
        })
    }

    fn validate(
        &self,
        matrix: &SimilarityMatrix,
        initial_medoids: &[usize],
        preferences: &PreferenceVector,
    ) -> AnalysisResult<()> {
        let n = matrix.len();
        if self.k == 0 || self.k > n {
            return Err(AnalysisError::InvalidClusterCount {
                requested: self.k,
                entities: n,
            });
        }

        if initial_medoids.len() != self.k {
            return Err(AnalysisError::InvalidMedoids(format!(
                "expected {} medoids, got {}",
                self.k,
                initial_medoids.len()
            )));
        }

        for (pos, &m) in initial_medoids.iter().enumerate() {
            if m >= n {
                return Err(AnalysisError::InvalidMedoids(format!(
                    "medoid index {} is out of range for {} entities",
                    m, n
                )));
            }
            if initial_medoids[..pos].contains(&m) {
                return Err(AnalysisError::InvalidMedoids(format!(
                    "entity {} is used as a medoid more than once",
                    matrix.ids()[m]
                )));
            }
        }

        if preferences.len() != n {
            return Err(AnalysisError::PreferenceLengthMismatch {
                expected: n,
                found: preferences.len(),
            });
        }

        Ok(())
    }

    /// Put every entity in the cluster of its most similar medoid
    fn assign(
        &self,
        matrix: &SimilarityMatrix,
        medoids: &[usize],
        preferences: &PreferenceVector,
    ) -> AnalysisResult<Partition> {
        let assignments = (0..matrix.len())
            .map(|entity| {
                let scores: Vec<f64> = medoids.iter().map(|&m| matrix.get(entity, m)).collect();
                circular_argmax(&scores, preferences.get(entity)).ok_or_else(|| {
                    AnalysisError::InvalidMatrix(format!(
                        "no comparable similarity between {} and the medoids",
                        matrix.ids()[entity]
                    ))
                })
            })
            .collect::<AnalysisResult<Vec<usize>>>()?;

        Ok(Partition::from_assignments(assignments, self.k))
    }

    /// Move each medoid to the member with the highest mean similarity to the
    /// other members. Ties start scanning at the outgoing medoid's preference.
    fn update(
        &self,
        matrix: &SimilarityMatrix,
        partition: &Partition,
        medoids: &[usize],
        preferences: &PreferenceVector,
        iteration: usize,
    ) -> AnalysisResult<Vec<usize>> {
        partition
            .clusters()
            .iter()
            .enumerate()
            .map(|(cluster, members)| {
                let scores = mean_similarity_to_others(matrix, members);
                circular_argmax(&scores, preferences.get(medoids[cluster]))
                    .map(|best| members[best])
                    .ok_or(AnalysisError::DegenerateCluster { cluster, iteration })
            })
            .collect()
    }
}

/// Mean similarity of each member to the other members; a lone member scores 0
fn mean_similarity_to_others(matrix: &SimilarityMatrix, members: &[usize]) -> Vec<f64> {
    if members.len() < 2 {
        return vec![0.0; members.len()];
    }

    let others = (members.len() - 1) as f64;
    members
        .iter()
        .map(|&i| {
            members
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| matrix.get(i, j))
                .sum::<f64>()
                / others
        })
        .collect()
}

fn ensure_populated(partition: &Partition, iteration: usize) -> AnalysisResult<()> {
    match partition.first_empty_cluster() {
        Some(cluster) => Err(AnalysisError::DegenerateCluster { cluster, iteration }),
        None => Ok(()),
    }
}
