//! Multi-seed medoid search
//!
//! A single medoid run only finds a local optimum, so the search draws many
//! distinct sets of initial medoids, clusters from each in parallel, scores
//! every converged run and keeps the winners under three criteria.

use std::collections::HashSet;

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cluster::metrics::score_clustering;
use crate::cluster::{ClusterScores, Clustering, MedoidClusterer};
use crate::error::{AnalysisError, AnalysisResult};
use crate::similarity::SimilarityMatrix;

/// How to rank converged runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Highest mean similarity to the own medoid
    Similarity,
    /// Highest mean distance to the other medoids
    Separation,
    /// Closest `(separation, similarity)` point to `(1, 1)`
    Balance,
}

impl Criterion {
    pub const ALL: [Criterion; 3] = [Criterion::Similarity, Criterion::Separation, Criterion::Balance];

    pub fn name(self) -> &'static str {
        match self {
            Criterion::Similarity => "similarity",
            Criterion::Separation => "separation",
            Criterion::Balance => "balance",
        }
    }

    /// Value to maximize
    fn objective(self, scores: &ClusterScores) -> f64 {
        match self {
            Criterion::Similarity => scores.similarity_avg,
            Criterion::Separation => scores.inter_cluster_distance_avg,
            Criterion::Balance => -scores.balance_distance(),
        }
    }
}

/// One converged run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub initial_medoids: Vec<usize>,
    pub clustering: Clustering,
    pub scores: ClusterScores,
}

/// A run that ended without a usable partition
#[derive(Debug, Clone, PartialEq)]
pub struct FailedRun {
    pub initial_medoids: Vec<usize>,
    pub error: AnalysisError,
}

/// Every run of a search plus the index of the winner per criterion
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub runs: Vec<RunRecord>,
    pub failures: Vec<FailedRun>,
    best_similarity: usize,
    best_separation: usize,
    best_balance: usize,
}

impl SearchOutcome {
    fn from_runs(runs: Vec<RunRecord>, failures: Vec<FailedRun>) -> Self {
        let best = |criterion: Criterion| {
            // first run reaching the optimum wins
            let mut best = 0;
            for (i, run) in runs.iter().enumerate() {
                if criterion.objective(&run.scores) > criterion.objective(&runs[best].scores) {
                    best = i;
                }
            }
            best
        };

        Self {
            best_similarity: best(Criterion::Similarity),
            best_separation: best(Criterion::Separation),
            best_balance: best(Criterion::Balance),
            runs,
            failures,
        }
    }

    /// Winning run under `criterion`
    pub fn best(&self, criterion: Criterion) -> &RunRecord {
        let index = match criterion {
            Criterion::Similarity => self.best_similarity,
            Criterion::Separation => self.best_separation,
            Criterion::Balance => self.best_balance,
        };
        &self.runs[index]
    }
}

/// Repeated medoid clustering from sampled initial medoid sets
#[derive(Debug, Clone)]
pub struct MedoidSearch {
    clusterer: MedoidClusterer,
    runs: usize,
    seed: Option<u64>,
}

impl MedoidSearch {
    pub fn new(clusterer: MedoidClusterer, runs: usize) -> Self {
        Self {
            clusterer,
            runs,
            seed: None,
        }
    }

    /// Set random seed for reproducibility
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Draw up to `runs` distinct sorted k-subsets of `0..n`; every subset
    /// when there are no more than `runs` of them
    pub fn sample_initial_medoids<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<Vec<usize>> {
        let k = self.clusterer.k();
        if k == 0 || k > n {
            return Vec::new();
        }

        if binomial(n, k) <= self.runs as u128 {
            return (0..n).combinations(k).collect();
        }

        let mut seen = HashSet::with_capacity(self.runs);
        let mut sampled = Vec::with_capacity(self.runs);
        while sampled.len() < self.runs {
            let mut medoids = rand::seq::index::sample(rng, n, k).into_vec();
            medoids.sort_unstable();
            if seen.insert(medoids.clone()) {
                sampled.push(medoids);
            }
        }
        sampled
    }

    /// Run the search. Runs that hit an empty cluster or the iteration cap
    /// are recorded as failures; the search itself fails only when no run
    /// converges or the setup is invalid.
    pub fn run(&self, matrix: &SimilarityMatrix) -> AnalysisResult<SearchOutcome> {
        if self.runs == 0 {
            return Err(AnalysisError::EmptyInput("search runs"));
        }
        let k = self.clusterer.k();
        if k == 0 || k > matrix.len() {
            return Err(AnalysisError::InvalidClusterCount {
                requested: k,
                entities: matrix.len(),
            });
        }

        if let Some(kind) = matrix.kind().filter(|kind| !kind.is_unit_bounded()) {
            log::info!(
                "{:?} scores are signed; distance_avg will not equal 1 - similarity_avg",
                kind
            );
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let initial_sets = self.sample_initial_medoids(matrix.len(), &mut rng);
        let run_seeds: Vec<u64> = initial_sets.iter().map(|_| rng.random()).collect();

        log::info!(
            "Running {} medoid clusterings with k = {} over {} entities",
            initial_sets.len(),
            k,
            matrix.len()
        );

        let results: Vec<(Vec<usize>, AnalysisResult<(Clustering, ClusterScores)>)> = initial_sets
            .into_par_iter()
            .zip(run_seeds.into_par_iter())
            .map(|(initial, run_seed)| {
                let mut run_rng = StdRng::seed_from_u64(run_seed);
                let result = self
                    .clusterer
                    .run(matrix, &initial, &mut run_rng)
                    .and_then(|clustering| {
                        let scores = score_clustering(&clustering, matrix)?;
                        Ok((clustering, scores))
                    });
                (initial, result)
            })
            .collect();

        let mut runs = Vec::new();
        let mut failures = Vec::new();
        for (initial_medoids, result) in results {
            match result {
                Ok((clustering, scores)) => {
                    log::debug!(
                        "Seed {:?}: similarity {:.4}, separation {:.4} after {} iterations",
                        initial_medoids,
                        scores.similarity_avg,
                        scores.inter_cluster_distance_avg,
                        clustering.iterations
                    );
                    runs.push(RunRecord {
                        initial_medoids,
                        clustering,
                        scores,
                    });
                }
                Err(error) if error.is_seed_dependent() => {
                    log::warn!("Seed {:?} abandoned: {}", initial_medoids, error);
                    failures.push(FailedRun {
                        initial_medoids,
                        error,
                    });
                }
                Err(error) => return Err(error),
            }
        }

        if runs.is_empty() {
            return Err(failures
                .into_iter()
                .next()
                .map(|failure| failure.error)
                .unwrap_or(AnalysisError::EmptyInput("search runs")));
        }

        log::info!(
            "{} runs converged, {} abandoned",
            runs.len(),
            failures.len()
        );

        Ok(SearchOutcome::from_runs(runs, failures))
    }
}

/// `n choose k`, saturating at `u128::MAX`
fn binomial(n: usize, k: usize) -> u128 {
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k {
        result = match result.checked_mul((n - i) as u128) {
            Some(product) => product / (i as u128 + 1),
            None => return u128::MAX,
        };
    }
    result
}
