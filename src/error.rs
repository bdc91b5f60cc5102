//! Error types for the core analysis engine

use thiserror::Error;

/// Result alias used by the similarity, clustering and graph modules
pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

/// Failures of the in-memory computations.
///
/// None of these are transient: each one names the precondition that did not
/// hold, so a caller can decide whether to reseed, fix its input, or give up.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// A cluster lost all of its members, so no medoid can be chosen for it
    #[error("degenerate cluster: cluster {cluster} is empty after iteration {iteration}")]
    DegenerateCluster { cluster: usize, iteration: usize },

    /// Two detection vectors of different length were compared
    #[error("invalid similarity input: vector lengths differ ({left} vs {right})")]
    VectorLengthMismatch { left: usize, right: usize },

    /// A detection vector held something other than 0 or 1
    #[error("invalid similarity input: value {value} at position {position} is not 0 or 1")]
    NonBinaryValue { value: u8, position: usize },

    /// The assign/update loop hit its iteration cap
    #[error("clustering did not converge within {iterations} iterations")]
    ConvergenceNonTermination { iterations: usize },

    #[error("cannot form {requested} clusters from {entities} entities")]
    InvalidClusterCount { requested: usize, entities: usize },

    #[error("invalid initial medoids: {0}")]
    InvalidMedoids(String),

    #[error("preference vector has {found} entries for {expected} entities")]
    PreferenceLengthMismatch { expected: usize, found: usize },

    #[error("invalid detection matrix: {0}")]
    InvalidMatrix(String),

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("empty input: {0}")]
    EmptyInput(&'static str),
}

impl AnalysisError {
    /// True for the errors a fresh set of initial medoids might avoid
    pub fn is_seed_dependent(&self) -> bool {
        matches!(
            self,
            AnalysisError::DegenerateCluster { .. } | AnalysisError::ConvergenceNonTermination { .. }
        )
    }
}
