//! Dense pairwise similarity matrix

use std::collections::HashMap;

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::preprocessing::drop_empty_samples;
use crate::data::DetectionMatrix;
use crate::error::{AnalysisError, AnalysisResult};
use crate::similarity::SimilarityKind;

/// Tolerance used when checking symmetry of externally supplied values
const SYMMETRY_TOLERANCE: f64 = 1e-12;

/// Square, symmetric table of pairwise scores between named entities.
///
/// Row/column `i` belongs to `ids()[i]`. The diagonal holds each entity's
/// score against itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "StoredMatrix", try_from = "StoredMatrix")]
pub struct SimilarityMatrix {
    ids: Vec<String>,
    kind: Option<SimilarityKind>,
    index: HashMap<String, usize>,
    values: Array2<f64>,
}

/// Flat form used for persistence
#[derive(Serialize, Deserialize)]
struct StoredMatrix {
    ids: Vec<String>,
    kind: Option<SimilarityKind>,
    values: Vec<f64>,
}

impl From<SimilarityMatrix> for StoredMatrix {
    fn from(matrix: SimilarityMatrix) -> Self {
        Self {
            ids: matrix.ids,
            kind: matrix.kind,
            values: matrix.values.iter().copied().collect(),
        }
    }
}

impl TryFrom<StoredMatrix> for SimilarityMatrix {
    type Error = AnalysisError;

    fn try_from(stored: StoredMatrix) -> AnalysisResult<Self> {
        let n = stored.ids.len();
        let values = Array2::from_shape_vec((n, n), stored.values)
            .map_err(|e| AnalysisError::InvalidMatrix(e.to_string()))?;
        let mut matrix = SimilarityMatrix::from_values(stored.ids, values)?;
        matrix.kind = stored.kind;
        Ok(matrix)
    }
}

impl SimilarityMatrix {
    /// Score every unordered pair (including each entity with itself) exactly once.
    ///
    /// Rows are computed in parallel; the lower triangle mirrors the upper one.
    pub fn build<F>(ids: Vec<String>, vectors: &[Vec<u8>], pairwise: F) -> AnalysisResult<Self>
    where
        F: Fn(&[u8], &[u8]) -> AnalysisResult<f64> + Sync,
    {
        if ids.len() != vectors.len() {
            return Err(AnalysisError::InvalidMatrix(format!(
                "{} ids for {} vectors",
                ids.len(),
                vectors.len()
            )));
        }

        let n = vectors.len();
        let upper: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (i..n)
                    .map(|j| pairwise(&vectors[i], &vectors[j]))
                    .collect::<AnalysisResult<Vec<f64>>>()
            })
            .collect::<AnalysisResult<Vec<_>>>()?;

        let mut values = Array2::<f64>::zeros((n, n));
        for (i, row) in upper.iter().enumerate() {
            for (offset, &value) in row.iter().enumerate() {
                let j = i + offset;
                values[[i, j]] = value;
                values[[j, i]] = value;
            }
        }

        let index = index_ids(&ids)?;
        Ok(Self {
            ids,
            kind: None,
            index,
            values,
        })
    }

    /// Build with one of the named measures
    pub fn build_with_kind(ids: Vec<String>, vectors: &[Vec<u8>], kind: SimilarityKind) -> AnalysisResult<Self> {
        let mut matrix = Self::build(ids, vectors, |a, b| kind.compute(a, b))?;
        matrix.kind = Some(kind);
        Ok(matrix)
    }

    /// NP-by-NP matrix over the detection columns
    pub fn from_samples(detections: &DetectionMatrix, kind: SimilarityKind) -> AnalysisResult<Self> {
        log::info!(
            "Computing {:?} similarity for {} NPs over {} windows",
            kind,
            detections.sample_count(),
            detections.window_count()
        );
        Self::build_with_kind(detections.samples().to_vec(), &detections.sample_vectors(), kind)
    }

    /// Window-by-window matrix over the detection rows
    pub fn from_windows(detections: &DetectionMatrix, kind: SimilarityKind) -> AnalysisResult<Self> {
        log::info!(
            "Computing {:?} similarity for {} windows over {} NPs",
            kind,
            detections.window_count(),
            detections.sample_count()
        );
        Self::build_with_kind(detections.window_ids(), &detections.window_vectors(), kind)
    }

    /// Matrix for the entities `kind` compares: windows for linkage, NPs
    /// otherwise. NPs that detect no window are left out of NP matrices;
    /// window linkage keeps every NP so frequencies are over all samples.
    pub fn from_detections(detections: &DetectionMatrix, kind: SimilarityKind) -> AnalysisResult<Self> {
        match kind {
            SimilarityKind::NormalizedLinkage => Self::from_windows(detections, kind),
            SimilarityKind::NormalizedJaccard | SimilarityKind::Jaccard => {
                Self::from_samples(&drop_empty_samples(detections), kind)
            }
        }
    }

    /// Wrap precomputed values, checking they are square, finite and symmetric
    pub fn from_values(ids: Vec<String>, values: Array2<f64>) -> AnalysisResult<Self> {
        let n = ids.len();
        if values.nrows() != n || values.ncols() != n {
            return Err(AnalysisError::InvalidMatrix(format!(
                "expected {}x{} values, found {}x{}",
                n,
                n,
                values.nrows(),
                values.ncols()
            )));
        }

        for i in 0..n {
            for j in i..n {
                let (a, b) = (values[[i, j]], values[[j, i]]);
                if !a.is_finite() || !b.is_finite() || (a - b).abs() > SYMMETRY_TOLERANCE {
                    return Err(AnalysisError::InvalidMatrix(format!(
                        "entry ({}, {}) is {} but ({}, {}) is {}",
                        ids[i], ids[j], a, ids[j], ids[i], b
                    )));
                }
            }
        }

        let index = index_ids(&ids)?;
        Ok(Self {
            ids,
            kind: None,
            index,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Measure the matrix was built with, if known
    pub fn kind(&self) -> Option<SimilarityKind> {
        self.kind
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[[i, j]]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Score between two entities by id
    pub fn get_by_id(&self, a: &str, b: &str) -> AnalysisResult<f64> {
        let i = self
            .index_of(a)
            .ok_or_else(|| AnalysisError::UnknownEntity(a.to_string()))?;
        let j = self
            .index_of(b)
            .ok_or_else(|| AnalysisError::UnknownEntity(b.to_string()))?;
        Ok(self.get(i, j))
    }

    /// Resolve a list of ids to matrix indices
    pub fn indices_of(&self, ids: &[String]) -> AnalysisResult<Vec<usize>> {
        ids.iter()
            .map(|id| {
                self.index_of(id)
                    .ok_or_else(|| AnalysisError::UnknownEntity(id.clone()))
            })
            .collect()
    }
}

fn index_ids(ids: &[String]) -> AnalysisResult<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(ids.len());
    for (i, id) in ids.iter().enumerate() {
        if index.insert(id.clone(), i).is_some() {
            return Err(AnalysisError::InvalidMatrix(format!("duplicate entity id '{}'", id)));
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Window;
    use ndarray::array;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn build_scores_each_unordered_pair_once() {
        let vectors = vec![vec![1, 0], vec![0, 1], vec![1, 1], vec![0, 0]];
        let calls = AtomicUsize::new(0);
        let matrix = SimilarityMatrix::build(ids(&["a", "b", "c", "d"]), &vectors, |x, y| {
            calls.fetch_add(1, Ordering::SeqCst);
            SimilarityKind::Jaccard.compute(x, y)
        })
        .unwrap();

        // 4 diagonal entries + 6 off-diagonal pairs
        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(matrix.len(), 4);
        assert_eq!(matrix.get(0, 2), 0.5);
        assert_eq!(matrix.get(2, 0), 0.5);
    }

    #[test]
    fn sample_matrix_is_symmetric() {
        let windows = (0..4)
            .map(|i| Window {
                id: i.to_string(),
                chrom: "chr13".into(),
                start: i * 30_000,
                stop: (i + 1) * 30_000,
            })
            .collect();
        let detections = DetectionMatrix::new(
            windows,
            ids(&["A", "B", "C", "D"]),
            array![[1, 1, 0, 0], [1, 1, 0, 1], [0, 0, 1, 1], [0, 1, 1, 1]],
        )
        .unwrap();

        let matrix = SimilarityMatrix::from_samples(&detections, SimilarityKind::NormalizedJaccard).unwrap();
        assert_eq!(matrix.kind(), Some(SimilarityKind::NormalizedJaccard));
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
        assert_eq!(matrix.get_by_id("A", "B").unwrap(), 1.0);
        assert_eq!(matrix.get_by_id("A", "C").unwrap(), 0.0);

        let windows = SimilarityMatrix::from_windows(&detections, SimilarityKind::NormalizedLinkage).unwrap();
        assert_eq!(windows.ids(), &ids(&["0", "1", "2", "3"]));
    }

    #[test]
    fn linkage_counts_samples_without_detections() {
        let windows = (0..2)
            .map(|i| Window {
                id: i.to_string(),
                chrom: "chr13".into(),
                start: i * 40_000,
                stop: (i + 1) * 40_000,
            })
            .collect();
        // NP5 detects neither window
        let detections = DetectionMatrix::new(
            windows,
            ids(&["NP1", "NP2", "NP3", "NP4", "NP5"]),
            array![[1, 1, 0, 0, 0], [1, 0, 1, 0, 0]],
        )
        .unwrap();

        let linkage = SimilarityMatrix::from_detections(&detections, SimilarityKind::NormalizedLinkage).unwrap();
        let expected = crate::similarity::normalized_linkage(&[1, 1, 0, 0, 0], &[1, 0, 1, 0, 0]).unwrap();
        assert_eq!(linkage.get(0, 1), expected);
        assert!((expected - 1.0 / 6.0).abs() < 1e-12);

        let samples = SimilarityMatrix::from_detections(&detections, SimilarityKind::NormalizedJaccard).unwrap();
        assert_eq!(samples.ids(), &ids(&["NP1", "NP2", "NP3"]));
    }

    #[test]
    fn build_propagates_pairwise_errors() {
        let vectors = vec![vec![1, 0], vec![0, 1, 1]];
        let result = SimilarityMatrix::build_with_kind(ids(&["a", "b"]), &vectors, SimilarityKind::Jaccard);
        assert!(matches!(result, Err(AnalysisError::VectorLengthMismatch { .. })));
    }

    #[test]
    fn from_values_rejects_asymmetry() {
        let result = SimilarityMatrix::from_values(ids(&["a", "b"]), array![[1.0, 0.2], [0.3, 1.0]]);
        assert!(result.is_err());
        let result = SimilarityMatrix::from_values(ids(&["a", "a"]), array![[1.0, 0.2], [0.2, 1.0]]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_ids_are_reported() {
        let matrix = SimilarityMatrix::from_values(ids(&["a", "b"]), array![[1.0, 0.2], [0.2, 1.0]]).unwrap();
        assert_eq!(
            matrix.get_by_id("a", "z"),
            Err(AnalysisError::UnknownEntity("z".to_string()))
        );
        assert_eq!(matrix.indices_of(&ids(&["b", "a"])).unwrap(), vec![1, 0]);
    }

    #[test]
    fn serde_round_trip_keeps_kind() {
        let vectors = vec![vec![1, 0, 1], vec![0, 1, 1]];
        let matrix =
            SimilarityMatrix::build_with_kind(ids(&["a", "b"]), &vectors, SimilarityKind::NormalizedLinkage).unwrap();
        let json = serde_json::to_string(&matrix).unwrap();
        let restored: SimilarityMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, matrix);
    }
}
