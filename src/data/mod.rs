//! Detection matrix data model and ingestion module

pub mod loader;
pub mod preprocessing;

use std::collections::{HashMap, HashSet};

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::{AnalysisError, AnalysisResult};

/// One genomic bin (a row of the detection matrix)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Opaque identifier, stable across filtering
    pub id: String,

    pub chrom: String,
    pub start: u64,
    pub stop: u64,
}

/// Binary table of window detections: rows are windows, columns are NPs.
///
/// Constructed once and never mutated; filtering produces a new matrix.
#[derive(Debug, Clone)]
pub struct DetectionMatrix {
    windows: Vec<Window>,
    samples: Vec<String>,
    values: Array2<u8>,
}

impl DetectionMatrix {
    /// Build a matrix, checking the shape, id uniqueness and that every cell is 0 or 1
    pub fn new(windows: Vec<Window>, samples: Vec<String>, values: Array2<u8>) -> AnalysisResult<Self> {
        if values.nrows() != windows.len() || values.ncols() != samples.len() {
            return Err(AnalysisError::InvalidMatrix(format!(
                "shape {}x{} does not match {} windows and {} samples",
                values.nrows(),
                values.ncols(),
                windows.len(),
                samples.len()
            )));
        }

        check_unique(windows.iter().map(|w| w.id.as_str()), "window")?;
        check_unique(samples.iter().map(String::as_str), "sample")?;

        if let Some(((row, col), &value)) = values.indexed_iter().find(|(_, &v)| v > 1) {
            return Err(AnalysisError::InvalidMatrix(format!(
                "value {} for window {} / sample {} is not 0 or 1",
                value, windows[row].id, samples[col]
            )));
        }

        Ok(Self {
            windows,
            samples,
            values,
        })
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn values(&self) -> &Array2<u8> {
        &self.values
    }

    pub fn window_ids(&self) -> Vec<String> {
        self.windows.iter().map(|w| w.id.clone()).collect()
    }

    /// Detection vector of one NP over all windows
    pub fn sample_vector(&self, sample: usize) -> Vec<u8> {
        self.values.column(sample).to_vec()
    }

    /// Detection vector of one window over all NPs
    pub fn window_vector(&self, window: usize) -> Vec<u8> {
        self.values.row(window).to_vec()
    }

    pub fn sample_vectors(&self) -> Vec<Vec<u8>> {
        (0..self.sample_count()).map(|s| self.sample_vector(s)).collect()
    }

    pub fn window_vectors(&self) -> Vec<Vec<u8>> {
        (0..self.window_count()).map(|w| self.window_vector(w)).collect()
    }

    /// Number of windows detected by each NP
    pub fn windows_per_sample(&self) -> Vec<usize> {
        self.values
            .axis_iter(Axis(1))
            .map(|col| col.iter().map(|&v| v as usize).sum())
            .collect()
    }

    /// Number of NPs detecting each window
    pub fn samples_per_window(&self) -> Vec<usize> {
        self.values
            .axis_iter(Axis(0))
            .map(|row| row.iter().map(|&v| v as usize).sum())
            .collect()
    }

    /// Sub-matrix with the given window rows and sample columns, in the given order
    pub fn select(&self, rows: &[usize], cols: &[usize]) -> Self {
        let values = self.values.select(Axis(0), rows).select(Axis(1), cols);
        Self {
            windows: rows.iter().map(|&r| self.windows[r].clone()).collect(),
            samples: cols.iter().map(|&c| self.samples[c].clone()).collect(),
            values,
        }
    }

    /// Descriptive counts over the whole matrix
    pub fn summary(&self) -> DatasetSummary {
        let per_sample: Vec<f64> = self.windows_per_sample().into_iter().map(|c| c as f64).collect();
        let per_window: Vec<f64> = self.samples_per_window().into_iter().map(|c| c as f64).collect();
        let (mean_windows_per_sample, min_windows_per_sample, max_windows_per_sample) = describe(&per_sample);
        let (mean_samples_per_window, min_samples_per_window, max_samples_per_window) = describe(&per_window);

        DatasetSummary {
            window_count: self.window_count(),
            sample_count: self.sample_count(),
            mean_windows_per_sample,
            min_windows_per_sample,
            max_windows_per_sample,
            mean_samples_per_window,
            min_samples_per_window,
            max_samples_per_window,
        }
    }
}

fn check_unique<'a>(ids: impl Iterator<Item = &'a str>, kind: &str) -> AnalysisResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(AnalysisError::InvalidMatrix(format!("duplicate {} id '{}'", kind, id)));
        }
    }
    Ok(())
}

fn describe(values: &[f64]) -> (f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    (
        Statistics::mean(values),
        Statistics::min(values),
        Statistics::max(values),
    )
}

/// Dataset-level detection statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub window_count: usize,
    pub sample_count: usize,
    pub mean_windows_per_sample: f64,
    pub min_windows_per_sample: f64,
    pub max_windows_per_sample: f64,
    pub mean_samples_per_window: f64,
    pub min_samples_per_window: f64,
    pub max_samples_per_window: f64,
}

/// Named 0/1 flags per window (e.g. whether a window holds a histone gene or a LAD)
#[derive(Debug, Clone)]
pub struct FeatureTable {
    names: Vec<String>,
    window_index: HashMap<String, usize>,
    flags: Array2<u8>,
}

impl FeatureTable {
    /// `flags` has one row per window id and one column per feature name
    pub fn new(window_ids: Vec<String>, names: Vec<String>, flags: Array2<u8>) -> AnalysisResult<Self> {
        if flags.nrows() != window_ids.len() || flags.ncols() != names.len() {
            return Err(AnalysisError::InvalidMatrix(format!(
                "feature table shape {}x{} does not match {} windows and {} features",
                flags.nrows(),
                flags.ncols(),
                window_ids.len(),
                names.len()
            )));
        }
        check_unique(window_ids.iter().map(String::as_str), "window")?;
        check_unique(names.iter().map(String::as_str), "feature")?;

        let window_index = window_ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();

        Ok(Self {
            names,
            window_index,
            flags,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Flag of `feature` for `window_id`; `None` when either is unknown
    pub fn flag(&self, window_id: &str, feature: &str) -> Option<bool> {
        let row = *self.window_index.get(window_id)?;
        let col = self.names.iter().position(|n| n == feature)?;
        Some(self.flags[[row, col]] != 0)
    }
}
