//! Pairwise similarity between binary detection vectors
//!
//! Three measures are provided, each with its own zero-handling rule:
//!
//! - [`normalized_jaccard`]: `|A∩B| / min(|A|, |B|)`, 0 when both vectors are empty
//! - [`jaccard`]: `|A∩B| / |A∪B|`, 0 whenever the vectors share nothing
//! - [`normalized_linkage`]: linkage disequilibrium `D` divided by its
//!   theoretical maximum given the two detection frequencies, in `[-1, 1]`
//!
//! The rules are not interchangeable, so callers pick one through
//! [`SimilarityKind`].

pub mod matrix;

pub use matrix::SimilarityMatrix;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// Which pairwise measure to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimilarityKind {
    NormalizedJaccard,
    Jaccard,
    NormalizedLinkage,
}

impl SimilarityKind {
    /// Apply this measure to one pair of vectors
    pub fn compute(self, a: &[u8], b: &[u8]) -> AnalysisResult<f64> {
        match self {
            SimilarityKind::NormalizedJaccard => normalized_jaccard(a, b),
            SimilarityKind::Jaccard => jaccard(a, b),
            SimilarityKind::NormalizedLinkage => normalized_linkage(a, b),
        }
    }

    /// Whether values are confined to `[0, 1]`
    pub fn is_unit_bounded(self) -> bool {
        !matches!(self, SimilarityKind::NormalizedLinkage)
    }
}

/// Bit counts shared by every measure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PairCounts {
    /// Vector length
    n: u64,
    /// |A|
    a: u64,
    /// |B|
    b: u64,
    /// |A∩B|
    both: u64,
}

impl PairCounts {
    fn union(&self) -> u64 {
        self.a + self.b - self.both
    }
}

fn pair_counts(a: &[u8], b: &[u8]) -> AnalysisResult<PairCounts> {
    if a.len() != b.len() {
        return Err(AnalysisError::VectorLengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut counts = PairCounts {
        n: a.len() as u64,
        a: 0,
        b: 0,
        both: 0,
    };

    for (position, (&x, &y)) in a.iter().zip(b).enumerate() {
        if x > 1 || y > 1 {
            return Err(AnalysisError::NonBinaryValue {
                value: x.max(y),
                position,
            });
        }
        counts.a += x as u64;
        counts.b += y as u64;
        counts.both += (x & y) as u64;
    }

    Ok(counts)
}

/// Normalized Jaccard index `|A∩B| / min(|A|, |B|)`.
///
/// Two all-zero vectors score 0. A vector with no detections shares nothing
/// with any other, so it also scores 0 instead of dividing by an empty minimum.
pub fn normalized_jaccard(a: &[u8], b: &[u8]) -> AnalysisResult<f64> {
    let c = pair_counts(a, b)?;
    if c.union() == 0 {
        return Ok(0.0);
    }
    let smaller = c.a.min(c.b);
    if smaller == 0 {
        return Ok(0.0);
    }
    Ok(c.both as f64 / smaller as f64)
}

/// Plain Jaccard index `|A∩B| / |A∪B|`; 0 whenever the intersection is empty
pub fn jaccard(a: &[u8], b: &[u8]) -> AnalysisResult<f64> {
    let c = pair_counts(a, b)?;
    if c.both == 0 {
        return Ok(0.0);
    }
    Ok(c.both as f64 / c.union() as f64)
}

/// Fraction of samples in which a window is detected, `f(A)`
pub fn detection_frequency(a: &[u8]) -> AnalysisResult<f64> {
    let c = pair_counts(a, a)?;
    if c.n == 0 {
        return Err(AnalysisError::EmptyInput("detection vector"));
    }
    Ok(c.a as f64 / c.n as f64)
}

/// Fraction of samples detecting both windows, `f(A,B)`
pub fn co_segregation(a: &[u8], b: &[u8]) -> AnalysisResult<f64> {
    let c = pair_counts(a, b)?;
    if c.n == 0 {
        return Err(AnalysisError::EmptyInput("detection vector"));
    }
    Ok(c.both as f64 / c.n as f64)
}

/// Linkage disequilibrium `D = f(A,B) - f(A)f(B)`
pub fn linkage(a: &[u8], b: &[u8]) -> AnalysisResult<f64> {
    let c = pair_counts(a, b)?;
    if c.n == 0 {
        return Err(AnalysisError::EmptyInput("detection vector"));
    }
    let n2 = (c.n * c.n) as f64;
    Ok(scaled_linkage(&c) as f64 / n2)
}

/// `D * n²` as an exact integer
fn scaled_linkage(c: &PairCounts) -> i128 {
    (c.both as i128) * (c.n as i128) - (c.a as i128) * (c.b as i128)
}

/// Normalized linkage disequilibrium `D / D_max`.
///
/// `D_max` is `min(f(A)f(B), (1-f(A))(1-f(B)))` when `D < 0` and
/// `min(f(B)(1-f(A)), f(A)(1-f(B)))` when `D > 0`; `D = 0` yields 0. Every
/// frequency shares the denominator `n`, so the ratio is evaluated on integer
/// counts and a window linked with itself scores exactly 1.
pub fn normalized_linkage(a: &[u8], b: &[u8]) -> AnalysisResult<f64> {
    let c = pair_counts(a, b)?;
    if c.n == 0 {
        return Err(AnalysisError::EmptyInput("detection vector"));
    }

    let d = scaled_linkage(&c);
    let (n, fa, fb) = (c.n as i128, c.a as i128, c.b as i128);

    let d_max = if d < 0 {
        (fa * fb).min((n - fa) * (n - fb))
    } else if d > 0 {
        (fb * (n - fa)).min(fa * (n - fb))
    } else {
        return Ok(0.0);
    };

    // D != 0 forces both frequencies strictly inside (0, 1), so d_max > 0
    Ok(d as f64 / d_max as f64)
}
