//! DTW distance newtype and the frame-level metric.

use std::fmt;

use serde::Serialize;

/// A finite, non-negative DTW alignment cost.
///
/// Unreachable alignments are reported as
/// [`DtwError::NoAlignmentPath`](crate::DtwError::NoAlignmentPath), so a
/// `DtwDistance` never holds infinity.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct DtwDistance(f64);

impl DtwDistance {
    /// Create a new DTW distance from a raw value.
    pub(crate) fn new(value: f64) -> Self {
        debug_assert!(value.is_finite() && value >= 0.0, "invalid distance {value}");
        Self(value)
    }

    /// Return the raw distance value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for DtwDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// Euclidean distance between two frames of equal dimension.
#[inline]
pub(crate) fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
