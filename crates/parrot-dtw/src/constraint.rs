//! Adaptive band width and step policies for DTW computation.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DtwError;

/// Sequence-length-aware Sakoe-Chiba radius.
///
/// The radius for an `n x m` alignment is the larger of a fixed fraction of the
/// longer sequence and the length difference widened by a fraction of the
/// shorter one:
///
/// ```text
/// base     = floor(max(n, m) * band_ratio)
/// adaptive = floor(|n - m| + alpha * min(n, m))
/// width    = max(base, adaptive)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveBand {
    band_ratio: f64,
    alpha: f64,
}

impl AdaptiveBand {
    /// Default fraction of the longer sequence used as the base radius.
    pub const DEFAULT_BAND_RATIO: f64 = 0.2;
    /// Default fraction of the shorter sequence added to the length difference.
    pub const DEFAULT_ALPHA: f64 = 0.15;

    /// Create a band from its two ratios.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::InvalidParameter`] | Either ratio is negative, NaN or infinite |
    pub fn new(band_ratio: f64, alpha: f64) -> Result<Self, DtwError> {
        check_ratio("band_ratio", band_ratio)?;
        check_ratio("alpha", alpha)?;
        Ok(Self { band_ratio, alpha })
    }

    /// Return the base band ratio.
    #[must_use]
    pub fn band_ratio(&self) -> f64 {
        self.band_ratio
    }

    /// Return the adaptive alpha.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Return the band radius for an alignment of `n` template frames against
    /// `m` test frames. Symmetric in `n` and `m`.
    ///
    /// Capped at `max(n, m)`, which already covers the whole matrix.
    #[must_use]
    pub fn width(&self, n: usize, m: usize) -> usize {
        let longest = n.max(m);
        let base = (longest as f64 * self.band_ratio).floor();
        let adaptive = (n.abs_diff(m) as f64 + self.alpha * n.min(m) as f64).floor();
        let width = base.max(adaptive);
        if width >= longest as f64 {
            longest
        } else {
            width as usize
        }
    }
}

impl Default for AdaptiveBand {
    fn default() -> Self {
        Self {
            band_ratio: Self::DEFAULT_BAND_RATIO,
            alpha: Self::DEFAULT_ALPHA,
        }
    }
}

fn check_ratio(name: &'static str, value: f64) -> Result<(), DtwError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DtwError::InvalidParameter { name, value });
    }
    Ok(())
}

/// Which transitions a DTW row may take, on top of the band radius.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepPolicy {
    /// Any column within the band radius of the diagonal.
    #[default]
    Unconstrained,

    /// Only columns within one frame of the diagonal (and within the band),
    /// modelling a frame-synchronous decoder.
    TimeSynchronous,
}

impl StepPolicy {
    /// Return the columns evaluated in cost-matrix row `row` (1-based, matching
    /// the `(n+1) x (m+1)` matrix whose row and column 0 are the boundary).
    ///
    /// The range is empty when the band leaves no column in this row.
    #[must_use]
    pub fn column_range(self, row: usize, band: usize, m: usize) -> Range<usize> {
        let reach = match self {
            Self::Unconstrained => band,
            Self::TimeSynchronous => band.min(1),
        };
        let start = row.saturating_sub(reach).max(1);
        let end = row.saturating_add(reach).min(m) + 1;
        start..end.max(start)
    }

    /// Return the maximum number of columns any row can span.
    #[must_use]
    pub fn max_row_width(self, band: usize) -> usize {
        match self {
            Self::Unconstrained => band.saturating_mul(2).saturating_add(1),
            Self::TimeSynchronous => 2 * band.min(1) + 1,
        }
    }
}

impl fmt::Display for StepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconstrained => f.write_str("unconstrained"),
            Self::TimeSynchronous => f.write_str("time-synchronous"),
        }
    }
}

impl FromStr for StepPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unconstrained" => Ok(Self::Unconstrained),
            "time-sync" | "time-synchronous" => Ok(Self::TimeSynchronous),
            other => Err(format!(
                "unknown step policy: {other} (expected unconstrained or time-sync)"
            )),
        }
    }
}
