//! Adaptive-band DTW alignment.

use tracing::{instrument, trace};

use crate::constraint::{AdaptiveBand, StepPolicy};
use crate::distance::{DtwDistance, euclidean};
use crate::error::DtwError;
use crate::matrix::CostMatrix;
use crate::preprocess::normalize;
use crate::sequence::{FeatureSequence, SequenceView};

/// Immutable DTW aligner configuration. Thread-safe and copyable.
///
/// Every public alignment normalizes both inputs (see
/// [`normalize`](crate::normalize)) before computing the accumulated cost
/// over the `(n+1) x (m+1)` matrix with `C[0][0] = 0` and all other boundary
/// cells unreachable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Dtw {
    band: AdaptiveBand,
}

impl Dtw {
    /// Create an aligner with the given adaptive band.
    #[must_use]
    pub fn new(band: AdaptiveBand) -> Self {
        Self { band }
    }

    /// Return the adaptive band configuration.
    #[must_use]
    pub fn band(&self) -> AdaptiveBand {
        self.band
    }

    /// Align `template` against `test` with the unconstrained step policy.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::DimensionMismatch`] | The sequences have different frame dimensions |
    /// | [`DtwError::NoAlignmentPath`] | The band leaves `(n, m)` unreachable |
    pub fn align(
        &self,
        template: SequenceView<'_>,
        test: SequenceView<'_>,
    ) -> Result<DtwDistance, DtwError> {
        self.align_with(StepPolicy::Unconstrained, template, test)
    }

    /// Align `template` against `test` with the time-synchronous step policy.
    ///
    /// The result is never smaller than [`align`](Self::align) on the same
    /// inputs.
    ///
    /// # Errors
    ///
    /// Same as [`align`](Self::align). Sequences whose lengths differ by more
    /// than one frame always fail with [`DtwError::NoAlignmentPath`].
    pub fn align_time_sync(
        &self,
        template: SequenceView<'_>,
        test: SequenceView<'_>,
    ) -> Result<DtwDistance, DtwError> {
        self.align_with(StepPolicy::TimeSynchronous, template, test)
    }

    /// Align `template` against `test` with an explicit step policy.
    ///
    /// # Errors
    ///
    /// Same as [`align`](Self::align).
    #[instrument(skip(self, template, test), fields(n = template.len(), m = test.len()))]
    pub fn align_with(
        &self,
        policy: StepPolicy,
        template: SequenceView<'_>,
        test: SequenceView<'_>,
    ) -> Result<DtwDistance, DtwError> {
        check_dims(template, test)?;
        let template = normalize(template);
        let test = normalize(test);
        self.align_normalized(policy, &template, &test)
    }

    /// Build the dense accumulated cost matrix for `template` against `test`.
    ///
    /// Allocates `(n+1) * (m+1)` cells; out-of-band cells hold `f64::INFINITY`.
    /// Intended for inspection and export. Use [`align_with`](Self::align_with)
    /// when only the distance is needed.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::DimensionMismatch`] | The sequences have different frame dimensions |
    #[instrument(skip(self, template, test), fields(n = template.len(), m = test.len()))]
    pub fn cost_matrix(
        &self,
        policy: StepPolicy,
        template: SequenceView<'_>,
        test: SequenceView<'_>,
    ) -> Result<CostMatrix, DtwError> {
        check_dims(template, test)?;
        let template = normalize(template);
        let test = normalize(test);
        Ok(self.dense(policy, template.as_view(), test.as_view()))
    }

    /// Align two sequences that have already been normalized.
    pub(crate) fn align_normalized(
        &self,
        policy: StepPolicy,
        template: &FeatureSequence,
        test: &FeatureSequence,
    ) -> Result<DtwDistance, DtwError> {
        let n = template.len();
        let m = test.len();
        let band = self.band.width(n, m);
        let cost = rolling(policy, band, template.as_view(), test.as_view());
        trace!(n, m, band, %policy, cost, "alignment computed");
        if cost.is_finite() {
            Ok(DtwDistance::new(cost))
        } else {
            Err(DtwError::NoAlignmentPath { n, m, band, policy })
        }
    }

    /// Full-matrix recurrence; the reference for the rolling computation.
    fn dense(&self, policy: StepPolicy, a: SequenceView<'_>, b: SequenceView<'_>) -> CostMatrix {
        let n = a.len();
        let m = b.len();
        let band = self.band.width(n, m);
        let mut matrix = CostMatrix::unreachable(n + 1, m + 1, band, policy);
        matrix.set(0, 0, 0.0);

        for i in 1..=n {
            for j in policy.column_range(i, band, m) {
                let best = matrix
                    .get(i - 1, j)
                    .min(matrix.get(i, j - 1))
                    .min(matrix.get(i - 1, j - 1));
                matrix.set(i, j, euclidean(a.frame(i - 1), b.frame(j - 1)) + best);
            }
        }
        matrix
    }
}

fn check_dims(template: SequenceView<'_>, test: SequenceView<'_>) -> Result<(), DtwError> {
    if template.dim() != test.dim() {
        return Err(DtwError::DimensionMismatch {
            expected: template.dim(),
            got: test.dim(),
        });
    }
    Ok(())
}

/// One band-limited row of the cost matrix: `values[k]` is column `start + k`.
struct BandRow {
    start: usize,
    values: Vec<f64>,
}

impl BandRow {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            start: 0,
            values: Vec::with_capacity(capacity),
        }
    }

    /// Cost at column `j`, or infinity when `j` lies outside the stored band.
    #[inline]
    fn at(&self, j: usize) -> f64 {
        j.checked_sub(self.start)
            .and_then(|k| self.values.get(k))
            .copied()
            .unwrap_or(f64::INFINITY)
    }
}

/// Two-row rolling DTW holding only the active band of each row.
///
/// Runs in O(n * band) time and O(band) memory. Returns `f64::INFINITY` when
/// `(n, m)` is unreachable.
fn rolling(policy: StepPolicy, band: usize, a: SequenceView<'_>, b: SequenceView<'_>) -> f64 {
    let n = a.len();
    let m = b.len();
    let width = policy.max_row_width(band).min(m + 1);

    // Row 0 holds only the origin C[0][0] = 0.
    let mut prev = BandRow::with_capacity(width);
    prev.values.push(0.0);
    let mut curr = BandRow::with_capacity(width);

    for i in 1..=n {
        let cols = policy.column_range(i, band, m);
        if cols.is_empty() {
            // Every later row only reads this one (and itself), so nothing
            // below can be reached.
            return f64::INFINITY;
        }

        curr.start = cols.start;
        curr.values.clear();
        let frame = a.frame(i - 1);
        let mut left = f64::INFINITY;
        for j in cols {
            let best = prev.at(j).min(prev.at(j - 1)).min(left);
            let cost = euclidean(frame, b.frame(j - 1)) + best;
            curr.values.push(cost);
            left = cost;
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    prev.at(m)
}
