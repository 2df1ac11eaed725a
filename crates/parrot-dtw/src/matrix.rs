//! Dense accumulated cost matrix for inspecting a single alignment.

use std::ops::Index;

use crate::constraint::StepPolicy;
use crate::distance::DtwDistance;

/// Row-major `(n+1) x (m+1)` accumulated cost table.
///
/// Row and column 0 form the boundary: `(0, 0)` is zero and every other
/// boundary cell is `f64::INFINITY`. Cells outside the evaluated band are also
/// `f64::INFINITY`.
#[derive(Debug, Clone)]
pub struct CostMatrix {
    rows: usize,
    cols: usize,
    band: usize,
    policy: StepPolicy,
    data: Vec<f64>,
}

impl CostMatrix {
    /// Create a matrix with every cell unreachable.
    pub(crate) fn unreachable(rows: usize, cols: usize, band: usize, policy: StepPolicy) -> Self {
        Self {
            rows,
            cols,
            band,
            policy,
            data: vec![f64::INFINITY; rows * cols],
        }
    }

    pub(crate) fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.cols + j] = value;
    }

    /// Return the number of rows (`n + 1`).
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Return the number of columns (`m + 1`).
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Return the band radius used to fill the matrix.
    #[must_use]
    pub fn band(&self) -> usize {
        self.band
    }

    /// Return the step policy used to fill the matrix.
    #[must_use]
    pub fn policy(&self) -> StepPolicy {
        self.policy
    }

    /// Return the accumulated cost at `(i, j)`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= rows` or `j >= cols`.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.rows, "row index {i} out of bounds for {} rows", self.rows);
        assert!(j < self.cols, "column index {j} out of bounds for {} columns", self.cols);
        self.data[i * self.cols + j]
    }

    /// Return row `i` as a slice.
    #[must_use]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Iterate over rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.data.chunks_exact(self.cols)
    }

    /// Return true if `(i, j)` was reached by some alignment path.
    #[must_use]
    pub fn is_reachable(&self, i: usize, j: usize) -> bool {
        self.get(i, j).is_finite()
    }

    /// Return the alignment cost at `(n, m)`, or `None` if it is unreachable.
    #[must_use]
    pub fn terminal(&self) -> Option<DtwDistance> {
        let cost = self.get(self.rows - 1, self.cols - 1);
        cost.is_finite().then(|| DtwDistance::new(cost))
    }
}

impl Index<(usize, usize)> for CostMatrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        &self.data[i * self.cols + j]
    }
}
