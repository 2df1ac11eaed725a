//! Error types for sequence validation, alignment and classification.

use crate::constraint::StepPolicy;

/// Broad category of a [`DtwError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied malformed or inconsistent data.
    InvalidInput,
    /// Band pruning left the terminal cell of the cost matrix unreachable.
    NoAlignmentPath,
}

/// Errors from feature sequence validation, DTW alignment and template classification.
#[derive(Debug, thiserror::Error)]
pub enum DtwError {
    /// Returned when a feature sequence has no frames.
    #[error("feature sequence must contain at least one frame")]
    EmptySequence,

    /// Returned when frames have zero feature dimensions.
    #[error("feature frames must have at least one dimension")]
    ZeroDimension,

    /// Returned when a frame's length differs from the first frame's length.
    #[error("frame {frame} has {got} dimensions, expected {expected}")]
    RaggedFrame {
        /// Zero-based index of the offending frame.
        frame: usize,
        /// Dimension established by the first frame.
        expected: usize,
        /// Dimension of the offending frame.
        got: usize,
    },

    /// Returned when a flat buffer is not a whole number of frames.
    #[error("buffer of {len} values is not a multiple of frame dimension {dim}")]
    PartialFrame {
        /// Length of the flat buffer.
        len: usize,
        /// Requested frame dimension.
        dim: usize,
    },

    /// Returned when a feature value is NaN or infinite.
    #[error("non-finite feature value at frame {frame}, dimension {dim}")]
    NonFiniteValue {
        /// Zero-based frame index.
        frame: usize,
        /// Zero-based dimension index.
        dim: usize,
    },

    /// Returned when two sequences (or a sequence and a template set) disagree on D.
    #[error("feature dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Dimension of the reference side (template or template set).
        expected: usize,
        /// Dimension of the other side.
        got: usize,
    },

    /// Returned when a tuning parameter is negative or not finite.
    #[error("parameter {name} must be finite and non-negative, got {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// Returned when a digit label is outside `0..=9`.
    #[error("digit label must be in 0..=9, got {value}")]
    InvalidDigit {
        /// Rejected value.
        value: u8,
    },

    /// Returned when a digit name or numeral cannot be parsed.
    #[error("unknown digit \"{name}\"")]
    UnknownDigit {
        /// The unparseable text.
        name: String,
    },

    /// Returned when a label's template list is empty.
    #[error("template list must not be empty")]
    EmptyTemplates,

    /// Returned when classification is attempted against an empty template set.
    #[error("template set contains no templates")]
    EmptyTemplateSet,

    /// Returned when the band excludes every path to the terminal cell `(n, m)`.
    #[error("no alignment path within band {band} for {n} x {m} frames ({policy:?})")]
    NoAlignmentPath {
        /// Template length.
        n: usize,
        /// Test length.
        m: usize,
        /// Adaptive band width that was applied.
        band: usize,
        /// Step policy that was applied.
        policy: StepPolicy,
    },
}

impl DtwError {
    /// Return the broad category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoAlignmentPath { .. } => ErrorKind::NoAlignmentPath,
            _ => ErrorKind::InvalidInput,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_terminal_has_its_own_kind() {
        let err = DtwError::NoAlignmentPath {
            n: 10,
            m: 3,
            band: 1,
            policy: StepPolicy::TimeSynchronous,
        };
        assert_eq!(err.kind(), ErrorKind::NoAlignmentPath);
    }

    #[test]
    fn validation_errors_are_invalid_input() {
        assert_eq!(DtwError::EmptyTemplates.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            DtwError::DimensionMismatch { expected: 39, got: 13 }.kind(),
            ErrorKind::InvalidInput
        );
    }
}
