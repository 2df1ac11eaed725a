//! Per-chunk amplitude and zero-crossing measurements.

use serde::Serialize;

/// Mean absolute sample value. Returns 0.0 for an empty slice.
///
/// Accumulates in `i64` so that `i16::MIN` does not overflow.
#[must_use]
pub fn average_amplitude(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: i64 = samples.iter().map(|&s| i64::from(s).abs()).sum();
    sum as f64 / samples.len() as f64
}

/// Fraction of adjacent sample pairs whose sign differs, in `[0, 1]`.
///
/// A sample is non-negative when `>= 0`, so zero never starts a crossing on
/// its own side. Returns 0.0 for fewer than two samples.
#[must_use]
pub fn zero_crossing_rate(samples: &[i16]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0) != (w[1] >= 0))
        .count();
    crossings as f64 / (samples.len() - 1) as f64
}

/// Scalar measurements of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChunkStats {
    /// Mean absolute amplitude.
    pub average_amplitude: f64,
    /// Zero-crossing rate.
    pub zero_crossing_rate: f64,
}

impl ChunkStats {
    /// Measure both quantities over `samples`.
    #[must_use]
    pub fn measure(samples: &[i16]) -> Self {
        Self {
            average_amplitude: average_amplitude(samples),
            zero_crossing_rate: zero_crossing_rate(samples),
        }
    }

    /// True when both measurements fall strictly below their thresholds.
    #[must_use]
    pub fn is_silent(&self, amplitude_threshold: f64, zcr_threshold: f64) -> bool {
        self.average_amplitude < amplitude_threshold && self.zero_crossing_rate < zcr_threshold
    }
}
