//! Per-dimension standardization of feature sequences.

use crate::sequence::{FeatureSequence, SequenceView};

/// Guard added to every standard deviation so near-constant dimensions do not
/// divide by zero.
pub const NORMALIZE_EPSILON: f64 = 1e-8;

/// Standardize every feature dimension of `seq` independently.
///
/// For each dimension `d`, the mean and population standard deviation are
/// taken across all frames, and each value becomes
/// `(x - mean[d]) / (std[d] + NORMALIZE_EPSILON)`. A constant dimension maps to
/// all zeros rather than failing.
#[must_use = "returns a new normalized sequence; the input is unchanged"]
pub fn normalize(seq: SequenceView<'_>) -> FeatureSequence {
    let dim = seq.dim();
    let n = seq.len() as f64;

    // Statistics are taken on values divided by each dimension's peak magnitude
    // so that sums and squares stay finite for any finite input.
    let mut peak = vec![0.0_f64; dim];
    for frame in seq.frames() {
        for (p, &x) in peak.iter_mut().zip(frame) {
            *p = p.max(x.abs());
        }
    }
    let peak: Vec<f64> = peak
        .into_iter()
        .map(|p| if p > 0.0 { p } else { 1.0 })
        .collect();

    let mut mean = vec![0.0; dim];
    for frame in seq.frames() {
        for ((acc, &x), &p) in mean.iter_mut().zip(frame).zip(&peak) {
            *acc += x / p;
        }
    }
    mean.iter_mut().for_each(|m| *m /= n);

    let mut scale = vec![0.0; dim];
    for frame in seq.frames() {
        for (((acc, &x), &mu), &p) in scale.iter_mut().zip(frame).zip(&mean).zip(&peak) {
            let dev = x / p - mu;
            *acc += dev * dev;
        }
    }
    // (x - mean) / (std + eps) == (x/p - mean/p) / (std/p + eps/p)
    for (s, &p) in scale.iter_mut().zip(&peak) {
        *s = (*s / n).sqrt() + NORMALIZE_EPSILON / p;
    }

    let data: Vec<f64> = seq
        .frames()
        .flat_map(|frame| {
            frame
                .iter()
                .zip(&mean)
                .zip(&scale)
                .zip(&peak)
                .map(|(((&x, &mu), &s), &p)| (x / p - mu) / s)
        })
        .collect();

    FeatureSequence::new_unchecked(dim, data)
}

/// Normalize a batch of sequences, each independently.
#[must_use = "returns a new vector of normalized sequences"]
pub fn normalize_batch(seqs: &[FeatureSequence]) -> Vec<FeatureSequence> {
    seqs.iter().map(|s| normalize(s.as_view())).collect()
}
