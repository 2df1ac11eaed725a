//! Accuracy regression tests for parrot-dtw.
//!
//! Fixed-seed synthetic sequences guard the alignment recurrence, the adaptive
//! band and the classifier's tie-breaking against regressions.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use parrot_dtw::{
    AdaptiveBand, Classifier, Digit, Dtw, DtwError, FeatureSequence, StepPolicy, TemplateSet,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn seq(dim: usize, values: Vec<f64>) -> FeatureSequence {
    FeatureSequence::from_flat(dim, values).expect("valid test sequence")
}

fn random_seq(rng: &mut ChaCha8Rng, n: usize, dim: usize) -> FeatureSequence {
    let values = (0..n * dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
    seq(dim, values)
}

/// A smooth multi-dimensional contour with additive noise.
fn contour(rng: &mut ChaCha8Rng, n: usize, dim: usize, freq: f64, noise: f64) -> FeatureSequence {
    let values = (0..n * dim)
        .map(|k| {
            let (t, d) = (k / dim, k % dim);
            (t as f64 * freq + d as f64 * 0.9).sin() + rng.gen_range(-noise..=noise)
        })
        .collect();
    seq(dim, values)
}

fn digit(v: u8) -> Digit {
    Digit::new(v).expect("valid digit")
}

// ---------------------------------------------------------------------------
// a) adaptive band width
// ---------------------------------------------------------------------------

#[test]
fn band_width_matches_reference_values() {
    let band = AdaptiveBand::default();
    assert_eq!(band.width(50, 50), 10);
    assert_eq!(band.width(40, 80), 46);
    assert_eq!(band.width(1, 1), 0);
    assert_eq!(AdaptiveBand::new(0.0, 0.0).unwrap().width(30, 30), 0);
}

#[test]
fn band_width_is_symmetric_and_monotone() {
    let ratios = [0.0, 0.1, 0.2, 0.5, 1.0];
    let alphas = [0.0, 0.15, 0.5];
    for n in [1usize, 7, 25, 64] {
        for m in [1usize, 9, 25, 100] {
            for (ri, &r) in ratios.iter().enumerate() {
                for (ai, &a) in alphas.iter().enumerate() {
                    let band = AdaptiveBand::new(r, a).unwrap();
                    let w = band.width(n, m);
                    assert_eq!(w, band.width(m, n), "n={n} m={m} r={r} a={a}");
                    if ri > 0 {
                        let smaller = AdaptiveBand::new(ratios[ri - 1], a).unwrap();
                        assert!(smaller.width(n, m) <= w);
                    }
                    if ai > 0 {
                        let smaller = AdaptiveBand::new(r, alphas[ai - 1]).unwrap();
                        assert!(smaller.width(n, m) <= w);
                    }
                }
            }
        }
    }
}

#[test]
fn invalid_band_parameters_are_rejected() {
    assert!(matches!(
        AdaptiveBand::new(-0.1, 0.15),
        Err(DtwError::InvalidParameter { name: "band_ratio", .. })
    ));
    assert!(matches!(
        AdaptiveBand::new(0.2, f64::NAN),
        Err(DtwError::InvalidParameter { name: "alpha", .. })
    ));
}

// ---------------------------------------------------------------------------
// b) alignment cost
// ---------------------------------------------------------------------------

/// Opposite-phase square waves: every off-diagonal step lines the samples up.
#[test]
fn alignment_matches_hand_computed_value() {
    let a = seq(1, vec![-1.0, 1.0, -1.0, 1.0]);
    let b = seq(1, vec![1.0, -1.0, 1.0, -1.0]);

    let full = Dtw::new(AdaptiveBand::new(1.0, 0.0).unwrap());
    let diagonal = Dtw::new(AdaptiveBand::new(0.0, 0.0).unwrap());

    let unconstrained = full.align(a.as_view(), b.as_view()).unwrap().value();
    let time_sync = full.align_time_sync(a.as_view(), b.as_view()).unwrap().value();
    let diag = diagonal.align(a.as_view(), b.as_view()).unwrap().value();

    assert!((unconstrained - 4.0).abs() < 1e-6, "got {unconstrained}");
    assert!((time_sync - 4.0).abs() < 1e-6, "got {time_sync}");
    assert!((diag - 8.0).abs() < 1e-6, "got {diag}");
}

#[test]
fn self_alignment_is_zero() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let dtw = Dtw::default();
    for n in [1usize, 5, 40] {
        let s = random_seq(&mut rng, n, 13);
        for policy in [StepPolicy::Unconstrained, StepPolicy::TimeSynchronous] {
            let d = dtw.align_with(policy, s.as_view(), s.as_view()).unwrap();
            assert!(d.value() < 1e-9, "n={n} {policy}: {d}");
        }
    }
}

#[test]
fn wider_band_never_increases_cost() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let ratios = [0.05, 0.1, 0.2, 0.4, 1.0];
    for _ in 0..10 {
        let n = rng.gen_range(10..40);
        let m = rng.gen_range(10..40);
        let a = random_seq(&mut rng, n, 4);
        let b = random_seq(&mut rng, m, 4);
        let costs: Vec<f64> = ratios
            .iter()
            .map(|&r| {
                Dtw::new(AdaptiveBand::new(r, 0.15).unwrap())
                    .align(a.as_view(), b.as_view())
                    .unwrap()
                    .value()
            })
            .collect();
        assert!(
            costs.windows(2).all(|w| w[1] <= w[0] + 1e-9),
            "n={n} m={m}: {costs:?}"
        );
    }
}

#[test]
fn oversized_band_matches_full_band() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let a = random_seq(&mut rng, 10, 3);
    let b = random_seq(&mut rng, 17, 3);
    let full = Dtw::new(AdaptiveBand::new(1.0, 0.15).unwrap());
    let huge = Dtw::new(AdaptiveBand::new(1e300, 0.15).unwrap());
    for (x, y) in [(&a, &a), (&a, &b), (&b, &a)] {
        let expected = full.align(x.as_view(), y.as_view()).unwrap().value();
        let got = huge.align(x.as_view(), y.as_view()).unwrap().value();
        assert!((expected - got).abs() < 1e-12, "{expected} vs {got}");
    }
    assert_eq!(huge.align(a.as_view(), a.as_view()).unwrap().value(), 0.0);
}

#[test]
fn extreme_feature_values_still_align() {
    let big = seq(1, vec![1e308, -1e308, 1e308, -1e308, 5e307]);
    let shifted = seq(1, vec![-1e308, 1e308, -1e308, 1e308, 5e307]);
    let dtw = Dtw::default();
    assert!(dtw.align(big.as_view(), big.as_view()).unwrap().value() < 1e-9);
    let d = dtw.align(big.as_view(), shifted.as_view()).unwrap().value();
    assert!(d.is_finite() && d > 0.0);
}

#[test]
fn time_sync_cost_bounds_unconstrained_cost() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let dtw = Dtw::default();
    for _ in 0..10 {
        let n = rng.gen_range(15..30);
        let m = n + rng.gen_range(0..2);
        let a = random_seq(&mut rng, n, 3);
        let b = random_seq(&mut rng, m, 3);
        let free = dtw.align(a.as_view(), b.as_view()).unwrap().value();
        let sync = dtw.align_time_sync(a.as_view(), b.as_view()).unwrap().value();
        assert!(sync + 1e-9 >= free, "sync {sync} < free {free}");
    }
}

#[test]
fn unconstrained_alignment_always_has_a_path() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let dtw = Dtw::new(AdaptiveBand::new(0.0, 0.0).unwrap());
    for (n, m) in [(1, 30), (30, 1), (12, 47)] {
        let a = random_seq(&mut rng, n, 2);
        let b = random_seq(&mut rng, m, 2);
        assert!(dtw.align(a.as_view(), b.as_view()).is_ok(), "n={n} m={m}");
    }
}

#[test]
fn cost_matrix_terminal_matches_alignment() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let dtw = Dtw::default();
    let a = random_seq(&mut rng, 24, 6);
    let b = random_seq(&mut rng, 31, 6);
    for policy in [StepPolicy::Unconstrained, StepPolicy::TimeSynchronous] {
        let matrix = dtw.cost_matrix(policy, a.as_view(), b.as_view()).unwrap();
        assert_eq!((matrix.rows(), matrix.cols()), (25, 32));
        match dtw.align_with(policy, a.as_view(), b.as_view()) {
            Ok(d) => assert!((matrix.terminal().unwrap().value() - d.value()).abs() < 1e-9),
            Err(DtwError::NoAlignmentPath { .. }) => assert!(matrix.terminal().is_none()),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// c) classification
// ---------------------------------------------------------------------------

#[test]
fn noisy_repetitions_are_recognized() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let freqs = [(digit(1), 0.15), (digit(4), 0.45), (digit(8), 0.9)];

    let mut set = TemplateSet::new();
    for &(d, f) in &freqs {
        for _ in 0..3 {
            let n = rng.gen_range(30..40);
            set.insert(d, contour(&mut rng, n, 5, f, 0.05)).unwrap();
        }
    }

    let tests: Vec<(Digit, FeatureSequence)> = freqs
        .iter()
        .flat_map(|&(d, f)| {
            (0..2)
                .map(|_| {
                    let n = rng.gen_range(30..40);
                    (d, contour(&mut rng, n, 5, f, 0.05))
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let classifier = Classifier::default();
    for (spoken, test) in &tests {
        let result = classifier.classify(&set, test.as_view()).unwrap();
        assert_eq!(result.label, *spoken);
    }

    let eval = classifier.evaluate(&set, &tests).unwrap();
    assert_eq!(eval.total(), 6);
    assert_eq!(eval.correct(), 6);
    assert!((eval.accuracy() - 1.0).abs() < 1e-12);
}

#[test]
fn winner_has_strictly_smallest_distance() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mut set = TemplateSet::new();
    for v in 0..3 {
        for _ in 0..2 {
            set.insert(digit(v), random_seq(&mut rng, 20, 4)).unwrap();
        }
    }
    let test = random_seq(&mut rng, 20, 4);
    let classifier = Classifier::default();
    let result = classifier.classify(&set, test.as_view()).unwrap();

    let dtw = classifier.dtw();
    for (label, templates) in set.iter() {
        for (index, template) in templates.iter().enumerate() {
            let d = dtw.align(template.as_view(), test.as_view()).unwrap().value();
            assert!(d + 1e-12 >= result.distance.value());
            let earlier = (label, index) < (result.label, result.template_index);
            if earlier {
                assert!(d > result.distance.value(), "{label}#{index} ties the winner");
            }
        }
    }
}
