//! Recognition accuracy over a labelled test corpus.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::classify::Classifier;
use crate::error::DtwError;
use crate::label::Digit;
use crate::sequence::FeatureSequence;
use crate::template::TemplateSet;

/// Correct/total counts for one spoken digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DigitScore {
    /// The spoken (true) digit.
    pub digit: Digit,
    /// Tests of this digit recognized correctly.
    pub correct: usize,
    /// Tests of this digit that had no reachable template.
    pub rejected: usize,
    /// Tests of this digit.
    pub total: usize,
}

/// Outcome of classifying a labelled corpus.
///
/// `confusion[spoken][recognized]` counts recognitions. Tests for which no
/// template was reachable are counted as rejected and as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    confusion: [[usize; 10]; 10],
    rejected: [usize; 10],
}

impl Evaluation {
    /// Return the number of tests.
    #[must_use]
    pub fn total(&self) -> usize {
        self.confusion.iter().flatten().sum::<usize>() + self.rejected.iter().sum::<usize>()
    }

    /// Return the number of correctly recognized tests.
    #[must_use]
    pub fn correct(&self) -> usize {
        (0..10).map(|d| self.confusion[d][d]).sum()
    }

    /// Return the number of tests without any reachable template.
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.rejected.iter().sum()
    }

    /// Return the fraction of tests recognized correctly, or 0.0 when empty.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.correct() as f64 / total as f64
        }
    }

    /// Return per-digit scores for every digit that had at least one test.
    #[must_use]
    pub fn per_digit(&self) -> Vec<DigitScore> {
        Digit::ALL
            .iter()
            .map(|&digit| {
                let d = digit.index();
                DigitScore {
                    digit,
                    correct: self.confusion[d][d],
                    rejected: self.rejected[d],
                    total: self.confusion[d].iter().sum::<usize>() + self.rejected[d],
                }
            })
            .filter(|s| s.total > 0)
            .collect()
    }

    /// Return the confusion matrix, indexed `[spoken][recognized]`.
    #[must_use]
    pub fn confusion(&self) -> &[[usize; 10]; 10] {
        &self.confusion
    }
}

impl Classifier {
    /// Classify every `(spoken digit, sequence)` pair in `tests` and tally the
    /// results.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::EmptyTemplateSet`] | `set` holds no templates |
    /// | [`DtwError::DimensionMismatch`] | A test's dimension differs from the set |
    #[instrument(skip(self, set, tests), fields(n_templates = set.len(), n_tests = tests.len()))]
    pub fn evaluate(
        &self,
        set: &TemplateSet,
        tests: &[(Digit, FeatureSequence)],
    ) -> Result<Evaluation, DtwError> {
        if set.is_empty() {
            return Err(DtwError::EmptyTemplateSet);
        }

        let outcomes: Vec<(Digit, Option<Digit>)> = tests
            .par_iter()
            .map(|(spoken, seq)| match self.classify(set, seq.as_view()) {
                Ok(result) => Ok((*spoken, Some(result.label))),
                Err(DtwError::NoAlignmentPath { .. }) => Ok((*spoken, None)),
                Err(err) => Err(err),
            })
            .collect::<Result<_, _>>()?;

        let mut evaluation = Evaluation {
            confusion: [[0; 10]; 10],
            rejected: [0; 10],
        };
        for (spoken, recognized) in outcomes {
            match recognized {
                Some(label) => evaluation.confusion[spoken.index()][label.index()] += 1,
                None => {
                    warn!(%spoken, "test rejected: no template reachable");
                    evaluation.rejected[spoken.index()] += 1;
                }
            }
        }

        info!(
            correct = evaluation.correct(),
            total = evaluation.total(),
            accuracy = evaluation.accuracy(),
            "evaluation complete"
        );
        Ok(evaluation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::StepPolicy;

    fn wave(n: usize, freq: f64) -> FeatureSequence {
        let data = (0..n * 2)
            .map(|k| ((k / 2) as f64 * freq + (k % 2) as f64).sin())
            .collect();
        FeatureSequence::from_flat(2, data).unwrap()
    }

    fn digit(v: u8) -> Digit {
        Digit::new(v).unwrap()
    }

    fn two_digit_set() -> TemplateSet {
        let mut set = TemplateSet::new();
        set.insert(digit(1), wave(20, 0.3)).unwrap();
        set.insert(digit(2), wave(20, 1.2)).unwrap();
        set
    }

    #[test]
    fn perfect_corpus_scores_one() {
        let set = two_digit_set();
        let tests = vec![(digit(1), wave(20, 0.3)), (digit(2), wave(20, 1.2))];
        let eval = Classifier::default().evaluate(&set, &tests).unwrap();
        assert_eq!(eval.total(), 2);
        assert_eq!(eval.correct(), 2);
        assert!((eval.accuracy() - 1.0).abs() < 1e-12);
        assert_eq!(eval.confusion()[1][1], 1);
    }

    #[test]
    fn unreachable_tests_count_as_rejected() {
        let set = two_digit_set();
        let tests = vec![(digit(1), wave(20, 0.3)), (digit(2), wave(60, 1.2))];
        let classifier = Classifier::default().with_policy(StepPolicy::TimeSynchronous);
        let eval = classifier.evaluate(&set, &tests).unwrap();
        assert_eq!(eval.rejected(), 1);
        assert_eq!(eval.correct(), 1);
        assert!((eval.accuracy() - 0.5).abs() < 1e-12);
        let scores = eval.per_digit();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[1].rejected, 1);
    }

    #[test]
    fn empty_corpus_has_zero_accuracy() {
        let eval = Classifier::default().evaluate(&two_digit_set(), &[]).unwrap();
        assert_eq!(eval.total(), 0);
        assert_eq!(eval.accuracy(), 0.0);
    }

    #[test]
    fn empty_set_is_invalid() {
        let tests = vec![(digit(1), wave(20, 0.3))];
        assert!(matches!(
            Classifier::default().evaluate(&TemplateSet::new(), &tests),
            Err(DtwError::EmptyTemplateSet)
        ));
    }
}
