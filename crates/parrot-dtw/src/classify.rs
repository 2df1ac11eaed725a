//! Nearest-template classification.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::constraint::StepPolicy;
use crate::distance::DtwDistance;
use crate::dtw::Dtw;
use crate::error::DtwError;
use crate::label::Digit;
use crate::preprocess::normalize;
use crate::sequence::{FeatureSequence, SequenceView};
use crate::template::TemplateSet;

/// Best-matching template within one label's template list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemplateMatch {
    /// Position of the template in the list.
    pub index: usize,
    /// Alignment cost against that template.
    pub distance: DtwDistance,
}

/// The recognition decision for one test sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecognitionResult {
    /// Winning digit.
    pub label: Digit,
    /// Alignment cost against the winning template.
    pub distance: DtwDistance,
    /// Position of the winning template within its label's list.
    pub template_index: usize,
}

/// Minimum-distance classifier over a [`TemplateSet`].
///
/// Templates are compared in parallel; the per-template results are merged in
/// list order so that ties always resolve to the earliest template (and the
/// lowest digit across labels). A template whose alignment has no path within
/// the band contributes no distance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Classifier {
    dtw: Dtw,
    policy: StepPolicy,
}

impl Classifier {
    /// Create a classifier using `dtw` and the unconstrained step policy.
    #[must_use]
    pub fn new(dtw: Dtw) -> Self {
        Self {
            dtw,
            policy: StepPolicy::Unconstrained,
        }
    }

    /// Set the step policy used for every alignment.
    #[must_use]
    pub fn with_policy(mut self, policy: StepPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Return the aligner.
    #[must_use]
    pub fn dtw(&self) -> Dtw {
        self.dtw
    }

    /// Return the step policy.
    #[must_use]
    pub fn policy(&self) -> StepPolicy {
        self.policy
    }

    /// Find the template in `templates` closest to `test`.
    ///
    /// The test sequence is normalized once and each template independently.
    /// The minimum only moves on a strict improvement, so the earliest of
    /// several equally distant templates wins.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::EmptyTemplates`] | `templates` is empty |
    /// | [`DtwError::DimensionMismatch`] | A template's dimension differs from `test` |
    /// | [`DtwError::NoAlignmentPath`] | No template is reachable within its band |
    #[instrument(skip(self, templates, test), fields(n_templates = templates.len(), m = test.len()))]
    pub fn recognize_against_set(
        &self,
        templates: &[FeatureSequence],
        test: SequenceView<'_>,
    ) -> Result<TemplateMatch, DtwError> {
        if templates.is_empty() {
            return Err(DtwError::EmptyTemplates);
        }
        let test = normalize(test);
        self.best_template(templates, &test)
    }

    /// Classify `test` against every label of `set`.
    ///
    /// Labels are visited in ascending digit order and the global minimum is
    /// kept with the same strict-improvement rule as
    /// [`recognize_against_set`](Self::recognize_against_set). Labels with no
    /// reachable template are skipped.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::EmptyTemplateSet`] | `set` holds no templates |
    /// | [`DtwError::DimensionMismatch`] | The set's dimension differs from `test` |
    /// | [`DtwError::NoAlignmentPath`] | No template in the set is reachable |
    #[instrument(skip(self, set, test), fields(n_labels = set.n_labels(), m = test.len(), policy = %self.policy))]
    pub fn classify(
        &self,
        set: &TemplateSet,
        test: SequenceView<'_>,
    ) -> Result<RecognitionResult, DtwError> {
        let dim = set.dim().ok_or(DtwError::EmptyTemplateSet)?;
        check_dim(dim, test.dim())?;
        let test = normalize(test);

        let labels: Vec<(Digit, &[FeatureSequence])> = set.iter().collect();
        let outcomes: Vec<(Digit, Result<TemplateMatch, DtwError>)> = labels
            .par_iter()
            .map(|&(digit, templates)| (digit, self.best_template(templates, &test)))
            .collect();

        let mut best: Option<RecognitionResult> = None;
        let mut unreachable: Option<DtwError> = None;
        for (label, outcome) in outcomes {
            match outcome {
                Ok(m) => {
                    debug!(%label, template = m.index, distance = m.distance.value(), "label scored");
                    if best.is_none_or(|b| m.distance < b.distance) {
                        best = Some(RecognitionResult {
                            label,
                            distance: m.distance,
                            template_index: m.index,
                        });
                    }
                }
                Err(err @ DtwError::NoAlignmentPath { .. }) => {
                    debug!(%label, "no template reachable within band");
                    unreachable.get_or_insert(err);
                }
                Err(err) => return Err(err),
            }
        }

        let result = best.ok_or_else(|| unreachable.unwrap_or(DtwError::EmptyTemplateSet))?;
        info!(label = %result.label, distance = result.distance.value(), "recognized");
        Ok(result)
    }

    /// Score every template against an already-normalized test sequence.
    pub(crate) fn best_template(
        &self,
        templates: &[FeatureSequence],
        test: &FeatureSequence,
    ) -> Result<TemplateMatch, DtwError> {
        for template in templates {
            check_dim(template.dim(), test.dim())?;
        }
        let outcomes: Vec<Result<DtwDistance, DtwError>> = templates
            .par_iter()
            .map(|template| {
                let template = normalize(template.as_view());
                self.dtw.align_normalized(self.policy, &template, test)
            })
            .collect();

        let mut best: Option<TemplateMatch> = None;
        let mut unreachable: Option<DtwError> = None;
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(distance) => {
                    debug!(
                        index,
                        band = self.dtw.band().width(templates[index].len(), test.len()),
                        distance = distance.value(),
                        "template scored"
                    );
                    if best.is_none_or(|b| distance < b.distance) {
                        best = Some(TemplateMatch { index, distance });
                    }
                }
                Err(err @ DtwError::NoAlignmentPath { .. }) => {
                    debug!(index, "template unreachable within band");
                    unreachable.get_or_insert(err);
                }
                Err(err) => return Err(err),
            }
        }

        best.ok_or_else(|| unreachable.unwrap_or(DtwError::EmptyTemplates))
    }
}

fn check_dim(expected: usize, got: usize) -> Result<(), DtwError> {
    if expected != got {
        return Err(DtwError::DimensionMismatch { expected, got });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::AdaptiveBand;

    fn wave(n: usize, dim: usize, freq: f64, phase: f64) -> FeatureSequence {
        let data = (0..n * dim)
            .map(|k| ((k / dim) as f64 * freq + (k % dim) as f64 * 0.7 + phase).sin())
            .collect();
        FeatureSequence::from_flat(dim, data).unwrap()
    }

    fn digit(v: u8) -> Digit {
        Digit::new(v).unwrap()
    }

    #[test]
    fn picks_exact_copy() {
        let classifier = Classifier::default();
        let templates = vec![wave(20, 3, 0.9, 0.0), wave(20, 3, 0.2, 1.0), wave(20, 3, 0.5, 2.0)];
        let m = classifier
            .recognize_against_set(&templates, templates[1].as_view())
            .unwrap();
        assert_eq!(m.index, 1);
        assert!(m.distance.value() < 1e-9);
    }

    #[test]
    fn ties_keep_earliest_template() {
        let classifier = Classifier::default();
        let t = wave(15, 2, 0.4, 0.0);
        let templates = vec![wave(15, 2, 1.3, 0.5), t.clone(), t.clone()];
        let m = classifier.recognize_against_set(&templates, t.as_view()).unwrap();
        assert_eq!(m.index, 1);
    }

    #[test]
    fn empty_template_list_is_invalid() {
        let classifier = Classifier::default();
        let test = wave(10, 2, 0.3, 0.0);
        assert!(matches!(
            classifier.recognize_against_set(&[], test.as_view()),
            Err(DtwError::EmptyTemplates)
        ));
    }

    #[test]
    fn mismatched_template_dimension_is_invalid() {
        let classifier = Classifier::default();
        let test = wave(10, 2, 0.3, 0.0);
        let templates = vec![wave(10, 3, 0.3, 0.0)];
        assert!(matches!(
            classifier.recognize_against_set(&templates, test.as_view()),
            Err(DtwError::DimensionMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn classify_returns_matching_label() {
        let mut set = TemplateSet::new();
        set.insert(digit(1), wave(24, 4, 0.9, 0.0)).unwrap();
        set.insert(digit(2), wave(22, 4, 0.3, 1.0)).unwrap();
        set.insert(digit(3), wave(26, 4, 0.6, 2.0)).unwrap();

        let test = set.templates(digit(2))[0].clone();
        let result = Classifier::default().classify(&set, test.as_view()).unwrap();
        assert_eq!(result.label, digit(2));
        assert_eq!(result.template_index, 0);
        assert!(result.distance.value() < 1e-9);
    }

    #[test]
    fn every_template_dimension_is_checked() {
        let classifier = Classifier::default();
        let test = wave(10, 2, 0.3, 0.0);
        let templates = vec![wave(10, 2, 0.3, 0.0), wave(10, 3, 0.3, 0.0)];
        assert!(matches!(
            classifier.recognize_against_set(&templates, test.as_view()),
            Err(DtwError::DimensionMismatch { expected: 3, got: 2 })
        ));
        let normalized = normalize(test.as_view());
        assert!(matches!(
            classifier.best_template(&templates, &normalized),
            Err(DtwError::DimensionMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn classify_ties_keep_lowest_digit() {
        let t = wave(12, 2, 0.5, 0.0);
        let mut set = TemplateSet::new();
        set.insert(digit(6), t.clone()).unwrap();
        set.insert(digit(4), t.clone()).unwrap();
        let result = Classifier::default().classify(&set, t.as_view()).unwrap();
        assert_eq!(result.label, digit(4));
    }

    #[test]
    fn classify_empty_set_is_invalid() {
        let test = wave(10, 2, 0.3, 0.0);
        assert!(matches!(
            Classifier::default().classify(&TemplateSet::new(), test.as_view()),
            Err(DtwError::EmptyTemplateSet)
        ));
    }

    #[test]
    fn time_sync_skips_unreachable_templates() {
        // Only the 20-frame template is within one frame of the 20-frame test.
        let mut set = TemplateSet::new();
        set.insert(digit(0), wave(40, 2, 0.5, 0.0)).unwrap();
        set.insert(digit(5), wave(20, 2, 0.8, 1.0)).unwrap();
        let classifier = Classifier::default().with_policy(StepPolicy::TimeSynchronous);
        let test = wave(20, 2, 0.5, 0.2);
        let result = classifier.classify(&set, test.as_view()).unwrap();
        assert_eq!(result.label, digit(5));
    }

    #[test]
    fn all_unreachable_reports_no_path() {
        let mut set = TemplateSet::new();
        set.insert(digit(0), wave(40, 2, 0.5, 0.0)).unwrap();
        set.insert(digit(1), wave(5, 2, 0.5, 0.0)).unwrap();
        let classifier = Classifier::new(Dtw::new(AdaptiveBand::default()))
            .with_policy(StepPolicy::TimeSynchronous);
        let test = wave(20, 2, 0.5, 0.0);
        assert!(matches!(
            classifier.classify(&set, test.as_view()),
            Err(DtwError::NoAlignmentPath { .. })
        ));
    }
}
