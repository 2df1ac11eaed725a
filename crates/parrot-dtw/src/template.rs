//! Labelled template collections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DtwError;
use crate::label::Digit;
use crate::sequence::FeatureSequence;

/// Reference sequences grouped by digit.
///
/// Labels iterate in ascending digit order; each label's templates keep their
/// insertion (recording) order. All templates share one frame dimension and
/// every stored label has at least one template; deserialization enforces both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTemplateSet")]
pub struct TemplateSet {
    templates: BTreeMap<Digit, Vec<FeatureSequence>>,
}

/// Unchecked wire form of [`TemplateSet`].
#[derive(Deserialize)]
struct RawTemplateSet {
    templates: BTreeMap<Digit, Vec<FeatureSequence>>,
}

impl TryFrom<RawTemplateSet> for TemplateSet {
    type Error = DtwError;

    fn try_from(raw: RawTemplateSet) -> Result<Self, Self::Error> {
        let mut set = Self::new();
        for (digit, templates) in raw.templates {
            if templates.is_empty() {
                return Err(DtwError::EmptyTemplates);
            }
            for template in templates {
                set.insert(digit, template)?;
            }
        }
        Ok(set)
    }
}

impl TemplateSet {
    /// Create an empty template set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a template for `digit`.
    ///
    /// # Errors
    ///
    /// Returns [`DtwError::DimensionMismatch`] if `template` has a different
    /// frame dimension from templates already in the set.
    pub fn insert(&mut self, digit: Digit, template: FeatureSequence) -> Result<(), DtwError> {
        if let Some(dim) = self.dim()
            && dim != template.dim()
        {
            return Err(DtwError::DimensionMismatch {
                expected: dim,
                got: template.dim(),
            });
        }
        self.templates.entry(digit).or_default().push(template);
        Ok(())
    }

    /// Return the templates recorded for `digit`, in insertion order.
    #[must_use]
    pub fn templates(&self, digit: Digit) -> &[FeatureSequence] {
        self.templates.get(&digit).map_or(&[], Vec::as_slice)
    }

    /// Iterate over `(digit, templates)` in ascending digit order.
    pub fn iter(&self) -> impl Iterator<Item = (Digit, &[FeatureSequence])> + '_ {
        self.templates.iter().map(|(&d, t)| (d, t.as_slice()))
    }

    /// Return the labels that have at least one template, ascending.
    #[must_use]
    pub fn labels(&self) -> Vec<Digit> {
        self.templates.keys().copied().collect()
    }

    /// Return the number of labels.
    #[must_use]
    pub fn n_labels(&self) -> usize {
        self.templates.len()
    }

    /// Return the total number of templates across all labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.values().map(Vec::len).sum()
    }

    /// Return true if the set holds no templates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the shared frame dimension, or `None` for an empty set.
    #[must_use]
    pub fn dim(&self) -> Option<usize> {
        self.templates
            .values()
            .flat_map(|t| t.first())
            .map(FeatureSequence::dim)
            .next()
    }

    /// Return a copy keeping at most the first `per_label` templates of each digit.
    #[must_use]
    pub fn truncated(&self, per_label: usize) -> Self {
        let templates = self
            .templates
            .iter()
            .filter(|_| per_label > 0)
            .map(|(&d, t)| (d, t.iter().take(per_label).cloned().collect()))
            .collect();
        Self { templates }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(dim: usize, n: usize, fill: f64) -> FeatureSequence {
        FeatureSequence::from_flat(dim, vec![fill; dim * n]).unwrap()
    }

    fn digit(v: u8) -> Digit {
        Digit::new(v).unwrap()
    }

    #[test]
    fn labels_iterate_ascending() {
        let mut set = TemplateSet::new();
        set.insert(digit(7), seq(2, 3, 0.0)).unwrap();
        set.insert(digit(2), seq(2, 3, 0.0)).unwrap();
        set.insert(digit(5), seq(2, 3, 0.0)).unwrap();
        assert_eq!(set.labels(), vec![digit(2), digit(5), digit(7)]);
    }

    #[test]
    fn templates_keep_insertion_order() {
        let mut set = TemplateSet::new();
        set.insert(digit(1), seq(1, 2, 1.0)).unwrap();
        set.insert(digit(1), seq(1, 4, 2.0)).unwrap();
        let t = set.templates(digit(1));
        assert_eq!(t.len(), 2);
        assert_eq!(t[0].len(), 2);
        assert_eq!(t[1].len(), 4);
    }

    #[test]
    fn rejects_mismatched_dimension() {
        let mut set = TemplateSet::new();
        set.insert(digit(0), seq(39, 5, 0.0)).unwrap();
        assert!(matches!(
            set.insert(digit(1), seq(13, 5, 0.0)),
            Err(DtwError::DimensionMismatch { expected: 39, got: 13 })
        ));
    }

    #[test]
    fn missing_label_is_empty_slice() {
        let set = TemplateSet::new();
        assert!(set.templates(digit(4)).is_empty());
        assert!(set.is_empty());
        assert_eq!(set.dim(), None);
    }

    #[test]
    fn rebuild_rejects_mixed_dimensions() {
        let raw = RawTemplateSet {
            templates: BTreeMap::from([
                (digit(0), vec![seq(2, 4, 0.0)]),
                (digit(1), vec![seq(3, 4, 0.0)]),
            ]),
        };
        assert!(matches!(
            TemplateSet::try_from(raw),
            Err(DtwError::DimensionMismatch { expected: 2, got: 3 })
        ));
    }

    #[test]
    fn rebuild_rejects_empty_label() {
        let raw = RawTemplateSet {
            templates: BTreeMap::from([(digit(0), vec![seq(2, 4, 0.0)]), (digit(5), vec![])]),
        };
        assert!(matches!(TemplateSet::try_from(raw), Err(DtwError::EmptyTemplates)));
    }

    #[test]
    fn truncated_keeps_first_templates() {
        let mut set = TemplateSet::new();
        for n in 1..=3 {
            set.insert(digit(3), seq(1, n, 0.0)).unwrap();
            set.insert(digit(8), seq(1, n, 0.0)).unwrap();
        }
        let one = set.truncated(1);
        assert_eq!(one.len(), 2);
        assert_eq!(one.templates(digit(3))[0].len(), 1);
        assert!(set.truncated(0).is_empty());
    }
}
