//! Feature sequence types with validation guarantees.

use serde::{Deserialize, Serialize};

use crate::error::DtwError;

/// Owned, validated feature sequence.
///
/// Frames are stored row-major in a single buffer. Guaranteed non-empty, with a
/// frame dimension of at least one and all values finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SequenceParts", into = "SequenceParts")]
pub struct FeatureSequence {
    dim: usize,
    data: Vec<f64>,
}

/// Serialized form of a [`FeatureSequence`], re-validated on deserialization.
#[derive(Serialize, Deserialize)]
struct SequenceParts {
    dim: usize,
    data: Vec<f64>,
}

impl TryFrom<SequenceParts> for FeatureSequence {
    type Error = DtwError;

    fn try_from(parts: SequenceParts) -> Result<Self, Self::Error> {
        Self::from_flat(parts.dim, parts.data)
    }
}

impl From<FeatureSequence> for SequenceParts {
    fn from(seq: FeatureSequence) -> Self {
        Self {
            dim: seq.dim,
            data: seq.data,
        }
    }
}

impl FeatureSequence {
    /// Create a sequence from a list of frames.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::EmptySequence`] | `frames` is empty |
    /// | [`DtwError::ZeroDimension`] | The first frame is empty |
    /// | [`DtwError::RaggedFrame`] | A frame's length differs from the first |
    /// | [`DtwError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn new(frames: Vec<Vec<f64>>) -> Result<Self, DtwError> {
        let dim = frames.first().ok_or(DtwError::EmptySequence)?.len();
        if dim == 0 {
            return Err(DtwError::ZeroDimension);
        }
        let mut data = Vec::with_capacity(frames.len() * dim);
        for (frame, values) in frames.iter().enumerate() {
            if values.len() != dim {
                return Err(DtwError::RaggedFrame {
                    frame,
                    expected: dim,
                    got: values.len(),
                });
            }
            data.extend_from_slice(values);
        }
        Self::from_flat(dim, data)
    }

    /// Create a sequence from a row-major buffer of `dim`-sized frames.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::ZeroDimension`] | `dim` is zero |
    /// | [`DtwError::EmptySequence`] | `data` is empty |
    /// | [`DtwError::PartialFrame`] | `data.len()` is not a multiple of `dim` |
    /// | [`DtwError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn from_flat(dim: usize, data: Vec<f64>) -> Result<Self, DtwError> {
        validate(dim, &data)?;
        Ok(Self { dim, data })
    }

    /// Wrap data already known to be valid.
    pub(crate) fn new_unchecked(dim: usize, data: Vec<f64>) -> Self {
        debug_assert!(validate(dim, &data).is_ok());
        Self { dim, data }
    }

    /// Borrow this sequence as a zero-copy view.
    #[must_use]
    pub fn as_view(&self) -> SequenceView<'_> {
        SequenceView {
            dim: self.dim,
            data: &self.data,
        }
    }

    /// Return the number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    /// Return true if the sequence has no frames.
    ///
    /// Always `false` for validated instances; provided for the
    /// `len_without_is_empty` convention.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Return the frame dimension D.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Return frame `t`.
    ///
    /// # Panics
    ///
    /// Panics if `t >= self.len()`.
    #[must_use]
    pub fn frame(&self, t: usize) -> &[f64] {
        &self.data[t * self.dim..(t + 1) * self.dim]
    }

    /// Iterate over frames in order.
    pub fn frames(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.data.chunks_exact(self.dim)
    }

    /// Return the row-major value buffer.
    #[must_use]
    pub fn as_flat(&self) -> &[f64] {
        &self.data
    }

    /// Consume and return the row-major value buffer.
    #[must_use]
    pub fn into_flat(self) -> Vec<f64> {
        self.data
    }
}

/// Borrowed, validated view into a feature sequence.
#[derive(Debug, Clone, Copy)]
pub struct SequenceView<'a> {
    dim: usize,
    data: &'a [f64],
}

impl<'a> SequenceView<'a> {
    /// Create a view over a row-major buffer, validating it like
    /// [`FeatureSequence::from_flat`].
    ///
    /// # Errors
    ///
    /// Same variants as [`FeatureSequence::from_flat`].
    pub fn new(dim: usize, data: &'a [f64]) -> Result<Self, DtwError> {
        validate(dim, data)?;
        Ok(Self { dim, data })
    }

    /// Return the number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    /// Return true if the view has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Return the frame dimension D.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Return frame `t`.
    #[must_use]
    pub fn frame(&self, t: usize) -> &'a [f64] {
        &self.data[t * self.dim..(t + 1) * self.dim]
    }

    /// Iterate over frames in order.
    pub fn frames(&self) -> impl ExactSizeIterator<Item = &'a [f64]> + 'a {
        self.data.chunks_exact(self.dim)
    }

    /// Return the underlying row-major buffer.
    #[must_use]
    pub fn as_flat(&self) -> &'a [f64] {
        self.data
    }
}

impl<'a> From<&'a FeatureSequence> for SequenceView<'a> {
    fn from(seq: &'a FeatureSequence) -> Self {
        seq.as_view()
    }
}

fn validate(dim: usize, data: &[f64]) -> Result<(), DtwError> {
    if dim == 0 {
        return Err(DtwError::ZeroDimension);
    }
    if data.is_empty() {
        return Err(DtwError::EmptySequence);
    }
    if data.len() % dim != 0 {
        return Err(DtwError::PartialFrame {
            len: data.len(),
            dim,
        });
    }
    if let Some(index) = data.iter().position(|v| !v.is_finite()) {
        return Err(DtwError::NonFiniteValue {
            frame: index / dim,
            dim: index % dim,
        });
    }
    Ok(())
}
