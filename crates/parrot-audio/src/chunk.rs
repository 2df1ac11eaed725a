//! Fixed-length PCM chunks and the utterances built from them.

use crate::analysis::ChunkStats;
use crate::error::AudioError;

/// A block of signed 16-bit mono samples tagged with its sample rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl AudioChunk {
    /// Wrap `samples` captured at `sample_rate`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AudioError::EmptyChunk`] | `samples` is empty |
    /// | [`AudioError::InvalidConfig`] | `sample_rate` is zero |
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Result<Self, AudioError> {
        if samples.is_empty() {
            return Err(AudioError::EmptyChunk);
        }
        if sample_rate == 0 {
            return Err(AudioError::InvalidConfig {
                field: "sample_rate",
                reason: "must be positive".to_string(),
            });
        }
        Ok(Self { samples, sample_rate })
    }

    /// Return the samples.
    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Return the sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Return the number of samples (always at least 1).
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Measure amplitude and zero-crossing rate.
    #[must_use]
    pub fn stats(&self) -> ChunkStats {
        ChunkStats::measure(&self.samples)
    }
}

/// The concatenated chunks of one capture session.
///
/// Only the capture loop appends to an utterance; callers receive it read-only
/// inside a [`Recording`](crate::Recording).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    samples: Vec<i16>,
    sample_rate: u32,
    chunk_size: usize,
}

impl Utterance {
    pub(crate) fn new(sample_rate: u32, chunk_size: usize) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            chunk_size,
        }
    }

    pub(crate) fn push(&mut self, chunk: &AudioChunk) {
        debug_assert_eq!(chunk.len(), self.chunk_size);
        self.samples.extend_from_slice(chunk.samples());
    }

    /// Return every captured sample, trailing silence included.
    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Consume the utterance and return its samples.
    #[must_use]
    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    /// Return the sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Return the chunk length the utterance was captured with.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Return the number of captured chunks.
    #[must_use]
    pub fn n_chunks(&self) -> usize {
        self.samples.len() / self.chunk_size
    }

    /// Iterate over the captured chunks in order.
    pub fn chunks(&self) -> impl ExactSizeIterator<Item = &[i16]> + '_ {
        self.samples.chunks_exact(self.chunk_size)
    }

    /// Return the duration in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}
