//! Silence-based endpoint detection over a stream of fixed-size chunks.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::analysis::ChunkStats;
use crate::error::AudioError;

/// Capture rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;
/// Samples per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
/// Mean absolute amplitude below which a chunk may be silent.
pub const DEFAULT_AMPLITUDE_THRESHOLD: f64 = 400.0;
/// Zero-crossing rate below which a chunk may be silent.
pub const DEFAULT_ZCR_THRESHOLD: f64 = 0.5;
/// Seconds of consecutive silence that end an utterance.
pub const DEFAULT_MAX_SILENCE_SECS: f64 = 3.0;
/// Hard limit on the length of one capture.
pub const DEFAULT_MAX_DURATION_SECS: f64 = 30.0;

/// Thresholds and limits for one capture session.
///
/// Setters do not validate; [`validate`](Self::validate) runs when the config is
/// handed to an [`EndpointDetector`] or a [`Recorder`](crate::Recorder).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    sample_rate: u32,
    chunk_size: usize,
    amplitude_threshold: f64,
    zcr_threshold: f64,
    max_silence_secs: f64,
    max_duration_secs: f64,
}

impl EndpointConfig {
    /// Create a config for `sample_rate` Hz and `chunk_size`-sample chunks with
    /// default thresholds.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AudioError::InvalidConfig`] | `sample_rate` or `chunk_size` is zero |
    pub fn new(sample_rate: u32, chunk_size: usize) -> Result<Self, AudioError> {
        let config = Self {
            sample_rate,
            chunk_size,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the amplitude threshold.
    #[must_use]
    pub fn with_amplitude_threshold(mut self, threshold: f64) -> Self {
        self.amplitude_threshold = threshold;
        self
    }

    /// Set the zero-crossing-rate threshold.
    #[must_use]
    pub fn with_zcr_threshold(mut self, threshold: f64) -> Self {
        self.zcr_threshold = threshold;
        self
    }

    /// Set the trailing silence, in seconds, that ends an utterance.
    #[must_use]
    pub fn with_max_silence_secs(mut self, secs: f64) -> Self {
        self.max_silence_secs = secs;
        self
    }

    /// Set the hard limit on capture length, in seconds.
    #[must_use]
    pub fn with_max_duration_secs(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    /// Return the sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Return the chunk length in samples.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Return the amplitude threshold.
    #[must_use]
    pub fn amplitude_threshold(&self) -> f64 {
        self.amplitude_threshold
    }

    /// Return the zero-crossing-rate threshold.
    #[must_use]
    pub fn zcr_threshold(&self) -> f64 {
        self.zcr_threshold
    }

    /// Return the trailing silence duration in seconds.
    #[must_use]
    pub fn max_silence_secs(&self) -> f64 {
        self.max_silence_secs
    }

    /// Return the capture length limit in seconds.
    #[must_use]
    pub fn max_duration_secs(&self) -> f64 {
        self.max_duration_secs
    }

    /// Silent chunks tolerated before the utterance ends:
    /// `floor(max_silence_secs * sample_rate / chunk_size)`.
    ///
    /// Capture stops on the chunk that makes the silent run exceed this.
    #[must_use]
    pub fn max_silent_chunks(&self) -> usize {
        (self.max_silence_secs * f64::from(self.sample_rate) / self.chunk_size as f64).floor()
            as usize
    }

    /// Chunks after which capture stops regardless of silence (at least 1).
    #[must_use]
    pub fn max_chunks(&self) -> usize {
        let chunks =
            (self.max_duration_secs * f64::from(self.sample_rate) / self.chunk_size as f64).ceil();
        (chunks as usize).max(1)
    }

    /// Check every setting.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::InvalidConfig`] naming the first offending field:
    /// a zero `sample_rate` or `chunk_size`, a negative or non-finite threshold
    /// or silence duration, or a non-positive `max_duration_secs`.
    pub fn validate(&self) -> Result<(), AudioError> {
        if self.sample_rate == 0 {
            return Err(invalid("sample_rate", "must be positive"));
        }
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size", "must be positive"));
        }
        check_non_negative("amplitude_threshold", self.amplitude_threshold)?;
        check_non_negative("zcr_threshold", self.zcr_threshold)?;
        check_non_negative("max_silence_secs", self.max_silence_secs)?;
        if !(self.max_duration_secs.is_finite() && self.max_duration_secs > 0.0) {
            return Err(invalid(
                "max_duration_secs",
                &format!("must be finite and positive, got {}", self.max_duration_secs),
            ));
        }
        Ok(())
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            amplitude_threshold: DEFAULT_AMPLITUDE_THRESHOLD,
            zcr_threshold: DEFAULT_ZCR_THRESHOLD,
            max_silence_secs: DEFAULT_MAX_SILENCE_SECS,
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> AudioError {
    AudioError::InvalidConfig {
        field,
        reason: reason.to_string(),
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), AudioError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(
            field,
            &format!("must be finite and non-negative, got {value}"),
        ))
    }
}

/// Why a capture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// The trailing silent run exceeded the allowed length.
    Silence,
    /// The hard chunk limit was reached.
    ChunkLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Silence => f.write_str("silence"),
            Self::ChunkLimit => f.write_str("chunk-limit"),
        }
    }
}

/// Whether capture continues after a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep reading chunks.
    Continue,
    /// The chunk just observed is the last one.
    Stop(StopReason),
}

/// The detector's view of one chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    /// Measurements of the chunk.
    pub stats: ChunkStats,
    /// Whether the chunk counted as silent.
    pub silent: bool,
    /// What the capture loop should do next.
    pub decision: Decision,
}

/// Streaming silence counter.
///
/// A chunk is silent iff its mean amplitude and its zero-crossing rate are
/// both below their thresholds. Silent chunks extend the current run and any
/// other chunk resets it. There is no speech-onset state, so a long enough
/// quiet opening also ends the capture.
#[derive(Debug, Clone)]
pub struct EndpointDetector {
    config: EndpointConfig,
    max_silent_chunks: usize,
    max_chunks: usize,
    silent_run: usize,
    chunks_seen: usize,
}

impl EndpointDetector {
    /// Create a detector.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::InvalidConfig`] if `config` fails
    /// [`EndpointConfig::validate`].
    pub fn new(config: EndpointConfig) -> Result<Self, AudioError> {
        config.validate()?;
        Ok(Self {
            max_silent_chunks: config.max_silent_chunks(),
            max_chunks: config.max_chunks(),
            config,
            silent_run: 0,
            chunks_seen: 0,
        })
    }

    /// Classify one chunk and update the silent run.
    pub fn observe(&mut self, samples: &[i16]) -> Verdict {
        let stats = ChunkStats::measure(samples);
        let silent = stats.is_silent(self.config.amplitude_threshold, self.config.zcr_threshold);
        self.chunks_seen += 1;
        if silent {
            self.silent_run += 1;
        } else {
            self.silent_run = 0;
        }

        let decision = if self.silent_run > self.max_silent_chunks {
            Decision::Stop(StopReason::Silence)
        } else if self.chunks_seen >= self.max_chunks {
            Decision::Stop(StopReason::ChunkLimit)
        } else {
            Decision::Continue
        };

        trace!(
            chunk = self.chunks_seen,
            amplitude = stats.average_amplitude,
            zcr = stats.zero_crossing_rate,
            silent,
            silent_run = self.silent_run,
            "chunk observed"
        );
        Verdict {
            stats,
            silent,
            decision,
        }
    }

    /// Return the current number of consecutive silent chunks.
    #[must_use]
    pub fn silent_run(&self) -> usize {
        self.silent_run
    }

    /// Return the number of chunks observed since creation or the last reset.
    #[must_use]
    pub fn chunks_seen(&self) -> usize {
        self.chunks_seen
    }

    /// Return the configuration.
    #[must_use]
    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Forget all observed chunks.
    pub fn reset(&mut self) {
        self.silent_run = 0;
        self.chunks_seen = 0;
    }
}
