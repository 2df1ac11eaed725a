//! Error types for audio configuration, chunk analysis and capture.

/// Errors from endpoint configuration and capture sessions.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// Returned when a configuration value is out of range.
    #[error("invalid {field}: {reason}")]
    InvalidConfig {
        /// Name of the offending setting.
        field: &'static str,
        /// Human-readable description of the constraint that failed.
        reason: String,
    },

    /// Returned when an audio chunk holds no samples.
    #[error("audio chunk must contain at least one sample")]
    EmptyChunk,

    /// Returned when the capture device cannot be opened or configured.
    #[error("failed to open capture device: {reason}")]
    DeviceOpen {
        /// Backend-specific description.
        reason: String,
    },

    /// Returned when a blocking chunk read fails.
    #[error("failed to read from capture device: {reason}")]
    DeviceRead {
        /// Backend-specific description.
        reason: String,
    },

    /// Returned when a finite source runs out before the utterance ends.
    #[error("capture source exhausted after {chunks} chunks")]
    EndOfStream {
        /// Number of complete chunks delivered before the end.
        chunks: usize,
    },

    /// Returned when the source delivers audio at a different rate than requested.
    #[error("capture source runs at {got} Hz, expected {expected} Hz")]
    SampleRateMismatch {
        /// Rate the session was configured with.
        expected: u32,
        /// Rate reported by the source.
        got: u32,
    },

    /// Returned when the source delivers a chunk of the wrong length.
    #[error("capture source delivered {got} samples, expected {expected}")]
    ChunkSizeMismatch {
        /// Configured chunk size.
        expected: usize,
        /// Length of the delivered chunk.
        got: usize,
    },
}

impl AudioError {
    /// Return true for failures of the capture device itself, as opposed to
    /// invalid configuration.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Self::DeviceOpen { .. }
                | Self::DeviceRead { .. }
                | Self::EndOfStream { .. }
                | Self::SampleRateMismatch { .. }
                | Self::ChunkSizeMismatch { .. }
        )
    }
}
