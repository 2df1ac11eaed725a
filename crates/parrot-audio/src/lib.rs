//! Chunk analysis, endpoint detection and capture sessions for 16-bit mono PCM.
//!
//! A [`Recorder`] opens a [`CaptureDevice`], feeds each chunk through an
//! [`EndpointDetector`] and returns the captured [`Utterance`] once the trailing
//! silence (or the hard chunk limit) ends the session. The `mic` feature adds a
//! cpal-backed [`Microphone`].

mod analysis;
mod capture;
mod chunk;
mod endpoint;
mod error;
#[cfg(feature = "mic")]
mod mic;

pub use analysis::{ChunkStats, average_amplitude, zero_crossing_rate};
pub use capture::{CaptureDevice, ChunkSource, Recorder, Recording};
pub use chunk::{AudioChunk, Utterance};
pub use endpoint::{
    DEFAULT_AMPLITUDE_THRESHOLD, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_DURATION_SECS,
    DEFAULT_MAX_SILENCE_SECS, DEFAULT_SAMPLE_RATE, DEFAULT_ZCR_THRESHOLD, Decision,
    EndpointConfig, EndpointDetector, StopReason, Verdict,
};
pub use error::AudioError;
#[cfg(feature = "mic")]
pub use mic::{MicSource, Microphone};
