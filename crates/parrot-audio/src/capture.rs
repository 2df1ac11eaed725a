//! Capture sessions: device seams and the recording loop.

use tracing::{debug, info, instrument};

use crate::chunk::{AudioChunk, Utterance};
use crate::endpoint::{Decision, EndpointConfig, EndpointDetector, StopReason};
use crate::error::AudioError;

/// An open, blocking stream of fixed-size chunks.
///
/// Dropping the source releases the underlying device.
pub trait ChunkSource {
    /// Return the rate the source delivers samples at.
    fn sample_rate(&self) -> u32;

    /// Block until exactly `chunk_size` samples are available and return them.
    ///
    /// # Errors
    ///
    /// Returns a device error ([`AudioError::is_device_error`]) when the read
    /// fails or a finite source is exhausted.
    fn read_chunk(&mut self, chunk_size: usize) -> Result<AudioChunk, AudioError>;
}

/// Something that can be opened into a [`ChunkSource`].
pub trait CaptureDevice {
    /// The open stream type.
    type Source: ChunkSource;

    /// Acquire the device for one capture session.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::DeviceOpen`] if the device is unavailable or cannot
    /// deliver the requested format.
    fn open(&mut self, sample_rate: u32, chunk_size: usize) -> Result<Self::Source, AudioError>;
}

/// The result of one capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    utterance: Utterance,
    stop_reason: StopReason,
}

impl Recording {
    /// Return the captured utterance.
    #[must_use]
    pub fn utterance(&self) -> &Utterance {
        &self.utterance
    }

    /// Return why capture ended.
    #[must_use]
    pub fn stop_reason(&self) -> StopReason {
        self.stop_reason
    }

    /// Consume the recording and return the utterance.
    #[must_use]
    pub fn into_utterance(self) -> Utterance {
        self.utterance
    }
}

/// Runs endpoint-detected capture sessions on a device.
#[derive(Debug)]
pub struct Recorder<D> {
    device: D,
    config: EndpointConfig,
}

impl<D: CaptureDevice> Recorder<D> {
    /// Create a recorder.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::InvalidConfig`] if `config` fails validation.
    pub fn new(device: D, config: EndpointConfig) -> Result<Self, AudioError> {
        config.validate()?;
        Ok(Self { device, config })
    }

    /// Return the endpoint configuration.
    #[must_use]
    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Return the device.
    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Consume the recorder and return the device.
    pub fn into_device(self) -> D {
        self.device
    }

    /// Capture one utterance.
    ///
    /// Opens the device, appends chunks until the endpoint detector stops, and
    /// returns every captured chunk including the trailing silent run. The
    /// source is released before this returns, on success and on error.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AudioError::DeviceOpen`] | The device cannot be opened |
    /// | [`AudioError::SampleRateMismatch`] | The source runs at another rate |
    /// | [`AudioError::DeviceRead`] / [`AudioError::EndOfStream`] | A chunk read fails |
    /// | [`AudioError::ChunkSizeMismatch`] | The source returns a short or long chunk |
    #[instrument(skip(self), fields(
        sample_rate = self.config.sample_rate(),
        chunk_size = self.config.chunk_size()
    ))]
    pub fn record(&mut self) -> Result<Recording, AudioError> {
        let sample_rate = self.config.sample_rate();
        let chunk_size = self.config.chunk_size();

        let mut source = self.device.open(sample_rate, chunk_size)?;
        if source.sample_rate() != sample_rate {
            return Err(AudioError::SampleRateMismatch {
                expected: sample_rate,
                got: source.sample_rate(),
            });
        }

        let mut detector = EndpointDetector::new(self.config)?;
        let mut utterance = Utterance::new(sample_rate, chunk_size);
        debug!(
            max_silent_chunks = self.config.max_silent_chunks(),
            max_chunks = self.config.max_chunks(),
            "capture started"
        );

        loop {
            let chunk = source.read_chunk(chunk_size)?;
            if chunk.len() != chunk_size {
                return Err(AudioError::ChunkSizeMismatch {
                    expected: chunk_size,
                    got: chunk.len(),
                });
            }
            let verdict = detector.observe(chunk.samples());
            utterance.push(&chunk);

            if let Decision::Stop(stop_reason) = verdict.decision {
                info!(
                    chunks = utterance.n_chunks(),
                    duration_secs = utterance.duration_secs(),
                    %stop_reason,
                    "capture finished"
                );
                return Ok(Recording {
                    utterance,
                    stop_reason,
                });
            }
        }
    }
}
