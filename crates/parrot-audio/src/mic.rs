//! Default-input-device capture through cpal.
//!
//! The cpal callback downmixes to the first channel, converts to `i16` and
//! pushes into a lock-free rtrb ring buffer; [`MicSource::read_chunk`] drains it
//! from the recording thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{info, warn};

use crate::capture::{CaptureDevice, ChunkSource};
use crate::chunk::AudioChunk;
use crate::error::AudioError;

/// Ring buffer capacity, in chunks.
const RING_CHUNKS: usize = 32;
const POLL_INTERVAL: Duration = Duration::from_millis(2);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// The host's default input device.
#[derive(Debug, Clone, Copy)]
pub struct Microphone {
    read_timeout: Duration,
}

impl Microphone {
    /// Create a microphone handle. The device is only touched by `open`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Set how long a chunk read may wait for samples before failing.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl Default for Microphone {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct StreamState {
    failed: AtomicBool,
    overruns: AtomicUsize,
}

/// An open input stream. Dropping it stops the stream.
pub struct MicSource {
    _stream: cpal::Stream,
    consumer: Consumer<i16>,
    state: Arc<StreamState>,
    sample_rate: u32,
    read_timeout: Duration,
}

impl CaptureDevice for Microphone {
    type Source = MicSource;

    fn open(&mut self, sample_rate: u32, chunk_size: usize) -> Result<MicSource, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| open_error("no default input device found"))?;
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let range = device
            .supported_input_configs()
            .map_err(|e| open_error(&format!("failed to query input configs: {e}")))?
            .filter(|r| r.min_sample_rate().0 <= sample_rate && sample_rate <= r.max_sample_rate().0)
            .filter(|r| format_rank(r.sample_format()).is_some())
            .min_by_key(|r| (r.channels(), format_rank(r.sample_format())))
            .ok_or_else(|| open_error(&format!("{name} cannot capture at {sample_rate} Hz")))?;

        let format = range.sample_format();
        let config = range.with_sample_rate(cpal::SampleRate(sample_rate)).config();
        let channels = usize::from(config.channels);

        let (producer, consumer) = RingBuffer::new(chunk_size * RING_CHUNKS);
        let state = Arc::new(StreamState::default());
        let stream = match format {
            SampleFormat::I16 => build_stream::<i16>(&device, &config, channels, producer, &state),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, channels, producer, &state),
            SampleFormat::F32 => build_stream::<f32>(&device, &config, channels, producer, &state),
            other => Err(open_error(&format!("unsupported sample format {other:?}"))),
        }?;
        stream
            .play()
            .map_err(|e| open_error(&format!("failed to start input stream: {e}")))?;

        info!(device = %name, sample_rate, channels, format = ?format, "microphone opened");
        Ok(MicSource {
            _stream: stream,
            consumer,
            state,
            sample_rate,
            read_timeout: self.read_timeout,
        })
    }
}

impl ChunkSource for MicSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_chunk(&mut self, chunk_size: usize) -> Result<AudioChunk, AudioError> {
        let deadline = Instant::now() + self.read_timeout;
        let mut samples = Vec::with_capacity(chunk_size);
        while samples.len() < chunk_size {
            if self.state.failed.load(Ordering::Acquire) {
                return Err(AudioError::DeviceRead {
                    reason: "input stream reported an error".to_string(),
                });
            }
            match self.consumer.pop() {
                Ok(sample) => samples.push(sample),
                Err(_) if Instant::now() >= deadline => {
                    return Err(AudioError::DeviceRead {
                        reason: format!("no audio received within {:?}", self.read_timeout),
                    });
                }
                Err(_) => thread::sleep(POLL_INTERVAL),
            }
        }

        let overruns = self.state.overruns.swap(0, Ordering::Relaxed);
        if overruns > 0 {
            warn!(overruns, "input ring buffer full, samples dropped");
        }
        AudioChunk::new(samples, self.sample_rate)
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    mut producer: Producer<i16>,
    state: &Arc<StreamState>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let data_state = Arc::clone(state);
    let err_state = Arc::clone(state);
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks(channels) {
                    if producer.push(i16::from_sample(frame[0])).is_err() {
                        data_state.overruns.fetch_add(1, Ordering::Relaxed);
                    }
                }
            },
            move |err| {
                warn!(error = %err, "input stream error");
                err_state.failed.store(true, Ordering::Release);
            },
            None,
        )
        .map_err(|e| open_error(&format!("failed to build input stream: {e}")))
}

/// Preference order among sample formats; `None` for formats we do not convert.
fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::I16 => Some(0),
        SampleFormat::F32 => Some(1),
        SampleFormat::U16 => Some(2),
        _ => None,
    }
}

fn open_error(reason: &str) -> AudioError {
    AudioError::DeviceOpen {
        reason: reason.to_string(),
    }
}
