//! 16-bit mono PCM WAV persistence and file-backed capture.

use std::path::{Path, PathBuf};

use parrot_audio::{AudioChunk, AudioError, CaptureDevice, ChunkSource, Utterance};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Decoded samples of a 16-bit mono WAV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavAudio {
    /// Samples in file order.
    pub samples: Vec<i16>,
    /// Sample rate from the header.
    pub sample_rate: u32,
}

impl WavAudio {
    /// Return the duration in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Write `samples` as a 16-bit integer mono WAV file.
///
/// # Errors
///
/// Returns [`IoError::Wav`] if the file cannot be created or written.
#[instrument(skip_all, fields(path = %path.display(), n_samples = samples.len()))]
pub fn write_wav(path: &Path, samples: &[i16], sample_rate: u32) -> Result<(), IoError> {
    let to_err = |e: hound::Error| IoError::Wav {
        path: path.to_path_buf(),
        source: e,
    };
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).map_err(to_err)?;
    for &s in samples {
        writer.write_sample(s).map_err(to_err)?;
    }
    writer.finalize().map_err(to_err)?;
    info!(sample_rate, "wav written");
    Ok(())
}

/// Write a captured utterance at its capture rate.
///
/// # Errors
///
/// Same as [`write_wav`].
pub fn write_utterance(path: &Path, utterance: &Utterance) -> Result<(), IoError> {
    write_wav(path, utterance.samples(), utterance.sample_rate())
}

/// Read a 16-bit integer mono WAV file.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::Wav`] | File missing, unreadable or not RIFF/WAVE |
/// | [`IoError::UnsupportedWavFormat`] | Not 16-bit integer mono |
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_wav(path: &Path) -> Result<WavAudio, IoError> {
    let to_err = |e: hound::Error| IoError::Wav {
        path: path.to_path_buf(),
        source: e,
    };
    let mut reader = hound::WavReader::open(path).map_err(to_err)?;
    let spec = reader.spec();
    if spec.channels != 1
        || spec.bits_per_sample != 16
        || spec.sample_format != hound::SampleFormat::Int
    {
        return Err(IoError::UnsupportedWavFormat {
            path: path.to_path_buf(),
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            sample_format: match spec.sample_format {
                hound::SampleFormat::Int => "int",
                hound::SampleFormat::Float => "float",
            },
        });
    }
    let samples = reader
        .samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(to_err)?;
    debug!(n_samples = samples.len(), sample_rate = spec.sample_rate, "wav read");
    Ok(WavAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// A WAV file replayed as a capture device.
///
/// Each [`open`](CaptureDevice::open) decodes the file again and replays it
/// from the start.
#[derive(Debug, Clone)]
pub struct WavFile {
    path: PathBuf,
    pad_with_silence: bool,
}

impl WavFile {
    /// Replay `path`. Reads past the end fail with [`AudioError::EndOfStream`].
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            pad_with_silence: false,
        }
    }

    /// After the last sample, deliver digital silence instead of failing.
    #[must_use]
    pub fn with_silence_padding(mut self, pad: bool) -> Self {
        self.pad_with_silence = pad;
        self
    }
}

impl CaptureDevice for WavFile {
    type Source = WavChunkSource;

    fn open(
        &mut self,
        _sample_rate: u32,
        _chunk_size: usize,
    ) -> Result<WavChunkSource, AudioError> {
        let audio = read_wav(&self.path).map_err(|e| AudioError::DeviceOpen {
            reason: e.to_string(),
        })?;
        Ok(WavChunkSource::new(audio).with_silence_padding(self.pad_with_silence))
    }
}

/// Chunked reader over decoded WAV samples.
#[derive(Debug, Clone)]
pub struct WavChunkSource {
    audio: WavAudio,
    position: usize,
    chunks_read: usize,
    pad_with_silence: bool,
}

impl WavChunkSource {
    /// Replay `audio` from its first sample.
    #[must_use]
    pub fn new(audio: WavAudio) -> Self {
        Self {
            audio,
            position: 0,
            chunks_read: 0,
            pad_with_silence: false,
        }
    }

    /// After the last sample, deliver zeros instead of failing.
    #[must_use]
    pub fn with_silence_padding(mut self, pad: bool) -> Self {
        self.pad_with_silence = pad;
        self
    }
}

impl ChunkSource for WavChunkSource {
    fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }

    fn read_chunk(&mut self, chunk_size: usize) -> Result<AudioChunk, AudioError> {
        let end = (self.position + chunk_size).min(self.audio.samples.len());
        let mut samples = self.audio.samples[self.position..end].to_vec();
        if samples.len() < chunk_size {
            if !self.pad_with_silence {
                return Err(AudioError::EndOfStream {
                    chunks: self.chunks_read,
                });
            }
            samples.resize(chunk_size, 0);
        }
        self.position = end;
        self.chunks_read += 1;
        AudioChunk::new(samples, self.audio.sample_rate)
    }
}
