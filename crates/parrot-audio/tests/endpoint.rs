//! End-to-end capture sessions against synthetic chunk streams.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use parrot_audio::{
    AudioChunk, AudioError, CaptureDevice, ChunkSource, EndpointConfig, Recorder, StopReason,
};

/// Generates chunks from a closure of the chunk index; never runs dry.
struct SyntheticDevice<F> {
    rate: u32,
    make: F,
}

struct SyntheticSource<F> {
    rate: u32,
    make: F,
    index: usize,
}

impl<F: FnMut(usize, usize) -> Vec<i16> + Clone> CaptureDevice for SyntheticDevice<F> {
    type Source = SyntheticSource<F>;

    fn open(&mut self, _sample_rate: u32, _chunk_size: usize) -> Result<Self::Source, AudioError> {
        Ok(SyntheticSource {
            rate: self.rate,
            make: self.make.clone(),
            index: 0,
        })
    }
}

impl<F: FnMut(usize, usize) -> Vec<i16>> ChunkSource for SyntheticSource<F> {
    fn sample_rate(&self) -> u32 {
        self.rate
    }

    fn read_chunk(&mut self, chunk_size: usize) -> Result<AudioChunk, AudioError> {
        let samples = (self.make)(self.index, chunk_size);
        self.index += 1;
        AudioChunk::new(samples, self.rate)
    }
}

fn low_noise(seed: u64) -> impl FnMut(usize, usize) -> Vec<i16> + Clone {
    move |index, n| {
        let mut rng = ChaCha8Rng::seed_from_u64(seed + index as u64);
        (0..n).map(|_| rng.gen_range(0..200)).collect()
    }
}

fn tone(amplitude: f64) -> impl Fn(usize) -> i16 + Clone {
    move |t| ((t as f64 * 0.05).sin() * amplitude) as i16
}

#[test]
fn all_silent_stream_stops_after_budget_plus_one_chunks() {
    let config = EndpointConfig::default();
    let device = SyntheticDevice {
        rate: config.sample_rate(),
        make: low_noise(1),
    };
    let mut recorder = Recorder::new(device, config).unwrap();
    let recording = recorder.record().unwrap();

    assert_eq!(config.max_silent_chunks(), 46);
    assert_eq!(recording.stop_reason(), StopReason::Silence);
    assert_eq!(recording.utterance().n_chunks(), 47);
    assert_eq!(recording.utterance().samples().len(), 47 * 1024);
}

#[test]
fn speech_then_silence_keeps_trailing_run() {
    let config = EndpointConfig::new(16_000, 1024)
        .unwrap()
        .with_max_silence_secs(0.5);
    let speech = tone(8000.0);
    let mut quiet = low_noise(9);
    let make = move |index: usize, n: usize| -> Vec<i16> {
        if index < 10 {
            (0..n).map(|k| speech(index * n + k)).collect()
        } else {
            quiet(index, n)
        }
    };
    let device = SyntheticDevice { rate: 16_000, make };
    let recording = Recorder::new(device, config).unwrap().record().unwrap();

    // floor(0.5 * 16000 / 1024) = 7 silent chunks tolerated.
    assert_eq!(recording.utterance().n_chunks(), 10 + 8);
    assert_eq!(recording.stop_reason(), StopReason::Silence);
    assert!((recording.utterance().duration_secs() - 18.0 * 1024.0 / 16_000.0).abs() < 1e-9);
}

#[test]
fn endless_speech_hits_chunk_limit() {
    let config = EndpointConfig::new(16_000, 1024)
        .unwrap()
        .with_max_duration_secs(1.0);
    let speech = tone(8000.0);
    let make = move |index: usize, n: usize| -> Vec<i16> {
        (0..n).map(|k| speech(index * n + k)).collect()
    };
    let device = SyntheticDevice { rate: 16_000, make };
    let recording = Recorder::new(device, config).unwrap().record().unwrap();

    assert_eq!(recording.stop_reason(), StopReason::ChunkLimit);
    assert_eq!(recording.utterance().n_chunks(), config.max_chunks());
    assert_eq!(config.max_chunks(), 16);
}

#[test]
fn quiet_hiss_is_not_silence() {
    // Low amplitude but a sign change on every sample.
    let config = EndpointConfig::new(16_000, 1024)
        .unwrap()
        .with_max_duration_secs(0.5);
    let make = |_: usize, n: usize| -> Vec<i16> {
        (0..n).map(|k| if k % 2 == 0 { 50 } else { -50 }).collect()
    };
    let device = SyntheticDevice { rate: 16_000, make };
    let recording = Recorder::new(device, config).unwrap().record().unwrap();
    assert_eq!(recording.stop_reason(), StopReason::ChunkLimit);
}
