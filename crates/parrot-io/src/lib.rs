//! File I/O, validation, and serialization for the parrot pipeline.

mod bank;
mod domain;
mod error;
mod features;
mod recordings;
mod wav;
mod writer;

pub use bank::{load_templates, save_templates};
pub use domain::{ExperimentName, RecordingId};
pub use error::IoError;
pub use features::{FeatureReader, write_features};
pub use recordings::Recordings;
pub use wav::{WavAudio, WavChunkSource, WavFile, read_wav, write_utterance, write_wav};
pub use writer::{EvaluationRun, ResultWriter};
