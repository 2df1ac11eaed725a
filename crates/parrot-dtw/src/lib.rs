//! Adaptive-band DTW alignment and nearest-template digit classification.
//!
//! Pure math library, zero I/O. Provides validated feature sequences,
//! per-dimension normalization, adaptive Sakoe-Chiba banding with
//! unconstrained and time-synchronous step policies, and a minimum-distance
//! classifier over labelled templates.

mod classify;
mod constraint;
mod distance;
mod dtw;
mod error;
mod evaluate;
mod label;
mod matrix;
mod preprocess;
mod sequence;
mod template;

pub use classify::{Classifier, RecognitionResult, TemplateMatch};
pub use constraint::{AdaptiveBand, StepPolicy};
pub use distance::DtwDistance;
pub use dtw::Dtw;
pub use error::{DtwError, ErrorKind};
pub use evaluate::{DigitScore, Evaluation};
pub use label::Digit;
pub use matrix::CostMatrix;
pub use preprocess::{NORMALIZE_EPSILON, normalize, normalize_batch};
pub use sequence::{FeatureSequence, SequenceView};
pub use template::TemplateSet;
