//! I/O error types for parrot-io.

use std::path::PathBuf;

use parrot_dtw::{Digit, DtwError};

/// Errors from feature files, WAV files, the template bank and result output.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when an input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a feature file contains no frames.
    #[error("no feature frames in {path}")]
    EmptyFeatures {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a frame has a different number of values than the first frame.
    #[error("inconsistent frame length in {path}: row {row_index} has {got} values, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index.
        row_index: usize,
        /// Dimension established by the first row.
        expected: usize,
        /// Number of values in this row.
        got: usize,
    },

    /// Returned when a cell is NaN, Inf, or otherwise not a finite float.
    #[error("non-finite value in {path}: row {row_index}, column {col_index}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index.
        row_index: usize,
        /// Zero-based column index.
        col_index: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when a recording's feature dimension differs from earlier recordings.
    #[error("{path} has {got}-dimensional frames, expected {expected}")]
    DimensionMismatch {
        /// Path to the offending feature file.
        path: PathBuf,
        /// Dimension of previously loaded recordings.
        expected: usize,
        /// Dimension of this recording.
        got: usize,
    },

    /// Returned when sequence or template validation fails.
    #[error(transparent)]
    Sequence(#[from] DtwError),

    /// Returned when a WAV file cannot be opened, decoded or written.
    #[error("WAV error in {path}")]
    Wav {
        /// Path to the WAV file.
        path: PathBuf,
        /// Underlying decoder/encoder error.
        source: hound::Error,
    },

    /// Returned when a WAV file is not 16-bit integer mono PCM.
    #[error("unsupported WAV format in {path}: {channels} channel(s), {bits_per_sample}-bit {sample_format}")]
    UnsupportedWavFormat {
        /// Path to the WAV file.
        path: PathBuf,
        /// Channel count found in the header.
        channels: u16,
        /// Bit depth found in the header.
        bits_per_sample: u16,
        /// `"int"` or `"float"`.
        sample_format: &'static str,
    },

    /// Returned when a recordings directory cannot be listed.
    #[error("cannot read directory {path}")]
    ReadDir {
        /// Directory that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when two files map to the same digit and recording index.
    #[error("recording {digit}_{index} is provided by both {first} and {second}")]
    DuplicateRecording {
        /// The digit.
        digit: Digit,
        /// The 1-based recording index.
        index: usize,
        /// First file found.
        first: PathBuf,
        /// Second file found.
        second: PathBuf,
    },

    /// Returned when a digit has too few recordings for the requested split.
    #[error("digit {digit} has {found} recordings, {needed} needed")]
    InsufficientRecordings {
        /// The digit.
        digit: Digit,
        /// Recordings required (`n_templates + n_tests`).
        needed: usize,
        /// Recordings available.
        found: usize,
    },

    /// Returned when a split asks for zero templates per digit.
    #[error("at least one template per digit is required")]
    NoTemplatesRequested,

    /// Returned when the template bank cannot be encoded.
    #[error("failed to encode template bank")]
    EncodeBank {
        /// Underlying bincode error.
        source: bincode::Error,
    },

    /// Returned when the template bank cannot be decoded.
    #[error("failed to decode template bank {path}")]
    DecodeBank {
        /// Path to the bank file.
        path: PathBuf,
        /// Underlying bincode error.
        source: bincode::Error,
    },

    /// Returned when a template bank was written by an incompatible version.
    #[error("template bank {path} has format version {found}, expected {expected}")]
    IncompatibleBankVersion {
        /// Path to the bank file.
        path: PathBuf,
        /// Version this build reads.
        expected: u32,
        /// Version found in the file.
        found: u32,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a CSV output file cannot be written.
    #[error("cannot write CSV file {path}")]
    WriteCsv {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a result artifact cannot be serialized to JSON.
    #[error("cannot serialize result artifact")]
    SerializeResult {
        /// Underlying serde_json error.
        source: serde_json::Error,
    },
}
