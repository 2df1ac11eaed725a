//! Domain types for parrot-io.

use std::fmt;
use std::str::FromStr;

use parrot_dtw::Digit;

use crate::IoError;

/// Identifies one recording: `<digit>_<index>`, with a 1-based index.
///
/// Parsed from file stems such as `seven_3` or `7_3`; displayed with the digit
/// word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordingId {
    digit: Digit,
    index: usize,
}

impl RecordingId {
    /// Create an id. Returns `None` for index 0.
    #[must_use]
    pub fn new(digit: Digit, index: usize) -> Option<Self> {
        (index > 0).then_some(Self { digit, index })
    }

    /// Return the digit.
    #[must_use]
    pub fn digit(&self) -> Digit {
        self.digit
    }

    /// Return the 1-based recording index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Return the file name for this recording with the given extension.
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        format!("{self}.{extension}")
    }
}

impl FromStr for RecordingId {
    type Err = ();

    fn from_str(stem: &str) -> Result<Self, Self::Err> {
        let (digit, index) = stem.rsplit_once('_').ok_or(())?;
        let digit = digit.parse::<Digit>().map_err(|_| ())?;
        let index = index.parse::<usize>().map_err(|_| ())?;
        Self::new(digit, index).ok_or(())
    }
}

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.digit, self.index)
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_id_parses_words_and_numerals() {
        let id: RecordingId = "seven_3".parse().unwrap();
        assert_eq!(id.digit(), Digit::new(7).unwrap());
        assert_eq!(id.index(), 3);
        assert_eq!("7_3".parse::<RecordingId>(), Ok(id));
        assert_eq!(id.to_string(), "seven_3");
        assert_eq!(id.file_name("wav"), "seven_3.wav");
    }

    #[test]
    fn recording_id_rejects_malformed_stems() {
        assert!("seven".parse::<RecordingId>().is_err());
        assert!("seven_0".parse::<RecordingId>().is_err());
        assert!("eleven_1".parse::<RecordingId>().is_err());
        assert!("seven_x".parse::<RecordingId>().is_err());
    }

    #[test]
    fn experiment_name_valid() {
        let name = ExperimentName::new("digits-run_01".to_string()).unwrap();
        assert_eq!(name.as_str(), "digits-run_01");
    }

    #[test]
    fn experiment_name_rejects_empty_and_special_chars() {
        assert!(matches!(
            ExperimentName::new(String::new()),
            Err(IoError::InvalidExperimentName { .. })
        ));
        assert!(matches!(
            ExperimentName::new("my run!".to_string()),
            Err(IoError::InvalidExperimentName { .. })
        ));
    }
}
