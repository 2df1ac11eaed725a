//! A directory of per-digit feature recordings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parrot_dtw::{Digit, FeatureSequence, TemplateSet};
use tracing::{debug, info, instrument, warn};

use crate::IoError;
use crate::domain::RecordingId;
use crate::features::FeatureReader;

/// Feature sequences grouped by digit, in recording-index order.
///
/// Loaded from files named `<digit>_<n>.csv`, where `<digit>` is a digit word
/// or numeral and `<n>` the 1-based recording index. Indices need not be
/// contiguous; only their order matters.
#[derive(Debug, Clone, Default)]
pub struct Recordings {
    by_digit: BTreeMap<Digit, Vec<(RecordingId, FeatureSequence)>>,
}

impl Recordings {
    /// Load every `<digit>_<n>.csv` in `dir`. Other files are ignored.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::ReadDir`] | `dir` cannot be listed |
    /// | [`IoError::DuplicateRecording`] | Two files name the same recording (`one_1.csv`, `1_1.csv`) |
    /// | [`IoError::DimensionMismatch`] | A recording's frame dimension differs from the others |
    /// | any [`FeatureReader`] error | A feature file is invalid |
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn load(dir: &Path) -> Result<Self, IoError> {
        let read_dir_err = |e: std::io::Error| IoError::ReadDir {
            path: dir.to_path_buf(),
            source: e,
        };

        let mut files: BTreeMap<RecordingId, PathBuf> = BTreeMap::new();
        for entry in std::fs::read_dir(dir).map_err(read_dir_err)? {
            let path = entry.map_err(read_dir_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<RecordingId>().ok())
            else {
                debug!(path = %path.display(), "skipping file without a recording name");
                continue;
            };
            if let Some(first) = files.get(&id) {
                return Err(IoError::DuplicateRecording {
                    digit: id.digit(),
                    index: id.index(),
                    first: first.clone(),
                    second: path,
                });
            }
            files.insert(id, path);
        }

        let mut recordings = Self::default();
        let mut dim = None;
        for (id, path) in files {
            let seq = FeatureReader::new(&path).read()?;
            let expected = *dim.get_or_insert(seq.dim());
            if seq.dim() != expected {
                return Err(IoError::DimensionMismatch {
                    path,
                    expected,
                    got: seq.dim(),
                });
            }
            recordings.by_digit.entry(id.digit()).or_default().push((id, seq));
        }

        for digit in Digit::ALL {
            if !recordings.by_digit.contains_key(&digit) {
                warn!(%digit, "no recordings found");
            }
        }
        info!(
            n_digits = recordings.by_digit.len(),
            n_recordings = recordings.len(),
            "recordings loaded"
        );
        Ok(recordings)
    }

    /// Return the digits that have at least one recording, ascending.
    #[must_use]
    pub fn digits(&self) -> Vec<Digit> {
        self.by_digit.keys().copied().collect()
    }

    /// Return the recordings of `digit` in index order.
    pub fn recordings(&self, digit: Digit) -> impl Iterator<Item = &FeatureSequence> + '_ {
        self.by_digit
            .get(&digit)
            .into_iter()
            .flatten()
            .map(|(_, seq)| seq)
    }

    /// Return the ids of the recordings of `digit` in index order.
    pub fn ids(&self, digit: Digit) -> impl Iterator<Item = RecordingId> + '_ {
        self.by_digit
            .get(&digit)
            .into_iter()
            .flatten()
            .map(|(id, _)| *id)
    }

    /// Return the total number of recordings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_digit.values().map(Vec::len).sum()
    }

    /// Return true if no recordings were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the first `n_templates` recordings of each digit as templates and
    /// the following `n_tests` as labelled tests.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::NoTemplatesRequested`] | `n_templates` is zero |
    /// | [`IoError::InsufficientRecordings`] | A digit has fewer than `n_templates + n_tests` recordings |
    pub fn split(
        &self,
        n_templates: usize,
        n_tests: usize,
    ) -> Result<(TemplateSet, Vec<(Digit, FeatureSequence)>), IoError> {
        if n_templates == 0 {
            return Err(IoError::NoTemplatesRequested);
        }
        let needed = n_templates + n_tests;
        let mut templates = TemplateSet::new();
        let mut tests = Vec::new();
        for (&digit, recs) in &self.by_digit {
            if recs.len() < needed {
                return Err(IoError::InsufficientRecordings {
                    digit,
                    needed,
                    found: recs.len(),
                });
            }
            for (_, seq) in &recs[..n_templates] {
                templates.insert(digit, seq.clone())?;
            }
            tests.extend(
                recs[n_templates..needed]
                    .iter()
                    .map(|(_, seq)| (digit, seq.clone())),
            );
        }
        debug!(n_templates = templates.len(), n_tests = tests.len(), "recordings split");
        Ok((templates, tests))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::write_features;
    use tempfile::TempDir;

    fn seq(dim: usize, n: usize, fill: f64) -> FeatureSequence {
        FeatureSequence::from_flat(dim, vec![fill; dim * n]).unwrap()
    }

    fn digit(v: u8) -> Digit {
        Digit::new(v).unwrap()
    }

    fn populate(dir: &Path, names: &[&str]) {
        for (i, name) in names.iter().enumerate() {
            write_features(&dir.join(name), &seq(2, i + 1, i as f64)).unwrap();
        }
    }

    #[test]
    fn loads_in_index_order() {
        let dir = TempDir::new().unwrap();
        populate(dir.path(), &["one_10.csv", "one_2.csv", "3_1.csv", "notes.txt"]);
        std::fs::write(dir.path().join("readme.csv"), "1,2\n").unwrap();

        let recs = Recordings::load(dir.path()).unwrap();
        assert_eq!(recs.digits(), vec![digit(1), digit(3)]);
        assert_eq!(recs.len(), 3);
        let ids: Vec<usize> = recs.ids(digit(1)).map(|id| id.index()).collect();
        assert_eq!(ids, vec![2, 10]);
        // one_2.csv was written second, with two frames.
        assert_eq!(recs.recordings(digit(1)).next().unwrap().len(), 2);
    }

    #[test]
    fn word_and_numeral_names_collide() {
        let dir = TempDir::new().unwrap();
        populate(dir.path(), &["four_1.csv", "4_1.csv"]);
        assert!(matches!(
            Recordings::load(dir.path()),
            Err(IoError::DuplicateRecording { index: 1, .. })
        ));
    }

    #[test]
    fn mixed_dimensions_are_rejected() {
        let dir = TempDir::new().unwrap();
        write_features(&dir.path().join("zero_1.csv"), &seq(2, 3, 0.0)).unwrap();
        write_features(&dir.path().join("zero_2.csv"), &seq(3, 3, 0.0)).unwrap();
        assert!(matches!(
            Recordings::load(dir.path()),
            Err(IoError::DimensionMismatch { expected: 2, got: 3, .. })
        ));
    }

    #[test]
    fn split_takes_templates_then_tests() {
        let dir = TempDir::new().unwrap();
        populate(dir.path(), &["two_1.csv", "two_2.csv", "two_3.csv", "two_4.csv"]);
        let recs = Recordings::load(dir.path()).unwrap();

        let (templates, tests) = recs.split(1, 2).unwrap();
        assert_eq!(templates.templates(digit(2)).len(), 1);
        assert_eq!(templates.templates(digit(2))[0].len(), 1);
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].1.len(), 2);
        assert_eq!(tests[1].1.len(), 3);

        assert!(matches!(
            recs.split(3, 2),
            Err(IoError::InsufficientRecordings { needed: 5, found: 4, .. })
        ));
        assert!(matches!(recs.split(0, 1), Err(IoError::NoTemplatesRequested)));
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(matches!(
            Recordings::load(Path::new("/nonexistent/recordings")),
            Err(IoError::ReadDir { .. })
        ));
    }
}
