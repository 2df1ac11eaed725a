//! Feature-sequence CSV reader and writer.

use std::path::{Path, PathBuf};

use parrot_dtw::FeatureSequence;
use tracing::{debug, info, instrument};

use crate::IoError;

/// Reads a feature sequence from a CSV file.
///
/// Expected CSV format:
/// - No header
/// - One frame per row, `D` comma-separated floats
/// - Every row has the same number of values
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyFeatures`] | Zero rows |
/// | [`IoError::InconsistentRowLength`] | Row has a different length than the first row |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
pub struct FeatureReader {
    path: PathBuf,
}

impl FeatureReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<FeatureSequence, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that our own InconsistentRowLength check fires
        // instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut dim = None;
        let mut data = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            let expected = *dim.get_or_insert(record.len());
            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }

            for (col_index, raw) in record.iter().enumerate() {
                match raw.parse::<f64>() {
                    Ok(value) if value.is_finite() => data.push(value),
                    _ => {
                        return Err(IoError::NonFiniteValue {
                            path: self.path.clone(),
                            row_index,
                            col_index,
                            raw: raw.to_string(),
                        });
                    }
                }
            }
        }

        let Some(dim) = dim else {
            return Err(IoError::EmptyFeatures {
                path: self.path.clone(),
            });
        };
        let seq = FeatureSequence::from_flat(dim, data)?;
        debug!(frames = seq.len(), dim, "feature sequence loaded");
        Ok(seq)
    }
}

/// Write `seq` to `path` as headerless CSV, one frame per row.
///
/// Values use the shortest representation that reads back to the same `f64`.
///
/// # Errors
///
/// Returns [`IoError::WriteCsv`] if the file cannot be created or written.
#[instrument(skip_all, fields(path = %path.display(), frames = seq.len(), dim = seq.dim()))]
pub fn write_features(path: &Path, seq: &FeatureSequence) -> Result<(), IoError> {
    let to_err = |e: csv::Error| IoError::WriteCsv {
        path: path.to_path_buf(),
        source: e,
    };
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(to_err)?;
    for frame in seq.frames() {
        wtr.write_record(frame.iter().map(f64::to_string))
            .map_err(to_err)?;
    }
    wtr.flush().map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!("features written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_valid_frames() {
        let f = write_csv("0.0,0.1,0.2\n1.0,1.1,1.2\n2.0, 2.1 ,2.2\n");
        let seq = FeatureReader::new(f.path()).read().unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.dim(), 3);
        assert_eq!(seq.frame(2), &[2.0, 2.1, 2.2]);
    }

    #[test]
    fn single_column_is_one_dimensional() {
        let f = write_csv("1\n2\n3\n4\n");
        let seq = FeatureReader::new(f.path()).read().unwrap();
        assert_eq!((seq.len(), seq.dim()), (4, 1));
    }

    #[test]
    fn write_then_read_preserves_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feat.csv");
        let seq = FeatureSequence::new(vec![vec![0.1, -2.5e-7], vec![3.0, 1.0 / 3.0]]).unwrap();
        write_features(&path, &seq).unwrap();
        let back = FeatureReader::new(&path).read().unwrap();
        assert_eq!(back, seq);
    }

    #[test]
    fn error_file_not_found() {
        let result = FeatureReader::new(Path::new("/nonexistent/feat.csv")).read();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn error_empty_file() {
        let f = write_csv("");
        let result = FeatureReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::EmptyFeatures { .. })));
    }

    #[test]
    fn error_inconsistent_row_length() {
        let f = write_csv("1.0,2.0,3.0\n1.0,2.0\n");
        let result = FeatureReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::InconsistentRowLength {
                row_index: 1,
                expected: 3,
                got: 2,
                ..
            })
        ));
    }

    #[test]
    fn error_non_finite_values() {
        for content in ["1.0,NaN\n", "1.0,inf\n", "1.0,abc\n"] {
            let f = write_csv(content);
            let result = FeatureReader::new(f.path()).read();
            assert!(
                matches!(result, Err(IoError::NonFiniteValue { col_index: 1, .. })),
                "{content:?}"
            );
        }
    }
}
