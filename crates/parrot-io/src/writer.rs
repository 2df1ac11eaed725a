//! JSON and CSV result writer for recognition and evaluation outputs.

use std::fs;
use std::path::{Path, PathBuf};

use parrot_dtw::{Classifier, CostMatrix, DigitScore, Evaluation, RecognitionResult, StepPolicy};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// One evaluated configuration.
#[derive(Debug, Clone)]
pub struct EvaluationRun {
    /// Classifier settings the corpus was scored with.
    pub classifier: Classifier,
    /// Templates per digit.
    pub n_templates: usize,
    /// Tests per digit.
    pub n_tests: usize,
    /// The scores.
    pub evaluation: Evaluation,
}

/// Writes recognition, evaluation and cost-matrix results.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_recognize.json`,
/// `{experiment}_evaluate.json` and `{experiment}_cost_matrix.csv`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write one recognition decision to `{experiment}_recognize.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_recognition(
        &self,
        source: &str,
        classifier: &Classifier,
        result: &RecognitionResult,
    ) -> Result<PathBuf, IoError> {
        let artifact = RecognizeArtifact {
            experiment: self.experiment.as_str(),
            source,
            settings: Settings::of(classifier),
            label: result.label.value(),
            label_name: result.label.name(),
            distance: result.distance.value(),
            template_index: result.template_index,
        };
        let path = self.output_path("recognize.json");
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "recognition result written");
        Ok(path)
    }

    /// Write one or more evaluation runs to `{experiment}_evaluate.json`.
    ///
    /// `best_run` is the index of the first run with the highest accuracy.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(n_runs = runs.len()))]
    pub fn write_evaluation(&self, runs: &[EvaluationRun]) -> Result<PathBuf, IoError> {
        let entries: Vec<RunEntry<'_>> = runs
            .iter()
            .map(|run| RunEntry {
                settings: Settings::of(&run.classifier),
                n_templates: run.n_templates,
                n_tests: run.n_tests,
                total: run.evaluation.total(),
                correct: run.evaluation.correct(),
                rejected: run.evaluation.rejected(),
                accuracy: run.evaluation.accuracy(),
                per_digit: run.evaluation.per_digit(),
                confusion: run.evaluation.confusion(),
            })
            .collect();

        let best_run = entries
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, e)| match best {
                Some((_, acc)) if acc >= e.accuracy => best,
                _ => Some((i, e.accuracy)),
            })
            .map(|(i, _)| i);

        let artifact = EvaluateArtifact {
            experiment: self.experiment.as_str(),
            best_run,
            runs: entries,
        };
        let path = self.output_path("evaluate.json");
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "evaluation result written");
        Ok(path)
    }

    /// Write an accumulated cost matrix to `{experiment}_cost_matrix.csv`.
    ///
    /// One row per template frame (including the boundary row 0), one column
    /// per test frame. Unreachable cells are written as `inf`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteCsv`] if the file cannot be written.
    #[instrument(skip_all, fields(rows = matrix.rows(), cols = matrix.cols()))]
    pub fn write_cost_matrix(&self, matrix: &CostMatrix) -> Result<PathBuf, IoError> {
        let path = self.output_path("cost_matrix.csv");
        let to_err = |e: csv::Error| IoError::WriteCsv {
            path: path.clone(),
            source: e,
        };
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(to_err)?;
        for row in matrix.iter_rows() {
            wtr.write_record(row.iter().map(|v| {
                if v.is_finite() {
                    v.to_string()
                } else {
                    "inf".to_string()
                }
            }))
            .map_err(to_err)?;
        }
        wtr.flush().map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), band = matrix.band(), "cost matrix written");
        Ok(path)
    }

    /// Return the path where the template bank should be saved.
    ///
    /// Does not write anything. Computes `{output_dir}/{experiment}_templates.bin`.
    #[must_use]
    pub fn bank_path(&self) -> PathBuf {
        self.output_path("templates.bin")
    }

    fn output_path(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}", self.experiment.as_str()))
    }

    fn write_json<T: Serialize>(&self, path: &Path, artifact: &T) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(artifact)
            .map_err(|e| IoError::SerializeResult { source: e })?;
        fs::write(path, json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct Settings {
    band_ratio: f64,
    alpha: f64,
    policy: StepPolicy,
}

impl Settings {
    fn of(classifier: &Classifier) -> Self {
        let band = classifier.dtw().band();
        Self {
            band_ratio: band.band_ratio(),
            alpha: band.alpha(),
            policy: classifier.policy(),
        }
    }
}

#[derive(Serialize)]
struct RecognizeArtifact<'a> {
    experiment: &'a str,
    source: &'a str,
    settings: Settings,
    label: u8,
    label_name: &'static str,
    distance: f64,
    template_index: usize,
}

#[derive(Serialize)]
struct EvaluateArtifact<'a> {
    experiment: &'a str,
    best_run: Option<usize>,
    runs: Vec<RunEntry<'a>>,
}

#[derive(Serialize)]
struct RunEntry<'a> {
    settings: Settings,
    n_templates: usize,
    n_tests: usize,
    total: usize,
    correct: usize,
    rejected: usize,
    accuracy: f64,
    per_digit: Vec<DigitScore>,
    confusion: &'a [[usize; 10]; 10],
}
