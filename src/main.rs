use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use parrot_audio::{
    DEFAULT_AMPLITUDE_THRESHOLD, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_DURATION_SECS,
    DEFAULT_MAX_SILENCE_SECS, DEFAULT_SAMPLE_RATE, DEFAULT_ZCR_THRESHOLD, EndpointConfig, Recorder,
    StopReason,
};
use parrot_dtw::{AdaptiveBand, Classifier, Digit, Dtw, StepPolicy};
use parrot_io::{
    EvaluationRun, ExperimentName, FeatureReader, Recordings, ResultWriter, WavFile,
    load_templates, save_templates, write_utterance,
};

#[derive(Parser)]
#[command(name = "parrot")]
#[command(about = "Isolated spoken-digit recognition with adaptive-band DTW")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel alignment (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Alignment parameters shared by every recognition command.
#[derive(Args, Debug, Clone)]
struct TuningArgs {
    /// Band radius as a fraction of the longer sequence
    #[arg(long, default_value_t = AdaptiveBand::DEFAULT_BAND_RATIO)]
    band_ratio: f64,

    /// Weight of the length difference added to the band radius
    #[arg(long, default_value_t = AdaptiveBand::DEFAULT_ALPHA)]
    alpha: f64,

    /// Restrict each row to within one frame of the diagonal
    #[arg(long, default_value_t = false)]
    time_sync: bool,
}

impl TuningArgs {
    fn policy(&self) -> StepPolicy {
        if self.time_sync {
            StepPolicy::TimeSynchronous
        } else {
            StepPolicy::Unconstrained
        }
    }

    fn classifier(&self, band_ratio: f64) -> Result<Classifier> {
        let band = AdaptiveBand::new(band_ratio, self.alpha).context("invalid band parameters")?;
        Ok(Classifier::new(Dtw::new(band)).with_policy(self.policy()))
    }
}

/// Silence-detection parameters for capture and replay.
#[derive(Args, Debug, Clone)]
struct EndpointArgs {
    /// Capture sample rate in Hz
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Samples per analysis chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Mean absolute amplitude below which a chunk may be silent
    #[arg(long, default_value_t = DEFAULT_AMPLITUDE_THRESHOLD)]
    amplitude_threshold: f64,

    /// Zero-crossing rate below which a chunk may be silent
    #[arg(long, default_value_t = DEFAULT_ZCR_THRESHOLD)]
    zcr_threshold: f64,

    /// Seconds of continuous silence that end an utterance
    #[arg(long, default_value_t = DEFAULT_MAX_SILENCE_SECS)]
    max_silence: f64,

    /// Hard cap on utterance length in seconds
    #[arg(long, default_value_t = DEFAULT_MAX_DURATION_SECS)]
    max_duration: f64,
}

impl EndpointArgs {
    fn config(&self) -> Result<EndpointConfig> {
        let config = EndpointConfig::new(self.sample_rate, self.chunk_size)?
            .with_amplitude_threshold(self.amplitude_threshold)
            .with_zcr_threshold(self.zcr_threshold)
            .with_max_silence_secs(self.max_silence)
            .with_max_duration_secs(self.max_duration);
        config.validate().context("invalid endpoint parameters")?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Recognize the digit spoken in one feature CSV
    Classify {
        /// Feature CSV of the utterance to recognize
        #[arg(long)]
        features: PathBuf,

        /// Template bank written by `build-bank`
        #[arg(long, conflicts_with = "recordings", required_unless_present = "recordings")]
        templates: Option<PathBuf>,

        /// Directory of `<digit>_<n>.csv` recordings to take templates from
        #[arg(long)]
        recordings: Option<PathBuf>,

        /// Templates per digit when reading from a recordings directory
        #[arg(long, default_value_t = 1)]
        n_templates: usize,

        /// Experiment name used as prefix for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Select templates from a recordings directory and save them as a bank
    BuildBank {
        /// Directory of `<digit>_<n>.csv` recordings
        #[arg(long)]
        recordings: PathBuf,

        /// Templates per digit
        #[arg(long, default_value_t = 1)]
        n_templates: usize,

        /// Experiment name used as prefix for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Score recognition accuracy on held-out recordings
    Evaluate {
        /// Directory of `<digit>_<n>.csv` recordings
        #[arg(long)]
        recordings: PathBuf,

        /// Templates per digit
        #[arg(long, default_value_t = 1)]
        n_templates: usize,

        /// Test recordings per digit, taken after the templates
        #[arg(long, default_value_t = 5)]
        n_tests: usize,

        /// Sweep these band ratios instead of `--band-ratio` (comma separated)
        #[arg(long, value_delimiter = ',')]
        band_ratios: Vec<f64>,

        /// Sweep these template counts instead of `--n-templates` (comma separated)
        #[arg(long, value_delimiter = ',')]
        template_counts: Vec<usize>,

        /// Experiment name used as prefix for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Export the accumulated cost matrix of one alignment as CSV
    CostMatrix {
        /// Feature CSV of the template
        #[arg(long)]
        template: PathBuf,

        /// Feature CSV of the test utterance
        #[arg(long)]
        test: PathBuf,

        /// Experiment name used as prefix for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Replay a WAV file through the endpoint detector
    Endpoint {
        /// 16-bit mono WAV file
        #[arg(long)]
        wav: PathBuf,

        /// Feed zeros once the file runs out instead of failing
        #[arg(long, default_value_t = false)]
        pad_silence: bool,

        /// Write the endpointed utterance to this WAV file
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        endpoint: EndpointArgs,
    },

    /// Record one utterance from the default microphone
    #[cfg(feature = "mic")]
    Record {
        /// Digit being spoken (numeral or word)
        #[arg(long)]
        digit: Digit,

        /// Recording number; defaults to the first unused one
        #[arg(long)]
        index: Option<usize>,

        /// Directory the WAV file is written to
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Milliseconds a chunk read may wait for the device
        #[arg(long, default_value_t = 2000)]
        read_timeout_ms: u64,

        #[command(flatten)]
        endpoint: EndpointArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct ClassifyOutput {
    experiment: String,
    policy: StepPolicy,
    total_templates: usize,
    label: Digit,
    label_name: &'static str,
    distance: f64,
    template_index: usize,
}

#[derive(Serialize)]
struct BuildBankOutput {
    experiment: String,
    bank: PathBuf,
    n_labels: usize,
    n_templates: usize,
    total_templates: usize,
}

#[derive(Serialize)]
struct EvaluateOutput {
    experiment: String,
    policy: StepPolicy,
    n_tests: usize,
    best_band_ratio: Option<f64>,
    best_n_templates: Option<usize>,
    runs: Vec<RunOutput>,
}

#[derive(Serialize)]
struct RunOutput {
    band_ratio: f64,
    n_templates: usize,
    correct: usize,
    rejected: usize,
    total: usize,
    accuracy: f64,
}

#[derive(Serialize)]
struct CostMatrixOutput {
    experiment: String,
    policy: StepPolicy,
    rows: usize,
    cols: usize,
    band: usize,
    distance: Option<f64>,
}

#[derive(Serialize)]
struct EndpointOutput {
    source: PathBuf,
    stop_reason: StopReason,
    n_chunks: usize,
    n_samples: usize,
    duration_secs: f64,
    output: Option<PathBuf>,
}

/// Load the bank or select templates from a recordings directory.
fn load_template_source(
    templates: Option<&Path>,
    recordings: Option<&Path>,
    n_templates: usize,
) -> Result<parrot_dtw::TemplateSet> {
    match (templates, recordings) {
        (Some(bank), _) => load_templates(bank).context("failed to load template bank"),
        (None, Some(dir)) => {
            let recordings = Recordings::load(dir).context("failed to read recordings")?;
            let (set, _) = recordings.split(n_templates, 0)?;
            Ok(set)
        }
        (None, None) => bail!("either --templates or --recordings is required"),
    }
}

/// Return the first recording number with no WAV file in `dir`.
#[cfg(feature = "mic")]
fn next_free_index(dir: &Path, digit: Digit) -> Option<parrot_io::RecordingId> {
    (1..)
        .filter_map(|index| parrot_io::RecordingId::new(digit, index))
        .find(|id| !dir.join(id.file_name("wav")).exists())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Classify {
            features,
            templates,
            recordings,
            n_templates,
            experiment,
            output_dir,
            tuning,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let classifier = tuning.classifier(tuning.band_ratio)?;

            let set = load_template_source(templates.as_deref(), recordings.as_deref(), n_templates)?;
            info!(n_labels = set.n_labels(), n_templates = set.len(), "templates loaded");

            let test = FeatureReader::new(&features)
                .read()
                .context("failed to read feature CSV")?;
            info!(frames = test.len(), dim = test.dim(), "utterance loaded");

            let result = classifier
                .classify(&set, test.as_view())
                .context("recognition failed")?;

            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let source = features.display().to_string();
            writer.write_recognition(&source, &classifier, &result)?;

            let output = ClassifyOutput {
                experiment,
                policy: classifier.policy(),
                total_templates: set.len(),
                label: result.label,
                label_name: result.label.name(),
                distance: result.distance.value(),
                template_index: result.template_index,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::BuildBank {
            recordings,
            n_templates,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            let recordings = Recordings::load(&recordings).context("failed to read recordings")?;
            info!(n_recordings = recordings.len(), "recordings loaded");
            let (set, _) = recordings.split(n_templates, 0)?;

            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let bank = writer.bank_path();
            save_templates(&bank, &set).context("failed to save template bank")?;

            let output = BuildBankOutput {
                experiment,
                bank,
                n_labels: set.n_labels(),
                n_templates,
                total_templates: set.len(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Evaluate {
            recordings,
            n_templates,
            n_tests,
            band_ratios,
            template_counts,
            experiment,
            output_dir,
            tuning,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            let band_ratios = if band_ratios.is_empty() {
                vec![tuning.band_ratio]
            } else {
                band_ratios
            };
            let template_counts = if template_counts.is_empty() {
                vec![n_templates]
            } else {
                template_counts
            };
            let Some(&max_templates) = template_counts.iter().max() else {
                bail!("no template counts to evaluate");
            };
            if template_counts.contains(&0) {
                bail!("template counts must be at least 1");
            }

            // Every run scores the same tests: they follow the largest template pool.
            let recordings = Recordings::load(&recordings).context("failed to read recordings")?;
            info!(n_recordings = recordings.len(), "recordings loaded");
            let (pool, tests) = recordings.split(max_templates, n_tests)?;
            if tests.is_empty() {
                warn!("no test recordings; accuracy will be reported as 0");
            }

            let mut runs = Vec::with_capacity(band_ratios.len() * template_counts.len());
            for &band_ratio in &band_ratios {
                let classifier = tuning.classifier(band_ratio)?;
                for &count in &template_counts {
                    let set = pool.truncated(count);
                    let evaluation = classifier
                        .evaluate(&set, &tests)
                        .context("evaluation failed")?;
                    info!(
                        band_ratio,
                        n_templates = count,
                        accuracy = evaluation.accuracy(),
                        "run scored"
                    );
                    runs.push(EvaluationRun {
                        classifier,
                        n_templates: count,
                        n_tests,
                        evaluation,
                    });
                }
            }

            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            writer.write_evaluation(&runs)?;

            // First run with the highest accuracy, matching the artifact's best_run.
            let best = runs.iter().fold(None::<&EvaluationRun>, |best, run| match best {
                Some(b) if run.evaluation.accuracy() <= b.evaluation.accuracy() => Some(b),
                _ => Some(run),
            });

            let output = EvaluateOutput {
                experiment,
                policy: tuning.policy(),
                n_tests,
                best_band_ratio: best.map(|r| r.classifier.dtw().band().band_ratio()),
                best_n_templates: best.map(|r| r.n_templates),
                runs: runs
                    .iter()
                    .map(|r| RunOutput {
                        band_ratio: r.classifier.dtw().band().band_ratio(),
                        n_templates: r.n_templates,
                        correct: r.evaluation.correct(),
                        rejected: r.evaluation.rejected(),
                        total: r.evaluation.total(),
                        accuracy: r.evaluation.accuracy(),
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::CostMatrix {
            template,
            test,
            experiment,
            output_dir,
            tuning,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let classifier = tuning.classifier(tuning.band_ratio)?;

            let template = FeatureReader::new(&template)
                .read()
                .context("failed to read template CSV")?;
            let test = FeatureReader::new(&test)
                .read()
                .context("failed to read test CSV")?;

            let matrix = classifier
                .dtw()
                .cost_matrix(classifier.policy(), template.as_view(), test.as_view())
                .context("cost matrix computation failed")?;
            let distance = matrix.terminal();
            if distance.is_none() {
                warn!("no alignment path within the band");
            }

            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            writer.write_cost_matrix(&matrix)?;

            let output = CostMatrixOutput {
                experiment,
                policy: matrix.policy(),
                rows: matrix.rows(),
                cols: matrix.cols(),
                band: matrix.band(),
                distance: distance.map(|d| d.value()),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Endpoint {
            wav,
            pad_silence,
            output,
            endpoint,
        } => {
            let config = endpoint.config()?;
            let device = WavFile::new(&wav).with_silence_padding(pad_silence);
            let mut recorder = Recorder::new(device, config)?;
            let recording = recorder.record().context("endpoint replay failed")?;

            if let Some(path) = &output {
                write_utterance(path, recording.utterance())
                    .context("failed to write utterance")?;
            }

            let utterance = recording.utterance();
            let summary = EndpointOutput {
                source: wav,
                stop_reason: recording.stop_reason(),
                n_chunks: utterance.n_chunks(),
                n_samples: utterance.samples().len(),
                duration_secs: utterance.duration_secs(),
                output,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        #[cfg(feature = "mic")]
        Command::Record {
            digit,
            index,
            output_dir,
            read_timeout_ms,
            endpoint,
        } => {
            let config = endpoint.config()?;
            let id = match index {
                Some(index) => parrot_io::RecordingId::new(digit, index)
                    .context("recording index must be at least 1")?,
                None => next_free_index(&output_dir, digit)
                    .context("no free recording index")?,
            };
            std::fs::create_dir_all(&output_dir).with_context(|| {
                format!("failed to create {}", output_dir.display())
            })?;
            let path = output_dir.join(id.file_name("wav"));

            let microphone = parrot_audio::Microphone::new()
                .with_read_timeout(std::time::Duration::from_millis(read_timeout_ms));
            let mut recorder = Recorder::new(microphone, config)?;
            info!(recording = %id, "speak now");
            let recording = recorder.record().context("recording failed")?;
            write_utterance(&path, recording.utterance()).context("failed to write utterance")?;

            let utterance = recording.utterance();
            let summary = EndpointOutput {
                source: PathBuf::from("microphone"),
                stop_reason: recording.stop_reason(),
                n_chunks: utterance.n_chunks(),
                n_samples: utterance.samples().len(),
                duration_secs: utterance.duration_secs(),
                output: Some(path),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_are_named_by_scope() {
        let digit = Digit::new(4).unwrap();
        let classify = ClassifyOutput {
            experiment: "run".to_string(),
            policy: StepPolicy::Unconstrained,
            total_templates: 30,
            label: digit,
            label_name: digit.name(),
            distance: 1.5,
            template_index: 2,
        };
        let json = serde_json::to_value(&classify).unwrap();
        assert_eq!(json["total_templates"], 30);
        assert!(json.get("n_templates").is_none());

        let bank = BuildBankOutput {
            experiment: "run".to_string(),
            bank: PathBuf::from("run_templates.bin"),
            n_labels: 10,
            n_templates: 3,
            total_templates: 30,
        };
        let json = serde_json::to_value(&bank).unwrap();
        assert_eq!(json["n_templates"], 3);
        assert_eq!(json["total_templates"], 30);
    }
}
