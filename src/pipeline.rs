//! Orchestration of the full dataset preparation run.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use log::info;

use crate::config::{IngestConfig, PipelineBuilder, PipelineConfig};
use crate::corpus::{load_message_table, Message};
use crate::error::{QavecError, Result};
use crate::metrics::{sample_rss_kb, PipelineMetrics, Stage};
use crate::pairing::{Exchange, PairReconstructor};
use crate::split::{split_dataset, SplitDataset};
use crate::vectorize::vectorize_exchanges;
use crate::vocab::{Alphabet, CharIndex};

/// High-level façade configuring and executing dataset preparation runs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    cfg: PipelineConfig,
}

/// Artifacts returned after a pipeline run completes.
#[must_use]
#[derive(Debug, Clone)]
pub struct PipelineArtifacts {
    /// The partitioned question/answer tensors.
    pub dataset: SplitDataset,
    /// Character index used to encode every sequence; persist it alongside
    /// any model trained on the tensors.
    pub char_index: CharIndex,
    /// Detailed metrics captured during the run.
    pub metrics: PipelineMetrics,
}

impl Pipeline {
    /// Creates a new pipeline for the supplied configuration.
    #[must_use]
    pub fn new(cfg: PipelineConfig) -> Self {
        Self { cfg }
    }

    /// Returns a [`PipelineBuilder`] with default settings.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineConfig::builder()
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Runs the pipeline on tables loaded from disk according to
    /// [`IngestConfig`].
    pub fn run_from_paths<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        ingest: &IngestConfig,
    ) -> Result<PipelineArtifacts> {
        let ingest_start = Instant::now();
        let messages = load_message_table(inputs, ingest)?;
        let ingest_elapsed = ingest_start.elapsed();
        let mut artifacts = self.run_from_messages(&messages)?;
        artifacts.metrics.stages.insert(
            0,
            crate::metrics::StageMetrics {
                stage: Stage::Ingest,
                rows_in: 0,
                rows_out: messages.len(),
                elapsed: ingest_elapsed,
            },
        );
        Ok(artifacts)
    }

    /// Runs the pipeline on an in-memory message table.
    pub fn run_from_messages(&self, messages: &[Message]) -> Result<PipelineArtifacts> {
        if messages.is_empty() {
            return Err(QavecError::InvalidConfig(
                "the message table holds no rows".into(),
            ));
        }
        self.cfg.validate()?;

        let run_start = Instant::now();
        let mut metrics = PipelineMetrics::new();
        metrics.rows_loaded = messages.len();

        let alphabet = Alphabet::generate();
        let char_index = CharIndex::from_alphabet(&alphabet);
        metrics.vocab_size = alphabet.len();
        if self.cfg.show_progress {
            info!("alphabet of {} characters ready", alphabet.len());
        }

        let stage_start = Instant::now();
        let reconstructor = PairReconstructor::new(&self.cfg)?;
        let (exchanges, pairing) = reconstructor.reconstruct(messages);
        metrics.record_stage(
            Stage::Reconstruction,
            messages.len(),
            exchanges.len(),
            stage_start.elapsed(),
        );
        if self.cfg.show_progress {
            info!(
                "reconstructed {} exchanges from {} rows ({} starters, {} joined, {} from {})",
                exchanges.len(),
                messages.len(),
                pairing.starters,
                pairing.joined,
                pairing.company_matched,
                self.cfg.target_handle
            );
        }
        metrics.pairing = pairing;
        if exchanges.is_empty() {
            return Err(QavecError::EmptyDataset(format!(
                "no exchanges survived filtering ({} rows, {} starters, {} company replies)",
                messages.len(),
                metrics.pairing.starters,
                metrics.pairing.company_matched
            )));
        }

        let stage_start = Instant::now();
        let rows_in = exchanges.len();
        let exchanges: Vec<Exchange> = exchanges
            .into_iter()
            .map(|exchange| Exchange {
                question: alphabet.project_question(&exchange.question),
                answer: alphabet.project_answer(&exchange.answer),
            })
            .collect();
        metrics.empty_projected_sides = exchanges
            .iter()
            .map(|exchange| {
                usize::from(exchange.question.is_empty()) + usize::from(exchange.answer.is_empty())
            })
            .sum();
        metrics.record_stage(
            Stage::Projection,
            rows_in,
            exchanges.len(),
            stage_start.elapsed(),
        );

        let stage_start = Instant::now();
        let (questions, answers) = vectorize_exchanges(&exchanges, &char_index)?;
        metrics.sequence_width = questions.ncols();
        metrics.rss_kb = sample_rss_kb();
        metrics.record_stage(
            Stage::Vectorization,
            exchanges.len(),
            questions.nrows(),
            stage_start.elapsed(),
        );
        if self.cfg.show_progress {
            info!(
                "stacked {} rows at width {}",
                questions.nrows(),
                questions.ncols()
            );
        }

        let stage_start = Instant::now();
        let dataset = split_dataset(
            &questions,
            &answers,
            self.cfg.validation_fraction,
            self.cfg.test_fraction,
            self.cfg.seed,
        )?;
        let (train, validation, test) = dataset.partition_sizes();
        metrics.record_stage(
            Stage::Split,
            questions.nrows(),
            train + validation + test,
            stage_start.elapsed(),
        );
        metrics.total_duration = run_start.elapsed();
        if self.cfg.show_progress {
            info!(
                "partitioned {train}/{validation}/{test} rows in {:.2?}",
                metrics.total_duration
            );
        }

        Ok(PipelineArtifacts {
            dataset,
            char_index,
            metrics,
        })
    }
}

impl fmt::Display for PipelineArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (train, validation, test) = self.dataset.partition_sizes();
        writeln!(
            f,
            "Dataset of {} exchanges at width {}",
            self.metrics.pairing.exchanges,
            self.dataset.sequence_width()
        )?;
        writeln!(f, "Partitions: {train} train / {validation} validation / {test} test")?;
        writeln!(f, "Vocabulary: {} characters", self.char_index.len())?;
        writeln!(f, "Total duration: {:?}", self.metrics.total_duration)?;
        Ok(())
    }
}
