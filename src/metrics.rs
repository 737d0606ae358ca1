//! Metrics describing one dataset preparation run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pipeline stages reported in the run metrics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Stage {
    /// Loading the message table from disk.
    Ingest,
    /// Join and filter chain producing exchanges.
    Reconstruction,
    /// Alphabet projection of both sides.
    Projection,
    /// Encoding, padding, and stacking into matrices.
    Vectorization,
    /// Seeded shuffle and partition cut.
    Split,
}

/// Timing snapshot captured for one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageMetrics {
    /// The stage being reported.
    pub stage: Stage,
    /// Rows entering the stage.
    pub rows_in: usize,
    /// Rows leaving the stage.
    pub rows_out: usize,
    /// Execution time of the stage.
    pub elapsed: Duration,
}

/// Counters accumulated by the pair reconstruction filter chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PairingCounts {
    /// Inbound messages with no reply reference.
    pub starters: usize,
    /// Replies joined to a starter, any author.
    pub joined: usize,
    /// Joined pairs whose answer author is the target responder.
    pub company_matched: usize,
    /// Pairs whose both sides classified as the target language.
    pub language_kept: usize,
    /// Pairs dropped for ending with a multi-part marker.
    pub incomplete_dropped: usize,
    /// Texts the language detector could not classify.
    pub detector_failures: usize,
    /// Exchanges surviving every filter.
    pub exchanges: usize,
}

/// Aggregate metrics produced by a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineMetrics {
    /// Per-stage snapshots in execution order.
    pub stages: Vec<StageMetrics>,
    /// Filter-chain counters from pair reconstruction.
    pub pairing: PairingCounts,
    /// Rows loaded from the message table.
    pub rows_loaded: usize,
    /// Sides that projected to the empty string (they vectorize to
    /// all-padding rows).
    pub empty_projected_sides: usize,
    /// Number of characters in the alphabet.
    pub vocab_size: usize,
    /// Common column count of the stacked matrices.
    pub sequence_width: usize,
    /// Total duration of the run.
    pub total_duration: Duration,
    /// Resident set size sample captured after vectorization on Linux.
    pub rss_kb: Option<usize>,
}

impl PipelineMetrics {
    /// Creates an empty metrics container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: Vec::with_capacity(5),
            pairing: PairingCounts::default(),
            rows_loaded: 0,
            empty_projected_sides: 0,
            vocab_size: 0,
            sequence_width: 0,
            total_duration: Duration::ZERO,
            rss_kb: None,
        }
    }

    /// Records a stage snapshot.
    pub fn record_stage(
        &mut self,
        stage: Stage,
        rows_in: usize,
        rows_out: usize,
        elapsed: Duration,
    ) {
        self.stages.push(StageMetrics {
            stage,
            rows_in,
            rows_out,
            elapsed,
        });
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
fn current_rss_kb() -> Option<usize> {
    use std::fs::File;
    use std::io::{BufRead, BufReader};

    let file = File::open("/proc/self/status").ok()?;
    for line in BufReader::new(file).lines().map_while(Result::ok) {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let value = rest
                .split_whitespace()
                .find_map(|part| part.parse::<usize>().ok());
            return value;
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn current_rss_kb() -> Option<usize> {
    None
}

/// Samples the current resident set size (RSS) on supported platforms.
pub fn sample_rss_kb() -> Option<usize> {
    current_rss_kb()
}
