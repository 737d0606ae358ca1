//! Character-level question/answer dataset preparation library and CLI.
//!
//! The crate exposes both a library API and a `qavec` command line interface
//! for turning raw customer-support message tables into integer-encoded
//! question/answer tensors ready for sequence-to-sequence training.  Typical
//! usage loads one or more CSV tables, reconstructs customer/support
//! exchanges, encodes them against a fixed character alphabet, and splits the
//! result into train/validation/test partitions.
//!
//! ```no_run
//! use qavec::{IngestConfig, Pipeline, PipelineConfig};
//!
//! # fn main() -> qavec::Result<()> {
//! let cfg = PipelineConfig::builder()
//!     .target_handle("AmazonHelp")
//!     .split_fractions(0.1, 0.1)
//!     .show_progress(false)
//!     .build()?;
//! let pipeline = Pipeline::new(cfg);
//! let ingest_cfg = IngestConfig::default();
//! let artifacts = pipeline.run_from_paths(&["/path/to/twcs.csv"], &ingest_cfg)?;
//! qavec::serialization::save_split_dataset(&artifacts.dataset, "out")?;
//! qavec::serialization::save_char_index(&artifacts.char_index, "out/char_index.json", true)?;
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature.  Users targeting
//! the library portion only can disable default features to avoid the CLI
//! dependencies: `qavec = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::multiple_crate_versions
)]

pub mod config;
pub mod corpus;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod pairing;
pub mod pipeline;
pub mod serialization;
pub mod split;
pub mod vectorize;
pub mod vocab;

pub use config::{IngestConfig, PipelineBuilder, PipelineConfig};
pub use corpus::Message;
pub use error::{QavecError, Result};
pub use metrics::{PairingCounts, PipelineMetrics};
pub use pairing::Exchange;
pub use pipeline::{Pipeline, PipelineArtifacts};
pub use split::SplitDataset;
pub use vocab::{Alphabet, CharId, CharIndex};
