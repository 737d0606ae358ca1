//! Configuration builders controlling pair reconstruction and ingestion.

use serde::{Deserialize, Serialize};
use whatlang::Lang;

use crate::error::{QavecError, Result};

/// Default responder handle whose replies form the answer side.
pub const DEFAULT_TARGET_HANDLE: &str = "AmazonHelp";

/// Default ISO 639-3 code of the language kept by the filter chain.
pub const DEFAULT_TARGET_LANGUAGE: &str = "eng";

/// Brand phrases stripped from text before language classification only
/// (never from the text that is encoded). Product names skew short-text
/// detection toward unrelated languages.
pub const DEFAULT_DETECTOR_STOPLIST: &[&str] = &[
    "amazon fire tv stick",
    "fire tv stick",
    "amazonfiretvstick",
    "amazonmusicunlimited",
    "amazon kindle unlimited",
    "amazon echo dot",
    "prime music",
];

/// Configuration for one dataset preparation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Author identity whose replies are kept as answers (exact match
    /// against the author column, without a leading `@`).
    pub target_handle: String,
    /// ISO 639-3 code both sides of a pair must classify as.
    pub target_language: String,
    /// Fraction of rows cut into the validation partition.
    pub validation_fraction: f64,
    /// Fraction of rows cut into the test partition.
    pub test_fraction: f64,
    /// Seed of the row shuffle applied before partitioning.
    pub seed: u64,
    /// Treats a language-detector failure as "target language" when true;
    /// drops the pair when false. Failures are counted either way.
    pub fail_open_language: bool,
    /// Lowercase phrases removed from text before language classification.
    pub detector_stoplist: Vec<String>,
    /// Enables per-stage logging through the `log` facade.
    pub show_progress: bool,
}

impl PipelineConfig {
    /// Returns a builder initialised with [`PipelineConfig::default`].
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Resolves the configured language code against the detector's set.
    pub fn target_lang(&self) -> Result<Lang> {
        Lang::from_code(self.target_language.as_str()).ok_or_else(|| {
            QavecError::InvalidConfig(format!(
                "target_language {:?} is not a recognised ISO 639-3 code",
                self.target_language
            ))
        })
    }

    /// Validates the invariants required for a run.
    pub fn validate(&self) -> Result<()> {
        if self.target_handle.is_empty() {
            return Err(QavecError::InvalidConfig(
                "target_handle must not be empty".into(),
            ));
        }
        if self.target_handle.contains('@') {
            return Err(QavecError::InvalidConfig(format!(
                "target_handle ({}) is compared against the author column; drop the '@'",
                self.target_handle
            )));
        }
        self.target_lang()?;
        validate_split_fractions(self.validation_fraction, self.test_fraction)?;
        for phrase in &self.detector_stoplist {
            if phrase != &phrase.to_lowercase() {
                return Err(QavecError::InvalidConfig(format!(
                    "detector_stoplist phrase {phrase:?} must be lowercase"
                )));
            }
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_handle: DEFAULT_TARGET_HANDLE.into(),
            target_language: DEFAULT_TARGET_LANGUAGE.into(),
            validation_fraction: 0.1,
            test_fraction: 0.1,
            seed: 42,
            fail_open_language: true,
            detector_stoplist: DEFAULT_DETECTOR_STOPLIST
                .iter()
                .map(|phrase| (*phrase).to_string())
                .collect(),
            show_progress: true,
        }
    }
}

/// Checks split proportions: each inside `[0, 1)` and summing below 1.
pub(crate) fn validate_split_fractions(validation: f64, test: f64) -> Result<()> {
    for (name, value) in [("validation_fraction", validation), ("test_fraction", test)] {
        if !(0.0..1.0).contains(&value) {
            return Err(QavecError::InvalidConfig(format!(
                "{name} ({value}) must lie in [0, 1)"
            )));
        }
    }
    if validation + test >= 1.0 {
        return Err(QavecError::InvalidConfig(format!(
            "validation_fraction + test_fraction ({}) must stay below 1",
            validation + test
        )));
    }
    Ok(())
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Default, Clone)]
pub struct PipelineBuilder {
    cfg: PipelineConfig,
}

impl PipelineBuilder {
    /// Creates a builder with [`PipelineConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the responder handle whose replies become answers.
    #[must_use]
    pub fn target_handle(mut self, handle: impl Into<String>) -> Self {
        self.cfg.target_handle = handle.into();
        self
    }

    /// Sets the ISO 639-3 code of the kept language.
    #[must_use]
    pub fn target_language(mut self, code: impl Into<String>) -> Self {
        self.cfg.target_language = code.into();
        self
    }

    /// Sets the validation and test fractions; train is the remainder.
    #[must_use]
    pub fn split_fractions(mut self, validation: f64, test: f64) -> Self {
        self.cfg.validation_fraction = validation;
        self.cfg.test_fraction = test;
        self
    }

    /// Sets the shuffle seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.cfg.seed = seed;
        self
    }

    /// Keeps or drops pairs whose language the detector cannot decide.
    #[must_use]
    pub fn fail_open_language(mut self, enabled: bool) -> Self {
        self.cfg.fail_open_language = enabled;
        self
    }

    /// Overrides the phrases stripped before language classification.
    #[must_use]
    pub fn detector_stoplist<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cfg.detector_stoplist = phrases.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Enables or disables per-stage logging.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Finalises the builder, returning a validated [`PipelineConfig`].
    pub fn build(mut self) -> Result<PipelineConfig> {
        let mut seen = std::collections::HashSet::new();
        self.cfg
            .detector_stoplist
            .retain(|phrase| seen.insert(phrase.clone()));
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Configuration controlling how message tables are read from disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// Enables recursive directory traversal.
    pub recursive: bool,
    /// Follows symlinks encountered during traversal.
    pub follow_symlinks: bool,
    /// Field delimiter of the input tables.
    pub delimiter: u8,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
            delimiter: b',',
        }
    }
}

impl IngestConfig {
    /// Returns a builder initialised with [`IngestConfig::default`].
    #[must_use]
    pub fn builder() -> IngestBuilder {
        IngestBuilder::default()
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug, Default, Clone)]
pub struct IngestBuilder {
    cfg: IngestConfig,
}

impl IngestBuilder {
    /// Creates a new builder with [`IngestConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables recursive directory traversal.
    #[must_use]
    pub fn recursive(mut self, enabled: bool) -> Self {
        self.cfg.recursive = enabled;
        self
    }

    /// Enables or disables following of symlinks when traversing directories.
    #[must_use]
    pub fn follow_symlinks(mut self, enabled: bool) -> Self {
        self.cfg.follow_symlinks = enabled;
        self
    }

    /// Sets the field delimiter of the input tables.
    #[must_use]
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.cfg.delimiter = delimiter;
        self
    }

    /// Finalises the builder, returning the [`IngestConfig`].
    pub fn build(self) -> IngestConfig {
        self.cfg
    }
}
