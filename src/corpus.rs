//! Facilities for discovering input tables and loading message records.

use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Deserializer};
use walkdir::WalkDir;

use crate::config::IngestConfig;
use crate::error::{QavecError, Result};

/// One row of the customer-support message table.
///
/// Records are the immutable source of truth for pair reconstruction; no
/// later stage mutates them or aliases back into them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    #[serde(rename = "tweet_id")]
    pub id: u64,
    /// Author handle, either the company identity or an anonymized customer id.
    #[serde(rename = "author_id")]
    pub author: String,
    /// True when the message was sent by a customer to the company.
    #[serde(deserialize_with = "deserialize_inbound")]
    pub inbound: bool,
    /// Raw message text.
    pub text: String,
    /// Identifier of the message this one replies to, if any.
    #[serde(
        rename = "in_response_to_tweet_id",
        deserialize_with = "deserialize_reply_id"
    )]
    pub reply_to: Option<u64>,
}

impl Message {
    /// Creates a record directly, bypassing table ingestion.
    #[must_use]
    pub fn new(
        id: u64,
        author: impl Into<String>,
        inbound: bool,
        reply_to: Option<u64>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            author: author.into(),
            inbound,
            text: text.into(),
            reply_to,
        }
    }
}

/// Accepts the Python-style `True`/`False` literals a pandas export writes
/// alongside the usual lowercase forms.
fn deserialize_inbound<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim() {
        "True" | "true" | "TRUE" | "1" => Ok(true),
        "False" | "false" | "FALSE" | "0" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "inbound flag {other:?} is not a boolean"
        ))),
    }
}

fn deserialize_reply_id<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_reply_id(raw.trim()).map_err(serde::de::Error::custom)
}

/// Parses a reply reference cell. The column arrives as plain integers, as
/// float-formatted integers (`"119237.0"`, once pandas has seen an empty
/// cell), or empty.
fn parse_reply_id(raw: &str) -> std::result::Result<Option<u64>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(id) = raw.parse::<u64>() {
        return Ok(Some(id));
    }
    match raw.parse::<f64>() {
        Ok(value) if value >= 0.0 && value.fract() == 0.0 => Ok(Some(value as u64)),
        _ => Err(format!("reply reference {raw:?} is not a message id")),
    }
}

fn is_table_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
}

/// Discovers table files rooted at the provided input paths.
///
/// Explicit file paths are taken as-is; directories are searched for `.csv`
/// files, recursively by default. Set [`IngestConfig::recursive`] to `false`
/// to limit discovery to the first level, and
/// [`IngestConfig::follow_symlinks`] to traverse symlinks.
pub fn collect_paths<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(QavecError::InvalidConfig(format!(
                "input path {path:?} does not exist"
            )));
        }
        let metadata = path
            .symlink_metadata()
            .map_err(|err| QavecError::io(err, Some(path.to_path_buf())))?;
        if metadata.is_dir() {
            if cfg.recursive {
                let walker = WalkDir::new(path).follow_links(cfg.follow_symlinks);
                for entry in walker {
                    let entry = entry.map_err(|err| QavecError::Internal(err.to_string()))?;
                    if entry.file_type().is_file() && is_table_file(entry.path()) {
                        files.push(entry.path().to_path_buf());
                    }
                }
            } else {
                for entry in std::fs::read_dir(path)
                    .map_err(|err| QavecError::io(err, Some(path.to_path_buf())))?
                {
                    let entry =
                        entry.map_err(|err| QavecError::io(err, Some(path.to_path_buf())))?;
                    let entry_path = entry.path();
                    if entry_path.is_file() && is_table_file(&entry_path) {
                        files.push(entry_path);
                    }
                }
            }
        } else if metadata.is_file() {
            files.push(path.to_path_buf());
        }
    }
    if files.is_empty() {
        return Err(QavecError::InvalidConfig(
            "no table files discovered in provided inputs".into(),
        ));
    }
    Ok(files)
}

/// Loads every discovered table into one in-memory message list.
///
/// Files are read in discovery order and concatenated. A missing required
/// column or an unparseable field aborts the load; extra columns are
/// ignored.
pub fn load_message_table<P: AsRef<Path>>(
    inputs: &[P],
    cfg: &IngestConfig,
) -> Result<Vec<Message>> {
    let file_paths = collect_paths(inputs, cfg)?;
    let mut messages = Vec::new();
    for file_path in file_paths {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(cfg.delimiter)
            .from_path(&file_path)
            .map_err(|err| QavecError::Csv(format!("{}: {err}", file_path.display())))?;
        let before = messages.len();
        for record in reader.deserialize() {
            let message: Message =
                record.map_err(|err| QavecError::Csv(format!("{}: {err}", file_path.display())))?;
            messages.push(message);
        }
        debug!(
            "loaded {} rows from {}",
            messages.len() - before,
            file_path.display()
        );
    }
    if messages.is_empty() {
        return Err(QavecError::InvalidConfig(
            "no rows could be loaded from inputs".into(),
        ));
    }
    Ok(messages)
}
