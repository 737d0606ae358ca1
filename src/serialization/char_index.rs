//! Versioned JSON persistence for the character index.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QavecError, Result};
use crate::vocab::CharIndex;

/// Marker identifying the artifact format.
pub const FORMAT: &str = "qavec-char-index";

/// Current artifact version.
pub const VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CharIndexFile {
    format: String,
    version: u32,
    chars: String,
}

/// Serialises the character index to a JSON string.
pub fn char_index_json(index: &CharIndex, pretty: bool) -> Result<String> {
    let file = CharIndexFile {
        format: FORMAT.to_string(),
        version: VERSION,
        chars: index.chars().iter().collect(),
    };
    let json = if pretty {
        serde_json::to_string_pretty(&file)?
    } else {
        serde_json::to_string(&file)?
    };
    Ok(json)
}

/// Persists the character index to `path` as JSON.
pub fn save_char_index<P: AsRef<Path>>(index: &CharIndex, path: P, pretty: bool) -> Result<()> {
    let json = char_index_json(index, pretty)?;
    fs::write(path.as_ref(), json)
        .map_err(|err| QavecError::io(err, Some(path.as_ref().to_path_buf())))
}

/// Loads a character index previously written by [`save_char_index`].
///
/// The artifact is validated before use: the format marker and version must
/// match, and the character list must be free of duplicates.
pub fn load_char_index<P: AsRef<Path>>(path: P) -> Result<CharIndex> {
    let raw = fs::read_to_string(path.as_ref())
        .map_err(|err| QavecError::io(err, Some(path.as_ref().to_path_buf())))?;
    let file: CharIndexFile = serde_json::from_str(&raw)?;
    if file.format != FORMAT {
        return Err(QavecError::Serialization(format!(
            "unexpected artifact format '{}', wanted '{FORMAT}'",
            file.format
        )));
    }
    if file.version != VERSION {
        return Err(QavecError::Serialization(format!(
            "unsupported artifact version {}, this build reads version {VERSION}",
            file.version
        )));
    }
    CharIndex::from_ordered_chars(file.chars.chars().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::Alphabet;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("char_index.json");
        let index = CharIndex::from_alphabet(&Alphabet::generate());

        save_char_index(&index, &path, true).expect("save succeeds");
        let loaded = load_char_index(&path).expect("load succeeds");

        assert_eq!(loaded.chars(), index.chars());
        assert_eq!(loaded.id_of(' '), index.id_of(' '));
    }

    #[test]
    fn json_carries_format_and_version() {
        let index = CharIndex::from_alphabet(&Alphabet::generate());
        let json = char_index_json(&index, false).expect("serialises");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["format"], FORMAT);
        assert_eq!(value["version"], VERSION);
        assert_eq!(value["chars"].as_str().map(str::len), Some(53));
    }

    #[test]
    fn rejects_unknown_format() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("other.json");
        std::fs::write(&path, r#"{"format":"other","version":1,"chars":"ab"}"#)
            .expect("write fixture");
        let err = load_char_index(&path).expect_err("format mismatch");
        assert!(matches!(err, QavecError::Serialization(_)));
    }

    #[test]
    fn rejects_future_version() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("future.json");
        std::fs::write(
            &path,
            format!(r#"{{"format":"{FORMAT}","version":99,"chars":"ab"}}"#),
        )
        .expect("write fixture");
        let err = load_char_index(&path).expect_err("version mismatch");
        assert!(matches!(err, QavecError::Serialization(_)));
    }

    #[test]
    fn rejects_duplicate_characters() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("dupes.json");
        std::fs::write(
            &path,
            format!(r#"{{"format":"{FORMAT}","version":{VERSION},"chars":"aba"}}"#),
        )
        .expect("write fixture");
        let err = load_char_index(&path).expect_err("duplicate char");
        assert!(matches!(err, QavecError::Serialization(_)));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.json");
        let err = load_char_index(&path).expect_err("missing file");
        assert!(err.to_string().contains("absent.json"));
    }
}
