//! Definition file discovery and loading

use conveyor_core::{Pipe, SchemaValidator};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::DefinitionError;

/// File names accepted from the local pipes directory
static DEFINITION_FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9\s_\\.\-\(\):])+\.(json)$").expect("definition file pattern is valid")
});

/// Definition files in the local pipes directory, sorted by name
///
/// A missing directory yields no files.
pub fn local_definition_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| DEFINITION_FILE_NAME.is_match(name))
        })
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    files
}

/// Reads, validates and deserializes one definition file
pub fn load_definition(
    path: &Path,
    validator: &dyn SchemaValidator,
) -> Result<Pipe, DefinitionError> {
    let content = fs::read(path).map_err(|source| DefinitionError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let document: JsonValue =
        serde_json::from_slice(&content).map_err(|source| DefinitionError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    validator
        .validate(&document)
        .map_err(|source| DefinitionError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;

    serde_json::from_value(document).map_err(|source| DefinitionError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
