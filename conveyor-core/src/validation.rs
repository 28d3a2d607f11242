//! Pipe definition validation
//!
//! A definition document is checked against the pipe JSON Schema before it is
//! deserialized and catalogued. The check runs on the raw JSON so that every
//! failure can name the offending location in the document.

use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;

/// A definition document that does not match the pipe schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {reason}")]
pub struct ValidationError {
    /// JSON-pointer style location of the problem (e.g. `/body/segments/0/header/name`)
    pub path: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Predicate deciding whether a definition document is an acceptable pipe
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, document: &JsonValue) -> Result<(), ValidationError>;
}

/// JSON Schema every pipe definition must satisfy
pub const PIPE_SCHEMA: &str = include_str!("pipe.schema.json");

static PIPE_VALIDATOR: LazyLock<Result<jsonschema::Validator, String>> = LazyLock::new(|| {
    let schema: JsonValue = serde_json::from_str(PIPE_SCHEMA).map_err(|e| e.to_string())?;
    jsonschema::validator_for(&schema).map_err(|e| e.to_string())
});

/// The built-in pipe schema
///
/// Checks the document against [`PIPE_SCHEMA`], then that segment numbers are
/// unique within the pipe, which JSON Schema cannot express.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipeSchema;

impl SchemaValidator for PipeSchema {
    fn validate(&self, document: &JsonValue) -> Result<(), ValidationError> {
        let validator = PIPE_VALIDATOR
            .as_ref()
            .map_err(|e| ValidationError::new("/", format!("pipe schema unusable: {}", e)))?;

        if let Some(error) = validator.iter_errors(document).next() {
            return Err(ValidationError::new(
                display_path(&error.instance_path.to_string()),
                error.to_string(),
            ));
        }

        unique_segment_numbers(document)
    }
}

fn unique_segment_numbers(document: &JsonValue) -> Result<(), ValidationError> {
    let Some(segments) = document["body"]["segments"].as_array() else {
        return Ok(());
    };

    let mut numbers = HashSet::new();
    for (index, segment) in segments.iter().enumerate() {
        let Some(number) = segment["header"]["segmentNumber"].as_i64() else {
            continue;
        };
        if !numbers.insert(number) {
            return Err(ValidationError::new(
                format!("/body/segments/{}/header/segmentNumber", index),
                format!("duplicate segment number {}", number),
            ));
        }
    }

    Ok(())
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}
