//! Analysis document sources.
//!
//! Loads the backend envelope from a file or over HTTP and picks the
//! dataset a view projects.

pub mod client;

pub use client::BackendClient;

use crate::models::AnalysisResult;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Label used for the document root when no envelope key applies.
pub const ROOT_DATASET: &str = "<root>";

/// Errors raised while locating a dataset inside a document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The dataset exists but is not a JSON object.
    #[error("dataset {what} is not a JSON object")]
    NotAnObject { what: String },

    /// The envelope has no such key.
    #[error("dataset {key} not found in the analysis document")]
    MissingDataset { key: String },

    /// The dataset is a valid but empty object.
    #[error("no data available in {what}")]
    Empty { what: String },
}

/// Read a JSON document from disk.
pub fn load_from_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))
}

/// Whether a key looks like a backend envelope key (`file1Data`, ...).
fn is_envelope_key(key: &str) -> bool {
    key.strip_prefix("file")
        .and_then(|rest| rest.strip_suffix("Data"))
        .map(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

/// Locate the value a view projects.
///
/// With `key = None` the document itself is used. A missing key falls back
/// to the document root only when the document is not an envelope (it has
/// no `fileNData` keys), i.e. it already is an analysis result.
pub fn select_dataset<'a>(
    document: &'a Value,
    key: Option<&str>,
) -> Result<(&'a Value, String), SourceError> {
    let Some(key) = key else {
        return Ok((document, ROOT_DATASET.to_string()));
    };

    if let Some(value) = document.get(key) {
        return Ok((value, key.to_string()));
    }

    let is_envelope = document
        .as_object()
        .map(|o| o.keys().any(|k| is_envelope_key(k)))
        .unwrap_or(false);

    if document.is_object() && !is_envelope {
        debug!("Dataset {} not present, using document root", key);
        return Ok((document, ROOT_DATASET.to_string()));
    }

    Err(SourceError::MissingDataset {
        key: key.to_string(),
    })
}

/// Wrap a dataset as a non-empty analysis result.
pub fn analysis_result(value: &Value, name: &str) -> Result<AnalysisResult, SourceError> {
    let result = AnalysisResult::from_value(value).ok_or_else(|| SourceError::NotAnObject {
        what: name.to_string(),
    })?;

    if result.is_empty() {
        return Err(SourceError::Empty {
            what: name.to_string(),
        });
    }

    Ok(result)
}

/// Whether a whole document carries nothing to project.
pub fn is_empty_document(document: &Value) -> bool {
    match document {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_envelope_key() {
        assert!(is_envelope_key("file1Data"));
        assert!(is_envelope_key("file12Data"));
        assert!(!is_envelope_key("fileData"));
        assert!(!is_envelope_key("crime"));
    }

    #[test]
    fn test_select_dataset_from_envelope() {
        let document = json!({"file1Data": {"crime": {}}, "file2Data": {}});
        let (value, name) = select_dataset(&document, Some("file1Data")).unwrap();
        assert_eq!(name, "file1Data");
        assert_eq!(value, &json!({"crime": {}}));

        assert_eq!(
            select_dataset(&document, Some("file3Data")).unwrap_err(),
            SourceError::MissingDataset {
                key: "file3Data".to_string()
            }
        );
    }

    #[test]
    fn test_select_dataset_falls_back_to_root() {
        let document = json!({"crime": {"Node0_to_NodeLast": []}});
        let (value, name) = select_dataset(&document, Some("file1Data")).unwrap();
        assert_eq!(name, ROOT_DATASET);
        assert_eq!(value, &document);

        let (_, name) = select_dataset(&document, None).unwrap();
        assert_eq!(name, ROOT_DATASET);
    }

    #[test]
    fn test_analysis_result_errors() {
        assert_eq!(
            analysis_result(&json!({}), "file1Data").unwrap_err(),
            SourceError::Empty {
                what: "file1Data".to_string()
            }
        );
        assert!(matches!(
            analysis_result(&json!([1]), "file1Data"),
            Err(SourceError::NotAnObject { .. })
        ));
        assert_eq!(analysis_result(&json!({"a": 1}), "x").unwrap().keys().count(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        std::fs::write(&path, r#"{"file1Data": {"crime": {}}}"#).unwrap();
        let document = load_from_file(&path).unwrap();
        assert!(document.get("file1Data").is_some());

        std::fs::write(&path, "{not json").unwrap();
        assert!(load_from_file(&path).is_err());
        assert!(load_from_file(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_is_empty_document() {
        assert!(is_empty_document(&json!(null)));
        assert!(is_empty_document(&json!({})));
        assert!(!is_empty_document(&json!({"a": 1})));
    }
}
