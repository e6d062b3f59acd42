//! The API description document served on request.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use thiserror::Error;

/// Errors loading the description file.
#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("Failed to read API description {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("API description {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Served when no description file is configured.
#[must_use]
pub fn default_description() -> Value {
    json!({ "endpoints": [] })
}

/// Load the description from `path`, or fall back to the default document.
pub fn load_description(path: Option<&Path>) -> Result<Value, DescriptionError> {
    let Some(path) = path else {
        return Ok(default_description());
    };

    let raw = fs::read(path).map_err(|source| DescriptionError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| DescriptionError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
