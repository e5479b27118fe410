//! Data fragment loading and parsing.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

/// Structured formats a fragment can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// One structured document contributing to the build context.
///
/// A fragment is identified by the file it was loaded from and is never
/// modified after loading.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFragment {
    path: PathBuf,
    values: Map<String, Value>,
}

impl DataFragment {
    /// Read and parse a fragment from disk.
    pub fn load(path: &Path) -> Result<Self, FragmentError> {
        let format = Format::from_path(path)
            .ok_or_else(|| FragmentError::UnsupportedFormat(path.to_path_buf()))?;

        let source = fs::read_to_string(path).map_err(|e| FragmentError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::parse(path, &source, format)
    }

    /// Parse fragment source that was already read.
    ///
    /// The document root must be a mapping.
    pub fn parse(path: &Path, source: &str, format: Format) -> Result<Self, FragmentError> {
        let invalid = |message: String| FragmentError::Invalid {
            path: path.to_path_buf(),
            message,
        };

        let value: Value = match format {
            Format::Json => serde_json::from_str(source).map_err(|e| invalid(e.to_string()))?,
            Format::Yaml => serde_yaml::from_str(source).map_err(|e| invalid(e.to_string()))?,
            Format::Toml => toml::from_str(source).map_err(|e| invalid(e.to_string()))?,
        };

        match value {
            Value::Object(values) => Ok(Self {
                path: path.to_path_buf(),
                values,
            }),
            other => Err(invalid(format!(
                "expected a mapping at the document root, found {}",
                kind_name(&other)
            ))),
        }
    }

    /// Source file this fragment was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Top-level values of the fragment.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub(crate) fn into_values(self) -> Map<String, Value> {
        self.values
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Errors that can occur when loading a fragment.
#[derive(Debug, thiserror::Error)]
pub enum FragmentError {
    #[error("Unsupported data format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Malformed data in {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}
