//! Discovery and merging of data fragments.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use crate::context::{MergePolicy, MergedContext};
use crate::fragment::{DataFragment, FragmentError};

/// Default glob used to find data fragments below the data root.
pub const DEFAULT_PATTERN: &str = "**/*.json";

/// Errors that can occur while aggregating the build context.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Invalid data pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("Failed to read data directory {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse data file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unsupported data file {0}: expected .json, .yaml, .yml or .toml")]
    UnsupportedFormat(PathBuf),
}

impl From<FragmentError> for DataError {
    fn from(err: FragmentError) -> Self {
        match err {
            FragmentError::UnsupportedFormat(path) => Self::UnsupportedFormat(path),
            FragmentError::Read { path, message } => Self::Read { path, message },
            FragmentError::Invalid { path, message } => Self::Parse { path, message },
        }
    }
}

/// Loads every fragment under a root directory and merges them.
#[derive(Debug, Clone)]
pub struct ContextAggregator {
    root: PathBuf,
    pattern: Pattern,
    policy: MergePolicy,
}

impl ContextAggregator {
    /// Create an aggregator for `root`, matching files against a glob
    /// relative to it (e.g. `**/*.json`).
    pub fn new(root: impl Into<PathBuf>, pattern: &str) -> Result<Self, DataError> {
        let pattern = Pattern::new(pattern).map_err(|e| DataError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            root: root.into(),
            pattern,
            policy: MergePolicy::default(),
        })
    }

    /// Set the collision policy.
    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find matching files in lexical order of their root-relative path.
    pub fn discover(&self) -> Result<Vec<PathBuf>, DataError> {
        if !self.root.exists() {
            tracing::warn!(
                "Data directory not found: {}, using empty context",
                self.root.display()
            );
            return Ok(Vec::new());
        }

        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };

        let mut found: Vec<(String, PathBuf)> = Vec::new();

        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|e| DataError::Read {
                path: self.root.clone(),
                message: e.to_string(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = relative_key(path.strip_prefix(&self.root).unwrap_or(path));

            if self.pattern.matches_with(&relative, options) {
                found.push((relative, path.to_path_buf()));
            }
        }

        found.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(found.into_iter().map(|(_, path)| path).collect())
    }

    /// Discover, parse and merge every fragment.
    ///
    /// The first malformed file aborts aggregation.
    pub fn aggregate(&self) -> Result<MergedContext, DataError> {
        let paths = self.discover()?;
        let mut fragments = Vec::with_capacity(paths.len());

        for path in &paths {
            let fragment = DataFragment::load(path)?;
            tracing::debug!(
                "Loaded {} keys from {}",
                fragment.values().len(),
                path.display()
            );
            fragments.push(fragment);
        }

        let context = MergedContext::from_fragments(fragments, self.policy);

        tracing::info!(
            "Merged {} data files into {} context keys",
            paths.len(),
            context.len()
        );

        Ok(context)
    }
}

/// Relative path with `/` separators, used for matching and ordering.
fn relative_key(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
