//! Asset copying and stylesheet minification.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// A source tree copied verbatim into the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMapping {
    /// Source directory
    pub from: PathBuf,
    /// Destination, relative to the output directory
    pub to: PathBuf,
}

impl AssetMapping {
    pub fn new(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// The asset trees of the standard project layout below `src`.
pub fn default_assets(src: &Path) -> Vec<AssetMapping> {
    ["fonts", "images", "favicon", "svgs", "video"]
        .into_iter()
        .map(|kind| {
            AssetMapping::new(
                src.join("assets").join(kind),
                Path::new("assets").join(kind),
            )
        })
        .collect()
}

/// Result of copying one asset tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// Number of files copied
    Copied(usize),
    /// The source directory does not exist; nothing was copied
    Missing,
}

/// Errors that can occur while processing assets.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Failed to read asset {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to write asset {path}: {message}")]
    Write { path: PathBuf, message: String },
}

/// Asset pipeline utilities.
pub struct AssetPipeline;

impl AssetPipeline {
    /// Copy a directory tree verbatim.
    ///
    /// A missing source directory is not an error.
    pub fn copy_tree(from: &Path, to: &Path) -> Result<CopyOutcome, AssetError> {
        if !from.is_dir() {
            tracing::debug!("Asset directory not found, skipping: {}", from.display());
            return Ok(CopyOutcome::Missing);
        }

        let mut copied = 0;

        for entry in WalkDir::new(from).follow_links(true) {
            let entry = entry.map_err(|e| AssetError::Read {
                path: from.to_path_buf(),
                message: e.to_string(),
            })?;

            let path = entry.path();
            let target = to.join(path.strip_prefix(from).unwrap_or(path));

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(|e| AssetError::Write {
                    path: target.clone(),
                    message: e.to_string(),
                })?;
                continue;
            }

            fs::copy(path, &target).map_err(|e| AssetError::Write {
                path: target.clone(),
                message: e.to_string(),
            })?;
            copied += 1;
        }

        tracing::debug!(
            "Copied {} files from {} to {}",
            copied,
            from.display(),
            to.display()
        );

        Ok(CopyOutcome::Copied(copied))
    }

    /// Copy a compiled stylesheet to `css_dir/<stem>.bundle.css`,
    /// minifying it when requested.
    ///
    /// CSS that fails to parse is written unminified.
    pub fn bundle_stylesheet(
        source: &Path,
        css_dir: &Path,
        minify: bool,
    ) -> Result<PathBuf, AssetError> {
        let css = fs::read_to_string(source).map_err(|e| AssetError::Read {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;

        let css = if minify {
            match Self::minify_css(&css) {
                Ok(minified) => minified,
                Err(e) => {
                    tracing::warn!("Skipping minification of {}: {}", source.display(), e);
                    css
                }
            }
        } else {
            css
        };

        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("style");
        let target = css_dir.join(format!("{stem}.bundle.css"));

        fs::create_dir_all(css_dir).map_err(|e| AssetError::Write {
            path: css_dir.to_path_buf(),
            message: e.to_string(),
        })?;
        fs::write(&target, css).map_err(|e| AssetError::Write {
            path: target.clone(),
            message: e.to_string(),
        })?;

        Ok(target)
    }

    /// Minify CSS using lightningcss. Comments are dropped.
    pub fn minify_css(css: &str) -> Result<String, String> {
        use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

        let stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;

        let minified = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        Ok(minified.code)
    }
}
