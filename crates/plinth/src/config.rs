//! Project configuration (plinth.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use plinth_data::{MergePolicy, DEFAULT_PATTERN};
use plinth_static::{default_assets, AssetMapping, BuildConfig};
use serde::Deserialize;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "plinth.toml";

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub build: BuildSettings,
    /// Asset trees; the standard five when omitted
    pub assets: Option<Vec<AssetEntry>>,
    #[serde(default)]
    pub dev: DevSettings,
}

#[derive(Debug, Deserialize)]
pub struct SiteConfig {
    /// Base for the default data, template and asset locations
    #[serde(default = "default_src")]
    pub src: String,
    #[serde(default = "default_output")]
    pub output: String,
}

#[derive(Debug, Deserialize)]
pub struct DataConfig {
    /// `<src>/data` when omitted
    pub dir: Option<String>,
    #[serde(default = "default_pattern")]
    pub pattern: String,
    #[serde(default)]
    pub merge: MergePolicy,
}

#[derive(Debug, Deserialize, Default)]
pub struct TemplatesConfig {
    /// `<src>/html` when omitted
    pub pages: Option<String>,
    /// `<src>/partials` when omitted
    pub partials: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BuildSettings {
    #[serde(default = "default_minify")]
    pub minify: bool,
    #[serde(default)]
    pub stylesheets: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssetEntry {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct DevSettings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_open")]
    pub open: bool,
}

fn default_src() -> String {
    "src".to_string()
}
fn default_output() -> String {
    "dist".to_string()
}
fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}
fn default_minify() -> bool {
    true
}
fn default_port() -> u16 {
    9000
}
fn default_open() -> bool {
    true
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            src: default_src(),
            output: default_output(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: None,
            pattern: default_pattern(),
            merge: MergePolicy::default(),
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            minify: default_minify(),
            stylesheets: Vec::new(),
        }
    }
}

impl Default for DevSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            open: default_open(),
        }
    }
}

impl ConfigFile {
    /// Load configuration from `path` if it exists.
    /// Returns an error if the file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Output directory of the built site.
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.site.output)
    }

    /// `explicit` when set, otherwise `default` below `site.src`.
    fn source_path(&self, explicit: Option<&String>, default: &str) -> PathBuf {
        match explicit {
            Some(path) => PathBuf::from(path),
            None => Path::new(&self.site.src).join(default),
        }
    }

    /// Turn the file settings into a builder configuration.
    pub fn build_config(&self, output: Option<PathBuf>, minify: Option<bool>) -> BuildConfig {
        let assets = match &self.assets {
            Some(entries) => entries
                .iter()
                .map(|a| AssetMapping::new(&a.from, &a.to))
                .collect(),
            None => default_assets(Path::new(&self.site.src)),
        };

        BuildConfig {
            data_dir: self.source_path(self.data.dir.as_ref(), "data"),
            data_pattern: self.data.pattern.clone(),
            merge_policy: self.data.merge,
            pages_dir: self.source_path(self.templates.pages.as_ref(), "html"),
            partials_dir: self.source_path(self.templates.partials.as_ref(), "partials"),
            output_dir: output.unwrap_or_else(|| self.output_dir()),
            assets,
            stylesheets: self.build.stylesheets.iter().map(PathBuf::from).collect(),
            minify: minify.unwrap_or(self.build.minify),
            inject: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ConfigFile::parse("").unwrap();
        let build = config.build_config(None, None);

        assert_eq!(build.data_dir, PathBuf::from("src/data"));
        assert_eq!(build.pages_dir, PathBuf::from("src/html"));
        assert_eq!(build.data_pattern, "**/*.json");
        assert_eq!(build.merge_policy, MergePolicy::Shallow);
        assert_eq!(build.output_dir, PathBuf::from("dist"));
        assert_eq!(build.assets.len(), 5);
        assert!(build.minify);
        assert_eq!(config.dev.port, 9000);
    }

    #[test]
    fn reads_every_section() {
        let config = ConfigFile::parse(
            r#"
[site]
output = "public"

[data]
dir = "content/data"
pattern = "**/*.yaml"
merge = "deep"

[templates]
pages = "content/pages"

[build]
minify = false
stylesheets = ["build/theme.css"]

[[assets]]
from = "static"
to = "static"

[dev]
port = 8080
open = false
"#,
        )
        .unwrap();

        let build = config.build_config(None, None);

        assert_eq!(build.output_dir, PathBuf::from("public"));
        assert_eq!(config.output_dir(), PathBuf::from("public"));
        assert_eq!(build.data_dir, PathBuf::from("content/data"));
        assert_eq!(build.merge_policy, MergePolicy::Deep);
        assert_eq!(build.pages_dir, PathBuf::from("content/pages"));
        assert_eq!(build.partials_dir, PathBuf::from("src/partials"));
        assert_eq!(build.stylesheets, vec![PathBuf::from("build/theme.css")]);
        assert_eq!(build.assets, vec![AssetMapping::new("static", "static")]);
        assert!(!build.minify);
        assert_eq!(config.dev.port, 8080);
        assert!(!config.dev.open);
    }

    #[test]
    fn source_root_moves_default_locations() {
        let config = ConfigFile::parse("[site]\nsrc = \"source\"\n").unwrap();
        let build = config.build_config(None, None);

        assert_eq!(build.data_dir, PathBuf::from("source/data"));
        assert_eq!(build.pages_dir, PathBuf::from("source/html"));
        assert_eq!(build.partials_dir, PathBuf::from("source/partials"));
        assert_eq!(
            build.assets[0],
            AssetMapping::new("source/assets/fonts", "assets/fonts")
        );
    }

    #[test]
    fn explicit_locations_ignore_source_root() {
        let config = ConfigFile::parse(
            "[site]\nsrc = \"source\"\n[data]\ndir = \"data\"\n[templates]\npartials = \"shared\"\n",
        )
        .unwrap();
        let build = config.build_config(None, None);

        assert_eq!(build.data_dir, PathBuf::from("data"));
        assert_eq!(build.pages_dir, PathBuf::from("source/html"));
        assert_eq!(build.partials_dir, PathBuf::from("shared"));
    }

    #[test]
    fn flags_override_file() {
        let config = ConfigFile::parse("[build]\nminify = true\n").unwrap();
        let build = config.build_config(Some(PathBuf::from("out")), Some(false));

        assert_eq!(build.output_dir, PathBuf::from("out"));
        assert!(!build.minify);
    }

    #[test]
    fn rejects_unknown_merge_policy() {
        assert!(ConfigFile::parse("[data]\nmerge = \"sideways\"\n").is_err());
    }

    #[test]
    fn missing_file_is_default() {
        let temp = tempfile::tempdir().unwrap();

        let config = ConfigFile::load(&temp.path().join(CONFIG_FILE)).unwrap();

        assert_eq!(config.site.output, "dist");
    }
}
