//! Static site builder.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;

use rayon::prelude::*;
use regex::Regex;
use walkdir::WalkDir;

use plinth_data::{ContextAggregator, DataError, MergePolicy, MergedContext, DEFAULT_PATTERN};
use plinth_helpers::{page_depth, HelperVocabulary, PathFormatError, PathRewriter};

use crate::assets::{default_assets, AssetError, AssetMapping, AssetPipeline, CopyOutcome};
use crate::templates::{template_name, PageMeta, TemplateEngine, TemplateError};

/// Configuration for building a static site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory holding data fragments
    pub data_dir: PathBuf,

    /// Glob selecting data fragments, relative to `data_dir`
    pub data_pattern: String,

    /// How colliding data keys are merged
    pub merge_policy: MergePolicy,

    /// Page templates; every `.html` file below becomes one output page
    pub pages_dir: PathBuf,

    /// Partials available to `include` and `extends`
    pub partials_dir: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Asset trees copied into the output directory
    pub assets: Vec<AssetMapping>,

    /// Pre-compiled stylesheets written to `assets/css`
    pub stylesheets: Vec<PathBuf>,

    /// Minify stylesheets
    pub minify: bool,

    /// Markup inserted before `</body>` of every page (dev server reload hook)
    pub inject: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("src/data"),
            data_pattern: DEFAULT_PATTERN.to_string(),
            merge_policy: MergePolicy::Shallow,
            pages_dir: PathBuf::from("src/html"),
            partials_dir: PathBuf::from("src/partials"),
            output_dir: PathBuf::from("dist"),
            assets: default_assets(Path::new("src")),
            stylesheets: vec![],
            minify: true,
            inject: None,
        }
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of pages generated
    pub pages: usize,

    /// Number of asset files copied
    pub assets: usize,

    /// Asset directories that did not exist
    pub skipped_assets: Vec<PathBuf>,

    /// Number of stylesheets written
    pub stylesheets: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Invalid output path for {page}: {source}")]
    PathFormat {
        page: String,
        #[source]
        source: PathFormatError,
    },

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("Failed to read pages: {0}")]
    ReadError(String),

    #[error("Failed to write output: {0}")]
    WriteError(String),
}

/// A page template found on disk.
#[derive(Debug)]
struct PageSource {
    /// Source file path
    source_path: PathBuf,

    /// Output path relative to the output root, `/` separated
    relative: String,

    /// Template source
    source: String,
}

/// A page rendered and rewritten, ready to write.
#[derive(Debug)]
struct RenderedPage {
    /// Path relative to the output root
    relative: String,
    html: String,
}

/// Static site builder.
pub struct StaticBuilder {
    config: BuildConfig,
    rewriter: PathRewriter,
    vocabulary: HelperVocabulary,
}

impl StaticBuilder {
    /// Create a new static builder.
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            rewriter: PathRewriter::default(),
            vocabulary: HelperVocabulary::standard(),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the static site.
    ///
    /// Everything is written into a staging directory next to the output
    /// directory, which replaces the output only once every step succeeded.
    /// A failing build leaves the previous output untouched.
    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        // Shared, read-only context for every page
        let context = ContextAggregator::new(&self.config.data_dir, &self.config.data_pattern)?
            .with_policy(self.config.merge_policy)
            .aggregate()?;

        let mut templates = TemplateEngine::new(&self.vocabulary);
        let partials = templates.load_partials(&self.config.partials_dir)?;
        tracing::info!("Loaded {} partials", partials);

        let pages = self.discover_pages()?;

        let rendered: Vec<RenderedPage> = pages
            .par_iter()
            .map(|page| self.render_page(&templates, &context, page))
            .collect::<Result<_, _>>()?;

        let staging = staging_dir(&self.config.output_dir)?;
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| {
                BuildError::WriteError(format!("{}: {}", staging.display(), e))
            })?;
        }

        let (assets, skipped_assets, stylesheets) = match self.write_output(&staging, &rendered)
        {
            Ok(counts) => counts,
            Err(err) => {
                if let Err(e) = fs::remove_dir_all(&staging) {
                    tracing::warn!("Failed to remove {}: {}", staging.display(), e);
                }
                return Err(err);
            }
        };

        publish(&staging, &self.config.output_dir)?;

        let duration = start.elapsed();

        Ok(BuildResult {
            pages: rendered.len(),
            assets,
            skipped_assets,
            stylesheets,
            duration_ms: duration.as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        })
    }

    /// Write pages, assets and stylesheets below `root`.
    fn write_output(
        &self,
        root: &Path,
        rendered: &[RenderedPage],
    ) -> Result<(usize, Vec<PathBuf>, usize), BuildError> {
        fs::create_dir_all(root).map_err(|e| BuildError::WriteError(e.to_string()))?;

        for page in rendered {
            let target = root.join(&page.relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(e.to_string()))?;
            }
            fs::write(&target, &page.html).map_err(|e| {
                BuildError::WriteError(format!("{}: {}", target.display(), e))
            })?;
        }

        let (assets, skipped_assets) = self.copy_assets(root)?;
        let stylesheets = self.write_stylesheets(root)?;

        Ok((assets, skipped_assets, stylesheets))
    }

    /// Discover all page templates in the pages directory.
    fn discover_pages(&self) -> Result<Vec<PageSource>, BuildError> {
        let mut pages = Vec::new();

        if !self.config.pages_dir.exists() {
            return Err(BuildError::ReadError(format!(
                "Pages directory not found: {}",
                self.config.pages_dir.display()
            )));
        }

        for entry in WalkDir::new(&self.config.pages_dir)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| BuildError::ReadError(e.to_string()))?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if ext != "html" {
                continue;
            }

            let source = fs::read_to_string(path)
                .map_err(|e| BuildError::ReadError(format!("{}: {}", path.display(), e)))?;

            let relative = template_name(
                path.strip_prefix(&self.config.pages_dir).unwrap_or(path),
            );

            pages.push(PageSource {
                source_path: path.to_path_buf(),
                relative,
                source,
            });
        }

        tracing::debug!("Discovered {} pages", pages.len());

        Ok(pages)
    }

    /// Render one page and resolve its web-root placeholders.
    fn render_page(
        &self,
        templates: &TemplateEngine,
        context: &MergedContext,
        page: &PageSource,
    ) -> Result<RenderedPage, BuildError> {
        let path_error = |source| BuildError::PathFormat {
            page: page.relative.clone(),
            source,
        };

        let depth = page_depth(&page.relative).map_err(path_error)?;

        let meta = PageMeta {
            path: page.relative.clone(),
            name: Path::new(&page.relative)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("index")
                .to_string(),
            depth,
        };

        let html = templates.render_page(&page.source_path, &page.source, context, &meta)?;
        let html = self
            .rewriter
            .rewrite(&page.relative, &html)
            .map_err(path_error)?;

        let html = match &self.config.inject {
            Some(snippet) => inject_before_body_end(&html, snippet),
            None => html,
        };

        tracing::debug!("Rendered {}", page.relative);

        Ok(RenderedPage {
            relative: page.relative.clone(),
            html,
        })
    }

    /// Copy configured asset trees. Missing sources are reported, not fatal.
    fn copy_assets(&self, root: &Path) -> Result<(usize, Vec<PathBuf>), BuildError> {
        let mut copied = 0;
        let mut skipped = Vec::new();

        for mapping in &self.config.assets {
            let target = root.join(&mapping.to);

            match AssetPipeline::copy_tree(&mapping.from, &target)? {
                CopyOutcome::Copied(count) => copied += count,
                CopyOutcome::Missing => skipped.push(mapping.from.clone()),
            }
        }

        Ok((copied, skipped))
    }

    /// Write configured stylesheets into `assets/css`.
    fn write_stylesheets(&self, root: &Path) -> Result<usize, BuildError> {
        let css_dir = root.join("assets").join("css");
        let mut written = 0;

        for source in &self.config.stylesheets {
            if !source.exists() {
                tracing::warn!("Stylesheet not found: {}", source.display());
                continue;
            }

            let target = AssetPipeline::bundle_stylesheet(source, &css_dir, self.config.minify)?;
            tracing::info!("Wrote stylesheet {}", target.display());
            written += 1;
        }

        Ok(written)
    }
}

/// Sibling of `output_dir` that a build is written into before publishing.
fn staging_dir(output_dir: &Path) -> Result<PathBuf, BuildError> {
    let name = output_dir.file_name().ok_or_else(|| {
        BuildError::WriteError(format!(
            "Output directory has no name: {}",
            output_dir.display()
        ))
    })?;

    let mut staged = std::ffi::OsString::from(".");
    staged.push(name);
    staged.push(".staging");

    Ok(output_dir.with_file_name(staged))
}

/// Replace `output_dir` with the finished `staging` tree.
fn publish(staging: &Path, output_dir: &Path) -> Result<(), BuildError> {
    if output_dir.exists() {
        fs::remove_dir_all(output_dir).map_err(|e| {
            BuildError::WriteError(format!("{}: {}", output_dir.display(), e))
        })?;
    }

    fs::rename(staging, output_dir).map_err(|e| {
        BuildError::WriteError(format!(
            "{} -> {}: {}",
            staging.display(),
            output_dir.display(),
            e
        ))
    })
}

/// Insert `snippet` before the closing body tag, or append it when the page
/// has none.
fn inject_before_body_end(html: &str, snippet: &str) -> String {
    static BODY_END: OnceLock<Regex> = OnceLock::new();
    let re = BODY_END.get_or_init(|| Regex::new(r"(?i)</body\s*>").expect("valid regex"));

    match re.find_iter(html).last() {
        Some(m) => {
            let mut out = String::with_capacity(html.len() + snippet.len());
            out.push_str(&html[..m.start()]);
            out.push_str(snippet);
            out.push_str(&html[m.start()..]);
            out
        }
        None => format!("{html}{snippet}"),
    }
}
