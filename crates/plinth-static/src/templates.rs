//! Template engine for rendering pages against the build context.

use std::fs;
use std::path::{Path, PathBuf};

use minijinja::{Environment, ErrorKind};
use serde::Serialize;
use walkdir::WalkDir;

use plinth_data::MergedContext;
use plinth_helpers::HelperVocabulary;

/// File extensions loaded as partials.
pub const PARTIAL_EXTENSIONS: &[&str] = &["html", "svg"];

/// Per-page values exposed to templates as `page`.
#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    /// Output path relative to the output root
    pub path: String,
    /// File stem, e.g. `about` for `about.html`
    pub name: String,
    /// Directories between the output root and the page
    pub depth: usize,
}

/// What a page template sees: every context key, plus `page`.
///
/// `page` shadows a data key of the same name.
#[derive(Serialize)]
struct RenderContext<'a> {
    #[serde(flatten)]
    data: &'a MergedContext,
    page: &'a PageMeta,
}

/// Errors that can occur while loading or rendering templates.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to read template {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Template syntax error in {path}: {message}")]
    Syntax { path: PathBuf, message: String },

    #[error("Failed to render {path}: {message}")]
    Render { path: PathBuf, message: String },
}

impl TemplateError {
    fn from_minijinja(path: &Path, err: minijinja::Error) -> Self {
        let path = path.to_path_buf();
        let message = err.to_string();

        match err.kind() {
            ErrorKind::SyntaxError => Self::Syntax { path, message },
            _ => Self::Render { path, message },
        }
    }
}

/// Template engine using minijinja.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create an engine with the given helpers installed.
    pub fn new(vocabulary: &HelperVocabulary) -> Self {
        let mut env = Environment::new();
        vocabulary.install(&mut env);

        Self { env }
    }

    /// Register a partial under `name`, e.g. `nav/header.html`.
    pub fn add_partial(&mut self, name: &str, source: &str) -> Result<(), TemplateError> {
        self.env
            .add_template_owned(name.to_string(), source.to_string())
            .map_err(|e| TemplateError::from_minijinja(Path::new(name), e))
    }

    /// Load every `.html` and `.svg` file below `dir` as a partial named by
    /// its `/`-separated path relative to `dir`.
    ///
    /// A missing directory loads nothing.
    pub fn load_partials(&mut self, dir: &Path) -> Result<usize, TemplateError> {
        if !dir.exists() {
            tracing::debug!("No partials directory at {}", dir.display());
            return Ok(0);
        }

        let mut count = 0;

        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| TemplateError::Read {
                path: e.path().unwrap_or(dir).to_path_buf(),
                message: e.to_string(),
            })?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !PARTIAL_EXTENSIONS.contains(&ext) {
                continue;
            }

            let source = fs::read_to_string(path).map_err(|e| TemplateError::Read {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

            let name = template_name(path.strip_prefix(dir).unwrap_or(path));

            self.env
                .add_template_owned(name, source)
                .map_err(|e| TemplateError::from_minijinja(path, e))?;
            count += 1;
        }

        tracing::debug!("Loaded {} partials from {}", count, dir.display());

        Ok(count)
    }

    /// Render a page template against the shared context.
    ///
    /// `source_path` is used for error reporting only; the template is
    /// registered under `page.path` so auto-escaping follows its extension.
    pub fn render_page(
        &self,
        source_path: &Path,
        source: &str,
        context: &MergedContext,
        page: &PageMeta,
    ) -> Result<String, TemplateError> {
        let ctx = RenderContext {
            data: context,
            page,
        };

        self.env
            .render_named_str(&page.path, source, ctx)
            .map_err(|e| TemplateError::from_minijinja(source_path, e))
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new(&HelperVocabulary::standard())
    }
}

/// `/`-separated template name for a relative path.
pub fn template_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
