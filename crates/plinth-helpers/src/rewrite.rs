//! Web-root placeholder rewriting.
//!
//! Templates emit a placeholder wherever they need the site root. Once the
//! final output location of a page is known, the placeholder is replaced by a
//! relative prefix (`.`, `..`, `../..`, ...) so the page works from any mount
//! point, including `file://`.

/// Token emitted by the `webRoot` helper.
pub const PLACEHOLDER: &str = "{{webRoot}}";

/// Separator between the output root and the page path in a marked path,
/// e.g. `dist//blog/post.html`.
pub const ROOT_MARKER: &str = "//";

/// Errors raised when an output path cannot be split into segments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathFormatError {
    #[error("Output path is empty")]
    Empty,

    #[error("Output path has no file name: {0}")]
    MissingFileName(String),

    #[error("Output path contains an empty segment: {0}")]
    EmptySegment(String),

    #[error("Output path escapes the output root: {0}")]
    EscapesRoot(String),

    #[error("Output path must be relative to the output root: {0}")]
    Absolute(String),
}

/// Number of directories between the output root and the page's directory.
///
/// Anything up to and including the last [`ROOT_MARKER`] is treated as the
/// output root and discarded. Both `/` and `\` separate segments; `.`
/// segments are ignored.
pub fn page_depth(output_path: &str) -> Result<usize, PathFormatError> {
    let relative = match output_path.rfind(ROOT_MARKER) {
        Some(pos) => &output_path[pos + ROOT_MARKER.len()..],
        None => output_path,
    };

    if relative.is_empty() {
        return Err(PathFormatError::Empty);
    }

    let normalized = relative.replace('\\', "/");

    if normalized.starts_with('/') {
        return Err(PathFormatError::Absolute(output_path.to_string()));
    }
    if normalized.ends_with('/') {
        return Err(PathFormatError::MissingFileName(output_path.to_string()));
    }

    let mut segments = 0usize;
    for segment in normalized.split('/') {
        match segment {
            "" => return Err(PathFormatError::EmptySegment(output_path.to_string())),
            "." => {}
            ".." => return Err(PathFormatError::EscapesRoot(output_path.to_string())),
            _ => segments += 1,
        }
    }

    // `./` alone leaves nothing to name the page
    if segments == 0 {
        return Err(PathFormatError::MissingFileName(output_path.to_string()));
    }

    Ok(segments - 1)
}

/// Relative reference to the output root from a directory `depth` levels
/// below it. Never empty: depth 0 is `"."`.
pub fn relative_root(depth: usize) -> String {
    if depth == 0 {
        return ".".to_string();
    }

    vec![".."; depth].join("/")
}

/// A rendered page waiting for placeholder substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Path relative to the output root, `/` separated
    pub output_path: String,

    /// Rendered text
    pub body: String,
}

impl Page {
    pub fn new(output_path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            output_path: output_path.into(),
            body: body.into(),
        }
    }
}

/// Replaces web-root placeholders with depth-relative prefixes.
#[derive(Debug, Clone)]
pub struct PathRewriter {
    placeholder: String,
}

impl PathRewriter {
    /// Rewriter for a custom placeholder token.
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
        }
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Substitute every placeholder in `body` for a page at `output_path`.
    ///
    /// The path is validated even when the body holds no placeholder.
    pub fn rewrite(&self, output_path: &str, body: &str) -> Result<String, PathFormatError> {
        let depth = page_depth(output_path)?;

        if self.placeholder.is_empty() || !body.contains(&self.placeholder) {
            return Ok(body.to_string());
        }

        Ok(body.replace(&self.placeholder, &relative_root(depth)))
    }

    /// Rewrite a page in place of its body.
    pub fn rewrite_page(&self, page: Page) -> Result<Page, PathFormatError> {
        let body = self.rewrite(&page.output_path, &page.body)?;
        Ok(Page { body, ..page })
    }
}

impl Default for PathRewriter {
    fn default() -> Self {
        Self::new(PLACEHOLDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LINK: &str = "<a href='{{webRoot}}/css/a.css'>";

    #[test]
    fn root_page_uses_current_directory() {
        let out = PathRewriter::default().rewrite("index.html", LINK).unwrap();

        assert_eq!(out, "<a href='./css/a.css'>");
    }

    #[test]
    fn nested_page_climbs_each_level() {
        let out = PathRewriter::default()
            .rewrite("blog/2024/post.html", LINK)
            .unwrap();

        assert_eq!(out, "<a href='../../css/a.css'>");
    }

    #[test]
    fn replaces_every_occurrence() {
        let body = "{{webRoot}}/a.js {{webRoot}}/b.css";
        let out = PathRewriter::default().rewrite("docs/x.html", body).unwrap();

        assert_eq!(out, "../a.js ../b.css");
    }

    #[test]
    fn body_without_placeholder_is_unchanged() {
        let body = "<p>{{ not a placeholder }}</p>";
        let out = PathRewriter::default().rewrite("a/b/c.html", body).unwrap();

        assert_eq!(out, body);
    }

    #[test]
    fn strips_root_marker() {
        assert_eq!(page_depth("/srv/site/dist//index.html"), Ok(0));
        assert_eq!(page_depth("/srv/site/dist//about/team.html"), Ok(1));
        assert_eq!(page_depth("dist//a//b/c.html"), Ok(1));
    }

    #[test]
    fn accepts_backslashes_and_dot_segments() {
        assert_eq!(page_depth("blog\\post.html"), Ok(1));
        assert_eq!(page_depth("./blog/./post.html"), Ok(1));
    }

    #[test]
    fn rejects_malformed_paths() {
        assert_eq!(page_depth(""), Err(PathFormatError::Empty));
        assert_eq!(page_depth("dist//"), Err(PathFormatError::Empty));
        assert!(matches!(
            page_depth("blog/"),
            Err(PathFormatError::MissingFileName(_))
        ));
        assert!(matches!(
            page_depth("../up.html"),
            Err(PathFormatError::EscapesRoot(_))
        ));
        assert!(matches!(page_depth("/abs.html"), Err(PathFormatError::Absolute(_))));
        assert!(matches!(
            page_depth("./"),
            Err(PathFormatError::MissingFileName(_))
        ));
    }

    #[test]
    fn relative_root_is_never_empty() {
        assert_eq!(relative_root(0), ".");
        assert_eq!(relative_root(1), "..");
        assert_eq!(relative_root(3), "../../..");
    }

    #[test]
    fn rewrites_pages() {
        let page = Page::new("a/index.html", LINK);
        let rewritten = PathRewriter::default().rewrite_page(page).unwrap();

        assert_eq!(rewritten.output_path, "a/index.html");
        assert_eq!(rewritten.body, "<a href='../css/a.css'>");
    }

    #[test]
    fn malformed_path_fails_even_without_placeholder() {
        let result = PathRewriter::default().rewrite("../x.html", "plain");

        assert!(result.is_err());
    }

    #[test]
    fn supports_custom_tokens() {
        let rewriter = PathRewriter::new("@root@");
        let out = rewriter.rewrite("a/b.html", "@root@/img.png").unwrap();

        assert_eq!(out, "../img.png");
    }
}
