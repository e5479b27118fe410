//! Scaffold a new site.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::CONFIG_FILE;

/// Files written by `plinth init`, relative to the project root.
const SCAFFOLD: &[(&str, &str)] = &[
    (CONFIG_FILE, DEFAULT_CONFIG),
    ("src/data/site.json", DEFAULT_SITE_DATA),
    ("src/data/menu.json", DEFAULT_MENU_DATA),
    ("src/partials/header.html", DEFAULT_HEADER),
    ("src/partials/layout.html", DEFAULT_LAYOUT),
    ("src/html/index.html", DEFAULT_INDEX),
    ("src/html/about/index.html", DEFAULT_ABOUT),
];

/// Asset directories created empty.
const ASSET_DIRS: &[&str] = &[
    "src/assets/fonts",
    "src/assets/images",
    "src/assets/favicon",
    "src/assets/svgs",
    "src/assets/video",
];

/// Run the init command.
pub async fn run(yes: bool) -> Result<()> {
    tracing::info!("Initializing plinth site...");

    let written = scaffold(Path::new("."), yes)?;

    if written == 0 {
        tracing::warn!("Nothing written: files already exist. Use --yes to overwrite.");
        return Ok(());
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'plinth dev' to start the development server.");

    Ok(())
}

/// Write the scaffold below `root`. Existing files are kept unless
/// `overwrite` is set. Returns the number of files written.
fn scaffold(root: &Path, overwrite: bool) -> Result<usize> {
    let mut written = 0;

    for (relative, content) in SCAFFOLD {
        let path = root.join(relative);

        if path.exists() && !overwrite {
            tracing::debug!("Keeping existing {}", relative);
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", relative))?;
        tracing::info!("Created {}", relative);
        written += 1;
    }

    for dir in ASSET_DIRS {
        fs::create_dir_all(root.join(dir)).with_context(|| format!("Failed to create {}", dir))?;
    }

    Ok(written)
}

const DEFAULT_CONFIG: &str = r#"# Plinth Configuration

[site]
# Source tree watched by `plinth dev`
src = "src"

# Output directory for the built site
output = "dist"

[data]
# Every matching file is merged into the template context
dir = "src/data"
pattern = "**/*.json"

# "shallow": later files replace whole top-level keys
# "deep": nested mappings are merged key by key
merge = "shallow"

[templates]
pages = "src/html"
partials = "src/partials"

[build]
minify = true

# Pre-compiled stylesheets, written to assets/css/<name>.bundle.css
stylesheets = []

[dev]
port = 9000
open = true
"#;

const DEFAULT_SITE_DATA: &str = r#"{
  "site": {
    "title": "My Site",
    "lang": "en"
  }
}
"#;

const DEFAULT_MENU_DATA: &str = r#"{
  "menu": [
    { "label": "Home", "href": "/index.html" },
    { "label": "About", "href": "/about/index.html" }
  ]
}
"#;

const DEFAULT_HEADER: &str = r#"<header>
  <nav>
    {% for item in limit(menu, 5) %}
    <a class="{{ ifEquals(item.href, '/' ~ page.path, 'active', '') }}" href="{{ webRoot() }}{{ item.href }}">{{ item.label }}</a>
    {% endfor %}
  </nav>
</header>
"#;

const DEFAULT_LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="{{ site.lang }}">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{% block title %}{{ site.title }}{% endblock %}</title>
  <link rel="icon" href="{{ webRoot() }}/assets/favicon/favicon.ico">
</head>
<body>
  {% include "header.html" %}
  <main>
    {% block content %}{% endblock %}
  </main>
</body>
</html>
"#;

const DEFAULT_INDEX: &str = r#"{% extends "layout.html" %}
{% block content %}
<h1>Welcome to {{ site.title }}</h1>
<p>Edit <code>src/html/index.html</code> to get started.</p>
{% endblock %}
"#;

const DEFAULT_ABOUT: &str = r#"{% extends "layout.html" %}
{% block title %}About - {{ site.title }}{% endblock %}
{% block content %}
<h1>About</h1>
<p>This page lives one level deep; its links still resolve relative to the site root.</p>
{% endblock %}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_scaffold() {
        let temp = tempdir().unwrap();

        let written = scaffold(temp.path(), false).unwrap();

        assert_eq!(written, SCAFFOLD.len());
        assert!(temp.path().join("plinth.toml").exists());
        assert!(temp.path().join("src/html/about/index.html").exists());
        assert!(temp.path().join("src/assets/video").is_dir());
    }

    #[test]
    fn keeps_existing_files_without_overwrite() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("plinth.toml"), "# mine").unwrap();

        let written = scaffold(temp.path(), false).unwrap();

        assert_eq!(written, SCAFFOLD.len() - 1);
        assert_eq!(
            fs::read_to_string(temp.path().join("plinth.toml")).unwrap(),
            "# mine"
        );
    }

    #[test]
    fn scaffold_config_parses() {
        assert!(crate::config::ConfigFile::parse(DEFAULT_CONFIG).is_ok());
    }

    #[tokio::test]
    async fn scaffold_builds() {
        let temp = tempdir().unwrap();
        scaffold(temp.path(), false).unwrap();

        let root = temp.path();
        let config = plinth_static::BuildConfig {
            data_dir: root.join("src/data"),
            pages_dir: root.join("src/html"),
            partials_dir: root.join("src/partials"),
            output_dir: root.join("dist"),
            assets: vec![],
            ..Default::default()
        };
        let result = plinth_static::StaticBuilder::new(config).build().await.unwrap();

        assert_eq!(result.pages, 2);
        let about = fs::read_to_string(root.join("dist/about/index.html")).unwrap();
        assert!(about.contains("<title>About - My Site</title>"));
        assert!(about.contains(r#"href="../assets/favicon/favicon.ico""#));
        assert!(about.contains(r#"class="active""#));
        assert!(!about.contains("{{webRoot}}"));
    }
}
