//! Static site build command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use plinth_static::StaticBuilder;

use crate::config::ConfigFile;

/// Run the build command.
pub async fn run(config_path: &Path, output: Option<PathBuf>, minify: Option<bool>) -> Result<()> {
    tracing::info!("Building static site...");

    let file_config = ConfigFile::load(config_path)?;
    let config = file_config.build_config(output, minify);

    let result = StaticBuilder::new(config).build().await?;

    for dir in &result.skipped_assets {
        tracing::debug!("No assets at {}", dir.display());
    }

    tracing::info!(
        "Built {} pages, {} assets, {} stylesheets in {}ms",
        result.pages,
        result.assets,
        result.stylesheets,
        result.duration_ms
    );

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
