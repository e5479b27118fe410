//! Development server command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use plinth_server::{DevServer, DevServerConfig};
use plinth_static::BuildConfig;

use crate::config::ConfigFile;

/// Run the dev server.
///
/// The configuration is read once; edits to it need a restart.
pub async fn run(config_path: &Path, port: Option<u16>, open: bool) -> Result<()> {
    let file_config = ConfigFile::load(config_path)?;
    let port = port.unwrap_or(file_config.dev.port);

    tracing::info!("Starting development server on port {}", port);

    let build = file_config.build_config(None, Some(false));
    let watch = watch_roots(Path::new(&file_config.site.src), &build);

    let config = DevServerConfig {
        build,
        watch,
        port,
        open: open && file_config.dev.open,
        ..Default::default()
    };

    DevServer::new(config).start().await?;

    Ok(())
}

/// The source root plus every build input that lives outside it.
fn watch_roots(src: &Path, build: &BuildConfig) -> Vec<PathBuf> {
    let inputs = [&build.data_dir, &build.pages_dir, &build.partials_dir]
        .into_iter()
        .chain(build.assets.iter().map(|a| &a.from))
        .chain(build.stylesheets.iter());

    let mut roots = vec![src.to_path_buf()];
    for input in inputs {
        if !roots.iter().any(|root| input.starts_with(root)) {
            roots.push(input.clone());
        }
    }

    roots
}
