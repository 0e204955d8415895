use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,trailhead=debug"))
}

/// Logs go to `~/.local/state/trailhead/trailhead.log`, the terminal belongs
/// to the browser. When the file cannot be opened nothing is installed and
/// logging stays off.
pub fn init() -> Result<()> {
    let (file, path) = open_log(&config::state_dir()?)?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    tracing::info!("Logging to {}", path.display());
    Ok(())
}

fn open_log(dir: &Path) -> Result<(fs::File, PathBuf)> {
    fs::create_dir_all(dir)?;
    let path = dir.join("trailhead.log");
    let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}
