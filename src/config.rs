use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::client::FetchOptions;

const APP_NAME: &str = "trailhead";

/// Settings read from `~/.config/trailhead/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Home page for profiles that never set one.
    pub home_page: String,
    pub timeout_secs: u64,
    /// Bytes kept from a response body, the rest is dropped.
    pub max_body_bytes: usize,
    pub user_agent: String,
    /// Accept self-signed and otherwise invalid certificates.
    pub accept_invalid_certs: bool,
    /// Where profiles are kept. Defaults to `~/.local/share/trailhead`.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let fetch = FetchOptions::default();
        Self {
            home_page: "https://example.com".into(),
            timeout_secs: fetch.timeout.as_secs(),
            max_body_bytes: fetch.max_body_bytes,
            user_agent: fetch.user_agent,
            accept_invalid_certs: fetch.accept_invalid_certs,
            data_dir: None,
        }
    }
}

impl Config {
    /// Reads `path`, or the default location when none is given. The default
    /// file is created on first run, an explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => Self::load_or_init(&default_path()?),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))
    }

    fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::read(path);
        }
        let config = Self::default();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(&config)?)?;
        tracing::info!("Created default config at {}", path.display());
        Ok(config)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            max_body_bytes: self.max_body_bytes,
            user_agent: self.user_agent.clone(),
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let dirs = xdg::BaseDirectories::with_prefix(APP_NAME)?;
        Ok(dirs.get_data_home())
    }
}

fn default_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix(APP_NAME)?;
    Ok(dirs.get_config_home().join("config.toml"))
}

pub fn state_dir() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix(APP_NAME)?;
    Ok(dirs.get_state_home())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("config.toml");
        let config = Config::load_or_init(&path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(Config::read(&path).unwrap(), config);
    }

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "home_page = \"https://home.example\"\ntimeout_secs = 3\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.home_page, "https://home.example");
        assert_eq!(config.fetch_options().timeout, Duration::from_secs(3));
        assert_eq!(config.max_body_bytes, 8 * 1024 * 1024);
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn configured_data_dir_wins() {
        let config = Config {
            data_dir: Some(PathBuf::from("/srv/trailhead")),
            ..Config::default()
        };
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/srv/trailhead"));
    }
}
