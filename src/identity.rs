use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

/// Whose profile gets loaded. There is no authentication, a name only picks
/// a profile file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User(String),
}

impl Identity {
    pub fn from_name(name: Option<&str>) -> Result<Self> {
        let Some(name) = name else {
            return Ok(Self::Anonymous);
        };
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            bail!("Invalid user name {name:?}, use letters, digits, '_' or '-'");
        }
        Ok(Self::User(name.to_string()))
    }

    pub fn is_identified(&self) -> bool {
        matches!(self, Self::User(_))
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::User(name) => Some(name),
        }
    }

    pub fn profile_path(&self, data_dir: &Path) -> PathBuf {
        match self {
            Self::Anonymous => data_dir.join("anonymous.toml"),
            Self::User(name) => data_dir.join("users").join(format!("{name}.toml")),
        }
    }
}
