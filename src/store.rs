use std::{
    collections::BTreeMap,
    fs, io,
    path::PathBuf,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bookmark name to URL.
pub type Bookmarks = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not read profile {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("could not encode profile: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Where a session keeps its home page, bookmarks and history between runs.
pub trait Store {
    fn load_home(&self) -> Result<String, StoreError>;
    fn save_home(&mut self, url: &str) -> Result<(), StoreError>;
    fn load_bookmarks(&self) -> Result<Bookmarks, StoreError>;
    fn save_bookmarks(&mut self, bookmarks: &Bookmarks) -> Result<(), StoreError>;
    fn load_history(&self) -> Result<Vec<String>, StoreError>;
    fn save_history(&mut self, history: &[String]) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Profile {
    home: Option<String>,
    history: Vec<String>,
    bookmarks: Bookmarks,
}

/// One TOML file per profile. A missing file reads as an empty profile.
pub struct FileStore {
    path: PathBuf,
    default_home: String,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, default_home: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default_home: default_home.into(),
        }
    }

    fn read(&self) -> Result<Profile, StoreError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Profile::default()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        toml::from_str(&data).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn update(&mut self, change: impl FnOnce(&mut Profile)) -> Result<(), StoreError> {
        let mut profile = match self.read() {
            Ok(profile) => profile,
            Err(StoreError::Parse { path, source }) => {
                tracing::warn!("Overwriting unreadable profile {}: {source}", path.display());
                Profile::default()
            }
            Err(err) => return Err(err),
        };
        change(&mut profile);
        let data = toml::to_string_pretty(&profile)?;
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, data).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl Store for FileStore {
    fn load_home(&self) -> Result<String, StoreError> {
        Ok(self
            .read()?
            .home
            .unwrap_or_else(|| self.default_home.clone()))
    }

    fn save_home(&mut self, url: &str) -> Result<(), StoreError> {
        let url = url.trim().to_string();
        self.update(|profile| profile.home = Some(url))
    }

    fn load_bookmarks(&self) -> Result<Bookmarks, StoreError> {
        Ok(self.read()?.bookmarks)
    }

    fn save_bookmarks(&mut self, bookmarks: &Bookmarks) -> Result<(), StoreError> {
        self.update(|profile| profile.bookmarks = bookmarks.clone())
    }

    fn load_history(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read()?.history)
    }

    fn save_history(&mut self, history: &[String]) -> Result<(), StoreError> {
        self.update(|profile| profile.history = history.to_vec())
    }
}

/// Keeps everything in memory. `failing` makes every call error out.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub home: String,
    pub bookmarks: Bookmarks,
    pub history: Vec<String>,
    pub failing: bool,
}

impl MemoryStore {
    fn check(&self) -> Result<(), StoreError> {
        if self.failing {
            return Err(StoreError::Unavailable("memory store set to fail".into()));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn load_home(&self) -> Result<String, StoreError> {
        self.check()?;
        Ok(self.home.clone())
    }

    fn save_home(&mut self, url: &str) -> Result<(), StoreError> {
        self.check()?;
        self.home = url.trim().to_string();
        Ok(())
    }

    fn load_bookmarks(&self) -> Result<Bookmarks, StoreError> {
        self.check()?;
        Ok(self.bookmarks.clone())
    }

    fn save_bookmarks(&mut self, bookmarks: &Bookmarks) -> Result<(), StoreError> {
        self.check()?;
        self.bookmarks = bookmarks.clone();
        Ok(())
    }

    fn load_history(&self) -> Result<Vec<String>, StoreError> {
        self.check()?;
        Ok(self.history.clone())
    }

    fn save_history(&mut self, history: &[String]) -> Result<(), StoreError> {
        self.check()?;
        self.history = history.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_empty_profile() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nobody.toml"), "https://start.example");
        assert_eq!(store.load_home().unwrap(), "https://start.example");
        assert!(store.load_bookmarks().unwrap().is_empty());
        assert!(store.load_history().unwrap().is_empty());
    }

    #[test]
    fn profile_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users").join("ada.toml");
        let mut store = FileStore::new(&path, "https://start.example");
        store.save_home("  https://home.example  ").unwrap();
        store
            .save_history(&["https://a.com".into(), "https://b.com".into(), "https://a.com".into()])
            .unwrap();
        let bookmarks = Bookmarks::from([
            ("news | daily".to_string(), "https://news.example".to_string()),
            ("docs".to_string(), "https://docs.rs".to_string()),
        ]);
        store.save_bookmarks(&bookmarks).unwrap();

        let reopened = FileStore::new(&path, "https://other.example");
        assert_eq!(reopened.load_home().unwrap(), "https://home.example");
        assert_eq!(
            reopened.load_history().unwrap(),
            vec!["https://a.com", "https://b.com", "https://a.com"]
        );
        assert_eq!(reopened.load_bookmarks().unwrap(), bookmarks);
    }

    #[test]
    fn blank_home_is_kept_blank() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("p.toml"), "https://start.example");
        store.save_home("").unwrap();
        assert_eq!(store.load_home().unwrap(), "");
    }

    #[test]
    fn unreadable_profile_is_reported_then_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "history = [unterminated").unwrap();
        let mut store = FileStore::new(&path, "https://start.example");
        assert!(matches!(store.load_history(), Err(StoreError::Parse { .. })));

        store.save_history(&["https://a.com".into()]).unwrap();
        assert_eq!(store.load_history().unwrap(), vec!["https://a.com"]);
    }

    #[test]
    fn failing_memory_store() {
        let mut store = MemoryStore {
            failing: true,
            ..MemoryStore::default()
        };
        assert!(store.load_home().is_err());
        assert!(matches!(
            store.save_history(&[]),
            Err(StoreError::Unavailable(_))
        ));
    }
}
