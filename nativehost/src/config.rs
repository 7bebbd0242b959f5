use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::paths;

pub const DEFAULT_FILE_NAME_PATTERN: &str = "Gyazo_{timestamp}_{hash}{ext}";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default)]
    pub save_directory: String,
    /// Supports the `{hash}`, `{timestamp}` and `{ext}` placeholders.
    #[serde(default)]
    pub file_name_pattern: String,
}

impl Configuration {
    pub fn defaults() -> Self {
        Self {
            save_directory: paths::default_save_dir().to_string_lossy().into_owned(),
            file_name_pattern: DEFAULT_FILE_NAME_PATTERN.to_string(),
        }
    }

    /// Fills empty fields from `defaults`. Returns true if anything changed.
    pub fn fill_missing(&mut self, defaults: &Configuration) -> bool {
        let mut changed = false;
        if self.save_directory.trim().is_empty() {
            self.save_directory = defaults.save_directory.clone();
            changed = true;
        }
        if self.file_name_pattern.trim().is_empty() {
            self.file_name_pattern = defaults.file_name_pattern.clone();
            changed = true;
        }
        changed
    }
}

/// Durable home of the host configuration.
///
/// `load` never fails: anything missing or unreadable is replaced by
/// defaults. `save` must have reached the store when it returns.
pub trait ConfigStore {
    fn load(&self) -> Configuration;
    fn save(&self, config: &Configuration) -> Result<(), ConfigError>;
}

/// JSON file store, `config.json` in the application directory by default.
pub struct FileConfigStore {
    path: PathBuf,
    defaults: Configuration,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_defaults(path, Configuration::defaults())
    }

    pub fn with_defaults(path: impl Into<PathBuf>, defaults: Configuration) -> Self {
        Self {
            path: path.into(),
            defaults,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Option<Configuration> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("Could not read config {:?}: {}", self.path, e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Ignoring invalid config {:?}: {}", self.path, e);
                None
            }
        }
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Configuration {
        let (config, needs_write) = match self.read() {
            Some(mut config) => {
                let changed = config.fill_missing(&self.defaults);
                (config, changed)
            }
            None => (self.defaults.clone(), true),
        };

        if needs_write {
            if let Err(e) = self.save(&config) {
                log::warn!("Could not write default config {:?}: {}", self.path, e);
            }
        }
        config
    }

    fn save(&self, config: &Configuration) -> Result<(), ConfigError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let content = serde_json::to_string_pretty(config)?;

        // Each save gets its own temp file, so concurrent host processes
        // never share one and readers only ever see a whole file.
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// In-process store. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemoryConfigStore {
    inner: Arc<Mutex<MemorySlot>>,
}

#[derive(Default)]
struct MemorySlot {
    config: Option<Configuration>,
    saves: usize,
}

impl MemoryConfigStore {
    pub fn new(config: Configuration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemorySlot {
                config: Some(config),
                saves: 0,
            })),
        }
    }

    pub fn snapshot(&self) -> Option<Configuration> {
        self.slot().config.clone()
    }

    pub fn save_count(&self) -> usize {
        self.slot().saves
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, MemorySlot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Configuration {
        let mut slot = self.slot();
        let config = slot.config.get_or_insert_with(Configuration::defaults);
        config.fill_missing(&Configuration::defaults());
        config.clone()
    }

    fn save(&self, config: &Configuration) -> Result<(), ConfigError> {
        let mut slot = self.slot();
        slot.config = Some(config.clone());
        slot.saves += 1;
        Ok(())
    }
}
