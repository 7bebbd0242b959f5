#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gyazodumper_nativehost::config::{ConfigError, Configuration};
use gyazodumper_nativehost::fetcher::FetchError;
use gyazodumper_nativehost::opener::OpenError;
use gyazodumper_nativehost::picker::PickError;
use gyazodumper_nativehost::{
    Collaborators, ConfigStore, FolderOpener, FolderPicker, ImageFetcher, MemoryConfigStore,
    Response,
};

pub fn frame(json: &str) -> Vec<u8> {
    let mut bytes = (json.len() as u32).to_le_bytes().to_vec();
    bytes.extend_from_slice(json.as_bytes());
    bytes
}

pub fn frames(messages: &[&str]) -> Vec<u8> {
    messages.iter().flat_map(|m| frame(m)).collect()
}

/// Splits the host's output back into responses.
pub fn responses(mut output: &[u8]) -> Vec<Response> {
    let mut parsed = Vec::new();
    while output.len() >= 4 {
        let len = u32::from_le_bytes([output[0], output[1], output[2], output[3]]) as usize;
        let payload = &output[4..4 + len];
        parsed.push(serde_json::from_slice(payload).expect("response should be JSON"));
        output = &output[4 + len..];
    }
    assert!(output.is_empty(), "trailing bytes after last frame");
    parsed
}

pub fn config_in(dir: &Path) -> Configuration {
    Configuration {
        save_directory: dir.to_string_lossy().into_owned(),
        file_name_pattern: "Gyazo_{timestamp}_{hash}{ext}".to_string(),
    }
}

#[derive(Clone, Default)]
pub struct RecordingFetcher {
    pub calls: Arc<Mutex<Vec<(String, String)>>>,
    pub fail_with_status: Option<u16>,
}

impl ImageFetcher for RecordingFetcher {
    fn download(
        &self,
        url: &str,
        id: &str,
        config: &Configuration,
    ) -> Result<PathBuf, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), id.to_string()));
        if let Some(code) = self.fail_with_status {
            let status = reqwest::StatusCode::from_u16(code).unwrap();
            return Err(FetchError::Status(status));
        }
        Ok(Path::new(&config.save_directory).join(format!("{id}.png")))
    }
}

#[derive(Clone, Default)]
pub struct ScriptedPicker {
    pub choice: Option<PathBuf>,
    pub calls: Arc<AtomicUsize>,
    pub last_initial: Arc<Mutex<Option<PathBuf>>>,
}

impl FolderPicker for ScriptedPicker {
    fn pick(&self, initial: Option<&Path>) -> Result<Option<PathBuf>, PickError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_initial.lock().unwrap() = initial.map(Path::to_path_buf);
        Ok(self.choice.clone())
    }
}

/// A picker whose dialog never comes up.
#[derive(Clone, Default)]
pub struct FailingPicker {
    pub calls: Arc<AtomicUsize>,
}

impl FolderPicker for FailingPicker {
    fn pick(&self, _initial: Option<&Path>) -> Result<Option<PathBuf>, PickError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PickError::Crashed)
    }
}

/// Loads from memory but refuses every save, like a read-only disk.
#[derive(Clone)]
pub struct ReadOnlyStore {
    pub inner: MemoryConfigStore,
    pub attempts: Arc<AtomicUsize>,
}

impl ReadOnlyStore {
    pub fn new(config: Configuration) -> Self {
        Self {
            inner: MemoryConfigStore::new(config),
            attempts: Arc::default(),
        }
    }
}

impl ConfigStore for ReadOnlyStore {
    fn load(&self) -> Configuration {
        self.inner.load()
    }

    fn save(&self, _config: &Configuration) -> Result<(), ConfigError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ConfigError::Io(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "read-only file system",
        )))
    }
}

#[derive(Clone, Default)]
pub struct RecordingOpener {
    pub opened: Arc<Mutex<Vec<PathBuf>>>,
}

impl FolderOpener for RecordingOpener {
    fn open(&self, path: &Path) -> Result<(), OpenError> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// Fakes plus handles for inspecting them after the session has run.
pub struct Fakes {
    pub store: MemoryConfigStore,
    pub fetcher: RecordingFetcher,
    pub picker: ScriptedPicker,
    pub opener: RecordingOpener,
}

impl Fakes {
    pub fn new(config: Configuration) -> Self {
        Self {
            store: MemoryConfigStore::new(config),
            fetcher: RecordingFetcher::default(),
            picker: ScriptedPicker::default(),
            opener: RecordingOpener::default(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            store: Box::new(self.store.clone()),
            fetcher: Box::new(self.fetcher.clone()),
            picker: Box::new(self.picker.clone()),
            opener: Box::new(self.opener.clone()),
        }
    }
}
