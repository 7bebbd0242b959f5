use rand::RngCore;
use reqwest::{StatusCode, Url};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::Configuration;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("GyazoDumper/", env!("CARGO_PKG_VERSION"));
const DEFAULT_EXTENSION: &str = ".png";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid image URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned status {0}")]
    Status(StatusCode),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub trait ImageFetcher {
    /// Downloads `url` into the configured save directory and returns the
    /// path of the written file.
    fn download(&self, url: &str, id: &str, config: &Configuration)
        -> Result<PathBuf, FetchError>;
}

pub struct HttpImageFetcher {
    client: reqwest::blocking::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn download(
        &self,
        url: &str,
        id: &str,
        config: &Configuration,
    ) -> Result<PathBuf, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut response = self.client.get(parsed.clone()).send()?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        let file_name = file_name_for(&config.file_name_pattern, &parsed, id, &timestamp);
        let save_dir = Path::new(&config.save_directory);
        fs::create_dir_all(save_dir)?;

        // The body lands under its final name only once it is complete.
        let mut partial = NamedTempFile::new_in(save_dir)?;
        let written = response.copy_to(&mut partial)?;
        let path = save_dir.join(file_name);
        partial.persist(&path).map_err(|e| e.error)?;
        log::info!("Wrote {} bytes to {}", written, path.display());
        Ok(path)
    }
}

/// Expands the file name pattern for one download.
pub fn file_name_for(pattern: &str, url: &Url, id: &str, timestamp: &str) -> String {
    pattern
        .replace("{hash}", &sanitize_id(id))
        .replace("{timestamp}", timestamp)
        .replace("{ext}", &extension_of(url))
}

/// Extension of the URL path including the dot, `.png` when there is none.
pub fn extension_of(url: &Url) -> String {
    Path::new(url.path())
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Id used when the request carries none: 32 lowercase hex characters.
pub fn fallback_resource_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

// Ids come from the page and must not steer the file out of the save directory.
fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
