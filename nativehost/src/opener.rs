use std::io;
use std::path::Path;
use std::process::Command;
use std::thread;
use thiserror::Error;

#[cfg(target_os = "windows")]
const FILE_BROWSER: &str = "explorer";

#[cfg(target_os = "macos")]
const FILE_BROWSER: &str = "open";

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const FILE_BROWSER: &str = "xdg-open";

#[derive(Error, Debug)]
pub enum OpenError {
    #[error("could not launch file browser: {0}")]
    Launch(#[from] io::Error),
}

pub trait FolderOpener {
    fn open(&self, path: &Path) -> Result<(), OpenError>;
}

/// Shows a folder in the platform file browser.
pub struct SystemFolderOpener;

impl FolderOpener for SystemFolderOpener {
    fn open(&self, path: &Path) -> Result<(), OpenError> {
        let mut child = Command::new(FILE_BROWSER).arg(path).spawn()?;
        // Reap in the background; the browser window outlives the request.
        thread::spawn(move || {
            if let Err(e) = child.wait() {
                log::warn!("{} did not exit cleanly: {}", FILE_BROWSER, e);
            }
        });
        Ok(())
    }
}
