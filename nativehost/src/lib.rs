pub mod config;
pub mod error;
pub mod fetcher;
pub mod install;
pub mod logging;
pub mod message;
pub mod opener;
pub mod paths;
pub mod picker;
pub mod session;
pub mod transport;

pub use config::{ConfigStore, Configuration, FileConfigStore, MemoryConfigStore};
pub use error::HostError;
pub use fetcher::{HttpImageFetcher, ImageFetcher};
pub use message::{Action, Request, Response};
pub use opener::{FolderOpener, SystemFolderOpener};
pub use picker::{DialogFolderPicker, FolderPicker};
pub use session::{Collaborators, Session, SessionEnd, SessionState};
pub use transport::{FramedTransport, MAX_FRAME_LEN};

/// True when the arguments look like a browser launched us: Chromium passes
/// the caller origin and, on Windows, `--parent-window=<hwnd>`.
pub fn is_browser_launch(args: &[String]) -> bool {
    args.iter()
        .any(|arg| arg.starts_with("chrome-extension://") || arg.starts_with("--parent-window="))
}
