//! The request loop: one frame in, one frame out, strictly in order.

use std::io::{Read, Write};
use std::path::Path;

use crate::config::{ConfigError, ConfigStore, Configuration};
use crate::fetcher::{self, ImageFetcher};
use crate::message::{self, Action, Request, Response};
use crate::opener::FolderOpener;
use crate::picker::FolderPicker;
use crate::transport::{FramedTransport, TransportError};

// Sent if a response cannot be serialized at all.
const ENCODE_FAILURE: &[u8] = br#"{"success":false,"error":"could not encode response"}"#;

/// Everything a session talks to besides the browser.
pub struct Collaborators {
    pub store: Box<dyn ConfigStore>,
    pub fetcher: Box<dyn ImageFetcher>,
    pub picker: Box<dyn FolderPicker>,
    pub opener: Box<dyn FolderOpener>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Ended,
}

/// Why a session stopped.
#[derive(Debug)]
pub enum SessionEnd {
    /// The browser closed the pipe or sent a length outside the frame bounds.
    Closed,
    /// Reading or writing a frame failed.
    TransportFailed(TransportError),
}

pub struct Session<R, W> {
    transport: FramedTransport<R, W>,
    collaborators: Collaborators,
    config: Configuration,
    state: SessionState,
}

impl<R: Read, W: Write> Session<R, W> {
    /// Loads the configuration once; it is re-saved on every change.
    pub fn new(transport: FramedTransport<R, W>, collaborators: Collaborators) -> Self {
        let config = collaborators.store.load();
        Self {
            transport,
            collaborators,
            config,
            state: SessionState::Running,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn save_directory(&self) -> &str {
        &self.config.save_directory
    }

    /// Serves requests until the pipe closes or breaks.
    pub fn run(&mut self) -> SessionEnd {
        log::info!("Session started, saving to {}", self.config.save_directory);
        while self.state == SessionState::Running {
            if let Some(end) = self.step() {
                self.state = SessionState::Ended;
                match &end {
                    SessionEnd::Closed => log::info!("Session ended: input closed"),
                    SessionEnd::TransportFailed(e) => log::error!("Session ended: {}", e),
                }
                return end;
            }
        }
        SessionEnd::Closed
    }

    fn step(&mut self) -> Option<SessionEnd> {
        let frame = match self.transport.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Some(SessionEnd::Closed),
            Err(e) => return Some(SessionEnd::TransportFailed(e)),
        };

        let response = match message::decode_request(&frame) {
            Ok(request) => self.handle(&request),
            Err(e) => {
                log::warn!("Bad frame ({} bytes): {}", frame.len(), e);
                Response::failure(e.to_string())
            }
        };

        let payload = message::encode_response(&response).unwrap_or_else(|e| {
            log::error!("Could not encode response: {}", e);
            ENCODE_FAILURE.to_vec()
        });
        match self.transport.write_frame(&payload) {
            Ok(()) => None,
            Err(e) => Some(SessionEnd::TransportFailed(e)),
        }
    }

    pub fn handle(&mut self, request: &Request) -> Response {
        let action = request.action();
        let response = match &action {
            Action::Ping => Response::ok("pong"),
            Action::SaveImage => self.save_image(request),
            Action::GetConfig => Response::ok(self.config.save_directory.clone()),
            Action::SetConfig => self.set_config(request),
            Action::SelectFolder => self.select_folder(),
            Action::OpenFolder => self.open_folder(),
            Action::Unknown(raw) => Response::failure(format!("Unrecognized action: {raw}")),
        };

        if response.success {
            log::info!("{}: ok", action.name());
        } else {
            log::warn!(
                "{}: {}",
                action.name(),
                response.error.as_deref().unwrap_or_default()
            );
        }
        response
    }

    fn save_image(&self, request: &Request) -> Response {
        let Some(url) = non_empty(request.image_url.as_deref()) else {
            return Response::failure("no image URL");
        };
        let id = request
            .image_id()
            .map(str::to_string)
            .unwrap_or_else(fetcher::fallback_resource_id);

        log::info!(
            "Saving {} (page {})",
            url,
            request.source_url.as_deref().unwrap_or("unknown")
        );
        match self.collaborators.fetcher.download(url, &id, &self.config) {
            Ok(path) => Response::saved(path.to_string_lossy(), "image saved"),
            Err(e) => Response::failure(format!("download failed: {e}")),
        }
    }

    fn set_config(&mut self, request: &Request) -> Response {
        let Some(dir) = non_empty(request.save_directory.as_deref()) else {
            return Response::failure("no path given");
        };
        match self.update_save_directory(dir) {
            Ok(()) => Response::ok("configuration updated"),
            Err(e) => Response::failure(format!("could not save configuration: {e}")),
        }
    }

    fn select_folder(&mut self) -> Response {
        let current = Path::new(&self.config.save_directory);
        match self.collaborators.picker.pick(Some(current)) {
            Ok(Some(chosen)) => {
                let chosen = chosen.to_string_lossy().into_owned();
                match self.update_save_directory(&chosen) {
                    Ok(()) => Response::ok(chosen),
                    Err(e) => Response::failure(format!("could not save configuration: {e}")),
                }
            }
            Ok(None) => Response::failure("cancelled"),
            Err(e) => Response::failure(e.to_string()),
        }
    }

    fn open_folder(&self) -> Response {
        let dir = Path::new(&self.config.save_directory);
        if self.config.save_directory.is_empty() || !dir.is_dir() {
            return Response::failure("folder does not exist");
        }
        match self.collaborators.opener.open(dir) {
            Ok(()) => Response::ok(self.config.save_directory.clone()),
            Err(e) => Response::failure(e.to_string()),
        }
    }

    /// Persists first, so the session never reports a directory the store
    /// does not hold.
    fn update_save_directory(&mut self, dir: &str) -> Result<(), ConfigError> {
        let updated = Configuration {
            save_directory: dir.to_string(),
            ..self.config.clone()
        };
        self.collaborators.store.save(&updated)?;
        self.config = updated;
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
