//! Folder chooser shown on behalf of the extension.
//!
//! The host has no window of its own, so the dialog runs on a dedicated
//! thread and the session only ever sees one blocking call. On Windows a
//! host started in the background cannot take focus by itself, so the
//! dialog gets a topmost owner window that is pushed to the foreground
//! first.

use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use thiserror::Error;

const DIALOG_TITLE: &str = "Choose the GyazoDumper target folder";

#[derive(Error, Debug)]
pub enum PickError {
    #[error("could not start folder dialog: {0}")]
    Spawn(#[from] io::Error),
    #[error("folder dialog crashed")]
    Crashed,
}

pub trait FolderPicker {
    /// Blocks until the user chooses a folder (`Some`) or cancels (`None`).
    fn pick(&self, initial: Option<&Path>) -> Result<Option<PathBuf>, PickError>;
}

pub struct DialogFolderPicker {
    title: String,
}

impl Default for DialogFolderPicker {
    fn default() -> Self {
        Self {
            title: DIALOG_TITLE.to_string(),
        }
    }
}

impl FolderPicker for DialogFolderPicker {
    fn pick(&self, initial: Option<&Path>) -> Result<Option<PathBuf>, PickError> {
        let initial = initial.filter(|dir| dir.is_dir()).map(Path::to_path_buf);
        let title = self.title.clone();

        let dialog = thread::Builder::new()
            .name("folder-picker".to_string())
            .spawn(move || {
                let mut dialog = rfd::FileDialog::new().set_title(title);
                if let Some(dir) = initial {
                    dialog = dialog.set_directory(dir);
                }
                #[cfg(windows)]
                let owner = foreground::OwnerWindow::create();
                #[cfg(windows)]
                let dialog = match &owner {
                    Some(owner) => dialog.set_parent(owner),
                    None => dialog,
                };
                dialog.pick_folder()
            })?;

        dialog.join().map_err(|_| PickError::Crashed)
    }
}

#[cfg(windows)]
mod foreground {
    use std::num::NonZeroIsize;
    use std::ptr::{null, null_mut};

    use raw_window_handle::{
        DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, RawWindowHandle,
        Win32WindowHandle, WindowHandle,
    };
    use windows_sys::Win32::Foundation::HWND;
    use windows_sys::Win32::System::Threading::{AttachThreadInput, GetCurrentThreadId};
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        BringWindowToTop, CreateWindowExW, DestroyWindow, GetForegroundWindow,
        GetWindowThreadProcessId, SetForegroundWindow, ShowWindow, SW_HIDE, SW_SHOW,
        WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP,
    };

    /// Invisible 1x1 topmost window owning the dialog. Destroyed on drop.
    pub(super) struct OwnerWindow(HWND);

    impl OwnerWindow {
        /// `None` when the window cannot be created; the dialog then opens
        /// without an owner.
        pub(super) fn create() -> Option<Self> {
            let class = to_wide("STATIC");
            let hwnd = unsafe {
                // Safety: `class` outlives the call, the other pointers may be null.
                CreateWindowExW(
                    WS_EX_TOPMOST | WS_EX_TOOLWINDOW,
                    class.as_ptr(),
                    null(),
                    WS_POPUP,
                    -1,
                    -1,
                    1,
                    1,
                    null_mut(),
                    null_mut(),
                    null_mut(),
                    null(),
                )
            };
            if hwnd.is_null() {
                log::warn!("Could not create owner window for folder dialog");
                return None;
            }

            unsafe {
                // Safety: `hwnd` was created above on this thread.
                ShowWindow(hwnd, SW_SHOW);
                force_foreground(hwnd);
                ShowWindow(hwnd, SW_HIDE);
            }
            Some(Self(hwnd))
        }
    }

    impl Drop for OwnerWindow {
        fn drop(&mut self) {
            unsafe {
                // Safety: the handle is owned and destroyed exactly once.
                DestroyWindow(self.0);
            }
        }
    }

    impl HasWindowHandle for OwnerWindow {
        fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
            let hwnd = NonZeroIsize::new(self.0 as isize).ok_or(HandleError::Unavailable)?;
            let raw = RawWindowHandle::Win32(Win32WindowHandle::new(hwnd));
            // Safety: the window lives as long as `self`.
            Ok(unsafe { WindowHandle::borrow_raw(raw) })
        }
    }

    impl HasDisplayHandle for OwnerWindow {
        fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
            Ok(DisplayHandle::windows())
        }
    }

    /// Windows only lets the thread owning the foreground window hand focus
    /// away, so borrow its input queue for the switch.
    unsafe fn force_foreground(hwnd: HWND) {
        let current = GetForegroundWindow();
        let foreground_thread = GetWindowThreadProcessId(current, null_mut());
        let this_thread = GetCurrentThreadId();

        let attach = foreground_thread != 0 && foreground_thread != this_thread;
        if attach {
            AttachThreadInput(this_thread, foreground_thread, 1);
        }
        SetForegroundWindow(hwnd);
        BringWindowToTop(hwnd);
        if attach {
            AttachThreadInput(this_thread, foreground_thread, 0);
        }
    }

    fn to_wide(value: &str) -> Vec<u16> {
        value.encode_utf16().chain(std::iter::once(0)).collect()
    }
}
