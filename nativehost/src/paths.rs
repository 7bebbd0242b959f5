use std::path::PathBuf;

pub const APP_DIR_NAME: &str = "GyazoDumper";

/// Per-user application directory (`%APPDATA%\GyazoDumper` on Windows).
pub fn app_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

pub fn config_path() -> PathBuf {
    app_dir().join("config.json")
}

pub fn log_path() -> PathBuf {
    app_dir().join("host.log")
}

/// Where screenshots go until the user picks a folder.
pub fn default_save_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("GyazoDumps")
}
