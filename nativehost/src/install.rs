//! Per-user installation: copy the binary into the application directory
//! and register the native messaging manifest with Chromium-family browsers.

use native_messaging::Scope;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{ConfigStore, FileConfigStore};
use crate::error::HostError;
use crate::paths;

pub const NATIVE_HOST_NAME: &str = "gyazodumper.nativeapp";
const NATIVE_HOST_DESCRIPTION: &str =
    "GyazoDumper native messaging host - saves Gyazo images to any folder";
pub const WEB_STORE_EXTENSION_ID: &str = "nlpifdgajdjkmenmmbpfekfefmaancnc";
const EXTENSION_SCHEME: &str = "chrome-extension://";

pub const BROWSERS: &[&str] = &["chrome", "edge", "chromium"];

/// The part of an installed manifest that survives a reinstall.
#[derive(Deserialize)]
struct InstalledManifest {
    #[serde(default)]
    allowed_origins: Vec<String>,
}

/// Accepts `abc`, `chrome-extension://abc` or `chrome-extension://abc/`.
pub fn normalize_extension_id(raw: &str) -> Option<String> {
    let id = raw.trim();
    let id = id.strip_prefix(EXTENSION_SCHEME).unwrap_or(id);
    let id = id.trim_end_matches('/');
    (!id.is_empty()).then(|| id.to_string())
}

pub fn origin_for(extension_id: &str) -> String {
    format!("{EXTENSION_SCHEME}{extension_id}/")
}

/// Origins already registered stay; the web store origin is always present.
pub fn merge_origins(existing: &[String], extra_id: Option<&str>) -> Vec<String> {
    let mut origins: BTreeSet<String> = existing.iter().cloned().collect();
    origins.insert(origin_for(WEB_STORE_EXTENSION_ID));
    if let Some(id) = extra_id.and_then(normalize_extension_id) {
        origins.insert(origin_for(&id));
    }
    origins.into_iter().collect()
}

fn existing_origins(manifest_path: &Path) -> Vec<String> {
    fs::read_to_string(manifest_path)
        .ok()
        .and_then(|content| serde_json::from_str::<InstalledManifest>(&content).ok())
        .map(|manifest| manifest.allowed_origins)
        .unwrap_or_default()
}

/// Origins from every browser's current manifest, so a reinstall does not
/// drop an extension id added earlier.
fn installed_origins() -> Vec<String> {
    BROWSERS
        .iter()
        .filter_map(|browser| {
            native_messaging::manifest_path(browser, Scope::User, NATIVE_HOST_NAME).ok()
        })
        .flat_map(|path| existing_origins(&path))
        .filter(|origin| origin.starts_with(EXTENSION_SCHEME))
        .collect()
}

/// Writes the manifest pointing at `exe_path` for every supported browser
/// and returns the origins it allows.
pub fn register(
    exe_path: &Path,
    extra_extension_id: Option<&str>,
) -> Result<Vec<String>, HostError> {
    let origins = merge_origins(&installed_origins(), extra_extension_id);
    native_messaging::install(
        NATIVE_HOST_NAME,
        NATIVE_HOST_DESCRIPTION,
        exe_path,
        &origins,
        &[],
        BROWSERS,
        Scope::User,
    )?;
    Ok(origins)
}

/// Removes the manifests (and on Windows the registry keys) again.
pub fn unregister() -> Result<(), HostError> {
    native_messaging::remove(NATIVE_HOST_NAME, BROWSERS, Scope::User)?;
    Ok(())
}

pub fn install(extra_extension_id: Option<&str>) -> Result<PathBuf, HostError> {
    let app_dir = paths::app_dir();
    fs::create_dir_all(&app_dir)?;
    println!("Installing GyazoDumper into {}", app_dir.display());

    let exe_path = copy_executable(&app_dir)?;
    println!("  Binary: {}", exe_path.display());

    let origins = register(&exe_path, extra_extension_id)?;
    for origin in &origins {
        println!("  Allowed origin: {origin}");
    }

    // Loading writes back defaults for anything missing.
    let config = FileConfigStore::new(paths::config_path()).load();
    println!("  Saving screenshots to {}", config.save_directory);

    println!("Native messaging host registered for {}.", BROWSERS.join(", "));
    Ok(exe_path)
}

pub fn uninstall() -> Result<(), HostError> {
    println!("Removing GyazoDumper...");
    unregister()?;

    let app_dir = paths::app_dir();
    if app_dir.exists() {
        fs::remove_dir_all(&app_dir)?;
        println!("  Removed {}", app_dir.display());
    }
    println!("GyazoDumper removed.");
    Ok(())
}

fn copy_executable(app_dir: &Path) -> Result<PathBuf, HostError> {
    let current = std::env::current_exe()?;
    let file_name = current
        .file_name()
        .ok_or_else(|| HostError::Install(format!("odd executable path {current:?}")))?;
    let target = app_dir.join(file_name);

    let already_installed = match (fs::canonicalize(&current), fs::canonicalize(&target)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if !already_installed {
        fs::copy(&current, &target)?;
    }
    Ok(target)
}
