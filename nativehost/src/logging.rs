use chrono::Local;
use log::LevelFilter;
use std::io;
use std::path::Path;

/// Overrides the log level, e.g. `GYAZODUMPER_LOG=debug`.
pub const LEVEL_ENV: &str = "GYAZODUMPER_LOG";

/// Appends to `log_path`, and mirrors to stderr when `to_stderr` is set.
/// Stdout carries frames and is never a log target.
pub fn setup_logging(log_path: &Path, to_stderr: bool) {
    let level = level_from(std::env::var(LEVEL_ENV).ok().as_deref());
    let pid = std::process::id();

    let mut dispatch = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{}] [{}] {} {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                pid,
                record.level(),
                short_target(record.target()),
                message
            ))
        })
        .level(level)
        .level_for("reqwest", LevelFilter::Warn)
        .level_for("hyper_util", LevelFilter::Warn);

    if to_stderr {
        dispatch = dispatch.chain(io::stderr());
    }

    if let Some(dir) = log_path.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    match fern::log_file(log_path) {
        Ok(log_file) => dispatch = dispatch.chain(log_file),
        Err(e) if to_stderr => eprintln!(
            "GyazoDumper host: cannot write {}: {}; logging to stderr only",
            log_path.display(),
            e
        ),
        // Nobody would see a warning; the browser drops stderr.
        Err(_) => return,
    }

    if let Err(e) = dispatch.apply() {
        eprintln!("GyazoDumper host: logging already initialized: {}", e);
    }
}

/// Leaves a trace in the log file when the host dies unexpectedly; the
/// browser discards whatever the process prints.
pub fn log_panics() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!("Native host panicked: {}", info);
        default_hook(info);
    }));
}

fn level_from(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

// `gyazodumper_nativehost::session` -> `session`
fn short_target(target: &str) -> &str {
    target
        .strip_prefix("gyazodumper_nativehost::")
        .unwrap_or(target)
}
