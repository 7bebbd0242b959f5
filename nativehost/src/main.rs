use clap::error::ErrorKind;
use clap::Parser;
use std::io::{self, IsTerminal};

use gyazodumper_nativehost::logging::{log_panics, setup_logging};
use gyazodumper_nativehost::{
    install, is_browser_launch, paths, Collaborators, DialogFolderPicker, FileConfigStore,
    FramedTransport, HttpImageFetcher, Session, SessionEnd, SystemFolderOpener,
};

#[derive(Parser, Default)]
#[command(name = "gyazodumper-nativehost", version)]
#[command(about = "Native messaging host for the GyazoDumper browser extension")]
struct Cli {
    /// Install for the current user, optionally allowing one more extension id
    #[arg(
        long,
        value_name = "EXTENSION_ID",
        num_args = 0..=1,
        default_missing_value = ""
    )]
    install: Option<String>,

    /// Remove the installation and its configuration
    #[arg(long, conflicts_with = "install")]
    uninstall: bool,

    /// Arguments the browser appends (caller origin, parent window)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    browser_args: Vec<String>,
}

fn run_host() {
    // Mirror to the console only when someone is watching it.
    setup_logging(&paths::log_path(), io::stderr().is_terminal());
    log_panics();
    log::info!("GyazoDumper native host started");

    let fetcher = match HttpImageFetcher::new() {
        Ok(fetcher) => fetcher,
        Err(e) => {
            log::error!("Failed to create HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let collaborators = Collaborators {
        store: Box::new(FileConfigStore::new(paths::config_path())),
        fetcher: Box::new(fetcher),
        picker: Box::new(DialogFolderPicker::default()),
        opener: Box::new(SystemFolderOpener),
    };
    let transport = FramedTransport::new(io::stdin().lock(), io::stdout().lock());
    let mut session = Session::new(transport, collaborators);

    match session.run() {
        SessionEnd::Closed => log::info!("GyazoDumper native host shutting down"),
        SessionEnd::TransportFailed(_) => std::process::exit(1),
    }
}

fn main() {
    let stdin_redirected = !io::stdin().is_terminal();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Unfamiliar browser arguments must not keep the host from serving.
        Err(e)
            if stdin_redirected
                && !matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
        {
            Cli::default()
        }
        Err(e) => e.exit(),
    };

    if cli.uninstall {
        if let Err(e) = install::uninstall() {
            eprintln!("Uninstall failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    if let Some(extension_id) = cli.install.as_deref() {
        let extra = Some(extension_id).filter(|id| !id.is_empty());
        if let Err(e) = install::install(extra) {
            eprintln!("Install failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    if stdin_redirected || is_browser_launch(&cli.browser_args) {
        run_host();
        return;
    }

    // Started by hand: set up for the current user.
    if let Err(e) = install::install(None) {
        eprintln!("Install failed: {}", e);
        std::process::exit(1);
    }
}
