//! Module dedicated to logging.
//!
//! Logs are appended to the configured log file, without colors. If
//! the file cannot be opened, logs go to the standard error instead.
//! The `RUST_LOG` environment variable overrides the level.

use std::{
    fs::{self, File, OpenOptions},
    io,
    path::Path,
    sync::Mutex,
};

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

use crate::Config;

/// Return the maximum level of logs.
///
/// The verbose flag raises the configured level to `info`.
pub fn level(config: &Config, verbose: bool) -> LevelFilter {
    if verbose {
        config.log_level.max(LevelFilter::INFO)
    } else {
        config.log_level
    }
}

/// Install the global subscriber.
pub fn init(config: &Config, verbose: bool) {
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::default().add_directive(level(config, verbose).into()))
    };

    match open(&config.log_file) {
        Ok(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        Err(err) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(io::stderr)
                .try_init();
            warn!(path = %config.log_file.display(), %err, "cannot open log file, logging to stderr");
        }
    }
}

/// Open the given log file in append mode, creating it as well as
/// its parent directories when missing.
pub fn open(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    OpenOptions::new().create(true).append(true).open(path)
}
