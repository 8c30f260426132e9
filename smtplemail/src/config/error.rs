use std::{io, path::PathBuf, result};

use thiserror::Error;

use crate::smtp;

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read configuration file at {1}")]
    ReadFileError(#[source] io::Error, PathBuf),
    #[error("cannot parse configuration file at {1}")]
    ParseFileError(#[source] serde_yaml::Error, PathBuf),
    #[error("cannot find smtp host in configuration")]
    MissingHostError,
    #[error("cannot parse smtp port {0:?}: expected a number between 1 and 65535")]
    ParsePortError(String),
    #[error("cannot parse smtp timeout {0:?}: expected a positive number of seconds")]
    ParseTimeoutError(String),
    #[error("cannot parse {1} {0:?}: expected a boolean")]
    ParseBoolError(String, &'static str),
    #[error("cannot parse log level {0:?}")]
    ParseLogLevelError(String),
    #[error(transparent)]
    SmtpError(#[from] smtp::Error),
}
